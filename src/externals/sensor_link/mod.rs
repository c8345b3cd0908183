pub mod controller;
pub mod parse;
pub mod services;
pub mod task;
