pub mod services;
pub mod task;
