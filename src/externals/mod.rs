pub mod display;
pub mod notifications;
pub mod sensor_link;
