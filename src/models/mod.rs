pub mod humidity;
pub mod link_event;
