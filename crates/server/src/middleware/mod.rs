pub mod recover;
pub mod request_id;
pub mod request_logging;
