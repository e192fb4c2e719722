pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod panic;
pub mod reporter;
