pub mod attempt_log;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod extraction;
pub mod orchestrator;
#[cfg(feature = "web-interface")]
pub mod server;
pub mod utils;
