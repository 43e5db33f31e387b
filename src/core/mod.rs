pub mod config;
pub mod error;
pub mod orchestrator;
pub mod tracing_init;
