//! Process-level plumbing shared by the account maintenance binaries:
//! layered configuration and tracing-based logging.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{default_logging_config, AppConfig, CliArgs, LoggingConfig, Section};
