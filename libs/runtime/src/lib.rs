//! Process-level plumbing shared by binaries: layered configuration,
//! home directory resolution and logging setup.

pub mod config;
pub mod home_dir;
pub mod logging;

pub use config::{ApiConfig, AppConfig, CliArgs, LoggingConfig, Section, ServerConfig};
pub use logging::init_logging_from_config;
