//! Configuration for the platform sync node.

mod config;
pub mod reader;

pub use config::{load_config, Config, LoggingConfig, SyncTaskConfig};
pub use reader::ReaderConfig;
