mod config;
pub use config::{
    Config, ConfigDuration, ConfigStore, ConnectionOptions, DriverParams, format_duration,
    parse_duration,
};

mod error;
pub use error::ConfigError;
