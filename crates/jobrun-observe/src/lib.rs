//! Logging setup for jobrun binaries.
//!
//! ```rust,no_run
//! use jobrun_observe::{LoggerConfig, LoggerFormat, logger_init};
//!
//! let cfg = LoggerConfig {
//!     format: LoggerFormat::Json,
//!     level: "info,jobrun_db=debug".to_string(),
//!     ..Default::default()
//! };
//! logger_init(&cfg).expect("logger");
//! ```
mod logger;
pub use logger::*;
