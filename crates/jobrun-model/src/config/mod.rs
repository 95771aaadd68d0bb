mod duration;
pub use duration::{ConfigDuration, format_duration, parse_duration};

mod options;
pub use options::{ConnectionOptions, DriverParams};

mod store;
pub use store::ConfigStore;

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fallback used when `http_check_task_timeout` is configured as zero.
const DEFAULT_HTTP_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// Process-wide configuration.
///
/// Every key is optional in the config file; missing keys keep their defaults.
/// A loaded `Config` is never mutated in place: reload builds a new value and
/// swaps it inside [`ConfigStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    pub http_port: u16,
    #[serde(rename = "connection_options")]
    pub conn_options: ConnectionOptions,
    /// Default metric name for rows produced by `/sql`.
    pub query_metric_name: String,
    /// Name of the per-query outcome gauge.
    pub query_status_metric_name: String,
    #[serde(skip_serializing_if = "ConfigDuration::is_zero")]
    pub http_check_task_timeout: ConfigDuration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0".to_string(),
            http_port: 8080,
            conn_options: ConnectionOptions::default(),
            query_metric_name: "sql_query_result".to_string(),
            query_status_metric_name: "sql_query_status".to_string(),
            http_check_task_timeout: ConfigDuration::from_secs(15),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Listen address in `host:port` form.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.http_addr, self.http_port)
    }

    /// Effective timeout for one HTTP check.
    pub fn http_check_timeout(&self) -> Duration {
        match self.http_check_task_timeout.as_std() {
            d if d.is_zero() => DEFAULT_HTTP_CHECK_TIMEOUT,
            d => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.query_metric_name, "sql_query_result");
        assert_eq!(cfg.query_status_metric_name, "sql_query_status");
        assert_eq!(cfg.conn_options.max_conns, 5);
        assert_eq!(cfg.conn_options.max_idle_conns, 2);
        assert!(cfg.conn_options.prepared_stmts);
        assert!(!cfg.conn_options.no_ping);
        assert_eq!(cfg.http_check_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let raw = r#"{
            "http_port": 9100,
            "connection_options": { "query_timeout": "5s", "driver_params": { "postgres": { "sslmode": "disable" } } }
        }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();

        assert_eq!(cfg.http_port, 9100);
        assert_eq!(cfg.http_addr, "0.0.0.0");
        assert_eq!(cfg.conn_options.query_timeout.as_std(), Duration::from_secs(5));
        assert_eq!(cfg.conn_options.connect_timeout.as_std(), Duration::from_secs(10));
        assert_eq!(cfg.conn_options.max_conns, 5);
        assert_eq!(
            cfg.conn_options.driver_params["postgres"]["sslmode"],
            "disable"
        );
    }

    #[test]
    fn zero_http_check_timeout_falls_back() {
        let cfg: Config = serde_json::from_str(r#"{ "http_check_task_timeout": "0s" }"#).unwrap();
        assert_eq!(cfg.http_check_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn serializes_durations_as_strings() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["connection_options"]["max_connection_lifetime"], "10m0s");
        assert_eq!(json["connection_options"]["query_timeout"], "30s");
        assert_eq!(json["http_check_task_timeout"], "15s");
    }

    #[test]
    fn load_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/jobrun.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
