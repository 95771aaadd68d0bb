use std::path::PathBuf;

use clap::Parser;
use jobrun_model::Config;
use jobrun_observe::{LoggerConfig, LoggerError, LoggerFormat};

/// Prometheus exporter that runs SQL queries and HTTP checks on demand.
#[derive(Parser, Debug)]
#[command(name = "jobrun-agentd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; enables `/reload`.
    #[arg(short, long, env = "JOBRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides `http_addr`.
    #[arg(long = "http.addr", env = "JOBRUN_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// Listen port, overrides `http_port`.
    #[arg(long = "http.port", env = "JOBRUN_HTTP_PORT")]
    pub http_port: Option<u16>,

    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// text, json or journald
    #[arg(long, default_value = "text", env = "JOBRUN_LOG_FORMAT")]
    pub log_format: String,
}

impl Cli {
    pub fn logger_config(&self) -> Result<LoggerConfig, LoggerError> {
        Ok(LoggerConfig {
            format: self.log_format.parse::<LoggerFormat>()?,
            level: self.log_level.clone(),
            ..Default::default()
        })
    }

    /// Flags win over file values. Only applied at startup: the listener is
    /// already bound when `/reload` swaps the config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(addr) = &self.http_addr {
            config.http_addr = addr.clone();
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_http_flags() {
        let cli = Cli::try_parse_from([
            "jobrun-agentd",
            "--http.addr",
            "127.0.0.1",
            "--http.port",
            "9399",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.listen_addr(), "127.0.0.1:9399");
    }

    #[test]
    fn missing_flags_keep_file_values() {
        let cli = Cli::try_parse_from(["jobrun-agentd"]).unwrap();
        let mut config = Config {
            http_port: 9100,
            ..Config::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.http_port, 9100);
        assert!(cli.config.is_none());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let cli = Cli::try_parse_from(["jobrun-agentd", "--log-format", "yaml"]).unwrap();
        assert!(matches!(
            cli.logger_config(),
            Err(LoggerError::InvalidFormat(s)) if s == "yaml"
        ));
    }
}
