use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigDuration;

/// Extra connection-string parameters keyed by canonical engine name
/// (`postgres`, `mysql`, `sqlite`, `sqlserver`, `oracle`).
pub type DriverParams = BTreeMap<String, BTreeMap<String, String>>;

/// Database connection settings applied to every `/sql` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    #[serde(rename = "max_connections")]
    pub max_conns: u32,
    #[serde(rename = "max_idle_connections")]
    pub max_idle_conns: u32,
    #[serde(rename = "max_connection_lifetime")]
    pub max_conn_lifetime: ConfigDuration,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_params: DriverParams,
    pub connect_timeout: ConfigDuration,
    pub query_timeout: ConfigDuration,
    #[serde(rename = "prepared_statements")]
    pub prepared_stmts: bool,
    pub no_ping: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            max_conns: 5,
            max_idle_conns: 2,
            max_conn_lifetime: ConfigDuration::from_secs(10 * 60),
            driver_params: DriverParams::new(),
            connect_timeout: ConfigDuration::from_secs(10),
            query_timeout: ConfigDuration::from_secs(30),
            prepared_stmts: true,
            no_ping: false,
        }
    }
}

impl ConnectionOptions {
    /// Parameter overrides for one engine.
    pub fn params_for(&self, engine: &str) -> Option<&BTreeMap<String, String>> {
        self.driver_params.get(engine)
    }
}
