use std::str::FromStr;

use sqlx::{mysql::MySqlConnectOptions, postgres::PgConnectOptions, sqlite::SqliteConnectOptions};
use tiberius::{AuthMethod, EncryptionLevel};
use tracing::warn;

use crate::{descriptor::Descriptor, error::DbError};

const MEMORY_DATABASE: &str = ":memory:";

pub(crate) fn postgres(target: &Descriptor) -> Result<PgConnectOptions, DbError> {
    PgConnectOptions::from_str(&target.to_url()).map_err(|e| parse_failure(target, e))
}

pub(crate) fn mysql(target: &Descriptor) -> Result<MySqlConnectOptions, DbError> {
    MySqlConnectOptions::from_str(&target.to_url()).map_err(|e| parse_failure(target, e))
}

/// Options for the embedded engine, built from the path itself.
///
/// `mode`, `cache` and `immutable` map onto the driver's open flags; any other
/// parameter whose name is a plain identifier is issued as a `PRAGMA`.
pub(crate) fn sqlite(target: &Descriptor) -> Result<SqliteConnectOptions, DbError> {
    let mut options = if target.is_memory() {
        SqliteConnectOptions::from_str(MEMORY_DATABASE).map_err(|e| parse_failure(target, e))?
    } else {
        SqliteConnectOptions::new().filename(target.address())
    };

    for (key, value) in target.params() {
        options = match (key, value) {
            ("mode", "ro") => options.read_only(true),
            ("mode", "rw") => options.read_only(false).create_if_missing(false),
            ("mode", "rwc") => options.read_only(false).create_if_missing(true),
            ("mode", "memory") => options.in_memory(true).shared_cache(true),
            ("mode", other) => {
                return Err(parse_failure(target, format!("unknown value {other:?} for `mode`")));
            }
            ("cache", "shared") => options.shared_cache(true),
            ("cache", "private") => options.shared_cache(false),
            ("cache", other) => {
                return Err(parse_failure(target, format!("unknown value {other:?} for `cache`")));
            }
            ("immutable", v) => options.immutable(is_truthy(v)),
            (key, value) if is_identifier(key) => options.pragma(key.to_string(), value.to_string()),
            (key, _) => {
                warn!(param = key, "ignoring sqlite parameter");
                options
            }
        };
    }
    Ok(options)
}

pub(crate) fn sqlserver(target: &Descriptor) -> Result<tiberius::Config, DbError> {
    let url = url::Url::parse(&target.to_url()).map_err(|e| parse_failure(target, e))?;

    let mut config = tiberius::Config::new();
    config.host(url.host_str().unwrap_or("localhost"));
    config.port(url.port().unwrap_or(1433));

    let database = target
        .param("database")
        .map(str::to_string)
        .unwrap_or_else(|| url.path().trim_start_matches('/').to_string());
    if !database.is_empty() {
        config.database(database);
    }

    let username = decode(url.username());
    let password = decode(url.password().unwrap_or_default());
    config.authentication(AuthMethod::sql_server(username, password));

    if target.param("trust_cert").is_some_and(is_truthy) {
        config.trust_cert();
    }
    match target.param("encrypt") {
        Some("disable") => config.encryption(EncryptionLevel::NotSupported),
        Some(v) if !is_truthy(v) => config.encryption(EncryptionLevel::Off),
        _ => {}
    }
    if let Some(app) = target.param("app_name") {
        config.application_name(app);
    }
    Ok(config)
}

fn parse_failure(target: &Descriptor, reason: impl std::fmt::Display) -> DbError {
    DbError::DsnParse {
        dsn: target.redacted(),
        reason: reason.to_string(),
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

fn is_identifier(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, path::Path};

    use super::*;

    fn descriptor(raw: &str, overrides: &[(&str, &str)]) -> Descriptor {
        let mut d = Descriptor::parse(raw).unwrap();
        let overrides: BTreeMap<String, String> = overrides
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        d.merge_params(Some(&overrides));
        d
    }

    #[test]
    fn memory_sentinel_is_not_a_url() {
        for raw in [":memory:", "sqlite://:memory:"] {
            let options = sqlite(&descriptor(raw, &[])).unwrap();
            let name = options.get_filename().to_string_lossy().into_owned();
            assert!(name.starts_with("file:sqlx-in-memory"), "{raw}: {name}");
        }
    }

    #[test]
    fn file_paths_are_taken_verbatim() {
        let options = sqlite(&descriptor("/var/lib/app/stats.db", &[("mode", "ro")])).unwrap();
        assert_eq!(options.get_filename(), Path::new("/var/lib/app/stats.db"));

        let relative = sqlite(&descriptor("sqlite://data/stats.db", &[])).unwrap();
        assert_eq!(relative.get_filename(), Path::new("data/stats.db"));
    }

    #[test]
    fn bad_sqlite_params_are_rejected() {
        let err = sqlite(&descriptor("x.db", &[("mode", "bogus")])).unwrap_err();
        assert!(matches!(err, DbError::DsnParse { .. }));
        assert!(sqlite(&descriptor("x.db", &[("journal_mode", "wal")])).is_ok());
        assert!(sqlite(&descriptor("x.db", &[("a;b", "1")])).is_ok());
    }

    #[test]
    fn driver_overrides_reach_postgres_options() {
        let d = descriptor(
            "postgres://u:p@db:5432/app?application_name=dsn",
            &[("application_name", "jobrun")],
        );
        let options = postgres(&d).unwrap();
        assert_eq!(options.get_application_name(), Some("jobrun"));
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn sqlserver_database_param_beats_path() {
        let d = descriptor("sqlserver://sa:pw@mssql:1444/ignored?database=stats", &[]);
        let config = sqlserver(&d).unwrap();
        assert_eq!(config.get_addr(), "mssql:1444");
    }
}
