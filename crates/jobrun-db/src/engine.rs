use std::fmt;

/// Database dialect selected by a caller-supplied engine token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    MySql,
    Sqlite,
    SqlServer,
    Oracle,
    /// Unrecognized token, kept lowercased.
    Other(String),
}

impl Engine {
    /// Case-insensitive token lookup; never fails.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Engine::Postgres,
            "mysql" | "mariadb" => Engine::MySql,
            "sqlite" | "sqlite3" => Engine::Sqlite,
            "sqlserver" | "mssql" => Engine::SqlServer,
            "oracle" => Engine::Oracle,
            other => Engine::Other(other.to_string()),
        }
    }

    /// File-based engines that take a path instead of host and credentials.
    #[inline]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Engine::Sqlite)
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Engine::Postgres => Some(5432),
            Engine::MySql => Some(3306),
            Engine::SqlServer => Some(1433),
            Engine::Oracle => Some(1521),
            Engine::Sqlite | Engine::Other(_) => None,
        }
    }

    /// Canonical name: the descriptor scheme and the `driver_params` key.
    pub fn scheme(&self) -> &str {
        match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
            Engine::Sqlite => "sqlite",
            Engine::SqlServer => "sqlserver",
            Engine::Oracle => "oracle",
            Engine::Other(token) => token,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}
