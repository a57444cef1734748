//! Database client kinds.

use serde::Serialize;

/// Database client a descriptor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseClient {
    /// SQLite (file-based, the local-development default)
    #[default]
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    MySql,
}

impl DatabaseClient {
    /// Get the default port for this client.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::MySql => Some(3306),
            Self::Sqlite => None,
        }
    }

    /// Get the client name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parse a `DATABASE_CLIENT` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "mysql" | "mysql2" | "mariadb" => Some(Self::MySql),
            "sqlite" | "sqlite3" | "better-sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(DatabaseClient::parse("Postgres"), Some(DatabaseClient::Postgres));
        assert_eq!(DatabaseClient::parse("pg"), Some(DatabaseClient::Postgres));
        assert_eq!(DatabaseClient::parse("mysql2"), Some(DatabaseClient::MySql));
        assert_eq!(DatabaseClient::parse("sqlite3"), Some(DatabaseClient::Sqlite));
        assert_eq!(DatabaseClient::parse("oracle"), None);
    }

    #[test]
    fn test_default_is_sqlite() {
        assert_eq!(DatabaseClient::default(), DatabaseClient::Sqlite);
        assert_eq!(DatabaseClient::default().to_string(), "sqlite");
    }
}
