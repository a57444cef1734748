//! SQLite descriptor.

use std::path::Path;

use tracing::debug;

use crate::DEFAULT_CONNECTION_TIMEOUT_MS;
use crate::client::DatabaseClient;
use crate::descriptor::{Connection, ConnectionDescriptor};
use crate::env::{EnvReader, EnvSource};

/// Default database file, relative to the project root.
pub const DEFAULT_FILENAME: &str = ".tmp/data.db";

/// Build the SQLite descriptor.
///
/// The database file is `DATABASE_FILENAME` (default `.tmp/data.db`) joined
/// onto `project_root`.
pub fn descriptor<S: EnvSource + ?Sized>(
    env: &EnvReader<'_, S>,
    project_root: &Path,
) -> ConnectionDescriptor {
    let filename = project_root.join(env.string_or("DATABASE_FILENAME", DEFAULT_FILENAME));
    debug!(filename = %filename.display(), "Using SQLite database file");

    ConnectionDescriptor {
        client: DatabaseClient::Sqlite,
        connection: Connection::File { filename },
        pool: None,
        use_null_as_default: true,
        acquire_connection_timeout: env
            .millis("DATABASE_CONNECTION_TIMEOUT", DEFAULT_CONNECTION_TIMEOUT_MS),
        routing: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvSource;
    use std::time::Duration;

    #[test]
    fn test_default_file() {
        let source = MapEnvSource::new();
        let desc = descriptor(&EnvReader::new(&source), Path::new("/srv/cms"));

        assert_eq!(desc.client, DatabaseClient::Sqlite);
        assert_eq!(desc.filename(), Some(Path::new("/srv/cms/.tmp/data.db")));
        assert!(desc.use_null_as_default);
        assert!(desc.pool.is_none());
        assert_eq!(desc.acquire_connection_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_custom_file() {
        let source = MapEnvSource::new()
            .set("DATABASE_FILENAME", "data/dev.sqlite")
            .set("DATABASE_CONNECTION_TIMEOUT", "5000");
        let desc = descriptor(&EnvReader::new(&source), Path::new("."));

        assert!(desc.filename().unwrap().ends_with("data/dev.sqlite"));
        assert_eq!(desc.acquire_connection_timeout, Duration::from_secs(5));
    }
}
