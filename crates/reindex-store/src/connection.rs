//! Store connection: driver resolution and the read-only SQLite handle.

use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::StoreError;

/// Drivers the job can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
}

impl Driver {
    /// Resolve a configured driver identifier.
    pub fn resolve(identifier: &str) -> Result<Self, StoreError> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" | "org.sqlite.jdbc" => Ok(Driver::Sqlite),
            _ => Err(StoreError::UnsupportedDriver(identifier.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }

    /// Reject dialect hints the driver cannot serve.
    pub fn check_dialect(&self, dialect: Option<&str>) -> Result<(), StoreError> {
        let Some(dialect) = dialect else {
            return Ok(());
        };
        match self {
            Driver::Sqlite if dialect.to_ascii_lowercase().contains("sqlite") => Ok(()),
            _ => Err(StoreError::DialectMismatch {
                driver: self.name().to_string(),
                dialect: dialect.to_string(),
            }),
        }
    }
}

/// A connection URL safe to log: userinfo and secret-looking query values
/// are masked.
pub fn redact_url(url: &str) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut redacted = match base.split_once("://") {
        Some((scheme, rest)) => {
            let authority_end = rest.find('/').unwrap_or(rest.len());
            match rest[..authority_end].rfind('@') {
                Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
                None => base.to_string(),
            }
        }
        None => base.to_string(),
    };

    if let Some(query) = query {
        let params: Vec<String> = query
            .split('&')
            .map(|param| match param.split_once('=') {
                Some((key, _)) if is_secret_key(key) => format!("{key}=***"),
                _ => param.to_string(),
            })
            .collect();
        redacted.push('?');
        redacted.push_str(&params.join("&"));
    }
    redacted
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["password", "passwd", "pwd", "secret", "token", "key"]
        .iter()
        .any(|secret| key.contains(secret))
}

/// Where a SQLite URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    Path(PathBuf),
    Uri(String),
}

impl SqliteTarget {
    /// Accepts `sqlite://path`, `sqlite:path`, `sqlite::memory:`, `file:` URIs,
    /// an optional `jdbc:` prefix, or a plain path.
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        let url = url.strip_prefix("jdbc:").unwrap_or(url);

        if url == ":memory:" || url == "sqlite::memory:" {
            return SqliteTarget::Memory;
        }
        if url.starts_with("file:") {
            return SqliteTarget::Uri(url.to_string());
        }
        if let Some(rest) = url.strip_prefix("sqlite://") {
            return SqliteTarget::Path(PathBuf::from(rest));
        }
        if let Some(rest) = url.strip_prefix("sqlite:") {
            return SqliteTarget::Path(PathBuf::from(rest));
        }
        SqliteTarget::Path(PathBuf::from(url))
    }
}

/// Connection parameters, resolved once before a run.
#[derive(Debug)]
pub struct ConnectionSettings {
    pub url: String,
    pub driver: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub dialect: Option<String>,
    /// Root records pulled per page
    pub fetch_size: usize,
}

impl ConnectionSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            driver: "sqlite".to_string(),
            username: None,
            password: None,
            dialect: None,
            fetch_size: 500,
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password.map(SecretString::from);
        self
    }

    pub fn with_dialect(mut self, dialect: Option<String>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }
}

/// Opens read-only SQLite connections for a resolved driver.
#[derive(Debug)]
pub struct SqliteConnector {
    settings: ConnectionSettings,
    target: SqliteTarget,
}

impl SqliteConnector {
    /// Resolve the driver and dialect. Nothing is opened yet.
    pub fn new(settings: ConnectionSettings) -> Result<Self, StoreError> {
        let driver = Driver::resolve(&settings.driver)?;
        driver.check_dialect(settings.dialect.as_deref())?;
        let target = SqliteTarget::parse(&settings.url);
        debug!(driver = driver.name(), target = ?target, "Resolved store driver");
        Ok(Self { settings, target })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Open the connection and verify it can read the schema.
    pub fn open(&self) -> Result<Connection, StoreError> {
        let has_credentials = self.settings.username.is_some()
            || self
                .settings
                .password
                .as_ref()
                .is_some_and(|p| !p.expose_secret().is_empty());
        if has_credentials {
            debug!("SQLite driver does not use credentials; ignoring them");
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connect_err = |source: rusqlite::Error| StoreError::Connect {
            url: redact_url(&self.settings.url),
            source,
        };

        let conn = match &self.target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::Path(path) => Connection::open_with_flags(path, flags),
            SqliteTarget::Uri(uri) => Connection::open_with_flags(uri, flags),
        }
        .map_err(connect_err)?;

        conn.pragma_update(None, "query_only", true)
            .map_err(connect_err)?;
        let tables: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get(0))
            .map_err(connect_err)?;

        info!(url = %redact_url(&self.settings.url), tables, "Opened store connection");
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_redact_url_masks_credentials() {
        assert_eq!(
            redact_url("postgres://app:hunter2@db:5432/app?sslmode=require&password=x"),
            "postgres://***@db:5432/app?sslmode=require&password=***"
        );
        assert_eq!(
            redact_url("file:app.db?mode=ro&key=abc"),
            "file:app.db?mode=ro&key=***"
        );
    }

    #[test]
    fn test_redact_url_keeps_plain_paths() {
        assert_eq!(redact_url("sqlite:///var/db/app.db"), "sqlite:///var/db/app.db");
        assert_eq!(redact_url("jdbc:sqlite:app.db"), "jdbc:sqlite:app.db");
        assert_eq!(
            redact_url("sqlite:///srv/user@host/app.db"),
            "sqlite:///srv/user@host/app.db"
        );
    }

    #[test]
    fn test_resolve_driver() {
        assert_eq!(Driver::resolve("sqlite").unwrap(), Driver::Sqlite);
        assert_eq!(Driver::resolve("org.sqlite.JDBC").unwrap(), Driver::Sqlite);
        assert!(matches!(
            Driver::resolve("com.mysql.jdbc.Driver"),
            Err(StoreError::UnsupportedDriver(_))
        ));
    }

    #[test]
    fn test_check_dialect() {
        let driver = Driver::Sqlite;
        assert!(driver.check_dialect(None).is_ok());
        assert!(driver.check_dialect(Some("SQLiteDialect")).is_ok());
        assert!(matches!(
            driver.check_dialect(Some("org.hibernate.dialect.MySQLDialect")),
            Err(StoreError::DialectMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(SqliteTarget::parse("sqlite::memory:"), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::parse("sqlite:///var/db/app.db"),
            SqliteTarget::Path(PathBuf::from("/var/db/app.db"))
        );
        assert_eq!(
            SqliteTarget::parse("jdbc:sqlite:app.db"),
            SqliteTarget::Path(PathBuf::from("app.db"))
        );
        assert_eq!(
            SqliteTarget::parse("file:app.db?mode=ro"),
            SqliteTarget::Uri("file:app.db?mode=ro".to_string())
        );
        assert_eq!(
            SqliteTarget::parse("data/app.db"),
            SqliteTarget::Path(PathBuf::from("data/app.db"))
        );
    }

    #[test]
    fn test_open_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        let url = dir.path().join("missing.db").to_string_lossy().to_string();
        let connector = SqliteConnector::new(ConnectionSettings::new(url)).unwrap();

        let result = connector.open();
        assert!(matches!(result, Err(StoreError::Connect { .. })));
    }

    #[test]
    fn test_open_existing_database_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
                .unwrap();
        }

        let connector = SqliteConnector::new(
            ConnectionSettings::new(format!("sqlite://{}", path.display()))
                .with_credentials(Some("sa".to_string()), Some("secret".to_string())),
        )
        .unwrap();
        let conn = connector.open().unwrap();

        let write = conn.execute("INSERT INTO t (id) VALUES (1)", []);
        assert!(write.is_err());
    }

    #[test]
    fn test_new_rejects_unknown_driver() {
        let result =
            SqliteConnector::new(ConnectionSettings::new("app.db").with_driver("oracle"));
        assert!(matches!(result, Err(StoreError::UnsupportedDriver(_))));
    }
}
