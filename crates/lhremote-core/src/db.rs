//! Per-account SQLite databases written by the instance.

use crate::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a statement waits on a lock held by the instance's writer
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DATA_DIR_NAME: &str = "linked-helper";
const DATABASE_FILE: &str = "database.sqlite";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
        match self {
            AccessMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            AccessMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
        }
    }
}

/// An open account database
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    path: PathBuf,
    mode: AccessMode,
}

impl Database {
    /// Open an existing database file. Never creates one.
    pub fn open(path: &Path, mode: AccessMode) -> Result<Self> {
        let conn = Connection::open_with_flags(path, mode.flags())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %path.display(), ?mode, "Opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            mode,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Fail early, before any statement runs, when the handle is read-only
    pub fn require_writable(&self, operation: &'static str) -> Result<()> {
        match self.mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(Error::ReadOnlyDatabase { operation }),
        }
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| Error::Database(e))?;
        tracing::debug!(path = %path.display(), "Closed database");
        Ok(())
    }
}

/// Opens and releases database handles for account-scoped contexts
pub trait DatabaseProvider: Send + Sync {
    type Handle: Send;

    fn open(&self, account_id: i64, mode: AccessMode) -> Result<Self::Handle>;

    /// Release a handle. Failures are logged, not returned.
    fn close(&self, handle: Self::Handle);
}

/// Finds account databases under the application's data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLocator {
    data_dir: PathBuf,
}

impl DatabaseLocator {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The application's data directory on this platform
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(DATA_DIR_NAME))
    }

    /// `<data_dir>/accounts/<account_id>/database.sqlite`
    pub fn database_path(&self, account_id: i64) -> PathBuf {
        self.data_dir
            .join("accounts")
            .join(account_id.to_string())
            .join(DATABASE_FILE)
    }
}

impl DatabaseProvider for DatabaseLocator {
    type Handle = Database;

    fn open(&self, account_id: i64, mode: AccessMode) -> Result<Database> {
        let path = self.database_path(account_id);
        if !path.is_file() {
            return Err(Error::DatabaseNotFound { account_id, path });
        }
        Database::open(&path, mode)
    }

    fn close(&self, handle: Database) {
        if let Err(e) = handle.close() {
            tracing::warn!("Failed to close database: {}", e);
        }
    }
}
