// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::RecordQuery;
use crate::schema::{FILES_SCHEMA_SQL, SCHEMA_SQL, SCHEMA_VERSION};
use crate::write::StoreTx;

/// Database open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access (diagnostics against a copy of a user's store)
    ReadOnly,
    /// Read-write access to an existing database
    ReadWrite,
    /// Create new database if it doesn't exist
    Create,
}

/// SQLite connection holding the romvault record collections.
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    /// Open or create a database at a custom path.
    ///
    /// A database without a schema gets one (unless opened read-only); a
    /// database written by a different schema version is rejected.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let flags = match mode {
            OpenMode::ReadOnly => {
                if !path.exists() {
                    return Err(Error::DatabaseNotFound(path.to_owned()));
                }
                OpenFlags::SQLITE_OPEN_READ_ONLY
            }
            OpenMode::ReadWrite => {
                if !path.exists() {
                    return Err(Error::DatabaseNotFound(path.to_owned()));
                }
                OpenFlags::SQLITE_OPEN_READ_WRITE
            }
            OpenMode::Create => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        };

        let conn = Connection::open_with_flags(path, flags).map_err(|e| Error::DatabaseOpen {
            path: path.to_owned(),
            source: e,
        })?;
        let db = Self { conn };

        if mode == OpenMode::Create {
            db.configure_pragmas()?;
        }

        match db.schema_version()? {
            0 if mode != OpenMode::ReadOnly => db.create_schema()?,
            SCHEMA_VERSION => {}
            found => {
                return Err(Error::SchemaVersionMismatch {
                    expected: SCHEMA_VERSION,
                    found,
                });
            }
        }

        debug!("Opened database at {} ({:?})", path.display(), mode);
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// The database is initialized with the full schema.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        debug!("Created in-memory database");
        Ok(db)
    }

    /// Configure SQLite pragmas for a single-process embedded store.
    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        Ok(())
    }

    /// Create the database schema (record collections + file table).
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn.execute_batch(FILES_SCHEMA_SQL)?;
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        debug!("Created database schema (version {SCHEMA_VERSION})");
        Ok(())
    }

    /// Schema version recorded in the database file (0 when uninitialized).
    pub fn schema_version(&self) -> Result<i32> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Check if the database has the expected schema tables.
    pub fn has_schema(&self) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('ContentRecords', 'SaveRecords', 'SaveMeta', 'CollectionMeta', 'CollectionItems')",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 5)
    }

    /// Begin a write transaction.
    ///
    /// The transaction takes the write lock immediately and rolls back when
    /// dropped without [`StoreTx::commit`].
    pub fn transaction(&mut self) -> Result<StoreTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(StoreTx { tx })
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    pub fn with_transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&StoreTx<'_>) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let tx = self.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl RecordQuery for StoreDb {
    fn conn(&self) -> &Connection {
        &self.conn
    }
}
