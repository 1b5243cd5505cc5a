// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! SQLite record store for romvault.
//!
//! This crate owns the on-disk layout of the local store: five record
//! collections (content records, save records, save metadata, collection
//! metadata and collection items) plus a small key-value file table.
//!
//! **Architecture**: This is the Database Layer. It knows nothing about
//! deduplication, garbage collection or integrity repair; those live in
//! `romvault-store` and are expressed as transactions over the primitives
//! exported here.
//!
//! # Key Features
//!
//! - Versioned schema (`PRAGMA user_version`)
//! - Read queries shared between connections and open transactions
//!   through the [`RecordQuery`] trait
//! - All mutation through [`StoreTx`], which rolls back unless committed
//! - In-memory database for testing
//!
//! # Example
//!
//! ```ignore
//! use romvault_store_db::{OpenMode, RecordQuery, StoreDb};
//!
//! let mut db = StoreDb::open("romvault.sqlite", OpenMode::Create)?;
//! db.with_transaction(|tx| {
//!     let rom = tx.insert_content_record(&rom_bytes, &hash, Encoding::Raw.as_str())?;
//!     // ...
//!     Ok(())
//! })?;
//! for meta in db.all_save_meta()? {
//!     println!("{} ({})", meta.program_name, meta.platform_id);
//! }
//! ```

mod connection;
mod error;
mod query;
mod schema;
mod types;
mod write;

pub use connection::{OpenMode, StoreDb};
pub use error::{Error, Result};
pub use query::RecordQuery;
pub use schema::SCHEMA_VERSION;
pub use types::*;
pub use write::*;
