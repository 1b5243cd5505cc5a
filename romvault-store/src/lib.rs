// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Content-addressed save-state store.
//!
//! Program images are deduplicated by SHA-256 and shared between save slots
//! and collection items; a content record disappears when its last referrer
//! is deleted. [`Store`] wraps the SQLite record store from
//! `romvault-store-db` in an async API and adds:
//!
//! - the deduplicating write path ([`dedup`])
//! - the on-demand reference sweep ([`gc`])
//! - the integrity checker and repairer ([`integrity`])
//! - ZIP backup export and import ([`archive`])
//!
//! ```ignore
//! let store = Store::open(romvault_store::config::load()?).await?;
//! store.store_state(NewSaveState { /* ... */ }).await?;
//! match store.check_and_fix().await? {
//!     FixOutcome::Unconverged { remaining, .. } => eprintln!("{remaining} issues left"),
//!     outcome => println!("{outcome}"),
//! }
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod gc;
pub mod integrity;
pub mod screenshot;
mod store;

pub use archive::{ExportSummary, ImportSummary};
pub use config::Config;
pub use dedup::{NewCollection, NewCollectionEntry, NewSaveState};
pub use error::{Result, StoreError};
pub use gc::CollectionSweep;
pub use integrity::{FixOutcome, RepairSummary, ViolationReport};
pub use store::{SaveData, Store};
