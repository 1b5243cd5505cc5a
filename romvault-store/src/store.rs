// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Async store API.
//!
//! SQLite work runs on the blocking pool against a shared connection; the
//! mutex around [`StoreDb`] together with the immediate transactions is the
//! only serialization point. Long batch operations yield to the runtime
//! every `yield_every` items.

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use romvault_store_db::{
    CollectionItem, CollectionMeta, FileEntry, FileInfo, OpenMode, RecordCounts, RecordQuery,
    SaveMeta, SaveRecord, StoreDb,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::archive::import;
use crate::archive::{ExportSummary, Exporter, ImportSummary, Importer};
use crate::codec::{self, MigrationSummary};
use crate::config::Config;
use crate::dedup::{self, NewCollection, NewSaveState};
use crate::error::{Result, StoreError};
use crate::gc::{self, CollectionSweep};
use crate::integrity::{self, FixOutcome, RepairSummary, ViolationReport};

/// A save slot with the records it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveData {
    pub meta: SaveMeta,
    pub save: SaveRecord,
    /// Decoded program bytes
    pub rom: Vec<u8>,
}

enum Phase {
    Scanning,
    Repairing(ViolationReport),
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<StoreDb>>,
    config: Arc<Config>,
}

impl Store {
    /// Open (creating if needed) the database at `config.db_path`.
    pub async fn open(config: Config) -> Result<Self> {
        let path = config.db_path.clone();
        let db = tokio::task::spawn_blocking(move || StoreDb::open(&path, OpenMode::Create))
            .await??;
        info!("Opened store at {}", config.db_path.display());
        Ok(Self::from_db(db, config))
    }

    pub fn from_db(db: StoreDb, config: Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle on the underlying database.
    pub fn database(&self) -> Arc<Mutex<StoreDb>> {
        self.db.clone()
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreDb) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut db = db.blocking_lock();
            f(&mut db)
        })
        .await?
    }

    // Save slots

    /// Store a save state together with its program image and screenshot.
    pub async fn store_state(&self, state: NewSaveState) -> Result<i64> {
        let config = self.config.clone();
        self.with_db(move |db| dedup::store_state(db, &config.screenshot, state))
            .await
    }

    /// Delete a save slot, sweeping its program image when unreferenced.
    pub async fn delete_save(&self, save_meta_id: i64) -> Result<()> {
        self.with_db(move |db| gc::delete_save(db, save_meta_id))
            .await
    }

    /// All save slots, newest first.
    pub async fn all_save_meta(&self) -> Result<Vec<SaveMeta>> {
        self.with_db(|db| Ok(db.all_save_meta()?)).await
    }

    /// A save slot with its save bytes and program bytes.
    ///
    /// Fails with [`StoreError::NotFound`] when the slot or either record it
    /// links to is missing.
    pub async fn save_data(&self, save_meta_id: i64) -> Result<SaveData> {
        self.with_db(move |db| {
            let meta = db
                .save_meta(save_meta_id)?
                .ok_or_else(|| StoreError::not_found(format!("save {save_meta_id}")))?;
            let save = db.save_record(meta.save_record_id)?.ok_or_else(|| {
                StoreError::not_found(format!("save record {}", meta.save_record_id))
            })?;
            let record = db.content_record(meta.content_record_id)?.ok_or_else(|| {
                StoreError::not_found(format!("content record {}", meta.content_record_id))
            })?;
            let rom = codec::decode_record(&record)?;
            Ok(SaveData { meta, save, rom })
        })
        .await
    }

    /// Decoded program bytes of a content record.
    pub async fn rom_data(&self, content_record_id: i64) -> Result<Vec<u8>> {
        self.with_db(move |db| {
            let record = db.content_record(content_record_id)?.ok_or_else(|| {
                StoreError::not_found(format!("content record {content_record_id}"))
            })?;
            codec::decode_record(&record)
        })
        .await
    }

    // Collections

    /// Replace the active collection.
    pub async fn store_collection(&self, collection: NewCollection) -> Result<i64> {
        self.with_db(move |db| dedup::store_collection(db, collection))
            .await
    }

    /// The active collection, if any.
    pub async fn collection(&self) -> Result<Option<CollectionMeta>> {
        self.with_db(|db| Ok(db.collections()?.into_iter().next()))
            .await
    }

    pub async fn collection_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>> {
        self.with_db(move |db| Ok(db.collection_items(collection_id)?))
            .await
    }

    /// Flag a collection item as started at least once.
    pub async fn mark_launched(&self, item_id: i64) -> Result<()> {
        self.with_db(move |db| {
            db.with_transaction(|tx| {
                if tx.set_item_launched(item_id, true)? {
                    Ok(())
                } else {
                    Err(StoreError::not_found(format!("collection item {item_id}")))
                }
            })
        })
        .await
    }

    pub async fn delete_all_collections(&self) -> Result<CollectionSweep> {
        self.with_db(gc::delete_all_collections).await
    }

    // Integrity

    pub async fn check_consistency(&self) -> Result<ViolationReport> {
        self.with_db(|db| integrity::check_consistency(&*db)).await
    }

    pub async fn repair_database(&self, report: ViolationReport) -> Result<RepairSummary> {
        self.with_db(move |db| integrity::repair_database(db, &report))
            .await
    }

    /// Check and repair until the store is clean or the pass limit is hit.
    ///
    /// Errors from a scan or a repair pass abort the loop and are returned.
    pub async fn check_and_fix(&self) -> Result<FixOutcome> {
        let max_passes = self.config.max_repair_passes;
        let mut passes = 0;
        let mut phase = Phase::Scanning;
        loop {
            phase = match phase {
                Phase::Scanning => {
                    let report = self.check_consistency().await?;
                    if report.is_empty() {
                        let outcome = if passes == 0 {
                            FixOutcome::Clean
                        } else {
                            FixOutcome::Repaired { passes }
                        };
                        info!("{outcome}");
                        return Ok(outcome);
                    }
                    if passes >= max_passes {
                        let outcome = FixOutcome::Unconverged {
                            passes,
                            remaining: report.total(),
                        };
                        warn!("{outcome}: {report}");
                        return Ok(outcome);
                    }
                    Phase::Repairing(report)
                }
                Phase::Repairing(report) => {
                    passes += 1;
                    info!("Repair pass {passes}/{max_passes}: {report}");
                    self.repair_database(report).await?;
                    tokio::task::yield_now().await;
                    Phase::Scanning
                }
            };
        }
    }

    /// Rewrite `legacy_text` content records as raw bytes.
    pub async fn migrate_legacy_content(&self) -> Result<MigrationSummary> {
        self.with_db(codec::migrate_legacy).await
    }

    // Archives

    /// Write every save slot into a ZIP backup and return the writer.
    pub async fn export_backup<W>(&self, out: W) -> Result<(W, ExportSummary)>
    where
        W: Write + Seek + Send + 'static,
    {
        let metas = self.all_save_meta().await?;
        let mut exporter = Exporter::new(out);
        for chunk in metas.chunks(self.config.yield_every.max(1)) {
            let chunk = chunk.to_vec();
            exporter = self
                .with_db(move |db| {
                    for meta in &chunk {
                        exporter.add_save(&*db, meta);
                    }
                    Ok(exporter)
                })
                .await?;
            tokio::task::yield_now().await;
        }
        let (out, summary) = tokio::task::spawn_blocking(move || exporter.finish()).await??;
        info!(
            "Exported {} save(s), {} failed, {} with a conflicting program image",
            summary.processed, summary.failed, summary.rom_conflicts
        );
        Ok((out, summary))
    }

    /// Restore save slots from a ZIP backup.
    ///
    /// Slots already present with identical save bytes are skipped. A group
    /// whose program image is missing or corrupt fails with all its saves.
    pub async fn import_backup<R>(&self, input: R) -> Result<ImportSummary>
    where
        R: Read + Seek + Send + 'static,
    {
        let max_entry_size = self.config.max_entry_size;
        let (mut importer, groups) = tokio::task::spawn_blocking(move || {
            let importer = Importer::new(input, max_entry_size)?;
            let groups = importer.groups();
            Ok::<_, StoreError>((importer, groups))
        })
        .await??;

        let mut summary = ImportSummary::default();
        let mut since_yield = 0;
        for group in groups {
            let (returned, payload) = tokio::task::spawn_blocking(move || {
                let payload = importer.read_group(&group);
                (importer, payload.map_err(|e| (e, group)))
            })
            .await?;
            importer = returned;

            let payload = match payload {
                Ok(payload) => payload,
                Err((e, group)) => {
                    warn!(
                        "Failed to import {}/{}: {e}",
                        group.platform_dir, group.program_dir
                    );
                    summary.failed += group.save_count();
                    continue;
                }
            };

            let rom = Arc::new(payload.rom);
            for save in payload.saves {
                let outcome = match save {
                    Ok(save) => {
                        let rom = rom.clone();
                        self.with_db(move |db| import::import_save(db, &rom, &save))
                            .await
                    }
                    Err(e) => Err(e),
                };
                summary.record(&outcome);

                since_yield += 1;
                if since_yield >= self.config.yield_every {
                    since_yield = 0;
                    tokio::task::yield_now().await;
                }
            }
        }
        info!(
            "Imported {} save(s), skipped {}, {} failed",
            summary.imported, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    // Key-value file store

    pub async fn put_file(&self, key: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let key = key.into();
        self.with_db(move |db| {
            db.with_transaction(|tx| tx.put_file(&key, &data))?;
            Ok(())
        })
        .await
    }

    pub async fn get_file(&self, key: impl Into<String>) -> Result<Option<FileEntry>> {
        let key = key.into();
        self.with_db(move |db| Ok(db.get_file(&key)?)).await
    }

    /// Returns whether an entry was deleted.
    pub async fn delete_file(&self, key: impl Into<String>) -> Result<bool> {
        let key = key.into();
        self.with_db(move |db| Ok(db.with_transaction(|tx| tx.delete_file(&key))?))
            .await
    }

    pub async fn list_files(&self) -> Result<Vec<FileInfo>> {
        self.with_db(|db| Ok(db.list_files()?)).await
    }

    /// Row counts of the five record collections.
    pub async fn stats(&self) -> Result<RecordCounts> {
        self.with_db(|db| Ok(db.record_counts()?)).await
    }
}
