// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! The deduplicating write path.
//!
//! Program images are stored once per distinct SHA-256; every save slot and
//! collection item links to the shared content record. Save states are
//! never deduplicated.

use std::time::SystemTime;

use romvault_store_db::{
    Encoding, NewCollectionItem, NewSaveMeta, RecordQuery, StoreDb, StoreTx, truncate_to_millis,
};
use romvault_utils_hash::ContentHash;
use tracing::{debug, info};

use crate::config::ScreenshotConfig;
use crate::error::Result;
use crate::gc;
use crate::screenshot;

/// A save state handed over by the emulator.
#[derive(Debug, Clone, Default)]
pub struct NewSaveState {
    pub platform_id: String,
    pub program_name: String,
    pub save: Vec<u8>,
    pub rom: Vec<u8>,
    pub screenshot: Option<Vec<u8>>,
}

/// One program of a collection being imported.
#[derive(Debug, Clone, Default)]
pub struct NewCollectionEntry {
    pub platform_id: String,
    pub title: String,
    pub credits: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
    pub rom_name: String,
    pub rom: Vec<u8>,
}

/// A curated bundle being imported.
#[derive(Debug, Clone, Default)]
pub struct NewCollection {
    pub unique_name: String,
    pub title: String,
    pub cover_image: Vec<u8>,
    pub items: Vec<NewCollectionEntry>,
}

/// Empty image payloads are stored as absent.
pub(crate) fn non_empty(image: Option<Vec<u8>>) -> Option<Vec<u8>> {
    image.filter(|bytes| !bytes.is_empty())
}

/// Return the content record holding `rom`, inserting it on first sight.
pub(crate) fn intern_content(tx: &StoreTx<'_>, rom: &[u8]) -> Result<i64> {
    let hash = ContentHash::digest(rom).to_string();
    if let Some(id) = tx.content_record_id_by_hash(&hash)? {
        debug!("Reusing content record {id} for {hash}");
        return Ok(id);
    }
    Ok(tx.insert_content_record(rom, &hash, Encoding::CANONICAL.as_str())?)
}

/// Insert a save slot with its save record, deduplicating the program image.
pub(crate) fn insert_save(
    tx: &StoreTx<'_>,
    platform_id: &str,
    program_name: &str,
    save: &[u8],
    rom: &[u8],
    screenshot: Option<Vec<u8>>,
    timestamp: SystemTime,
) -> Result<i64> {
    let content_record_id = intern_content(tx, rom)?;
    let save_record_id = tx.insert_save_record(save)?;
    let id = tx.insert_save_meta(&NewSaveMeta {
        platform_id: platform_id.to_owned(),
        program_name: program_name.to_owned(),
        screenshot: non_empty(screenshot),
        content_record_id,
        save_record_id,
        timestamp,
    })?;
    Ok(id)
}

/// Store a save state atomically. Returns the new save slot's ID.
pub fn store_state(
    db: &mut StoreDb,
    screenshots: &ScreenshotConfig,
    state: NewSaveState,
) -> Result<i64> {
    let screenshot = non_empty(state.screenshot)
        .map(|bytes| screenshot::normalize(screenshots, &state.platform_id, bytes));
    let timestamp = truncate_to_millis(SystemTime::now());

    let id = db.with_transaction(|tx| {
        insert_save(
            tx,
            &state.platform_id,
            &state.program_name,
            &state.save,
            &state.rom,
            screenshot,
            timestamp,
        )
    })?;
    info!(
        "Stored save state {id} for {} ({})",
        state.program_name, state.platform_id
    );
    Ok(id)
}

/// Replace the active collection with `collection` in a single transaction.
///
/// Returns the new collection's ID.
pub fn store_collection(db: &mut StoreDb, collection: NewCollection) -> Result<i64> {
    let id = db.with_transaction(|tx| -> Result<i64> {
        gc::delete_all_collections_in(tx)?;

        let collection_id = tx.insert_collection_meta(
            &collection.unique_name,
            &collection.title,
            &collection.cover_image,
        )?;
        for entry in &collection.items {
            let content_record_id = intern_content(tx, &entry.rom)?;
            tx.insert_collection_item(&NewCollectionItem {
                collection_id,
                platform_id: entry.platform_id.clone(),
                title: entry.title.clone(),
                credits: entry.credits.clone(),
                description: entry.description.clone(),
                image: non_empty(entry.image.clone()),
                rom_name: entry.rom_name.clone(),
                content_record_id,
                launched: false,
            })?;
        }
        Ok(collection_id)
    })?;
    info!(
        "Stored collection {id} ({}) with {} items",
        collection.unique_name,
        collection.items.len()
    );
    Ok(id)
}
