// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Reference sweep for content records.
//!
//! There is no stored reference counter: whenever a referrer goes away the
//! remaining save slots and collection items pointing at the same content
//! record are counted, and the record is deleted when nothing is left.

use std::collections::BTreeSet;

use romvault_store_db::{RecordQuery, StoreDb, StoreTx};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Rows removed by a collection wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSweep {
    pub collections: usize,
    pub items: usize,
    pub content_records: usize,
}

/// Delete each listed content record that nothing references any more.
///
/// Returns the number of records deleted.
pub(crate) fn sweep_content<I>(tx: &StoreTx<'_>, content_record_ids: I) -> Result<usize>
where
    I: IntoIterator<Item = i64>,
{
    let mut deleted = 0;
    for id in content_record_ids {
        let references = tx.count_content_references(id)?;
        if references == 0 && tx.delete_content_record(id)? {
            debug!("Swept unreferenced content record {id}");
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// Delete a save slot with its save record, then sweep its program image.
pub fn delete_save(db: &mut StoreDb, save_meta_id: i64) -> Result<()> {
    db.with_transaction(|tx| {
        let meta = tx
            .save_meta(save_meta_id)?
            .ok_or_else(|| StoreError::not_found(format!("save {save_meta_id}")))?;
        tx.delete_save_record(meta.save_record_id)?;
        tx.delete_save_meta(meta.id)?;
        let swept = sweep_content(tx, [meta.content_record_id])?;
        debug!("Deleted save {} (content records swept: {swept})", meta.id);
        Ok(())
    })
}

/// Delete every collection and its items inside `tx`, sweeping program images.
pub(crate) fn delete_all_collections_in(tx: &StoreTx<'_>) -> Result<CollectionSweep> {
    let mut sweep = CollectionSweep::default();
    for collection_id in tx.collection_ids()? {
        let content_ids: BTreeSet<i64> = tx
            .collection_items(collection_id)?
            .iter()
            .map(|item| item.content_record_id)
            .collect();
        sweep.items += tx.delete_collection_items(collection_id)?;
        if tx.delete_collection_meta(collection_id)? {
            sweep.collections += 1;
        }
        sweep.content_records += sweep_content(tx, content_ids)?;
    }
    Ok(sweep)
}

/// Delete every collection. A no-op on a store without collections.
pub fn delete_all_collections(db: &mut StoreDb) -> Result<CollectionSweep> {
    let sweep = db.with_transaction(delete_all_collections_in)?;
    if sweep.collections > 0 {
        info!(
            "Deleted {} collection(s), {} item(s), {} content record(s)",
            sweep.collections, sweep.items, sweep.content_records
        );
    }
    Ok(sweep)
}
