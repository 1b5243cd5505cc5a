// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use romvault_store_db::{Encoding, RecordQuery, StoreDb, StoreTx};
use tracing::{debug, info};

use super::{ImageOwner, ViolationReport};
use crate::error::Result;
use crate::gc::sweep_content;

/// Rows touched by one repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub save_meta_deleted: usize,
    pub save_records_deleted: usize,
    pub content_records_deleted: usize,
    pub collection_items_deleted: usize,
    pub encodings_reset: usize,
    pub images_cleared: usize,
}

fn repair_in(tx: &StoreTx<'_>, report: &ViolationReport) -> Result<RepairSummary> {
    let mut summary = RepairSummary::default();
    // Content records that may have lost their last referrer in this pass.
    let mut sweep: BTreeSet<i64> = report.orphaned_rom_data.iter().copied().collect();

    let dependent_saves: BTreeSet<i64> = report
        .missing_rom_data
        .iter()
        .chain(&report.missing_save_data)
        .map(|link| link.owner)
        .collect();
    for meta_id in dependent_saves {
        let Some(meta) = tx.save_meta(meta_id)? else {
            continue;
        };
        if tx.delete_save_record(meta.save_record_id)? {
            summary.save_records_deleted += 1;
        }
        if tx.delete_save_meta(meta.id)? {
            summary.save_meta_deleted += 1;
        }
        sweep.insert(meta.content_record_id);
    }

    let dependent_items: BTreeSet<i64> = report
        .missing_item_rom_data
        .iter()
        .chain(&report.orphaned_collection_items)
        .map(|link| link.owner)
        .collect();
    for item_id in dependent_items {
        let Some(item) = tx.collection_item(item_id)? else {
            continue;
        };
        if tx.delete_collection_item(item.id)? {
            summary.collection_items_deleted += 1;
        }
        sweep.insert(item.content_record_id);
    }

    for &save_record_id in &report.orphaned_save_data {
        if tx.delete_save_record(save_record_id)? {
            summary.save_records_deleted += 1;
        }
    }

    // Metadata-only: the payload is assumed to already be raw bytes.
    for unknown in &report.inconsistent_data_types {
        tx.set_content_encoding(unknown.content_record_id, Encoding::CANONICAL.as_str())?;
        summary.encodings_reset += 1;
    }

    for image in &report.invalid_screenshots {
        match image.owner {
            ImageOwner::SaveMeta(id) => tx.clear_save_screenshot(id)?,
            ImageOwner::CollectionItem(id) => tx.clear_item_image(id)?,
            ImageOwner::Collection(id) => tx.clear_cover_image(id)?,
        }
        summary.images_cleared += 1;
    }

    summary.content_records_deleted = sweep_content(tx, sweep)?;
    Ok(summary)
}

/// Apply one repair pass for `report` in a single transaction.
///
/// Dependents of missing records are deleted rather than recreated, orphans
/// are deleted, unrecognized encodings are reset to `raw` and undecodable
/// images are cleared. Nothing is committed if any step fails.
pub fn repair_database(db: &mut StoreDb, report: &ViolationReport) -> Result<RepairSummary> {
    if report.is_empty() {
        debug!("Nothing to repair");
        return Ok(RepairSummary::default());
    }
    let summary = db.with_transaction(|tx| repair_in(tx, report))?;
    info!(?summary, "Repair pass committed");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use romvault_store_db::{NewCollectionItem, NewSaveMeta};

    use super::*;
    use crate::integrity::check_consistency;

    #[test]
    fn test_missing_save_data_removes_slot_and_sweeps_content() {
        let mut db = StoreDb::open_memory().unwrap();
        let content_id = {
            let tx = db.transaction().unwrap();
            let content_id = tx.insert_content_record(b"rom", "00", "raw").unwrap();
            tx.insert_save_meta(&NewSaveMeta {
                platform_id: "nes".into(),
                program_name: "Test".into(),
                screenshot: None,
                content_record_id: content_id,
                save_record_id: 99,
                timestamp: UNIX_EPOCH,
            })
            .unwrap();
            tx.commit().unwrap();
            content_id
        };

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.missing_save_data.len(), 1);
        assert!(report.orphaned_rom_data.is_empty());

        let summary = repair_database(&mut db, &report).unwrap();
        assert_eq!(summary.save_meta_deleted, 1);
        assert_eq!(summary.content_records_deleted, 1);
        assert!(db.content_record(content_id).unwrap().is_none());
        assert!(check_consistency(&db).unwrap().is_empty());
    }

    #[test]
    fn test_orphaned_item_keeps_shared_content() {
        let mut db = StoreDb::open_memory().unwrap();
        let content_id = {
            let tx = db.transaction().unwrap();
            let content_id = tx.insert_content_record(b"rom", "00", "raw").unwrap();
            let collection_id = tx.insert_collection_meta("bundle", "Bundle", b"").unwrap();
            tx.insert_collection_item(&NewCollectionItem {
                collection_id,
                content_record_id: content_id,
                ..Default::default()
            })
            .unwrap();
            tx.insert_collection_item(&NewCollectionItem {
                collection_id: collection_id + 100,
                content_record_id: content_id,
                ..Default::default()
            })
            .unwrap();
            tx.commit().unwrap();
            content_id
        };

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.orphaned_collection_items.len(), 1);
        let summary = repair_database(&mut db, &report).unwrap();
        assert_eq!(summary.collection_items_deleted, 1);
        assert_eq!(summary.content_records_deleted, 0);
        assert!(db.content_record(content_id).unwrap().is_some());
        assert!(check_consistency(&db).unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_cover_is_emptied() {
        let mut db = StoreDb::open_memory().unwrap();
        let collection_id = {
            let tx = db.transaction().unwrap();
            let collection_id = tx
                .insert_collection_meta("bundle", "Bundle", b"not an image")
                .unwrap();
            tx.commit().unwrap();
            collection_id
        };

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.format_invalid_images().count(), 1);
        let summary = repair_database(&mut db, &report).unwrap();
        assert_eq!(summary.images_cleared, 1);
        let collections = db.collections().unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].id, collection_id);
        assert!(collections[0].cover_image.is_empty());
        assert!(check_consistency(&db).unwrap().is_empty());
    }

    #[test]
    fn test_empty_report_is_a_no_op() {
        let mut db = StoreDb::open_memory().unwrap();
        let summary = repair_database(&mut db, &ViolationReport::default()).unwrap();
        assert_eq!(summary, RepairSummary::default());
    }
}
