// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use romvault_store_db::{Encoding, RecordQuery};
use tracing::{debug, info};

use super::{DanglingLink, ImageOwner, InvalidImage, UnknownEncoding, ViolationReport};
use crate::error::Result;
use crate::screenshot;

fn invalid_image(owner: ImageOwner, bytes: &[u8]) -> Option<InvalidImage> {
    let (fault, detail) = match screenshot::decode_check(bytes) {
        Ok(()) => return None,
        Err(fault) => fault,
    };
    debug!("{owner:?} image does not decode ({fault:?}): {detail}");
    Some(InvalidImage {
        owner,
        fault,
        detail,
    })
}

/// Scan the whole store for integrity violations. Read-only.
pub fn check_consistency<Q: RecordQuery + ?Sized>(db: &Q) -> Result<ViolationReport> {
    let content = db.content_record_infos()?;
    let save_record_ids: HashSet<i64> = db.save_record_ids()?.into_iter().collect();
    let save_meta = db.all_save_meta()?;
    let collections = db.collections()?;
    let items = db.all_collection_items()?;

    let content_ids: HashSet<i64> = content.iter().map(|record| record.id).collect();
    let collection_ids: HashSet<i64> = collections.iter().map(|meta| meta.id).collect();
    let referenced_content: HashSet<i64> = save_meta
        .iter()
        .map(|meta| meta.content_record_id)
        .chain(items.iter().map(|item| item.content_record_id))
        .collect();
    let referenced_saves: HashSet<i64> =
        save_meta.iter().map(|meta| meta.save_record_id).collect();

    let mut report = ViolationReport::default();

    let mut orphaned_saves: Vec<i64> = save_record_ids
        .difference(&referenced_saves)
        .copied()
        .collect();
    orphaned_saves.sort_unstable();
    report.orphaned_save_data = orphaned_saves;

    for record in &content {
        if !referenced_content.contains(&record.id) {
            report.orphaned_rom_data.push(record.id);
        }
        if record.encoding.parse::<Encoding>().is_err() {
            report.inconsistent_data_types.push(UnknownEncoding {
                content_record_id: record.id,
                encoding: record.encoding.clone(),
            });
        }
    }

    for meta in &save_meta {
        if !content_ids.contains(&meta.content_record_id) {
            report.missing_rom_data.push(DanglingLink {
                owner: meta.id,
                target: meta.content_record_id,
            });
        }
        if !save_record_ids.contains(&meta.save_record_id) {
            report.missing_save_data.push(DanglingLink {
                owner: meta.id,
                target: meta.save_record_id,
            });
        }
        if let Some(bytes) = &meta.screenshot {
            report
                .invalid_screenshots
                .extend(invalid_image(ImageOwner::SaveMeta(meta.id), bytes));
        }
    }

    for meta in &collections {
        if !meta.cover_image.is_empty() {
            report
                .invalid_screenshots
                .extend(invalid_image(ImageOwner::Collection(meta.id), &meta.cover_image));
        }
    }

    for item in &items {
        if !collection_ids.contains(&item.collection_id) {
            report.orphaned_collection_items.push(DanglingLink {
                owner: item.id,
                target: item.collection_id,
            });
        }
        if !content_ids.contains(&item.content_record_id) {
            report.missing_item_rom_data.push(DanglingLink {
                owner: item.id,
                target: item.content_record_id,
            });
        }
        if let Some(bytes) = &item.image {
            report
                .invalid_screenshots
                .extend(invalid_image(ImageOwner::CollectionItem(item.id), bytes));
        }
    }

    if report.is_empty() {
        debug!("Integrity check found no issues");
    } else {
        info!("Integrity check found {}", report);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use romvault_store_db::{NewCollectionItem, NewSaveMeta, StoreDb};

    use crate::screenshot::ImageFault;

    use super::*;

    fn insert_save(db: &mut StoreDb, content_record_id: i64, save_record_id: i64) -> i64 {
        let tx = db.transaction().unwrap();
        let id = tx
            .insert_save_meta(&NewSaveMeta {
                platform_id: "nes".into(),
                program_name: "Test".into(),
                screenshot: None,
                content_record_id,
                save_record_id,
                timestamp: UNIX_EPOCH,
            })
            .unwrap();
        tx.commit().unwrap();
        id
    }

    #[test]
    fn test_dangling_links_are_reported_per_category() {
        let mut db = StoreDb::open_memory().unwrap();
        let meta_id = insert_save(&mut db, 40, 41);
        {
            let tx = db.transaction().unwrap();
            tx.insert_collection_item(&NewCollectionItem {
                collection_id: 7,
                content_record_id: 40,
                ..Default::default()
            })
            .unwrap();
            tx.commit().unwrap();
        }

        let report = check_consistency(&db).unwrap();
        assert_eq!(
            report.missing_rom_data,
            vec![DanglingLink {
                owner: meta_id,
                target: 40
            }]
        );
        assert_eq!(report.missing_save_data[0].target, 41);
        assert_eq!(report.missing_item_rom_data.len(), 1);
        assert_eq!(report.orphaned_collection_items[0].target, 7);
        assert!(report.orphaned_rom_data.is_empty());
        assert!(report.orphaned_save_data.is_empty());
    }

    #[test]
    fn test_orphans_and_unknown_encoding() {
        let mut db = StoreDb::open_memory().unwrap();
        let (content_id, save_id) = {
            let tx = db.transaction().unwrap();
            let content_id = tx.insert_content_record(b"rom", "00", "zstd").unwrap();
            let save_id = tx.insert_save_record(b"save").unwrap();
            tx.commit().unwrap();
            (content_id, save_id)
        };

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.orphaned_rom_data, vec![content_id]);
        assert_eq!(report.orphaned_save_data, vec![save_id]);
        assert_eq!(
            report.inconsistent_data_types,
            vec![UnknownEncoding {
                content_record_id: content_id,
                encoding: "zstd".into()
            }]
        );
    }

    #[test]
    fn test_invalid_images_are_classified() {
        let mut db = StoreDb::open_memory().unwrap();
        {
            let tx = db.transaction().unwrap();
            let content_id = tx.insert_content_record(b"rom", "00", "raw").unwrap();
            let save_id = tx.insert_save_record(b"save").unwrap();
            tx.insert_save_meta(&NewSaveMeta {
                platform_id: "nes".into(),
                program_name: "Test".into(),
                screenshot: Some(b"not an image".to_vec()),
                content_record_id: content_id,
                save_record_id: save_id,
                timestamp: UNIX_EPOCH,
            })
            .unwrap();
            let collection_id = tx.insert_collection_meta("bundle", "Bundle", b"").unwrap();
            let mut truncated = screenshot::tests::png(4, 4);
            truncated.truncate(20);
            tx.insert_collection_item(&NewCollectionItem {
                collection_id,
                content_record_id: content_id,
                image: Some(truncated),
                ..Default::default()
            })
            .unwrap();
            tx.commit().unwrap();
        }

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(report.format_invalid_images().count(), 1);
        let undecodable: Vec<_> = report.undecodable_images().collect();
        assert_eq!(undecodable.len(), 1);
        assert!(matches!(
            undecodable[0].owner,
            ImageOwner::CollectionItem(_)
        ));
        assert_eq!(undecodable[0].fault, ImageFault::Decode);
    }

    #[test]
    fn test_cover_image_is_checked() {
        let mut db = StoreDb::open_memory().unwrap();
        let (bad, good) = {
            let tx = db.transaction().unwrap();
            let mut truncated = screenshot::tests::png(4, 4);
            truncated.truncate(20);
            let bad = tx.insert_collection_meta("bad", "Bad", &truncated).unwrap();
            let good = tx
                .insert_collection_meta("good", "Good", &screenshot::tests::png(2, 2))
                .unwrap();
            tx.insert_collection_meta("none", "None", b"").unwrap();
            tx.commit().unwrap();
            (bad, good)
        };

        let report = check_consistency(&db).unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.invalid_screenshots[0].owner, ImageOwner::Collection(bad));
        assert_eq!(report.invalid_screenshots[0].fault, ImageFault::Decode);
        assert!(
            report
                .invalid_screenshots
                .iter()
                .all(|image| image.owner != ImageOwner::Collection(good))
        );
    }

    #[test]
    fn test_empty_store_is_clean() {
        let db = StoreDb::open_memory().unwrap();
        assert!(check_consistency(&db).unwrap().is_empty());
    }
}
