// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Read query operations for the record store.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::types::{
    CollectionItem, CollectionMeta, ContentRecord, ContentRecordInfo, FileEntry, FileInfo,
    RecordCounts, SaveMeta, SaveRecord, system_time_to_unix_millis, unix_millis_to_system_time,
};

const SAVE_META_COLUMNS: &str =
    "id, platformId, programName, screenshot, contentRecordId, saveRecordId, timestamp";

const COLLECTION_ITEM_COLUMNS: &str = "id, collectionId, platformId, title, credits, description, image, romName, contentRecordId, launched";

fn save_meta_from_row(row: &Row<'_>) -> rusqlite::Result<SaveMeta> {
    Ok(SaveMeta {
        id: row.get(0)?,
        platform_id: row.get(1)?,
        program_name: row.get(2)?,
        screenshot: row.get(3)?,
        content_record_id: row.get(4)?,
        save_record_id: row.get(5)?,
        timestamp: unix_millis_to_system_time(row.get(6)?),
    })
}

fn collection_item_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionItem> {
    Ok(CollectionItem {
        id: row.get(0)?,
        collection_id: row.get(1)?,
        platform_id: row.get(2)?,
        title: row.get(3)?,
        credits: row.get(4)?,
        description: row.get(5)?,
        image: row.get(6)?,
        rom_name: row.get(7)?,
        content_record_id: row.get(8)?,
        launched: row.get::<_, i64>(9)? != 0,
    })
}

fn collection_meta_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionMeta> {
    Ok(CollectionMeta {
        id: row.get(0)?,
        unique_name: row.get(1)?,
        title: row.get(2)?,
        cover_image: row.get(3)?,
    })
}

/// Read access to the record collections.
///
/// Implemented by [`StoreDb`](crate::StoreDb) and by an open
/// [`StoreTx`](crate::StoreTx), so lookups made in the middle of a write
/// transaction see that transaction's own changes.
pub trait RecordQuery {
    fn conn(&self) -> &Connection;

    /// Query a content record by database ID.
    fn content_record(&self, id: i64) -> Result<Option<ContentRecord>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id, payload, contentHash, encoding FROM ContentRecords WHERE id = ?1",
        )?;
        let record = stmt
            .query_row(params![id], |row| {
                Ok(ContentRecord {
                    id: row.get(0)?,
                    payload: row.get(1)?,
                    content_hash: row.get(2)?,
                    encoding: row.get(3)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Look up the content record holding bytes with the given hash.
    ///
    /// If duplicates slipped in, the oldest record wins.
    fn content_record_id_by_hash(&self, content_hash: &str) -> Result<Option<i64>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id FROM ContentRecords WHERE contentHash = ?1 ORDER BY id LIMIT 1",
        )?;
        let id = stmt
            .query_row(params![content_hash], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// Every content record without its payload.
    fn content_record_infos(&self) -> Result<Vec<ContentRecordInfo>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id, contentHash, encoding, length(payload) FROM ContentRecords ORDER BY id",
        )?;
        let infos = stmt
            .query_map([], |row| {
                Ok(ContentRecordInfo {
                    id: row.get(0)?,
                    content_hash: row.get(1)?,
                    encoding: row.get(2)?,
                    size: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(infos)
    }

    /// Content records stored with the given encoding tag.
    fn content_records_with_encoding(&self, encoding: &str) -> Result<Vec<ContentRecord>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id, payload, contentHash, encoding FROM ContentRecords WHERE encoding = ?1 ORDER BY id",
        )?;
        let records = stmt
            .query_map(params![encoding], |row| {
                Ok(ContentRecord {
                    id: row.get(0)?,
                    payload: row.get(1)?,
                    content_hash: row.get(2)?,
                    encoding: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Query a save record by database ID.
    fn save_record(&self, id: i64) -> Result<Option<SaveRecord>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT id, payload FROM SaveRecords WHERE id = ?1")?;
        let record = stmt
            .query_row(params![id], |row| {
                Ok(SaveRecord {
                    id: row.get(0)?,
                    payload: row.get(1)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// IDs of every save record.
    fn save_record_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT id FROM SaveRecords ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Query save metadata by database ID.
    fn save_meta(&self, id: i64) -> Result<Option<SaveMeta>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {SAVE_META_COLUMNS} FROM SaveMeta WHERE id = ?1"
        ))?;
        let meta = stmt.query_row(params![id], save_meta_from_row).optional()?;
        Ok(meta)
    }

    /// All save metadata, newest first.
    fn all_save_meta(&self) -> Result<Vec<SaveMeta>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {SAVE_META_COLUMNS} FROM SaveMeta ORDER BY timestamp DESC, id DESC"
        ))?;
        let metas = stmt
            .query_map([], save_meta_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    /// Save metadata matching a `(platform, program, timestamp)` slot.
    fn find_save_meta(
        &self,
        platform_id: &str,
        program_name: &str,
        timestamp: std::time::SystemTime,
    ) -> Result<Vec<SaveMeta>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            r#"
            SELECT {SAVE_META_COLUMNS} FROM SaveMeta
            WHERE platformId = ?1 AND programName = ?2 AND timestamp = ?3
            ORDER BY id
            "#
        ))?;
        let metas = stmt
            .query_map(
                params![
                    platform_id,
                    program_name,
                    system_time_to_unix_millis(timestamp)
                ],
                save_meta_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    /// All collections (at most one in a consistent store).
    fn collections(&self) -> Result<Vec<CollectionMeta>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id, uniqueName, title, coverImage FROM CollectionMeta ORDER BY id",
        )?;
        let metas = stmt
            .query_map([], collection_meta_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    /// IDs of every collection.
    fn collection_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT id FROM CollectionMeta ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Items belonging to one collection, in insertion order.
    fn collection_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {COLLECTION_ITEM_COLUMNS} FROM CollectionItems WHERE collectionId = ?1 ORDER BY id"
        ))?;
        let items = stmt
            .query_map(params![collection_id], collection_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Every collection item regardless of collection.
    fn all_collection_items(&self) -> Result<Vec<CollectionItem>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {COLLECTION_ITEM_COLUMNS} FROM CollectionItems ORDER BY id"
        ))?;
        let items = stmt
            .query_map([], collection_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Query a collection item by database ID.
    fn collection_item(&self, id: i64) -> Result<Option<CollectionItem>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {COLLECTION_ITEM_COLUMNS} FROM CollectionItems WHERE id = ?1"
        ))?;
        let item = stmt
            .query_row(params![id], collection_item_from_row)
            .optional()?;
        Ok(item)
    }

    /// Number of save slots and collection items that point at a content record.
    fn count_content_references(&self, content_record_id: i64) -> Result<u64> {
        let mut stmt = self.conn().prepare_cached(
            r#"
            SELECT (SELECT COUNT(*) FROM SaveMeta WHERE contentRecordId = ?1)
                 + (SELECT COUNT(*) FROM CollectionItems WHERE contentRecordId = ?1)
            "#,
        )?;
        let count: i64 = stmt.query_row(params![content_record_id], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch one entry of the file table.
    fn get_file(&self, key: &str) -> Result<Option<FileEntry>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT key, data, updatedAt FROM Files WHERE key = ?1")?;
        let entry = stmt
            .query_row(params![key], |row| {
                Ok(FileEntry {
                    key: row.get(0)?,
                    data: row.get(1)?,
                    updated_at: unix_millis_to_system_time(row.get(2)?),
                })
            })
            .optional()?;
        Ok(entry)
    }

    /// List the file table, ordered by key.
    fn list_files(&self) -> Result<Vec<FileInfo>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT key, length(data), updatedAt FROM Files ORDER BY key")?;
        let files = stmt
            .query_map([], |row| {
                Ok(FileInfo {
                    key: row.get(0)?,
                    size: row.get::<_, i64>(1)? as u64,
                    updated_at: unix_millis_to_system_time(row.get(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Count the rows of each record collection.
    fn record_counts(&self) -> Result<RecordCounts> {
        let counts = self.conn().query_row(
            r#"
            SELECT (SELECT COUNT(*) FROM ContentRecords),
                   (SELECT COUNT(*) FROM SaveRecords),
                   (SELECT COUNT(*) FROM SaveMeta),
                   (SELECT COUNT(*) FROM CollectionMeta),
                   (SELECT COUNT(*) FROM CollectionItems)
            "#,
            [],
            |row| {
                Ok(RecordCounts {
                    content_records: row.get::<_, i64>(0)? as u64,
                    save_records: row.get::<_, i64>(1)? as u64,
                    save_meta: row.get::<_, i64>(2)? as u64,
                    collections: row.get::<_, i64>(3)? as u64,
                    collection_items: row.get::<_, i64>(4)? as u64,
                })
            },
        )?;
        Ok(counts)
    }
}
