// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Write operations for the record store.
//!
//! Every mutation goes through a [`StoreTx`]. Dropping the transaction
//! without calling [`StoreTx::commit`] rolls all of its writes back.

use std::time::SystemTime;

use rusqlite::{Connection, Transaction, params};
use tracing::debug;

use crate::error::Result;
use crate::query::RecordQuery;
use crate::types::system_time_to_unix_millis;

/// Parameters for inserting a save slot.
#[derive(Debug, Clone)]
pub struct NewSaveMeta {
    pub platform_id: String,
    pub program_name: String,
    pub screenshot: Option<Vec<u8>>,
    pub content_record_id: i64,
    pub save_record_id: i64,
    pub timestamp: SystemTime,
}

/// Parameters for inserting a collection item.
#[derive(Debug, Clone, Default)]
pub struct NewCollectionItem {
    pub collection_id: i64,
    pub platform_id: String,
    pub title: String,
    pub credits: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
    pub rom_name: String,
    pub content_record_id: i64,
    pub launched: bool,
}

/// An open write transaction on the record store.
pub struct StoreTx<'conn> {
    pub(crate) tx: Transaction<'conn>,
}

impl RecordQuery for StoreTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl StoreTx<'_> {
    /// Commit all writes made through this transaction.
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    /// Insert a content record and return its ID.
    ///
    /// No uniqueness check is made on `content_hash`; callers look up the
    /// hash first.
    pub fn insert_content_record(
        &self,
        payload: &[u8],
        content_hash: &str,
        encoding: &str,
    ) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO ContentRecords (payload, contentHash, encoding) VALUES (?1, ?2, ?3)",
            params![payload, content_hash, encoding],
        )?;
        let id = self.tx.last_insert_rowid();
        debug!(id, content_hash, encoding, "inserted content record");
        Ok(id)
    }

    /// Insert a save record and return its ID.
    pub fn insert_save_record(&self, payload: &[u8]) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO SaveRecords (payload) VALUES (?1)",
            params![payload],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Insert a save slot and return its ID.
    pub fn insert_save_meta(&self, meta: &NewSaveMeta) -> Result<i64> {
        self.tx.execute(
            r#"
            INSERT INTO SaveMeta (platformId, programName, screenshot, contentRecordId, saveRecordId, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                meta.platform_id,
                meta.program_name,
                meta.screenshot,
                meta.content_record_id,
                meta.save_record_id,
                system_time_to_unix_millis(meta.timestamp),
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Insert collection metadata and return its ID.
    pub fn insert_collection_meta(
        &self,
        unique_name: &str,
        title: &str,
        cover_image: &[u8],
    ) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO CollectionMeta (uniqueName, title, coverImage) VALUES (?1, ?2, ?3)",
            params![unique_name, title, cover_image],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Insert a collection item and return its ID.
    pub fn insert_collection_item(&self, item: &NewCollectionItem) -> Result<i64> {
        self.tx.execute(
            r#"
            INSERT INTO CollectionItems
                (collectionId, platformId, title, credits, description, image, romName, contentRecordId, launched)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                item.collection_id,
                item.platform_id,
                item.title,
                item.credits,
                item.description,
                item.image,
                item.rom_name,
                item.content_record_id,
                item.launched,
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Delete a content record. Returns whether a row was removed.
    pub fn delete_content_record(&self, id: i64) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM ContentRecords WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Delete a save record. Returns whether a row was removed.
    pub fn delete_save_record(&self, id: i64) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM SaveRecords WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Delete a save slot. Returns whether a row was removed.
    ///
    /// The linked save and content records are left alone.
    pub fn delete_save_meta(&self, id: i64) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM SaveMeta WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Delete collection metadata. Returns whether a row was removed.
    pub fn delete_collection_meta(&self, id: i64) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM CollectionMeta WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Delete every item of a collection. Returns the number removed.
    pub fn delete_collection_items(&self, collection_id: i64) -> Result<usize> {
        let rows = self.tx.execute(
            "DELETE FROM CollectionItems WHERE collectionId = ?1",
            params![collection_id],
        )?;
        Ok(rows)
    }

    /// Delete a single collection item. Returns whether a row was removed.
    pub fn delete_collection_item(&self, id: i64) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM CollectionItems WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Overwrite the encoding tag of a content record, leaving the payload as is.
    pub fn set_content_encoding(&self, id: i64, encoding: &str) -> Result<()> {
        self.tx.execute(
            "UPDATE ContentRecords SET encoding = ?2 WHERE id = ?1",
            params![id, encoding],
        )?;
        Ok(())
    }

    /// Replace the payload and encoding tag of a content record.
    pub fn rewrite_content_payload(&self, id: i64, payload: &[u8], encoding: &str) -> Result<()> {
        self.tx.execute(
            "UPDATE ContentRecords SET payload = ?2, encoding = ?3 WHERE id = ?1",
            params![id, payload, encoding],
        )?;
        Ok(())
    }

    /// Drop the screenshot of a save slot.
    pub fn clear_save_screenshot(&self, save_meta_id: i64) -> Result<()> {
        self.tx.execute(
            "UPDATE SaveMeta SET screenshot = NULL WHERE id = ?1",
            params![save_meta_id],
        )?;
        Ok(())
    }

    /// Drop the image of a collection item.
    pub fn clear_item_image(&self, item_id: i64) -> Result<()> {
        self.tx.execute(
            "UPDATE CollectionItems SET image = NULL WHERE id = ?1",
            params![item_id],
        )?;
        Ok(())
    }

    /// Drop the cover image of a collection. The column is not nullable, so
    /// it is emptied.
    pub fn clear_cover_image(&self, collection_id: i64) -> Result<()> {
        self.tx.execute(
            "UPDATE CollectionMeta SET coverImage = X'' WHERE id = ?1",
            params![collection_id],
        )?;
        Ok(())
    }

    /// Set the launched flag of a collection item. Returns whether the item exists.
    pub fn set_item_launched(&self, item_id: i64, launched: bool) -> Result<bool> {
        let rows = self.tx.execute(
            "UPDATE CollectionItems SET launched = ?2 WHERE id = ?1",
            params![item_id, launched],
        )?;
        Ok(rows > 0)
    }

    /// Insert or replace an entry of the file table.
    pub fn put_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO Files (key, data, updatedAt) VALUES (?1, ?2, ?3)",
            params![key, data, system_time_to_unix_millis(SystemTime::now())],
        )?;
        Ok(())
    }

    /// Delete an entry of the file table. Returns whether a row was removed.
    pub fn delete_file(&self, key: &str) -> Result<bool> {
        let rows = self
            .tx
            .execute("DELETE FROM Files WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}
