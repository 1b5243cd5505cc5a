// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Database row types for the record collections.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Physical encoding of a content record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Payload holds the program bytes unchanged.
    #[default]
    Raw,
    /// Payload holds base64 text written by older releases.
    LegacyText,
}

impl Encoding {
    /// The value every new record is written with.
    pub const CANONICAL: Encoding = Encoding::Raw;

    pub const fn as_str(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::LegacyText => "legacy_text",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Encoding::Raw),
            "legacy_text" => Ok(Encoding::LegacyText),
            other => Err(Error::UnknownEncoding(other.to_owned())),
        }
    }
}

/// A program image, addressed by the hash of its bytes.
///
/// This represents a row from the ContentRecords table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    /// Database row ID
    pub id: i64,
    /// Stored bytes, interpreted according to `encoding`
    pub payload: Vec<u8>,
    /// Lowercase hex SHA-256 of the decoded program bytes
    pub content_hash: String,
    /// Encoding tag exactly as stored (may be unrecognized)
    pub encoding: String,
}

impl ContentRecord {
    /// Parse the stored encoding tag.
    pub fn encoding(&self) -> Result<Encoding, Error> {
        self.encoding.parse()
    }
}

/// A content record without its payload, for whole-table scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecordInfo {
    pub id: i64,
    pub content_hash: String,
    pub encoding: String,
    /// Payload length in bytes
    pub size: u64,
}

/// Raw snapshot bytes of one save state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRecord {
    pub id: i64,
    pub payload: Vec<u8>,
}

/// One user-visible save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveMeta {
    /// Database row ID
    pub id: i64,
    pub platform_id: String,
    pub program_name: String,
    /// Screenshot taken at save time (PNG in practice)
    pub screenshot: Option<Vec<u8>>,
    /// Link to ContentRecords
    pub content_record_id: i64,
    /// Link to SaveRecords
    pub save_record_id: i64,
    /// When the state was saved (millisecond resolution)
    pub timestamp: SystemTime,
}

/// An imported curated software bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMeta {
    pub id: i64,
    pub unique_name: String,
    pub title: String,
    pub cover_image: Vec<u8>,
}

/// One program inside a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionItem {
    pub id: i64,
    /// Link to CollectionMeta
    pub collection_id: i64,
    pub platform_id: String,
    pub title: String,
    pub credits: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
    /// File name of the program inside the bundle
    pub rom_name: String,
    /// Link to ContentRecords
    pub content_record_id: i64,
    /// Whether the user has started this program at least once
    pub launched: bool,
}

/// An entry of the key-value file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub key: String,
    pub data: Vec<u8>,
    pub updated_at: SystemTime,
}

/// Listing form of [`FileEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub key: String,
    pub size: u64,
    pub updated_at: SystemTime,
}

/// Row counts of the record collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub content_records: u64,
    pub save_records: u64,
    pub save_meta: u64,
    pub collections: u64,
    pub collection_items: u64,
}

/// Convert milliseconds since the Unix epoch to SystemTime.
pub fn unix_millis_to_system_time(millis: i64) -> SystemTime {
    if millis >= 0 {
        UNIX_EPOCH + Duration::from_millis(millis as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(millis.unsigned_abs())
    }
}

/// Convert SystemTime to milliseconds since the Unix epoch.
pub fn system_time_to_unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

/// Truncate a SystemTime to the resolution the store keeps.
pub fn truncate_to_millis(time: SystemTime) -> SystemTime {
    unix_millis_to_system_time(system_time_to_unix_millis(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_millis_roundtrip() {
        let now = SystemTime::now();
        let millis = system_time_to_unix_millis(now);
        let back = unix_millis_to_system_time(millis);
        let diff = now.duration_since(back).unwrap_or_default();
        assert!(diff < Duration::from_millis(1));
        assert_eq!(truncate_to_millis(now), back);
    }

    #[test]
    fn test_negative_millis() {
        let before_epoch = UNIX_EPOCH - Duration::from_millis(1500);
        assert_eq!(system_time_to_unix_millis(before_epoch), -1500);
        assert_eq!(unix_millis_to_system_time(-1500), before_epoch);
    }

    #[test]
    fn test_encoding_tags() {
        assert_eq!("raw".parse::<Encoding>().unwrap(), Encoding::Raw);
        assert_eq!(
            "legacy_text".parse::<Encoding>().unwrap(),
            Encoding::LegacyText
        );
        assert_eq!(Encoding::CANONICAL.to_string(), "raw");
        assert!(matches!(
            "blob".parse::<Encoding>(),
            Err(Error::UnknownEncoding(tag)) if tag == "blob"
        ));
    }

    #[test]
    fn test_content_record_encoding() {
        let record = ContentRecord {
            id: 1,
            payload: vec![0, 1],
            content_hash: "00".into(),
            encoding: "binary".into(),
        };
        assert!(record.encoding().is_err());
    }
}
