// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Conversion between program bytes and their stored form.
//!
//! New content records are always written `raw`. Older releases stored
//! program images as base64 text (`legacy_text`); those rows stay readable
//! and can be rewritten in place with [`migrate_legacy`].

use data_encoding::BASE64;
use romvault_store_db::{ContentRecord, Encoding, RecordQuery, StoreDb};
use tracing::{info, warn};

use crate::error::{Result, StoreError};

/// Encode bytes in the legacy text form.
pub fn encode_legacy(bytes: &[u8]) -> Vec<u8> {
    BASE64.encode(bytes).into_bytes()
}

/// Recover the program bytes of a stored payload.
pub fn decode(encoding: Encoding, payload: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Raw => Ok(payload.to_vec()),
        Encoding::LegacyText => {
            let trimmed = payload.trim_ascii();
            BASE64
                .decode(trimmed)
                .map_err(|e| StoreError::codec(format!("legacy payload is not base64: {e}")))
        }
    }
}

/// Recover the program bytes of a content record.
pub fn decode_record(record: &ContentRecord) -> Result<Vec<u8>> {
    let encoding = record.encoding().map_err(|_| {
        StoreError::codec(format!(
            "content record {} has unrecognized encoding {:?}",
            record.id, record.encoding
        ))
    })?;
    decode(encoding, &record.payload)
}

/// Outcome of [`migrate_legacy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub migrated: usize,
    pub failed: usize,
}

/// Rewrite every `legacy_text` content record as `raw`, in one transaction.
///
/// Rows whose payload does not decode are left as they are and counted.
pub fn migrate_legacy(db: &mut StoreDb) -> Result<MigrationSummary> {
    db.with_transaction(|tx| {
        let mut summary = MigrationSummary::default();
        for record in tx.content_records_with_encoding(Encoding::LegacyText.as_str())? {
            match decode(Encoding::LegacyText, &record.payload) {
                Ok(bytes) => {
                    tx.rewrite_content_payload(record.id, &bytes, Encoding::Raw.as_str())?;
                    summary.migrated += 1;
                }
                Err(e) => {
                    warn!("Leaving content record {} as legacy text: {e}", record.id);
                    summary.failed += 1;
                }
            }
        }
        info!(
            migrated = summary.migrated,
            failed = summary.failed,
            "legacy content migration finished"
        );
        Ok(summary)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use romvault_utils_hash::ContentHash;

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(decode(Encoding::Raw, &[0, 1, 2]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_legacy_roundtrip() {
        let bytes = [0x00, 0xFF, 0x10, 0x80];
        let text = encode_legacy(&bytes);
        assert!(text.is_ascii());
        assert_eq!(decode(Encoding::LegacyText, &text).unwrap(), bytes);
    }

    #[test]
    fn test_legacy_tolerates_trailing_newline() {
        assert_eq!(
            decode(Encoding::LegacyText, b"AAE=\n").unwrap(),
            vec![0x00, 0x01]
        );
    }

    #[test]
    fn test_legacy_rejects_garbage() {
        assert!(matches!(
            decode(Encoding::LegacyText, b"not base64!"),
            Err(StoreError::Codec(_))
        ));
    }

    #[test]
    fn test_decode_record_with_unknown_tag() {
        let record = ContentRecord {
            id: 3,
            payload: vec![1],
            content_hash: String::new(),
            encoding: "utf16".into(),
        };
        assert!(matches!(decode_record(&record), Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_migrate_legacy_rows() {
        let mut db = StoreDb::open_memory().unwrap();
        let rom = [0xDE, 0xAD, 0xBE, 0xEF];
        let hash = ContentHash::digest(rom).to_string();
        let (legacy, broken) = db
            .with_transaction(|tx| -> Result<(i64, i64)> {
                let legacy = tx.insert_content_record(
                    &encode_legacy(&rom),
                    &hash,
                    Encoding::LegacyText.as_str(),
                )?;
                let broken =
                    tx.insert_content_record(b"%%%", "00", Encoding::LegacyText.as_str())?;
                Ok((legacy, broken))
            })
            .unwrap();

        let summary = migrate_legacy(&mut db).unwrap();
        assert_eq!(
            summary,
            MigrationSummary {
                migrated: 1,
                failed: 1
            }
        );

        let record = db.content_record(legacy).unwrap().unwrap();
        assert_eq!(record.encoding().unwrap(), Encoding::Raw);
        assert_eq!(record.payload, rom);
        let record = db.content_record(broken).unwrap().unwrap();
        assert_eq!(record.encoding().unwrap(), Encoding::LegacyText);
    }
}
