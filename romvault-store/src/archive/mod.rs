// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! ZIP backup format.
//!
//! ```text
//! <platformId>/<programName>/rom_data.json
//! <platformId>/<programName>/rom_data.bin
//! <platformId>/<programName>/save_<timestamp>.json
//! <platformId>/<programName>/save_<timestamp>.bin
//! <platformId>/<programName>/save_<timestamp>.png     (optional)
//! ```
//!
//! Path components are sanitized with [`sanitize_component`]. `<timestamp>`
//! is RFC 3339 UTC with millisecond precision and `:` replaced by `-`.

pub mod export;
pub mod import;

use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use romvault_store_db::system_time_to_unix_millis;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub use export::{ExportSummary, Exporter};
pub use import::{ImportSummary, Importer};

pub const ROM_JSON: &str = "rom_data.json";
pub const ROM_BIN: &str = "rom_data.bin";
pub const SAVE_PREFIX: &str = "save_";

/// `rom_data.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomSidecar {
    pub program_name: String,
    pub platform_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// `save_<timestamp>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSidecar {
    pub timestamp: String,
    #[serde(default)]
    pub caption: String,
    pub program_name: String,
    pub platform_id: String,
}

/// Make `name` safe to use as a single archive path component.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "unnamed".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn to_utc(time: SystemTime) -> Result<DateTime<Utc>> {
    let millis = system_time_to_unix_millis(time);
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::invalid_archive(format!("timestamp {millis}ms is out of range")))
}

/// RFC 3339 UTC with millisecond precision, e.g. `2024-01-02T03:04:05.678Z`.
///
/// Fails for times outside the calendar range.
pub fn format_timestamp(time: SystemTime) -> Result<String> {
    Ok(to_utc(time)?.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn parse_timestamp(text: &str) -> Result<SystemTime> {
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|e| StoreError::invalid_archive(format!("bad timestamp {text:?}: {e}")))?;
    Ok(SystemTime::from(parsed.with_timezone(&Utc)))
}

/// The timestamp as it appears in entry names.
pub fn file_stamp(time: SystemTime) -> Result<String> {
    Ok(format_timestamp(time)?.replace(':', "-"))
}

/// Recover a timestamp from an entry-name stamp.
pub fn parse_file_stamp(stamp: &str) -> Result<SystemTime> {
    let (date, time) = stamp
        .split_once('T')
        .ok_or_else(|| StoreError::invalid_archive(format!("bad file timestamp {stamp:?}")))?;
    parse_timestamp(&format!("{date}T{}", time.replace('-', ":")))
}

/// Display caption stored next to each save.
pub fn caption(program_name: &str, time: SystemTime) -> Result<String> {
    let utc: NaiveDateTime = to_utc(time)?.naive_utc();
    Ok(format!("{program_name} {}", utc.format("%Y-%m-%d %H:%M:%S")))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Super Mario Bros.", "Super Mario Bros")]
    #[case("Zelda: Link's Awakening", "Zelda_ Link_s Awakening")]
    #[case("a/b\\c", "a_b_c")]
    #[case("..hidden..", "hidden")]
    #[case("  spaced  ", "spaced")]
    #[case("", "unnamed")]
    #[case("...", "unnamed")]
    #[case("Pokémon", "Pok_mon")]
    fn test_sanitize_component(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_component(input), expected);
    }

    #[test]
    fn test_timestamp_formats() {
        let time = UNIX_EPOCH + Duration::from_millis(1_704_164_645_678);
        assert_eq!(format_timestamp(time).unwrap(), "2024-01-02T03:04:05.678Z");
        assert_eq!(file_stamp(time).unwrap(), "2024-01-02T03-04-05.678Z");
        assert_eq!(caption("Test", time).unwrap(), "Test 2024-01-02 03:04:05");
        assert_eq!(parse_timestamp("2024-01-02T03:04:05.678Z").unwrap(), time);
        assert_eq!(parse_file_stamp("2024-01-02T03-04-05.678Z").unwrap(), time);
    }

    #[test]
    fn test_out_of_range_timestamp_is_an_error() {
        let time = UNIX_EPOCH + Duration::from_millis(i64::MAX as u64 / 2);
        assert!(matches!(
            format_timestamp(time),
            Err(StoreError::InvalidArchive(_))
        ));
        assert!(caption("Test", time).is_err());
    }

    #[test]
    fn test_parse_file_stamp_rejects_garbage() {
        assert!(matches!(
            parse_file_stamp("yesterday"),
            Err(StoreError::InvalidArchive(_))
        ));
    }

    #[test]
    fn test_rom_sidecar_field_names() {
        let sidecar = RomSidecar {
            program_name: "Test".into(),
            platform_id: "nes".into(),
            content_hash: Some("ab".into()),
            size: Some(2),
        };
        let json = serde_json::to_value(&sidecar).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "programName": "Test",
                "platformId": "nes",
                "contentHash": "ab",
                "size": 2
            })
        );
    }
}
