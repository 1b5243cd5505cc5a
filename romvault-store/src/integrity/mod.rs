// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Referential integrity checking and repair.
//!
//! [`check::check_consistency`] loads every record collection and reports
//! dangling links, orphans, unrecognized encodings and undecodable images.
//! [`repair::repair_database`] applies the "delete the dependent" policy to
//! a report in one transaction. The bounded check/repair loop lives on
//! [`Store::check_and_fix`](crate::Store::check_and_fix).

pub mod check;
pub mod repair;

use serde::Serialize;

use crate::screenshot::ImageFault;

pub use check::check_consistency;
pub use repair::{RepairSummary, repair_database};

/// A link from `owner` to a record `target` that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingLink {
    pub owner: i64,
    pub target: i64,
}

/// A content record carrying an encoding tag outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownEncoding {
    pub content_record_id: i64,
    pub encoding: String,
}

/// The row holding an image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ImageOwner {
    SaveMeta(i64),
    CollectionItem(i64),
    /// Cover image of a collection.
    Collection(i64),
}

/// An image payload that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidImage {
    pub owner: ImageOwner,
    pub fault: ImageFault,
    pub detail: String,
}

/// Everything the checker found. Each list is computed independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    /// Save records no save slot points at.
    pub orphaned_save_data: Vec<i64>,
    /// Content records referenced by neither a save slot nor a collection item.
    pub orphaned_rom_data: Vec<i64>,
    /// Save slots whose content record is gone.
    pub missing_rom_data: Vec<DanglingLink>,
    /// Save slots whose save record is gone.
    pub missing_save_data: Vec<DanglingLink>,
    /// Collection items whose content record is gone.
    pub missing_item_rom_data: Vec<DanglingLink>,
    /// Collection items whose collection is gone.
    pub orphaned_collection_items: Vec<DanglingLink>,
    pub inconsistent_data_types: Vec<UnknownEncoding>,
    pub invalid_screenshots: Vec<InvalidImage>,
}

impl ViolationReport {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of violations across all categories.
    pub fn total(&self) -> usize {
        self.orphaned_save_data.len()
            + self.orphaned_rom_data.len()
            + self.missing_rom_data.len()
            + self.missing_save_data.len()
            + self.missing_item_rom_data.len()
            + self.orphaned_collection_items.len()
            + self.inconsistent_data_types.len()
            + self.invalid_screenshots.len()
    }

    /// Invalid images whose payload is not in a known format.
    pub fn format_invalid_images(&self) -> impl Iterator<Item = &InvalidImage> {
        self.invalid_screenshots
            .iter()
            .filter(|image| image.fault == ImageFault::Format)
    }

    /// Invalid images in a known format that fail to decode.
    pub fn undecodable_images(&self) -> impl Iterator<Item = &InvalidImage> {
        self.invalid_screenshots
            .iter()
            .filter(|image| image.fault == ImageFault::Decode)
    }
}

impl std::fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no issues found");
        }
        let categories = [
            ("orphaned save data", self.orphaned_save_data.len()),
            ("orphaned ROM data", self.orphaned_rom_data.len()),
            ("missing ROM data", self.missing_rom_data.len()),
            ("missing save data", self.missing_save_data.len()),
            ("missing collection ROM data", self.missing_item_rom_data.len()),
            ("orphaned collection items", self.orphaned_collection_items.len()),
            ("inconsistent data types", self.inconsistent_data_types.len()),
            ("invalid image format", self.format_invalid_images().count()),
            ("undecodable images", self.undecodable_images().count()),
        ];
        let mut first = true;
        for (name, count) in categories.into_iter().filter(|(_, count)| *count > 0) {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {count}")?;
            first = false;
        }
        Ok(())
    }
}

/// Result of the bounded check/repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// The first scan found nothing.
    Clean,
    /// Violations were found and a later scan came back empty.
    Repaired { passes: usize },
    /// The pass limit was reached with violations left.
    Unconverged { passes: usize, remaining: usize },
}

impl FixOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, FixOutcome::Unconverged { .. })
    }
}

impl std::fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixOutcome::Clean => write!(f, "No issues found"),
            FixOutcome::Repaired { passes } => {
                write!(f, "All issues fixed after {passes} repair pass(es)")
            }
            FixOutcome::Unconverged { passes, remaining } => write!(
                f,
                "Repair did not converge after {passes} pass(es), {remaining} issue(s) remain"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = ViolationReport::default();
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
        assert_eq!(report.to_string(), "no issues found");
    }

    #[test]
    fn test_report_display_lists_non_empty_categories() {
        let report = ViolationReport {
            orphaned_save_data: vec![1, 2],
            invalid_screenshots: vec![InvalidImage {
                owner: ImageOwner::SaveMeta(3),
                fault: ImageFault::Decode,
                detail: "truncated".into(),
            }],
            ..Default::default()
        };
        assert_eq!(report.total(), 3);
        assert_eq!(
            report.to_string(),
            "orphaned save data: 2, undecodable images: 1"
        );
    }

    #[test]
    fn test_fix_outcome_success() {
        assert!(FixOutcome::Clean.is_success());
        assert!(FixOutcome::Repaired { passes: 1 }.is_success());
        assert!(
            !FixOutcome::Unconverged {
                passes: 5,
                remaining: 1
            }
            .is_success()
        );
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ViolationReport {
            missing_rom_data: vec![DanglingLink {
                owner: 1,
                target: 9,
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["missingRomData"][0]["target"], 9);
        assert!(json["orphanedSaveData"].as_array().unwrap().is_empty());
    }
}
