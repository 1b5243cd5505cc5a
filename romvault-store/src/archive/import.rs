// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::time::SystemTime;

use romvault_store_db::{RecordQuery, StoreDb};
use romvault_utils_hash::{ContentHash, HashingReader};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::{
    ROM_BIN, ROM_JSON, RomSidecar, SAVE_PREFIX, SaveSidecar, parse_file_stamp, parse_timestamp,
};
use crate::dedup;
use crate::error::{IoContext, Result, StoreError};

/// Counts reported at the end of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
struct SaveEntries {
    json: Option<String>,
    bin: Option<String>,
    png: Option<String>,
}

/// Entry names found under one `<platform>/<program>` directory.
#[derive(Debug, Clone, Default)]
pub struct ArchiveGroup {
    pub platform_dir: String,
    pub program_dir: String,
    rom_json: Option<String>,
    rom_bin: Option<String>,
    saves: BTreeMap<String, SaveEntries>,
}

impl ArchiveGroup {
    pub fn save_count(&self) -> usize {
        self.saves.len()
    }
}

/// The program image of a group, verified against its sidecar.
#[derive(Debug, Clone)]
pub struct RomPayload {
    pub platform_id: String,
    pub program_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SavePayload {
    pub platform_id: String,
    pub program_name: String,
    pub timestamp: SystemTime,
    pub save: Vec<u8>,
    pub screenshot: Option<Vec<u8>>,
}

/// Everything read for one group. Each save is read independently.
#[derive(Debug)]
pub struct GroupPayload {
    pub rom: RomPayload,
    pub saves: Vec<Result<SavePayload>>,
}

/// What happened to one imported save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveImport {
    Imported(i64),
    /// A slot with the same platform, program, timestamp and save bytes exists.
    Skipped,
}

/// Reads a ZIP backup group by group.
///
/// No entry is read past `max_entry_size` bytes, whatever size the central
/// directory declares for it.
pub struct Importer<R: Read + Seek> {
    archive: ZipArchive<R>,
    max_entry_size: u64,
}

fn check_declared_size(name: &str, declared: u64, limit: u64) -> Result<()> {
    if declared > limit {
        return Err(StoreError::invalid_archive(format!(
            "{name} declares {declared} bytes, more than the {limit} byte limit"
        )));
    }
    Ok(())
}

fn read_bounded(mut reader: impl Read, name: &str, limit: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .by_ref()
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .io_context(|| format!("Failed to read archive entry {name}"))?;
    if buf.len() as u64 > limit {
        return Err(StoreError::invalid_archive(format!(
            "{name} is larger than the {limit} byte limit"
        )));
    }
    Ok(buf)
}

impl<R: Read + Seek> Importer<R> {
    pub fn new(reader: R, max_entry_size: u64) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
            max_entry_size,
        })
    }

    /// Index the archive by program directory.
    pub fn groups(&self) -> Vec<ArchiveGroup> {
        let mut groups: BTreeMap<(String, String), ArchiveGroup> = BTreeMap::new();
        for name in self.archive.file_names() {
            let parts: Vec<&str> = name.split('/').collect();
            let [platform, program, file] = parts.as_slice() else {
                debug!("Ignoring archive entry {name}");
                continue;
            };
            if file.is_empty() {
                continue;
            }
            let group = groups
                .entry((platform.to_string(), program.to_string()))
                .or_insert_with(|| ArchiveGroup {
                    platform_dir: platform.to_string(),
                    program_dir: program.to_string(),
                    ..Default::default()
                });
            if *file == ROM_JSON {
                group.rom_json = Some(name.to_owned());
            } else if *file == ROM_BIN {
                group.rom_bin = Some(name.to_owned());
            } else if file.starts_with(SAVE_PREFIX) {
                let Some((stem, extension)) = file.rsplit_once('.') else {
                    debug!("Ignoring archive entry {name}");
                    continue;
                };
                let entries = group.saves.entry(stem.to_owned()).or_default();
                match extension {
                    "json" => entries.json = Some(name.to_owned()),
                    "bin" => entries.bin = Some(name.to_owned()),
                    "png" => entries.png = Some(name.to_owned()),
                    _ => debug!("Ignoring archive entry {name}"),
                }
            } else {
                debug!("Ignoring archive entry {name}");
            }
        }
        groups.into_values().collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let limit = self.max_entry_size;
        let file = self.archive.by_name(name)?;
        check_declared_size(name, file.size(), limit)?;
        read_bounded(file, name, limit)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let bytes = self.read_entry(name)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn read_rom(&mut self, name: &str) -> Result<(Vec<u8>, ContentHash)> {
        let limit = self.max_entry_size;
        let file = self.archive.by_name(name)?;
        check_declared_size(name, file.size(), limit)?;
        let mut reader = HashingReader::new(file);
        let buf = read_bounded(&mut reader, name, limit)?;
        let (_, hash) = reader.finish();
        Ok((buf, hash))
    }

    fn read_save(
        &mut self,
        group: &ArchiveGroup,
        stem: &str,
        entries: &SaveEntries,
        sidecar: Option<SaveSidecar>,
    ) -> Result<SavePayload> {
        let bin = entries.bin.as_deref().ok_or_else(|| {
            StoreError::invalid_archive(format!(
                "{}/{}/{stem} has no .bin entry",
                group.platform_dir, group.program_dir
            ))
        })?;
        let timestamp = match &sidecar {
            Some(sidecar) => parse_timestamp(&sidecar.timestamp)?,
            None => parse_file_stamp(stem.trim_start_matches(SAVE_PREFIX))?,
        };
        let save = self.read_entry(bin)?;
        let screenshot = match entries.png.as_deref() {
            Some(png) => Some(self.read_entry(png)?).filter(|bytes| !bytes.is_empty()),
            None => None,
        };
        let (platform_id, program_name) = match sidecar {
            Some(sidecar) => (sidecar.platform_id, sidecar.program_name),
            None => (String::new(), String::new()),
        };
        Ok(SavePayload {
            platform_id,
            program_name,
            timestamp,
            save,
            screenshot,
        })
    }

    /// Read the ROM and every save of `group`.
    ///
    /// Fails as a whole when the ROM entry is missing, unreadable or does
    /// not match its recorded hash.
    pub fn read_group(&mut self, group: &ArchiveGroup) -> Result<GroupPayload> {
        let dir = format!("{}/{}", group.platform_dir, group.program_dir);
        let rom_bin = group
            .rom_bin
            .as_deref()
            .ok_or_else(|| StoreError::invalid_archive(format!("{dir} has no {ROM_BIN}")))?;
        let rom_sidecar: Option<RomSidecar> = match group.rom_json.as_deref() {
            Some(name) => Some(self.read_json(name)?),
            None => None,
        };
        let (bytes, hash) = self.read_rom(rom_bin)?;
        if let Some(expected) = rom_sidecar.as_ref().and_then(|s| s.content_hash.as_deref()) {
            let expected: ContentHash = expected.parse().map_err(|e| {
                StoreError::invalid_archive(format!("{dir}/{ROM_JSON} has a bad contentHash: {e}"))
            })?;
            if expected != hash {
                return Err(StoreError::invalid_archive(format!(
                    "{dir}/{ROM_BIN} does not match its contentHash (expected {expected}, got {hash})"
                )));
            }
        }

        let mut sidecars = Vec::with_capacity(group.saves.len());
        for entries in group.saves.values() {
            let sidecar = match entries.json.as_deref() {
                Some(name) => self.read_json::<SaveSidecar>(name).map(Some),
                None => Ok(None),
            };
            sidecars.push(sidecar);
        }

        let first_sidecar = sidecars
            .iter()
            .find_map(|s| s.as_ref().ok().and_then(Option::as_ref));
        let (platform_id, program_name) = match (&rom_sidecar, first_sidecar) {
            (Some(rom), _) => (rom.platform_id.clone(), rom.program_name.clone()),
            (None, Some(save)) => (save.platform_id.clone(), save.program_name.clone()),
            (None, None) => (group.platform_dir.clone(), group.program_dir.clone()),
        };
        let rom = RomPayload {
            platform_id,
            program_name,
            bytes,
        };

        let mut saves = Vec::with_capacity(group.saves.len());
        for ((stem, entries), sidecar) in group.saves.iter().zip(sidecars) {
            let save = sidecar
                .and_then(|sidecar| self.read_save(group, stem, entries, sidecar))
                .map(|mut save| {
                    if save.platform_id.is_empty() {
                        save.platform_id = rom.platform_id.clone();
                    }
                    if save.program_name.is_empty() {
                        save.program_name = rom.program_name.clone();
                    }
                    save
                });
            saves.push(save);
        }
        Ok(GroupPayload { rom, saves })
    }
}

/// Insert one imported save unless an identical slot already exists.
pub fn import_save(db: &mut StoreDb, rom: &RomPayload, save: &SavePayload) -> Result<SaveImport> {
    let incoming = ContentHash::digest(&save.save);
    db.with_transaction(|tx| {
        for existing in tx.find_save_meta(&save.platform_id, &save.program_name, save.timestamp)? {
            let Some(record) = tx.save_record(existing.save_record_id)? else {
                continue;
            };
            if ContentHash::digest(&record.payload) == incoming {
                debug!(
                    "Skipping save of {} at {:?}: identical to slot {}",
                    save.program_name, save.timestamp, existing.id
                );
                return Ok(SaveImport::Skipped);
            }
        }
        let id = dedup::insert_save(
            tx,
            &save.platform_id,
            &save.program_name,
            &save.save,
            &rom.bytes,
            save.screenshot.clone(),
            save.timestamp,
        )?;
        Ok(SaveImport::Imported(id))
    })
}

impl ImportSummary {
    /// Record the outcome of one save.
    pub fn record(&mut self, outcome: &Result<SaveImport>) {
        match outcome {
            Ok(SaveImport::Imported(_)) => self.imported += 1,
            Ok(SaveImport::Skipped) => self.skipped += 1,
            Err(e) => {
                warn!("Failed to import save: {e}");
                self.failed += 1;
            }
        }
    }
}
