// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::io::{Seek, Write};

use romvault_store_db::{RecordQuery, SaveMeta};
use romvault_utils_hash::ContentHash;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{
    ROM_BIN, ROM_JSON, RomSidecar, SAVE_PREFIX, SaveSidecar, caption, file_stamp,
    format_timestamp, sanitize_component,
};
use crate::codec;
use crate::error::{IoContext, Result, StoreError};

/// Counts reported at the end of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub processed: usize,
    pub failed: usize,
    /// Saves whose program image differs from the one already written to
    /// their directory. They are exported linked to that earlier image.
    pub rom_conflicts: usize,
}

/// Writes save slots into a ZIP backup one at a time.
///
/// A program directory receives its ROM entry with the first save exported
/// into it; later saves landing in the same directory reuse it, with a
/// warning when their own program image is a different one.
pub struct Exporter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    /// Content record written as each directory's ROM entry.
    rom_dirs: HashMap<String, i64>,
    entry_names: HashSet<String>,
    summary: ExportSummary,
}

impl<W: Write + Seek> Exporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            rom_dirs: HashMap::new(),
            entry_names: HashSet::new(),
            summary: ExportSummary::default(),
        }
    }

    /// Export one save slot. Failures are logged and counted, not returned.
    pub fn add_save<Q: RecordQuery + ?Sized>(&mut self, db: &Q, meta: &SaveMeta) {
        match self.write_save(db, meta) {
            Ok(()) => self.summary.processed += 1,
            Err(e) => {
                warn!(
                    "Failed to export save {} of {} ({}): {e}",
                    meta.id, meta.program_name, meta.platform_id
                );
                self.summary.failed += 1;
            }
        }
    }

    /// Write the central directory and hand back the writer.
    pub fn finish(self) -> Result<(W, ExportSummary)> {
        let writer = self.zip.finish()?;
        Ok((writer, self.summary))
    }

    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(name.to_owned(), self.options)?;
        self.zip
            .write_all(bytes)
            .io_context(|| format!("Failed to write archive entry {name}"))?;
        self.entry_names.insert(name.to_owned());
        Ok(())
    }

    fn write_rom<Q: RecordQuery + ?Sized>(
        &mut self,
        db: &Q,
        dir: &str,
        meta: &SaveMeta,
    ) -> Result<()> {
        let record = db.content_record(meta.content_record_id)?.ok_or_else(|| {
            StoreError::not_found(format!("content record {}", meta.content_record_id))
        })?;
        let rom = codec::decode_record(&record)?;
        let sidecar = RomSidecar {
            program_name: meta.program_name.clone(),
            platform_id: meta.platform_id.clone(),
            content_hash: Some(ContentHash::digest(&rom).to_string()),
            size: Some(rom.len() as u64),
        };
        self.write_entry(&format!("{dir}/{ROM_JSON}"), &serde_json::to_vec_pretty(&sidecar)?)?;
        self.write_entry(&format!("{dir}/{ROM_BIN}"), &rom)?;
        self.rom_dirs.insert(dir.to_owned(), meta.content_record_id);
        Ok(())
    }

    /// Entry-name stem for a save, unique within the archive.
    fn save_stem(&self, dir: &str, stamp: &str) -> String {
        let base = format!("{dir}/{SAVE_PREFIX}{stamp}");
        let mut stem = base.clone();
        let mut n = 1;
        while self.entry_names.contains(&format!("{stem}.bin")) {
            n += 1;
            stem = format!("{base}_{n}");
        }
        stem
    }

    fn write_save<Q: RecordQuery + ?Sized>(&mut self, db: &Q, meta: &SaveMeta) -> Result<()> {
        let dir = format!(
            "{}/{}",
            sanitize_component(&meta.platform_id),
            sanitize_component(&meta.program_name)
        );
        let sidecar = SaveSidecar {
            timestamp: format_timestamp(meta.timestamp)?,
            caption: caption(&meta.program_name, meta.timestamp)?,
            program_name: meta.program_name.clone(),
            platform_id: meta.platform_id.clone(),
        };
        let stamp = file_stamp(meta.timestamp)?;
        let save = db
            .save_record(meta.save_record_id)?
            .ok_or_else(|| StoreError::not_found(format!("save record {}", meta.save_record_id)))?;
        match self.rom_dirs.get(&dir) {
            None => self.write_rom(db, &dir, meta)?,
            Some(&written) if written != meta.content_record_id => {
                warn!(
                    "Save {} of {} shares {dir} with content record {written}, \
                     its own program image (content record {}) is not exported",
                    meta.id, meta.program_name, meta.content_record_id
                );
                self.summary.rom_conflicts += 1;
            }
            Some(_) => {}
        }

        let stem = self.save_stem(&dir, &stamp);
        self.write_entry(&format!("{stem}.json"), &serde_json::to_vec_pretty(&sidecar)?)?;
        self.write_entry(&format!("{stem}.bin"), &save.payload)?;
        if let Some(screenshot) = &meta.screenshot {
            self.write_entry(&format!("{stem}.png"), screenshot)?;
        }
        debug!("Exported save {} as {stem}", meta.id);
        Ok(())
    }
}
