// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba};
use romvault_store::{Config, NewCollection, NewCollectionEntry, NewSaveState, Store};
use romvault_store_db::StoreDb;

pub fn memory_store() -> Store {
    memory_store_with(Config::default())
}

pub fn memory_store_with(config: Config) -> Store {
    Store::from_db(StoreDb::open_memory().unwrap(), config)
}

pub fn state(platform: &str, program: &str, rom: &[u8], save: &[u8]) -> NewSaveState {
    NewSaveState {
        platform_id: platform.into(),
        program_name: program.into(),
        save: save.to_vec(),
        rom: rom.to_vec(),
        screenshot: None,
    }
}

pub fn entry(title: &str, rom: &[u8]) -> NewCollectionEntry {
    NewCollectionEntry {
        platform_id: "nes".into(),
        title: title.into(),
        credits: "Homebrew".into(),
        description: format!("{title} description"),
        image: None,
        rom_name: format!("{title}.nes"),
        rom: rom.to_vec(),
    }
}

pub fn collection(name: &str, items: Vec<NewCollectionEntry>) -> NewCollection {
    NewCollection {
        unique_name: name.into(),
        title: name.to_uppercase(),
        cover_image: png(2, 2),
        items,
    }
}

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
