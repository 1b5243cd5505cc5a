// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Key-value file store and on-disk stores.

mod common;

use common::{memory_store, state};
use romvault_store::{Config, Store};

#[tokio::test]
async fn test_file_store_roundtrip() {
    let store = memory_store();
    assert!(store.get_file("bios/scph1001.bin").await.unwrap().is_none());

    store
        .put_file("bios/scph1001.bin", b"bios".to_vec())
        .await
        .unwrap();
    store
        .put_file("catalog/homebrew.json", b"{}".to_vec())
        .await
        .unwrap();
    store
        .put_file("bios/scph1001.bin", b"bios v2".to_vec())
        .await
        .unwrap();

    let entry = store.get_file("bios/scph1001.bin").await.unwrap().unwrap();
    assert_eq!(entry.data, b"bios v2");

    let listing = store.list_files().await.unwrap();
    let keys: Vec<&str> = listing.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["bios/scph1001.bin", "catalog/homebrew.json"]);
    assert_eq!(listing[0].size, 7);

    assert!(store.delete_file("bios/scph1001.bin").await.unwrap());
    assert!(!store.delete_file("bios/scph1001.bin").await.unwrap());
    assert_eq!(store.list_files().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_store_is_ignored_by_checker() {
    let store = memory_store();
    store.put_file("orphan-looking", vec![1, 2, 3]).await.unwrap();
    assert!(store.check_consistency().await.unwrap().is_empty());
    assert_eq!(store.stats().await.unwrap(), Default::default());
}

#[tokio::test]
async fn test_open_on_disk_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        db_path: dir.path().join("romvault.sqlite"),
        ..Config::default()
    };

    let store = Store::open(config.clone()).await.unwrap();
    let id = store
        .store_state(state("nes", "Test", b"ROM", b"save"))
        .await
        .unwrap();
    drop(store);

    let reopened = Store::open(config).await.unwrap();
    let data = reopened.save_data(id).await.unwrap();
    assert_eq!(data.rom, b"ROM");
    assert_eq!(data.save.payload, b"save");
}
