// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Database schema definitions for the record store.
//!
//! Cross-record links (`contentRecordId`, `saveRecordId`, `collectionId`)
//! are plain integer columns without SQL foreign keys. A dangling link is a
//! data condition reported by the integrity checker, so it has to be
//! representable.

/// Record collections and their lookup indexes.
pub const SCHEMA_SQL: &str = r#"
create table if not exists ContentRecords (
    id          integer primary key autoincrement not null,
    payload     blob not null,
    contentHash text not null,
    encoding    text not null
);

create index if not exists IndexContentHash on ContentRecords(contentHash);

create table if not exists SaveRecords (
    id      integer primary key autoincrement not null,
    payload blob not null
);

create table if not exists SaveMeta (
    id              integer primary key autoincrement not null,
    platformId      text not null,
    programName     text not null,
    screenshot      blob,
    contentRecordId integer not null,
    saveRecordId    integer not null,
    timestamp       integer not null
);

create index if not exists IndexSaveMetaContent on SaveMeta(contentRecordId);
create index if not exists IndexSaveMetaSlot on SaveMeta(platformId, programName, timestamp);

create table if not exists CollectionMeta (
    id         integer primary key autoincrement not null,
    uniqueName text not null,
    title      text not null,
    coverImage blob not null
);

create table if not exists CollectionItems (
    id              integer primary key autoincrement not null,
    collectionId    integer not null,
    platformId      text not null,
    title           text not null,
    credits         text not null,
    description     text not null,
    image           blob,
    romName         text not null,
    contentRecordId integer not null,
    launched        integer not null default 0
);

create index if not exists IndexCollectionItemsCollection on CollectionItems(collectionId);
create index if not exists IndexCollectionItemsContent on CollectionItems(contentRecordId);
"#;

/// Key-value table for platform dependency files and catalogs.
///
/// Lives beside the record collections but is never touched by the
/// integrity checker or the reference sweep.
pub const FILES_SCHEMA_SQL: &str = r#"
create table if not exists Files (
    key       text primary key not null,
    data      blob not null,
    updatedAt integer not null
);
"#;

/// Schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;
