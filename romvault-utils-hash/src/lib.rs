// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! Content hashing for romvault.
//!
//! A [`ContentHash`] is the SHA-256 digest of a binary payload. Its
//! lowercase hex rendering is the `contentHash` column used to deduplicate
//! program images in the record store.

use std::fmt;
use std::str::FromStr;

use data_encoding::HEXLOWER_PERMISSIVE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Digest;
use thiserror::Error;

mod hashing_reader;

pub use hashing_reader::HashingReader;

/// Size of a SHA-256 digest in bytes.
pub const SHA256_SIZE: usize = 256 / 8;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ParseHashError {
    #[error("content hash has wrong length {0} != {len}", len = SHA256_SIZE * 2)]
    WrongLength(usize),
    #[error("content hash is not valid hex: {0}")]
    BadHex(String),
}

/// SHA-256 digest of a payload.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct ContentHash([u8; SHA256_SIZE]);

impl ContentHash {
    pub const fn new(digest: [u8; SHA256_SIZE]) -> Self {
        Self(digest)
    }

    /// Returns the digest of `data`.
    ///
    /// ```
    /// # use romvault_utils_hash::ContentHash;
    /// let hash = ContentHash::digest("abc");
    /// assert_eq!(
    ///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    ///     hash.to_string()
    /// );
    /// ```
    pub fn digest<B: AsRef<[u8]>>(data: B) -> Self {
        Self(sha2::Sha256::digest(data.as_ref()).into())
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXLOWER_PERMISSIVE.encode(&self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != SHA256_SIZE * 2 {
            return Err(ParseHashError::WrongLength(s.len()));
        }
        let bytes = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|e| ParseHashError::BadHex(e.to_string()))?;
        let mut digest = [0u8; SHA256_SIZE];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
