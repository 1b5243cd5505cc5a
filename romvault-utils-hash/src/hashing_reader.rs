// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

//! A reader adapter that computes a SHA-256 digest on the fly.
//!
//! Every byte read through the wrapper is fed into the digest, so archive
//! entries can be verified against their recorded hash while they are
//! being copied out.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::ContentHash;

/// Wraps a [`Read`] and hashes every byte that passes through it.
#[derive(Debug)]
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Total number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the reader and return the digest of everything read.
    pub fn finish(self) -> (u64, ContentHash) {
        (self.bytes_read, ContentHash::new(self.hasher.finalize().into()))
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}
