// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resource table image builder.
//!
//! Serializes entries into a contiguous table image with a correct header
//! and offset array. Used by host tooling that emits tables for firmware
//! without a static layout, and by tests that need arbitrary tables.

use alloc::vec::Vec;
use core::mem::size_of;

use crate::resource::{
    CarveoutEntry, ChecksumEntry, RprocMemEntry, SUPPORTED_VERSION, TableHeader, TraceEntry,
    VdevEntry, VendorHeader, VringEntry,
};

/// Incrementally assembles a resource table image.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    version: Option<u32>,
    reserved: [u32; 2],
    entries: Vec<Vec<u8>>,
}

impl TableBuilder {
    /// Start an empty table of the supported version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the header version.
    #[must_use]
    pub const fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Override the header reserved words.
    #[must_use]
    pub const fn reserved(mut self, reserved: [u32; 2]) -> Self {
        self.reserved = reserved;
        self
    }

    #[must_use]
    pub fn carveout(self, entry: CarveoutEntry) -> Self {
        self.entry(bytes_of(&entry))
    }

    #[must_use]
    pub fn trace(self, entry: TraceEntry) -> Self {
        self.entry(bytes_of(&entry))
    }

    #[must_use]
    pub fn rproc_mem(self, entry: RprocMemEntry) -> Self {
        self.entry(bytes_of(&entry))
    }

    #[must_use]
    pub fn checksum(self, entry: ChecksumEntry) -> Self {
        self.entry(bytes_of(&entry))
    }

    /// Append a virtio device with its vrings and config space.
    ///
    /// `config_len` is taken from `config`; `num_of_vrings` is written as
    /// given so callers can describe inconsistent devices.
    #[must_use]
    pub fn vdev(self, mut entry: VdevEntry, vrings: &[VringEntry], config: &[u8]) -> Self {
        entry.config_len = u32::try_from(config.len()).unwrap_or(u32::MAX);
        let mut bytes = Vec::from(bytes_of(&entry));
        for vring in vrings {
            bytes.extend_from_slice(bytes_of(vring));
        }
        bytes.extend_from_slice(config);
        self.entry(&bytes)
    }

    /// Append a vendor entry with its payload.
    #[must_use]
    pub fn vendor(self, kind: u32, payload: &[u8]) -> Self {
        let header = VendorHeader {
            kind,
            len: u32::try_from(payload.len()).unwrap_or(u32::MAX),
        };
        let mut bytes = Vec::from(bytes_of(&header));
        bytes.extend_from_slice(payload);
        self.entry(&bytes)
    }

    /// Append pre-serialized entry bytes.
    #[must_use]
    pub fn entry(mut self, bytes: &[u8]) -> Self {
        self.entries.push(Vec::from(bytes));
        self
    }

    /// Number of entries appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offsets the entries will land at in the built image.
    #[must_use]
    pub fn offsets(&self) -> Vec<u32> {
        let mut cursor = size_of::<TableHeader>() + self.entries.len() * size_of::<u32>();
        self.entries
            .iter()
            .map(|entry| {
                let offset = cursor;
                cursor += entry.len();
                u32::try_from(offset).unwrap_or(u32::MAX)
            })
            .collect()
    }

    /// Serialize the table image.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let header = TableHeader {
            version: self.version.unwrap_or(SUPPORTED_VERSION),
            num: u32::try_from(self.entries.len()).unwrap_or(u32::MAX),
            reserved: self.reserved,
        };

        let mut image = Vec::from(bytes_of(&header));
        for offset in self.offsets() {
            image.extend_from_slice(&offset.to_ne_bytes());
        }
        for entry in &self.entries {
            image.extend_from_slice(entry);
        }
        image
    }
}

/// View a table layout struct as its raw bytes.
///
/// Only called with this crate's entry layouts, which are `repr(C)` and
/// consist of `u32`/`u8` fields without padding.
fn bytes_of<T: Copy>(value: &T) -> &[u8] {
    let ptr = core::ptr::from_ref(value).cast::<u8>();
    // SAFETY: `value` is a live reference to a padding-free layout struct, so
    // all `size_of::<T>()` bytes are initialized and borrowed for the same lifetime.
    unsafe { core::slice::from_raw_parts(ptr, size_of::<T>()) }
}
