// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resource table consumer.
//!
//! Decodes the packed, offset-addressed table into owned [`Resource`]
//! values in one pass. All offset arithmetic lives in [`parse`]; nothing
//! keeps a reference into the raw bytes afterwards.
//!
//! Checks performed:
//! - version and header reserved words
//! - header, offset array and every entry fit in `table_len`
//! - offsets do not point into the header and entries do not overlap
//! - vdev vrings and config space fit, reserved fields are zero
//! - vring notify ids are unique and fit the pending-set width

#[cfg(test)]
mod rsc_table_test;

use alloc::borrow::ToOwned;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::mem::size_of;

use tandem_abi::resource::{NAME_LEN, ResourceKind, SUPPORTED_VERSION, decode_name};
use tandem_abi::{
    ADDR_ANY, CarveoutEntry, ChecksumEntry, Paddr, RprocMemEntry, TableHeader, TraceEntry,
    VdevEntry, VendorHeader, VringEntry, vring_size,
};

use crate::doorbell::MAX_QUEUE_IDS;
use crate::error::{Error, Result, TableDefect};

// =============================================================================
// Decoded Entries
// =============================================================================

/// Physical range reserved for this core (carveout) or a peripheral (devmem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carveout {
    pub name: String,
    pub device_address: u32,
    pub phys_addr: u32,
    pub len: u32,
    pub flags: u32,
}

impl Carveout {
    /// First physical byte of the range.
    #[must_use]
    pub const fn phys_start(&self) -> Paddr {
        Paddr::from_u32(self.phys_addr)
    }

    /// One past the last physical byte of the range.
    #[must_use]
    pub const fn phys_end(&self) -> Paddr {
        Paddr::from_u32(self.phys_addr).add(self.len as u64)
    }
}

/// Diagnostic log region the owner can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBuffer {
    pub name: String,
    pub address: u32,
    pub length: u32,
}

/// One direction of a virtio device's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vring {
    /// Device address, or [`ADDR_ANY`] if the owner allocates it.
    pub device_address: u32,
    pub alignment: u32,
    pub num_descriptors: u32,
    /// Logical queue id used on the doorbell.
    pub notify_id: u32,
}

impl Vring {
    /// Whether the owner still has to fill in the device address.
    #[must_use]
    pub const fn is_addr_any(&self) -> bool {
        self.device_address == ADDR_ANY
    }

    /// Bytes the ring occupies, or `None` for a non power-of-two alignment.
    #[must_use]
    pub const fn footprint(&self) -> Option<u64> {
        vring_size(self.num_descriptors, self.alignment)
    }
}

/// Logical transport device with its vrings and config space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtioDevice {
    pub device_id: u32,
    pub notify_id: u32,
    pub device_features: u32,
    pub driver_features: u32,
    pub status: u8,
    pub vrings: Vec<Vring>,
    pub config: Vec<u8>,
}

impl VirtioDevice {
    #[must_use]
    pub fn num_vrings(&self) -> usize {
        self.vrings.len()
    }

    /// Notify ids of the vrings, in table order.
    pub fn notify_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.vrings.iter().map(|vring| vring.notify_id)
    }
}

/// Remote processor memory declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RprocMem {
    pub device_address: u32,
    pub phys_addr: u32,
    pub len: u32,
}

/// A decoded table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Carveout(Carveout),
    DevMem(Carveout),
    Trace(TraceBuffer),
    Vdev(VirtioDevice),
    RprocMem(RprocMem),
    FwChecksum { algo: [u8; 16], checksum: [u8; 64] },
    Vendor { kind: u32, payload: Vec<u8> },
}

impl Resource {
    /// Kind tag of this entry.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Carveout(_) => ResourceKind::Carveout,
            Self::DevMem(_) => ResourceKind::DevMem,
            Self::Trace(_) => ResourceKind::Trace,
            Self::Vdev(_) => ResourceKind::Vdev,
            Self::RprocMem(_) => ResourceKind::RprocMem,
            Self::FwChecksum { .. } => ResourceKind::FwChecksum,
            Self::Vendor { kind, .. } => ResourceKind::Vendor(*kind),
        }
    }
}

/// Validated, owned view of a resource table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    len: usize,
    entries: Vec<Resource>,
}

impl ParsedTable {
    /// Length in bytes of the table this was decoded from.
    #[must_use]
    pub const fn table_len(&self) -> usize {
        self.len
    }

    /// All entries in offset-array order.
    #[must_use]
    pub fn entries(&self) -> &[Resource] {
        &self.entries
    }

    /// The `index`-th entry of the given kind.
    #[must_use]
    pub fn find(&self, kind: ResourceKind, index: usize) -> Option<&Resource> {
        self.entries
            .iter()
            .filter(|entry| entry.kind() == kind)
            .nth(index)
    }

    pub fn carveouts(&self) -> impl Iterator<Item = &Carveout> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Resource::Carveout(carveout) => Some(carveout),
            _ => None,
        })
    }

    pub fn vdevs(&self) -> impl Iterator<Item = &VirtioDevice> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Resource::Vdev(vdev) => Some(vdev),
            _ => None,
        })
    }

    pub fn trace_buffers(&self) -> impl Iterator<Item = &TraceBuffer> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Resource::Trace(trace) => Some(trace),
            _ => None,
        })
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Decode and validate a resource table.
///
/// Only the first `table_len` bytes of `table` are considered.
///
/// # Errors
///
/// - [`Error::UnsupportedVersion`] if the version word is not 1
/// - [`Error::MalformedTable`] for any structural defect
/// - [`Error::DuplicateQueueId`] if two vrings share a notify id
pub fn parse(table: &[u8], table_len: usize) -> Result<ParsedTable> {
    let data = table.get(..table_len).ok_or(TableDefect::Truncated {
        needed: table_len,
        available: table.len(),
    })?;

    let header: TableHeader = read_entry(data, 0)?;
    if header.version != SUPPORTED_VERSION {
        return Err(Error::UnsupportedVersion(header.version));
    }
    if header.reserved != [0, 0] {
        return Err(TableDefect::ReservedNonZero { entry: None }.into());
    }

    let num = header.num as usize;
    let offsets_end = num
        .checked_mul(size_of::<u32>())
        .and_then(|bytes| bytes.checked_add(size_of::<TableHeader>()))
        .ok_or(TableDefect::Truncated {
            needed: usize::MAX,
            available: data.len(),
        })?;
    if offsets_end > data.len() {
        return Err(TableDefect::Truncated {
            needed: offsets_end,
            available: data.len(),
        }
        .into());
    }

    let mut entries = Vec::with_capacity(num);
    let mut extents = Vec::with_capacity(num);
    for index in 0..num {
        let offset: u32 = read_entry(data, size_of::<TableHeader>() + index * size_of::<u32>())?;
        let start = offset as usize;
        if start < offsets_end || start.saturating_add(size_of::<u32>()) > data.len() {
            return Err(TableDefect::OffsetOutOfBounds {
                entry: index,
                offset,
            }
            .into());
        }

        let (resource, end) = decode_entry(data, index, start)?;
        tracing::trace!(index, offset, kind = ?resource.kind(), "resource entry");
        extents.push((start, end, index));
        entries.push(resource);
    }

    check_overlap(&mut extents)?;
    check_notify_ids(&entries)?;

    tracing::debug!(entries = entries.len(), len = table_len, "resource table parsed");
    Ok(ParsedTable {
        len: table_len,
        entries,
    })
}

/// Decode the entry at `start`, returning it and its end offset.
fn decode_entry(data: &[u8], index: usize, start: usize) -> Result<(Resource, usize)> {
    let tag: u32 = read_entry(data, start)?;
    let kind = ResourceKind::from_u32(tag).ok_or(TableDefect::UnknownKind {
        entry: index,
        kind: tag,
    })?;
    let reserved = |nonzero: bool| {
        if nonzero {
            Err(TableDefect::ReservedNonZero { entry: Some(index) })
        } else {
            Ok(())
        }
    };

    let decoded = match kind {
        ResourceKind::Carveout | ResourceKind::DevMem => {
            let raw: CarveoutEntry = read_entry(data, start)?;
            reserved(raw.reserved != 0)?;
            let carveout = Carveout {
                name: name_of(&raw.name),
                device_address: raw.da,
                phys_addr: raw.pa,
                len: raw.len,
                flags: raw.flags,
            };
            let resource = if kind == ResourceKind::Carveout {
                Resource::Carveout(carveout)
            } else {
                Resource::DevMem(carveout)
            };
            (resource, start + size_of::<CarveoutEntry>())
        }
        ResourceKind::Trace => {
            let raw: TraceEntry = read_entry(data, start)?;
            reserved(raw.reserved != 0)?;
            let trace = TraceBuffer {
                name: name_of(&raw.name),
                address: raw.da,
                length: raw.len,
            };
            (Resource::Trace(trace), start + size_of::<TraceEntry>())
        }
        ResourceKind::Vdev => decode_vdev(data, index, start)?,
        ResourceKind::RprocMem => {
            let raw: RprocMemEntry = read_entry(data, start)?;
            reserved(raw.reserved != 0)?;
            let mem = RprocMem {
                device_address: raw.da,
                phys_addr: raw.pa,
                len: raw.len,
            };
            (Resource::RprocMem(mem), start + size_of::<RprocMemEntry>())
        }
        ResourceKind::FwChecksum => {
            let raw: ChecksumEntry = read_entry(data, start)?;
            let resource = Resource::FwChecksum {
                algo: raw.algo,
                checksum: raw.chksum,
            };
            (resource, start + size_of::<ChecksumEntry>())
        }
        ResourceKind::Vendor(kind) => {
            let raw: VendorHeader = read_entry(data, start)?;
            let payload_start = start + size_of::<VendorHeader>();
            let payload = bytes_at(data, payload_start, raw.len as usize)?;
            let resource = Resource::Vendor {
                kind,
                payload: payload.to_owned(),
            };
            (resource, payload_start + payload.len())
        }
    };
    Ok(decoded)
}

fn decode_vdev(data: &[u8], index: usize, start: usize) -> Result<(Resource, usize)> {
    let raw: VdevEntry = read_entry(data, start)?;
    if raw.reserved != [0, 0] {
        return Err(TableDefect::ReservedNonZero { entry: Some(index) }.into());
    }

    let declared = raw.num_of_vrings;
    let vrings_start = start + size_of::<VdevEntry>();
    let vrings_end = vrings_start + usize::from(declared) * size_of::<VringEntry>();
    if vrings_end > data.len() {
        return Err(TableDefect::VringCountMismatch {
            entry: index,
            declared,
        }
        .into());
    }

    let mut vrings = Vec::with_capacity(usize::from(declared));
    for n in 0..usize::from(declared) {
        let ring: VringEntry = read_entry(data, vrings_start + n * size_of::<VringEntry>())?;
        if ring.reserved != 0 {
            return Err(TableDefect::ReservedNonZero { entry: Some(index) }.into());
        }
        vrings.push(Vring {
            device_address: ring.da,
            alignment: ring.align,
            num_descriptors: ring.num,
            notify_id: ring.notifyid,
        });
    }

    let config = bytes_at(data, vrings_end, raw.config_len as usize)?;
    let end = vrings_end + config.len();
    let vdev = VirtioDevice {
        device_id: raw.id,
        notify_id: raw.notifyid,
        device_features: raw.dfeatures,
        driver_features: raw.gfeatures,
        status: raw.status,
        vrings,
        config: config.to_owned(),
    };
    Ok((Resource::Vdev(vdev), end))
}

/// Reject entries whose byte ranges intersect.
fn check_overlap(extents: &mut [(usize, usize, usize)]) -> Result<()> {
    extents.sort_unstable();
    for pair in extents.windows(2) {
        let (_, prev_end, first) = pair[0];
        let (next_start, _, second) = pair[1];
        if next_start < prev_end {
            return Err(TableDefect::EntryOverlap { first, second }.into());
        }
    }
    Ok(())
}

/// Vring notify ids must be unique across the table and fit the doorbell.
fn check_notify_ids(entries: &[Resource]) -> Result<()> {
    let mut seen = BTreeSet::new();
    let ids = entries.iter().flat_map(|entry| match entry {
        Resource::Vdev(vdev) => vdev.vrings.as_slice(),
        _ => &[][..],
    });
    for vring in ids {
        if !seen.insert(vring.notify_id) {
            return Err(Error::DuplicateQueueId(vring.notify_id));
        }
    }
    if let Some(&notify_id) = seen.iter().find(|&&id| id >= MAX_QUEUE_IDS) {
        return Err(TableDefect::NotifyIdOutOfRange { notify_id }.into());
    }
    Ok(())
}

fn name_of(raw: &[u8; NAME_LEN]) -> String {
    decode_name(raw).map_or_else(
        || {
            let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
            String::from_utf8_lossy(&raw[..end]).into_owned()
        },
        String::from,
    )
}

fn bytes_at(data: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            TableDefect::Truncated {
                needed: start.saturating_add(len),
                available: data.len(),
            }
            .into()
        })
}

/// Layouts that are valid for any bit pattern.
///
/// # Safety
///
/// Implementors must be `repr(C)` (or primitive) with only integer fields
/// and no padding.
unsafe trait Pod: Copy {}

// SAFETY: Primitive integer.
unsafe impl Pod for u32 {}
// SAFETY: `repr(C)` structs of `u32` words and `u8` name arrays.
unsafe impl Pod for TableHeader {}
// SAFETY: As above.
unsafe impl Pod for CarveoutEntry {}
// SAFETY: As above.
unsafe impl Pod for TraceEntry {}
// SAFETY: As above.
unsafe impl Pod for RprocMemEntry {}
// SAFETY: As above.
unsafe impl Pod for ChecksumEntry {}
// SAFETY: As above.
unsafe impl Pod for VendorHeader {}
// SAFETY: As above.
unsafe impl Pod for VdevEntry {}
// SAFETY: As above.
unsafe impl Pod for VringEntry {}

/// Bounds-checked unaligned read of a layout struct at `offset`.
fn read_entry<T: Pod>(data: &[u8], offset: usize) -> Result<T> {
    let bytes = bytes_at(data, offset, size_of::<T>())?;
    // SAFETY: `bytes` holds exactly size_of::<T>() initialized bytes, and
    // `T: Pod` is valid for any bit pattern.
    Ok(unsafe { read_struct(bytes) })
}

/// Read a struct from a byte slice.
///
/// # Safety
///
/// The slice must be at least `size_of::<T>()` bytes and `T` must be valid
/// for any bit pattern.
unsafe fn read_struct<T: Pod>(data: &[u8]) -> T {
    debug_assert!(data.len() >= size_of::<T>());
    // SAFETY: Caller ensures data is large enough. Table entries are only
    // 4-byte aligned relative to the table start, so read unaligned.
    unsafe { data.as_ptr().cast::<T>().read_unaligned() }
}
