// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resource table kind tags and entry layouts.
//!
//! A table is a header, an array of `num` byte offsets, then the entries.
//! Every entry starts with a `u32` kind tag. All multi-byte fields are in
//! the native byte order of the remote core.
//!
//! ```text
//! offset 0:  u32 version
//! offset 4:  u32 num
//! offset 8:  u32 reserved[2]
//! offset 16: u32 offset[num]
//! ...        entries
//! ```

use core::mem::size_of;

// =============================================================================
// Constants
// =============================================================================

/// The only table version the owner's loader understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// Device address placeholder the owner replaces with an allocated address.
pub const ADDR_ANY: u32 = 0xFFFF_FFFF;

/// Virtio device id of the rpmsg transport.
pub const VIRTIO_ID_RPMSG: u32 = 7;

/// rpmsg feature bit: the remote announces endpoints via name service.
pub const VIRTIO_RPMSG_F_NS: u32 = 0;

/// Length of the fixed name field in carveout and trace entries.
pub const NAME_LEN: usize = 32;

/// First tag of the vendor specific range.
pub const VENDOR_START: u32 = 128;

/// One past the last tag of the vendor specific range.
pub const VENDOR_END: u32 = 512;

// =============================================================================
// Kind Tags
// =============================================================================

/// Resource entry kind tag.
///
/// Values are fixed by convention and must match the owner's loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Physically contiguous memory the owner must leave alone.
    Carveout,
    /// Memory-mapped peripheral the owner maps for us.
    DevMem,
    /// Trace buffer the remote core logs into.
    Trace,
    /// Virtio device header, followed by its vrings and config space.
    Vdev,
    /// Remote processor memory declaration.
    RprocMem,
    /// Firmware checksum.
    FwChecksum,
    /// Vendor specific entry with a length-prefixed payload.
    Vendor(u32),
}

impl ResourceKind {
    /// Decode a kind tag.
    #[must_use]
    pub const fn from_u32(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Carveout),
            1 => Some(Self::DevMem),
            2 => Some(Self::Trace),
            3 => Some(Self::Vdev),
            4 => Some(Self::RprocMem),
            5 => Some(Self::FwChecksum),
            VENDOR_START..VENDOR_END => Some(Self::Vendor(tag)),
            _ => None,
        }
    }

    /// Encode as a kind tag.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Carveout => 0,
            Self::DevMem => 1,
            Self::Trace => 2,
            Self::Vdev => 3,
            Self::RprocMem => 4,
            Self::FwChecksum => 5,
            Self::Vendor(tag) => tag,
        }
    }
}

// =============================================================================
// Entry Layouts
// =============================================================================

/// Table header, followed by `num` `u32` entry offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TableHeader {
    pub version: u32,
    pub num: u32,
    pub reserved: [u32; 2],
}

impl TableHeader {
    /// Header for a table with `num` entries.
    #[must_use]
    pub const fn new(num: u32) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            num,
            reserved: [0; 2],
        }
    }
}

/// Carveout entry. Device memory entries share this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct CarveoutEntry {
    pub kind: u32,
    pub da: u32,
    pub pa: u32,
    pub len: u32,
    pub flags: u32,
    pub reserved: u32,
    pub name: [u8; NAME_LEN],
}

impl CarveoutEntry {
    /// Carveout of `len` bytes at device address `da`.
    #[must_use]
    pub const fn new(da: u32, pa: u32, len: u32, flags: u32, name: &str) -> Self {
        Self {
            kind: ResourceKind::Carveout.as_u32(),
            da,
            pa,
            len,
            flags,
            reserved: 0,
            name: encode_name(name),
        }
    }

    /// Device memory entry of `len` bytes at device address `da`.
    #[must_use]
    pub const fn devmem(da: u32, pa: u32, len: u32, flags: u32, name: &str) -> Self {
        let mut entry = Self::new(da, pa, len, flags, name);
        entry.kind = ResourceKind::DevMem.as_u32();
        entry
    }
}

/// Trace buffer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TraceEntry {
    pub kind: u32,
    pub da: u32,
    pub len: u32,
    pub reserved: u32,
    pub name: [u8; NAME_LEN],
}

impl TraceEntry {
    /// Trace buffer of `len` bytes at device address `da`.
    #[must_use]
    pub const fn new(da: u32, len: u32, name: &str) -> Self {
        Self {
            kind: ResourceKind::Trace.as_u32(),
            da,
            len,
            reserved: 0,
            name: encode_name(name),
        }
    }
}

/// Virtio device header.
///
/// Immediately followed by `num_of_vrings` [`VringEntry`] records and then
/// `config_len` bytes of device config space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VdevEntry {
    pub kind: u32,
    pub id: u32,
    pub notifyid: u32,
    pub dfeatures: u32,
    pub gfeatures: u32,
    pub config_len: u32,
    pub status: u8,
    pub num_of_vrings: u8,
    pub reserved: [u8; 2],
}

impl VdevEntry {
    /// Virtio device header with no config space.
    #[must_use]
    pub const fn new(id: u32, notifyid: u32, dfeatures: u32, num_of_vrings: u8) -> Self {
        Self {
            kind: ResourceKind::Vdev.as_u32(),
            id,
            notifyid,
            dfeatures,
            gfeatures: 0,
            config_len: 0,
            status: 0,
            num_of_vrings,
            reserved: [0; 2],
        }
    }
}

/// One vring of a virtio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VringEntry {
    pub da: u32,
    pub align: u32,
    pub num: u32,
    pub notifyid: u32,
    pub reserved: u32,
}

impl VringEntry {
    #[must_use]
    pub const fn new(da: u32, align: u32, num: u32, notifyid: u32) -> Self {
        Self {
            da,
            align,
            num,
            notifyid,
            reserved: 0,
        }
    }
}

/// Remote processor memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct RprocMemEntry {
    pub kind: u32,
    pub da: u32,
    pub pa: u32,
    pub len: u32,
    pub reserved: u32,
}

/// Firmware checksum entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ChecksumEntry {
    pub kind: u32,
    pub algo: [u8; 16],
    pub chksum: [u8; 64],
}

/// Vendor entry header, followed by `len` payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VendorHeader {
    pub kind: u32,
    pub len: u32,
}

const _: () = {
    assert!(size_of::<TableHeader>() == 16);
    assert!(size_of::<CarveoutEntry>() == 56);
    assert!(size_of::<TraceEntry>() == 48);
    assert!(size_of::<VdevEntry>() == 28);
    assert!(size_of::<VringEntry>() == 20);
    assert!(size_of::<RprocMemEntry>() == 20);
    assert!(size_of::<ChecksumEntry>() == 84);
    assert!(size_of::<VendorHeader>() == 8);
};

/// Copy `name` into a NUL padded fixed field, truncating to fit.
///
/// The last byte is always NUL so the owner can treat it as a C string.
#[must_use]
pub const fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let bytes = name.as_bytes();
    let mut out = [0u8; NAME_LEN];
    let mut i = 0;
    while i < bytes.len() && i < NAME_LEN - 1 {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

/// Decode a NUL padded name field, stopping at the first NUL.
///
/// Returns `None` if the bytes before the NUL are not UTF-8.
#[must_use]
pub fn decode_name(raw: &[u8; NAME_LEN]) -> Option<&str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    core::str::from_utf8(&raw[..end]).ok()
}
