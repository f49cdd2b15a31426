// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resource table wire format shared between a remote core and its owner.
//!
//! The owning core (typically Linux `remoteproc`) locates this table inside
//! the remote firmware image by its `.resource_table` section and reads it
//! before the remote core runs. Every layout here must match the owner's
//! loader byte for byte.
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **Stable layout**: All entries are `#[repr(C)]` made of `u32`/`u8`
//!   fields only, so there is no implicit padding
//! - **Const construction**: Firmware declares its table as a `static`
//!
//! # Modules
//!
//! - [`addr`]: Physical and logical address newtypes
//! - [`resource`]: Kind tags and entry layouts
//! - [`rpmsg`]: Ready-made table for the common one-vdev rpmsg firmware
//! - [`vring`]: Split virtqueue footprint arithmetic
//! - `builder`: Table image serializer (requires the `alloc` feature)

#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

pub mod addr;
#[cfg(any(test, feature = "alloc"))]
pub mod builder;
pub mod resource;
pub mod rpmsg;
pub mod vring;

// Re-export commonly used types at crate root
pub use addr::{Paddr, Vaddr};
#[cfg(any(test, feature = "alloc"))]
pub use builder::TableBuilder;
pub use resource::{
    ADDR_ANY, CarveoutEntry, ChecksumEntry, RprocMemEntry, ResourceKind, SUPPORTED_VERSION,
    TableHeader, TraceEntry, VIRTIO_ID_RPMSG, VdevEntry, VendorHeader, VringEntry,
};
pub use rpmsg::{RpmsgLayout, RpmsgResourceTable};
pub use vring::vring_size;
