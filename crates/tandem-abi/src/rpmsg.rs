// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Resource table for the common rpmsg firmware shape.
//!
//! One rpmsg virtio device with a TX and an RX vring, plus a trace buffer.
//! Firmware places it in the section the owner's loader searches:
//!
//! ```ignore
//! #[unsafe(link_section = ".resource_table")]
//! #[used]
//! static RESOURCE_TABLE: RpmsgResourceTable =
//!     RpmsgResourceTable::new(RpmsgLayout::TI_AM64X_R5F, TRACE_BUFFER_DA);
//! ```

use core::mem::{offset_of, size_of};

use crate::resource::{
    ADDR_ANY, TableHeader, TraceEntry, VIRTIO_ID_RPMSG, VIRTIO_RPMSG_F_NS, VdevEntry, VringEntry,
};

/// Number of entries in [`RpmsgResourceTable`].
pub const RPMSG_TABLE_ENTRIES: usize = 2;

/// Vring and trace parameters of an [`RpmsgResourceTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpmsgLayout {
    /// Notify id of the vdev itself.
    pub vdev_notify_id: u32,
    /// TX vring device address, or [`ADDR_ANY`].
    pub tx_da: u32,
    /// RX vring device address, or [`ADDR_ANY`].
    pub rx_da: u32,
    pub vring_align: u32,
    pub vring_num: u32,
    pub tx_notify_id: u32,
    pub rx_notify_id: u32,
    pub trace_len: u32,
    pub trace_name: &'static str,
}

impl RpmsgLayout {
    /// TI AM64x R5F core 0: vrings allocated by the owner.
    pub const TI_AM64X_R5F: Self = Self {
        vdev_notify_id: 31,
        tx_da: ADDR_ANY,
        rx_da: ADDR_ANY,
        vring_align: 0x1000,
        vring_num: 256,
        tx_notify_id: 1,
        rx_notify_id: 2,
        trace_len: 4 * 1024,
        trace_name: "trace:r5fss0_0",
    };
}

/// Statically placed rpmsg resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(256))]
pub struct RpmsgResourceTable {
    pub header: TableHeader,
    pub offsets: [u32; RPMSG_TABLE_ENTRIES],
    pub vdev: VdevEntry,
    pub vrings: [VringEntry; 2],
    pub trace: TraceEntry,
}

impl RpmsgResourceTable {
    /// Build the table. `trace_da` is the address of the trace buffer.
    #[must_use]
    pub const fn new(layout: RpmsgLayout, trace_da: u32) -> Self {
        Self {
            header: TableHeader::new(RPMSG_TABLE_ENTRIES as u32),
            offsets: [
                offset_of!(Self, vdev) as u32,
                offset_of!(Self, trace) as u32,
            ],
            vdev: VdevEntry::new(
                VIRTIO_ID_RPMSG,
                layout.vdev_notify_id,
                1 << VIRTIO_RPMSG_F_NS,
                2,
            ),
            vrings: [
                VringEntry::new(
                    layout.tx_da,
                    layout.vring_align,
                    layout.vring_num,
                    layout.tx_notify_id,
                ),
                VringEntry::new(
                    layout.rx_da,
                    layout.vring_align,
                    layout.vring_num,
                    layout.rx_notify_id,
                ),
            ],
            trace: TraceEntry::new(trace_da, layout.trace_len, layout.trace_name),
        }
    }

    /// Size of the meaningful part of the table, without tail padding.
    #[must_use]
    pub const fn used_len() -> usize {
        offset_of!(Self, trace) + size_of::<TraceEntry>()
    }

    /// View the table as the bytes the owner reads.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let ptr = core::ptr::from_ref(self).cast::<u8>();
        // SAFETY: The struct is repr(C) built only from u32/u8 fields with no
        // padding before `used_len()`, so every byte in that prefix is initialized.
        unsafe { core::slice::from_raw_parts(ptr, Self::used_len()) }
    }
}

const _: () = {
    assert!(offset_of!(RpmsgResourceTable, vdev) == 24);
    assert!(offset_of!(RpmsgResourceTable, vrings) == 52);
    assert!(offset_of!(RpmsgResourceTable, trace) == 92);
};
