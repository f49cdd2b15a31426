// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! OMAP-style mailbox (TI K3 "system mailbox") register adapter.
//!
//! Uses MMIO to access the mailbox cluster. The register window must be
//! mapped (device memory, non-shared) before construction.
//!
//! Per-user interrupt registers carry two bits per queue: bit `2q` is
//! "new message" and bit `2q + 1` is "not full".

use core::ptr::{read_volatile, write_volatile};

use super::{ChannelFull, Mailbox};

/// Revision register offset.
const REVISION: usize = 0x000;

/// First message register; one word per queue.
const MESSAGE: usize = 0x040;

/// First FIFO status register; one word per queue.
const FIFO_STATUS: usize = 0x080;

/// First message status register; one word per queue.
const MSG_STATUS: usize = 0x0C0;

/// Per-user raw interrupt status.
const IRQ_STATUS_RAW: usize = 0x100;

/// Per-user interrupt status clear (write 1 to clear).
const IRQ_STATUS_CLR: usize = 0x104;

/// Per-user interrupt enable set.
const IRQ_ENABLE_SET: usize = 0x108;

/// Per-user interrupt enable clear.
const IRQ_ENABLE_CLR: usize = 0x10C;

/// Distance between consecutive users' interrupt register blocks.
const IRQ_USER_STRIDE: usize = 0x10;

/// End-of-interrupt register.
const IRQ_EOI: usize = 0x140;

/// FIFO status bit: queue full.
const FIFO_FULL: u32 = 1 << 0;

/// Message status field: number of queued messages.
const MSG_COUNT_MASK: u32 = 0x3F;

/// Queues per mailbox cluster.
pub const QUEUE_COUNT: u32 = 16;

/// Messages per queue FIFO.
pub const FIFO_DEPTH: u32 = 4;

/// Bytes covered by the register window.
pub const REGISTER_SPAN: usize = 0x200;

/// Mailbox cluster driver for one interrupt user.
#[derive(Debug)]
pub struct OmapMailbox {
    /// Address of the mapped register window.
    base: *mut u32,
    /// Interrupt user (0..4) whose enable/status registers we own.
    user: usize,
}

// SAFETY: Every access is a single aligned volatile word access to device
// memory; the hardware serializes them. No Rust-visible state is shared.
unsafe impl Send for OmapMailbox {}

// SAFETY: See `Send`. `&self` methods never hand out references into the window.
unsafe impl Sync for OmapMailbox {}

impl OmapMailbox {
    /// Create a driver for the cluster mapped at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to [`REGISTER_SPAN`] bytes of mapped, word-aligned
    /// mailbox registers that stay mapped for the lifetime of the driver.
    #[must_use]
    pub const unsafe fn new(base: *mut u32, user: u32) -> Self {
        Self {
            base,
            user: user as usize,
        }
    }

    /// Address of the register window.
    #[must_use]
    pub const fn base(&self) -> *mut u32 {
        self.base
    }

    /// Hardware revision word.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.read(REVISION)
    }

    /// Whether the raw new-message status of `queue` is set for our user.
    #[must_use]
    pub fn new_message_pending(&self, queue: u32) -> bool {
        self.read(self.user_reg(IRQ_STATUS_RAW)) & new_message_bit(queue) != 0
    }

    /// Signal end of interrupt so a still-pending condition re-asserts the line.
    pub fn end_of_interrupt(&self) {
        self.write(IRQ_EOI, self.user as u32);
    }

    fn user_reg(&self, offset: usize) -> usize {
        offset + self.user * IRQ_USER_STRIDE
    }

    #[expect(
        clippy::cast_ptr_alignment,
        reason = "offsets are multiples of 4 from a word-aligned base"
    )]
    fn reg(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset < REGISTER_SPAN && offset % 4 == 0);
        self.base.cast::<u8>().wrapping_add(offset).cast::<u32>()
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the window is mapped and `offset` stays
        // within REGISTER_SPAN for every register constant above.
        unsafe { read_volatile(self.reg(offset)) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: As in `read`.
        unsafe { write_volatile(self.reg(offset), value) }
    }
}

impl Mailbox for OmapMailbox {
    fn send(&self, queue: u32, value: u32) -> Result<(), ChannelFull> {
        if self.read(queue_reg(FIFO_STATUS, queue)) & FIFO_FULL != 0 {
            return Err(ChannelFull { queue });
        }
        self.write(queue_reg(MESSAGE, queue), value);
        Ok(())
    }

    fn receive(&self, queue: u32) -> Option<u32> {
        if self.message_count(queue) == 0 {
            return None;
        }
        Some(self.read(queue_reg(MESSAGE, queue)))
    }

    fn message_count(&self, queue: u32) -> u32 {
        self.read(queue_reg(MSG_STATUS, queue)) & MSG_COUNT_MASK
    }

    fn clear(&self, queue: u32) {
        self.write(self.user_reg(IRQ_STATUS_CLR), new_message_bit(queue));
    }

    fn enable_interrupt(&self, queue: u32) {
        self.write(self.user_reg(IRQ_ENABLE_SET), new_message_bit(queue));
    }

    fn disable_interrupt(&self, queue: u32) {
        self.write(self.user_reg(IRQ_ENABLE_CLR), new_message_bit(queue));
    }

    fn queue_count(&self) -> u32 {
        QUEUE_COUNT
    }

    fn fifo_depth(&self) -> u32 {
        FIFO_DEPTH
    }
}

const fn queue_reg(base: usize, queue: u32) -> usize {
    base + (queue % QUEUE_COUNT) as usize * 4
}

const fn new_message_bit(queue: u32) -> u32 {
    1 << ((queue % QUEUE_COUNT) * 2)
}
