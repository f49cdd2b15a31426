// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Build-time configuration.
//!
//! Everything here is `const`-constructible so a firmware image can pick a
//! board preset in a `static` and never parse anything at runtime.


use tandem_abi::Paddr;

use crate::doorbell::MAX_QUEUE_IDS;
use crate::platform::{DeviceError, Trigger};

/// How doorbell events reach the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The mailbox interrupt fills the pending set.
    Interrupt,
    /// Interrupts stay off; the poll loop reads the mailbox itself.
    BusyPoll,
}

impl Delivery {
    /// Mode selected by the `busy-poll` cargo feature.
    pub const BUILD_DEFAULT: Self = if cfg!(feature = "busy-poll") {
        Self::BusyPoll
    } else {
        Self::Interrupt
    };
}

/// Mailbox and interrupt wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Physical base of the mailbox register window.
    pub mailbox_base: Paddr,
    /// Interrupt line of our mailbox user.
    pub irq: u32,
    pub priority: u8,
    pub trigger: Trigger,
    /// Mailbox interrupt user (which enable/status bank we own).
    pub user: u32,
    /// Queue the peer kicks us on.
    pub rx_queue: u32,
    /// Queue we kick the peer on.
    pub tx_queue: u32,
    /// Valid queue ids are `0..queue_ids`.
    pub queue_ids: u32,
    pub delivery: Delivery,
}

impl NotifyConfig {
    /// TI AM64x, R5FSS0 core 0, mailbox cluster 2 user 0.
    pub const TI_AM64X_R5F: Self = Self {
        mailbox_base: Paddr::new(0x2904_0000),
        irq: 98,
        priority: 8,
        trigger: Trigger::Level,
        user: 0,
        rx_queue: 1,
        tx_queue: 0,
        queue_ids: MAX_QUEUE_IDS,
        delivery: Delivery::BUILD_DEFAULT,
    };

    #[must_use]
    pub const fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Check the configuration against a mailbox with `queue_count` queues.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::QueueOutOfRange`] if either queue does not
    /// exist, both directions share a queue, or the queue-id width exceeds
    /// the pending set.
    pub const fn validate(&self, queue_count: u32) -> Result<(), DeviceError> {
        if self.rx_queue >= queue_count || self.rx_queue == self.tx_queue {
            return Err(DeviceError::QueueOutOfRange {
                queue: self.rx_queue,
            });
        }
        if self.tx_queue >= queue_count {
            return Err(DeviceError::QueueOutOfRange {
                queue: self.tx_queue,
            });
        }
        if self.queue_ids == 0 || self.queue_ids > MAX_QUEUE_IDS {
            return Err(DeviceError::QueueOutOfRange {
                queue: self.queue_ids,
            });
        }
        Ok(())
    }
}

/// Memory layout shared with the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Physical address of the resource table.
    pub rsc_table: Paddr,
    /// Bytes reserved for the resource table.
    pub rsc_table_size: usize,
    /// Start of the shared memory window (vrings and buffers).
    pub shared_mem: Paddr,
    pub shared_mem_size: usize,
    /// Offset of the buffer pool inside the shared window.
    pub shared_buf_offset: usize,
    pub notify: NotifyConfig,
}

impl BoardConfig {
    /// TI AM64x R5F with the SDK's default DDR layout.
    pub const TI_AM64X_R5F: Self = Self {
        rsc_table: Paddr::new(0xA210_0000),
        rsc_table_size: 0x1000,
        shared_mem: Paddr::new(0xA200_0000),
        shared_mem_size: 0x10_0000,
        shared_buf_offset: 0x8000,
        notify: NotifyConfig::TI_AM64X_R5F,
    };

    /// Physical start of the shared buffer pool.
    #[must_use]
    pub const fn shared_buf(&self) -> Paddr {
        self.shared_mem.add(self.shared_buf_offset as u64)
    }

    /// Bytes from the buffer pool start to the end of the shared window.
    #[must_use]
    pub const fn shared_buf_size(&self) -> usize {
        self.shared_mem_size.saturating_sub(self.shared_buf_offset)
    }
}
