// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Doorbell demultiplexer.
//!
//! The peer signals every queue on one mailbox line and sends the queue id
//! as the message payload. The interrupt handler turns each payload into a
//! bit of [`PendingSet`]; the poll loop claims one bit per call, lowest id
//! first.
//!
//! # Protocol
//!
//! `no_kick` is `true` while the poll loop has not been told about new
//! work. The handler sets the queue bit, then stores `false`. The poll
//! loop, with local interrupts masked, swaps `no_kick` back to `true`; only
//! if it was `false` does it scan the bits. When bits remain after a claim
//! it stores `false` again so the next call drains them without waiting
//! for another interrupt.
//!
//! Outside a claim, any set bit implies `no_kick == false`, so no posted
//! id can be stranded.

#[cfg(test)]
mod doorbell_test;

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::mailbox::Mailbox;
use crate::platform::{IrqHandler, IrqReturn};

/// Width of the pending set; queue ids must be below this.
pub const MAX_QUEUE_IDS: u32 = u32::BITS;

/// Queue ids kicked by the peer and not yet reported.
#[derive(Debug)]
pub struct PendingSet {
    bits: AtomicU32,
    no_kick: AtomicBool,
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            no_kick: AtomicBool::new(true),
        }
    }

    /// Interrupt side: mark `queue_id` pending and tell the poll loop.
    ///
    /// Returns `true` if the bit was not already set. Out-of-range ids are
    /// ignored and return `false`.
    pub fn post(&self, queue_id: u32) -> bool {
        if queue_id >= MAX_QUEUE_IDS {
            return false;
        }
        let bit = 1 << queue_id;
        let previous = self.bits.fetch_or(bit, Ordering::AcqRel);
        self.no_kick.store(false, Ordering::Release);
        previous & bit == 0
    }

    /// Poll side: take the lowest pending id.
    ///
    /// Must run with local interrupts masked.
    pub fn claim(&self) -> Option<u32> {
        if self.no_kick.swap(true, Ordering::AcqRel) {
            return None;
        }
        let bits = self.bits.load(Ordering::Acquire);
        if bits == 0 {
            return None;
        }
        let queue_id = bits.trailing_zeros();
        let bit = 1 << queue_id;
        let remaining = self.bits.fetch_and(!bit, Ordering::AcqRel) & !bit;
        if remaining != 0 {
            self.no_kick.store(false, Ordering::Release);
        }
        Some(queue_id)
    }

    /// Current pending bits.
    #[must_use]
    pub fn snapshot(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    /// Whether the poll loop has been told about work it has not claimed.
    #[must_use]
    pub fn is_kicked(&self) -> bool {
        !self.no_kick.load(Ordering::Acquire)
    }

    /// Forget everything pending.
    pub fn clear(&self) {
        self.bits.store(0, Ordering::Release);
        self.no_kick.store(true, Ordering::Release);
    }
}

/// Mailbox control queue decoded into a [`PendingSet`].
///
/// Shared between the interrupt handler slot and the adapter.
#[derive(Debug)]
pub struct Doorbell<M> {
    mailbox: M,
    control_queue: u32,
    /// Payloads at or above this are not queue ids.
    width: u32,
    pending: PendingSet,
    /// Payloads outside `0..width`.
    dropped: AtomicU32,
}

impl<M: Mailbox> Doorbell<M> {
    /// Decode `control_queue`, accepting queue ids in `0..width`.
    ///
    /// `width` is capped at [`MAX_QUEUE_IDS`].
    #[must_use]
    pub const fn new(mailbox: M, control_queue: u32, width: u32) -> Self {
        Self {
            mailbox,
            control_queue,
            width: if width < MAX_QUEUE_IDS {
                width
            } else {
                MAX_QUEUE_IDS
            },
            pending: PendingSet::new(),
            dropped: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub const fn mailbox(&self) -> &M {
        &self.mailbox
    }

    #[must_use]
    pub const fn control_queue(&self) -> u32 {
        self.control_queue
    }

    /// Number of valid queue ids.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Payloads ignored because they were not valid queue ids.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Move waiting control messages into the pending set.
    ///
    /// Reads at most one FIFO's worth so the caller stays bounded, and
    /// clears the interrupt status once per message read. Returns the
    /// number of messages consumed.
    pub fn service(&self) -> u32 {
        let mut consumed = 0;
        while consumed < self.mailbox.fifo_depth() {
            let Some(queue_id) = self.mailbox.receive(self.control_queue) else {
                break;
            };
            if queue_id >= self.width {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            } else {
                self.pending.post(queue_id);
            }
            self.mailbox.clear(self.control_queue);
            consumed += 1;
        }
        consumed
    }

    /// Take the lowest pending queue id. Interrupts must be masked.
    pub fn claim(&self) -> Option<u32> {
        self.pending.claim()
    }
}

impl<M: Mailbox> IrqHandler for Doorbell<M> {
    fn handle_irq(&self) -> IrqReturn {
        if self.service() == 0 {
            IrqReturn::NotHandled
        } else {
            IrqReturn::Handled
        }
    }
}
