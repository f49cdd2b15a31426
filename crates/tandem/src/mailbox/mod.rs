// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Notification channel: a word-sized mailbox between the two cores.
//!
//! A mailbox instance has several hardware FIFOs ("queues"). Each side
//! sends on one queue and receives on another. Receiving does not
//! acknowledge the interrupt; [`Mailbox::clear`] must be called once per
//! received message.


#[cfg(any(test, feature = "std"))]
mod mock;
pub mod omap;

#[cfg(any(test, feature = "std"))]
pub use mock::MockMailbox;
pub use omap::OmapMailbox;

use core::fmt;

/// The outbound FIFO of `queue` has no room for another message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFull {
    pub queue: u32,
}

impl fmt::Display for ChannelFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mailbox queue {} full", self.queue)
    }
}

/// Register-level mailbox contract.
///
/// All methods take `&self`: the interrupt handler and the poll loop both
/// hold the same instance, and every operation is a single register access
/// (or a read-then-write on registers only one side touches).
pub trait Mailbox: Send + Sync {
    /// Write `value` to `queue` unless its FIFO is full.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelFull`] without touching the message register when
    /// the FIFO status reports full.
    fn send(&self, queue: u32, value: u32) -> Result<(), ChannelFull>;

    /// Pop one message from `queue`, or `None` if it is empty.
    fn receive(&self, queue: u32) -> Option<u32>;

    /// Number of messages waiting in `queue`.
    fn message_count(&self, queue: u32) -> u32;

    /// Acknowledge the new-message interrupt status of `queue`.
    fn clear(&self, queue: u32);

    /// Enable the new-message interrupt for `queue`. Idempotent.
    fn enable_interrupt(&self, queue: u32);

    /// Disable the new-message interrupt for `queue`. Idempotent.
    fn disable_interrupt(&self, queue: u32);

    /// Number of hardware queues.
    fn queue_count(&self) -> u32;

    /// Messages each queue can hold before reporting full.
    fn fifo_depth(&self) -> u32;
}
