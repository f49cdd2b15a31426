// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! In-memory mailbox for host tests.
//!
//! Clones share state, so a test keeps one handle to play the peer core
//! while the code under test owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use super::{ChannelFull, Mailbox};

#[derive(Debug)]
struct State {
    depth: usize,
    /// Messages waiting per queue, in either direction.
    fifos: Vec<VecDeque<u32>>,
    /// Queues whose full status is forced on.
    forced_full: Vec<bool>,
    irq_enabled: Vec<bool>,
    /// Received messages not yet acknowledged.
    unacked: Vec<u32>,
    clears: Vec<u32>,
}

/// Simulated mailbox cluster.
#[derive(Debug, Clone)]
pub struct MockMailbox {
    state: Arc<Mutex<State>>,
}

impl MockMailbox {
    /// Mailbox with `queues` FIFOs of `depth` messages each.
    #[must_use]
    pub fn new(queues: u32, depth: u32) -> Self {
        let queues = queues as usize;
        Self {
            state: Arc::new(Mutex::new(State {
                depth: depth as usize,
                fifos: (0..queues).map(|_| VecDeque::new()).collect(),
                forced_full: std::vec![false; queues],
                irq_enabled: std::vec![false; queues],
                unacked: std::vec![0; queues],
                clears: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Peer side: push `value` into `queue`. Returns `false` if the FIFO is full.
    pub fn deliver(&self, queue: u32, value: u32) -> bool {
        let mut state = self.lock();
        let depth = state.depth;
        let fifo = &mut state.fifos[queue as usize];
        if fifo.len() >= depth {
            return false;
        }
        fifo.push_back(value);
        true
    }

    /// Peer side: take everything sent on `queue`.
    pub fn drain(&self, queue: u32) -> Vec<u32> {
        self.lock().fifos[queue as usize].drain(..).collect()
    }

    /// Force the full status of `queue` regardless of its fill level.
    pub fn set_full(&self, queue: u32, full: bool) {
        self.lock().forced_full[queue as usize] = full;
    }

    #[must_use]
    pub fn interrupt_enabled(&self, queue: u32) -> bool {
        self.lock().irq_enabled[queue as usize]
    }

    /// Messages received from `queue` but not yet cleared.
    #[must_use]
    pub fn unacknowledged(&self, queue: u32) -> u32 {
        self.lock().unacked[queue as usize]
    }

    /// Every `clear` call, in order.
    #[must_use]
    pub fn clears(&self) -> Vec<u32> {
        self.lock().clears.clone()
    }

    /// Whether the new-message line of `queue` is asserted.
    #[must_use]
    pub fn line_asserted(&self, queue: u32) -> bool {
        let state = self.lock();
        let q = queue as usize;
        state.irq_enabled[q] && (!state.fifos[q].is_empty() || state.unacked[q] > 0)
    }
}

impl Mailbox for MockMailbox {
    fn send(&self, queue: u32, value: u32) -> Result<(), ChannelFull> {
        let mut state = self.lock();
        let q = queue as usize;
        if state.forced_full[q] || state.fifos[q].len() >= state.depth {
            return Err(ChannelFull { queue });
        }
        state.fifos[q].push_back(value);
        Ok(())
    }

    fn receive(&self, queue: u32) -> Option<u32> {
        let mut state = self.lock();
        let q = queue as usize;
        let value = state.fifos[q].pop_front()?;
        state.unacked[q] += 1;
        Some(value)
    }

    fn message_count(&self, queue: u32) -> u32 {
        u32::try_from(self.lock().fifos[queue as usize].len()).unwrap_or(u32::MAX)
    }

    fn clear(&self, queue: u32) {
        let mut state = self.lock();
        let q = queue as usize;
        state.unacked[q] = state.unacked[q].saturating_sub(1);
        state.clears.push(queue);
    }

    fn enable_interrupt(&self, queue: u32) {
        self.lock().irq_enabled[queue as usize] = true;
    }

    fn disable_interrupt(&self, queue: u32) {
        self.lock().irq_enabled[queue as usize] = false;
    }

    fn queue_count(&self) -> u32 {
        u32::try_from(self.lock().fifos.len()).unwrap_or(u32::MAX)
    }

    fn fifo_depth(&self) -> u32 {
        u32::try_from(self.lock().depth).unwrap_or(u32::MAX)
    }
}
