// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock platform implementation for testing.
//!
//! Simulates the interrupt controller, local interrupt mask, cache
//! maintenance and memory mapping of the remote core so the adapter and
//! the bootstrap sequence can be driven on the host. A test plays the
//! owner core through [`MockPlatform::peer_kick`] and the RAM helpers.

use core::cell::{Cell, RefCell};
use std::boxed::Box;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::vec::Vec;

use tandem_abi::{Paddr, Vaddr};

use super::traits::{
    CacheMaintenance, Cpu, DeviceError, InterruptController, IrqFlags, IrqHandler, MapError,
    MemorySpace, Platform, Trigger,
};
use crate::config::NotifyConfig;
use crate::mailbox::{Mailbox, MockMailbox};
use crate::memory::MemAttr;

/// Distance between a physical address and its mock logical address.
///
/// Large enough that confusing the two fails loudly.
pub const LOGICAL_OFFSET: u64 = 0x4000_0000_0000;

/// Upper bound on interrupt re-deliveries per unmask, to catch handlers
/// that never deassert their line.
const MAX_REDELIVERIES: usize = 64;

// =============================================================================
// Memory
// =============================================================================

struct Window {
    phys: Paddr,
    bytes: Box<[u8]>,
}

impl Window {
    fn end(&self) -> Paddr {
        self.phys.add(self.bytes.len() as u64)
    }
}

enum Backing {
    Contained(usize),
    Overlaps,
    Free,
}

/// Simulated physical RAM, addressed through mock logical addresses.
///
/// RAM is a set of disjoint windows. Contents survive unmapping, as real
/// memory would.
pub struct MockMemory {
    windows: Vec<Window>,
}

impl MockMemory {
    const fn new() -> Self {
        Self {
            windows: Vec::new(),
        }
    }

    fn backing(&self, phys: Paddr, size: usize) -> Backing {
        let end = phys.add(size as u64);
        for (index, window) in self.windows.iter().enumerate() {
            if phys >= window.phys && end <= window.end() {
                return Backing::Contained(index);
            }
            if phys < window.end() && window.phys < end {
                return Backing::Overlaps;
            }
        }
        Backing::Free
    }

    fn add_window(&mut self, phys: Paddr, size: usize) {
        self.windows.push(Window {
            phys,
            bytes: std::vec![0u8; size].into_boxed_slice(),
        });
    }

    /// Convert a physical range to (window, offset).
    #[expect(
        clippy::panic,
        reason = "test mock panics intentionally on unbacked address"
    )]
    fn locate(&self, phys: Paddr, len: usize) -> (usize, usize) {
        match self.backing(phys, len.max(1)) {
            Backing::Contained(index) => {
                let offset = phys.diff(self.windows[index].phys);
                let offset = usize::try_from(offset).unwrap_or_else(|_| {
                    panic!("physical address {phys} exceeds usize::MAX on this platform")
                });
                (index, offset)
            }
            Backing::Overlaps | Backing::Free => {
                panic!("{len} bytes at {phys} are not backed by mock RAM")
            }
        }
    }

    fn to_phys(vaddr: Vaddr) -> Paddr {
        Paddr::new(vaddr.as_u64().wrapping_sub(LOGICAL_OFFSET))
    }

    /// Bytes at a physical address (owner's view).
    #[must_use]
    pub fn phys_slice(&self, phys: Paddr, len: usize) -> &[u8] {
        if len == 0 {
            return &[];
        }
        let (index, offset) = self.locate(phys, len);
        &self.windows[index].bytes[offset..offset + len]
    }

    /// Mutable bytes at a physical address (owner's view).
    pub fn phys_slice_mut(&mut self, phys: Paddr, len: usize) -> &mut [u8] {
        if len == 0 {
            return &mut [];
        }
        let (index, offset) = self.locate(phys, len);
        &mut self.windows[index].bytes[offset..offset + len]
    }
}

impl MemorySpace for MockMemory {
    fn read<T: Copy>(&self, vaddr: Vaddr) -> T {
        let bytes = self.phys_slice(Self::to_phys(vaddr), core::mem::size_of::<T>());
        // SAFETY: `phys_slice` returned exactly size_of::<T>() bytes of our own
        // buffer. Using read_unaligned because we don't enforce alignment in the mock.
        unsafe { bytes.as_ptr().cast::<T>().read_unaligned() }
    }

    fn write<T>(&mut self, vaddr: Vaddr, value: T) {
        let bytes = self.phys_slice_mut(Self::to_phys(vaddr), core::mem::size_of::<T>());
        // SAFETY: As in `read`, for writing.
        unsafe { bytes.as_mut_ptr().cast::<T>().write_unaligned(value) }
    }

    fn slice(&self, vaddr: Vaddr, len: usize) -> &[u8] {
        self.phys_slice(Self::to_phys(vaddr), len)
    }

    fn slice_mut(&mut self, vaddr: Vaddr, len: usize) -> &mut [u8] {
        self.phys_slice_mut(Self::to_phys(vaddr), len)
    }
}

// =============================================================================
// Platform
// =============================================================================

/// One observable platform call, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    ClaimMailbox,
    ReleaseMailbox,
    Attach(u32),
    Detach(u32),
    Enable {
        irq: u32,
        priority: u8,
        trigger: Trigger,
    },
    Disable(u32),
    Acknowledge(u32),
    Map {
        phys: Paddr,
        size: usize,
        attr: MemAttr,
    },
    Unmap {
        logical: Vaddr,
        size: usize,
    },
    Writeback {
        addr: Vaddr,
        len: usize,
    },
    Invalidate {
        addr: Vaddr,
        len: usize,
    },
    CacheEnable,
    CacheDisable,
    WaitForInterrupt,
    Relax,
}

/// Host stand-in for the remote core's platform.
pub struct MockPlatform {
    mailbox: Option<MockMailbox>,
    claimed: bool,
    /// IRQ line and control queue of the claimed mailbox.
    line: Option<(u32, u32)>,
    memory: MockMemory,
    /// Live mappings, physical start to size.
    live: BTreeMap<u64, usize>,
    /// Let this many maps succeed, then fail with the error.
    fail_map: Option<(usize, MapError)>,
    reject_handlers: bool,
    handlers: BTreeMap<u32, Arc<dyn IrqHandler>>,
    enabled: RefCell<BTreeSet<u32>>,
    masked: Cell<bool>,
    pending: RefCell<BTreeSet<u32>>,
    /// Queue ids the peer kicks each time the core waits.
    wake_script: RefCell<VecDeque<u32>>,
    calls: RefCell<Vec<Call>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// Platform with an OMAP-shaped mailbox (16 queues, 4 deep).
    #[must_use]
    pub fn new() -> Self {
        Self::with_mailbox(MockMailbox::new(16, 4))
    }

    /// Platform using `mailbox`; keep a clone to act as the peer.
    #[must_use]
    pub fn with_mailbox(mailbox: MockMailbox) -> Self {
        let mut platform = Self::without_mailbox();
        platform.mailbox = Some(mailbox);
        platform
    }

    /// Platform whose mailbox is absent.
    #[must_use]
    pub fn without_mailbox() -> Self {
        Self {
            mailbox: None,
            claimed: false,
            line: None,
            memory: MockMemory::new(),
            live: BTreeMap::new(),
            fail_map: None,
            reject_handlers: false,
            handlers: BTreeMap::new(),
            enabled: RefCell::new(BTreeSet::new()),
            masked: Cell::new(false),
            pending: RefCell::new(BTreeSet::new()),
            wake_script: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Peer handle of the mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> Option<&MockMailbox> {
        self.mailbox.as_ref()
    }

    /// Add zeroed RAM at `phys`. Returns `false` if it overlaps existing RAM.
    pub fn add_ram(&mut self, phys: Paddr, size: usize) -> bool {
        match self.memory.backing(phys, size) {
            Backing::Free => {
                self.memory.add_window(phys, size);
                true
            }
            Backing::Contained(_) | Backing::Overlaps => false,
        }
    }

    /// Owner side: write `bytes` to RAM at `phys`.
    pub fn write_phys(&mut self, phys: Paddr, bytes: &[u8]) {
        self.memory
            .phys_slice_mut(phys, bytes.len())
            .copy_from_slice(bytes);
    }

    /// Owner side: read `len` bytes of RAM at `phys`.
    #[must_use]
    pub fn read_phys(&self, phys: Paddr, len: usize) -> Vec<u8> {
        self.memory.phys_slice(phys, len).to_vec()
    }

    /// Let `successes` further maps through, then fail the next with `err`.
    pub const fn fail_map_after(&mut self, successes: usize, err: MapError) {
        self.fail_map = Some((successes, err));
    }

    /// Refuse every handler attachment.
    pub const fn reject_handlers(&mut self) {
        self.reject_handlers = true;
    }

    /// Have the peer kick `queue_id` the next time the core waits.
    pub fn schedule_wake(&self, queue_id: u32) {
        self.wake_script.borrow_mut().push_back(queue_id);
    }

    /// Peer side: send `queue_id` on the control queue and raise the line.
    ///
    /// The handler runs immediately unless local interrupts are masked or
    /// the line is disabled, in which case delivery waits for the unmask.
    /// Returns `false` if the control FIFO was full.
    pub fn peer_kick(&self, queue_id: u32) -> bool {
        let Some((irq, control)) = self.line else {
            return false;
        };
        let Some(mailbox) = self.mailbox.as_ref() else {
            return false;
        };
        if !mailbox.deliver(control, queue_id) {
            return false;
        }
        self.pending.borrow_mut().insert(irq);
        self.deliver_pending();
        true
    }

    /// Every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Whether a live mapping starts at `phys`.
    #[must_use]
    pub fn is_mapped(&self, phys: Paddr) -> bool {
        self.live.contains_key(&phys.as_u64())
    }

    /// Number of live mappings.
    #[must_use]
    pub fn live_mappings(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn handler_attached(&self, irq: u32) -> bool {
        self.handlers.contains_key(&irq)
    }

    #[must_use]
    pub fn irq_enabled(&self, irq: u32) -> bool {
        self.enabled.borrow().contains(&irq)
    }

    #[must_use]
    pub const fn mailbox_claimed(&self) -> bool {
        self.claimed
    }

    #[must_use]
    pub fn interrupts_masked(&self) -> bool {
        self.masked.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn line_asserted(&self, irq: u32) -> bool {
        match (self.line, self.mailbox.as_ref()) {
            (Some((line, control)), Some(mailbox)) if line == irq => {
                mailbox.line_asserted(control)
            }
            _ => false,
        }
    }

    /// Run handlers for pending lines while the core accepts interrupts.
    fn deliver_pending(&self) {
        for _ in 0..MAX_REDELIVERIES {
            if self.masked.get() {
                return;
            }
            let ready: Vec<u32> = self
                .pending
                .borrow()
                .iter()
                .copied()
                .filter(|irq| self.enabled.borrow().contains(irq))
                .collect();
            if ready.is_empty() {
                return;
            }
            for irq in ready {
                self.pending.borrow_mut().remove(&irq);
                if !self.line_asserted(irq) {
                    continue;
                }
                if let Some(handler) = self.handlers.get(&irq).cloned() {
                    handler.handle_irq();
                    self.record(Call::Acknowledge(irq));
                }
                // Level triggered: a still-asserted line fires again.
                if self.line_asserted(irq) {
                    self.pending.borrow_mut().insert(irq);
                }
            }
        }
    }

    fn next_wake(&self) -> Option<u32> {
        self.wake_script.borrow_mut().pop_front()
    }
}

impl InterruptController for MockPlatform {
    fn enable(&self, irq: u32, priority: u8, trigger: Trigger) {
        self.record(Call::Enable {
            irq,
            priority,
            trigger,
        });
        self.enabled.borrow_mut().insert(irq);
        if self.line_asserted(irq) {
            self.pending.borrow_mut().insert(irq);
        }
        self.deliver_pending();
    }

    fn disable(&self, irq: u32) {
        self.record(Call::Disable(irq));
        self.enabled.borrow_mut().remove(&irq);
    }

    fn acknowledge(&self, irq: u32) {
        self.record(Call::Acknowledge(irq));
    }
}

impl CacheMaintenance for MockPlatform {
    fn writeback(&self, addr: Vaddr, len: usize) {
        self.record(Call::Writeback { addr, len });
    }

    fn invalidate(&self, addr: Vaddr, len: usize) {
        self.record(Call::Invalidate { addr, len });
    }

    fn enable_caches(&self) {
        self.record(Call::CacheEnable);
    }

    fn disable_caches(&self) {
        self.record(Call::CacheDisable);
    }
}

impl Cpu for MockPlatform {
    fn irq_save_disable(&self) -> IrqFlags {
        IrqFlags(usize::from(self.masked.replace(true)))
    }

    fn irq_restore(&self, flags: IrqFlags) {
        self.masked.set(flags.0 != 0);
        self.deliver_pending();
    }

    #[expect(
        clippy::panic,
        reason = "test mock panics intentionally instead of sleeping forever"
    )]
    fn wait_for_interrupt(&self) {
        self.record(Call::WaitForInterrupt);
        assert!(
            self.masked.get(),
            "wait_for_interrupt with interrupts unmasked can miss a wakeup"
        );
        let Some(queue_id) = self.next_wake() else {
            panic!("wait_for_interrupt with no wakeup scheduled");
        };
        self.peer_kick(queue_id);
    }

    #[expect(
        clippy::panic,
        reason = "test mock panics intentionally instead of spinning forever"
    )]
    fn relax(&self) {
        self.record(Call::Relax);
        let Some(queue_id) = self.next_wake() else {
            panic!("relax with no wakeup scheduled");
        };
        self.peer_kick(queue_id);
    }
}

impl Platform for MockPlatform {
    type Mailbox = MockMailbox;
    type Memory = MockMemory;

    fn claim_mailbox(&mut self, config: &NotifyConfig) -> Result<MockMailbox, DeviceError> {
        let Some(mailbox) = self.mailbox.as_ref() else {
            return Err(DeviceError::Absent);
        };
        if self.claimed {
            return Err(DeviceError::AlreadyOwned);
        }
        let mailbox = mailbox.clone();
        self.record(Call::ClaimMailbox);
        self.claimed = true;
        self.line = Some((config.irq, config.rx_queue));
        Ok(mailbox)
    }

    fn release_mailbox(&mut self) {
        if self.claimed {
            self.record(Call::ReleaseMailbox);
            self.claimed = false;
        }
    }

    fn attach_handler(
        &mut self,
        irq: u32,
        handler: Arc<dyn IrqHandler>,
    ) -> Result<(), DeviceError> {
        if self.reject_handlers || self.handlers.contains_key(&irq) {
            return Err(DeviceError::AlreadyOwned);
        }
        self.record(Call::Attach(irq));
        self.handlers.insert(irq, handler);
        Ok(())
    }

    fn detach_handler(&mut self, irq: u32) {
        if self.handlers.remove(&irq).is_some() {
            self.record(Call::Detach(irq));
        }
    }

    fn map(&mut self, phys: Paddr, size: usize, attr: MemAttr) -> Result<Vaddr, MapError> {
        self.record(Call::Map { phys, size, attr });
        if let Some((successes, err)) = self.fail_map {
            if successes == 0 {
                self.fail_map = None;
                return Err(err);
            }
            self.fail_map = Some((successes - 1, err));
        }
        if size == 0 || phys.checked_end(size as u64).is_none() {
            return Err(MapError::InvalidRange);
        }
        let end = phys.add(size as u64).as_u64();
        let clash = self
            .live
            .iter()
            .any(|(&start, &len)| start < end && phys.as_u64() < start + len as u64);
        if clash {
            return Err(MapError::AlreadyMapped);
        }
        match self.memory.backing(phys, size) {
            Backing::Contained(_) => {}
            Backing::Free => self.memory.add_window(phys, size),
            Backing::Overlaps => return Err(MapError::InvalidRange),
        }
        self.live.insert(phys.as_u64(), size);
        Ok(Vaddr::new(phys.as_u64() + LOGICAL_OFFSET))
    }

    fn unmap(&mut self, logical: Vaddr, size: usize) {
        self.record(Call::Unmap { logical, size });
        self.live.remove(&MockMemory::to_phys(logical).as_u64());
    }

    fn memory(&self) -> &MockMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut MockMemory {
        &mut self.memory
    }
}
