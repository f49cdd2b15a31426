// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bare-metal platform for MMU-less remote cores.
//!
//! Memory is identity mapped (the MPU layout is fixed by the board), the
//! mailbox is reached through its physical register window, and the
//! interrupt controller and caches are board-supplied capabilities.
//!
//! The exception vector cannot capture context, so the attached handler
//! lives in a single static slot. The board's IRQ entry calls
//! [`dispatch_irq`] and signals end of interrupt to its controller.


use alloc::sync::Arc;
use core::cell::UnsafeCell;
use core::ptr::{read_volatile, with_exposed_provenance_mut, write_volatile};

use tandem_abi::{Paddr, Vaddr};

use super::arch;
use super::traits::{
    CacheMaintenance, Cpu, DeviceError, InterruptController, IrqFlags, IrqHandler, IrqReturn,
    MapError, MemorySpace, Platform, Trigger,
};
use crate::config::NotifyConfig;
use crate::mailbox::OmapMailbox;
use crate::memory::MemAttr;

// =============================================================================
// Handler Slot
// =============================================================================

struct IsrSlot(UnsafeCell<Option<(u32, Arc<dyn IrqHandler>)>>);

// SAFETY: The slot is written only with local interrupts masked and read
// only from the IRQ vector of the same core, so accesses never overlap.
unsafe impl Sync for IsrSlot {}

static ISR_SLOT: IsrSlot = IsrSlot(UnsafeCell::new(None));

/// Run the handler attached to `irq`.
///
/// Call from the IRQ exception entry with interrupts masked.
pub fn dispatch_irq(irq: u32) -> IrqReturn {
    // SAFETY: See `IsrSlot`. We are in interrupt context, so no writer runs.
    let slot = unsafe { &*ISR_SLOT.0.get() };
    match slot {
        Some((line, handler)) if *line == irq => handler.handle_irq(),
        _ => IrqReturn::NotHandled,
    }
}

fn with_slot<R>(f: impl FnOnce(&mut Option<(u32, Arc<dyn IrqHandler>)>) -> R) -> R {
    let flags = arch::irq_save_disable();
    // SAFETY: Interrupts are masked, so `dispatch_irq` cannot observe the write.
    let result = f(unsafe { &mut *ISR_SLOT.0.get() });
    arch::irq_restore(flags);
    result
}

// =============================================================================
// Memory
// =============================================================================

/// Direct access to identity-mapped memory.
#[derive(Debug)]
pub struct DirectMemory {
    _private: (),
}

impl DirectMemory {
    /// # Safety
    ///
    /// Every address passed to the accessors must be mapped and valid for
    /// the accessed length.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MemorySpace for DirectMemory {
    fn read<T: Copy>(&self, vaddr: Vaddr) -> T {
        // SAFETY: `new` contract; shared memory may change under us.
        unsafe { read_volatile(vaddr.as_ptr::<T>()) }
    }

    fn write<T>(&mut self, vaddr: Vaddr, value: T) {
        // SAFETY: `new` contract.
        unsafe { write_volatile(vaddr.as_mut_ptr::<T>(), value) }
    }

    fn slice(&self, vaddr: Vaddr, len: usize) -> &[u8] {
        if len == 0 {
            return &[];
        }
        // SAFETY: `new` contract.
        unsafe { core::slice::from_raw_parts(vaddr.as_ptr::<u8>(), len) }
    }

    fn slice_mut(&mut self, vaddr: Vaddr, len: usize) -> &mut [u8] {
        if len == 0 {
            return &mut [];
        }
        // SAFETY: `new` contract.
        unsafe { core::slice::from_raw_parts_mut(vaddr.as_mut_ptr::<u8>(), len) }
    }
}

// =============================================================================
// Platform
// =============================================================================

/// Platform for an MMU-less core with identity-mapped memory.
pub struct BarePlatform<G, C> {
    gic: G,
    cache: C,
    memory: DirectMemory,
    mailbox_claimed: bool,
}

impl<G, C> BarePlatform<G, C>
where
    G: InterruptController,
    C: CacheMaintenance,
{
    /// # Safety
    ///
    /// Must be the only instance on this core. Physical addresses handed to
    /// [`Platform::map`] and the mailbox base must be identity mapped with
    /// suitable MPU attributes.
    pub const unsafe fn new(gic: G, cache: C) -> Self {
        Self {
            gic,
            cache,
            // SAFETY: Forwarded from our own contract.
            memory: unsafe { DirectMemory::new() },
            mailbox_claimed: false,
        }
    }
}

impl<G: InterruptController, C> InterruptController for BarePlatform<G, C> {
    fn enable(&self, irq: u32, priority: u8, trigger: Trigger) {
        self.gic.enable(irq, priority, trigger);
    }

    fn disable(&self, irq: u32) {
        self.gic.disable(irq);
    }

    fn acknowledge(&self, irq: u32) {
        self.gic.acknowledge(irq);
    }
}

impl<G, C: CacheMaintenance> CacheMaintenance for BarePlatform<G, C> {
    fn writeback(&self, addr: Vaddr, len: usize) {
        self.cache.writeback(addr, len);
    }

    fn invalidate(&self, addr: Vaddr, len: usize) {
        self.cache.invalidate(addr, len);
    }

    fn enable_caches(&self) {
        self.cache.enable_caches();
    }

    fn disable_caches(&self) {
        self.cache.disable_caches();
    }
}

impl<G, C> Cpu for BarePlatform<G, C> {
    fn irq_save_disable(&self) -> IrqFlags {
        IrqFlags(arch::irq_save_disable())
    }

    fn irq_restore(&self, flags: IrqFlags) {
        arch::irq_restore(flags.0);
    }

    fn wait_for_interrupt(&self) {
        arch::wait_for_interrupt();
    }
}

impl<G, C> Platform for BarePlatform<G, C>
where
    G: InterruptController,
    C: CacheMaintenance,
{
    type Mailbox = OmapMailbox;
    type Memory = DirectMemory;

    fn claim_mailbox(&mut self, config: &NotifyConfig) -> Result<OmapMailbox, DeviceError> {
        if self.mailbox_claimed {
            return Err(DeviceError::AlreadyOwned);
        }
        let base = usize::try_from(config.mailbox_base.as_u64()).map_err(|_| DeviceError::Absent)?;
        if base == 0 {
            return Err(DeviceError::Absent);
        }
        self.mailbox_claimed = true;
        // SAFETY: `new` guarantees the mailbox window is identity mapped as
        // device memory; we hold the only claim.
        Ok(unsafe { OmapMailbox::new(with_exposed_provenance_mut(base), config.user) })
    }

    fn release_mailbox(&mut self) {
        self.mailbox_claimed = false;
    }

    fn attach_handler(
        &mut self,
        irq: u32,
        handler: Arc<dyn IrqHandler>,
    ) -> Result<(), DeviceError> {
        with_slot(|slot| {
            if slot.is_some() {
                return Err(DeviceError::AlreadyOwned);
            }
            *slot = Some((irq, handler));
            Ok(())
        })
    }

    fn detach_handler(&mut self, irq: u32) {
        let _old = with_slot(|slot| match slot {
            Some((line, _)) if *line == irq => slot.take(),
            _ => None,
        });
    }

    fn map(&mut self, phys: Paddr, size: usize, _attr: MemAttr) -> Result<Vaddr, MapError> {
        if size == 0 || phys.checked_end(size as u64).is_none() {
            return Err(MapError::InvalidRange);
        }
        Ok(Vaddr::new(phys.as_u64()))
    }

    fn unmap(&mut self, _logical: Vaddr, _size: usize) {}

    fn memory(&self) -> &DirectMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut DirectMemory {
        &mut self.memory
    }
}
