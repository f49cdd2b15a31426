// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform capability traits.
//!
//! The per-SoC pieces this crate only consumes: interrupt controller,
//! cache maintenance, CPU interrupt masking and low-power wait, mailbox
//! ownership and the memory-mapping collaborator.

use alloc::sync::Arc;
use core::fmt;

use tandem_abi::{Paddr, Vaddr};

use crate::config::NotifyConfig;
use crate::mailbox::Mailbox;
use crate::memory::MemAttr;

/// Byte-level access to mapped memory.
///
/// Lets bootstrap and trace code touch shared memory without knowing
/// whether it is real memory or a host test buffer.
pub trait MemorySpace {
    /// Read a value from a logical address.
    fn read<T: Copy>(&self, vaddr: Vaddr) -> T;

    /// Write a value to a logical address.
    fn write<T>(&mut self, vaddr: Vaddr, value: T);

    /// Get a byte slice at a logical address.
    fn slice(&self, vaddr: Vaddr, len: usize) -> &[u8];

    /// Get a mutable byte slice at a logical address.
    fn slice_mut(&mut self, vaddr: Vaddr, len: usize) -> &mut [u8];

    /// Zero out a range of memory.
    fn zero(&mut self, vaddr: Vaddr, len: usize) {
        self.slice_mut(vaddr, len).fill(0);
    }
}

/// Access permissions of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePerms {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl PagePerms {
    /// Read-only permissions.
    pub const RO: Self = Self {
        read: true,
        write: false,
        execute: false,
    };

    /// Read-write permissions.
    pub const RW: Self = Self {
        read: true,
        write: true,
        execute: false,
    };

    /// Read-execute permissions.
    pub const RX: Self = Self {
        read: true,
        write: false,
        execute: true,
    };
}

/// Cache attributes of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAttr {
    /// Normal cached memory.
    Cached,
    /// Normal memory, uncached (shared rings and buffers).
    Uncached,
    /// Device memory (strongly ordered, for MMIO).
    Device,
}

/// Errors from the memory-mapping collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Range overlaps an existing mapping without being contained in it.
    AlreadyMapped,
    /// Out of MPU regions or page tables.
    InsufficientResources,
    /// Address is not properly aligned.
    MisalignedAddress,
    /// Zero length, or the range wraps the address space.
    InvalidRange,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "range already mapped"),
            Self::InsufficientResources => write!(f, "insufficient resources"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
            Self::InvalidRange => write!(f, "invalid range"),
        }
    }
}

/// Why the mailbox device could not be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// No mailbox at the configured address.
    Absent,
    /// Another owner holds the mailbox or its interrupt line.
    AlreadyOwned,
    /// Configured queue does not exist on this mailbox.
    QueueOutOfRange { queue: u32 },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "device absent"),
            Self::AlreadyOwned => write!(f, "device already owned"),
            Self::QueueOutOfRange { queue } => write!(f, "queue {queue} out of range"),
        }
    }
}

/// Interrupt trigger mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Level,
    RisingEdge,
}

/// Whether a handler recognized the interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    Handled,
    NotHandled,
}

/// Interrupt-context callback.
///
/// Runs to completion with its own line masked; must never block.
pub trait IrqHandler: Send + Sync {
    fn handle_irq(&self) -> IrqReturn;
}

/// Saved local interrupt mask, restored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqFlags(pub usize);

/// Generic interrupt controller.
pub trait InterruptController {
    fn enable(&self, irq: u32, priority: u8, trigger: Trigger);
    fn disable(&self, irq: u32);
    /// Signal end of handling for `irq`.
    fn acknowledge(&self, irq: u32);
}

/// Cache maintenance over logical ranges.
pub trait CacheMaintenance {
    /// Write dirty lines back to memory.
    fn writeback(&self, addr: Vaddr, len: usize);
    /// Drop lines so the next read sees memory.
    fn invalidate(&self, addr: Vaddr, len: usize);
    fn enable_caches(&self);
    fn disable_caches(&self);
}

/// Local CPU primitives.
pub trait Cpu {
    /// Mask local interrupts, returning the previous mask.
    fn irq_save_disable(&self) -> IrqFlags;

    /// Restore a mask returned by [`Cpu::irq_save_disable`].
    fn irq_restore(&self, flags: IrqFlags);

    /// Low-power wait until an interrupt is pending.
    ///
    /// Wakes on a pending interrupt even while interrupts are masked.
    fn wait_for_interrupt(&self);

    /// Busy-wait hint for polling loops.
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

/// Everything the platform adapter needs from the target.
pub trait Platform: InterruptController + CacheMaintenance + Cpu {
    /// Mailbox driver handed out by [`Platform::claim_mailbox`].
    type Mailbox: Mailbox + 'static;

    /// View of mapped memory.
    type Memory: MemorySpace;

    /// Take exclusive ownership of the mailbox described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox is absent or already owned.
    fn claim_mailbox(&mut self, config: &NotifyConfig) -> Result<Self::Mailbox, DeviceError>;

    /// Give the mailbox back. Idempotent.
    fn release_mailbox(&mut self);

    /// Route `irq` to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::AlreadyOwned`] if `irq` already has a handler.
    fn attach_handler(&mut self, irq: u32, handler: Arc<dyn IrqHandler>)
    -> Result<(), DeviceError>;

    /// Remove the handler of `irq`. Idempotent.
    fn detach_handler(&mut self, irq: u32);

    /// Make `size` bytes at `phys` locally addressable.
    ///
    /// # Errors
    ///
    /// Returns an error if the range cannot be mapped.
    fn map(&mut self, phys: Paddr, size: usize, attr: MemAttr) -> Result<Vaddr, MapError>;

    /// Tear down a mapping created by [`Platform::map`].
    fn unmap(&mut self, logical: Vaddr, size: usize);

    fn memory(&self) -> &Self::Memory;

    fn memory_mut(&mut self) -> &mut Self::Memory;
}

// Compile-time verification of PagePerms constants
const _: () = {
    assert!(PagePerms::RO.read);
    assert!(!PagePerms::RO.write);

    assert!(PagePerms::RW.read);
    assert!(PagePerms::RW.write);
    assert!(!PagePerms::RW.execute);

    assert!(!PagePerms::RX.write);
    assert!(PagePerms::RX.execute);
};
