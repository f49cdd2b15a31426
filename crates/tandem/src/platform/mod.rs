// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform abstraction for the remote core.
//!
//! Interrupt controller, cache, CPU and mapping capabilities are consumed
//! through [`Platform`], so the adapter runs unchanged on the target
//! ([`BarePlatform`]) and on the host ([`MockPlatform`]).


mod arch;
mod bare;
// Mock requires alloc, only available with std or test
#[cfg(any(test, feature = "std"))]
mod mock;
mod traits;

pub use bare::{BarePlatform, DirectMemory, dispatch_irq};
#[cfg(any(test, feature = "std"))]
pub use mock::{Call, LOGICAL_OFFSET, MockMemory, MockPlatform};
pub use traits::{
    CacheAttr, CacheMaintenance, Cpu, DeviceError, InterruptController, IrqFlags, IrqHandler,
    IrqReturn, MapError, MemorySpace, PagePerms, Platform, Trigger,
};
