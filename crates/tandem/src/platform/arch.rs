// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Local interrupt mask and low-power wait for the supported cores.
//!
//! Cortex-A53 (aarch64) and Cortex-R5F (arm). Other targets get a
//! no-op mask so the crate still builds for the host.

#[cfg(target_arch = "aarch64")]
mod imp {
    use core::arch::asm;

    use aarch64_cpu::registers::{DAIF, Readable, Writeable};

    pub fn irq_save_disable() -> usize {
        let saved = DAIF.get();
        // SAFETY: Setting PSTATE.I only masks IRQs on this core.
        unsafe { asm!("msr DAIFSet, #2", options(nostack, preserves_flags)) };
        saved as usize
    }

    pub fn irq_restore(flags: usize) {
        DAIF.set(flags as u64);
    }

    pub fn wait_for_interrupt() {
        aarch64_cpu::asm::wfi();
    }
}

#[cfg(target_arch = "arm")]
mod imp {
    use core::arch::asm;

    /// CPSR.I: IRQs masked.
    const CPSR_I: usize = 1 << 7;

    pub fn irq_save_disable() -> usize {
        let cpsr: usize;
        // SAFETY: Reads CPSR and masks IRQs on this core. No memory operand;
        // the missing `nomem` keeps the compiler from moving accesses across.
        unsafe { asm!("mrs {0}, cpsr", "cpsid i", out(reg) cpsr, options(nostack, preserves_flags)) };
        cpsr
    }

    pub fn irq_restore(flags: usize) {
        if flags & CPSR_I == 0 {
            // SAFETY: Unmasks IRQs, restoring the state saved above.
            unsafe { asm!("cpsie i", options(nostack, preserves_flags)) };
        }
    }

    pub fn wait_for_interrupt() {
        // SAFETY: WFI has no side effects beyond suspending the core.
        unsafe { asm!("wfi", options(nomem, nostack, preserves_flags)) };
    }
}

#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
mod imp {
    pub const fn irq_save_disable() -> usize {
        0
    }

    pub const fn irq_restore(_flags: usize) {}

    pub fn wait_for_interrupt() {
        core::hint::spin_loop();
    }
}

pub use imp::{irq_restore, irq_save_disable, wait_for_interrupt};
