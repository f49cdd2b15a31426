// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Tandem
//!
//! Bootstrap and notification layer for a remote processor core that shares
//! nothing with its owner except a block of physical memory and a mailbox.
//!
//! This crate provides:
//! - A resource table consumer that decodes the owner-visible descriptor
//!   into owned, validated entries
//! - A register adapter for the OMAP-style mailbox found on TI K3 parts
//! - The doorbell demultiplexer that turns one shared "new message"
//!   interrupt into per-queue events for the poll loop
//! - The platform adapter (`RemoteProc`) exposing map / notify /
//!   poll-or-wait to a virtqueue transport
//! - The bootstrap sequence that wires a table into a ready [`Handle`]
//!
//! Per-SoC interrupt controller, cache and CPU primitives are consumed
//! through the traits in [`platform`]; a mock implementation makes the
//! whole stack testable on the host.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod bootstrap;
pub mod config;
pub mod doorbell;
pub mod error;
pub mod mailbox;
pub mod memory;
pub mod platform;
pub mod remoteproc;
pub mod rsc_table;
pub mod trace;

// Re-export commonly used types at crate root
pub use bootstrap::{Channel, Handle, bootstrap};
pub use config::{BoardConfig, Delivery, NotifyConfig};
pub use error::{Error, Result};
pub use remoteproc::{QueueEvent, RemoteProc, State, WaitMode};
pub use rsc_table::{ParsedTable, parse};
pub use tandem_abi::{Paddr, Vaddr};

/// Crate version.
pub const VERSION: &str = match option_env!("TANDEM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
