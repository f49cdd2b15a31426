// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Startup wiring from resource table to a ready channel set.
//!
//! Runs once, synchronously:
//!
//! 1. Read the resource table (invalidated first, the owner wrote it)
//! 2. Parse it
//! 3. `init` the adapter: claim the mailbox, register every vring id
//! 4. Map the table region and the shared memory window
//! 5. Map every vring with a concrete address and the trace buffer
//!
//! Any failure removes the adapter, which unmaps everything mapped so
//! far, and hands the platform back with the error.


use alloc::vec::Vec;
use core::fmt;

use tandem_abi::{ADDR_ANY, Paddr};
use tracing::{info, warn};

use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::memory::{MappedRegion, MemAttr};
use crate::platform::{MapError, MemorySpace, Platform};
use crate::remoteproc::RemoteProc;
use crate::rsc_table::{ParsedTable, parse};
use crate::trace::TraceLog;

/// One vring as the transport layer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Position of the owning vdev among the table's vdevs.
    pub vdev_index: usize,
    /// Position of the vring within its vdev.
    pub vring_index: usize,
    pub notify_id: u32,
    pub device_address: u32,
    pub num_descriptors: u32,
    pub alignment: u32,
}

impl Channel {
    /// Whether the owner has yet to assign the ring's address.
    #[must_use]
    pub const fn is_addr_any(&self) -> bool {
        self.device_address == ADDR_ANY
    }
}

/// Bootstrap failed; everything acquired has been released.
pub struct Aborted<P> {
    pub error: Error,
    /// The platform, with nothing claimed or mapped.
    pub platform: P,
}

impl<P> fmt::Debug for Aborted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aborted")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<P> fmt::Display for Aborted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bootstrap aborted: {}", self.error)
    }
}

impl<P> From<Aborted<P>> for Error {
    fn from(aborted: Aborted<P>) -> Self {
        aborted.error
    }
}

/// Everything the transport layer needs after a successful bootstrap.
pub struct Handle<P: Platform> {
    rproc: RemoteProc<P>,
    board: BoardConfig,
    table: ParsedTable,
    table_region: MappedRegion,
    shared_buffers: MappedRegion,
    trace: Option<MappedRegion>,
    channels: Vec<Channel>,
}

impl<P: Platform> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("state", &self.rproc.state())
            .field("table_region", &self.table_region)
            .field("shared_buffers", &self.shared_buffers)
            .field("trace", &self.trace)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> Handle<P> {
    #[must_use]
    pub const fn remote_proc(&self) -> &RemoteProc<P> {
        &self.rproc
    }

    pub const fn remote_proc_mut(&mut self) -> &mut RemoteProc<P> {
        &mut self.rproc
    }

    #[must_use]
    pub const fn board(&self) -> &BoardConfig {
        &self.board
    }

    #[must_use]
    pub const fn table(&self) -> &ParsedTable {
        &self.table
    }

    /// Mapping of the resource table itself.
    #[must_use]
    pub const fn table_region(&self) -> &MappedRegion {
        &self.table_region
    }

    /// Every vring of every vdev, in table order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// The channel whose vring uses `notify_id`.
    #[must_use]
    pub fn channel(&self, notify_id: u32) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.notify_id == notify_id)
    }

    /// The buffer pool, from the pool offset to the end of the shared window.
    #[must_use]
    pub const fn shared_buffers(&self) -> &MappedRegion {
        &self.shared_buffers
    }

    /// Mapping of the first trace buffer, if the table declares one.
    #[must_use]
    pub const fn trace_region(&self) -> Option<&MappedRegion> {
        self.trace.as_ref()
    }

    /// Writer over the trace buffer.
    pub fn trace_log(&mut self) -> Option<TraceLog<'_>> {
        let region = self.trace?;
        let bytes = self
            .rproc
            .platform_mut()
            .memory_mut()
            .slice_mut(region.logical, region.size);
        Some(TraceLog::new(bytes))
    }

    /// Tear everything down and return the platform.
    ///
    /// # Errors
    ///
    /// Propagates [`RemoteProc::remove`].
    pub fn shutdown(mut self) -> Result<P> {
        self.rproc.remove()?;
        Ok(self.rproc.into_platform())
    }
}

/// Bring up the channel described by the resource table at
/// `board.rsc_table`.
///
/// # Errors
///
/// Returns [`Aborted`] carrying the first error and the platform, with
/// nothing left claimed or mapped.
pub fn bootstrap<P: Platform>(
    mut platform: P,
    board: &BoardConfig,
) -> core::result::Result<Handle<P>, Aborted<P>> {
    let table = match read_table(&mut platform, board) {
        Ok(table) => table,
        Err(error) => {
            warn!(%error, table = %board.rsc_table, "resource table rejected");
            return Err(Aborted { error, platform });
        }
    };

    let mut rproc = RemoteProc::new(platform);
    match wire(&mut rproc, board, &table) {
        Ok((table_region, shared_buffers, trace, channels)) => {
            info!(
                channels = channels.len(),
                trace = trace.is_some(),
                "bootstrap complete"
            );
            Ok(Handle {
                rproc,
                board: *board,
                table,
                table_region,
                shared_buffers,
                trace,
                channels,
            })
        }
        Err(error) => {
            warn!(%error, state = ?rproc.state(), "bootstrap aborted, releasing");
            if let Err(err) = rproc.remove() {
                warn!(%err, "release after failed bootstrap incomplete");
            }
            Err(Aborted {
                error,
                platform: rproc.into_platform(),
            })
        }
    }
}

/// Copy and parse the table through a temporary mapping.
fn read_table<P: Platform>(platform: &mut P, board: &BoardConfig) -> Result<ParsedTable> {
    let size = board.rsc_table_size;
    let window = platform.map(board.rsc_table, size, MemAttr::SHARED_UNCACHED)?;
    platform.invalidate(window, size);
    let bytes = platform.memory().slice(window, size).to_vec();
    platform.unmap(window, size);
    parse(&bytes, size)
}

type Wired = (MappedRegion, MappedRegion, Option<MappedRegion>, Vec<Channel>);

fn wire<P: Platform>(
    rproc: &mut RemoteProc<P>,
    board: &BoardConfig,
    table: &ParsedTable,
) -> Result<Wired> {
    rproc.init(table, &board.notify)?;

    let table_region = map_exact(rproc, board.rsc_table, board.rsc_table_size)?;
    map_exact(rproc, board.shared_mem, board.shared_mem_size)?;
    let shared_buffers = map_exact(rproc, board.shared_buf(), board.shared_buf_size())?;

    let mut channels = Vec::new();
    for (vdev_index, vdev) in table.vdevs().enumerate() {
        for (vring_index, vring) in vdev.vrings.iter().enumerate() {
            let channel = Channel {
                vdev_index,
                vring_index,
                notify_id: vring.notify_id,
                device_address: vring.device_address,
                num_descriptors: vring.num_descriptors,
                alignment: vring.alignment,
            };
            if !channel.is_addr_any() {
                let size = vring
                    .footprint()
                    .and_then(|size| usize::try_from(size).ok())
                    .ok_or(MapError::MisalignedAddress)?;
                map_exact(rproc, Paddr::from_u32(vring.device_address), size)?;
            }
            channels.push(channel);
        }
    }

    let trace = match table.trace_buffers().next() {
        Some(trace) if trace.address != ADDR_ANY && trace.length > 0 => Some(map_exact(
            rproc,
            Paddr::from_u32(trace.address),
            trace.length as usize,
        )?),
        _ => None,
    };

    Ok((table_region, shared_buffers, trace, channels))
}

/// Map a shared range and narrow the result to exactly that range.
///
/// `map` hands back the enclosing region when the range is already covered.
fn map_exact<P: Platform>(
    rproc: &mut RemoteProc<P>,
    phys: Paddr,
    size: usize,
) -> Result<MappedRegion> {
    let region = rproc.map(phys, size, MemAttr::SHARED_UNCACHED)?;
    let logical = region
        .phys_to_logical(phys)
        .ok_or(MapError::InvalidRange)?;
    Ok(MappedRegion {
        phys,
        logical,
        size,
        attr: region.attr,
    })
}
