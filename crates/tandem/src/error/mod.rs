// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error types for table parsing, bootstrap and steady-state notification.
//!
//! Everything except [`Error::ChannelFull`] is fatal to the bootstrap
//! sequence. `ChannelFull` is an expected result under load and is handed
//! back to the caller unchanged.

use core::fmt;

use crate::mailbox::ChannelFull;
use crate::platform::{DeviceError, MapError};
use crate::remoteproc::State;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Structural defect found while decoding a resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDefect {
    /// Byte span shorter than the header, offset array or an entry.
    Truncated { needed: usize, available: usize },
    /// A header reserved word or an entry reserved field is nonzero.
    ReservedNonZero { entry: Option<usize> },
    /// Entry offset lies outside the table or inside the header.
    OffsetOutOfBounds { entry: usize, offset: u32 },
    /// Two entries claim the same bytes.
    EntryOverlap { first: usize, second: usize },
    /// Kind tag is neither a known kind nor in the vendor range.
    UnknownKind { entry: usize, kind: u32 },
    /// Declared vring count does not fit the vdev entry.
    VringCountMismatch { entry: usize, declared: u8 },
    /// Vring notify id exceeds the pending-set width.
    NotifyIdOutOfRange { notify_id: u32 },
}

impl fmt::Display for TableDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated: need {needed} bytes, have {available}")
            }
            Self::ReservedNonZero { entry: None } => write!(f, "header reserved words nonzero"),
            Self::ReservedNonZero { entry: Some(entry) } => {
                write!(f, "entry {entry} reserved field nonzero")
            }
            Self::OffsetOutOfBounds { entry, offset } => {
                write!(f, "entry {entry} offset {offset:#x} out of bounds")
            }
            Self::EntryOverlap { first, second } => {
                write!(f, "entries {first} and {second} overlap")
            }
            Self::UnknownKind { entry, kind } => write!(f, "entry {entry} unknown kind {kind}"),
            Self::VringCountMismatch { entry, declared } => {
                write!(f, "entry {entry} declares {declared} vrings that do not fit")
            }
            Self::NotifyIdOutOfRange { notify_id } => {
                write!(f, "notify id {notify_id} out of range")
            }
        }
    }
}

/// Errors surfaced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The resource table is structurally invalid.
    MalformedTable(TableDefect),
    /// The table version is not the supported one.
    UnsupportedVersion(u32),
    /// Two vrings share a notify id.
    DuplicateQueueId(u32),
    /// The mailbox device is absent, already owned, or its handler was refused.
    DeviceRegistrationFailed(DeviceError),
    /// The outbound hardware FIFO is full.
    ChannelFull { queue: u32 },
    /// The mapping collaborator refused a region.
    MappingFailed(MapError),
    /// The operation is not allowed in the current lifecycle state.
    InvalidState { op: &'static str, state: State },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTable(defect) => write!(f, "malformed resource table: {defect}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported resource table version {version}")
            }
            Self::DuplicateQueueId(id) => write!(f, "duplicate vring notify id {id}"),
            Self::DeviceRegistrationFailed(reason) => {
                write!(f, "mailbox registration failed: {reason}")
            }
            Self::ChannelFull { queue } => write!(f, "mailbox queue {queue} full"),
            Self::MappingFailed(reason) => write!(f, "mapping failed: {reason}"),
            Self::InvalidState { op, state } => write!(f, "{op} not allowed in state {state:?}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<TableDefect> for Error {
    fn from(defect: TableDefect) -> Self {
        Self::MalformedTable(defect)
    }
}

impl From<MapError> for Error {
    fn from(err: MapError) -> Self {
        Self::MappingFailed(err)
    }
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Self::DeviceRegistrationFailed(err)
    }
}

impl From<ChannelFull> for Error {
    fn from(full: ChannelFull) -> Self {
        Self::ChannelFull { queue: full.queue }
    }
}
