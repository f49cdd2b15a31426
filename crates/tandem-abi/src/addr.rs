// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Physical and logical address types.
//!
//! These newtypes prevent accidentally mixing address types at compile time.
//! On MMU-less remote cores both spaces coincide, but the mapping layer still
//! hands out [`Vaddr`]s so code never assumes that.

use core::fmt;
use core::ops::{Add, Sub};

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new address.
            #[inline]
            #[must_use]
            pub const fn new(addr: u64) -> Self {
                Self(addr)
            }

            /// Widen a 32-bit resource table address.
            #[inline]
            #[must_use]
            pub const fn from_u32(addr: u32) -> Self {
                Self(addr as u64)
            }

            /// Get the raw address value.
            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Add an offset to this address.
            #[inline]
            #[must_use]
            pub const fn add(self, offset: u64) -> Self {
                Self(self.0.wrapping_add(offset))
            }

            /// Subtract an offset from this address.
            #[inline]
            #[must_use]
            pub const fn sub(self, offset: u64) -> Self {
                Self(self.0.wrapping_sub(offset))
            }

            /// Distance from `other` up to `self`.
            #[inline]
            #[must_use]
            pub const fn diff(self, other: Self) -> u64 {
                self.0.wrapping_sub(other.0)
            }

            /// Add `len` bytes, or `None` on address-space overflow.
            #[inline]
            #[must_use]
            pub const fn checked_end(self, len: u64) -> Option<Self> {
                match self.0.checked_add(len) {
                    Some(end) => Some(Self(end)),
                    None => None,
                }
            }

            /// Align this address up to the given alignment.
            ///
            /// Returns `None` if alignment is zero or not a power of two.
            #[inline]
            #[must_use]
            pub const fn align_up(self, alignment: u64) -> Option<Self> {
                if !alignment.is_power_of_two() {
                    return None;
                }
                let mask = alignment - 1;
                Some(Self(self.0.wrapping_add(mask) & !mask))
            }

            /// Check if this address is aligned to the given alignment.
            ///
            /// Returns `None` if alignment is zero or not a power of two.
            #[inline]
            #[must_use]
            pub const fn is_aligned(self, alignment: u64) -> Option<bool> {
                if !alignment.is_power_of_two() {
                    return None;
                }
                Some((self.0 & (alignment - 1)) == 0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(addr: u64) -> Self {
                Self(addr)
            }
        }

        impl Add<u64> for $name {
            type Output = Self;

            fn add(self, rhs: u64) -> Self::Output {
                self.add(rhs)
            }
        }

        impl Sub<u64> for $name {
            type Output = Self;

            fn sub(self, rhs: u64) -> Self::Output {
                self.sub(rhs)
            }
        }
    };
}

address_type! {
    /// A physical memory address, as seen by both cores' bus masters.
    ///
    /// Resource table device addresses are interpreted as physical
    /// addresses on this side.
    Paddr
}

address_type! {
    /// A logical (locally addressable) address returned by a mapping.
    ///
    /// Equal to the physical address on targets without an MMU.
    Vaddr
}

impl Vaddr {
    /// Create a logical address from a pointer.
    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u64)
    }

    /// Convert to a const pointer.
    #[inline]
    #[must_use]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as usize as *const T
    }

    /// Convert to a mutable pointer.
    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as usize as *mut T
    }
}
