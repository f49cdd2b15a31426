// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mapped-region bookkeeping.
//!
//! The adapter records every range it asked the platform to map so it can
//! translate addresses in both directions and hand back an existing
//! mapping instead of mapping the same bytes twice.

#[cfg(test)]
mod memory_test;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use tandem_abi::{Paddr, Vaddr};

use crate::platform::{CacheAttr, PagePerms};

/// Attributes requested for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAttr {
    pub perms: PagePerms,
    pub cache: CacheAttr,
    /// Visible to the owner core.
    pub shared: bool,
}

impl MemAttr {
    /// Shared with the owner, uncached, read/write.
    pub const SHARED_UNCACHED: Self = Self {
        perms: PagePerms::RW,
        cache: CacheAttr::Uncached,
        shared: true,
    };

    /// Attributes used when the caller has no preference.
    pub const DEFAULT: Self = Self::SHARED_UNCACHED;

    /// Private to this core, cached, read/write.
    pub const PRIVATE_CACHED: Self = Self {
        perms: PagePerms::RW,
        cache: CacheAttr::Cached,
        shared: false,
    };

    /// Peripheral registers.
    pub const DEVICE: Self = Self {
        perms: PagePerms::RW,
        cache: CacheAttr::Device,
        shared: true,
    };
}

impl Default for MemAttr {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A physical range made locally addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRegion {
    pub phys: Paddr,
    /// Equal to `phys` on cores without an MMU.
    pub logical: Vaddr,
    pub size: usize,
    pub attr: MemAttr,
}

impl MappedRegion {
    /// One past the last physical byte.
    #[must_use]
    pub const fn phys_end(&self) -> Paddr {
        self.phys.add(self.size as u64)
    }

    /// One past the last logical byte.
    #[must_use]
    pub const fn logical_end(&self) -> Vaddr {
        self.logical.add(self.size as u64)
    }

    #[must_use]
    pub fn contains_phys(&self, pa: Paddr) -> bool {
        pa >= self.phys && pa < self.phys_end()
    }

    #[must_use]
    pub fn contains_logical(&self, va: Vaddr) -> bool {
        va >= self.logical && va < self.logical_end()
    }

    /// Whether `[phys, phys + size)` lies entirely inside this region.
    #[must_use]
    pub fn covers(&self, phys: Paddr, size: usize) -> bool {
        phys >= self.phys
            && phys
                .checked_end(size as u64)
                .is_some_and(|end| end <= self.phys_end())
    }

    /// Whether `[phys, phys + size)` shares at least one byte with this region.
    #[must_use]
    pub fn overlaps(&self, phys: Paddr, size: usize) -> bool {
        let end = phys.checked_end(size as u64).unwrap_or(Paddr::new(u64::MAX));
        size > 0 && phys < self.phys_end() && self.phys < end
    }

    /// Translate a physical address inside this region.
    #[must_use]
    pub fn phys_to_logical(&self, pa: Paddr) -> Option<Vaddr> {
        self.contains_phys(pa)
            .then(|| self.logical.add(pa.diff(self.phys)))
    }

    /// Translate a logical address inside this region.
    #[must_use]
    pub fn logical_to_phys(&self, va: Vaddr) -> Option<Paddr> {
        self.contains_logical(va)
            .then(|| self.phys.add(va.diff(self.logical)))
    }
}

/// Outcome of checking a range against the recorded regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Entirely inside an existing region.
    Contained(&'a MappedRegion),
    /// Shares bytes with an existing region without fitting in it.
    Overlaps(&'a MappedRegion),
    /// Touches no recorded region.
    Free,
}

/// Recorded mappings, keyed by physical start.
#[derive(Debug, Default)]
pub struct RegionMap {
    regions: BTreeMap<u64, MappedRegion>,
}

impl RegionMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
        }
    }

    /// Classify `[phys, phys + size)` against the recorded regions.
    #[must_use]
    pub fn lookup(&self, phys: Paddr, size: usize) -> Lookup<'_> {
        let mut overlap = None;
        for region in self.regions.values() {
            if region.covers(phys, size) {
                return Lookup::Contained(region);
            }
            if overlap.is_none() && region.overlaps(phys, size) {
                overlap = Some(region);
            }
        }
        overlap.map_or(Lookup::Free, Lookup::Overlaps)
    }

    /// Record a region. The caller has checked it is [`Lookup::Free`].
    pub fn insert(&mut self, region: MappedRegion) {
        self.regions.insert(region.phys.as_u64(), region);
    }

    /// The region containing physical address `pa`.
    #[must_use]
    pub fn containing_phys(&self, pa: Paddr) -> Option<&MappedRegion> {
        self.regions
            .range(..=pa.as_u64())
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.contains_phys(pa))
    }

    /// The region containing logical address `va`.
    #[must_use]
    pub fn containing_logical(&self, va: Vaddr) -> Option<&MappedRegion> {
        self.regions
            .values()
            .find(|region| region.contains_logical(va))
    }

    #[must_use]
    pub fn phys_to_logical(&self, pa: Paddr) -> Option<Vaddr> {
        self.containing_phys(pa)?.phys_to_logical(pa)
    }

    #[must_use]
    pub fn logical_to_phys(&self, va: Vaddr) -> Option<Paddr> {
        self.containing_logical(va)?.logical_to_phys(va)
    }

    /// Remove and return every region, lowest physical address first.
    pub fn drain(&mut self) -> Vec<MappedRegion> {
        core::mem::take(&mut self.regions).into_values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappedRegion> + '_ {
        self.regions.values()
    }
}
