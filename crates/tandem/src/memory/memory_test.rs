// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for mapped-region bookkeeping.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

fn region(phys: u64, logical: u64, size: usize) -> MappedRegion {
    MappedRegion {
        phys: Paddr::new(phys),
        logical: Vaddr::new(logical),
        size,
        attr: MemAttr::DEFAULT,
    }
}

#[test]
fn test_default_attr_is_shared_uncached_rw() {
    let attr = MemAttr::default();
    assert!(attr.shared);
    assert_eq!(attr.cache, CacheAttr::Uncached);
    assert_eq!(attr.perms, PagePerms::RW);
}

#[test]
fn test_region_bounds() {
    let r = region(0x1000, 0x9000, 0x100);
    assert!(r.contains_phys(Paddr::new(0x1000)));
    assert!(r.contains_phys(Paddr::new(0x10FF)));
    assert!(!r.contains_phys(Paddr::new(0x1100)));
    assert!(!r.contains_phys(Paddr::new(0x0FFF)));
    assert!(r.contains_logical(Vaddr::new(0x90FF)));
    assert!(!r.contains_logical(Vaddr::new(0x1000)));
}

#[test]
fn test_region_translation() {
    let r = region(0xA200_0000, 0x4000_0000, 0x1_0000);
    assert_eq!(
        r.phys_to_logical(Paddr::new(0xA200_8000)),
        Some(Vaddr::new(0x4000_8000))
    );
    assert_eq!(
        r.logical_to_phys(Vaddr::new(0x4000_0010)),
        Some(Paddr::new(0xA200_0010))
    );
    assert_eq!(r.phys_to_logical(Paddr::new(0xA201_0000)), None);
}

#[test]
fn test_covers_and_overlaps() {
    let r = region(0x1000, 0x1000, 0x1000);
    assert!(r.covers(Paddr::new(0x1000), 0x1000));
    assert!(r.covers(Paddr::new(0x1800), 0x10));
    assert!(!r.covers(Paddr::new(0x1800), 0x1000));
    assert!(r.overlaps(Paddr::new(0x1800), 0x1000));
    assert!(r.overlaps(Paddr::new(0x0800), 0x1000));
    assert!(!r.overlaps(Paddr::new(0x2000), 0x1000));
    assert!(!r.overlaps(Paddr::new(0x0800), 0x800));
    assert!(!r.overlaps(Paddr::new(0x1800), 0));
}

#[test]
fn test_covers_rejects_wrapping_range() {
    let r = region(0x1000, 0x1000, 0x1000);
    assert!(!r.covers(Paddr::new(0x1800), usize::MAX));
}

#[test]
fn test_lookup_classifies_ranges() {
    let mut map = RegionMap::new();
    map.insert(region(0x1000, 0x1000, 0x1000));
    map.insert(region(0x8000, 0x8000, 0x2000));

    assert!(matches!(
        map.lookup(Paddr::new(0x8100), 0x100),
        Lookup::Contained(r) if r.phys == Paddr::new(0x8000)
    ));
    assert!(matches!(
        map.lookup(Paddr::new(0x1F00), 0x200),
        Lookup::Overlaps(r) if r.phys == Paddr::new(0x1000)
    ));
    assert_eq!(map.lookup(Paddr::new(0x3000), 0x1000), Lookup::Free);
    // Superset of a region is an overlap, not a containment.
    assert!(matches!(
        map.lookup(Paddr::new(0x7000), 0x8000),
        Lookup::Overlaps(_)
    ));
}

#[test]
fn test_containing_lookups() {
    let mut map = RegionMap::new();
    map.insert(region(0x1000, 0x10_1000, 0x1000));
    map.insert(region(0x4000, 0x10_4000, 0x1000));

    assert_eq!(
        map.containing_phys(Paddr::new(0x4010)).map(|r| r.phys),
        Some(Paddr::new(0x4000))
    );
    assert!(map.containing_phys(Paddr::new(0x2000)).is_none());
    assert!(map.containing_phys(Paddr::new(0x0FFF)).is_none());
    assert_eq!(
        map.phys_to_logical(Paddr::new(0x1234)),
        Some(Vaddr::new(0x10_1234))
    );
    assert_eq!(
        map.logical_to_phys(Vaddr::new(0x10_4FFF)),
        Some(Paddr::new(0x4FFF))
    );
    assert_eq!(map.logical_to_phys(Vaddr::new(0x10_5000)), None);
}

#[test]
fn test_drain_empties_in_address_order() {
    let mut map = RegionMap::new();
    map.insert(region(0x8000, 0x8000, 0x100));
    map.insert(region(0x1000, 0x1000, 0x100));
    assert_eq!(map.len(), 2);

    let drained = map.drain();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].phys, Paddr::new(0x1000));
    assert_eq!(drained[1].phys, Paddr::new(0x8000));
    assert!(map.is_empty());
    assert_eq!(map.lookup(Paddr::new(0x1000), 0x100), Lookup::Free);
}
