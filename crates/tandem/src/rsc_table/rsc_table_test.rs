// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the resource table consumer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::vec::Vec;

use proptest::prelude::*;
use tandem_abi::rpmsg::RpmsgLayout;
use tandem_abi::{RpmsgResourceTable, TableBuilder, VIRTIO_ID_RPMSG};

use super::*;

// =============================================================================
// Helpers
// =============================================================================

/// Carveout at entry 0 (offset 24), rpmsg vdev at entry 1 (offset 80).
fn sample_table() -> Vec<u8> {
    TableBuilder::new()
        .carveout(CarveoutEntry::new(0, 0, 0x0800_0000, 0, "ELF_COUT"))
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 0, 1, 2),
            &[
                VringEntry::new(0x0800_0000, 0x1000, 256, 1),
                VringEntry::new(0x0800_4000, 0x1000, 256, 2),
            ],
            &[],
        )
        .build()
}

const CARVEOUT_AT: usize = 24;
const VDEV_AT: usize = 80;

fn put_u32(image: &mut [u8], offset: usize, value: u32) {
    image[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

fn parse_all(image: &[u8]) -> Result<ParsedTable> {
    parse(image, image.len())
}

// =============================================================================
// Layout reads
// =============================================================================

#[test]
fn test_read_entry_handles_unaligned_offsets() {
    let image = sample_table();
    let mut shifted = std::vec![0u8; 1];
    shifted.extend_from_slice(&image);

    let header: TableHeader = read_entry(&shifted, 1).unwrap();
    assert_eq!(header, TableHeader::new(2));
    let carveout: CarveoutEntry = read_entry(&shifted, 1 + CARVEOUT_AT).unwrap();
    assert_eq!(carveout.len, 0x0800_0000);
    assert_eq!(decode_name(&carveout.name), Some("ELF_COUT"));
}

#[test]
fn test_read_entry_past_end_is_truncated() {
    let image = sample_table();
    let offset = image.len() - 2;
    assert_eq!(
        read_entry::<u32>(&image, offset),
        Err(Error::MalformedTable(TableDefect::Truncated {
            needed: offset + 4,
            available: image.len(),
        }))
    );
}

// =============================================================================
// Valid Tables
// =============================================================================

#[test]
fn test_sample_table_yields_one_device_and_carveout() {
    let table = parse_all(&sample_table()).unwrap();

    assert_eq!(table.entries().len(), 2);
    let vdevs: Vec<_> = table.vdevs().collect();
    assert_eq!(vdevs.len(), 1);
    assert_eq!(vdevs[0].device_id, 7);
    assert_eq!(vdevs[0].device_features, 1);
    assert_eq!(vdevs[0].notify_ids().collect::<Vec<_>>(), [1, 2]);

    let carveout = table.carveouts().next().unwrap();
    assert_eq!(carveout.name, "ELF_COUT");
    assert_eq!(carveout.phys_start(), Paddr::new(0));
    assert_eq!(carveout.phys_end(), Paddr::new(0x0800_0000));
}

#[test]
fn test_vring_geometry_is_preserved() {
    let table = parse_all(&sample_table()).unwrap();
    let vdev = table.vdevs().next().unwrap();

    assert_eq!(vdev.vrings[1].device_address, 0x0800_4000);
    assert_eq!(vdev.vrings[1].alignment, 0x1000);
    assert_eq!(vdev.vrings[1].num_descriptors, 256);
    assert_eq!(vdev.vrings[0].footprint(), Some(10_246));
    assert!(!vdev.vrings[0].is_addr_any());
}

#[test]
fn test_static_rpmsg_table_parses() {
    let table = RpmsgResourceTable::new(RpmsgLayout::TI_AM64X_R5F, 0x7000_0000);
    let parsed = parse(table.as_bytes(), RpmsgResourceTable::used_len()).unwrap();

    let vdev = parsed.vdevs().next().unwrap();
    assert_eq!(vdev.notify_id, 31);
    assert!(vdev.vrings.iter().all(Vring::is_addr_any));

    let trace = parsed.trace_buffers().next().unwrap();
    assert_eq!(trace.name, "trace:r5fss0_0");
    assert_eq!(trace.address, 0x7000_0000);
    assert_eq!(trace.length, 4096);
}

#[test]
fn test_vdev_config_space_is_copied() {
    let image = TableBuilder::new()
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 3, 1, 1),
            &[VringEntry::new(0x1000, 0x1000, 8, 0)],
            &[1, 2, 3, 4, 5],
        )
        .build();
    let table = parse_all(&image).unwrap();
    let vdev = table.vdevs().next().unwrap();
    assert_eq!(vdev.config, [1, 2, 3, 4, 5]);
    assert_eq!(vdev.num_vrings(), 1);
}

#[test]
fn test_vendor_and_memory_entries_are_decoded() {
    let image = TableBuilder::new()
        .vendor(200, &[0xDE, 0xAD])
        .carveout(CarveoutEntry::devmem(0x2904_0000, 0x2904_0000, 0x1000, 0, "mbox"))
        .rproc_mem(RprocMemEntry {
            kind: ResourceKind::RprocMem.as_u32(),
            da: 0x100,
            pa: 0x200,
            len: 0x300,
            reserved: 0,
        })
        .build();
    let table = parse_all(&image).unwrap();

    assert_eq!(
        table.find(ResourceKind::Vendor(200), 0),
        Some(&Resource::Vendor {
            kind: 200,
            payload: [0xDE, 0xAD].to_vec(),
        })
    );
    assert!(matches!(
        table.find(ResourceKind::DevMem, 0),
        Some(Resource::DevMem(mem)) if mem.name == "mbox"
    ));
    assert!(matches!(
        table.find(ResourceKind::RprocMem, 0),
        Some(Resource::RprocMem(RprocMem { len: 0x300, .. }))
    ));
    assert_eq!(table.find(ResourceKind::RprocMem, 1), None);
}

#[test]
fn test_only_table_len_bytes_are_considered() {
    let mut image = sample_table();
    let len = image.len();
    image.extend_from_slice(&[0xFF; 64]);
    assert_eq!(parse(&image, len).unwrap(), parse_all(&sample_table()).unwrap());
}

// =============================================================================
// Rejected Tables
// =============================================================================

#[test]
fn test_rejects_unsupported_version() {
    let image = TableBuilder::new().version(2).build();
    assert_eq!(parse_all(&image), Err(Error::UnsupportedVersion(2)));
}

#[test]
fn test_rejects_nonzero_header_reserved() {
    let image = TableBuilder::new().reserved([0, 1]).build();
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::ReservedNonZero { entry: None }))
    );
}

#[test]
fn test_rejects_duplicate_notify_ids() {
    let image = TableBuilder::new()
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 0, 1, 2),
            &[
                VringEntry::new(0x1000, 0x1000, 16, 1),
                VringEntry::new(0x5000, 0x1000, 16, 1),
            ],
            &[],
        )
        .build();
    assert_eq!(parse_all(&image), Err(Error::DuplicateQueueId(1)));
}

#[test]
fn test_rejects_duplicate_notify_ids_across_devices() {
    let image = TableBuilder::new()
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 0, 1, 1),
            &[VringEntry::new(0x1000, 0x1000, 16, 4)],
            &[],
        )
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 1, 1, 1),
            &[VringEntry::new(0x5000, 0x1000, 16, 4)],
            &[],
        )
        .build();
    assert_eq!(parse_all(&image), Err(Error::DuplicateQueueId(4)));
}

#[test]
fn test_rejects_notify_id_beyond_pending_set() {
    let image = TableBuilder::new()
        .vdev(
            VdevEntry::new(VIRTIO_ID_RPMSG, 0, 1, 1),
            &[VringEntry::new(0x1000, 0x1000, 16, MAX_QUEUE_IDS)],
            &[],
        )
        .build();
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::NotifyIdOutOfRange {
            notify_id: MAX_QUEUE_IDS
        }))
    );
}

#[test]
fn test_rejects_offset_outside_table() {
    let mut image = sample_table();
    put_u32(&mut image, 20, 0x400);
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::OffsetOutOfBounds {
            entry: 1,
            offset: 0x400
        }))
    );
}

#[test]
fn test_rejects_offset_into_header() {
    let mut image = sample_table();
    put_u32(&mut image, 16, 8);
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::OffsetOutOfBounds {
            entry: 0,
            offset: 8
        }))
    );
}

#[test]
fn test_rejects_overlapping_entries() {
    let mut image = TableBuilder::new()
        .carveout(CarveoutEntry::new(0, 0, 0x1000, 0, "a"))
        .carveout(CarveoutEntry::new(0x1000, 0x1000, 0x1000, 0, "b"))
        .build();
    put_u32(&mut image, 20, u32::try_from(CARVEOUT_AT).unwrap());
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::EntryOverlap {
            first: 0,
            second: 1
        }))
    );
}

#[test]
fn test_rejects_table_len_beyond_bytes() {
    let image = sample_table();
    assert_eq!(
        parse(&image, image.len() + 4),
        Err(Error::MalformedTable(TableDefect::Truncated {
            needed: image.len() + 4,
            available: image.len()
        }))
    );
}

#[test]
fn test_rejects_entry_cut_off_by_table_len() {
    let image = sample_table();
    assert!(matches!(
        parse(&image, VDEV_AT + 8),
        Err(Error::MalformedTable(TableDefect::Truncated { .. }))
    ));
}

#[test]
fn test_rejects_offset_array_beyond_table() {
    let mut image = sample_table();
    put_u32(&mut image, 4, 1000);
    assert!(matches!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::Truncated { .. }))
    ));
}

#[test]
fn test_rejects_vring_count_that_does_not_fit() {
    let mut image = sample_table();
    image[VDEV_AT + 25] = 4;
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::VringCountMismatch {
            entry: 1,
            declared: 4
        }))
    );
}

#[test]
fn test_rejects_unknown_kind() {
    let mut image = sample_table();
    put_u32(&mut image, CARVEOUT_AT, 42);
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::UnknownKind {
            entry: 0,
            kind: 42
        }))
    );
}

#[test]
fn test_rejects_nonzero_vring_reserved() {
    let mut image = sample_table();
    // Second vring's reserved word.
    put_u32(&mut image, VDEV_AT + 28 + 20 + 16, 1);
    assert_eq!(
        parse_all(&image),
        Err(Error::MalformedTable(TableDefect::ReservedNonZero {
            entry: Some(1)
        }))
    );
}

#[test]
fn test_rejects_empty_span() {
    assert!(matches!(
        parse(&[], 0),
        Err(Error::MalformedTable(TableDefect::Truncated { .. }))
    ));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn test_parse_is_deterministic(
        patches in proptest::collection::vec((0usize..148, any::<u8>()), 0..8),
        cut in 0usize..=148,
    ) {
        let mut image = sample_table();
        for (offset, byte) in patches {
            image[offset] = byte;
        }
        prop_assert_eq!(parse(&image, cut), parse(&image, cut));
        prop_assert_eq!(parse_all(&image), parse_all(&image));
    }

    #[test]
    fn test_duplicate_ids_never_parse(id in 0u32..MAX_QUEUE_IDS, other in 0u32..MAX_QUEUE_IDS) {
        let image = TableBuilder::new()
            .vdev(
                VdevEntry::new(VIRTIO_ID_RPMSG, 0, 1, 3),
                &[
                    VringEntry::new(0x1000, 0x1000, 16, id),
                    VringEntry::new(0x5000, 0x1000, 16, other),
                    VringEntry::new(0x9000, 0x1000, 16, id),
                ],
                &[],
            )
            .build();
        prop_assert_eq!(parse_all(&image), Err(Error::DuplicateQueueId(id)));
    }
}
