// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the doorbell demultiplexer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::vec::Vec;

use proptest::prelude::*;

use super::*;
use crate::mailbox::MockMailbox;

const CONTROL: u32 = 1;

fn drain(pending: &PendingSet) -> Vec<u32> {
    core::iter::from_fn(|| pending.claim()).collect()
}

// =============================================================================
// PendingSet
// =============================================================================

#[test]
fn test_empty_set_claims_nothing() {
    let pending = PendingSet::new();
    assert!(!pending.is_kicked());
    assert_eq!(pending.claim(), None);
}

#[test]
fn test_claims_lowest_first_one_per_call() {
    let pending = PendingSet::new();
    pending.post(2);
    pending.post(1);
    pending.post(17);

    assert_eq!(pending.claim(), Some(1));
    assert_eq!(pending.snapshot(), (1 << 2) | (1 << 17));
    assert_eq!(pending.claim(), Some(2));
    assert_eq!(pending.claim(), Some(17));
    assert_eq!(pending.claim(), None);
}

#[test]
fn test_repeated_post_before_claim_reports_once() {
    let pending = PendingSet::new();
    assert!(pending.post(5));
    assert!(!pending.post(5));
    assert_eq!(drain(&pending), [5]);
}

#[test]
fn test_remaining_bits_keep_the_set_kicked() {
    let pending = PendingSet::new();
    pending.post(3);
    pending.post(4);
    assert_eq!(pending.claim(), Some(3));
    assert!(pending.is_kicked());
    assert_eq!(pending.claim(), Some(4));
    assert!(!pending.is_kicked());
}

#[test]
fn test_out_of_range_post_is_ignored() {
    let pending = PendingSet::new();
    assert!(!pending.post(MAX_QUEUE_IDS));
    assert!(!pending.post(u32::MAX));
    assert!(!pending.is_kicked());
    assert_eq!(pending.snapshot(), 0);
}

#[test]
fn test_highest_id_is_representable() {
    let pending = PendingSet::new();
    assert!(pending.post(MAX_QUEUE_IDS - 1));
    assert_eq!(drain(&pending), [MAX_QUEUE_IDS - 1]);
}

#[test]
fn test_clear_forgets_pending() {
    let pending = PendingSet::new();
    pending.post(0);
    pending.post(9);
    pending.clear();
    assert_eq!(pending.claim(), None);
    assert_eq!(pending.snapshot(), 0);
}

#[test]
fn test_post_between_claims_is_not_lost() {
    let pending = PendingSet::new();
    pending.post(8);
    assert_eq!(pending.claim(), Some(8));
    // Posted after the claim swapped the flag back.
    pending.post(8);
    assert_eq!(pending.claim(), Some(8));
    assert_eq!(pending.claim(), None);
}

// =============================================================================
// Doorbell
// =============================================================================

#[test]
fn test_service_decodes_and_acknowledges_each_message() {
    let mailbox = MockMailbox::new(4, 4);
    let doorbell = Doorbell::new(mailbox.clone(), CONTROL, MAX_QUEUE_IDS);
    mailbox.deliver(CONTROL, 2);
    mailbox.deliver(CONTROL, 1);

    assert_eq!(doorbell.service(), 2);
    assert_eq!(mailbox.clears(), [CONTROL, CONTROL]);
    assert_eq!(mailbox.unacknowledged(CONTROL), 0);
    assert_eq!(doorbell.claim(), Some(1));
    assert_eq!(doorbell.claim(), Some(2));
    assert_eq!(doorbell.claim(), None);
}

#[test]
fn test_invalid_payload_is_acknowledged_and_dropped() {
    let mailbox = MockMailbox::new(4, 4);
    let doorbell = Doorbell::new(mailbox.clone(), CONTROL, MAX_QUEUE_IDS);
    mailbox.deliver(CONTROL, 40);

    assert_eq!(doorbell.handle_irq(), IrqReturn::Handled);
    assert_eq!(doorbell.dropped(), 1);
    assert_eq!(mailbox.clears(), [CONTROL]);
    assert_eq!(doorbell.claim(), None);
}

#[test]
fn test_ids_beyond_configured_width_are_dropped() {
    let mailbox = MockMailbox::new(4, 4);
    let doorbell = Doorbell::new(mailbox.clone(), CONTROL, 4);
    mailbox.deliver(CONTROL, 3);
    mailbox.deliver(CONTROL, 4);
    mailbox.deliver(CONTROL, 20);

    assert_eq!(doorbell.service(), 3);
    assert_eq!(doorbell.dropped(), 2);
    assert_eq!(mailbox.unacknowledged(CONTROL), 0);
    assert_eq!(doorbell.claim(), Some(3));
    assert_eq!(doorbell.claim(), None);
}

#[test]
fn test_width_is_capped_at_pending_set() {
    let doorbell = Doorbell::new(MockMailbox::new(4, 4), CONTROL, 64);
    assert_eq!(doorbell.width(), MAX_QUEUE_IDS);
}

#[test]
fn test_spurious_interrupt_is_not_handled() {
    let mailbox = MockMailbox::new(4, 4);
    let doorbell = Doorbell::new(mailbox.clone(), CONTROL, MAX_QUEUE_IDS);
    assert_eq!(doorbell.handle_irq(), IrqReturn::NotHandled);
    assert!(mailbox.clears().is_empty());
}

#[test]
fn test_service_reads_only_the_control_queue() {
    let mailbox = MockMailbox::new(4, 4);
    let doorbell = Doorbell::new(mailbox.clone(), CONTROL, MAX_QUEUE_IDS);
    mailbox.deliver(0, 3);

    assert_eq!(doorbell.service(), 0);
    assert_eq!(mailbox.drain(0), [3]);
}

// =============================================================================
// Interleavings
// =============================================================================

#[derive(Debug, Clone)]
enum Step {
    Post(u32),
    Claim,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u32..MAX_QUEUE_IDS).prop_map(Step::Post),
        (0u32..8).prop_map(Step::Post),
        Just(Step::Claim),
    ]
}

proptest! {
    #[test]
    fn test_interleavings_match_set_model(steps in proptest::collection::vec(step(), 0..200)) {
        let pending = PendingSet::new();
        let mut model = BTreeSet::new();
        let mut newly_set: BTreeMap<u32, usize> = BTreeMap::new();
        let mut reported: BTreeMap<u32, usize> = BTreeMap::new();

        for step in steps {
            match step {
                Step::Post(id) => {
                    let fresh = pending.post(id);
                    prop_assert_eq!(fresh, model.insert(id));
                    if fresh {
                        *newly_set.entry(id).or_default() += 1;
                    }
                }
                Step::Claim => {
                    let claimed = pending.claim();
                    prop_assert_eq!(claimed, model.pop_first());
                    if let Some(id) = claimed {
                        *reported.entry(id).or_default() += 1;
                    }
                }
            }
        }

        let mut previous = None;
        while let Some(id) = pending.claim() {
            prop_assert!(previous < Some(id), "drain must be strictly increasing");
            previous = Some(id);
            *reported.entry(id).or_default() += 1;
        }
        prop_assert_eq!(reported, newly_set);
        prop_assert_eq!(pending.snapshot(), 0);
    }

    #[test]
    fn test_doorbell_reports_every_delivered_id(
        bursts in proptest::collection::vec(
            proptest::collection::vec(0u32..MAX_QUEUE_IDS, 1..=4),
            0..32,
        ),
    ) {
        let mailbox = MockMailbox::new(4, 4);
        let doorbell = Doorbell::new(mailbox.clone(), CONTROL, MAX_QUEUE_IDS);
        let mut expected = BTreeSet::new();
        let mut seen = BTreeSet::new();

        for burst in bursts {
            for &id in &burst {
                prop_assert!(mailbox.deliver(CONTROL, id));
                expected.insert(id);
            }
            doorbell.handle_irq();
            if let Some(id) = doorbell.claim() {
                seen.insert(id);
            }
        }
        while let Some(id) = doorbell.claim() {
            seen.insert(id);
        }
        prop_assert_eq!(seen, expected);
        prop_assert_eq!(mailbox.unacknowledged(CONTROL), 0);
    }
}
