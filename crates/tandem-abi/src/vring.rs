// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Split virtqueue footprint.
//!
//! A vring is a descriptor table (16 bytes per entry), the available ring
//! (`flags`, `idx`, `num` entries, `used_event`), then, at the next
//! `align` boundary, the used ring (`flags`, `idx`, `num` 8-byte elements,
//! `avail_event`).

/// Bytes occupied by a vring of `num` descriptors aligned to `align`.
///
/// Returns `None` if `align` is not a power of two.
#[must_use]
pub const fn vring_size(num: u32, align: u32) -> Option<u64> {
    if !align.is_power_of_two() {
        return None;
    }
    let num = num as u64;
    let align = align as u64;
    let avail_end = 16 * num + 2 * (3 + num);
    let used_start = (avail_end + align - 1) & !(align - 1);
    let used_len = 2 * 3 + 8 * num;
    Some(used_start + used_len)
}
