// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the trace buffer writer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use core::fmt::Write;

use super::*;

#[test]
fn test_new_log_reads_empty() {
    let mut buf = [b'x'; 8];
    let log = TraceLog::new(&mut buf);
    assert_eq!(log.head(), 0);
    assert!(log.recent().is_empty());
    assert_eq!(buf[0], 0);
}

#[test]
fn test_writes_are_nul_terminated() {
    let mut buf = [b'x'; 16];
    let mut log = TraceLog::new(&mut buf);
    write!(log, "boot {}", 1).unwrap();
    assert_eq!(log.recent(), b"boot 1");
    assert_eq!(log.head(), 6);
    assert_eq!(&buf[..7], b"boot 1\0");
}

#[test]
fn test_output_wraps_to_start() {
    let mut buf = [0u8; 8];
    let mut log = TraceLog::new(&mut buf);
    log.write_bytes(b"abcdef");
    log.write_bytes(b"ghij");

    assert!(log.has_wrapped());
    assert_eq!(log.head(), 2);
    assert_eq!(log.recent(), b"ij");
    assert_eq!(&buf, b"ij\0defgh");
}

#[test]
fn test_write_longer_than_buffer_keeps_newest() {
    let mut buf = [0u8; 4];
    let mut log = TraceLog::new(&mut buf);
    log.write_bytes(b"0123456789");
    assert_eq!(log.head(), 2);
    assert_eq!(&buf, b"89\x007");
}

#[test]
fn test_exact_fill_wraps_terminator() {
    let mut buf = [0u8; 4];
    let mut log = TraceLog::new(&mut buf);
    log.write_bytes(b"abcd");
    assert!(log.has_wrapped());
    assert_eq!(log.head(), 0);
    assert_eq!(&buf, b"\0bcd");
}

#[test]
fn test_empty_buffer_ignores_output() {
    let mut buf = [0u8; 0];
    let mut log = TraceLog::new(&mut buf);
    write!(log, "dropped").unwrap();
    assert_eq!(log.capacity(), 0);
    assert_eq!(log.head(), 0);
}

#[test]
fn test_clear_resets_buffer() {
    let mut buf = [0u8; 8];
    let mut log = TraceLog::new(&mut buf);
    log.write_bytes(b"0123456789");
    log.clear();
    assert!(!log.has_wrapped());
    assert_eq!(log.head(), 0);
    assert_eq!(buf, [0; 8]);
}
