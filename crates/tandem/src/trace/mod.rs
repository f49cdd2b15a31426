// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Trace buffer writer.
//!
//! The owner exposes the table's trace buffer as a text file and reads it
//! up to the first NUL. Output wraps around when the buffer is full; the
//! byte after the newest output is always NUL.

#[cfg(test)]
mod trace_test;

use core::fmt;

/// Ring writer over a mapped trace buffer.
#[derive(Debug)]
pub struct TraceLog<'a> {
    buf: &'a mut [u8],
    head: usize,
    wrapped: bool,
}

impl<'a> TraceLog<'a> {
    /// Start writing at the beginning of `buf`, which now reads as empty.
    pub fn new(buf: &'a mut [u8]) -> Self {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        Self {
            buf,
            head: 0,
            wrapped: false,
        }
    }

    /// Append `bytes`, wrapping to the start when the end is reached.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let len = self.buf.len();
        if len == 0 {
            return;
        }
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = (len - self.head).min(rest.len());
            self.buf[self.head..self.head + n].copy_from_slice(&rest[..n]);
            self.head += n;
            if self.head == len {
                self.head = 0;
                self.wrapped = true;
            }
            rest = &rest[n..];
        }
        self.buf[self.head] = 0;
    }

    /// Offset of the terminating NUL.
    #[must_use]
    pub const fn head(&self) -> usize {
        self.head
    }

    /// Whether output has wrapped at least once.
    #[must_use]
    pub const fn has_wrapped(&self) -> bool {
        self.wrapped
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written since the last wrap.
    #[must_use]
    pub fn recent(&self) -> &[u8] {
        &self.buf[..self.head]
    }

    /// Zero the whole buffer and start over.
    pub fn clear(&mut self) {
        self.buf.fill(0);
        self.head = 0;
        self.wrapped = false;
    }
}

impl fmt::Write for TraceLog<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
