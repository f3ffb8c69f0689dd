// SPDX-License-Identifier: MIT
//
// Output batching.
//
// AppendBuffer accumulates every escape sequence and line fragment of a
// frame in memory so the whole frame reaches the terminal in a single
// write() call. Many small writes let the terminal paint half-finished
// frames (visible flicker); one write does not.
//
// The buffer has no identity across frames: the renderer fills it, the
// event loop flushes it, and the flush leaves it empty for the next frame.

use std::io::{self, Write};

/// Starting capacity. A full 200×60 screen of text plus escapes fits
/// comfortably without reallocation.
const DEFAULT_CAPACITY: usize = 16_384;

/// A per-frame byte accumulator.
///
/// Append-only between flushes. Implements [`Write`] so the functions in
/// [`ansi`](crate::ansi) can target it directly.
pub struct AppendBuffer {
    buf: Vec<u8>,
}

impl AppendBuffer {
    /// Create an empty buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Append raw bytes.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the contents (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write the accumulated frame to `w` in one call and empty the buffer.
    ///
    /// The buffer is emptied even when the write fails; a partial frame is
    /// never retried.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }
}

impl Write for AppendBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing via flush_to().
        Ok(())
    }
}

impl Default for AppendBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
