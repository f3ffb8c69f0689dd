// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw stdin bytes into logical keys: literal bytes, arrows, and the
// Home/End/Delete/PageUp/PageDown editing keys.
//
// # Design
//
// The decoder pulls bytes one at a time from a [`ByteSource`]. In raw mode
// the terminal is configured with VMIN=0/VTIME=1, so every read returns
// after at most 100ms with either one byte or nothing. That timeout is the
// only clock the decoder needs:
//
// - The first byte of a key is awaited indefinitely (timeouts are retried).
// - Bytes after an ESC get exactly one read each. If the timeout fires
//   first, the ESC was a real Escape keypress, not the start of a sequence.
//
// Lookahead is bounded: `ESC [ <letter>` reads three bytes, `ESC [ <digit> ~`
// reads four, and nothing ever reads past the end of the sequence it is
// decoding. Garbled or unknown sequences collapse to a bare Escape.

use std::io;

use crate::error::{Result, TermError};

/// The escape byte that introduces multi-byte sequences.
pub const ESC: u8 = 0x1B;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// A decoded keypress.
///
/// Printable and control bytes are passed through untouched as
/// [`Char`](Key::Char); no UTF-8 decoding is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A literal byte (printable or control).
    Char(u8),
    /// A bare Escape, or an escape sequence we don't recognise.
    Escape,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Editing ─────────────────────────────────────────────────
    Delete,
}

impl Key {
    /// The key produced by holding Ctrl and pressing `c`.
    ///
    /// Terminals encode Ctrl+letter by clearing the top three bits.
    #[inline]
    #[must_use]
    pub const fn ctrl(c: u8) -> Self {
        Self::Char(c & 0x1f)
    }
}

// ─── Byte sources ────────────────────────────────────────────────────────────

/// Somewhere raw terminal bytes come from.
///
/// `read_byte` must wait no longer than one read timeout. `Ok(None)` means
/// the timeout expired with nothing to read; it is not an error.
pub trait ByteSource {
    /// Read a single byte, or `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for anything other than a timeout.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Block until one logical key is available and return it.
///
/// Timeouts while waiting for the first byte are retried; the function
/// never returns because of one.
///
/// # Errors
///
/// Returns [`TermError::Read`] if the first read fails with a real error.
/// Failures during escape-sequence lookahead are not errors; they yield
/// [`Key::Escape`].
pub fn read_key(src: &mut impl ByteSource) -> Result<Key> {
    let first = wait_byte(src)?;
    let key = if first == ESC {
        decode_escape(src)
    } else {
        Key::Char(first)
    };
    tracing::trace!(?key, "decoded key");
    Ok(key)
}

/// Retry timeouts until a byte arrives.
fn wait_byte(src: &mut impl ByteSource) -> Result<u8> {
    loop {
        match src.read_byte() {
            Ok(Some(byte)) => return Ok(byte),
            Ok(None) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TermError::Read(e)),
        }
    }
}

/// One read attempt. A timeout or error both mean "no byte".
fn next_byte(src: &mut impl ByteSource) -> Option<u8> {
    match src.read_byte() {
        Ok(byte) => byte,
        Err(e) => {
            tracing::debug!(error = %e, "read failed during escape lookahead");
            None
        }
    }
}

/// Decode the bytes following an ESC already consumed by the caller.
fn decode_escape(src: &mut impl ByteSource) -> Key {
    let Some(intro) = next_byte(src) else {
        return Key::Escape;
    };
    let Some(code) = next_byte(src) else {
        return Key::Escape;
    };
    if intro != b'[' {
        return Key::Escape;
    }

    if code.is_ascii_digit() {
        return match next_byte(src) {
            Some(b'~') => tilde_key(code).unwrap_or(Key::Escape),
            _ => Key::Escape,
        };
    }

    letter_key(code).unwrap_or(Key::Escape)
}

/// `ESC [ <digit> ~` — the VT-style editing keypad.
///
/// Both 1/7 (Home) and 4/8 (End) appear in the wild: rxvt uses 7/8,
/// xterm-compatible terminals and the Linux console use 1/4.
const fn tilde_key(digit: u8) -> Option<Key> {
    match digit {
        b'1' | b'7' => Some(Key::Home),
        b'4' | b'8' => Some(Key::End),
        b'3' => Some(Key::Delete),
        b'5' => Some(Key::PageUp),
        b'6' => Some(Key::PageDown),
        _ => None,
    }
}

/// `ESC [ <letter>` — cursor keys.
const fn letter_key(letter: u8) -> Option<Key> {
    match letter {
        b'A' => Some(Key::Up),
        b'B' => Some(Key::Down),
        b'C' => Some(Key::Right),
        b'D' => Some(Key::Left),
        b'H' => Some(Key::Home),
        b'F' => Some(Key::End),
        _ => None,
    }
}

// ─── Test support ────────────────────────────────────────────────────────────


// ─── Tests ───────────────────────────────────────────────────────────────────
