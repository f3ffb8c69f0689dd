// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit — the renderer decides that. This module
// just knows the byte-level encoding of every terminal command the viewer
// sends.
//
// Cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI standard uses 1-based coordinates).
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `AppendBuffer` (backed by a Vec).
use std::io::{self, Write};

// ─── Raw sequences ───────────────────────────────────────────────────────────

/// Hide the cursor (DECTCEM reset).
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
/// Show the cursor (DECTCEM set).
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";
/// Move the cursor to the top-left corner.
pub const CURSOR_HOME: &[u8] = b"\x1b[H";
/// Clear the entire screen (ED 2).
pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J";
/// Clear from the cursor to the end of the line (EL 0).
pub const CLEAR_LINE: &[u8] = b"\x1b[K";
/// Push the cursor as far right and down as the terminal allows.
///
/// CUF/CUD stop at the screen edge, so after this the cursor sits in the
/// bottom-right cell and a position report reveals the screen size.
pub const PROBE_BOTTOM_RIGHT: &[u8] = b"\x1b[999C\x1b[999B";
/// Device Status Report: ask the terminal for the cursor position.
///
/// The reply arrives on stdin as `ESC [ <row> ; <col> R`.
pub const REQUEST_CURSOR_POSITION: &[u8] = b"\x1b[6n";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
///
/// Our coordinates are 0-indexed; ANSI CUP is 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: usize, y: usize) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Hide the cursor.
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_HIDE)
}

/// Show the cursor.
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_SHOW)
}

/// Move the cursor to the top-left cell.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CURSOR_HOME)
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen. Does not move the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CLEAR_SCREEN)
}

/// Erase from the cursor to the end of the current line.
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(CLEAR_LINE)
}

// ─── Geometry probe ─────────────────────────────────────────────────────────

/// Move to the bottom-right corner and request a cursor position report.
///
/// Used as the fallback size query when `ioctl(TIOCGWINSZ)` is unavailable.
pub fn probe_size(w: &mut impl Write) -> io::Result<()> {
    w.write_all(PROBE_BOTTOM_RIGHT)?;
    w.write_all(REQUEST_CURSOR_POSITION)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
