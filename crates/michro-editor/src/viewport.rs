//! Viewport — cursor position and vertical scroll over the line store.
//!
//! The cursor is kept in screen-relative form: `cx` is the column, `cy` the
//! row within the viewport, and `topline` the index of the first visible
//! line. The document line under the cursor is `topline + cy`.
//!
//! # Invariants
//!
//! After any motion:
//!
//! - `cx < cols` and `cy < rows`
//! - `topline + cy` is a valid line index, or `0` for an empty file
//! - `topline <= max(0, line_count - 1)`
//!
//! The cursor never moves below the last line of the file, so a file
//! shorter than the screen never scrolls.
//!
//! # Scrolling and the clear flag
//!
//! Moving past the top or bottom edge scrolls by one line and sets
//! `needs_clear`: every row already on screen is now stale, so the next
//! frame starts from a cleared screen. Paging is literally `rows` single
//! steps, so a page that scrolls sets the flag exactly as the equivalent
//! run of arrow presses would.

use michro_term::input::Key;
use michro_term::terminal::Size;

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

/// A cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Up,
    Down,
    Left,
    Right,
    /// Column 0.
    LineStart,
    /// Last column of the viewport.
    LineEnd,
    /// `rows` steps up.
    PageUp,
    /// `rows` steps down.
    PageDown,
}

impl Motion {
    /// The motion bound to `key`, if any.
    ///
    /// With `wasd` on, `w`/`a`/`s`/`d` are aliases for the arrow keys.
    #[must_use]
    pub const fn from_key(key: Key, wasd: bool) -> Option<Self> {
        match key {
            Key::Up => Some(Self::Up),
            Key::Down => Some(Self::Down),
            Key::Left => Some(Self::Left),
            Key::Right => Some(Self::Right),
            Key::Home => Some(Self::LineStart),
            Key::End => Some(Self::LineEnd),
            Key::PageUp => Some(Self::PageUp),
            Key::PageDown => Some(Self::PageDown),
            Key::Char(b'w') if wasd => Some(Self::Up),
            Key::Char(b'a') if wasd => Some(Self::Left),
            Key::Char(b's') if wasd => Some(Self::Down),
            Key::Char(b'd') if wasd => Some(Self::Right),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Cursor and scroll state for a `rows × cols` window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    cx: usize,
    cy: usize,
    rows: usize,
    cols: usize,
    topline: usize,
    needs_clear: bool,
}

impl Viewport {
    /// A viewport with the cursor at the top-left of the file.
    ///
    /// Zero dimensions are raised to 1.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cx: 0,
            cy: 0,
            rows: rows.max(1),
            cols: cols.max(1),
            topline: 0,
            needs_clear: false,
        }
    }

    /// A viewport covering the whole terminal.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self::new(usize::from(size.rows), usize::from(size.cols))
    }

    // -- Accessors ----------------------------------------------------------

    /// Cursor column.
    #[inline]
    #[must_use]
    pub const fn cx(&self) -> usize {
        self.cx
    }

    /// Cursor row within the viewport.
    #[inline]
    #[must_use]
    pub const fn cy(&self) -> usize {
        self.cy
    }

    /// Viewport height.
    #[inline]
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Viewport width.
    #[inline]
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Index of the first visible line.
    #[inline]
    #[must_use]
    pub const fn topline(&self) -> usize {
        self.topline
    }

    /// Document line under the cursor.
    #[inline]
    #[must_use]
    pub const fn cursor_line(&self) -> usize {
        self.topline + self.cy
    }

    /// Whether the next frame must start from a cleared screen.
    #[inline]
    #[must_use]
    pub const fn needs_clear(&self) -> bool {
        self.needs_clear
    }

    /// Read and reset the clear flag.
    pub const fn take_clear(&mut self) -> bool {
        let was = self.needs_clear;
        self.needs_clear = false;
        was
    }

    // -- Movement -----------------------------------------------------------

    /// Apply `motion` over a file of `line_count` lines.
    pub fn apply(&mut self, motion: Motion, line_count: usize) {
        match motion {
            Motion::Up => self.step_up(),
            Motion::Down => self.step_down(line_count),
            Motion::Left => self.cx = self.cx.saturating_sub(1),
            Motion::Right => {
                if self.cx + 1 < self.cols {
                    self.cx += 1;
                }
            }
            Motion::LineStart => self.cx = 0,
            Motion::LineEnd => self.cx = self.cols - 1,
            Motion::PageUp => {
                for _ in 0..self.rows {
                    self.step_up();
                }
            }
            Motion::PageDown => {
                for _ in 0..self.rows {
                    self.step_down(line_count);
                }
            }
        }
    }

    fn step_up(&mut self) {
        if self.cy > 0 {
            self.cy -= 1;
        } else if self.topline > 0 {
            self.topline -= 1;
            self.needs_clear = true;
        }
    }

    fn step_down(&mut self, line_count: usize) {
        if self.cursor_line() + 1 >= line_count {
            return;
        }
        if self.cy + 1 < self.rows {
            self.cy += 1;
        } else {
            self.topline += 1;
            self.needs_clear = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
