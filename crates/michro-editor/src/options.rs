//! Viewer options.
//!
//! | Option       | Default | Effect                                           |
//! |--------------|---------|--------------------------------------------------|
//! | `clip_lines` | true    | Write at most `cols` bytes of each line          |
//! | `wasd`       | true    | `w`/`a`/`s`/`d` move like Up/Left/Down/Right     |
//!
//! With `clip_lines` off, every line is written in full and the terminal
//! wraps anything wider than the screen onto the following rows, pushing
//! the rest of the frame down. That is the classic behaviour; clipping keeps
//! one file line per screen row.

/// Options that change how the viewer renders and reacts to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Clip each rendered line to the viewport width.
    pub clip_lines: bool,

    /// Accept `w`/`a`/`s`/`d` as arrow keys.
    pub wasd: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            clip_lines: true,
            wasd: true,
        }
    }
}
