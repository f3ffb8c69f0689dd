//! Frame rendering — viewport + line store → one batch of terminal bytes.
//!
//! Every frame is drawn top to bottom without diffing:
//!
//! ```text
//! [ESC[2J]            only when the viewport scrolled since the last frame
//! ESC[?25l ESC[H      hide cursor, home
//! line 0  ESC[K \r\n  each row: content (or `~` past EOF), clear to EOL
//! line 1  ESC[K \r\n
//! ...
//! ~       ESC[K       no \r\n after the last row (it would scroll the screen)
//! ESC[<cy>;<cx>H      place the cursor
//! ESC[?25h            show it
//! ```
//!
//! Writing into an [`AppendBuffer`] cannot fail, so the `io::Result`s from
//! the `ansi` helpers are discarded.

use michro_term::ansi;
use michro_term::output::AppendBuffer;

use crate::lines::LineStore;
use crate::viewport::Viewport;

/// Marker drawn on rows past the end of the file.
pub const FILLER: &[u8] = b"~";

/// Append one complete frame to `out`.
///
/// Consumes the viewport's clear flag: if it was set, the frame begins with
/// a full screen clear.
pub fn render_frame(vp: &mut Viewport, store: &LineStore, clip_lines: bool, out: &mut AppendBuffer) {
    if vp.take_clear() {
        ansi::clear_screen(out).ok();
    }
    ansi::cursor_hide(out).ok();
    ansi::cursor_home(out).ok();

    draw_rows(vp, store, clip_lines, out);

    ansi::cursor_to(out, vp.cx(), vp.cy()).ok();
    ansi::cursor_show(out).ok();
}

fn draw_rows(vp: &Viewport, store: &LineStore, clip_lines: bool, out: &mut AppendBuffer) {
    let rows = vp.rows();
    for y in 0..rows {
        match store.line(vp.topline() + y) {
            Some(line) => {
                let bytes = line.as_bytes();
                if clip_lines {
                    out.append(&bytes[..bytes.len().min(vp.cols())]);
                } else {
                    out.append(bytes);
                }
            }
            None => out.append(FILLER),
        }
        ansi::clear_line(out).ok();
        if y + 1 < rows {
            out.append(b"\r\n");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
