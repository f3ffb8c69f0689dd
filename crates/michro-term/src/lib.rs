// SPDX-License-Identifier: MIT
//
// michro-term — terminal layer for michro.
//
// Raw termios, hand-written ANSI escapes, and a byte-at-a-time key
// decoder. No TUI framework in between: the viewer needs exactly a dozen
// escape sequences and one `read()` policy, and this crate is those.
//
//   terminal   → raw-mode Session with RAII restore, geometry queries
//   input      → Key events decoded from raw bytes with bounded lookahead
//   output     → AppendBuffer, one terminal write per frame
//   ansi       → escape sequence encoding
//   event_loop → paint / write / read / apply

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod terminal;
