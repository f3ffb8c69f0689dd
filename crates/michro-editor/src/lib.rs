//! # michro-editor — Viewer core for michro
//!
//! Everything between the terminal layer and the command line:
//!
//! - **[`lines`]** — `LineStore`, the file as an indexed list of byte lines
//! - **[`viewport`]** — cursor, scroll offset, and the motions that move them
//! - **[`render`]** — one full frame from a viewport and a line store
//! - **[`options`]** — behaviour toggles (line clipping, WASD keys)
//! - **[`viewer`]** — the `App` that ties them to michro-term's event loop
//!
//! The store is immutable after load; the viewport is the only state that
//! changes while the program runs.

pub mod lines;
pub mod options;
pub mod render;
pub mod viewer;
pub mod viewport;
