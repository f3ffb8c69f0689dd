//! The viewer — line store + viewport wired into the terminal event loop.
//!
//! [`Viewer`] is the [`App`] the event loop drives: keys become
//! [`Motion`]s, frames come from [`render_frame`]. [`run`] is the whole
//! program minus argument parsing: enter raw mode, load the file, loop
//! until quit, release the terminal.

use std::path::Path;

use michro_term::error::TermError;
use michro_term::event_loop::{Action, App, EventLoop};
use michro_term::input::Key;
use michro_term::output::AppendBuffer;
use michro_term::terminal::Size;
use thiserror::Error;

use crate::lines::{LineStore, LoadError};
use crate::options::Options;
use crate::render::render_frame;
use crate::viewport::{Motion, Viewport};

/// Key that ends the session.
pub const QUIT_KEY: Key = Key::ctrl(b'q');

/// Anything that ends a viewing session early.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Terminal(#[from] TermError),
}

/// A read-only file view.
#[derive(Debug)]
pub struct Viewer {
    store: LineStore,
    viewport: Viewport,
    options: Options,
}

impl Viewer {
    /// A viewer over `store`, sized 1x1 until the first resize.
    #[must_use]
    pub fn new(store: LineStore, options: Options) -> Self {
        Self {
            store,
            viewport: Viewport::new(1, 1),
            options,
        }
    }

    /// Current cursor and scroll state.
    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}

impl App for Viewer {
    fn on_key(&mut self, key: Key) -> Action {
        if key == QUIT_KEY {
            return Action::Quit;
        }
        if let Some(motion) = Motion::from_key(key, self.options.wasd) {
            self.viewport.apply(motion, self.store.len());
        }
        Action::Continue
    }

    fn on_resize(&mut self, size: Size) {
        tracing::debug!(cols = size.cols, rows = size.rows, "viewport sized");
        self.viewport = Viewport::from_size(size);
    }

    fn paint(&mut self, out: &mut AppendBuffer) {
        render_frame(&mut self.viewport, &self.store, self.options.clip_lines, out);
    }
}

/// View the file at `path` on the process's terminal until the quit key.
///
/// Raw mode is entered before the file is read. On every return path the
/// screen is cleared and the original terminal attributes are restored
/// before this function returns.
///
/// # Errors
///
/// Returns [`ViewerError::Terminal`] if the terminal cannot be configured,
/// measured, read, or written, and [`ViewerError::Load`] if the file cannot
/// be read.
pub fn run(path: &Path, options: Options) -> Result<(), ViewerError> {
    let mut event_loop = EventLoop::new()?;
    // On a load error the loop is dropped here, which releases the terminal.
    let store = LineStore::load(path)?;
    let mut viewer = Viewer::new(store, options);
    event_loop.run(&mut viewer)?;
    event_loop.close()?;
    Ok(())
}
