// SPDX-License-Identifier: MIT
//
// Event loop — the heartbeat of the viewer.
//
// One thread, one terminal, one loop:
//
//   paint → single write → block for a key → apply it → repeat
//
// There is no reader thread and no tick. The raw-mode read timeout
// (VTIME) bounds each read, and the input decoder retries timeouts until a
// key arrives, so the loop sleeps in `read()` between keypresses. That same
// timeout resolves the Escape-vs-escape-sequence ambiguity.
//
// Any terminal failure inside the loop is fatal and goes through
// `Session::die`. Quitting is just returning: the session's release path
// clears the screen and restores the terminal, the same path every other
// exit takes.

use crate::error::Result;
use crate::input::Key;
use crate::output::AppendBuffer;
use crate::terminal::{Session, Size, Stdio, Tty};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// The loop calls [`on_resize`](App::on_resize) once with the terminal
/// size before the first frame, then alternates [`paint`](App::paint) and
/// [`on_key`](App::on_key) until a key returns [`Action::Quit`].
pub trait App {
    /// Handle one decoded key.
    ///
    /// Return [`Action::Quit`] to exit the event loop.
    fn on_key(&mut self, key: Key) -> Action;

    /// Learn the terminal size. Called before the first paint.
    fn on_resize(&mut self, _size: Size) {}

    /// Append the next frame's bytes to `out`.
    ///
    /// `out` is empty on entry. Everything appended is written to the
    /// terminal in a single call once `paint` returns.
    fn paint(&mut self, out: &mut AppendBuffer);
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the raw-mode [`Session`] and the per-frame [`AppendBuffer`].
///
/// # Example
///
/// ```no_run
/// use michro_term::event_loop::{Action, App, EventLoop};
/// use michro_term::input::Key;
/// use michro_term::output::AppendBuffer;
///
/// struct MyApp;
///
/// impl App for MyApp {
///     fn on_key(&mut self, key: Key) -> Action {
///         if key == Key::ctrl(b'q') {
///             return Action::Quit;
///         }
///         Action::Continue
///     }
///
///     fn paint(&mut self, out: &mut AppendBuffer) {
///         out.append(b"~");
///     }
/// }
///
/// let mut event_loop = EventLoop::new()?;
/// event_loop.run(&mut MyApp)?;
/// event_loop.close()?;
/// # Ok::<(), michro_term::error::TermError>(())
/// ```
pub struct EventLoop<T: Tty = Stdio> {
    session: Session<T>,
    frame: AppendBuffer,
}

impl EventLoop<Stdio> {
    /// Put the process's terminal into raw mode and build a loop around it.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be entered.
    pub fn new() -> Result<Self> {
        Ok(Self::with_session(Session::enable_raw_mode()?))
    }
}

impl<T: Tty> EventLoop<T> {
    /// Build a loop around an existing session.
    #[must_use]
    pub fn with_session(session: Session<T>) -> Self {
        Self {
            session,
            frame: AppendBuffer::new(),
        }
    }

    /// The underlying session.
    #[inline]
    #[must_use]
    pub const fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Run until the application returns [`Action::Quit`].
    ///
    /// # Errors
    ///
    /// Returns the fatal terminal error that stopped the loop, after it
    /// has been reported through [`Session::die`].
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        self.run_inner(app).map_err(|e| self.session.die(e))
    }

    fn run_inner(&mut self, app: &mut impl App) -> Result<()> {
        let size = self.session.window_size()?;
        app.on_resize(size);

        loop {
            self.frame.clear();
            app.paint(&mut self.frame);
            self.session.write_frame(&mut self.frame)?;

            let key = self.session.read_key()?;
            if app.on_key(key) == Action::Quit {
                tracing::info!("quit requested");
                return Ok(());
            }
        }
    }

    /// Release the terminal, reporting any restore failure.
    ///
    /// # Errors
    ///
    /// Returns the failure from the screen clear or attribute restore.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
