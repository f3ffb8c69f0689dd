// SPDX-License-Identifier: MIT
//
// Terminal error taxonomy.
//
// Every variant here is fatal to the session: the viewer cannot keep
// drawing without sane terminal attributes, a known screen size, and a
// working input stream. They all funnel through `Session::die`.

use std::io;

use thiserror::Error;

/// A fatal terminal failure.
#[derive(Debug, Error)]
pub enum TermError {
    /// Getting or setting terminal attributes failed (`tcgetattr`/`tcsetattr`).
    #[error("{op}: {source}")]
    TerminalConfig {
        /// The failing call, e.g. `"tcsetattr"`.
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Neither the `ioctl` query nor the cursor-report probe produced a size.
    #[error("get_window_size: unable to determine terminal size")]
    Geometry,

    /// A read from the terminal failed with something other than a timeout.
    #[error("read: {0}")]
    Read(#[source] io::Error),

    /// Writing a frame or a probe to the terminal failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),
}

impl TermError {
    /// Build a [`TermError::TerminalConfig`] for the named call.
    #[must_use]
    pub const fn config(op: &'static str, source: io::Error) -> Self {
        Self::TerminalConfig { op, source }
    }
}

/// Result alias for terminal operations.
pub type Result<T> = std::result::Result<T, TermError>;
