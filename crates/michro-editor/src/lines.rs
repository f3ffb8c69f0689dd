//! Line store — the file, split into lines, held read-only in memory.
//!
//! A [`LineStore`] is loaded once and never mutated. Each [`Line`] owns the
//! bytes of one record of the file with its terminator removed, so
//! `line.len()` is the displayable length.
//!
//! # Design choices
//!
//! - **Bytes, not `String`.** The viewer does no encoding validation and no
//!   Unicode-aware measurement, so a file with invalid UTF-8 loads fine and
//!   renders whatever the terminal makes of it.
//!
//! - **Terminators.** A record ends at `\n`. A `\r` directly before the `\n`
//!   is part of the terminator too, so CRLF files don't render a stray
//!   carriage return at the end of each row. A final record without a
//!   terminator is still a line.
//!
//! - **Indexed `Vec`.** Random access is O(1). Callers that index past
//!   [`len`](LineStore::len) get a panic through `Index` or `None` through
//!   [`line`](LineStore::line).

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Index;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to load a file into a [`LineStore`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened.
    #[error("{}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was opened but reading it failed partway.
    #[error("{}: read failed: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One line of the file, terminator excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    bytes: Box<[u8]>,
}

impl Line {
    fn from_record(mut record: Vec<u8>) -> Self {
        if record.last() == Some(&b'\n') {
            record.pop();
            if record.last() == Some(&b'\r') {
                record.pop();
            }
        }
        Self {
            bytes: record.into_boxed_slice(),
        }
    }

    /// The line's bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Displayable length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the line has no displayable bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LineStore
// ---------------------------------------------------------------------------

/// An ordered, read-only sequence of lines.
///
/// Index `i` is valid iff `i < len()`. Order is file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStore {
    lines: Vec<Line>,
}

impl LineStore {
    /// Load the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Open`] if the file cannot be opened and
    /// [`LoadError::Read`] if reading fails after that.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_reader(BufReader::new(file)).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), lines = store.len(), "loaded file");
        Ok(store)
    }

    /// Split everything `reader` yields into lines.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn from_reader(mut reader: impl BufRead) -> io::Result<Self> {
        let mut lines = Vec::new();
        loop {
            let mut record = Vec::new();
            if reader.read_until(b'\n', &mut record)? == 0 {
                break;
            }
            lines.push(Line::from_record(record));
        }
        Ok(Self { lines })
    }

    /// Split an in-memory byte slice into lines.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let lines = bytes
            .split_inclusive(|&b| b == b'\n')
            .map(|record| Line::from_record(record.to_vec()))
            .collect();
        Self { lines }
    }

    /// Number of lines.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the file had no lines at all (zero bytes).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line at `index`, or `None` past the end.
    #[inline]
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Iterate over lines in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }
}

impl Index<usize> for LineStore {
    type Output = Line;

    fn index(&self, index: usize) -> &Line {
        &self.lines[index]
    }
}

impl<'a> IntoIterator for &'a LineStore {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
