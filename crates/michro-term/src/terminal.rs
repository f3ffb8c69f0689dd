// SPDX-License-Identifier: MIT
//
// Terminal session — raw mode, geometry, and guaranteed restoration.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), and raw fd reads/writes. These
// are the standard POSIX interfaces for terminal control — there is no
// safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// A `Session` is the terminal in raw mode. Constructing one saves the
// original attributes and switches to raw mode; releasing it (explicitly
// with `close`, or implicitly on drop) restores them. Restoration runs at
// most once no matter how many release paths fire.
//
// The OS-facing half lives behind the `Tty` trait so the session logic
// can be exercised against a mock in tests. `Stdio` is the real backend:
// stdin for attributes and input, fd 1 (unbuffered) for output and
// TIOCGWINSZ.
//
// Panics bypass destructors that run after the unwinding frame, so a
// process-wide panic hook keeps a backup of the original termios and
// restores it before the panic message prints.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use bitflags::bitflags;

use crate::ansi;
use crate::error::{Result, TermError};
use crate::input::{self, ByteSource, Key};
use crate::output::AppendBuffer;

/// VMIN: a read may return with zero bytes.
pub const READ_MIN_BYTES: u8 = 0;
/// VTIME in deciseconds: a read waits at most 100ms.
pub const READ_TIMEOUT_DECISECONDS: u8 = 1;

/// Longest cursor-position reply we accept, excluding the final `R`.
const REPORT_MAX_LEN: usize = 31;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

/// Parse a cursor position report body: `ESC [ <row> ; <col>`.
///
/// The trailing `R` must already be stripped. Returns `None` for anything
/// malformed, including zero dimensions.
#[must_use]
pub fn parse_cursor_report(reply: &[u8]) -> Option<Size> {
    let body = reply.strip_prefix(b"\x1b[")?;
    let sep = body.iter().position(|&b| b == b';')?;
    let rows = parse_decimal(&body[..sep])?;
    let cols = parse_decimal(&body[sep + 1..])?;
    let size = Size { cols, rows };
    (!size.is_empty()).then_some(size)
}

fn parse_decimal(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits.iter().try_fold(0u16, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u16::from(d - b'0'))
    })
}

// ─── Tty backend ────────────────────────────────────────────────────────────

/// The OS-facing operations a [`Session`] needs.
///
/// Input comes through [`ByteSource`] (honouring the raw-mode read
/// timeout), output through [`Write`].
pub trait Tty: ByteSource + Write {
    /// Saved terminal attributes.
    type Attrs: Clone;

    /// Read the current attributes.
    ///
    /// # Errors
    ///
    /// Returns the OS error from the attribute query.
    fn attrs(&self) -> io::Result<Self::Attrs>;

    /// Apply attributes, flushing pending input first.
    ///
    /// # Errors
    ///
    /// Returns the OS error from the attribute update.
    fn set_attrs(&mut self, attrs: &Self::Attrs) -> io::Result<()>;

    /// Derive raw-mode attributes from the originals.
    fn make_raw(&self, original: &Self::Attrs) -> Self::Attrs;

    /// Window size from the OS, or `None` if unavailable or zero.
    fn window_size(&self) -> Option<Size>;

    /// Record the originals for emergency restoration on panic.
    fn backup_for_panic(&self, _original: &Self::Attrs) {}

    /// Forget the panic backup once restoration has happened.
    fn clear_panic_backup(&self) {}
}

/// The process's own terminal: stdin for attributes and input, stdout for
/// output and geometry.
#[derive(Debug)]
pub struct Stdio {
    #[cfg(unix)]
    stdout: FdWriter,
    #[cfg(not(unix))]
    stdout: io::Stdout,
}

impl Stdio {
    /// Create a handle on the process's standard streams.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            stdout: FdWriter::new(libc::STDOUT_FILENO),
            #[cfg(not(unix))]
            stdout: io::stdout(),
        }
    }
}

impl Default for Stdio {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stdout.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// Unbuffered writer on a borrowed file descriptor.
///
/// `io::Stdout` is line-buffered, which would split every multi-row frame
/// at its last `\r\n`. Each `write` here is exactly one `write(2)`;
/// `write_all` loops over short writes and retries `EINTR`. The descriptor
/// is not closed on drop.
#[cfg(unix)]
#[derive(Debug)]
pub struct FdWriter {
    fd: libc::c_int,
}

#[cfg(unix)]
impl FdWriter {
    /// Wrap `fd`. The caller keeps ownership of the descriptor.
    #[must_use]
    pub const fn new(fd: libc::c_int) -> Self {
        Self { fd }
    }
}

#[cfg(unix)]
impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast::<libc::c_void>(), buf.len()) };
        usize::try_from(n).map_err(|_| io::Error::last_os_error())
    }

    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl ByteSource for Stdio {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                // Some platforms report the VTIME expiry as EAGAIN.
                if err.kind() == io::ErrorKind::WouldBlock {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(unix)]
impl Tty for Stdio {
    type Attrs = libc::termios;

    fn attrs(&self) -> io::Result<libc::termios> {
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(termios)
        }
    }

    fn set_attrs(&mut self, attrs: &libc::termios) -> io::Result<()> {
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, attrs) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn make_raw(&self, original: &libc::termios) -> libc::termios {
        raw_termios(original)
    }

    fn window_size(&self) -> Option<Size> {
        get_size()
    }

    fn backup_for_panic(&self, original: &libc::termios) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(*original);
        }
    }

    fn clear_panic_backup(&self) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
    }
}

#[cfg(not(unix))]
impl ByteSource for Stdio {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

#[cfg(not(unix))]
impl Tty for Stdio {
    type Attrs = ();

    fn attrs(&self) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn set_attrs(&mut self, _attrs: &()) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn make_raw(&self, _original: &()) {}

    fn window_size(&self) -> Option<Size> {
        None
    }
}

/// Raw-mode attributes derived from `original`.
///
/// Input: no break-to-SIGINT, no CR→NL translation, no parity check, no
/// eighth-bit stripping, no XON/XOFF flow control. Output: no
/// post-processing. Local: no echo, canonical mode, Ctrl-V, or
/// signal-generating keys. Characters are 8 bits. Reads return after
/// [`READ_TIMEOUT_DECISECONDS`] even with nothing to read.
#[cfg(unix)]
#[must_use]
pub fn raw_termios(original: &libc::termios) -> libc::termios {
    let mut raw = *original;
    raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    raw.c_oflag &= !libc::OPOST;
    raw.c_cflag |= libc::CS8;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
    raw.c_cc[libc::VMIN] = READ_MIN_BYTES;
    raw.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;
    raw
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal, the query fails, or the
/// terminal reports a zero dimension.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    let size = Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    };
    (result == 0 && !size.is_empty()).then_some(size)
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Session`] owns its own copy, but the panic hook can't reach it.
/// This backup — behind a [`Mutex`], not `static mut` — lets the hook
/// restore cooked mode without the struct.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.take() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original);
            }
        }
    }
}

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, no way to read the error message. The hook
/// re-shows the cursor with a raw write to fd 1 (bypassing the stdout lock,
/// which the panicking frame may hold), restores termios, then delegates to
/// the original handler.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            #[cfg(unix)]
            {
                emergency_restore();
                restore_termios_from_backup();
            }

            original(info);
        }));
    });
}

/// Show the cursor and return to column 0 so the panic message is legible.
#[cfg(unix)]
fn emergency_restore() {
    const RESTORE: &[u8] = b"\x1b[?25h\r\n";
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            RESTORE.as_ptr().cast::<libc::c_void>(),
            RESTORE.len(),
        );
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

bitflags! {
    /// Session lifecycle flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SessionFlags: u8 {
        /// Raw mode is active and restoration is still owed.
        const RAW  = 0b0000_0001;
        /// A fatal error was reported. The screen must not be cleared
        /// again, or the message would be erased.
        const DEAD = 0b0000_0010;
    }
}

/// The terminal in raw mode, with RAII restoration.
///
/// # Example
///
/// ```no_run
/// use michro_term::terminal::Session;
///
/// let mut session = Session::enable_raw_mode()?;
/// let size = session.window_size()?;
/// let key = session.read_key()?;
/// session.close()?; // or just drop it
/// # Ok::<(), michro_term::error::TermError>(())
/// ```
pub struct Session<T: Tty = Stdio> {
    tty: T,
    original: T::Attrs,
    flags: SessionFlags,
}

impl Session<Stdio> {
    /// Put the process's terminal into raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalConfig`] if the attributes cannot be
    /// read or applied (for example when stdin is not a terminal).
    pub fn enable_raw_mode() -> Result<Self> {
        install_panic_hook();
        Self::with_tty(Stdio::new())
    }
}

impl<T: Tty> Session<T> {
    /// Enter raw mode on an arbitrary backend.
    ///
    /// The original attributes are captured first. If applying the raw
    /// attributes fails, no session exists and nothing is owed.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalConfig`] naming the failing call.
    pub fn with_tty(mut tty: T) -> Result<Self> {
        let original = tty
            .attrs()
            .map_err(|e| TermError::config("tcgetattr", e))?;
        let raw = tty.make_raw(&original);
        tty.backup_for_panic(&original);
        if let Err(e) = tty.set_attrs(&raw) {
            tty.clear_panic_backup();
            return Err(TermError::config("tcsetattr", e));
        }

        tracing::info!("entered raw mode");
        Ok(Self {
            tty,
            original,
            flags: SessionFlags::RAW,
        })
    }

    /// Whether raw mode is active (restoration still owed).
    #[inline]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.flags.contains(SessionFlags::RAW)
    }

    /// Whether a fatal error has been reported through [`die`](Self::die).
    #[inline]
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.flags.contains(SessionFlags::DEAD)
    }

    /// The backend.
    #[inline]
    #[must_use]
    pub const fn tty(&self) -> &T {
        &self.tty
    }

    /// Restore the original attributes.
    ///
    /// Runs at most once per session; later calls (including the one made
    /// on drop) are no-ops.
    ///
    /// # Errors
    ///
    /// A failed restore is fatal: it goes through [`die`](Self::die) and
    /// comes back as [`TermError::TerminalConfig`].
    pub fn disable_raw_mode(&mut self) -> Result<()> {
        if !self.flags.contains(SessionFlags::RAW) {
            return Ok(());
        }
        self.flags.remove(SessionFlags::RAW);
        self.tty.clear_panic_backup();

        match self.tty.set_attrs(&self.original) {
            Ok(()) => {
                tracing::info!("restored terminal attributes");
                Ok(())
            }
            Err(e) => Err(self.die(TermError::config("tcsetattr", e))),
        }
    }

    /// Report a fatal error.
    ///
    /// Clears the screen unless a previous fatal error already did (so its
    /// message stays visible), marks the session dead so release won't
    /// clear again, and hands the error back for the caller to print once
    /// the terminal is restored.
    pub fn die(&mut self, err: TermError) -> TermError {
        tracing::error!(error = %err, "fatal terminal error");
        if !self.is_dead() {
            let _ = self.clear_screen();
            self.flags.insert(SessionFlags::DEAD);
        }
        err
    }

    /// Terminal size in cells.
    ///
    /// Tries the backend's OS query first. When that is unavailable, moves
    /// the cursor to the far bottom-right corner and asks the terminal where
    /// it ended up.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Geometry`] if both paths fail.
    pub fn window_size(&mut self) -> Result<Size> {
        if let Some(size) = self.tty.window_size() {
            tracing::debug!(cols = size.cols, rows = size.rows, "window size from ioctl");
            return Ok(size);
        }

        let size = self.query_cursor_position().ok_or(TermError::Geometry)?;
        tracing::debug!(cols = size.cols, rows = size.rows, "window size from cursor report");
        Ok(size)
    }

    fn query_cursor_position(&mut self) -> Option<Size> {
        ansi::probe_size(&mut self.tty).ok()?;
        self.tty.flush().ok()?;

        let mut reply = Vec::with_capacity(REPORT_MAX_LEN);
        while reply.len() < REPORT_MAX_LEN {
            match self.tty.read_byte() {
                Ok(Some(b'R')) | Ok(None) | Err(_) => break,
                Ok(Some(byte)) => reply.push(byte),
            }
        }
        parse_cursor_report(&reply)
    }

    /// Block until one key is available.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Read`] on a non-timeout read failure.
    pub fn read_key(&mut self) -> Result<Key> {
        input::read_key(&mut self.tty)
    }

    /// Write a finished frame in a single call. The buffer is emptied.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Write`] if the terminal write fails.
    pub fn write_frame(&mut self, frame: &mut AppendBuffer) -> Result<()> {
        frame.flush_to(&mut self.tty).map_err(TermError::Write)
    }

    /// Release the session: clear the screen (unless dead) and restore the
    /// original attributes. Equivalent to dropping it, but reports errors.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the screen clear and the restore.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.is_raw() {
            return Ok(());
        }
        let cleared = if self.is_dead() {
            Ok(())
        } else {
            self.clear_screen()
        };
        self.disable_raw_mode()?;
        cleared
    }

    fn clear_screen(&mut self) -> Result<()> {
        let mut seq = AppendBuffer::new();
        seq.append(ansi::CLEAR_SCREEN);
        seq.append(ansi::CURSOR_HOME);
        self.write_frame(&mut seq)
    }
}

impl<T: Tty> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!(error = %e, "failed to release terminal session");
        }
    }
}

// ─── Test support ───────────────────────────────────────────────────────────


// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::mock::{Attrs, MockTty};
    use super::*;
    use crate::input::script::Step;
    use pretty_assertions::assert_eq;

    const COOKED: Attrs = Attrs { raw: false };
    const RAW: Attrs = Attrs { raw: true };

    fn report(bytes: &[u8]) -> Vec<Step> {
        bytes.iter().map(|&b| Step::Byte(b)).collect()
    }

    // ── Size / report parsing ───────────────────────────────────────

    #[test]
    fn size_is_empty() {
        assert!(Size { cols: 0, rows: 24 }.is_empty());
        assert!(Size { cols: 80, rows: 0 }.is_empty());
        assert!(!Size { cols: 80, rows: 24 }.is_empty());
    }

    #[test]
    fn parse_report_basic() {
        assert_eq!(
            parse_cursor_report(b"\x1b[24;80"),
            Some(Size { cols: 80, rows: 24 })
        );
    }

    #[test]
    fn parse_report_large() {
        assert_eq!(
            parse_cursor_report(b"\x1b[999;999"),
            Some(Size { cols: 999, rows: 999 })
        );
    }

    #[test]
    fn parse_report_rejects_missing_prefix() {
        assert_eq!(parse_cursor_report(b"[24;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b24;80"), None);
        assert_eq!(parse_cursor_report(b"24;80"), None);
    }

    #[test]
    fn parse_report_rejects_garbage() {
        assert_eq!(parse_cursor_report(b"\x1b[24"), None);
        assert_eq!(parse_cursor_report(b"\x1b[;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24;"), None);
        assert_eq!(parse_cursor_report(b"\x1b[2a;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[0;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[99999;80"), None);
        assert_eq!(parse_cursor_report(b""), None);
    }

    // ── Raw attributes ──────────────────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn raw_termios_flags() {
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        original.c_iflag = libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON;
        original.c_oflag = libc::OPOST;
        original.c_lflag = libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG;
        original.c_cc[libc::VMIN] = 1;

        let raw = raw_termios(&original);
        assert_eq!(raw.c_iflag, 0);
        assert_eq!(raw.c_oflag & libc::OPOST, 0);
        assert_eq!(raw.c_lflag, 0);
        assert_eq!(raw.c_cflag & libc::CS8, libc::CS8);
        assert_eq!(raw.c_cc[libc::VMIN], 0);
        assert_eq!(raw.c_cc[libc::VTIME], 1);
    }

    #[cfg(unix)]
    #[test]
    fn raw_termios_keeps_unrelated_flags() {
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        original.c_lflag = libc::ECHOE;
        let raw = raw_termios(&original);
        assert_eq!(raw.c_lflag & libc::ECHOE, libc::ECHOE);
    }

    // ── Enter ──────────────────────────────────────────────────────

    #[test]
    fn enter_applies_raw_attributes() {
        let (tty, log) = MockTty::new();
        let session = Session::with_tty(tty).unwrap();
        assert!(session.is_raw());
        assert!(!session.is_dead());
        assert_eq!(log.borrow().sets, vec![RAW]);
        assert_eq!(log.borrow().backup, Some(COOKED));
    }

    #[test]
    fn enter_fails_when_attributes_unreadable() {
        let (tty, log) = MockTty::new();
        log.borrow_mut().fail_get = true;
        let err = Session::with_tty(tty).err().unwrap();
        assert!(matches!(err, TermError::TerminalConfig { op: "tcgetattr", .. }));
        assert!(log.borrow().sets.is_empty());
    }

    #[test]
    fn enter_failure_owes_no_restoration() {
        let (tty, log) = MockTty::new();
        log.borrow_mut().fail_set_at = Some(0);
        let err = Session::with_tty(tty).err().unwrap();
        assert!(matches!(err, TermError::TerminalConfig { op: "tcsetattr", .. }));
        // Only the failed raw attempt; no restore, no screen clear.
        assert_eq!(log.borrow().sets, vec![RAW]);
        assert!(log.borrow().written.is_empty());
        assert_eq!(log.borrow().backup, None);
    }

    // ── Release ────────────────────────────────────────────────────

    #[test]
    fn close_clears_and_restores() {
        let (tty, log) = MockTty::new();
        let session = Session::with_tty(tty).unwrap();
        session.close().unwrap();

        let log = log.borrow();
        assert_eq!(log.sets, vec![RAW, COOKED]);
        assert_eq!(log.written, b"\x1b[2J\x1b[H");
        assert_eq!(log.backup, None);
    }

    #[test]
    fn drop_restores() {
        let (tty, log) = MockTty::new();
        drop(Session::with_tty(tty).unwrap());
        assert_eq!(log.borrow().sets, vec![RAW, COOKED]);
        assert_eq!(log.borrow().count(ansi::CLEAR_SCREEN), 1);
    }

    #[test]
    fn restoration_runs_exactly_once() {
        let (tty, log) = MockTty::new();
        let mut session = Session::with_tty(tty).unwrap();
        session.disable_raw_mode().unwrap();
        session.disable_raw_mode().unwrap();
        assert!(!session.is_raw());
        drop(session);
        assert_eq!(log.borrow().sets, vec![RAW, COOKED]);
    }

    #[test]
    fn close_after_explicit_disable_is_noop() {
        let (tty, log) = MockTty::new();
        let mut session = Session::with_tty(tty).unwrap();
        session.disable_raw_mode().unwrap();
        session.close().unwrap();
        assert_eq!(log.borrow().sets, vec![RAW, COOKED]);
    }

    #[test]
    fn failed_restore_is_fatal() {
        let (tty, log) = MockTty::new();
        log.borrow_mut().fail_set_at = Some(1);
        let mut session = Session::with_tty(tty).unwrap();
        let err = session.disable_raw_mode().unwrap_err();
        assert!(matches!(err, TermError::TerminalConfig { op: "tcsetattr", .. }));
        assert!(session.is_dead());
        drop(session);
        // No second attempt from drop.
        assert_eq!(log.borrow().sets.len(), 2);
    }

    // ── Die ─────────────────────────────────────────────────────────

    #[test]
    fn die_clears_once_and_release_keeps_message() {
        let (tty, log) = MockTty::new();
        let mut session = Session::with_tty(tty).unwrap();
        let err = session.die(TermError::Geometry);
        assert!(matches!(err, TermError::Geometry));
        assert!(session.is_dead());

        // A second fatal error must not clear again.
        let _ = session.die(TermError::Geometry);
        drop(session);

        let log = log.borrow();
        assert_eq!(log.count(ansi::CLEAR_SCREEN), 1);
        assert_eq!(log.sets, vec![RAW, COOKED]);
    }

    // ── Geometry ────────────────────────────────────────────────────

    #[test]
    fn window_size_prefers_ioctl() {
        let (tty, log) = MockTty::new();
        let tty = tty.with_size(Some(Size { cols: 120, rows: 40 }));
        let mut session = Session::with_tty(tty).unwrap();
        assert_eq!(
            session.window_size().unwrap(),
            Size { cols: 120, rows: 40 }
        );
        assert!(log.borrow().written.is_empty());
    }

    #[test]
    fn window_size_falls_back_to_cursor_report() {
        let (tty, log) = MockTty::new();
        let tty = tty.with_size(None).with_input(report(b"\x1b[33;101R"));
        let mut session = Session::with_tty(tty).unwrap();
        assert_eq!(
            session.window_size().unwrap(),
            Size { cols: 101, rows: 33 }
        );
        assert_eq!(log.borrow().written, b"\x1b[999C\x1b[999B\x1b[6n");
    }

    #[test]
    fn cursor_report_stops_at_r() {
        let (tty, _log) = MockTty::new();
        let tty = tty.with_size(None).with_input(report(b"\x1b[5;7Rxyz"));
        let mut session = Session::with_tty(tty).unwrap();
        assert_eq!(session.window_size().unwrap(), Size { cols: 7, rows: 5 });
        assert_eq!(session.tty().input.remaining(), 3);
    }

    #[test]
    fn cursor_report_timeout_is_geometry_error() {
        let (tty, _log) = MockTty::new();
        let mut steps = report(b"\x1b[24");
        steps.push(Step::Timeout);
        let tty = tty.with_size(None).with_input(steps);
        let mut session = Session::with_tty(tty).unwrap();
        assert!(matches!(session.window_size(), Err(TermError::Geometry)));
    }

    #[test]
    fn cursor_report_is_bounded() {
        let (tty, _log) = MockTty::new();
        let mut steps = report(b"\x1b[");
        steps.extend(std::iter::repeat_n(Step::Byte(b'1'), 64));
        let tty = tty.with_size(None).with_input(steps);
        let mut session = Session::with_tty(tty).unwrap();
        assert!(matches!(session.window_size(), Err(TermError::Geometry)));
        // 31 bytes read, the rest untouched.
        assert_eq!(session.tty().input.consumed, 31);
    }

    #[test]
    fn probe_write_failure_is_geometry_error() {
        let (tty, log) = MockTty::new();
        let tty = tty.with_size(None);
        let mut session = Session::with_tty(tty).unwrap();
        log.borrow_mut().fail_write = true;
        assert!(matches!(session.window_size(), Err(TermError::Geometry)));
    }

    // ── I/O ─────────────────────────────────────────────────────────

    #[test]
    fn read_key_goes_through_decoder() {
        let (tty, _log) = MockTty::new();
        let tty = tty.with_input([
            Step::Timeout,
            Step::Byte(0x1b),
            Step::Byte(b'['),
            Step::Byte(b'B'),
        ]);
        let mut session = Session::with_tty(tty).unwrap();
        assert_eq!(session.read_key().unwrap(), Key::Down);
    }

    #[test]
    fn write_frame_is_one_write() {
        let (tty, log) = MockTty::new();
        let mut session = Session::with_tty(tty).unwrap();
        let mut frame = AppendBuffer::new();
        frame.append(b"~");
        frame.append(ansi::CLEAR_LINE);
        frame.append(b"\r\n~");
        session.write_frame(&mut frame).unwrap();
        assert!(frame.is_empty());
        assert_eq!(log.borrow().write_calls, 1);
        assert_eq!(log.borrow().written, b"~\x1b[K\r\n~");
    }

    #[test]
    fn write_failure_maps_to_write_error() {
        let (tty, log) = MockTty::new();
        let mut session = Session::with_tty(tty).unwrap();
        log.borrow_mut().fail_write = true;
        let mut frame = AppendBuffer::new();
        frame.append(b"x");
        assert!(matches!(session.write_frame(&mut frame), Err(TermError::Write(_))));
    }

    // ── Descriptor output ───────────────────────────────────────────

    /// A pipe whose ends are closed on drop.
    #[cfg(unix)]
    struct Pipe {
        read: libc::c_int,
        write: libc::c_int,
    }

    #[cfg(unix)]
    impl Pipe {
        fn new() -> Self {
            let mut fds: [libc::c_int; 2] = [0; 2];
            assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
            Self {
                read: fds[0],
                write: fds[1],
            }
        }

        /// One `read(2)`: whatever is in the pipe right now, up to 4 KiB.
        fn read_once(&self) -> Vec<u8> {
            let mut buf = vec![0u8; 4096];
            let n = unsafe { libc::read(self.read, buf.as_mut_ptr().cast(), buf.len()) };
            buf.truncate(usize::try_from(n).unwrap());
            buf
        }
    }

    #[cfg(unix)]
    impl Drop for Pipe {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.read);
                libc::close(self.write);
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn multi_row_frame_reaches_fd_before_flush() {
        const FRAME: &[u8] = b"\x1b[?25l\x1b[Hone\x1b[K\r\ntwo\x1b[K\x1b[2;1H\x1b[?25h";
        let pipe = Pipe::new();
        let mut out = FdWriter::new(pipe.write);
        out.write_all(FRAME).unwrap();
        // Nothing held back waiting for a flush.
        assert_eq!(pipe.read_once(), FRAME);
    }

    #[cfg(unix)]
    #[test]
    fn append_buffer_frame_is_single_fd_write() {
        let pipe = Pipe::new();
        let mut out = FdWriter::new(pipe.write);
        let mut frame = AppendBuffer::new();
        frame.append(b"one");
        frame.append(ansi::CLEAR_LINE);
        frame.append(b"\r\ntwo");
        frame.append(ansi::CLEAR_LINE);
        let n = out.write(frame.as_bytes()).unwrap();
        assert_eq!(n, frame.len());
        assert_eq!(pipe.read_once(), frame.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn fd_write_error_surfaces() {
        let mut out = FdWriter::new(-1);
        let err = out.write_all(b"x").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    // ── Real terminal ───────────────────────────────────────────────

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[cfg(unix)]
    #[test]
    fn enable_raw_mode_without_tty_fails_cleanly() {
        if unsafe { libc::isatty(libc::STDIN_FILENO) } != 0 {
            return;
        }
        assert!(matches!(
            Session::enable_raw_mode(),
            Err(TermError::TerminalConfig { op: "tcgetattr", .. })
        ));
    }
}
