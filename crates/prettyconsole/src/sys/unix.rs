use core::ffi::c_void;
use core::ptr::{from_mut, from_ref};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{stderr, stdin, stdout, IsTerminal, Read, Result, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::util::{IdentList, IntoResult};
use super::RawHandle;
use crate::cmd::{
    DynMoveTo, DynSetBackground, DynSetForeground, HideCursor, RequestCursorPosition, ShowCursor,
};
use crate::err::{should_retry, ErrorKind};
use crate::opt::Options;
use crate::{Color, Command, Echo, Encoding, KeyInfo, Modifiers, Platform};

// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
enum RawConnectionHandle {
    Owned(OwnedFd),
    StdIo(RawHandle, RawHandle),
}

impl RawConnectionHandle {
    fn input(&self) -> RawHandle {
        match *self {
            Self::Owned(ref handle) => handle.as_raw_fd(),
            Self::StdIo(handle, _) => handle,
        }
    }

    fn output(&self) -> RawHandle {
        match *self {
            Self::Owned(ref handle) => handle.as_raw_fd(),
            Self::StdIo(_, handle) => handle,
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// When a new terminal configuration takes effect.
#[derive(Clone, Copy, Debug)]
enum When {
    /// Right away.
    Now,
    /// After all pending output has been transmitted.
    AfterDrain,
}

impl When {
    const fn action(self) -> libc::c_int {
        match self {
            Self::Now => libc::TCSANOW,
            Self::AfterDrain => libc::TCSADRAIN,
        }
    }
}

/// A terminal configuration.
#[derive(Clone, Copy)]
struct Config {
    state: libc::termios,
}

impl Config {
    /// Read the configuration.
    fn read(handle: RawHandle) -> Result<Self> {
        let mut state = core::mem::MaybeUninit::uninit();
        // SAFETY: The pointer is valid for writes of one termios structure.
        unsafe { libc::tcgetattr(handle, state.as_mut_ptr()) }.into_result()?;
        Ok(Self {
            // SAFETY: tcgetattr succeeded and hence initialized the structure.
            state: unsafe { state.assume_init() },
        })
    }

    /// Determine whether the terminal echoes input.
    fn echoes(&self) -> bool {
        self.state.c_lflag & libc::ECHO != 0
    }

    /// Create a copy that does or does not echo input.
    fn with_echo(&self, echo: bool) -> Self {
        let mut state = self.state;
        if echo {
            state.c_lflag |= libc::ECHO;
        } else {
            state.c_lflag &= !libc::ECHO;
        }
        Self { state }
    }

    /// Create a copy that delivers input without waiting for a newline.
    ///
    /// A read returns once `vmin` bytes are available or, if `vmin` is zero,
    /// after `vtime` deciseconds.
    fn with_keys(&self, vmin: u8, vtime: u8) -> Self {
        let mut state = self.state;
        state.c_lflag &= !libc::ICANON;
        state.c_cc[libc::VMIN] = vmin;
        state.c_cc[libc::VTIME] = vtime;
        Self { state }
    }

    /// Write the configuration.
    fn write(&self, handle: RawHandle, when: When) -> Result<()> {
        // SAFETY: The termios structure is valid and outlives the call.
        unsafe { libc::tcsetattr(handle, when.action(), from_ref(&self.state)) }.into_result()?;
        Ok(())
    }
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let input = IdentList::with_flags(
            self.state.c_iflag,
            &[
                ("BRKINT", libc::BRKINT),
                ("ICRNL", libc::ICRNL),
                ("IXON", libc::IXON),
            ],
        );
        let local = IdentList::with_flags(
            self.state.c_lflag,
            &[
                ("ECHO", libc::ECHO),
                ("ICANON", libc::ICANON),
                ("IEXTEN", libc::IEXTEN),
                ("ISIG", libc::ISIG),
            ],
        );

        f.debug_struct("Config")
            .field("iflag", &input)
            .field("lflag", &local)
            .field("vmin", &self.state.c_cc[libc::VMIN])
            .field("vtime", &self.state.c_cc[libc::VTIME])
            .finish()
    }
}

/// A configuration change that is undone when dropped.
struct Scoped {
    handle: RawHandle,
    original: Config,
}

impl Scoped {
    fn apply<F>(handle: RawHandle, update: F) -> Result<Self>
    where
        F: FnOnce(&Config) -> Config,
    {
        let original = Config::read(handle)?;
        update(&original).write(handle, When::Now)?;
        Ok(Self { handle, original })
    }
}

impl Drop for Scoped {
    fn drop(&mut self) {
        let _ = self.original.write(self.handle, When::Now);
    }
}

// ------------------------------------------------------------------------------------------------

/// Raw unbuffered terminal input.
#[derive(Debug)]
struct RawInput {
    handle: RawHandle,
}

impl Read for RawInput {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // SAFETY: The buffer is valid for writes of its length.
        unsafe {
            libc::read(
                self.handle,
                buf.as_mut_ptr().cast::<c_void>(),
                buf.len() as libc::size_t,
            )
        }
        .into_result()
    }
}

/// Raw unbuffered terminal output.
#[derive(Debug)]
struct RawOutput {
    handle: RawHandle,
}

impl Write for RawOutput {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        // SAFETY: The buffer is valid for reads of its length.
        unsafe {
            libc::write(
                self.handle,
                buf.as_ptr().cast::<c_void>(),
                buf.len() as libc::size_t,
            )
        }
        .into_result()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct State {
    /// Input that arrived while waiting for a cursor position report.
    pending: VecDeque<u8>,
    visible: bool,
    foreground: Color,
    background: Color,
}

/// A connection to a terminal.
///
/// Terminals have no API beyond ANSI escape sequences and a few `ioctl`s.
/// Consequently, this platform:
///
///   * never reports the native console API as available;
///   * determines the cursor position by asking the terminal for a report;
///   * treats the buffer as the same size as the window, with the window top
///     always at row 0;
///   * does not support resizing the window or buffer, nor the cursor size;
///   * derives the output encoding from the locale environment variables and
///     only accepts UTF-8 as the new output encoding;
///   * remembers the colors and cursor visibility it last set, since there is
///     no way of reading them back.
///
/// While connected, the terminal delivers input key by key instead of line by
/// line. Dropping the connection restores the original configuration.
#[derive(Debug)]
pub struct Terminal {
    handle: RawConnectionHandle,
    timeout: u8,
    original: Config,
    state: Mutex<State>,
}

impl Terminal {
    /// Open a new connection to the controlling terminal.
    pub fn open(options: &Options) -> Result<Self> {
        let fd: OwnedFd = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")?
            .into();

        Self::with_handle(RawConnectionHandle::Owned(fd), options)
    }

    /// Connect to the terminal through standard I/O.
    ///
    /// This method succeeds as long as standard input and either standard
    /// output or standard error are connected to a terminal. Since Rust's
    /// standard library buffers standard I/O, mixing its facilities with the
    /// resulting connection may reorder output.
    pub fn with_stdio(options: &Options) -> Result<Self> {
        if !stdin().is_terminal() {
            return Err(ErrorKind::NotATerminal.into());
        }

        let output = if stdout().is_terminal() {
            stdout().as_raw_fd()
        } else if stderr().is_terminal() {
            stderr().as_raw_fd()
        } else {
            return Err(ErrorKind::NotATerminal.into());
        };

        Self::with_handle(
            RawConnectionHandle::StdIo(stdin().as_raw_fd(), output),
            options,
        )
    }

    fn with_handle(handle: RawConnectionHandle, options: &Options) -> Result<Self> {
        // SAFETY: isatty only inspects the file descriptor.
        if unsafe { libc::isatty(handle.input()) } == 0 {
            return Err(ErrorKind::NotATerminal.into());
        }

        let original = Config::read(handle.input())?;
        original
            .with_keys(1, 0)
            .write(handle.input(), When::AfterDrain)?;
        log::debug!("terminal::open {:?}", original);

        Ok(Self {
            handle,
            timeout: options.timeout(),
            original,
            state: Mutex::new(State {
                pending: VecDeque::new(),
                visible: true,
                foreground: Color::Gray,
                background: Color::Black,
            }),
        })
    }

    /// Create the echo control for this terminal.
    ///
    /// The echo control refers to the same file descriptor and hence should
    /// not outlive this terminal.
    pub fn echo(&self) -> InputEcho {
        InputEcho {
            handle: self.handle.input(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn input(&self) -> RawInput {
        RawInput {
            handle: self.handle.input(),
        }
    }

    fn output(&self) -> RawOutput {
        RawOutput {
            handle: self.handle.output(),
        }
    }

    fn exec<C: Command>(&self, command: C) -> Result<()> {
        write!(self.output(), "{}", command)
    }

    /// Read a byte, returning `None` if the read timed out.
    fn read_byte(&self) -> Result<Option<u8>> {
        let mut buffer = [0_u8; 1];
        loop {
            let result = self.input().read(&mut buffer);
            if should_retry(&result) {
                continue;
            }
            return Ok(if result? == 0 { None } else { Some(buffer[0]) });
        }
    }

    /// Get the next byte of input, blocking until there is one.
    fn next_byte(&self, state: &mut State) -> Result<u8> {
        if let Some(byte) = state.pending.pop_front() {
            return Ok(byte);
        }
        self.read_byte()?
            .ok_or_else(|| std::io::ErrorKind::UnexpectedEof.into())
    }

    /// Ask the terminal for the 0-based cursor column and row.
    ///
    /// Key presses that arrive before the report are retained for reading
    /// keys.
    fn cursor_position(&self) -> Result<(u16, u16)> {
        let mut state = self.lock();
        let _scope = Scoped::apply(self.handle.input(), |config| {
            config.with_keys(0, self.timeout).with_echo(false)
        })?;
        self.exec(RequestCursorPosition)?;

        let mut bytes = Vec::new();
        loop {
            let byte = match self.read_byte()? {
                Some(byte) if bytes.len() < MAX_REPORT_SEARCH => byte,
                _ => {
                    state.pending.extend(bytes);
                    return Err(ErrorKind::NoReport.into());
                }
            };

            bytes.push(byte);
            if byte != b'R' {
                continue;
            }

            if let Some(start) = report_start(&bytes) {
                let Ok((row, column)) = RequestCursorPosition.parse(&bytes[start + 2..]) else {
                    // Keep everything, since the sequence may be typed input.
                    state.pending.extend(bytes);
                    return Err(ErrorKind::MalformedReport.into());
                };
                state.pending.extend(&bytes[..start]);
                return Ok((column.saturating_sub(1), row.saturating_sub(1)));
            }
        }
    }

    fn window_size(&self) -> Result<(u16, u16)> {
        let mut size = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: TIOCGWINSZ writes one winsize structure, which outlives the call.
        unsafe { libc::ioctl(self.handle.output(), libc::TIOCGWINSZ, from_mut(&mut size)) }
            .into_result()?;
        Ok((size.ws_col, size.ws_row))
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.original.write(self.handle.input(), When::AfterDrain);
    }
}

/// Put the bytes back in front of any pending input.
fn unread(state: &mut State, bytes: &[u8]) {
    for byte in bytes.iter().rev() {
        state.pending.push_front(*byte);
    }
}

/// The number of bytes read before giving up on a cursor position report.
const MAX_REPORT_SEARCH: usize = 256;

/// Find the start of the last control sequence.
fn report_start(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).rposition(|pair| pair == b"\x1b[")
}

/// Determine the length of the UTF-8 sequence with the given leading byte.
const fn utf8_length(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

/// Determine the output encoding from the locale environment variables.
fn locale_encoding() -> Result<Encoding> {
    for name in ["LC_ALL", "LC_CTYPE", "LANG"] {
        let Some(value) = std::env::var_os(name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        return encoding_of_locale(&value.to_string_lossy())
            .ok_or_else(|| ErrorKind::Unsupported.into());
    }

    Err(ErrorKind::Unsupported.into())
}

/// Determine the encoding of a locale name such as `en_US.UTF-8`.
fn encoding_of_locale(locale: &str) -> Option<Encoding> {
    if locale == "C" || locale == "POSIX" {
        return Some(Encoding::ASCII);
    }

    let (_, codeset) = locale.split_once('.')?;
    let codeset = codeset.split_once('@').map_or(codeset, |(codeset, _)| codeset);
    let codeset: String = codeset
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match codeset.as_str() {
        "utf8" => Some(Encoding::UTF8),
        "iso88591" => Some(Encoding::LATIN1),
        "ascii" | "usascii" | "ansix3.41968" => Some(Encoding::ASCII),
        _ => None,
    }
}

impl Platform for Terminal {
    fn is_console_api_available(&self, _input: bool, _output: bool) -> bool {
        false
    }

    fn cursor_left(&self) -> Result<u16> {
        Ok(self.cursor_position()?.0)
    }

    fn set_cursor_left(&self, column: u16) -> Result<()> {
        let (_, row) = self.cursor_position()?;
        self.set_cursor_position(column, row)
    }

    fn cursor_top(&self) -> Result<u16> {
        Ok(self.cursor_position()?.1)
    }

    fn set_cursor_top(&self, row: u16) -> Result<()> {
        let (column, _) = self.cursor_position()?;
        self.set_cursor_position(column, row)
    }

    fn cursor_size(&self) -> Result<u8> {
        Err(ErrorKind::Unsupported.into())
    }

    fn set_cursor_size(&self, _size: u8) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn cursor_visible(&self) -> Result<bool> {
        Ok(self.lock().visible)
    }

    fn set_cursor_visible(&self, visible: bool) -> Result<()> {
        let mut state = self.lock();
        if visible {
            self.exec(ShowCursor)?;
        } else {
            self.exec(HideCursor)?;
        }
        state.visible = visible;
        Ok(())
    }

    fn buffer_width(&self) -> Result<u16> {
        Ok(self.window_size()?.0)
    }

    fn set_buffer_width(&self, _width: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn buffer_height(&self) -> Result<u16> {
        Ok(self.window_size()?.1)
    }

    fn set_buffer_height(&self, _height: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn window_width(&self) -> Result<u16> {
        Ok(self.window_size()?.0)
    }

    fn set_window_width(&self, _width: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn window_height(&self) -> Result<u16> {
        Ok(self.window_size()?.1)
    }

    fn set_window_height(&self, _height: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn window_top(&self) -> Result<u16> {
        Ok(0)
    }

    fn set_window_top(&self, _top: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn background_color(&self) -> Result<Color> {
        Ok(self.lock().background)
    }

    fn set_background_color(&self, color: Color) -> Result<()> {
        let mut state = self.lock();
        self.exec(DynSetBackground(color))?;
        state.background = color;
        Ok(())
    }

    fn foreground_color(&self) -> Result<Color> {
        Ok(self.lock().foreground)
    }

    fn set_foreground_color(&self, color: Color) -> Result<()> {
        let mut state = self.lock();
        self.exec(DynSetForeground(color))?;
        state.foreground = color;
        Ok(())
    }

    fn output_encoding(&self) -> Result<Encoding> {
        locale_encoding()
    }

    fn set_output_encoding(&self, encoding: Encoding) -> Result<()> {
        if encoding == Encoding::UTF8 {
            Ok(())
        } else {
            Err(ErrorKind::Unsupported.into())
        }
    }

    fn key_available(&self) -> Result<bool> {
        if !self.lock().pending.is_empty() {
            return Ok(true);
        }

        let mut fds = libc::pollfd {
            fd: self.handle.input(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: The pollfd structure is valid and outlives the call.
            let result = unsafe { libc::poll(from_mut(&mut fds), 1, 0) }.into_result();
            if should_retry(&result) {
                continue;
            }
            return Ok(0 < result? && fds.revents & libc::POLLIN != 0);
        }
    }

    fn read_key(&self, intercept: bool) -> Result<KeyInfo> {
        let mut state = self.lock();
        let _scope = if intercept {
            Some(Scoped::apply(self.handle.input(), |config| {
                config.with_echo(false)
            })?)
        } else {
            None
        };

        let lead = self.next_byte(&mut state)?;
        let mut bytes = [lead, 0, 0, 0];
        let length = utf8_length(lead);
        let mut count = 1;
        while count < length {
            match self.next_byte(&mut state) {
                Ok(byte) => {
                    bytes[count] = byte;
                    count += 1;
                }
                Err(error) => {
                    unread(&mut state, &bytes[..count]);
                    return Err(error);
                }
            }
        }

        let decoded = core::str::from_utf8(&bytes[..length])
            .ok()
            .and_then(|s| s.chars().next());
        if let Some(c) = decoded {
            return Ok(KeyInfo::from_char(c));
        }

        // Not UTF-8: report the leading byte and keep the rest.
        unread(&mut state, &bytes[1..length]);
        Ok(KeyInfo::new(None, u16::from(lead), Modifiers::default()))
    }

    fn set_window_position(&self, _left: u16, _top: u16) -> Result<()> {
        Err(ErrorKind::Unsupported.into())
    }

    fn set_cursor_position(&self, left: u16, top: u16) -> Result<()> {
        self.exec(DynMoveTo(top.saturating_add(1), left.saturating_add(1)))
    }

    fn write(&self, text: &str) -> Result<()> {
        self.output().write_all(text.as_bytes())
    }
}

// ------------------------------------------------------------------------------------------------

/// The terminal's input echo control.
///
/// It toggles the `ECHO` flag of the terminal's configuration.
#[derive(Debug)]
pub struct InputEcho {
    handle: RawHandle,
}

impl InputEcho {
    fn update(&self, echo: bool) -> Result<()> {
        let config = Config::read(self.handle)?;
        if config.echoes() != echo {
            config.with_echo(echo).write(self.handle, When::AfterDrain)?;
        }
        Ok(())
    }
}

impl Echo for InputEcho {
    fn disable(&mut self) -> Result<()> {
        self.update(false)
    }

    fn enable(&mut self) -> Result<()> {
        self.update(true)
    }
}

#[cfg(test)]
mod test {
    use core::ptr::{from_mut, null_mut};
    use core::time::Duration;
    use std::fs::File;
    use std::io::{ErrorKind, Read, Result, Write};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use std::thread::{self, JoinHandle};

    use super::{
        encoding_of_locale, report_start, utf8_length, Config, RawConnectionHandle, Scoped, Terminal,
    };
    use crate::opt::Options;
    use crate::sys::util::IntoResult;
    use crate::util::nicely_str;
    use crate::{Echo, Encoding, KeyInfo, Modifiers, Platform};

    /// Open a pseudo-terminal. This function returns the primary side, which
    /// plays the terminal emulator, and a terminal connected to the secondary
    /// side.
    fn pty(timeout: u8) -> Result<(File, Terminal)> {
        let mut primary = 0;
        let mut secondary = 0;
        // SAFETY: The descriptors are valid for writes, the rest may be null.
        unsafe {
            libc::openpty(
                from_mut(&mut primary),
                from_mut(&mut secondary),
                null_mut(),
                null_mut::<libc::termios>(),
                null_mut::<libc::winsize>(),
            )
        }
        .into_result()?;

        // SAFETY: openpty just created the descriptor and nothing else owns it.
        let primary = unsafe { File::from_raw_fd(primary) };
        // SAFETY: openpty just created the descriptor and nothing else owns it.
        let secondary = unsafe { OwnedFd::from_raw_fd(secondary) };

        let options = Options::builder().timeout(timeout).build();
        let terminal = Terminal::with_handle(RawConnectionHandle::Owned(secondary), &options)?;
        Ok((primary, terminal))
    }

    /// Read the cursor position request and then reply.
    fn answer(primary: &File, reply: &'static [u8]) -> Result<JoinHandle<Result<Vec<u8>>>> {
        let mut peer = primary.try_clone()?;
        Ok(thread::spawn(move || {
            let mut request = [0; 4];
            peer.read_exact(&mut request)?;
            peer.write_all(reply)?;
            Ok(request.to_vec())
        }))
    }

    /// Collect whatever the terminal writes until it has been quiet for 100ms.
    fn drain(primary: &mut File) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            let mut fds = libc::pollfd {
                fd: primary.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: The pollfd structure is valid and outlives the call.
            let ready = unsafe { libc::poll(from_mut(&mut fds), 1, 100) }.into_result()?;
            if ready == 0 {
                return Ok(bytes);
            }

            let mut buffer = [0; 64];
            let count = primary.read(&mut buffer)?;
            if count == 0 {
                return Ok(bytes);
            }
            bytes.extend_from_slice(&buffer[..count]);
        }
    }

    /// Wait until input written to the primary side has reached the terminal.
    fn wait_for_input(terminal: &Terminal) -> Result<()> {
        for _ in 0..100 {
            if terminal.key_available()? {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(10));
        }
        Err(ErrorKind::TimedOut.into())
    }

    #[test]
    fn test_cursor_report_is_not_echoed() -> Result<()> {
        let (mut primary, terminal) = pty(10)?;
        let peer = answer(&primary, b"\x1b[5;10R")?;

        assert_eq!(terminal.cursor_position()?, (9, 4));
        let request = peer.join().expect("peer finishes")?;
        assert_eq!(request, b"\x1b[6n");

        let echoed = drain(&mut primary)?;
        assert!(echoed.is_empty(), "report was echoed as {}", nicely_str(&echoed));
        assert!(
            Config::read(terminal.handle.input())?.echoes(),
            "echo is restored"
        );
        Ok(())
    }

    #[test]
    fn test_keys_before_report_are_kept() -> Result<()> {
        let (primary, terminal) = pty(10)?;
        let peer = answer(&primary, b"ab\x1b[1;1R")?;

        assert_eq!(terminal.cursor_left()?, 0);
        peer.join().expect("peer finishes")?;

        assert!(terminal.key_available()?, "typed keys are pending");
        assert_eq!(terminal.read_key(true)?, KeyInfo::from_char('a'));
        assert_eq!(terminal.read_key(true)?, KeyInfo::from_char('b'));
        assert!(!terminal.key_available()?, "no more keys");
        Ok(())
    }

    #[test]
    fn test_missing_report() -> Result<()> {
        let (mut primary, terminal) = pty(1)?;
        primary.write_all(b"x")?;
        wait_for_input(&terminal)?;

        let error = terminal.cursor_position().expect_err("nobody answers");
        assert_eq!(error.kind(), ErrorKind::TimedOut);
        assert!(terminal.key_available()?, "typed key is pending");
        assert_eq!(terminal.read_key(true)?, KeyInfo::from_char('x'));
        Ok(())
    }

    #[test]
    fn test_malformed_report_keeps_input() -> Result<()> {
        let (primary, terminal) = pty(10)?;
        let peer = answer(&primary, b"z\x1b[5R")?;

        let error = terminal.cursor_position().expect_err("report lacks column");
        assert_eq!(error.kind(), ErrorKind::InvalidData);
        peer.join().expect("peer finishes")?;

        for byte in b"z\x1b[5R" {
            assert_eq!(terminal.read_key(true)?.code(), u16::from(*byte));
        }
        Ok(())
    }

    #[test]
    fn test_read_utf8_keys() -> Result<()> {
        let (mut primary, terminal) = pty(10)?;
        primary.write_all("é€🦀".as_bytes())?;

        for c in ['é', '€', '🦀'] {
            let key = terminal.read_key(true)?;
            assert_eq!(key.key_char(), Some(c));
            assert!(key.modifiers().is_empty(), "{:?} has no modifiers", c);
        }
        assert!(
            Config::read(terminal.handle.input())?.echoes(),
            "echo is restored"
        );
        Ok(())
    }

    #[test]
    fn test_read_invalid_utf8_key() -> Result<()> {
        let (mut primary, terminal) = pty(10)?;
        primary.write_all(&[0xc3, b'q'])?;

        let key = terminal.read_key(true)?;
        assert_eq!(key, KeyInfo::new(None, 0xc3, Modifiers::default()));
        assert_eq!(terminal.read_key(true)?, KeyInfo::from_char('q'));
        Ok(())
    }

    #[test]
    fn test_incomplete_utf8_key_is_kept() -> Result<()> {
        let (mut primary, terminal) = pty(10)?;
        primary.write_all(&[0xe2])?;
        wait_for_input(&terminal)?;

        // Time out instead of waiting for the rest of the sequence.
        let _scope = Scoped::apply(terminal.handle.input(), |config| {
            config.with_keys(0, 1)
        })?;
        let error = terminal.read_key(true).expect_err("sequence is incomplete");
        assert_eq!(error.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(terminal.lock().pending, [0xe2]);
        Ok(())
    }

    #[test]
    fn test_input_echo() -> Result<()> {
        let (_primary, terminal) = pty(10)?;
        let handle = terminal.handle.input();
        let mut echo = terminal.echo();
        assert!(Config::read(handle)?.echoes(), "terminal echoes");

        echo.disable()?;
        assert!(!Config::read(handle)?.echoes(), "echo is off");
        echo.disable()?;
        assert!(!Config::read(handle)?.echoes(), "echo is still off");

        echo.enable()?;
        assert!(Config::read(handle)?.echoes(), "echo is back on");
        Ok(())
    }

    #[test]
    fn test_locale_encoding() {
        assert_eq!(encoding_of_locale("en_US.UTF-8"), Some(Encoding::UTF8));
        assert_eq!(encoding_of_locale("de_DE.utf8@euro"), Some(Encoding::UTF8));
        assert_eq!(encoding_of_locale("fr_FR.ISO-8859-1"), Some(Encoding::LATIN1));
        assert_eq!(encoding_of_locale("C"), Some(Encoding::ASCII));
        assert_eq!(encoding_of_locale("C.ANSI_X3.4-1968"), Some(Encoding::ASCII));
        assert_eq!(encoding_of_locale("ja_JP.eucJP"), None);
        assert_eq!(encoding_of_locale("en_US"), None);
    }

    #[test]
    fn test_report_start() {
        assert_eq!(report_start(b"\x1b[12;4R"), Some(0));
        assert_eq!(report_start(b"ab\x1b[12;4R"), Some(2));
        assert_eq!(report_start(b"\x1b[A\x1b[1;1R"), Some(3));
        assert_eq!(report_start(b"12;4R"), None);
    }

    #[test]
    fn test_utf8_length() {
        for (c, length) in [('q', 1), ('é', 2), ('€', 3), ('🦀', 4)] {
            let mut buffer = [0; 4];
            let lead = c.encode_utf8(&mut buffer).as_bytes()[0];
            assert_eq!(utf8_length(lead), length, "length of {:?}", c);
        }
        assert_eq!(utf8_length(0x80), 1);
    }
}
