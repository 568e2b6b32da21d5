use std::io::Result;

use crate::cmd::{DynScrollUp, EraseRestOfLine, SetCursor};
use crate::opt::{Options, Selection, Volume};
use crate::util::nicely_str;
use crate::{Color, Command, Echo, Encoding, InputEcho, KeyInfo, Platform, Terminal};

/// The way the console controls the cursor shape.
///
/// Windows' console API supports setting the cursor size directly. Terminals
/// only support a handful of cursor shapes through ANSI escape sequences.
/// Since output may be redirected at any time, [`Backend::detect`] should be
/// consulted for every access instead of once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Use the native console API.
    Native,
    /// Use ANSI escape sequences.
    Escape,
}

impl Backend {
    /// Run the capability query for output.
    pub fn detect<P: Platform + ?Sized>(platform: &P) -> Self {
        if platform.is_console_api_available(false, true) {
            Backend::Native
        } else {
            Backend::Escape
        }
    }

    /// Approximate the cursor size with a cursor shape.
    ///
    /// Sizes above 50% become a steady block, all others a blinking bar.
    pub const fn cursor_shape(size: u8) -> SetCursor {
        if 50 < size {
            SetCursor::SteadyBlock
        } else {
            SetCursor::BlinkingBar
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// The destination of all console output.
///
/// Every byte the [`Console`] writes, whether text or escape sequence, goes
/// through its sink. The default [`Passthrough`] sink hands output straight to
/// the platform. A specialized backend may install its own sink to capture,
/// batch, or transform output without reimplementing the rest of the console.
pub trait Sink<P: Platform + ?Sized> {
    /// Write the text.
    fn write(&mut self, platform: &P, text: &str) -> Result<()>;

    /// Write the text followed by a newline.
    fn write_line(&mut self, platform: &P, text: &str) -> Result<()> {
        self.write(platform, text)?;
        self.write(platform, "\n")
    }
}

/// The sink writing directly to the platform.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl<P: Platform + ?Sized> Sink<P> for Passthrough {
    #[inline]
    fn write(&mut self, platform: &P, text: &str) -> Result<()> {
        platform.write(text)
    }

    #[inline]
    fn write_line(&mut self, platform: &P, text: &str) -> Result<()> {
        platform.write_line(text)
    }
}

// ------------------------------------------------------------------------------------------------

/// A guard for suppressed input echo.
///
/// Creating the guard disables echo. Finishing the guard re-enables echo and
/// reports any error doing so. Dropping the guard without finishing it, e.g.,
/// because of an early return or a panic, also re-enables echo but has no way
/// of reporting errors.
#[derive(Debug)]
pub struct EchoGuard<'a, E: Echo + ?Sized> {
    echo: &'a mut E,
    active: bool,
}

impl<'a, E: Echo + ?Sized> EchoGuard<'a, E> {
    /// Disable echo until the guard is finished or dropped.
    pub fn disable(echo: &'a mut E) -> Result<Self> {
        echo.disable()?;
        Ok(Self { echo, active: true })
    }

    /// Re-enable echo.
    pub fn finish(mut self) -> Result<()> {
        self.active = false;
        self.echo.enable()
    }
}

impl<E: Echo + ?Sized> Drop for EchoGuard<'_, E> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.echo.enable();
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// A portable console.
///
/// This struct owns the platform's console service, the platform's echo
/// control, and the output sink. It exposes a uniform set of console
/// capabilities on top of them. Most of them are passthroughs to the platform,
/// with platform errors propagating unmodified. The exceptions are:
///
///   * [`Console::cursor_size`] and [`Console::set_cursor_size`] fall back on
///     a locally tracked size and ANSI escape sequences when the native console
///     API is not available for output.
///   * [`Console::output_encoding`] and [`Console::set_output_encoding`] never
///     fail. Reading falls back on a default encoding, writing silently does
///     nothing.
///   * [`Console::read_key`] waits for a key with echo disabled before reading
///     it, so that a blocking read never locks up standard input.
///   * [`Console::save_cursor`] and [`Console::restore_cursor`] remember
///     exactly one cursor position.
///
/// The console is meant to be driven from one thread. Waiting for a key blocks
/// that thread until a key arrives. There is no timeout.
#[derive(Debug)]
pub struct Console<P, E, S = Passthrough> {
    options: Options,
    platform: P,
    echo: E,
    sink: S,
    cursor_size: u8,
    saved: (u16, u16),
}

impl<P: Platform, E: Echo> Console<P, E> {
    /// Create a new console with the default options.
    pub fn new(platform: P, echo: E) -> Self {
        Self::with_options(platform, echo, Options::default())
    }

    /// Create a new console with the given options.
    pub fn with_options(platform: P, echo: E, options: Options) -> Self {
        Console::with_sink(platform, echo, Passthrough, options)
    }
}

impl Console<Terminal, InputEcho> {
    /// Open a console for the system's terminal with the default options.
    ///
    /// On Unix, this method fails with
    /// [`ErrorKind::NotATerminal`](crate::err::ErrorKind::NotATerminal) if
    /// there is no controlling terminal.
    pub fn open() -> Result<Self> {
        Self::open_with(Options::default())
    }

    /// Open a console for the system's terminal with the given options.
    pub fn open_with(options: Options) -> Result<Self> {
        let terminal = Terminal::open(&options)?;
        let echo = terminal.echo();
        log::debug!("console::open {:?}", options);
        Ok(Self::with_options(terminal, echo, options))
    }
}

impl<P: Platform, E: Echo, S: Sink<P>> Console<P, E, S> {
    /// Create a new console with the given output sink and options.
    pub fn with_sink(platform: P, echo: E, sink: S, options: Options) -> Self {
        let cursor_size = options.cursor_size();
        Self {
            options,
            platform,
            echo,
            sink,
            cursor_size,
            saved: (0, 0),
        }
    }

    /// Get the options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Get the platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Get the output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get the output sink mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Determine the backend for controlling the cursor shape.
    ///
    /// Unless the options pin the backend, this method runs the capability
    /// query every time.
    pub fn backend(&self) -> Backend {
        match self.options.selection() {
            Selection::Detect => Backend::detect(&self.platform),
            Selection::Native => Backend::Native,
            Selection::Escape => Backend::Escape,
        }
    }

    // ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~
    // Cursor

    /// Get the cursor's column.
    pub fn cursor_left(&self) -> Result<u16> {
        self.platform.cursor_left()
    }

    /// Set the cursor's column.
    pub fn set_cursor_left(&mut self, column: u16) -> Result<()> {
        self.platform.set_cursor_left(column)
    }

    /// Get the cursor's row.
    pub fn cursor_top(&self) -> Result<u16> {
        self.platform.cursor_top()
    }

    /// Set the cursor's row.
    pub fn set_cursor_top(&mut self, row: u16) -> Result<()> {
        self.platform.set_cursor_top(row)
    }

    /// Move the cursor to the given column and row.
    pub fn set_cursor_position(&mut self, left: u16, top: u16) -> Result<()> {
        self.platform.set_cursor_position(left, top)
    }

    /// Get the cursor size as a percentage of the character cell.
    ///
    /// Without the native console API, this method returns the most recently
    /// set size or, if none has been set, the configured initial size.
    pub fn cursor_size(&self) -> Result<u8> {
        match self.backend() {
            Backend::Native => self.platform.cursor_size(),
            Backend::Escape => Ok(self.cursor_size),
        }
    }

    /// Set the cursor size as a percentage of the character cell.
    ///
    /// Without the native console API, this method remembers the size and
    /// writes exactly one escape sequence, `CSI 2 SP q` for a steady block if
    /// the size is larger than 50 and `CSI 5 SP q` for a blinking bar
    /// otherwise.
    pub fn set_cursor_size(&mut self, size: u8) -> Result<()> {
        match self.backend() {
            Backend::Native => self.platform.set_cursor_size(size),
            Backend::Escape => {
                self.cursor_size = size;
                self.exec(Backend::cursor_shape(size))
            }
        }
    }

    /// Determine whether the cursor is visible.
    pub fn cursor_visible(&self) -> Result<bool> {
        self.platform.cursor_visible()
    }

    /// Show or hide the cursor.
    pub fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.platform.set_cursor_visible(visible)
    }

    /// Remember the cursor position.
    ///
    /// There is only one slot. Saving again overwrites the previous position.
    /// If either coordinate cannot be read, the slot is left untouched.
    pub fn save_cursor(&mut self) -> Result<()> {
        let left = self.platform.cursor_left()?;
        let top = self.platform.cursor_top()?;
        self.saved = (left, top);
        Ok(())
    }

    /// Move the cursor back to the remembered position.
    ///
    /// Restoring without saving first moves the cursor to the top-left corner.
    pub fn restore_cursor(&mut self) -> Result<()> {
        let (left, top) = self.saved;
        self.platform.set_cursor_position(left, top)
    }

    // ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~
    // Buffer and window

    /// Get the buffer width in columns.
    pub fn buffer_width(&self) -> Result<u16> {
        self.platform.buffer_width()
    }

    /// Set the buffer width in columns.
    pub fn set_buffer_width(&mut self, width: u16) -> Result<()> {
        self.platform.set_buffer_width(width)
    }

    /// Get the buffer height in rows.
    pub fn buffer_height(&self) -> Result<u16> {
        self.platform.buffer_height()
    }

    /// Set the buffer height in rows.
    pub fn set_buffer_height(&mut self, height: u16) -> Result<()> {
        self.platform.set_buffer_height(height)
    }

    /// Get the window width in columns.
    pub fn window_width(&self) -> Result<u16> {
        self.platform.window_width()
    }

    /// Set the window width in columns.
    pub fn set_window_width(&mut self, width: u16) -> Result<()> {
        self.platform.set_window_width(width)
    }

    /// Get the window height in rows.
    pub fn window_height(&self) -> Result<u16> {
        self.platform.window_height()
    }

    /// Set the window height in rows.
    pub fn set_window_height(&mut self, height: u16) -> Result<()> {
        self.platform.set_window_height(height)
    }

    /// Get the buffer row at the top of the window.
    pub fn window_top(&self) -> Result<u16> {
        self.platform.window_top()
    }

    /// Set the buffer row at the top of the window.
    pub fn set_window_top(&mut self, top: u16) -> Result<()> {
        self.platform.set_window_top(top)
    }

    /// Scroll the window to the given position within the buffer.
    pub fn set_window_position(&mut self, left: u16, top: u16) -> Result<()> {
        self.platform.set_window_position(left, top)
    }

    // ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~
    // Colors and encoding

    /// Get the background color.
    pub fn background_color(&self) -> Result<Color> {
        self.platform.background_color()
    }

    /// Set the background color.
    pub fn set_background_color(&mut self, color: Color) -> Result<()> {
        self.platform.set_background_color(color)
    }

    /// Get the foreground color.
    pub fn foreground_color(&self) -> Result<Color> {
        self.platform.foreground_color()
    }

    /// Set the foreground color.
    pub fn set_foreground_color(&mut self, color: Color) -> Result<()> {
        self.platform.set_foreground_color(color)
    }

    /// Get the output encoding.
    ///
    /// If the platform fails to report its encoding, which happens when output
    /// is redirected and with Windows' legacy console, this method returns the
    /// configured default encoding instead.
    pub fn output_encoding(&self) -> Encoding {
        self.platform.output_encoding().unwrap_or_else(|error| {
            self.diagnose("read", &error);
            self.options.default_encoding()
        })
    }

    /// Set the output encoding.
    ///
    /// If the platform rejects the encoding, this method does nothing.
    pub fn set_output_encoding(&mut self, encoding: Encoding) {
        if let Err(error) = self.platform.set_output_encoding(encoding) {
            self.diagnose("write", &error);
        }
    }

    fn diagnose(&self, action: &str, error: &std::io::Error) {
        if Volume::Regular <= self.options.volume() {
            log::warn!("console::encoding failed to {} output encoding: {}", action, error);
        }
    }

    // ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~
    // Keys

    /// Determine whether a key press is waiting to be read.
    ///
    /// This method neither blocks nor touches input echo.
    pub fn key_available(&self) -> Result<bool> {
        self.platform.key_available()
    }

    /// Read the next key, blocking until there is one.
    ///
    /// This method first polls for key availability with input echo disabled
    /// and only then reads the key, without echoing it. Echo is re-enabled as
    /// soon as a key is available, even if polling fails or panics.
    pub fn read_key(&mut self) -> Result<KeyInfo> {
        self.wait_for_key_available()?;
        self.platform.read_key(true)
    }

    fn wait_for_key_available(&mut self) -> Result<()> {
        let guard = EchoGuard::disable(&mut self.echo)?;
        while !self.platform.key_available()? {
            std::thread::sleep(self.options.poll_interval());
        }
        guard.finish()
    }

    // ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~ ~
    // Output

    /// Write the text.
    pub fn write(&mut self, text: &str) -> Result<()> {
        self.trace(text);
        self.sink.write(&self.platform, text)
    }

    /// Write the text followed by a newline.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.trace(text);
        self.sink.write_line(&self.platform, text)
    }

    /// Write the command.
    pub fn exec<C: Command>(&mut self, command: C) -> Result<()> {
        self.write(&command.to_string())
    }

    /// Scroll the buffer contents up by the given number of lines.
    ///
    /// This method writes `CSI n S` and hence also works where the platform
    /// has no scrolling API.
    pub fn scroll_buffer(&mut self, lines: u16) -> Result<()> {
        self.exec(DynScrollUp(lines))
    }

    /// Erase from the cursor to the end of the line.
    pub fn blank_rest_of_line(&mut self) -> Result<()> {
        self.exec(EraseRestOfLine)
    }

    fn trace(&self, text: &str) {
        if self.options.volume() == Volume::Detailed {
            log::trace!("console::write {}", nicely_str(text.as_bytes()));
        }
    }
}
