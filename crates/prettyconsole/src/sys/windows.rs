use core::ptr::{from_mut, from_ref, null};
use std::fs::OpenOptions;
use std::io::Result;
use std::os::windows::io::{AsRawHandle, OwnedHandle};

use windows_sys::Win32::Foundation;
use windows_sys::Win32::System::Console::{
    self, CONSOLE_MODE as ConsoleMode, CONSOLE_SCREEN_BUFFER_INFO as BufferInfo,
};

use super::util::{IdentList, IntoResult};
use super::RawHandle;
use crate::err::ErrorKind;
use crate::opt::Options;
use crate::{Color, Echo, Encoding, KeyInfo, Modifier, Modifiers, Platform};

// ------------------------------------------------------------------------------------------------

/// Determine whether the standard handle is a console.
fn is_console(which: Console::STD_HANDLE) -> bool {
    // SAFETY: GetStdHandle has no preconditions.
    let handle = unsafe { Console::GetStdHandle(which) };
    if handle.is_null() || handle == Foundation::INVALID_HANDLE_VALUE {
        return false;
    }

    let mut mode = 0;
    // SAFETY: The mode is valid for writes and outlives the call.
    unsafe { Console::GetConsoleMode(handle, from_mut(&mut mode)) } != 0
}

/// Convert a buffer coordinate.
fn to_coordinate(value: u16) -> Result<i16> {
    i16::try_from(value).map_err(|_| std::io::ErrorKind::InvalidInput.into())
}

/// Convert a buffer coordinate back.
fn from_coordinate(value: i16) -> u16 {
    u16::try_from(value).unwrap_or(0)
}

/// Offset a buffer coordinate, rejecting results outside the buffer's range.
fn offset(start: i16, delta: i16) -> Result<i16> {
    start
        .checked_add(delta)
        .ok_or_else(|| std::io::ErrorKind::InvalidInput.into())
}

/// Determine the number of cells spanned by the inclusive range.
fn extent(first: i16, last: i16) -> u16 {
    let extent = i32::from(last) - i32::from(first) + 1;
    u16::try_from(extent).unwrap_or(0)
}

/// Determine whether the virtual key code is a lone modifier key.
const fn is_modifier_key(code: u16) -> bool {
    matches!(code, 0x10..=0x12 | 0x14 | 0x5b | 0x5c | 0xa0..=0xa5)
}

fn modifiers_of(state: u32) -> Modifiers {
    let mut modifiers = Modifiers::default();
    if state & Console::SHIFT_PRESSED != 0 {
        modifiers += Modifier::Shift;
    }
    if state & (Console::LEFT_ALT_PRESSED | Console::RIGHT_ALT_PRESSED) != 0 {
        modifiers += Modifier::Alt;
    }
    if state & (Console::LEFT_CTRL_PRESSED | Console::RIGHT_CTRL_PRESSED) != 0 {
        modifiers += Modifier::Control;
    }
    modifiers
}

/// Convert an input record into a key, if it is a key press.
fn key_of(record: &Console::INPUT_RECORD) -> Option<KeyInfo> {
    if u32::from(record.EventType) != Console::KEY_EVENT {
        return None;
    }

    // SAFETY: The event type says this record holds a key event.
    let event = unsafe { record.Event.KeyEvent };
    if event.bKeyDown == 0 || is_modifier_key(event.wVirtualKeyCode) {
        return None;
    }

    // SAFETY: Console input records always carry the UTF-16 variant.
    let unit = unsafe { event.uChar.UnicodeChar };
    let key_char = if unit == 0 {
        None
    } else {
        char::from_u32(u32::from(unit))
    };

    Some(KeyInfo::new(
        key_char,
        event.wVirtualKeyCode,
        modifiers_of(event.dwControlKeyState),
    ))
}

// ------------------------------------------------------------------------------------------------

/// A connection to the Windows console.
///
/// The connection opens `CONIN$` and `CONOUT$`, so it keeps working even if
/// standard I/O has been redirected. All operations map onto the console API.
/// The capability query, however, inspects the standard handles, since that
/// is where redirection shows.
#[derive(Debug)]
pub struct Terminal {
    input: OwnedHandle,
    output: OwnedHandle,
}

impl Terminal {
    /// Open a new connection to the console.
    pub fn open(_: &Options) -> Result<Self> {
        let input = OpenOptions::new()
            .read(true)
            .write(true)
            .open("CONIN$")?
            .into();
        let output = OpenOptions::new()
            .read(true)
            .write(true)
            .open("CONOUT$")?
            .into();

        log::debug!("terminal::open {:?}", Modes::read(&input, &output));
        Ok(Self { input, output })
    }

    /// Create the echo control for this console.
    ///
    /// The echo control refers to the same handle and hence should not
    /// outlive this terminal.
    pub fn echo(&self) -> InputEcho {
        InputEcho {
            handle: self.input(),
            saved: None,
        }
    }

    #[inline]
    fn input(&self) -> RawHandle {
        self.input.as_raw_handle()
    }

    #[inline]
    fn output(&self) -> RawHandle {
        self.output.as_raw_handle()
    }

    fn info(&self) -> Result<BufferInfo> {
        // SAFETY: The buffer info is plain old data.
        let mut info: BufferInfo = unsafe { core::mem::zeroed() };
        // SAFETY: The buffer info is valid for writes and outlives the call.
        unsafe { Console::GetConsoleScreenBufferInfo(self.output(), from_mut(&mut info)) }
            .into_result()?;
        Ok(info)
    }

    fn cursor_info(&self) -> Result<Console::CONSOLE_CURSOR_INFO> {
        let mut info = Console::CONSOLE_CURSOR_INFO {
            dwSize: 0,
            bVisible: 0,
        };
        // SAFETY: The cursor info is valid for writes and outlives the call.
        unsafe { Console::GetConsoleCursorInfo(self.output(), from_mut(&mut info)) }
            .into_result()?;
        Ok(info)
    }

    fn set_cursor_info(&self, info: &Console::CONSOLE_CURSOR_INFO) -> Result<()> {
        // SAFETY: The cursor info is valid for reads and outlives the call.
        unsafe { Console::SetConsoleCursorInfo(self.output(), from_ref(info)) }.into_result()?;
        Ok(())
    }

    fn set_buffer_size(&self, width: i16, height: i16) -> Result<()> {
        let size = Console::COORD {
            X: width,
            Y: height,
        };
        // SAFETY: Plain call with a valid handle.
        unsafe { Console::SetConsoleScreenBufferSize(self.output(), size) }.into_result()?;
        Ok(())
    }

    fn set_window(&self, window: &Console::SMALL_RECT) -> Result<()> {
        // SAFETY: The rectangle is valid for reads and outlives the call.
        unsafe { Console::SetConsoleWindowInfo(self.output(), 1, from_ref(window)) }
            .into_result()?;
        Ok(())
    }

    fn set_attributes(&self, attributes: u16) -> Result<()> {
        // SAFETY: Plain call with a valid handle.
        unsafe { Console::SetConsoleTextAttribute(self.output(), attributes) }.into_result()?;
        Ok(())
    }

    fn write_wide(&self, text: &[u16]) -> Result<()> {
        let mut remaining = text;
        while !remaining.is_empty() {
            let mut did_write: u32 = 0;
            // SAFETY: The text is valid for reads of its length.
            unsafe {
                Console::WriteConsoleW(
                    self.output(),
                    remaining.as_ptr().cast(),
                    u32::try_from(remaining.len()).unwrap_or(u32::MAX),
                    from_mut(&mut did_write),
                    null(),
                )
            }
            .into_result()?;

            if did_write == 0 {
                return Err(std::io::ErrorKind::WriteZero.into());
            }
            remaining = remaining.get(did_write as usize..).unwrap_or_default();
        }
        Ok(())
    }
}

impl Platform for Terminal {
    fn is_console_api_available(&self, input: bool, output: bool) -> bool {
        (!input || is_console(Console::STD_INPUT_HANDLE))
            && (!output || is_console(Console::STD_OUTPUT_HANDLE))
    }

    fn cursor_left(&self) -> Result<u16> {
        Ok(from_coordinate(self.info()?.dwCursorPosition.X))
    }

    fn set_cursor_left(&self, column: u16) -> Result<()> {
        let top = self.cursor_top()?;
        self.set_cursor_position(column, top)
    }

    fn cursor_top(&self) -> Result<u16> {
        Ok(from_coordinate(self.info()?.dwCursorPosition.Y))
    }

    fn set_cursor_top(&self, row: u16) -> Result<()> {
        let left = self.cursor_left()?;
        self.set_cursor_position(left, row)
    }

    fn cursor_size(&self) -> Result<u8> {
        Ok(u8::try_from(self.cursor_info()?.dwSize).unwrap_or(100))
    }

    fn set_cursor_size(&self, size: u8) -> Result<()> {
        let mut info = self.cursor_info()?;
        info.dwSize = u32::from(size);
        self.set_cursor_info(&info)
    }

    fn cursor_visible(&self) -> Result<bool> {
        Ok(self.cursor_info()?.bVisible != 0)
    }

    fn set_cursor_visible(&self, visible: bool) -> Result<()> {
        let mut info = self.cursor_info()?;
        info.bVisible = i32::from(visible);
        self.set_cursor_info(&info)
    }

    fn buffer_width(&self) -> Result<u16> {
        Ok(from_coordinate(self.info()?.dwSize.X))
    }

    fn set_buffer_width(&self, width: u16) -> Result<()> {
        let info = self.info()?;
        self.set_buffer_size(to_coordinate(width)?, info.dwSize.Y)
    }

    fn buffer_height(&self) -> Result<u16> {
        Ok(from_coordinate(self.info()?.dwSize.Y))
    }

    fn set_buffer_height(&self, height: u16) -> Result<()> {
        let info = self.info()?;
        self.set_buffer_size(info.dwSize.X, to_coordinate(height)?)
    }

    fn window_width(&self) -> Result<u16> {
        let window = self.info()?.srWindow;
        Ok(extent(window.Left, window.Right))
    }

    fn set_window_width(&self, width: u16) -> Result<()> {
        let mut window = self.info()?.srWindow;
        window.Right = offset(window.Left, to_coordinate(width)?.saturating_sub(1))?;
        self.set_window(&window)
    }

    fn window_height(&self) -> Result<u16> {
        let window = self.info()?.srWindow;
        Ok(extent(window.Top, window.Bottom))
    }

    fn set_window_height(&self, height: u16) -> Result<()> {
        let mut window = self.info()?.srWindow;
        window.Bottom = offset(window.Top, to_coordinate(height)?.saturating_sub(1))?;
        self.set_window(&window)
    }

    fn window_top(&self) -> Result<u16> {
        Ok(from_coordinate(self.info()?.srWindow.Top))
    }

    fn set_window_top(&self, top: u16) -> Result<()> {
        let left = from_coordinate(self.info()?.srWindow.Left);
        self.set_window_position(left, top)
    }

    fn background_color(&self) -> Result<Color> {
        Ok(Color::from_attribute(self.info()?.wAttributes >> 4))
    }

    fn set_background_color(&self, color: Color) -> Result<()> {
        let attributes = self.info()?.wAttributes;
        self.set_attributes((attributes & !0xf0) | (color.to_attribute() << 4))
    }

    fn foreground_color(&self) -> Result<Color> {
        Ok(Color::from_attribute(self.info()?.wAttributes))
    }

    fn set_foreground_color(&self, color: Color) -> Result<()> {
        let attributes = self.info()?.wAttributes;
        self.set_attributes((attributes & !0x0f) | color.to_attribute())
    }

    fn output_encoding(&self) -> Result<Encoding> {
        // SAFETY: GetConsoleOutputCP has no preconditions.
        let code_page = unsafe { Console::GetConsoleOutputCP() }.into_result()?;
        Ok(Encoding::from_code_page(code_page))
    }

    fn set_output_encoding(&self, encoding: Encoding) -> Result<()> {
        // SAFETY: SetConsoleOutputCP validates the code page.
        unsafe { Console::SetConsoleOutputCP(encoding.code_page()) }.into_result()?;
        Ok(())
    }

    fn key_available(&self) -> Result<bool> {
        let mut count: u32 = 0;
        // SAFETY: The count is valid for writes and outlives the call.
        unsafe { Console::GetNumberOfConsoleInputEvents(self.input(), from_mut(&mut count)) }
            .into_result()?;
        if count == 0 {
            return Ok(false);
        }

        // SAFETY: Input records are plain old data.
        let mut records: [Console::INPUT_RECORD; 32] = unsafe { core::mem::zeroed() };
        let mut did_read: u32 = 0;
        // SAFETY: The records are valid for writes of their length.
        unsafe {
            Console::PeekConsoleInputW(
                self.input(),
                records.as_mut_ptr(),
                records.len() as u32,
                from_mut(&mut did_read),
            )
        }
        .into_result()?;

        Ok(records
            .iter()
            .take(did_read as usize)
            .any(|record| key_of(record).is_some()))
    }

    fn read_key(&self, intercept: bool) -> Result<KeyInfo> {
        loop {
            // SAFETY: Input records are plain old data.
            let mut record: Console::INPUT_RECORD = unsafe { core::mem::zeroed() };
            let mut did_read: u32 = 0;
            // SAFETY: The record is valid for writes and outlives the call.
            unsafe {
                Console::ReadConsoleInputW(
                    self.input(),
                    from_mut(&mut record),
                    1,
                    from_mut(&mut did_read),
                )
            }
            .into_result()?;

            if did_read == 0 {
                continue;
            }

            if let Some(key) = key_of(&record) {
                if !intercept {
                    if let Some(c) = key.key_char() {
                        let mut buffer = [0; 2];
                        self.write_wide(c.encode_utf16(&mut buffer))?;
                    }
                }
                return Ok(key);
            }
        }
    }

    fn set_window_position(&self, left: u16, top: u16) -> Result<()> {
        let window = self.info()?.srWindow;
        let left = to_coordinate(left)?;
        let top = to_coordinate(top)?;
        let width = window.Right.checked_sub(window.Left);
        let height = window.Bottom.checked_sub(window.Top);
        let (Some(width), Some(height)) = (width, height) else {
            return Err(std::io::ErrorKind::InvalidInput.into());
        };
        let moved = Console::SMALL_RECT {
            Left: left,
            Top: top,
            Right: offset(left, width)?,
            Bottom: offset(top, height)?,
        };
        self.set_window(&moved)
    }

    fn set_cursor_position(&self, left: u16, top: u16) -> Result<()> {
        let position = Console::COORD {
            X: to_coordinate(left)?,
            Y: to_coordinate(top)?,
        };
        // SAFETY: Plain call with a valid handle.
        unsafe { Console::SetConsoleCursorPosition(self.output(), position) }.into_result()?;
        Ok(())
    }

    fn write(&self, text: &str) -> Result<()> {
        let wide: Vec<u16> = text.encode_utf16().collect();
        self.write_wide(&wide)
    }
}

// ------------------------------------------------------------------------------------------------

/// The console modes, for logging.
struct Modes {
    input: ConsoleMode,
    output: ConsoleMode,
}

impl Modes {
    fn read(input: &OwnedHandle, output: &OwnedHandle) -> Result<Self> {
        Ok(Self {
            input: read_mode(input.as_raw_handle())?,
            output: read_mode(output.as_raw_handle())?,
        })
    }
}

impl core::fmt::Debug for Modes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let input = IdentList::with_flags(
            self.input,
            &[
                ("ENABLE_ECHO_INPUT", Console::ENABLE_ECHO_INPUT),
                ("ENABLE_LINE_INPUT", Console::ENABLE_LINE_INPUT),
                ("ENABLE_PROCESSED_INPUT", Console::ENABLE_PROCESSED_INPUT),
                ("ENABLE_VIRTUAL_TERMINAL_INPUT", Console::ENABLE_VIRTUAL_TERMINAL_INPUT),
            ],
        );
        let output = IdentList::with_flags(
            self.output,
            &[
                ("ENABLE_PROCESSED_OUTPUT", Console::ENABLE_PROCESSED_OUTPUT),
                ("ENABLE_WRAP_AT_EOL_OUTPUT", Console::ENABLE_WRAP_AT_EOL_OUTPUT),
                (
                    "ENABLE_VIRTUAL_TERMINAL_PROCESSING",
                    Console::ENABLE_VIRTUAL_TERMINAL_PROCESSING,
                ),
            ],
        );

        f.debug_struct("Modes")
            .field("input", &input)
            .field("output", &output)
            .finish()
    }
}

fn read_mode(handle: RawHandle) -> Result<ConsoleMode> {
    let mut mode = 0;
    // SAFETY: The mode is valid for writes and outlives the call.
    unsafe { Console::GetConsoleMode(handle, from_mut(&mut mode)) }.into_result()?;
    Ok(mode)
}

fn write_mode(handle: RawHandle, mode: ConsoleMode) -> Result<()> {
    // SAFETY: Plain call with a valid handle.
    unsafe { Console::SetConsoleMode(handle, mode) }.into_result()?;
    Ok(())
}

// ------------------------------------------------------------------------------------------------

/// The console's input echo control.
///
/// Disabling clears `ENABLE_ECHO_INPUT` and enabling restores the mode that was
/// in effect before. Windows only echoes in line input mode, so enabling
/// without prior disabling sets the flag only if line input is on.
#[derive(Debug)]
pub struct InputEcho {
    handle: RawHandle,
    saved: Option<ConsoleMode>,
}

// SAFETY: Windows HANDLE is defined as a *mut c_void but console handles are
// thread-safe. Rust's standard library implements `Send` and `Sync` for
// wrapped handles, too.
unsafe impl Send for InputEcho {}

impl Echo for InputEcho {
    fn disable(&mut self) -> Result<()> {
        let mode = read_mode(self.handle)?;
        write_mode(self.handle, mode & !Console::ENABLE_ECHO_INPUT)?;
        self.saved = Some(mode);
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        let mode = if let Some(mode) = self.saved.take() {
            mode
        } else {
            let mode = read_mode(self.handle)?;
            if mode & Console::ENABLE_LINE_INPUT == 0 {
                return Ok(());
            }
            mode | Console::ENABLE_ECHO_INPUT
        };
        write_mode(self.handle, mode)
    }
}

#[cfg(test)]
mod test {
    use super::{extent, is_modifier_key, modifiers_of, offset, to_coordinate};
    use crate::Modifier;
    use std::io::ErrorKind;
    use windows_sys::Win32::System::Console;

    #[test]
    fn test_window_arithmetic() {
        assert_eq!(offset(3, 4).ok(), Some(7));
        assert_eq!(offset(100, -1).ok(), Some(99));
        let error = offset(i16::MAX - 2, 5).expect_err("window ends past i16::MAX");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        let error = offset(i16::MIN, -1).expect_err("window starts before i16::MIN");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);

        let error = to_coordinate(40_000).expect_err("width exceeds i16::MAX");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);

        assert_eq!(extent(0, 79), 80);
        assert_eq!(extent(i16::MIN, i16::MAX), u16::MAX);
        assert_eq!(extent(10, 5), 0);
    }

    #[test]
    fn test_modifiers() {
        assert!(modifiers_of(0).is_empty());
        let modifiers = modifiers_of(Console::SHIFT_PRESSED | Console::RIGHT_CTRL_PRESSED);
        assert!(modifiers.has(Modifier::Shift));
        assert!(modifiers.has(Modifier::Control));
        assert!(!modifiers.has(Modifier::Alt));
        assert!(is_modifier_key(0x10));
        assert!(!is_modifier_key(0x41));
    }
}
