use std::io::Result;

/// A command for the terminal.
///
/// Commands are communicated in-band by writing ANSI escape codes. Doing so is
/// the responsibility of the [`core::fmt::Display`] implementation, whereas the
/// [`core::fmt::Debug`] implementation should simply identify the command.
///
/// This trait is object-safe.
pub trait Command: core::fmt::Debug + core::fmt::Display {}

/// A borrowed command is a command.
impl<C: Command + ?Sized> Command for &C {}

/// A boxed command is a command.
impl<C: Command + ?Sized> Command for Box<C> {}

// ------------------------------------------------------------------------------------------------

/// The platform's console service.
///
/// This trait captures everything the [`Console`](crate::Console) adapter
/// needs from the underlying platform: geometry, colors, output encoding, key
/// input, and output. It also includes the capability query, which determines
/// whether the platform's native console API is usable right now.
///
/// Implementations perform no validation or clamping of their own beyond what
/// the platform does. Hence, a column past the end of the buffer is just
/// passed along, and the platform decides whether that is an error.
///
/// Accessors take `&self`. Implementations that need to mutate state while
/// reading, e.g., to query the terminal for the cursor position, use interior
/// mutability.
pub trait Platform {
    /// Determine whether the native console API is usable for input and/or
    /// output.
    ///
    /// Callers must not cache the result, since redirection may change it at
    /// any time.
    fn is_console_api_available(&self, input: bool, output: bool) -> bool;

    /// Get the cursor's column.
    fn cursor_left(&self) -> Result<u16>;
    /// Set the cursor's column.
    fn set_cursor_left(&self, column: u16) -> Result<()>;
    /// Get the cursor's row.
    fn cursor_top(&self) -> Result<u16>;
    /// Set the cursor's row.
    fn set_cursor_top(&self, row: u16) -> Result<()>;

    /// Get the cursor size as a percentage of the character cell.
    fn cursor_size(&self) -> Result<u8>;
    /// Set the cursor size as a percentage of the character cell.
    fn set_cursor_size(&self, size: u8) -> Result<()>;
    /// Determine whether the cursor is visible.
    fn cursor_visible(&self) -> Result<bool>;
    /// Show or hide the cursor.
    fn set_cursor_visible(&self, visible: bool) -> Result<()>;

    /// Get the buffer width in columns.
    fn buffer_width(&self) -> Result<u16>;
    /// Set the buffer width in columns.
    fn set_buffer_width(&self, width: u16) -> Result<()>;
    /// Get the buffer height in rows.
    fn buffer_height(&self) -> Result<u16>;
    /// Set the buffer height in rows.
    fn set_buffer_height(&self, height: u16) -> Result<()>;

    /// Get the window width in columns.
    fn window_width(&self) -> Result<u16>;
    /// Set the window width in columns.
    fn set_window_width(&self, width: u16) -> Result<()>;
    /// Get the window height in rows.
    fn window_height(&self) -> Result<u16>;
    /// Set the window height in rows.
    fn set_window_height(&self, height: u16) -> Result<()>;
    /// Get the buffer row shown at the top of the window.
    fn window_top(&self) -> Result<u16>;
    /// Set the buffer row shown at the top of the window.
    fn set_window_top(&self, top: u16) -> Result<()>;

    /// Get the background color.
    fn background_color(&self) -> Result<Color>;
    /// Set the background color.
    fn set_background_color(&self, color: Color) -> Result<()>;
    /// Get the foreground color.
    fn foreground_color(&self) -> Result<Color>;
    /// Set the foreground color.
    fn set_foreground_color(&self, color: Color) -> Result<()>;

    /// Get the output encoding.
    fn output_encoding(&self) -> Result<Encoding>;
    /// Set the output encoding.
    fn set_output_encoding(&self, encoding: Encoding) -> Result<()>;

    /// Determine whether a key press is waiting to be read.
    ///
    /// This method must not block.
    fn key_available(&self) -> Result<bool>;

    /// Read the next key, blocking until there is one.
    ///
    /// If `intercept` is `true`, the key is not echoed.
    fn read_key(&self, intercept: bool) -> Result<KeyInfo>;

    /// Scroll the window so that its top-left corner is at the given position
    /// within the buffer.
    fn set_window_position(&self, left: u16, top: u16) -> Result<()>;
    /// Move the cursor to the given column and row.
    fn set_cursor_position(&self, left: u16, top: u16) -> Result<()>;

    /// Write the text.
    fn write(&self, text: &str) -> Result<()>;

    /// Write the text followed by a newline.
    fn write_line(&self, text: &str) -> Result<()> {
        self.write(text)?;
        self.write("\n")
    }
}

macro_rules! delegate_platform {
    ($($wrapper:tt)+) => {
        impl<P: Platform + ?Sized> Platform for $($wrapper)+ {
            fn is_console_api_available(&self, input: bool, output: bool) -> bool {
                (**self).is_console_api_available(input, output)
            }
            fn cursor_left(&self) -> Result<u16> { (**self).cursor_left() }
            fn set_cursor_left(&self, column: u16) -> Result<()> { (**self).set_cursor_left(column) }
            fn cursor_top(&self) -> Result<u16> { (**self).cursor_top() }
            fn set_cursor_top(&self, row: u16) -> Result<()> { (**self).set_cursor_top(row) }
            fn cursor_size(&self) -> Result<u8> { (**self).cursor_size() }
            fn set_cursor_size(&self, size: u8) -> Result<()> { (**self).set_cursor_size(size) }
            fn cursor_visible(&self) -> Result<bool> { (**self).cursor_visible() }
            fn set_cursor_visible(&self, visible: bool) -> Result<()> {
                (**self).set_cursor_visible(visible)
            }
            fn buffer_width(&self) -> Result<u16> { (**self).buffer_width() }
            fn set_buffer_width(&self, width: u16) -> Result<()> { (**self).set_buffer_width(width) }
            fn buffer_height(&self) -> Result<u16> { (**self).buffer_height() }
            fn set_buffer_height(&self, height: u16) -> Result<()> {
                (**self).set_buffer_height(height)
            }
            fn window_width(&self) -> Result<u16> { (**self).window_width() }
            fn set_window_width(&self, width: u16) -> Result<()> { (**self).set_window_width(width) }
            fn window_height(&self) -> Result<u16> { (**self).window_height() }
            fn set_window_height(&self, height: u16) -> Result<()> {
                (**self).set_window_height(height)
            }
            fn window_top(&self) -> Result<u16> { (**self).window_top() }
            fn set_window_top(&self, top: u16) -> Result<()> { (**self).set_window_top(top) }
            fn background_color(&self) -> Result<Color> { (**self).background_color() }
            fn set_background_color(&self, color: Color) -> Result<()> {
                (**self).set_background_color(color)
            }
            fn foreground_color(&self) -> Result<Color> { (**self).foreground_color() }
            fn set_foreground_color(&self, color: Color) -> Result<()> {
                (**self).set_foreground_color(color)
            }
            fn output_encoding(&self) -> Result<Encoding> { (**self).output_encoding() }
            fn set_output_encoding(&self, encoding: Encoding) -> Result<()> {
                (**self).set_output_encoding(encoding)
            }
            fn key_available(&self) -> Result<bool> { (**self).key_available() }
            fn read_key(&self, intercept: bool) -> Result<KeyInfo> { (**self).read_key(intercept) }
            fn set_window_position(&self, left: u16, top: u16) -> Result<()> {
                (**self).set_window_position(left, top)
            }
            fn set_cursor_position(&self, left: u16, top: u16) -> Result<()> {
                (**self).set_cursor_position(left, top)
            }
            fn write(&self, text: &str) -> Result<()> { (**self).write(text) }
            fn write_line(&self, text: &str) -> Result<()> { (**self).write_line(text) }
        }
    };
}

delegate_platform!(&P);
delegate_platform!(Box<P>);

/// The platform's input echo control.
///
/// Calls to [`Echo::disable`] and [`Echo::enable`] should be paired. This trait
/// does not enforce that; [`EchoGuard`](crate::EchoGuard) does.
pub trait Echo {
    /// Stop echoing input.
    fn disable(&mut self) -> Result<()>;

    /// Resume echoing input.
    fn enable(&mut self) -> Result<()>;
}

/// A mutably borrowed echo control is an echo control.
impl<E: Echo + ?Sized> Echo for &mut E {
    fn disable(&mut self) -> Result<()> {
        (**self).disable()
    }

    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }
}

fn _assert_traits_are_object_safe() {
    fn is_object_safe<T: ?Sized>() {}

    is_object_safe::<dyn Command>();
    is_object_safe::<dyn Platform>();
    is_object_safe::<dyn Echo>();
}

// ------------------------------------------------------------------------------------------------

/// The 16 console colors.
///
/// The discriminants follow the Windows console's character attributes, i.e.,
/// bit 0 is blue, bit 1 is green, bit 2 is red, and bit 3 is intensity. ANSI
/// escape sequences order red and blue the other way around, which
/// [`Color::to_ansi`] and [`Color::from_ansi`] take care of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    #[default]
    Black = 0,
    DarkBlue = 1,
    DarkGreen = 2,
    DarkCyan = 3,
    DarkRed = 4,
    DarkMagenta = 5,
    DarkYellow = 6,
    Gray = 7,
    DarkGray = 8,
    Blue = 9,
    Green = 10,
    Cyan = 11,
    Red = 12,
    Magenta = 13,
    Yellow = 14,
    White = 15,
}

impl Color {
    /// All colors in discriminant order.
    pub const ALL: [Color; 16] = [
        Color::Black,
        Color::DarkBlue,
        Color::DarkGreen,
        Color::DarkCyan,
        Color::DarkRed,
        Color::DarkMagenta,
        Color::DarkYellow,
        Color::Gray,
        Color::DarkGray,
        Color::Blue,
        Color::Green,
        Color::Cyan,
        Color::Red,
        Color::Magenta,
        Color::Yellow,
        Color::White,
    ];

    /// Convert a Windows console attribute nibble into a color.
    ///
    /// Only the four least significant bits are considered.
    pub const fn from_attribute(bits: u16) -> Self {
        Self::ALL[(bits & 0xf) as usize]
    }

    /// Get the Windows console attribute nibble.
    pub const fn to_attribute(self) -> u16 {
        self as u16
    }

    /// Convert an ANSI color index between 0 and 15 into a color.
    pub const fn from_ansi(index: u8) -> Option<Self> {
        if 15 < index {
            return None;
        }
        Some(Self::ALL[Self::swap_red_blue(index) as usize])
    }

    /// Get the ANSI color index between 0 and 15.
    pub const fn to_ansi(self) -> u8 {
        Self::swap_red_blue(self as u8)
    }

    const fn swap_red_blue(bits: u8) -> u8 {
        (bits & 0b1010) | ((bits & 0b0001) << 2) | ((bits & 0b0100) >> 2)
    }
}

// ------------------------------------------------------------------------------------------------

/// An output encoding, identified by its code page.
///
/// The console only ever needs to compare, store, and report encodings, so a
/// code page number suffices. It defaults to UTF-8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Encoding(u32);

impl Encoding {
    /// UTF-16 little endian.
    pub const UTF16: Self = Self(1_200);
    /// 7-bit US-ASCII.
    pub const ASCII: Self = Self(20_127);
    /// ISO 8859-1, i.e., Latin 1.
    pub const LATIN1: Self = Self(28_591);
    /// UTF-8.
    pub const UTF8: Self = Self(65_001);

    /// Create a new encoding from its code page.
    pub const fn from_code_page(code_page: u32) -> Self {
        Self(code_page)
    }

    /// Get the code page.
    pub const fn code_page(&self) -> u32 {
        self.0
    }

    /// Get the well-known name, if any.
    pub const fn name(&self) -> Option<&'static str> {
        Some(match self.0 {
            437 => "IBM437",
            1_200 => "UTF-16",
            1_252 => "windows-1252",
            20_127 => "US-ASCII",
            28_591 => "ISO-8859-1",
            65_001 => "UTF-8",
            _ => return None,
        })
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::UTF8
    }
}

impl core::fmt::Display for Encoding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "cp{}", self.0),
        }
    }
}

// ------------------------------------------------------------------------------------------------

/// A logical modifier key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modifier {
    /// The <kbd>shift</kbd> key.
    Shift = 0x01,
    /// The <kbd>alt</kbd> or <kbd>option</kbd> key.
    Alt = 0x02,
    /// The <kbd>control</kbd> key.
    Control = 0x04,
}

impl From<Modifier> for Modifiers {
    fn from(value: Modifier) -> Self {
        Self(value as u8)
    }
}

impl<M: Into<Modifiers>> core::ops::Add<M> for Modifier {
    type Output = Modifiers;

    fn add(self, rhs: M) -> Self::Output {
        Modifiers(self as u8 | rhs.into().0)
    }
}

impl<M: Into<Modifiers>> core::ops::Add<M> for Modifiers {
    type Output = Modifiers;

    fn add(self, rhs: M) -> Self::Output {
        Self(self.0 | rhs.into().0)
    }
}

impl<M: Into<Modifiers>> core::ops::AddAssign<M> for Modifiers {
    fn add_assign(&mut self, rhs: M) {
        self.0 |= rhs.into().0;
    }
}

/// Zero or more modifier keys, defaulting to none.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    /// Determine whether there are no active modifiers.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Determine whether the given modifier is active.
    pub const fn has(&self, modifier: Modifier) -> bool {
        self.0 & modifier as u8 != 0
    }
}

impl core::fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut set = f.debug_set();
        for modifier in [Modifier::Shift, Modifier::Alt, Modifier::Control] {
            if self.has(modifier) {
                set.entry(&modifier);
            }
        }
        set.finish()
    }
}

/// A key press as read from the console.
///
/// The key code is the platform's raw code, i.e., the virtual key code on
/// Windows and the first byte of input on Unix. The character is the text the
/// key produces, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyInfo {
    key_char: Option<char>,
    code: u16,
    modifiers: Modifiers,
}

impl KeyInfo {
    /// Create a new key.
    pub const fn new(key_char: Option<char>, code: u16, modifiers: Modifiers) -> Self {
        Self {
            key_char,
            code,
            modifiers,
        }
    }

    /// Create a new key from a character typed on a terminal.
    ///
    /// C0 controls other than tab, carriage return, line feed, and escape are
    /// reported with the control modifier and the corresponding letter, so
    /// that `0x01` becomes <kbd>control-a</kbd>. The raw byte is preserved as
    /// key code either way.
    pub fn from_char(c: char) -> Self {
        let code = u16::try_from(u32::from(c)).unwrap_or(u16::MAX);
        match c {
            '\x01'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1a' => {
                let letter = char::from(b'a' - 1 + c as u8);
                Self::new(Some(letter), code, Modifier::Control.into())
            }
            _ => Self::new(Some(c), code, Modifiers::default()),
        }
    }

    /// Get the character, if any.
    pub const fn key_char(&self) -> Option<char> {
        self.key_char
    }

    /// Get the raw key code.
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Get the modifiers.
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_color_ansi() {
        assert_eq!(Color::DarkRed.to_ansi(), 1, "dark red is ANSI red");
        assert_eq!(Color::DarkBlue.to_ansi(), 4, "dark blue is ANSI blue");
        assert_eq!(Color::DarkYellow.to_ansi(), 3, "dark yellow is ANSI yellow");
        assert_eq!(Color::Gray.to_ansi(), 7, "gray is ANSI white");
        assert_eq!(Color::Red.to_ansi(), 9, "red is ANSI bright red");
        assert_eq!(Color::from_ansi(12), Some(Color::Blue), "bright blue");
        assert_eq!(Color::from_ansi(16), None, "out of range");

        for color in Color::ALL {
            assert_eq!(Color::from_ansi(color.to_ansi()), Some(color), "{:?}", color);
            assert_eq!(Color::from_attribute(color.to_attribute()), color, "{:?}", color);
        }
    }

    #[test]
    fn test_encoding() {
        assert_eq!(Encoding::default(), Encoding::UTF8);
        assert_eq!(format!("{}", Encoding::UTF8), "UTF-8");
        assert_eq!(format!("{}", Encoding::from_code_page(850)), "cp850");
        assert_eq!(Encoding::from_code_page(28_591), Encoding::LATIN1);
    }

    #[test]
    fn test_key_info() {
        let key = KeyInfo::from_char('\x01');
        assert_eq!(key.key_char(), Some('a'));
        assert_eq!(key.code(), 1);
        assert!(key.modifiers().has(Modifier::Control), "control-a");

        let key = KeyInfo::from_char('\r');
        assert_eq!(key.key_char(), Some('\r'));
        assert!(key.modifiers().is_empty(), "no modifiers for return");

        let key = KeyInfo::from_char('é');
        assert_eq!(key.code(), 0xe9);

        let modifiers = Modifier::Shift + Modifier::Control;
        assert_eq!(format!("{:?}", modifiers), "{Shift, Control}");
    }
}
