//! The escape sequences written by the console.
//!
//! This module provides the straight-forward struct and enum types that
//! implement the [`Command`] trait for the ANSI escape sequences used by the
//! [`Console`](crate::Console) adapter and by the Unix platform. Organized by
//! topic, they are:
//!
//!   * Cursor management:
//!       * [`SetCursor::Default`], [`SetCursor::BlinkingBlock`],
//!         [`SetCursor::SteadyBlock`], [`SetCursor::BlinkingUnderscore`],
//!         [`SetCursor::SteadyUnderscore`], [`SetCursor::BlinkingBar`], and
//!         [`SetCursor::SteadyBar`]
//!       * [`HideCursor`] and [`ShowCursor`]
//!       * Absolute [`MoveTo`] and [`DynMoveTo`]
//!       * [`RequestCursorPosition`]
//!   * Scrolling:
//!       * [`ScrollUp`] and [`DynScrollUp`]
//!   * Managing content:
//!       * [`EraseRestOfLine`]
//!   * Styling content:
//!       * [`ResetStyle`], [`Bold`]
//!       * [`DynSetForeground`] and [`DynSetBackground`] for the 16 console
//!         [`Color`]s
//!
//! Commands that require arguments come in one or both of two flavors, a static
//! flavor relying on const generics and a dynamic flavor storing the arguments.
//! The command name for the latter flavor starts with `Dyn`. The console and
//! the Unix terminal only write the dynamic flavor. The static [`ScrollUp`]
//! and [`MoveTo`] are public extras for fixed sequences known at compile time.
//!
//! Coordinates are 1-based, as they are on the wire.
//!
//!
//! # Example
//!
//! Executing a command is as simple as writing its display:
//! ```
//! # use prettyconsole::cmd::{DynScrollUp, EraseRestOfLine, SetCursor};
//! assert_eq!(format!("{}", SetCursor::SteadyBlock), "\x1b[2 q");
//! assert_eq!(format!("{}", DynScrollUp(3)), "\x1b[3S");
//! assert_eq!(format!("{}", EraseRestOfLine), "\x1b[K");
//! ```

use crate::util::Radix;
use crate::{Color, Command};
use std::io::{Error, ErrorKind, Result};

macro_rules! declare_unit_struct {
    ($name:ident) => {
        #[doc = concat!("The unit `",stringify!($name),"` command.")]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name;
    };
}

macro_rules! declare_n_struct {
    ($name:ident( $( $arg:ident : $typ:ty ),+ $(,)? )) => {
        #[doc = concat!("The dynamic `",stringify!($name),"(",stringify!($($arg),+),")` command.")]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name( $( pub $typ ),+ );
    };
    ($name:ident< $( $arg:ident : $typ:ty ),+ >) => {
        #[doc = concat!("The static `",stringify!($name),"<",stringify!($($arg),+),">` command.")]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name< $(const $arg: $typ),+ >;
    }
}

macro_rules! implement_command {
    ($name:ident $(< $( $arg:ident : $typ:ty ),+ >)? : $selfish:ident ; $output:ident $body:block) => {
        impl $(< $(const $arg: $typ),+ >)? $crate::Command for $name $(< $($arg),+ >)? {}

        impl $(< $(const $arg: $typ),+ >)? ::core::fmt::Display for $name $(< $($arg),+ >)? {
            #[inline]
            fn fmt(&$selfish, $output: &mut ::core::fmt::Formatter<'_>) -> core::fmt::Result {
                $body
            }
        }
    }
}

macro_rules! define_unit_command {
    ($name:ident, $ansi:tt) => {
        declare_unit_struct!($name);
        implement_command!($name: self; f { f.write_str($ansi) });
    };
}

macro_rules! define_cmd_1 {
    ($name:ident <$arg:ident : $typ:ty>, $dyn_name:ident, $prefix:literal, $suffix:literal) => {
        declare_n_struct!($name<$arg : $typ>);
        implement_command!($name<$arg : $typ>: self; f {
            f.write_str($prefix)?;
            <_ as ::core::fmt::Display>::fmt(&$arg, f)?;
            f.write_str($suffix)
        });

        declare_n_struct!($dyn_name($arg : $typ));
        implement_command!($dyn_name: self; f {
            f.write_str($prefix)?;
            <_ as ::core::fmt::Display>::fmt(&self.0, f)?;
            f.write_str($suffix)
        });
    }
}

macro_rules! define_cmd_2 {
    (
        $name:ident <$arg1:ident : $typ1:ty, $arg2:ident : $typ2:ty>,
            $dyn_name:ident, $prefix:literal, $suffix:literal
    ) => {
        declare_n_struct!($name<$arg1 : $typ1, $arg2 : $typ2>);
        implement_command!($name<$arg1 : $typ1, $arg2 : $typ2>: self; f {
            f.write_str($prefix)?;
            <_ as ::core::fmt::Display>::fmt(&$arg1, f)?;
            f.write_str(";")?;
            <_ as ::core::fmt::Display>::fmt(&$arg2, f)?;
            f.write_str($suffix)
        });

        declare_n_struct!($dyn_name($arg1 : $typ1, $arg2 : $typ2));
        implement_command!($dyn_name: self; f {
            f.write_str($prefix)?;
            <_ as ::core::fmt::Display>::fmt(&self.0, f)?;
            f.write_str(";")?;
            <_ as ::core::fmt::Display>::fmt(&self.1, f)?;
            f.write_str($suffix)
        });
    }
}

macro_rules! define_color {
    ($dyn_name:ident, $dark_base:expr, $bright_base:expr) => {
        declare_n_struct!($dyn_name(COLOR: Color));
        implement_command!($dyn_name: self; f {
            let index = self.0.to_ansi();
            let code = if index < 8 {
                $dark_base + index
            } else {
                $bright_base + index
            };
            f.write_str("\x1b[")?;
            <_ as ::core::fmt::Display>::fmt(&code, f)?;
            f.write_str("m")
        });
    };
}

// ====================================== Library ======================================

// ------------------------------------- Scrolling -------------------------------------

define_cmd_1!(ScrollUp<ROWS: u16>, DynScrollUp, "\x1b[", "S");

// --------------------------------- Cursor Management ---------------------------------

/// The cursor shape.
///
/// The console only uses [`SetCursor::SteadyBlock`] and
/// [`SetCursor::BlinkingBar`]. The other shapes complete the `DECSCUSR`
/// vocabulary for applications that write their own sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetCursor {
    /// The terminal's configured default shape.
    Default = 0,
    /// A blinking block.
    BlinkingBlock = 1,
    /// A steady block, used for cursor sizes above 50%.
    SteadyBlock = 2,
    /// A blinking underscore.
    BlinkingUnderscore = 3,
    /// A steady underscore.
    SteadyUnderscore = 4,
    /// A blinking bar, used for cursor sizes up to 50%.
    BlinkingBar = 5,
    /// A steady bar.
    SteadyBar = 6,
}

impl Command for SetCursor {}

impl core::fmt::Display for SetCursor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("\x1b[")?;
        <_ as core::fmt::Display>::fmt(&(*self as u8), f)?;
        f.write_str(" q")
    }
}

define_unit_command!(HideCursor, "\x1b[?25l");
define_unit_command!(ShowCursor, "\x1b[?25h");

define_cmd_2!(MoveTo<ROW: u16, COLUMN: u16>, DynMoveTo, "\x1b[", "H");

define_unit_command!(RequestCursorPosition, "\x1b[6n");

impl RequestCursorPosition {
    /// Parse the response's payload into the 1-based row and column.
    ///
    /// The payload is everything after the leading `ESC [`, i.e.,
    /// <code><em>row</em>;<em>column</em>R</code>.
    pub fn parse(&self, payload: &[u8]) -> Result<(u16, u16)> {
        let s = payload
            .strip_suffix(b"R")
            .ok_or_else(|| Error::from(ErrorKind::InvalidData))?;

        let mut index = 0;
        let mut params = [0_u16; 2];
        for bytes in s.split(|b| *b == b';' || *b == b':') {
            if 2 <= index {
                return Err(ErrorKind::InvalidData.into());
            }
            params[index] = Radix::Decimal
                .parse_u16(bytes)
                .ok_or_else(|| Error::from(ErrorKind::InvalidData))?;
            index += 1;
        }

        if index < 2 {
            return Err(ErrorKind::InvalidData.into());
        }

        Ok(params.into())
    }
}

// -------------------------------- Content Management ---------------------------------

define_unit_command!(EraseRestOfLine, "\x1b[K");

// --------------------------------- Style Management ----------------------------------

define_unit_command!(ResetStyle, "\x1b[m");
define_unit_command!(Bold, "\x1b[1m");

define_color!(DynSetForeground, 30, (const { 90 - 8 }));
define_color!(DynSetBackground, 40, (const { 100 - 8 }));

// =====================================================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_size_and_display() {
        assert_eq!(std::mem::size_of::<ScrollUp::<2>>(), 0, "static is zero-sized");
        assert_eq!(std::mem::size_of::<DynScrollUp>(), 2, "dynamic stores rows");
        assert_eq!(std::mem::size_of::<MoveTo::<5, 7>>(), 0, "static is zero-sized");
        assert_eq!(std::mem::size_of::<DynMoveTo>(), 4, "dynamic stores both");

        assert_eq!(format!("{}", SetCursor::SteadyBlock), "\x1b[2 q");
        assert_eq!(format!("{}", SetCursor::BlinkingBar), "\x1b[5 q");
        assert_eq!(format!("{}", ScrollUp::<3>), "\x1b[3S");
        assert_eq!(format!("{}", DynScrollUp(3)), "\x1b[3S");
        assert_eq!(format!("{}", MoveTo::<5, 7>), "\x1b[5;7H");
        assert_eq!(format!("{}", DynMoveTo(5, 7)), "\x1b[5;7H");
        assert_eq!(format!("{}", EraseRestOfLine), "\x1b[K");
        assert_eq!(format!("{}", HideCursor), "\x1b[?25l");
    }

    #[test]
    fn test_colors() {
        assert_eq!(format!("{}", DynSetForeground(Color::Black)), "\x1b[30m");
        assert_eq!(format!("{}", DynSetForeground(Color::DarkRed)), "\x1b[31m");
        assert_eq!(format!("{}", DynSetForeground(Color::Gray)), "\x1b[37m");
        assert_eq!(format!("{}", DynSetForeground(Color::White)), "\x1b[97m");
        assert_eq!(format!("{}", DynSetBackground(Color::DarkBlue)), "\x1b[44m");
        assert_eq!(format!("{}", DynSetBackground(Color::Red)), "\x1b[101m");
    }

    #[test]
    fn test_parse_cursor_position() -> std::io::Result<()> {
        let position = RequestCursorPosition.parse(b"6;65R")?;
        assert_eq!(position, (6, 65));

        for payload in [&b"6;65"[..], b"6R", b"6;65;1R", b";65R", b"x;1R"] {
            let result = RequestCursorPosition.parse(payload);
            assert!(result.is_err(), "{:?} should not parse", payload);
        }
        Ok(())
    }
}
