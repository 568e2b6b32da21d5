//! # Pretty 🌸 Console
//!
//! This crate provides a **portable console adapter** for line editors and
//! similar interactive programs. It exposes one uniform set of console
//! capabilities, i.e., cursor position, size, and visibility, buffer and
//! window geometry, colors, output encoding, key input, and text output, on
//! top of whatever the platform offers. Its dependencies are the
//! [`log`](https://crates.io/crates/log) facade and the low-level crate
//! enabling system calls, i.e., [`libc`](https://crates.io/crates/libc) on
//! Unix and [`windows-sys`](https://crates.io/crates/windows-sys) on Windows.
//!
//! The [`Console`] adapter wraps two platform services:
//!
//!   * A [`Platform`] provides the console operations themselves. The
//!     [`Terminal`] implementation uses the Windows console API or, on Unix,
//!     the terminal device and ANSI escape sequences.
//!   * An [`Echo`] control turns input echo off and on again. [`InputEcho`] is
//!     the matching implementation.
//!
//! Almost all console operations pass straight through to the platform. Only
//! the cursor size, the output encoding, and key reading add behavior of their
//! own. In particular, when the native console API is unavailable, e.g.,
//! because output has been redirected, the cursor size is approximated with a
//! cursor shape written as an ANSI escape sequence. All output, including such
//! escape sequences, goes through the console's [`Sink`].
//!
//! The [`cmd`] module provides the escape sequences used by the console,
//! [`opt`] its options, and [`err`] the errors it detects itself.
//!
//!
//! # Example
//!
//! ```
//! # use std::io::Result;
//! # use prettyconsole::Console;
//! # fn run() -> Result<()> {
//! let mut console = Console::open()?;
//! console.save_cursor()?;
//! console.write("Press any key: ")?;
//! let key = console.read_key()?;
//! console.restore_cursor()?;
//! console.blank_rest_of_line()?;
//! console.write_line(&format!("{:?}", key.key_char()))?;
//! # Ok(())
//! # }
//! # // Without a terminal, there is nothing to run.
//! # let _ = run;
//! # Ok::<(), std::io::Error>(())
//! ```

mod api;
pub mod cmd;
mod console;
pub mod err;
#[cfg(test)]
mod fake;
pub mod opt;
mod sys;
pub mod util;

pub use api::{Color, Command, Echo, Encoding, KeyInfo, Modifier, Modifiers, Platform};
pub use console::{Backend, Console, EchoGuard, Passthrough, Sink};
pub use sys::{InputEcho, Terminal};
