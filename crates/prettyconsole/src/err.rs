//! Helper module with this crate's error type.
//!
//! Console errors complement I/O errors by naming the conditions this crate
//! itself detects, e.g., an operation the platform cannot support or a
//! malformed cursor position report. They seamlessly convert to and from I/O
//! errors, so that every fallible operation returns a [`std::io::Result`].
//!
//! Errors raised by the platform itself are never wrapped. They reach the
//! caller exactly as the operating system reported them.

use super::cmd::{Bold, DynSetForeground, ResetStyle};
use crate::Color;

/// The enumeration of error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The platform does not support the operation.
    Unsupported,
    /// The terminal did not answer a cursor position request in time.
    NoReport,
    /// The terminal's cursor position report is malformed.
    MalformedReport,
    /// The connection is not a terminal.
    NotATerminal,
    /// An error accessing the console.
    Inaccessible,
}

impl ErrorKind {
    /// Turn the error kind to an error message.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Unsupported => "operation is not supported by this console",
            Self::NoReport => "terminal did not report the cursor position",
            Self::MalformedReport => "malformed cursor position report",
            Self::NotATerminal => "console is not connected to a terminal",
            Self::Inaccessible => "error accessing console",
        }
    }
}

impl From<ErrorKind> for std::io::Error {
    fn from(value: ErrorKind) -> Self {
        Error::from(value).into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, source: None }
    }
}

/// A console error.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<std::io::Error>,
}

impl Error {
    /// Create a new inaccessible error.
    pub fn inaccessible(source: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Inaccessible,
            source: Some(source),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.kind.as_str())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self {
            kind: ErrorKind::Inaccessible,
            source: Some(ref error),
        } = *self
        {
            Some(error)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::inaccessible(value)
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        use self::ErrorKind::*;

        match value.kind {
            Unsupported => Self::new(std::io::ErrorKind::Unsupported, value),
            NoReport => Self::new(std::io::ErrorKind::TimedOut, value),
            MalformedReport => Self::new(std::io::ErrorKind::InvalidData, value),
            NotATerminal => Self::new(std::io::ErrorKind::ConnectionRefused, value),
            Inaccessible => {
                if let Some(error) = value.source {
                    error
                } else {
                    Self::new(std::io::ErrorKind::Other, value)
                }
            }
        }
    }
}

/// Determine whether an operation should be retried.
///
/// This function treats interrupted operations as retryable.
pub fn should_retry<T>(result: &std::io::Result<T>) -> bool {
    matches!(*result, Err(ref err) if err.kind() == std::io::ErrorKind::Interrupted)
}

/// Report the error, including any sources.
#[allow(clippy::print_stdout)]
pub fn report<E: std::error::Error>(error: &E) {
    println!(
        "{}{}ERROR: {}{}",
        Bold,
        DynSetForeground(Color::DarkRed),
        error,
        ResetStyle
    );

    let mut error: &dyn std::error::Error = error;
    while let Some(inner) = error.source() {
        println!("    {}", inner);
        error = inner;
    }
}

#[cfg(test)]
mod test {
    use super::{Error, ErrorKind};

    #[test]
    fn test_conversion() {
        let error: std::io::Error = ErrorKind::Unsupported.into();
        assert_eq!(error.kind(), std::io::ErrorKind::Unsupported);
        assert_eq!(format!("{}", error), ErrorKind::Unsupported.as_str());

        let error: std::io::Error = ErrorKind::NoReport.into();
        assert_eq!(error.kind(), std::io::ErrorKind::TimedOut);

        // Platform errors pass through unwrapped.
        let original = std::io::Error::from_raw_os_error(22);
        let error: std::io::Error = Error::from(original).into();
        assert_eq!(error.raw_os_error(), Some(22));
    }
}
