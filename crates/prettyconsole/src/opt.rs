//! Helper module with the options for console adapters.
//!
//! This module provides the options for a [`Console`](crate::Console) and the
//! corresponding builder.
//!
//!
//! # Example
//!
//! ```
//! # use std::time::Duration;
//! # use prettyconsole::opt::{Options, Selection};
//! let options = Options::builder()
//!     .selection(Selection::Escape)
//!     .poll_interval(Duration::from_millis(20))
//!     .build();
//!
//! assert_eq!(options.selection(), Selection::Escape);
//! assert_eq!(options.cursor_size(), 25);
//! ```

use core::time::Duration;

use crate::Encoding;

/// The diagnostic logging volume.
///
/// Diagnostics are emitted through the [`log`] facade, so an application also
/// needs to install a logger to see them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Volume {
    /// Log nothing. Encoding failures remain invisible.
    #[default]
    Silent,
    /// Log encoding failures that are otherwise suppressed.
    Regular,
    /// Also log every write.
    Detailed,
}

/// The backend selection.
///
/// The console adapter controls the cursor shape either through the native
/// console API or through ANSI escape sequences.
///
///   * __Detect__ runs the capability query for every cursor shape access,
///     since redirection may change the answer mid-session. This is the
///     default.
///   * __Native__ always uses the native console API.
///   * __Escape__ always uses ANSI escape sequences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Query the platform for every access.
    #[default]
    Detect,
    /// Always use the native console API.
    Native,
    /// Always use ANSI escape sequences.
    Escape,
}

#[derive(Clone, Debug)]
struct OptionData {
    volume: Volume,
    selection: Selection,
    poll_interval: Duration,
    cursor_size: u8,
    default_encoding: Encoding,
    timeout: u8,
}

impl OptionData {
    pub const fn new() -> Self {
        Self {
            volume: Volume::Silent,
            selection: Selection::Detect,
            poll_interval: Duration::from_millis(50),
            cursor_size: 25,
            default_encoding: Encoding::UTF8,
            timeout: 5,
        }
    }
}

/// A builder of options objects.
#[derive(Debug)]
pub struct OptionBuilder(OptionData);

impl OptionBuilder {
    /// Set the volume.
    pub fn volume(&mut self, volume: Volume) -> &mut Self {
        self.0.volume = volume;
        self
    }

    /// Set the backend selection.
    pub fn selection(&mut self, selection: Selection) -> &mut Self {
        self.0.selection = selection;
        self
    }

    /// Set the interval for polling key availability.
    pub fn poll_interval(&mut self, interval: Duration) -> &mut Self {
        self.0.poll_interval = interval;
        self
    }

    /// Set the initial cursor size used when the native console API is not
    /// available.
    pub fn cursor_size(&mut self, size: u8) -> &mut Self {
        self.0.cursor_size = size;
        self
    }

    /// Set the encoding reported when the platform's encoding cannot be read.
    pub fn default_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.0.default_encoding = encoding;
        self
    }

    /// Set the timeout in deciseconds (0.1s) for terminal reports.
    pub fn timeout(&mut self, timeout: u8) -> &mut Self {
        self.0.timeout = timeout;
        self
    }

    /// Instantiate the options.
    pub fn build(&self) -> Options {
        Options(self.0.clone())
    }
}

/// An options object.
#[derive(Clone, Debug)]
pub struct Options(OptionData);

impl Default for Options {
    fn default() -> Self {
        Options(OptionData::new())
    }
}

impl Options {
    /// Create a new builder with the default option values.
    pub fn builder() -> OptionBuilder {
        OptionBuilder(OptionData::new())
    }

    /// Instantiate the default options but with regular diagnostics enabled.
    pub fn with_log() -> Options {
        Self::builder().volume(Volume::Regular).build()
    }

    /// Instantiate the default options but with detailed diagnostics enabled.
    pub fn with_detailed_log() -> Options {
        Self::builder().volume(Volume::Detailed).build()
    }

    /// Get the volume.
    pub fn volume(&self) -> Volume {
        self.0.volume
    }

    /// Get the backend selection.
    pub fn selection(&self) -> Selection {
        self.0.selection
    }

    /// Get the interval for polling key availability.
    pub fn poll_interval(&self) -> Duration {
        self.0.poll_interval
    }

    /// Get the initial cursor size.
    pub fn cursor_size(&self) -> u8 {
        self.0.cursor_size
    }

    /// Get the default encoding.
    pub fn default_encoding(&self) -> Encoding {
        self.0.default_encoding
    }

    /// Get the timeout in 0.1s increments for terminal reports.
    pub fn timeout(&self) -> u8 {
        self.0.timeout
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.volume(), Volume::Silent);
        assert_eq!(options.selection(), Selection::Detect);
        assert_eq!(options.poll_interval(), Duration::from_millis(50));
        assert_eq!(options.cursor_size(), 25);
        assert_eq!(options.default_encoding(), Encoding::UTF8);
        assert_eq!(options.timeout(), 5);

        assert_eq!(Options::with_log().volume(), Volume::Regular);
        assert!(Volume::Detailed > Volume::Regular, "volume is ordered");
    }
}
