//! Helper module with utilities for byte strings.

use core::fmt;

/// Nicely format a byte.
fn format_nicely<W>(byte: u8, output: &mut W) -> fmt::Result
where
    W: fmt::Write + ?Sized,
{
    if (0x20..=0x7e).contains(&byte) {
        return output.write_char(byte as char);
    }

    let replacement = match byte {
        // Make sure that letters are math sans-serif Unicode letters and at
        // least one letter is not a hexadecimal number.
        0x00 => "‹𝗇𝗎𝗅›",
        0x07 => "‹𝖻𝖾𝗅›",
        0x08 => "‹𝖻s›",
        0x09 => "‹𝗁𝗍›",
        0x0a => "‹𝗅𝖿›",
        0x0b => "‹𝗏𝗍›",
        0x0d => "‹𝖼𝗋›",
        0x1b => "‹𝖾𝗌𝖼›",
        0x7f => "‹𝖽𝖾𝗅›",
        0x9b => "‹𝖼𝗌𝗂›",
        _ => "",
    };
    if !replacement.is_empty() {
        return output.write_str(replacement);
    }

    output.write_fmt(format_args!("‹{:02x}›", byte))
}

/// A newtype for nicely formatting a byte slice.
struct ByteStringNicely<'a>(&'a [u8]);

impl fmt::Display for ByteStringNicely<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for byte in self.0.iter() {
            if *byte == b'"' {
                f.write_str("\\\"")?;
            } else {
                format_nicely(*byte, f)?;
            }
        }
        f.write_str("\"")
    }
}

impl fmt::Debug for ByteStringNicely<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Turn the slice into a value that displays nicely.
///
/// Printable ASCII characters display as themselves, common C0 and C1
/// controls as mnemonics such as `‹𝖾𝗌𝖼›`, and all other bytes as two-digit
/// hexadecimal numbers such as `‹c3›`.
///
/// # Example
///
/// ```
/// # use prettyconsole::util::nicely_str;
/// assert_eq!(format!("{}", nicely_str(b"\x1b[K")), "\"‹𝖾𝗌𝖼›[K\"");
/// ```
pub fn nicely_str(bytes: &[u8]) -> impl fmt::Debug + fmt::Display + use<'_> {
    ByteStringNicely(bytes)
}

// ------------------------------------------------------------------------------------------------

/// A choice of radix for converting byte slices to integers.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub(crate) enum Radix {
    Decimal = 10,
}

impl Radix {
    pub const fn max_length(&self) -> usize {
        match self {
            Radix::Decimal => 10,
        }
    }

    /// Parse the bytes as a number, returning `None` for empty, overlong, or
    /// malformed input.
    pub const fn parse(&self, bytes: &[u8]) -> Option<u64> {
        let length = bytes.len();
        if bytes.is_empty() || self.max_length() < length {
            return None;
        }

        let mut index = 0;
        let mut result = 0;

        while index < length {
            let digit = match (bytes[index] as char).to_digit(*self as u32) {
                Some(digit) => digit,
                None => return None,
            };
            result = (*self as u64) * result + digit as u64;
            index += 1;
        }

        Some(result)
    }

    pub const fn parse_u16(&self, bytes: &[u8]) -> Option<u16> {
        if let Some(n) = self.parse(bytes) {
            if n <= 0xffff {
                return Some(n as u16);
            }
        }
        None
    }
}
