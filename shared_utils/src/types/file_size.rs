//! FileSize Type-Safe Wrapper
//!
//! Byte counts used for thresholds and size ceilings, plus parsing of
//! human-readable sizes such as `1Mb`, `500 kB` or `1.5GiB`.

use crate::progress::format_bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileSizeParseError {
    #[error("empty size string")]
    Empty,

    #[error("invalid number in size string: {0:?}")]
    InvalidNumber(String),

    #[error("unknown size unit {unit:?} in {input:?}")]
    UnknownUnit { input: String, unit: String },

    #[error("size out of range: {0:?}")]
    OutOfRange(String),
}

/// A byte count.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let size = FileSize::parse("1Mb").unwrap();
/// assert_eq!(size.bytes(), 1_000_000);
/// assert_eq!(FileSize::parse("2 KiB").unwrap().bytes(), 2048);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Parse a human-readable byte size.
    ///
    /// Units are case-insensitive. Decimal units (`kB`, `MB`, `GB`, `TB`,
    /// `PB` and the one-letter forms `k`, `m`, `g`, `t`, `p`) are powers of
    /// 1000; binary units (`KiB`, `MiB`, ... and `Ki`, `Mi`, ...) are powers
    /// of 1024. A bare number is a byte count, a bare unit means one of it,
    /// and fractional values are truncated to whole bytes.
    pub fn parse(input: &str) -> Result<Self, FileSizeParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FileSizeParseError::Empty);
        }

        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let number = number.trim();
        let unit = unit.trim();

        let value: f64 = if number.is_empty() {
            1.0
        } else {
            number
                .parse()
                .map_err(|_| FileSizeParseError::InvalidNumber(input.to_string()))?
        };
        if !value.is_finite() || value < 0.0 {
            return Err(FileSizeParseError::InvalidNumber(input.to_string()));
        }

        let multiplier =
            unit_multiplier(&unit.to_ascii_lowercase()).ok_or_else(|| {
                FileSizeParseError::UnknownUnit {
                    input: input.to_string(),
                    unit: unit.to_string(),
                }
            })?;

        let bytes = value * multiplier as f64;
        if bytes >= u64::MAX as f64 {
            return Err(FileSizeParseError::OutOfRange(input.to_string()));
        }
        Ok(Self(bytes as u64))
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    const K: u64 = 1000;
    const KI: u64 = 1024;
    let m = match unit {
        "" | "b" => 1,
        "k" | "kb" => K,
        "m" | "mb" => K.pow(2),
        "g" | "gb" => K.pow(3),
        "t" | "tb" => K.pow(4),
        "p" | "pb" => K.pow(5),
        "ki" | "kib" => KI,
        "mi" | "mib" => KI.pow(2),
        "gi" | "gib" => KI.pow(3),
        "ti" | "tib" => KI.pow(4),
        "pi" | "pib" => KI.pow(5),
        _ => return None,
    };
    Some(m)
}

impl FromStr for FileSize {
    type Err = FileSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_bytes(self.0))
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl From<FileSize> for u64 {
    fn from(size: FileSize) -> Self {
        size.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_binary_units() {
        assert_eq!(FileSize::new(500).to_string(), "500 B");
        assert_eq!(FileSize::parse("1KiB").unwrap().to_string(), "1.00 KB");
        assert_eq!(u64::from(FileSize::from(42)), 42);
    }

    #[test]
    fn test_parse_decimal_units() {
        assert_eq!(FileSize::parse("1Mb").unwrap().bytes(), 1_000_000);
        assert_eq!(FileSize::parse("1MB").unwrap().bytes(), 1_000_000);
        assert_eq!(FileSize::parse("500Kb").unwrap().bytes(), 500_000);
        assert_eq!(FileSize::parse("200 kB").unwrap().bytes(), 200_000);
        assert_eq!(FileSize::parse("2Gb").unwrap().bytes(), 2_000_000_000);
        assert_eq!(FileSize::parse("3k").unwrap().bytes(), 3_000);
    }

    #[test]
    fn test_parse_binary_units() {
        assert_eq!(FileSize::parse("1KiB").unwrap().bytes(), 1024);
        assert_eq!(FileSize::parse("1 mib").unwrap().bytes(), 1024 * 1024);
        assert_eq!(FileSize::parse("2Gi").unwrap().bytes(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_plain_and_fractional() {
        assert_eq!(FileSize::parse("100").unwrap().bytes(), 100);
        assert_eq!(FileSize::parse("100 B").unwrap().bytes(), 100);
        assert_eq!(FileSize::parse("1.5MB").unwrap().bytes(), 1_500_000);
        assert_eq!(FileSize::parse("1e3").unwrap().bytes(), 1_000);
        assert_eq!(FileSize::parse("MB").unwrap().bytes(), 1_000_000);
        assert_eq!("  5 kb ".parse::<FileSize>().unwrap().bytes(), 5_000);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FileSize::parse(""), Err(FileSizeParseError::Empty));
        assert_eq!(FileSize::parse("   "), Err(FileSizeParseError::Empty));
        assert!(matches!(
            FileSize::parse("12 parsecs"),
            Err(FileSizeParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            FileSize::parse("1.2.3MB"),
            Err(FileSizeParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            FileSize::parse("-5MB"),
            Err(FileSizeParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            FileSize::parse("100000PiB"),
            Err(FileSizeParseError::OutOfRange(_))
        ));
    }
}
