//! Memory, time and bandwidth literals
//!
//! Memory literals are a decimal number followed by one of
//! `b, k, kb, m, mb, g, gb, t, tb, p, pb` (powers of 1024, case-insensitive).
//! Time literals use `s, m, h, d, w`. A bandwidth is `<memory>/<time>`.

use crate::errors::{Result, RuCubeError};
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

const MEMORY_UNITS: [(&str, u32); 11] = [
    ("b", 0),
    ("k", 1),
    ("kb", 1),
    ("m", 2),
    ("mb", 2),
    ("g", 3),
    ("gb", 3),
    ("t", 4),
    ("tb", 4),
    ("p", 5),
    ("pb", 5),
];

const TIME_UNITS: [(&str, i64); 5] = [
    ("s", 1),
    ("m", 60),
    ("h", 3_600),
    ("d", 86_400),
    ("w", 604_800),
];

fn units_error(literal: &str, reason: impl Into<String>) -> RuCubeError {
    RuCubeError::InvalidUnits {
        literal: literal.to_string(),
        reason: reason.into(),
    }
}

/// Split `"1.5gb"` into `(1.5, "gb")`
fn split_number(literal: &str) -> Result<(f64, String)> {
    let trimmed = literal.trim();
    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);
    if number.is_empty() {
        return Err(units_error(literal, "missing number"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| units_error(literal, format!("'{number}' is not a number")))?;
    Ok((value, unit.trim().to_ascii_lowercase()))
}

/// An amount of memory, stored in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Memory(u64);

impl Memory {
    /// Memory amount of exactly `bytes` bytes
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Number of bytes
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Parse a memory literal such as `"100mb"` or `"1.5g"`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidUnits`] for unknown units, negative or
    /// malformed numbers.
    pub fn parse(literal: &str) -> Result<Self> {
        let (value, unit) = split_number(literal)?;
        let power = if unit.is_empty() {
            0
        } else {
            MEMORY_UNITS
                .iter()
                .find(|(name, _)| *name == unit)
                .map(|(_, power)| *power)
                .ok_or_else(|| units_error(literal, format!("unknown memory unit '{unit}'")))?
        };
        let bytes = value * 1024_f64.powi(power as i32);
        if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
            return Err(units_error(literal, "value out of range"));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(bytes.round() as u64))
    }
}

impl FromStr for Memory {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Memory {
    /// Uses the largest unit that represents the amount exactly
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 6] = ["b", "kb", "mb", "gb", "tb", "pb"];
        let mut value = self.0;
        let mut index = 0;
        while index + 1 < NAMES.len() && value != 0 && value % 1024 == 0 {
            value /= 1024;
            index += 1;
        }
        write!(f, "{value}{}", NAMES[index])
    }
}

/// A time span, backed by [`chrono::Duration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time(Duration);

impl Time {
    /// Parse a time literal such as `"30s"` or `"1.5h"`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidUnits`] for unknown units or malformed numbers.
    pub fn parse(literal: &str) -> Result<Self> {
        let (value, unit) = split_number(literal)?;
        let unit = if unit.is_empty() { "s".to_string() } else { unit };
        let factor = TIME_UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, factor)| *factor)
            .ok_or_else(|| units_error(literal, format!("unknown time unit '{unit}'")))?;
        let millis = value * factor as f64 * 1000.0;
        if !millis.is_finite() || millis > i64::MAX as f64 {
            return Err(units_error(literal, "value out of range"));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(Duration::milliseconds(millis.round() as i64)))
    }

    /// The underlying duration
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }

    /// Length in (fractional) seconds
    #[must_use]
    pub fn seconds(self) -> f64 {
        self.0.num_milliseconds() as f64 / 1000.0
    }
}

impl FromStr for Time {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.seconds())
    }
}

/// An amount of memory per unit of time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bandwidth {
    pub memory: Memory,
    pub time: Time,
}

impl Bandwidth {
    /// Parse a bandwidth literal such as `"100mb/s"` or `"1g/2m"`
    ///
    /// # Errors
    ///
    /// Returns [`RuCubeError::InvalidUnits`] when the literal is not `<memory>/<time>`
    /// or the time part is zero.
    pub fn parse(literal: &str) -> Result<Self> {
        let (memory, time) = literal
            .split_once('/')
            .ok_or_else(|| units_error(literal, "expected '<memory>/<time>'"))?;
        let memory = Memory::parse(memory)?;
        let time_part = time.trim();
        // "/s" means one second
        let time = if time_part.starts_with(|c: char| c.is_ascii_alphabetic()) {
            Time::parse(&format!("1{time_part}"))?
        } else {
            Time::parse(time_part)?
        };
        if time.seconds() <= 0.0 {
            return Err(units_error(literal, "time must be positive"));
        }
        Ok(Self { memory, time })
    }

    /// Bytes per second
    #[must_use]
    pub fn bytes_per_second(&self) -> f64 {
        self.memory.bytes() as f64 / self.time.seconds()
    }
}

impl FromStr for Bandwidth {
    type Err = RuCubeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.memory, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_literals() {
        assert_eq!(Memory::parse("100").unwrap().bytes(), 100);
        assert_eq!(Memory::parse("10b").unwrap().bytes(), 10);
        assert_eq!(Memory::parse("2k").unwrap().bytes(), 2048);
        assert_eq!(Memory::parse("100mb").unwrap().bytes(), 100 * 1024 * 1024);
        assert_eq!(
            Memory::parse("1.5gb").unwrap().bytes(),
            3 * 512 * 1024 * 1024
        );
        assert_eq!(Memory::parse("1T").unwrap().bytes(), 1024_u64.pow(4));
        assert_eq!(Memory::parse("1pb").unwrap().bytes(), 1024_u64.pow(5));
        assert!(Memory::parse("12xb").is_err());
        assert!(Memory::parse("gb").is_err());
    }

    #[test]
    fn test_memory_display() {
        assert_eq!(Memory::from_bytes(2 * 1024 * 1024).to_string(), "2mb");
        assert_eq!(Memory::from_bytes(1000).to_string(), "1000b");
        assert_eq!(Memory::from_bytes(0).to_string(), "0b");
    }

    #[test]
    fn test_time_literals() {
        assert_eq!(Time::parse("30s").unwrap().seconds(), 30.0);
        assert_eq!(Time::parse("2m").unwrap().seconds(), 120.0);
        assert_eq!(Time::parse("1.5h").unwrap().seconds(), 5400.0);
        assert_eq!(Time::parse("1d").unwrap().seconds(), 86_400.0);
        assert_eq!(Time::parse("1w").unwrap().seconds(), 604_800.0);
        assert!(Time::parse("3y").is_err());
    }

    #[test]
    fn test_bandwidth_literals() {
        let bw = Bandwidth::parse("100mb/s").unwrap();
        assert_eq!(bw.bytes_per_second(), 100.0 * 1024.0 * 1024.0);
        let bw = Bandwidth::parse("1gb/2m").unwrap();
        assert_eq!(bw.bytes_per_second(), 1024.0 * 1024.0 * 1024.0 / 120.0);
        assert!(Bandwidth::parse("100mb").is_err());
        assert!(Bandwidth::parse("1gb/0s").is_err());
    }
}
