//! Positional option values and their loose comparisons.
//!
//! Options arrive from stored column settings, so a flag may be the number
//! `1` or the string `"1"`. Comparisons treat a numeric string as the number
//! it spells and fall back to text comparison otherwise. Numeric strings may
//! carry surrounding whitespace, a sign, a fraction, and an exponent, so
//! `" 1 "`, `"+1"`, `"1.0"`, and `"1e0"` all equal `1`. Only strings whose
//! value is a whole number in `i64` range take part in numeric comparison;
//! `"1.5"` is compared as text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single positional option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// An integer value.
    Int(i64),
    /// A string value.
    Str(String),
}

impl OptionValue {
    /// The empty string, which callers use to mean "not set".
    #[must_use]
    pub const fn empty() -> Self {
        Self::Str(String::new())
    }

    /// Whether this is the empty string.
    #[must_use]
    pub fn is_empty_str(&self) -> bool {
        matches!(self, Self::Str(text) if text.is_empty())
    }

    /// Compare with another value using the loose rules described above.
    #[must_use]
    pub fn loosely_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(lhs), Self::Int(rhs)) => lhs == rhs,
            (Self::Int(number), Self::Str(text)) | (Self::Str(text), Self::Int(number)) => {
                integral_value(text) == Some(*number)
            }
            (Self::Str(lhs), Self::Str(rhs)) => match (integral_value(lhs), integral_value(rhs)) {
                (Some(lhs_number), Some(rhs_number)) => lhs_number == rhs_number,
                _ => lhs == rhs,
            },
        }
    }

    /// Loosely compare with an integer.
    #[must_use]
    pub fn loosely_eq_int(&self, number: i64) -> bool {
        self.loosely_eq(&Self::Int(number))
    }

    /// Loosely compare with a string.
    #[must_use]
    pub fn loosely_eq_str(&self, text: &str) -> bool {
        self.loosely_eq(&Self::Str(text.to_owned()))
    }

    /// Interpret the value as a registry index.
    ///
    /// Integers must be non-negative. Strings must be canonical decimal
    /// integers: `"2"` selects index 2, while `"02"` and `" 2"` select
    /// nothing.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Int(number) => usize::try_from(*number).ok(),
            Self::Str(text) => {
                let index: usize = text.parse().ok()?;
                (index.to_string() == *text).then_some(index)
            }
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(number) => write!(f, "{number}"),
            Self::Str(text) => f.write_str(text),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(number: i64) -> Self {
        Self::Int(number)
    }
}

impl From<&str> for OptionValue {
    fn from(text: &str) -> Self {
        Self::Str(text.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(text: String) -> Self {
        Self::Str(text)
    }
}

/// Whitespace allowed around a numeric string.
const NUMERIC_PADDING: [char; 6] = [' ', '\t', '\n', '\r', '\x0b', '\x0c'];

/// Integral value of a numeric string, if it spells one.
fn integral_value(text: &str) -> Option<i64> {
    let trimmed = text.trim_matches(NUMERIC_PADDING);
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent_value(exponent)?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{whole}{fraction}");
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(0);
    }
    let shift = exponent.checked_sub(i64::try_from(fraction.len()).ok()?)?;
    let magnitude = if shift >= 0 {
        let zeros = usize::try_from(shift).ok()?;
        if significant.len().checked_add(zeros)? > MAX_I64_DIGITS {
            return None;
        }
        format!("{significant}{}", "0".repeat(zeros))
    } else {
        let dropped = usize::try_from(shift.unsigned_abs()).ok()?;
        let kept = significant.len().checked_sub(dropped)?;
        let (head, tail) = significant.split_at_checked(kept)?;
        if head.is_empty() || !tail.chars().all(|ch| ch == '0') {
            return None;
        }
        head.to_owned()
    };
    format!("{sign}{magnitude}").parse().ok()
}

/// Digits in `i64::MAX`.
const MAX_I64_DIGITS: usize = 19;

fn exponent_value(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
