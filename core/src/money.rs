//! Fixed-point money and quantities.
//!
//! Amounts are held in cents and quantities in hundredths, so pricing never
//! touches binary floating point. On the wire money is a decimal string with
//! exactly two places (`"60.00"`); input also accepts JSON numbers with at
//! most two fractional digits.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a decimal amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalParseError {
    /// Input was empty after trimming
    #[error("amount is empty")]
    Empty,
    /// Input was not a non-negative decimal number
    #[error("'{0}' is not a valid non-negative decimal")]
    Invalid(String),
    /// More than two digits after the decimal point
    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),
    /// Value does not fit in the fixed-point representation
    #[error("'{0}' is too large")]
    Overflow(String),
}

/// Parses a non-negative decimal with at most two fractional digits into
/// hundredths (`"12.5"` becomes `1250`).
fn parse_hundredths(input: &str) -> Result<u64, DecimalParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecimalParseError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(DecimalParseError::Invalid(trimmed.to_string()));
    }
    if fraction.len() > 2 {
        return Err(DecimalParseError::TooPrecise(trimmed.to_string()));
    }

    let overflow = || DecimalParseError::Overflow(trimmed.to_string());
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let fraction: u64 = match fraction.len() {
        0 => 0,
        1 => u64::from(fraction.as_bytes()[0] - b'0') * 10,
        _ => fraction.parse().map_err(|_| overflow())?,
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(overflow)
}

fn write_hundredths(f: &mut fmt::Formatter<'_>, value: u64) -> fmt::Result {
    write!(f, "{}.{:02}", value / 100, value % 100)
}

/// Represents money in cents to avoid floating-point arithmetic errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, clamping at the maximum representable value.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies a unit price by a quantity, rounding half-up to the cent.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: Quantity) -> Option<Self> {
        let product = u128::from(self.0) * u128::from(quantity.hundredths());
        let cents = (product + 50) / 100;
        u64::try_from(cents).ok().map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0)
    }
}

impl FromStr for Money {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Self)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(DecimalVisitor)
            .map(Self)
    }
}

/// A non-negative decimal quantity with two fractional digits (hundredths).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u64);

impl Quantity {
    /// Creates a quantity from hundredths (`150` is `1.50`).
    #[must_use]
    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    /// Returns the quantity in hundredths.
    #[must_use]
    pub const fn hundredths(&self) -> u64 {
        self.0
    }

    /// Checks if the quantity is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Number of digits in the integer part (`0.5` has one).
    #[must_use]
    pub const fn integer_digits(&self) -> u32 {
        let whole = self.0 / 100;
        match whole.checked_ilog10() {
            Some(log) => log + 1,
            None => 1,
        }
    }

    /// Reads a quantity from a JSON answer: a number or a numeric string.
    ///
    /// # Errors
    ///
    /// Returns [`DecimalParseError`] for negative, non-numeric or overly precise values.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, DecimalParseError> {
        match value {
            serde_json::Value::Number(n) => n.to_string().parse(),
            serde_json::Value::String(s) => s.parse(),
            other => Err(DecimalParseError::Invalid(other.to_string())),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0)
    }
}

impl FromStr for Quantity {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Self)
    }
}

/// Accepts decimal strings and JSON numbers, yielding hundredths.
struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal with at most two places")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        parse_hundredths(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        v.checked_mul(100)
            .ok_or_else(|| E::custom(DecimalParseError::Overflow(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(DecimalParseError::Invalid(v.to_string())))
            .and_then(|v| self.visit_u64(v))
    }

    // Float display is the shortest round-tripping form, so `45.5` reads back
    // as the string "45.5" and is parsed as text.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
        parse_hundredths(&v.to_string()).map_err(E::custom)
    }
}
