// Copyright (c) 2024 Botho Foundation

//! Fixed-point decimal used for every rate in the control loop.
//!
//! `Dec` stores a signed value scaled by 10^18 in an `i128`. Multiplication
//! and division go through 256-bit intermediates and truncate toward zero,
//! so every node computes bit-identical results. The arithmetic operators
//! saturate at the representable bounds instead of panicking; division is
//! only offered as [`Dec::checked_quo`], which forces callers to handle a
//! zero divisor before it happens.
//!
//! The canonical text form always carries 18 fractional digits
//! (`8712.000000000000000000`). It is the form hashed into oracle votes, so
//! it must never change.

use displaydoc::Display;
use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};
use thiserror::Error;

/// Number of fractional decimal digits carried by [`Dec`].
pub const DEC_PRECISION: u32 = 18;

const SCALE: i128 = 1_000_000_000_000_000_000;

/// Signed 18-decimal fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(i128);

/// Errors produced when parsing a [`Dec`] from text.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ParseDecError {
    /// Empty decimal string
    Empty,

    /// Invalid character in decimal: {0}
    InvalidDigit(String),

    /// Too many fractional digits (max 18): {0}
    TooPrecise(String),

    /// Decimal out of range: {0}
    OutOfRange(String),
}

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(SCALE);

    /// Build from the raw scaled representation.
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// The raw scaled representation.
    pub const fn raw(self) -> i128 {
        self.0
    }

    pub const fn from_int(value: i64) -> Self {
        // |i64| × 10^18 always fits in i128.
        Self(value as i128 * SCALE)
    }

    pub const fn from_u64(value: u64) -> Self {
        Self(value as i128 * SCALE)
    }

    /// `value × 10^-prec`, e.g. `with_prec(67, 2)` is 0.67.
    pub fn with_prec(value: i64, prec: u32) -> Self {
        if prec <= DEC_PRECISION {
            Self((value as i128).saturating_mul(10i128.pow(DEC_PRECISION - prec)))
        } else {
            let shift = (prec - DEC_PRECISION).min(38);
            Self(value as i128 / 10i128.pow(shift))
        }
    }

    /// `num / den`, or `None` when `den` is zero.
    pub fn from_ratio(num: u64, den: u64) -> Option<Self> {
        Self::from_u64(num).checked_quo(Self::from_u64(den))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Bound `self` to `[lo, hi]`. Unlike `Ord::clamp` this never panics:
    /// an inverted range resolves to `hi`.
    pub fn clamp_to(self, lo: Dec, hi: Dec) -> Self {
        self.max(lo).min(hi)
    }

    /// Truncating multiplication, `None` on overflow.
    pub fn checked_mul(self, other: Dec) -> Option<Self> {
        let negative = self.is_negative() != other.is_negative();
        let magnitude = mul_div(self.0.unsigned_abs(), other.0.unsigned_abs(), SCALE as u128)?;
        signed(magnitude, negative)
    }

    /// Truncating division, `None` when `other` is zero or on overflow.
    pub fn checked_quo(self, other: Dec) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        let negative = self.is_negative() != other.is_negative();
        let magnitude = mul_div(self.0.unsigned_abs(), SCALE as u128, other.0.unsigned_abs())?;
        signed(magnitude, negative)
    }

    /// Integer part, truncated toward zero.
    pub fn truncate(self) -> i128 {
        self.0 / SCALE
    }

    /// Integer part as `u64`; negative values give zero, large values
    /// saturate.
    pub fn to_u64_trunc(self) -> u64 {
        if self.0 <= 0 {
            return 0;
        }
        u64::try_from(self.truncate()).unwrap_or(u64::MAX)
    }

    /// `trunc(self × amount)`, the way tax and reward shares are cut.
    pub fn mul_u64_trunc(self, amount: u64) -> u64 {
        if self.0 <= 0 {
            return 0;
        }
        mul_div(self.0 as u128, amount as u128, SCALE as u128)
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(u64::MAX)
    }
}

/// `a × b / c` in 256-bit precision, truncated. `None` if `c` is zero or the
/// result does not fit in 128 bits.
pub(crate) fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        return None;
    }
    Some(result.as_u128())
}

fn signed(magnitude: u128, negative: bool) -> Option<Dec> {
    let value = i128::try_from(magnitude).ok()?;
    Some(Dec(if negative { -value } else { value }))
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, rhs: Dec) -> Dec {
        Dec(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Dec {
    type Output = Dec;

    fn sub(self, rhs: Dec) -> Dec {
        Dec(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Dec {
    type Output = Dec;

    fn mul(self, rhs: Dec) -> Dec {
        self.checked_mul(rhs).unwrap_or_else(|| {
            if self.is_negative() != rhs.is_negative() {
                Dec(i128::MIN)
            } else {
                Dec(i128::MAX)
            }
        })
    }
}

impl Neg for Dec {
    type Output = Dec;

    fn neg(self) -> Dec {
        Dec(self.0.saturating_neg())
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        let int = magnitude / SCALE as u128;
        let frac = magnitude % SCALE as u128;
        write!(f, "{sign}{int}.{frac:018}")
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = ParseDecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseDecError::Empty);
        }

        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecError::InvalidDigit(s.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ParseDecError::InvalidDigit(s.to_string()));
        }
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(ParseDecError::TooPrecise(s.to_string()));
        }

        let int: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| ParseDecError::OutOfRange(s.to_string()))?
        };
        let frac: i128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<18}");
            padded
                .parse()
                .map_err(|_| ParseDecError::OutOfRange(s.to_string()))?
        };

        let raw = int
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| ParseDecError::OutOfRange(s.to_string()))?;
        Ok(Dec(if negative { -raw } else { raw }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_canonical_form() {
        assert_eq!(Dec::from_int(8712).to_string(), "8712.000000000000000000");
        assert_eq!(dec("-0.5").to_string(), "-0.500000000000000000");
        assert_eq!(Dec::ZERO.to_string(), "0.000000000000000000");
    }

    #[test]
    fn test_parse() {
        assert_eq!(dec("8712"), Dec::from_int(8712));
        assert_eq!(dec("0.67"), Dec::with_prec(67, 2));
        assert_eq!(dec(".5"), Dec::with_prec(5, 1));
        assert_eq!(dec("1."), Dec::ONE);
        assert!("".parse::<Dec>().is_err());
        assert!("1.2.3".parse::<Dec>().is_err());
        assert!("abc".parse::<Dec>().is_err());
        assert!(matches!(
            "0.0000000000000000001".parse::<Dec>(),
            Err(ParseDecError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_mul_truncates() {
        // 1/3 × 3 loses the last digit to truncation
        let third = Dec::from_ratio(1, 3).unwrap();
        assert_eq!(third * Dec::from_int(3), dec("0.999999999999999999"));
        assert_eq!(dec("1.07") * dec("0.001"), dec("0.00107"));
        assert_eq!(dec("-2") * dec("0.5"), dec("-1"));
    }

    #[test]
    fn test_quo() {
        assert_eq!(dec("1").checked_quo(dec("4")), Some(dec("0.25")));
        assert_eq!(dec("1").checked_quo(Dec::ZERO), None);
        assert_eq!(dec("-3").checked_quo(dec("2")), Some(dec("-1.5")));
    }

    #[test]
    fn test_operators_saturate() {
        let max = Dec::from_raw(i128::MAX);
        assert_eq!(max + Dec::ONE, max);
        assert_eq!(max * Dec::from_int(2), max);
        assert_eq!(-max * Dec::from_int(2), Dec::from_raw(i128::MIN));
    }

    #[test]
    fn test_mul_u64_trunc() {
        assert_eq!(dec("0.001").mul_u64_trunc(1_500), 1);
        assert_eq!(dec("0.5").mul_u64_trunc(3), 1);
        assert_eq!(dec("-0.5").mul_u64_trunc(3), 0);
        assert_eq!(Dec::from_int(2).mul_u64_trunc(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_clamp_to_never_panics() {
        assert_eq!(dec("5").clamp_to(Dec::ZERO, Dec::ONE), Dec::ONE);
        assert_eq!(dec("-5").clamp_to(Dec::ZERO, Dec::ONE), Dec::ZERO);
        assert_eq!(dec("0.5").clamp_to(Dec::ONE, Dec::ZERO), Dec::ZERO);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&dec("0.67")).unwrap();
        assert_eq!(json, "\"0.670000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dec("0.67"));
    }
}
