// Copyright (C) 2015-2025 The Neo Project.
//
// fixed8.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Fixed-point amounts with eight decimal places.

use crate::{CoreError, Result};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use std::fmt;
use std::iter::Sum;
use std::ops::Neg;

/// Scale factor: one whole unit is 10^8 fractional units.
pub const FIXED8_DECIMALS: i64 = 100_000_000;

/// A signed fixed-point amount with 10^-8 precision.
///
/// All arithmetic is checked; overflow is an error, never a wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed8(i64);

impl Fixed8 {
    /// Zero.
    pub const ZERO: Fixed8 = Fixed8(0);

    /// Wraps a raw value counted in 10^-8 units.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Converts a whole-unit amount.
    pub fn from_int(value: i64) -> Result<Self> {
        value
            .checked_mul(FIXED8_DECIMALS)
            .map(Self)
            .ok_or(CoreError::Overflow("from_int"))
    }

    /// Returns the raw value in 10^-8 units.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Returns the whole-unit part, truncating the fraction.
    pub fn to_int(self) -> i64 {
        self.0 / FIXED8_DECIMALS
    }

    /// Checked addition.
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(CoreError::Overflow("add"))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(CoreError::Overflow("sub"))
    }

    /// Checked multiplication by an integer factor.
    pub fn checked_mul(self, factor: i64) -> Result<Self> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(CoreError::Overflow("mul"))
    }

    /// Checked division by an integer divisor.
    pub fn checked_div(self, divisor: i64) -> Result<Self> {
        self.0
            .checked_div(divisor)
            .map(Self)
            .ok_or(CoreError::Overflow("div"))
    }

    /// Indicates a strictly negative amount.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Neg for Fixed8 {
    type Output = Fixed8;

    fn neg(self) -> Fixed8 {
        Fixed8(-self.0)
    }
}

impl Sum for Fixed8 {
    fn sum<I: Iterator<Item = Fixed8>>(iter: I) -> Fixed8 {
        iter.fold(Fixed8::ZERO, |acc, x| {
            Fixed8(acc.0.saturating_add(x.0))
        })
    }
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / FIXED8_DECIMALS as u64;
        let frac = abs % FIXED8_DECIMALS as u64;
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let frac = format!("{frac:08}");
            write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
        }
    }
}

impl Serializable for Fixed8 {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.0);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self(reader.read_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Fixed8::from_raw(123_450_000_000).to_string(), "1234.5");
        assert_eq!(Fixed8::from_int(7).unwrap().to_string(), "7");
        assert_eq!(Fixed8::from_raw(-1).to_string(), "-0.00000001");
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let max = Fixed8::from_raw(i64::MAX);
        assert!(max.checked_add(Fixed8::from_raw(1)).is_err());
        assert!(Fixed8::from_int(i64::MAX / 2).is_err());
        assert_eq!(
            Fixed8::from_int(2)
                .unwrap()
                .checked_mul(3)
                .unwrap()
                .to_int(),
            6
        );
    }

    #[test]
    fn serialization_is_raw_little_endian() {
        let amount = Fixed8::from_raw(0x0102_0304);
        let bytes = neo_io::to_vec(&amount).unwrap();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0]);
        let back: Fixed8 = neo_io::from_slice(&bytes).unwrap();
        assert_eq!(back, amount);
    }
}
