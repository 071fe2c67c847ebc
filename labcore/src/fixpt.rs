// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Saturating fixed point numbers with 8 fractional bits.
//!
//! [Fixpt] is Q8.8 in 16 bits and holds controller gains.
//! [BigFixpt] is Q16.8 in 24 bits and holds encoder deviations
//! and the products of gain and deviation.

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Fixpt(i16);

#[macro_export]
macro_rules! fixpt {
    ($numerator:literal / $denominator:literal) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:literal) => {
        $crate::fixpt::Fixpt::from_int($numerator)
    };
}

impl Fixpt {
    pub const SHIFT: usize = 8;

    pub const fn from_int(int: i8) -> Self {
        Self((int as i16) << Self::SHIFT)
    }

    pub const fn from_fraction(numerator: i16, denominator: i16) -> Self {
        let mut q: i32 = 1 << Self::SHIFT;
        q *= numerator as i32;
        q /= denominator as i32;
        Self::from_q_sat(q)
    }

    const fn from_q_sat(v: i32) -> Self {
        if v < i16::MIN as i32 {
            Self(i16::MIN)
        } else if v > i16::MAX as i32 {
            Self(i16::MAX)
        } else {
            Self(v as i16)
        }
    }

    pub const fn to_q(self) -> i16 {
        self.0
    }

    pub const fn upgrade(self) -> BigFixpt {
        BigFixpt(self.0 as i32)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct BigFixpt(i32);

impl BigFixpt {
    pub const SHIFT: usize = Fixpt::SHIFT;

    const MIN_Q: i64 = -0x80_0000;
    const MAX_Q: i64 = 0x7F_FFFF;

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Saturates outside of the 16 bit integer range.
    pub const fn from_int(int: i32) -> Self {
        Self::from_q_sat((int as i64) << Self::SHIFT)
    }

    const fn from_q_sat(q: i64) -> Self {
        if q < Self::MIN_Q {
            Self(Self::MIN_Q as i32)
        } else if q > Self::MAX_Q {
            Self(Self::MAX_Q as i32)
        } else {
            Self(q as i32)
        }
    }

    /// Rounds towards negative infinity.
    pub const fn to_int(self) -> i32 {
        self.0 >> Self::SHIFT
    }

    pub const fn add(self, other: Self) -> Self {
        Self::from_q_sat(self.0 as i64 + other.0 as i64)
    }

    pub const fn sub(self, other: Self) -> Self {
        Self::from_q_sat(self.0 as i64 - other.0 as i64)
    }

    pub const fn mul(self, other: Self) -> Self {
        let prod = (self.0 as i64 * other.0 as i64) >> Self::SHIFT;
        Self::from_q_sat(prod)
    }
}

impl core::ops::Add for BigFixpt {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        BigFixpt::add(self, other)
    }
}

impl core::ops::Sub for BigFixpt {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        BigFixpt::sub(self, other)
    }
}

impl core::ops::Mul for BigFixpt {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        BigFixpt::mul(self, other)
    }
}

impl core::ops::Mul<Fixpt> for BigFixpt {
    type Output = BigFixpt;

    fn mul(self, other: Fixpt) -> BigFixpt {
        self * other.upgrade()
    }
}

impl core::ops::Mul<BigFixpt> for Fixpt {
    type Output = BigFixpt;

    fn mul(self, other: BigFixpt) -> BigFixpt {
        self.upgrade() * other
    }
}


// vim: ts=4 sw=4 expandtab
