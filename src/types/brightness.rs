// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for laser output control.
//!
//! This module provides a type-safe representation of the laser PWM level,
//! ensuring values are always within the valid range of 0-100%.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Laser brightness as a percentage (0-100).
///
/// The firmware maps this value onto its PWM duty cycle, where 0 is dark and
/// 100 is full output.
///
/// # Examples
///
/// ```
/// use laserctl_lib::types::Brightness;
///
/// let level = Brightness::new(75).unwrap();
/// assert_eq!(level.value(), 75);
///
/// // Device reports are clamped rather than rejected
/// assert_eq!(Brightness::clamped(250).value(), 100);
/// assert_eq!(Brightness::clamped(-5).value(), 0);
///
/// assert!(Brightness::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Brightness(u8);

impl Brightness {
    /// Minimum brightness (0%).
    pub const MIN: Self = Self(0);

    /// Maximum brightness (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new brightness value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a brightness value, clamping any integer into `[0, 100]`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // Safe: value is clamped into 0..=100 before narrowing
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = value.clamp(0, 100) as u8;
        Self(v)
    }

    /// Returns the brightness percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the absolute difference to another brightness, in points.
    #[must_use]
    pub const fn distance(&self, other: Self) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Brightness {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_valid_values() {
        for v in 0..=100 {
            assert_eq!(Brightness::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn brightness_invalid_value() {
        assert_eq!(
            Brightness::new(101),
            Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: 101
            })
        );
    }

    #[test]
    fn brightness_clamped() {
        assert_eq!(Brightness::clamped(50).value(), 50);
        assert_eq!(Brightness::clamped(150).value(), 100);
        assert_eq!(Brightness::clamped(-1).value(), 0);
        assert_eq!(Brightness::clamped(i64::MAX).value(), 100);
    }

    #[test]
    fn brightness_distance() {
        let a = Brightness::clamped(50);
        assert_eq!(a.distance(Brightness::clamped(52)), 2);
        assert_eq!(a.distance(Brightness::clamped(10)), 40);
    }

    #[test]
    fn brightness_display() {
        assert_eq!(Brightness::clamped(75).to_string(), "75%");
    }

    #[test]
    fn brightness_serializes_as_number() {
        let json = serde_json::to_string(&Brightness::clamped(42)).unwrap();
        assert_eq!(json, "42");
    }
}
