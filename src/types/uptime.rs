// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device uptime.
//!
//! The firmware reports uptime in milliseconds (`uptime_ms`). The library
//! tracks whole seconds and renders them as `"Xd HH:MM:SS"`.
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::types::Uptime;
//!
//! let uptime = Uptime::from_millis(93_784_000);
//! assert_eq!(uptime.as_secs(), 93_784);
//! assert_eq!(uptime.to_string(), "1d 02:03:04");
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: u64 = 86_400;

/// Whole seconds since the device booted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Uptime(u64);

impl Uptime {
    /// Creates an uptime from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Creates an uptime from the firmware's millisecond counter.
    ///
    /// Sub-second remainders are truncated.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis / 1000)
    }

    /// Returns the uptime in whole seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Returns the uptime as a [`Duration`].
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / SECS_PER_DAY;
        let rem = self.0 % SECS_PER_DAY;
        let hours = rem / 3600;
        let minutes = (rem % 3600) / 60;
        let seconds = rem % 60;
        write!(f, "{days}d {hours:02}:{minutes:02}:{seconds:02}")
    }
}
