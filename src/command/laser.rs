// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Laser output commands.

use crate::command::Command;
use crate::types::{Brightness, PowerState};

/// Command controlling the laser output.
///
/// # Examples
///
/// ```
/// use laserctl_lib::command::{Command, LaserCommand};
/// use laserctl_lib::types::{Brightness, PowerState};
///
/// let on = LaserCommand::on();
/// assert_eq!(on.name(), "LASER_ON");
/// assert_eq!(on.payload(), None);
///
/// let pwm = LaserCommand::brightness(Brightness::new(55).unwrap());
/// assert_eq!(pwm.to_line(), "SET_LASER_PWM:55");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaserCommand {
    /// Switch the laser on or off.
    Power(PowerState),
    /// Set the PWM level.
    SetBrightness(Brightness),
}

impl LaserCommand {
    /// Creates a command to switch the laser on.
    #[must_use]
    pub const fn on() -> Self {
        Self::Power(PowerState::On)
    }

    /// Creates a command to switch the laser off.
    #[must_use]
    pub const fn off() -> Self {
        Self::Power(PowerState::Off)
    }

    /// Creates a command to set the brightness.
    #[must_use]
    pub const fn brightness(level: Brightness) -> Self {
        Self::SetBrightness(level)
    }
}

impl Command for LaserCommand {
    fn name(&self) -> String {
        match self {
            Self::Power(PowerState::On) => "LASER_ON".to_string(),
            Self::Power(PowerState::Off) => "LASER_OFF".to_string(),
            Self::SetBrightness(_) => "SET_LASER_PWM".to_string(),
        }
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Power(_) => None,
            Self::SetBrightness(level) => Some(level.value().to_string()),
        }
    }
}
