// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Laser device command definitions.
//!
//! Commands are plain ASCII lines terminated by `\n`.
//!
//! # Available Commands
//!
//! | Command Type | Wire form | Purpose |
//! |-------------|-----------|---------|
//! | [`LaserCommand::Power`] | `LASER_ON` / `LASER_OFF` | Switch the laser output |
//! | [`LaserCommand::SetBrightness`] | `SET_LASER_PWM:<0-100>` | Set the PWM level |
//! | [`QueryCommand::InitialState`] | `GET_INITIAL_STATE` | Request a full `initial_state` report |
//! | [`QueryCommand::Status`] | `STATUS` | Request a `status` report |
//!
//! # Command Structure
//!
//! Each command consists of a name and an optional payload joined by `:`.
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::command::{Command, LaserCommand};
//! use laserctl_lib::types::Brightness;
//!
//! let cmd = LaserCommand::SetBrightness(Brightness::new(30).unwrap());
//! assert_eq!(cmd.name(), "SET_LASER_PWM");
//! assert_eq!(cmd.payload(), Some("30".to_string()));
//! assert_eq!(cmd.to_line(), "SET_LASER_PWM:30");
//! ```

mod laser;
mod query;

pub use laser::LaserCommand;
pub use query::QueryCommand;

/// Separator between command name and payload.
pub const PAYLOAD_SEPARATOR: char = ':';

/// A command that can be sent to the laser device.
pub trait Command {
    /// Returns the command name, e.g. `"LASER_ON"` or `"SET_LASER_PWM"`.
    fn name(&self) -> String;

    /// Returns the command payload, if any.
    fn payload(&self) -> Option<String>;

    /// Returns the command line without terminator.
    ///
    /// Format: `<name>:<payload>` or just `<name>` if no payload.
    fn to_line(&self) -> String {
        match self.payload() {
            Some(p) => format!("{}{PAYLOAD_SEPARATOR}{p}", self.name()),
            None => self.name(),
        }
    }

    /// Returns the bytes written to the wire, terminator included.
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_line().into_bytes();
        bytes.push(b'\n');
        bytes
    }
}
