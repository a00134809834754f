// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State query commands.

use crate::command::Command;

/// Command asking the device to report its state.
///
/// # Examples
///
/// ```
/// use laserctl_lib::command::{Command, QueryCommand};
///
/// assert_eq!(QueryCommand::InitialState.to_line(), "GET_INITIAL_STATE");
/// assert_eq!(QueryCommand::Status.to_line(), "STATUS");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCommand {
    /// Answered once with an `initial_state` report.
    InitialState,
    /// Answered with a `status` report (or a legacy status echo).
    Status,
}

impl Command for QueryCommand {
    fn name(&self) -> String {
        match self {
            Self::InitialState => "GET_INITIAL_STATE".to_string(),
            Self::Status => "STATUS".to_string(),
        }
    }

    fn payload(&self) -> Option<String> {
        None
    }
}
