// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of the controller's transport session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session is open.
    #[default]
    Disconnected,
    /// A port is being selected and opened.
    Connecting,
    /// The session is open and the read loop is running.
    Connected,
}

impl ConnectionState {
    /// Returns true if the session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if no session is open.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disconnected() {
        assert!(ConnectionState::default().is_disconnected());
        assert!(!ConnectionState::default().is_connected());
    }

    #[test]
    fn display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
