// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller event types.

use crate::state::{ConnectionState, DeviceState, StateChange};

use super::{LogEntry, SessionId};

/// Events emitted by the laser controller.
///
/// # Examples
///
/// ```
/// use laserctl_lib::event::{ControllerEvent, SessionId};
///
/// let session = SessionId::new();
/// let event = ControllerEvent::connected(session);
/// assert!(event.is_connection());
/// assert_eq!(event.session_id(), Some(session));
/// ```
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The connection state changed.
    ConnectionChanged {
        /// The session the transition belongs to, if one was created.
        session_id: Option<SessionId>,
        /// The new connection state.
        state: ConnectionState,
        /// Why the connection failed or ended, if it was not requested.
        error: Option<String>,
    },

    /// The device state changed.
    StateChanged {
        /// The specific change that occurred.
        change: StateChange,
        /// The complete new state.
        new_state: DeviceState,
    },

    /// An entry was appended to the activity log.
    LogAppended(LogEntry),
}

impl ControllerEvent {
    /// Returns the session id carried by connection events.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::ConnectionChanged { session_id, .. } => *session_id,
            Self::StateChanged { .. } | Self::LogAppended(_) => None,
        }
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Creates a connecting event.
    #[must_use]
    pub fn connecting() -> Self {
        Self::ConnectionChanged {
            session_id: None,
            state: ConnectionState::Connecting,
            error: None,
        }
    }

    /// Creates a connected event.
    #[must_use]
    pub fn connected(session_id: SessionId) -> Self {
        Self::ConnectionChanged {
            session_id: Some(session_id),
            state: ConnectionState::Connected,
            error: None,
        }
    }

    /// Creates a disconnected event.
    #[must_use]
    pub fn disconnected(session_id: Option<SessionId>, error: Option<String>) -> Self {
        Self::ConnectionChanged {
            session_id,
            state: ConnectionState::Disconnected,
            error,
        }
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(change: StateChange, new_state: DeviceState) -> Self {
        Self::StateChanged { change, new_state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogCategory;
    use crate::types::PowerState;

    #[test]
    fn connection_events() {
        assert!(ControllerEvent::connecting().is_connection());
        assert!(ControllerEvent::connecting().session_id().is_none());

        let event = ControllerEvent::disconnected(None, Some("device removed".to_string()));
        if let ControllerEvent::ConnectionChanged { state, error, .. } = event {
            assert_eq!(state, ConnectionState::Disconnected);
            assert_eq!(error.as_deref(), Some("device removed"));
        } else {
            panic!("Expected ConnectionChanged event");
        }
    }

    #[test]
    fn state_change_events() {
        let event = ControllerEvent::state_changed(
            StateChange::Power(PowerState::On),
            DeviceState::new(),
        );
        assert!(event.is_state_change());
        assert!(!event.is_connection());
        assert!(event.session_id().is_none());
    }

    #[test]
    fn log_events() {
        let event = ControllerEvent::LogAppended(LogEntry::new("hi", LogCategory::Info));
        assert!(!event.is_connection());
        assert!(!event.is_state_change());
    }
}
