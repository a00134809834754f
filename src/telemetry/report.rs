// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured (JSON) device reports.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::state::{StateUpdate, UpdateSource};
use crate::types::{Brightness, PowerState, Uptime};

/// Fields carried by `initial_state`, `status` and `heartbeat` reports.
///
/// Every field is optional; an absent field means "unchanged".
///
/// # Examples
///
/// ```
/// use laserctl_lib::telemetry::ReportFields;
///
/// let json = r#"{"laser_state":true,"laser_brightness":40,"uptime_ms":61000}"#;
/// let fields: ReportFields = serde_json::from_str(json).unwrap();
///
/// assert_eq!(fields.brightness().map(|b| b.value()), Some(40));
/// assert_eq!(fields.uptime().map(|u| u.as_secs()), Some(61));
/// assert!(fields.version.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportFields {
    /// Laser output on/off.
    #[serde(default)]
    pub laser_state: Option<bool>,

    /// Laser brightness in percent. Out-of-range values are clamped.
    #[serde(default)]
    pub laser_brightness: Option<i64>,

    /// Firmware version string.
    #[serde(default)]
    pub version: Option<String>,

    /// Device uptime in milliseconds.
    #[serde(default)]
    pub uptime_ms: Option<u64>,

    /// Free heap in bytes.
    #[serde(default)]
    pub free_heap_bytes: Option<u64>,
}

impl ReportFields {
    /// Returns the reported power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.laser_state.map(PowerState::from)
    }

    /// Returns the reported brightness, clamped to 0-100.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.laser_brightness.map(Brightness::clamped)
    }

    /// Returns the reported uptime.
    #[must_use]
    pub fn uptime(&self) -> Option<Uptime> {
        self.uptime_ms.map(Uptime::from_millis)
    }

    /// Converts the fields into a state update tagged with `source`.
    #[must_use]
    pub fn to_update(&self, source: UpdateSource) -> StateUpdate {
        let mut update = StateUpdate::new(source);
        update.power = self.power();
        update.brightness = self.brightness();
        update.firmware_version.clone_from(&self.version);
        update.uptime = self.uptime();
        update.free_heap_bytes = self.free_heap_bytes;
        update
    }
}

/// A structured message, classified by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceReport {
    /// One-time full-state hydration answering `GET_INITIAL_STATE`.
    InitialState(ReportFields),

    /// Status report, pushed or answering `STATUS`.
    Status(ReportFields),

    /// Periodic heartbeat.
    Heartbeat(ReportFields),

    /// An object with a missing or unknown `type`. Logged, never applied.
    Unrecognized {
        /// The `type` value, if it was a string.
        kind: Option<String>,
        /// The whole message.
        payload: Value,
    },
}

impl DeviceReport {
    /// Classifies a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if a recognised report carries a field of
    /// the wrong type (e.g. `"laser_brightness":"high"`).
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);

        let build: fn(ReportFields) -> Self = match kind.as_deref() {
            Some("initial_state") => Self::InitialState,
            Some("status") => Self::Status,
            Some("heartbeat") => Self::Heartbeat,
            _ => {
                return Ok(Self::Unrecognized {
                    kind,
                    payload: value,
                });
            }
        };

        let fields: ReportFields = serde_json::from_value(value)?;
        Ok(build(fields))
    }

    /// Returns the `type` string of this report.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::InitialState(_) => Some("initial_state"),
            Self::Status(_) => Some("status"),
            Self::Heartbeat(_) => Some("heartbeat"),
            Self::Unrecognized { kind, .. } => kind.as_deref(),
        }
    }

    /// Returns the report fields, or `None` for unrecognised reports.
    #[must_use]
    pub fn fields(&self) -> Option<&ReportFields> {
        match self {
            Self::InitialState(fields) | Self::Status(fields) | Self::Heartbeat(fields) => {
                Some(fields)
            }
            Self::Unrecognized { .. } => None,
        }
    }

    /// Returns the update source matching this report kind.
    #[must_use]
    pub fn source(&self) -> Option<UpdateSource> {
        match self {
            Self::InitialState(_) => Some(UpdateSource::InitialState),
            Self::Status(_) => Some(UpdateSource::Status),
            Self::Heartbeat(_) => Some(UpdateSource::Heartbeat),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Converts the report into a state update.
    ///
    /// Unrecognised reports produce no update.
    #[must_use]
    pub fn to_update(&self) -> Option<StateUpdate> {
        let source = self.source()?;
        self.fields().map(|fields| fields.to_update(source))
    }
}
