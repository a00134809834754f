// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::event::DEFAULT_LOG_CAPACITY;
use crate::protocol::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_CHUNK_SIZE, SerialConfig};
use crate::state::DEFAULT_HEARTBEAT_THRESHOLD;

/// Default quiet period before a brightness change is sent.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Configuration for a [`LaserController`](crate::LaserController).
///
/// Every field has a default matching the laser firmware, so a partial
/// document deserializes fine.
///
/// # Examples
///
/// ```
/// use laserctl_lib::ControllerConfig;
///
/// let config = ControllerConfig::default()
///     .with_debounce_ms(80)
///     .with_log_capacity(500);
/// assert!(config.validate().is_ok());
///
/// let config: ControllerConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
/// assert_eq!(config.debounce_ms, 250);
/// assert_eq!(config.serial.baud_rate, 115_200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial line parameters.
    pub serial: SerialConfig,
    /// Quiet period before a brightness change is sent, in milliseconds.
    pub debounce_ms: u64,
    /// Brightness points a `status`/`heartbeat` report must differ by before
    /// it overrides the current value.
    pub heartbeat_threshold: u8,
    /// Number of entries kept in the activity log.
    pub log_capacity: usize,
    /// Bytes requested per read.
    pub read_chunk_size: usize,
    /// Longest partial line kept while waiting for a terminator.
    pub max_line_length: usize,
    /// Send `GET_INITIAL_STATE` right after connecting.
    pub request_initial_state: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            heartbeat_threshold: DEFAULT_HEARTBEAT_THRESHOLD,
            log_capacity: DEFAULT_LOG_CAPACITY,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            request_initial_state: true,
        }
    }
}

impl ControllerConfig {
    /// Sets the serial line parameters.
    #[must_use]
    pub fn with_serial(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Sets the baud rate.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Sets the brightness debounce delay in milliseconds.
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Sets the periodic brightness threshold.
    #[must_use]
    pub fn with_heartbeat_threshold(mut self, threshold: u8) -> Self {
        self.heartbeat_threshold = threshold;
        self
    }

    /// Sets the activity log capacity.
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Sets the read chunk size.
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Sets the longest partial line kept by the frame reader.
    #[must_use]
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Enables or disables the `GET_INITIAL_STATE` request on connect.
    #[must_use]
    pub fn with_initial_state_request(mut self, enabled: bool) -> Self {
        self.request_initial_state = enabled;
        self
    }

    /// Returns the debounce delay.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a zero baud rate, log
    /// capacity, read chunk size or line length.
    pub fn validate(&self) -> Result<(), Error> {
        let zero = [
            ("serial.baud_rate", self.serial.baud_rate == 0),
            ("log_capacity", self.log_capacity == 0),
            ("read_chunk_size", self.read_chunk_size == 0),
            ("max_line_length", self.max_line_length == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(Error::InvalidConfiguration(format!(
                "{field} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}
