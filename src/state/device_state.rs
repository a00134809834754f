// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, PowerState, Uptime};

use super::StateChange;

/// Firmware version shown until the device reports one.
pub const UNKNOWN_FIRMWARE: &str = "Unknown";

/// Tracked state of the laser device.
///
/// Unlike a fresh read from hardware, every field always has a value: power
/// and brightness start at off/0 and keep their last known value across
/// disconnects, so a presentation layer always has something to display.
/// [`brightness_initialized`](Self::brightness_initialized) tells whether the
/// brightness has been confirmed by the device during the current connection.
///
/// # Examples
///
/// ```
/// use laserctl_lib::state::DeviceState;
///
/// let state = DeviceState::new();
/// assert_eq!(state.firmware_version(), "Unknown");
/// assert!(!state.brightness_initialized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    power: PowerState,
    brightness: Brightness,
    firmware_version: String,
    uptime: Uptime,
    free_heap_bytes: u64,
    brightness_initialized: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: PowerState::Off,
            brightness: Brightness::MIN,
            firmware_version: UNKNOWN_FIRMWARE.to_string(),
            uptime: Uptime::default(),
            free_heap_bytes: 0,
            brightness_initialized: false,
        }
    }
}

impl DeviceState {
    /// Creates a new device state with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the laser power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Gets the brightness level.
    #[must_use]
    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    /// Gets the firmware version, `"Unknown"` until reported.
    #[must_use]
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// Gets the device uptime.
    #[must_use]
    pub fn uptime(&self) -> Uptime {
        self.uptime
    }

    /// Gets the device uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime.as_secs()
    }

    /// Gets the free heap reported by the device, in bytes.
    #[must_use]
    pub fn free_heap_bytes(&self) -> u64 {
        self.free_heap_bytes
    }

    /// Returns `true` once the device has reported a brightness during the
    /// current connection.
    #[must_use]
    pub fn brightness_initialized(&self) -> bool {
        self.brightness_initialized
    }

    /// Applies a state change and returns whether the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Power(power) => replace(&mut self.power, *power),
            StateChange::Brightness(level) => replace(&mut self.brightness, *level),
            StateChange::BrightnessInitialized(flag) => {
                replace(&mut self.brightness_initialized, *flag)
            }
            StateChange::FirmwareVersion(version) => {
                if self.firmware_version == *version {
                    false
                } else {
                    self.firmware_version.clone_from(version);
                    true
                }
            }
            StateChange::Uptime(uptime) => replace(&mut self.uptime, *uptime),
            StateChange::FreeHeap(bytes) => replace(&mut self.free_heap_bytes, *bytes),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_defaults() {
        let state = DeviceState::new();
        assert_eq!(state.power(), PowerState::Off);
        assert_eq!(state.brightness(), Brightness::MIN);
        assert_eq!(state.firmware_version(), UNKNOWN_FIRMWARE);
        assert_eq!(state.uptime_seconds(), 0);
        assert_eq!(state.free_heap_bytes(), 0);
        assert!(!state.brightness_initialized());
    }

    #[test]
    fn apply_power_change() {
        let mut state = DeviceState::new();
        assert!(state.apply(&StateChange::Power(PowerState::On)));
        assert_eq!(state.power(), PowerState::On);

        // Applying same state returns false
        assert!(!state.apply(&StateChange::Power(PowerState::On)));
    }

    #[test]
    fn apply_firmware_change() {
        let mut state = DeviceState::new();
        assert!(state.apply(&StateChange::FirmwareVersion("v2.1".to_string())));
        assert_eq!(state.firmware_version(), "v2.1");
        assert!(!state.apply(&StateChange::FirmwareVersion("v2.1".to_string())));
    }

    #[test]
    fn apply_diagnostics() {
        let mut state = DeviceState::new();
        state.apply(&StateChange::Uptime(Uptime::from_secs(42)));
        state.apply(&StateChange::FreeHeap(180_000));
        assert_eq!(state.uptime_seconds(), 42);
        assert_eq!(state.free_heap_bytes(), 180_000);
    }

    #[test]
    fn serializes_for_presentation() {
        let json = serde_json::to_value(DeviceState::new()).unwrap();
        assert_eq!(json["firmware_version"], "Unknown");
        assert_eq!(json["brightness"], 0);
        assert_eq!(json["power"], "Off");
    }
}
