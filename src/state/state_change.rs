// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change and update representations.
//!
//! A [`StateUpdate`] is what the decoder extracted from one device line,
//! tagged with where it came from. The [`StateSynchronizer`](super::StateSynchronizer)
//! decides which parts of it to accept and reports each accepted field as a
//! [`StateChange`].
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::state::{DeviceState, StateChange};
//! use laserctl_lib::types::PowerState;
//!
//! let mut state = DeviceState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::Power(PowerState::On)));
//! assert!(!state.apply(&StateChange::Power(PowerState::On)));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, PowerState, Uptime};

/// A single accepted change to the device state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Laser power changed.
    Power(PowerState),

    /// Brightness level changed.
    Brightness(Brightness),

    /// The brightness-initialized flag changed.
    BrightnessInitialized(bool),

    /// Firmware version string changed.
    FirmwareVersion(String),

    /// Device uptime changed.
    Uptime(Uptime),

    /// Free heap memory changed.
    FreeHeap(u64),
}

impl StateChange {
    /// Returns `true` if this is a power state change.
    #[must_use]
    pub fn is_power(&self) -> bool {
        matches!(self, Self::Power(_))
    }

    /// Returns `true` if this is a brightness level change.
    #[must_use]
    pub fn is_brightness(&self) -> bool {
        matches!(self, Self::Brightness(_))
    }

    /// Returns `true` for housekeeping fields (firmware, uptime, heap).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Self::FirmwareVersion(_) | Self::Uptime(_) | Self::FreeHeap(_)
        )
    }
}

/// Origin of a decoded update, which decides how brightness is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateSource {
    /// Structured `initial_state` hydration.
    InitialState,
    /// Structured `status` reply.
    Status,
    /// Structured `heartbeat` push.
    Heartbeat,
    /// Legacy firmware version banner.
    FirmwareBanner,
    /// Legacy `Loaded brightness: NN%` line.
    LoadedBrightness,
    /// Legacy `Device initialized` banner.
    DeviceInitialized,
    /// Legacy manual status echo.
    ManualStatus,
}

impl UpdateSource {
    /// Returns `true` for sources whose brightness is delta-gated once the
    /// brightness has been initialized.
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Status | Self::Heartbeat)
    }
}

/// Fields extracted from one device line. `None` means "unchanged".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    /// Where the update came from.
    pub source: UpdateSource,
    /// Reported laser power.
    pub power: Option<PowerState>,
    /// Reported brightness (already clamped).
    pub brightness: Option<Brightness>,
    /// Reported firmware version.
    pub firmware_version: Option<String>,
    /// Reported uptime.
    pub uptime: Option<Uptime>,
    /// Reported free heap in bytes.
    pub free_heap_bytes: Option<u64>,
}

impl StateUpdate {
    /// Creates an empty update from the given source.
    #[must_use]
    pub fn new(source: UpdateSource) -> Self {
        Self {
            source,
            power: None,
            brightness: None,
            firmware_version: None,
            uptime: None,
            free_heap_bytes: None,
        }
    }

    /// Sets the reported power.
    #[must_use]
    pub fn with_power(mut self, power: PowerState) -> Self {
        self.power = Some(power);
        self
    }

    /// Sets the reported brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Sets the reported firmware version.
    #[must_use]
    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }

    /// Sets the reported uptime.
    #[must_use]
    pub fn with_uptime(mut self, uptime: Uptime) -> Self {
        self.uptime = Some(uptime);
        self
    }

    /// Sets the reported free heap.
    #[must_use]
    pub fn with_free_heap(mut self, bytes: u64) -> Self {
        self.free_heap_bytes = Some(bytes);
        self
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.power.is_none()
            && self.brightness.is_none()
            && self.firmware_version.is_none()
            && self.uptime.is_none()
            && self.free_heap_bytes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_classification() {
        assert!(StateChange::Power(PowerState::On).is_power());
        assert!(StateChange::Brightness(Brightness::MAX).is_brightness());
        assert!(StateChange::FreeHeap(1024).is_diagnostic());
        assert!(!StateChange::BrightnessInitialized(true).is_diagnostic());
    }

    #[test]
    fn periodic_sources() {
        assert!(UpdateSource::Heartbeat.is_periodic());
        assert!(UpdateSource::Status.is_periodic());
        assert!(!UpdateSource::InitialState.is_periodic());
        assert!(!UpdateSource::ManualStatus.is_periodic());
    }

    #[test]
    fn update_builder() {
        let update = StateUpdate::new(UpdateSource::Heartbeat)
            .with_power(PowerState::On)
            .with_free_heap(2048);
        assert_eq!(update.power, Some(PowerState::On));
        assert_eq!(update.free_heap_bytes, Some(2048));
        assert!(update.brightness.is_none());
        assert!(!update.is_empty());
        assert!(StateUpdate::new(UpdateSource::Status).is_empty());
    }
}
