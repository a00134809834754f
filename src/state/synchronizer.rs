// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging device reports into the canonical state.

use crate::types::Brightness;

use super::device_state::UNKNOWN_FIRMWARE;
use super::{DeviceState, StateChange, StateUpdate};

/// Default number of brightness points a periodic report must differ by
/// before it overrides an initialized brightness.
pub const DEFAULT_HEARTBEAT_THRESHOLD: u8 = 2;

/// Owner of the [`DeviceState`], applying precedence rules to decoded updates.
///
/// - Power is always taken from the device.
/// - The first reported brightness of a connection is always accepted.
///   Afterwards, `status`/`heartbeat` reports only override it when they
///   differ by more than the threshold, so a push that races a local slider
///   change does not snap the value back. Every other source is applied as is.
/// - Firmware and free heap are last-writer-wins.
/// - Uptime only moves forward within a connection. The first uptime after
///   a (re)connect is taken as is; a lower value after that is rejected.
///
/// # Examples
///
/// ```
/// use laserctl_lib::state::{StateSynchronizer, StateUpdate, UpdateSource};
/// use laserctl_lib::types::Brightness;
///
/// let mut sync = StateSynchronizer::new();
/// sync.apply(&StateUpdate::new(UpdateSource::InitialState)
///     .with_brightness(Brightness::clamped(50)));
///
/// // Small heartbeat deltas are ignored
/// sync.apply(&StateUpdate::new(UpdateSource::Heartbeat)
///     .with_brightness(Brightness::clamped(51)));
/// assert_eq!(sync.state().brightness().value(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct StateSynchronizer {
    state: DeviceState,
    heartbeat_threshold: u8,
    uptime_seen: bool,
}

impl Default for StateSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSynchronizer {
    /// Creates a synchronizer with default state and threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_HEARTBEAT_THRESHOLD)
    }

    /// Creates a synchronizer with a custom periodic-update threshold.
    #[must_use]
    pub fn with_threshold(heartbeat_threshold: u8) -> Self {
        Self {
            state: DeviceState::new(),
            heartbeat_threshold,
            uptime_seen: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Returns the periodic-update threshold.
    #[must_use]
    pub fn heartbeat_threshold(&self) -> u8 {
        self.heartbeat_threshold
    }

    /// Merges a decoded update and returns the changes that were applied.
    pub fn apply(&mut self, update: &StateUpdate) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if let Some(power) = update.power {
            self.push(&mut changes, StateChange::Power(power));
        }

        if let Some(level) = update.brightness {
            self.merge_brightness(update, level, &mut changes);
        }

        if let Some(version) = &update.firmware_version {
            self.push(&mut changes, StateChange::FirmwareVersion(version.clone()));
        }

        if let Some(uptime) = update.uptime {
            if self.uptime_seen && uptime < self.state.uptime() {
                tracing::warn!(
                    source = ?update.source,
                    current = self.state.uptime_seconds(),
                    reported = uptime.as_secs(),
                    "Rejected uptime lower than the current value"
                );
            } else {
                self.uptime_seen = true;
                self.push(&mut changes, StateChange::Uptime(uptime));
            }
        }

        if let Some(bytes) = update.free_heap_bytes {
            self.push(&mut changes, StateChange::FreeHeap(bytes));
        }

        changes
    }

    fn merge_brightness(
        &mut self,
        update: &StateUpdate,
        level: Brightness,
        changes: &mut Vec<StateChange>,
    ) {
        if !self.state.brightness_initialized() {
            self.push(changes, StateChange::Brightness(level));
            self.push(changes, StateChange::BrightnessInitialized(true));
            return;
        }

        if update.source.is_periodic() {
            let delta = self.state.brightness().distance(level);
            if delta <= self.heartbeat_threshold {
                tracing::trace!(
                    source = ?update.source,
                    current = self.state.brightness().value(),
                    reported = level.value(),
                    "Suppressed small brightness delta"
                );
                return;
            }
        }

        self.push(changes, StateChange::Brightness(level));
    }

    /// Records a brightness chosen locally by the user.
    ///
    /// The value is shown immediately; the device confirms it later.
    pub fn apply_local_brightness(&mut self, level: Brightness) -> Option<StateChange> {
        let change = StateChange::Brightness(level);
        self.state.apply(&change).then_some(change)
    }

    /// Resets per-connection fields after the session closed.
    ///
    /// Power and brightness keep their last known values. The next uptime
    /// report is accepted whatever its value.
    pub fn reset_for_disconnect(&mut self) -> Vec<StateChange> {
        self.uptime_seen = false;
        let mut changes = Vec::new();
        self.push(&mut changes, StateChange::BrightnessInitialized(false));
        self.push(
            &mut changes,
            StateChange::FirmwareVersion(UNKNOWN_FIRMWARE.to_string()),
        );
        changes
    }

    fn push(&mut self, changes: &mut Vec<StateChange>, change: StateChange) {
        if self.state.apply(&change) {
            changes.push(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UpdateSource;
    use crate::types::{PowerState, Uptime};

    fn level(v: i64) -> Brightness {
        Brightness::clamped(v)
    }

    fn initialized_at(v: i64) -> StateSynchronizer {
        let mut sync = StateSynchronizer::new();
        sync.apply(&StateUpdate::new(UpdateSource::InitialState).with_brightness(level(v)));
        assert!(sync.state().brightness_initialized());
        sync
    }

    #[test]
    fn first_brightness_is_accepted_from_any_source() {
        let mut sync = StateSynchronizer::new();
        let changes =
            sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(51)));

        assert_eq!(sync.state().brightness().value(), 51);
        assert!(sync.state().brightness_initialized());
        assert!(changes.contains(&StateChange::BrightnessInitialized(true)));
    }

    #[test]
    fn heartbeat_small_delta_is_suppressed() {
        let mut sync = initialized_at(50);
        let changes =
            sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(51)));
        assert!(changes.is_empty());
        assert_eq!(sync.state().brightness().value(), 50);

        // Exactly the threshold is still suppressed
        sync.apply(&StateUpdate::new(UpdateSource::Status).with_brightness(level(52)));
        assert_eq!(sync.state().brightness().value(), 50);
    }

    #[test]
    fn heartbeat_large_delta_is_applied() {
        let mut sync = initialized_at(50);
        let changes =
            sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(10)));
        assert_eq!(changes, vec![StateChange::Brightness(level(10))]);
        assert_eq!(sync.state().brightness().value(), 10);
    }

    #[test]
    fn authoritative_sources_ignore_threshold() {
        for source in [
            UpdateSource::InitialState,
            UpdateSource::ManualStatus,
            UpdateSource::LoadedBrightness,
            UpdateSource::DeviceInitialized,
        ] {
            let mut sync = initialized_at(50);
            sync.apply(&StateUpdate::new(source).with_brightness(level(51)));
            assert_eq!(sync.state().brightness().value(), 51, "{source:?}");
        }
    }

    #[test]
    fn custom_threshold() {
        let mut sync = StateSynchronizer::with_threshold(10);
        sync.apply(&StateUpdate::new(UpdateSource::InitialState).with_brightness(level(50)));
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(58)));
        assert_eq!(sync.state().brightness().value(), 50);
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(61)));
        assert_eq!(sync.state().brightness().value(), 61);
    }

    #[test]
    fn power_is_always_overwritten() {
        let mut sync = initialized_at(50);
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_power(PowerState::On));
        assert_eq!(sync.state().power(), PowerState::On);
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_power(PowerState::Off));
        assert_eq!(sync.state().power(), PowerState::Off);
    }

    #[test]
    fn diagnostics_are_last_writer_wins() {
        let mut sync = StateSynchronizer::new();
        sync.apply(
            &StateUpdate::new(UpdateSource::Heartbeat)
                .with_firmware_version("v1.0")
                .with_uptime(Uptime::from_secs(100))
                .with_free_heap(2000),
        );
        sync.apply(
            &StateUpdate::new(UpdateSource::Status)
                .with_firmware_version("v1.1")
                .with_uptime(Uptime::from_secs(110))
                .with_free_heap(1500),
        );
        let state = sync.state();
        assert_eq!(state.firmware_version(), "v1.1");
        assert_eq!(state.uptime_seconds(), 110);
        assert_eq!(state.free_heap_bytes(), 1500);
    }

    #[test]
    fn uptime_never_goes_backwards_within_a_connection() {
        let mut sync = StateSynchronizer::new();
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_uptime(Uptime::from_secs(100)));

        let changes =
            sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_uptime(Uptime::from_secs(5)));
        assert!(changes.is_empty());
        assert_eq!(sync.state().uptime_seconds(), 100);

        // Authoritative sources are held to the same rule
        sync.apply(&StateUpdate::new(UpdateSource::InitialState).with_uptime(Uptime::from_secs(50)));
        assert_eq!(sync.state().uptime_seconds(), 100);

        sync.apply(&StateUpdate::new(UpdateSource::Status).with_uptime(Uptime::from_secs(101)));
        assert_eq!(sync.state().uptime_seconds(), 101);
    }

    #[test]
    fn first_uptime_after_reconnect_is_accepted() {
        let mut sync = StateSynchronizer::new();
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_uptime(Uptime::from_secs(3600)));
        sync.reset_for_disconnect();

        // The device rebooted while the host was away
        let changes =
            sync.apply(&StateUpdate::new(UpdateSource::InitialState).with_uptime(Uptime::from_secs(4)));
        assert_eq!(changes, vec![StateChange::Uptime(Uptime::from_secs(4))]);
        assert_eq!(sync.state().uptime_seconds(), 4);

        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_uptime(Uptime::from_secs(2)));
        assert_eq!(sync.state().uptime_seconds(), 4);
    }

    #[test]
    fn absent_fields_leave_state_unchanged() {
        let mut sync = initialized_at(40);
        sync.apply(&StateUpdate::new(UpdateSource::Status).with_power(PowerState::On));
        let changes = sync.apply(&StateUpdate::new(UpdateSource::Status));
        assert!(changes.is_empty());
        assert_eq!(sync.state().brightness().value(), 40);
        assert_eq!(sync.state().power(), PowerState::On);
    }

    #[test]
    fn disconnect_resets_only_connection_fields() {
        let mut sync = initialized_at(77);
        sync.apply(
            &StateUpdate::new(UpdateSource::Status)
                .with_power(PowerState::On)
                .with_firmware_version("v3.2"),
        );

        let changes = sync.reset_for_disconnect();
        assert_eq!(changes.len(), 2);

        let state = sync.state();
        assert!(!state.brightness_initialized());
        assert_eq!(state.firmware_version(), "Unknown");
        assert_eq!(state.power(), PowerState::On);
        assert_eq!(state.brightness().value(), 77);
    }

    #[test]
    fn local_brightness_then_heartbeat_echo() {
        let mut sync = initialized_at(50);
        assert!(sync.apply_local_brightness(level(80)).is_some());

        // A push within the threshold keeps the local value
        sync.apply(&StateUpdate::new(UpdateSource::Heartbeat).with_brightness(level(79)));
        assert_eq!(sync.state().brightness().value(), 80);

        assert!(sync.apply_local_brightness(level(80)).is_none());
    }
}
