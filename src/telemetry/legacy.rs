// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pattern matching for the legacy free-form text protocol.
//!
//! Older firmware prints human-readable lines such as:
//!
//! ```text
//! Firmware version: v1.4.2
//! Loaded brightness: 40%
//! Device initialized - Brightness: 40%, Laser: OFF
//! USB connection established
//! Laser State: ON, Laser Brightness: 40%
//! ```
//!
//! Each matcher runs independently, so a single line can yield more than one
//! [`LegacyMatch`].

use std::sync::OnceLock;

use regex::Regex;

use crate::state::{StateUpdate, UpdateSource};
use crate::types::{Brightness, PowerState};

static FIRMWARE_LABEL: OnceLock<Regex> = OnceLock::new();
static FIRMWARE_TOKEN: OnceLock<Regex> = OnceLock::new();
static LOADED_BRIGHTNESS: OnceLock<Regex> = OnceLock::new();
static DEVICE_INITIALIZED: OnceLock<Regex> = OnceLock::new();
static BANNER_BRIGHTNESS: OnceLock<Regex> = OnceLock::new();
static BANNER_LASER: OnceLock<Regex> = OnceLock::new();
static CONNECTION_BANNER: OnceLock<Regex> = OnceLock::new();
static ECHO_STATE: OnceLock<Regex> = OnceLock::new();
static ECHO_BRIGHTNESS: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern"))
}

/// A legacy text pattern that matched a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyMatch {
    /// Firmware version marker.
    Firmware(String),

    /// `Loaded brightness: NN%`.
    LoadedBrightness(Brightness),

    /// `Device initialized` banner with brightness and power.
    DeviceInitialized {
        /// Reported brightness.
        brightness: Brightness,
        /// Reported laser power.
        power: PowerState,
    },

    /// Connection detection banner. Informational only.
    ConnectionBanner,

    /// Manual status echo with both laser state and brightness.
    ManualStatus {
        /// Reported laser power.
        power: PowerState,
        /// Reported brightness.
        brightness: Brightness,
    },
}

impl LegacyMatch {
    /// Converts the match into a state update.
    ///
    /// Returns `None` for matches that carry no state.
    #[must_use]
    pub fn to_update(&self) -> Option<StateUpdate> {
        match self {
            Self::Firmware(version) => Some(
                StateUpdate::new(UpdateSource::FirmwareBanner)
                    .with_firmware_version(version.clone()),
            ),
            Self::LoadedBrightness(level) => {
                Some(StateUpdate::new(UpdateSource::LoadedBrightness).with_brightness(*level))
            }
            Self::DeviceInitialized { brightness, power } => Some(
                StateUpdate::new(UpdateSource::DeviceInitialized)
                    .with_brightness(*brightness)
                    .with_power(*power),
            ),
            Self::ConnectionBanner => None,
            Self::ManualStatus { power, brightness } => Some(
                StateUpdate::new(UpdateSource::ManualStatus)
                    .with_power(*power)
                    .with_brightness(*brightness),
            ),
        }
    }

    /// Returns a short description for the event log.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Firmware(version) => format!("Firmware version: {version}"),
            Self::LoadedBrightness(level) => format!("Loaded brightness: {level}"),
            Self::DeviceInitialized { brightness, power } => {
                format!("Device initialized (brightness {brightness}, laser {power})")
            }
            Self::ConnectionBanner => "Device reported connection".to_string(),
            Self::ManualStatus { power, brightness } => {
                format!("Status: laser {power}, brightness {brightness}")
            }
        }
    }
}

/// Runs every legacy matcher against `line`, in order.
///
/// # Examples
///
/// ```
/// use laserctl_lib::telemetry::{LegacyMatch, match_legacy};
/// use laserctl_lib::types::{Brightness, PowerState};
///
/// let matches = match_legacy("Laser State: ON, Laser Brightness: 40%");
/// assert_eq!(
///     matches,
///     vec![LegacyMatch::ManualStatus {
///         power: PowerState::On,
///         brightness: Brightness::clamped(40),
///     }]
/// );
///
/// assert!(match_legacy("hello").is_empty());
/// ```
#[must_use]
pub fn match_legacy(line: &str) -> Vec<LegacyMatch> {
    [
        match_firmware(line),
        match_loaded_brightness(line),
        match_device_initialized(line),
        match_connection_banner(line),
        match_manual_status(line),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn match_firmware(line: &str) -> Option<LegacyMatch> {
    let labelled = regex(
        &FIRMWARE_LABEL,
        r"(?i)\b(?:firmware version|firmware|fw|version)\s*[:=]\s*([A-Za-z0-9._+-]+)",
    );
    if let Some(caps) = labelled.captures(line) {
        return Some(LegacyMatch::Firmware(caps[1].to_string()));
    }

    let token = regex(&FIRMWARE_TOKEN, r"\b(v\d+\.\d+(?:\.\d+)?)\b");
    token
        .captures(line)
        .map(|caps| LegacyMatch::Firmware(caps[1].to_string()))
}

fn match_loaded_brightness(line: &str) -> Option<LegacyMatch> {
    let re = regex(&LOADED_BRIGHTNESS, r"(?i)loaded brightness:\s*(\d{1,3})\s*%");
    let caps = re.captures(line)?;
    Some(LegacyMatch::LoadedBrightness(percent(&caps[1])?))
}

fn match_device_initialized(line: &str) -> Option<LegacyMatch> {
    if !regex(&DEVICE_INITIALIZED, r"(?i)device initialized").is_match(line) {
        return None;
    }
    let brightness = regex(&BANNER_BRIGHTNESS, r"(?i)\bbrightness:\s*(\d{1,3})\s*%")
        .captures(line)
        .and_then(|caps| percent(&caps[1]))?;
    let power = regex(&BANNER_LASER, r"(?i)\blaser:\s*(on|off)\b")
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())?;
    Some(LegacyMatch::DeviceInitialized { brightness, power })
}

fn match_connection_banner(line: &str) -> Option<LegacyMatch> {
    regex(
        &CONNECTION_BANNER,
        r"(?i)connection (?:established|detected)|usb connected",
    )
    .is_match(line)
    .then_some(LegacyMatch::ConnectionBanner)
}

fn match_manual_status(line: &str) -> Option<LegacyMatch> {
    let power = regex(&ECHO_STATE, r"(?i)laser state:\s*(on|off)\b")
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())?;
    let brightness = regex(&ECHO_BRIGHTNESS, r"(?i)laser brightness:\s*(\d{1,3})\s*%")
        .captures(line)
        .and_then(|caps| percent(&caps[1]))?;
    Some(LegacyMatch::ManualStatus { power, brightness })
}

fn percent(digits: &str) -> Option<Brightness> {
    digits.parse::<i64>().ok().map(Brightness::clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(v: i64) -> Brightness {
        Brightness::clamped(v)
    }

    #[test]
    fn firmware_labels() {
        for (line, version) in [
            ("Firmware version: v1.4.2", "v1.4.2"),
            ("Firmware: 2.0", "2.0"),
            ("FW: v3.1", "v3.1"),
            ("version=1.0.0-rc1", "1.0.0-rc1"),
        ] {
            assert_eq!(
                match_legacy(line),
                vec![LegacyMatch::Firmware(version.to_string())],
                "{line}"
            );
        }
    }

    #[test]
    fn firmware_label_stops_at_punctuation() {
        assert_eq!(
            match_legacy("Device initialized - Firmware: v1.2, Brightness: 40%, Laser: ON"),
            vec![
                LegacyMatch::Firmware("v1.2".to_string()),
                LegacyMatch::DeviceInitialized {
                    brightness: level(40),
                    power: PowerState::On,
                },
            ]
        );
        assert_eq!(
            match_legacy("LaserCtl (FW: v3.1+build7); ready"),
            vec![LegacyMatch::Firmware("v3.1+build7".to_string())]
        );
    }

    #[test]
    fn firmware_bare_token() {
        assert_eq!(
            match_legacy("LaserCtl v2.3 ready"),
            vec![LegacyMatch::Firmware("v2.3".to_string())]
        );
    }

    #[test]
    fn loaded_brightness() {
        assert_eq!(
            match_legacy("Loaded brightness: 65%"),
            vec![LegacyMatch::LoadedBrightness(level(65))]
        );
        assert_eq!(
            match_legacy("loaded brightness: 150 %"),
            vec![LegacyMatch::LoadedBrightness(level(100))]
        );
    }

    #[test]
    fn device_initialized_banner() {
        assert_eq!(
            match_legacy("Device initialized - Brightness: 40%, Laser: OFF"),
            vec![LegacyMatch::DeviceInitialized {
                brightness: level(40),
                power: PowerState::Off,
            }]
        );
    }

    #[test]
    fn device_initialized_without_fields_does_not_match() {
        assert!(match_legacy("Device initialized").is_empty());
        assert!(match_legacy("Device initialized - Laser: ON").is_empty());
    }

    #[test]
    fn connection_banner() {
        for line in [
            "USB connection established",
            "Serial connection detected",
            "usb connected",
        ] {
            assert_eq!(match_legacy(line), vec![LegacyMatch::ConnectionBanner], "{line}");
        }
        assert!(LegacyMatch::ConnectionBanner.to_update().is_none());
    }

    #[test]
    fn manual_status_needs_both_fields() {
        assert_eq!(
            match_legacy("Laser State: OFF | Laser Brightness: 12%"),
            vec![LegacyMatch::ManualStatus {
                power: PowerState::Off,
                brightness: level(12),
            }]
        );
        assert!(match_legacy("Laser State: ON").is_empty());
        assert!(match_legacy("Laser Brightness: 12%").is_empty());
    }

    #[test]
    fn several_matchers_fire_in_order() {
        let matches = match_legacy("FW: v1.2 Loaded brightness: 30% USB connected");
        assert_eq!(
            matches,
            vec![
                LegacyMatch::Firmware("v1.2".to_string()),
                LegacyMatch::LoadedBrightness(level(30)),
                LegacyMatch::ConnectionBanner,
            ]
        );
    }

    #[test]
    fn updates_carry_their_source() {
        let update = LegacyMatch::ManualStatus {
            power: PowerState::On,
            brightness: level(5),
        }
        .to_update()
        .unwrap();
        assert_eq!(update.source, UpdateSource::ManualStatus);
        assert_eq!(update.power, Some(PowerState::On));

        let update = LegacyMatch::Firmware("v9".to_string()).to_update().unwrap();
        assert_eq!(update.source, UpdateSource::FirmwareBanner);
        assert!(update.brightness.is_none());
    }
}
