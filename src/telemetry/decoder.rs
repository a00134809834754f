// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-stage line decoding.

use serde_json::Value;

use crate::error::ParseError;
use crate::state::StateUpdate;

use super::legacy::{LegacyMatch, match_legacy};
use super::report::DeviceReport;

/// A decoded device line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    /// The line was a JSON object.
    Structured(DeviceReport),
    /// The line was legacy text; at least one matcher fired.
    Legacy(Vec<LegacyMatch>),
}

impl DecodedLine {
    /// Converts the line into state updates, in application order.
    #[must_use]
    pub fn to_updates(&self) -> Vec<StateUpdate> {
        match self {
            Self::Structured(report) => report.to_update().into_iter().collect(),
            Self::Legacy(matches) => matches.iter().filter_map(LegacyMatch::to_update).collect(),
        }
    }

    /// Returns `true` if this is a structured report with an unknown type.
    #[must_use]
    pub fn is_unrecognized_report(&self) -> bool {
        matches!(self, Self::Structured(DeviceReport::Unrecognized { .. }))
    }
}

/// Decodes one protocol line.
///
/// A line that parses as a JSON object is classified as a [`DeviceReport`].
/// Anything else, including JSON that is not an object, falls through to
/// the legacy matchers; this is the normal path for old firmware.
///
/// # Errors
///
/// - [`ParseError::Json`] if a recognised report has a malformed field
/// - [`ParseError::UnrecognizedLine`] if no legacy matcher fires
///
/// # Examples
///
/// ```
/// use laserctl_lib::telemetry::{DecodedLine, DeviceReport, decode_line};
///
/// let line = r#"{"type":"initial_state","laser_brightness":77,"laser_state":true}"#;
/// let decoded = decode_line(line).unwrap();
/// assert!(matches!(decoded, DecodedLine::Structured(DeviceReport::InitialState(_))));
///
/// let decoded = decode_line("Loaded brightness: 40%").unwrap();
/// assert!(matches!(decoded, DecodedLine::Legacy(_)));
///
/// assert!(decode_line("garbage").is_err());
/// ```
pub fn decode_line(line: &str) -> Result<DecodedLine, ParseError> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(line) {
        return DeviceReport::from_value(value).map(DecodedLine::Structured);
    }

    let matches = match_legacy(line);
    if matches.is_empty() {
        return Err(ParseError::UnrecognizedLine(line.to_string()));
    }
    Ok(DecodedLine::Legacy(matches))
}
