// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of lines received from the laser device.
//!
//! The firmware speaks two dialects on the same stream:
//!
//! - Structured JSON objects tagged with a `type` field (`initial_state`,
//!   `status`, `heartbeat`), parsed into [`DeviceReport`]
//! - Legacy human-readable lines, recognised by [`match_legacy`]
//!
//! [`decode_line`] tries the structured form first and falls back to the
//! legacy matchers. The result converts into
//! [`StateUpdate`](crate::state::StateUpdate)s for the synchronizer.
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::telemetry::decode_line;
//!
//! let decoded = decode_line(r#"{"type":"heartbeat","laser_brightness":51}"#).unwrap();
//! for update in decoded.to_updates() {
//!     println!("{:?}: {:?}", update.source, update.brightness);
//! }
//! ```

mod decoder;
mod legacy;
mod report;

pub use decoder::{DecodedLine, decode_line};
pub use legacy::{LegacyMatch, match_legacy};
pub use report::{DeviceReport, ReportFields};
