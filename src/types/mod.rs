// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for laser device control.
//!
//! Each type keeps its value within the valid range at construction time.
//!
//! # Types
//!
//! - [`PowerState`] - Laser on/off
//! - [`Brightness`] - PWM level (0-100%)
//! - [`Uptime`] - Seconds since the device booted

mod brightness;
mod power;
mod uptime;

pub use brightness::Brightness;
pub use power::PowerState;
pub use uptime::Uptime;
