// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceState`] holds the current view of the device. It is only mutated
//! through the [`StateSynchronizer`], which merges decoded [`StateUpdate`]s
//! under the precedence rules and reports every applied [`StateChange`].
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::state::{StateSynchronizer, StateUpdate, UpdateSource};
//! use laserctl_lib::types::{Brightness, PowerState};
//!
//! let mut sync = StateSynchronizer::new();
//! let update = StateUpdate::new(UpdateSource::InitialState)
//!     .with_power(PowerState::On)
//!     .with_brightness(Brightness::clamped(77));
//! sync.apply(&update);
//!
//! assert_eq!(sync.state().power(), PowerState::On);
//! assert!(sync.state().brightness_initialized());
//! ```

mod connection;
mod device_state;
mod state_change;
mod synchronizer;

pub use connection::ConnectionState;
pub use device_state::{DeviceState, UNKNOWN_FIRMWARE};
pub use state_change::{StateChange, StateUpdate, UpdateSource};
pub use synchronizer::{DEFAULT_HEARTBEAT_THRESHOLD, StateSynchronizer};
