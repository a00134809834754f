// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback subscriptions for state, connection and log changes.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that manages callbacks and dispatches events
//! - [`Subscribable`] - Trait for types that support event subscriptions
//!
//! Callbacks complement the `watch` channels exposed by
//! [`LaserController`](crate::LaserController): watch receivers always hold
//! the latest snapshot, callbacks see every individual change.
//!
//! # Usage
//!
//! ```no_run
//! use laserctl_lib::LaserController;
//! use laserctl_lib::protocol::SerialProvider;
//! use laserctl_lib::subscription::Subscribable;
//!
//! let controller = LaserController::new(SerialProvider::new());
//!
//! let sub_id = controller.on_power_changed(|state| {
//!     println!("Laser is now {state}");
//! });
//!
//! // Later, unsubscribe
//! controller.unsubscribe(sub_id);
//! ```

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
