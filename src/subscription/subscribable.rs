// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish controller events.

use crate::event::LogEntry;
use crate::state::{ConnectionState, StateChange};
use crate::subscription::SubscriptionId;
use crate::types::{Brightness, PowerState};

/// Trait for types that support callback subscriptions.
///
/// Callbacks run synchronously on the task that produced the change (the
/// read loop for device reports, the caller for local changes), so they
/// should return quickly.
///
/// # Examples
///
/// ```no_run
/// use laserctl_lib::LaserController;
/// use laserctl_lib::protocol::LoopbackProvider;
/// use laserctl_lib::subscription::Subscribable;
///
/// let controller = LaserController::new(LoopbackProvider::new());
///
/// let sub_id = controller.on_brightness_changed(|level| {
///     println!("Brightness: {level}");
/// });
///
/// controller.unsubscribe(sub_id);
/// ```
pub trait Subscribable {
    /// Subscribes to laser power changes.
    fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static;

    /// Subscribes to brightness changes.
    ///
    /// Fires for local slider changes as well as accepted device reports.
    fn on_brightness_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Brightness) + Send + Sync + 'static;

    /// Subscribes to connection state transitions.
    fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState) + Send + Sync + 'static;

    /// Subscribes to activity log entries.
    fn on_log_entry<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static;

    /// Subscribes to all state changes.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
