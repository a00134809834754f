// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for controller subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::LogEntry;
use crate::state::{ConnectionState, StateChange};
use crate::types::{Brightness, PowerState};

/// Unique identifier for a subscription.
///
/// Returned when subscribing; pass it to `unsubscribe` to remove the
/// callback. IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type PowerCallback = Arc<dyn Fn(PowerState) + Send + Sync>;
type BrightnessCallback = Arc<dyn Fn(Brightness) + Send + Sync>;
type ConnectionCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;
type LogCallback = Arc<dyn Fn(&LogEntry) + Send + Sync>;
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Registry for subscription callbacks.
///
/// Callbacks are stored behind `parking_lot::RwLock`s and cloned out before
/// being invoked, so a callback may itself subscribe or unsubscribe.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    power_callbacks: RwLock<HashMap<SubscriptionId, PowerCallback>>,
    brightness_callbacks: RwLock<HashMap<SubscriptionId, BrightnessCallback>>,
    connection_callbacks: RwLock<HashMap<SubscriptionId, ConnectionCallback>>,
    log_callbacks: RwLock<HashMap<SubscriptionId, LogCallback>>,
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
}

fn snapshot<C: Clone>(map: &RwLock<HashMap<SubscriptionId, C>>) -> Vec<C> {
    map.read().values().cloned().collect()
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            power_callbacks: RwLock::new(HashMap::new()),
            brightness_callbacks: RwLock::new(HashMap::new()),
            connection_callbacks: RwLock::new(HashMap::new()),
            log_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for laser power changes.
    pub fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.power_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for brightness changes, local or reported.
    pub fn on_brightness_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Brightness) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.brightness_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for connection state transitions.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connection_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for new activity log entries.
    pub fn on_log_entry<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.log_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback receiving every state change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.power_callbacks.write().remove(&id).is_some()
            || self.brightness_callbacks.write().remove(&id).is_some()
            || self.connection_callbacks.write().remove(&id).is_some()
            || self.log_callbacks.write().remove(&id).is_some()
            || self.state_changed_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.power_callbacks.write().clear();
        self.brightness_callbacks.write().clear();
        self.connection_callbacks.write().clear();
        self.log_callbacks.write().clear();
        self.state_changed_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches a state change to the generic and the matching specific
    /// callbacks.
    pub fn dispatch(&self, change: &StateChange) {
        for callback in snapshot(&self.state_changed_callbacks) {
            callback(change);
        }

        match change {
            StateChange::Power(state) => {
                for callback in snapshot(&self.power_callbacks) {
                    callback(*state);
                }
            }
            StateChange::Brightness(level) => {
                for callback in snapshot(&self.brightness_callbacks) {
                    callback(*level);
                }
            }
            StateChange::BrightnessInitialized(_)
            | StateChange::FirmwareVersion(_)
            | StateChange::Uptime(_)
            | StateChange::FreeHeap(_) => {
                // Only reported through the generic callbacks
            }
        }
    }

    /// Dispatches a connection state transition.
    pub fn dispatch_connection(&self, state: ConnectionState) {
        for callback in snapshot(&self.connection_callbacks) {
            callback(state);
        }
    }

    /// Dispatches a new log entry.
    pub fn dispatch_log(&self, entry: &LogEntry) {
        for callback in snapshot(&self.log_callbacks) {
            callback(entry);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.power_callbacks.read().len()
            + self.brightness_callbacks.read().len()
            + self.connection_callbacks.read().len()
            + self.log_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
