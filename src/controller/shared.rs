// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared between the controller, the dispatcher and the read loop.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::event::{ControllerEvent, EventBus, EventLog, LogCategory, SessionId};
use crate::protocol::TransportSession;
use crate::state::{ConnectionState, DeviceState, StateChange, StateSynchronizer};
use crate::subscription::CallbackRegistry;

/// Everything the controller's tasks need to reach.
///
/// Locks are `parking_lot` and are never held across an `.await`.
pub(crate) struct Shared {
    pub(crate) config: ControllerConfig,
    pub(crate) session: TransportSession,
    pub(crate) synchronizer: Mutex<StateSynchronizer>,
    pub(crate) log: EventLog,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) events: EventBus,
    pub(crate) session_id: RwLock<Option<SessionId>>,
    pub(crate) read_task: Mutex<Option<JoinHandle<()>>>,
    state_tx: watch::Sender<DeviceState>,
    connection_tx: watch::Sender<ConnectionState>,
    transition: AtomicBool,
}

impl Shared {
    pub(crate) fn new(config: ControllerConfig, session: TransportSession) -> Self {
        let synchronizer = StateSynchronizer::with_threshold(config.heartbeat_threshold);
        let (state_tx, _) = watch::channel(synchronizer.state().clone());
        let (connection_tx, _) = watch::channel(ConnectionState::Disconnected);
        let log = EventLog::with_capacity(config.log_capacity);

        Self {
            config,
            session,
            synchronizer: Mutex::new(synchronizer),
            log,
            callbacks: CallbackRegistry::new(),
            events: EventBus::new(),
            session_id: RwLock::new(None),
            read_task: Mutex::new(None),
            state_tx,
            connection_tx,
            transition: AtomicBool::new(false),
        }
    }

    // ========== Accessors ==========

    pub(crate) fn state(&self) -> DeviceState {
        self.synchronizer.lock().state().clone()
    }

    pub(crate) fn connection_state(&self) -> ConnectionState {
        *self.connection_tx.borrow()
    }

    pub(crate) fn session_id(&self) -> Option<SessionId> {
        *self.session_id.read()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }

    // ========== Notifications ==========

    /// Appends to the activity log and notifies log subscribers.
    pub(crate) fn record(&self, message: impl Into<String>, category: LogCategory) {
        let entry = self.log.append(message, category);
        self.callbacks.dispatch_log(&entry);
        self.events.publish(ControllerEvent::LogAppended(entry));
    }

    /// Runs `f` on the synchronizer and publishes whatever changed.
    pub(crate) fn update_state<F>(&self, f: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut StateSynchronizer) -> Vec<StateChange>,
    {
        let (changes, snapshot) = {
            let mut synchronizer = self.synchronizer.lock();
            let changes = f(&mut synchronizer);
            (changes, synchronizer.state().clone())
        };

        if changes.is_empty() {
            return changes;
        }

        self.state_tx.send_replace(snapshot.clone());
        for change in &changes {
            self.callbacks.dispatch(change);
            self.events
                .publish(ControllerEvent::state_changed(change.clone(), snapshot.clone()));
        }
        changes
    }

    /// Moves to `state` and notifies connection subscribers.
    pub(crate) fn set_connection(
        &self,
        state: ConnectionState,
        session_id: Option<SessionId>,
        error: Option<String>,
    ) {
        let previous = self.connection_tx.send_replace(state);
        if previous == state {
            return;
        }

        tracing::debug!(from = %previous, to = %state, "Connection state changed");
        self.callbacks.dispatch_connection(state);
        self.events.publish(ControllerEvent::ConnectionChanged {
            session_id,
            state,
            error,
        });
    }

    // ========== Single-flight guard ==========

    /// Claims the connect/disconnect slot, or returns `None` if another
    /// transition is in flight.
    pub(crate) fn begin_transition(&self) -> Option<TransitionGuard<'_>> {
        self.transition
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TransitionGuard { shared: self })
    }
}

/// Releases the connect/disconnect slot when dropped.
///
/// A connect abandoned while still `Connecting` falls back to `Disconnected`.
pub(crate) struct TransitionGuard<'a> {
    shared: &'a Shared,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if self.shared.connection_state() == ConnectionState::Connecting {
            self.shared.set_connection(
                ConnectionState::Disconnected,
                None,
                Some("connect abandoned".to_string()),
            );
        }
        self.shared.transition.store(false, Ordering::Release);
    }
}
