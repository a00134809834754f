// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The laser controller.
//!
//! [`LaserController`] owns the transport session, the device state and the
//! activity log. A presentation layer reads it through accessors, `watch`
//! channels or callbacks, and drives it through a handful of intents.

mod read_loop;
mod shared;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::command::{Command, QueryCommand};
use crate::config::ControllerConfig;
use crate::dispatch::CommandDispatcher;
use crate::error::{Error, Result};
use crate::event::{ControllerEvent, LogCategory, LogEntry, SessionId};
use crate::protocol::{DeviceProvider, PortInfo, PortSelector, TransportSession};
use crate::state::{ConnectionState, DeviceState, StateChange, StateSynchronizer};
use crate::subscription::{Subscribable, SubscriptionId};
use crate::types::{Brightness, PowerState};

pub(crate) use shared::Shared;

/// How long teardown waits for the read task to notice the cancellation.
const READ_TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Host-side controller for one serial-attached laser module.
///
/// # Examples
///
/// ```no_run
/// use laserctl_lib::{Brightness, LaserController, PortSelector};
/// use laserctl_lib::protocol::SerialProvider;
///
/// #[tokio::main]
/// async fn main() -> laserctl_lib::Result<()> {
///     let controller = LaserController::new(SerialProvider::new());
///
///     let port = controller.connect(PortSelector::named("/dev/ttyUSB0")).await?;
///     println!("Connected to {port}");
///
///     controller.toggle_power().await;
///     controller.set_brightness(Brightness::new(40)?);
///
///     let mut state = controller.watch_state();
///     state.changed().await.ok();
///     println!("Firmware: {}", state.borrow().firmware_version());
///
///     controller.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct LaserController {
    shared: Arc<Shared>,
    dispatcher: CommandDispatcher,
}

impl LaserController {
    /// Creates a controller with the default configuration.
    #[must_use]
    pub fn new(provider: impl DeviceProvider + 'static) -> Self {
        Self::build(Arc::new(provider), ControllerConfig::default())
    }

    /// Creates a controller with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration does not
    /// validate.
    pub fn with_config(
        provider: impl DeviceProvider + 'static,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Arc::new(provider), config))
    }

    fn build(provider: Arc<dyn DeviceProvider>, config: ControllerConfig) -> Self {
        let session =
            TransportSession::with_chunk_size(provider, config.serial.clone(), config.read_chunk_size);
        let shared = Arc::new(Shared::new(config, session));
        let dispatcher = CommandDispatcher::new(Arc::clone(&shared));
        Self { shared, dispatcher }
    }

    // ========== Lifecycle ==========

    /// Opens a port and starts reading from it.
    ///
    /// Sends `GET_INITIAL_STATE` once connected unless disabled in the
    /// configuration. Returns the name of the opened port.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if a connect or disconnect is in flight, or the
    ///   controller is already connected
    /// - [`Error::Transport`] if the port cannot be selected or opened; the
    ///   failure is also logged and the controller stays disconnected
    pub async fn connect(&self, selector: PortSelector) -> Result<String> {
        let Some(guard) = self.shared.begin_transition() else {
            return Err(Error::Busy(self.connection_state()));
        };

        let current = self.shared.connection_state();
        if !current.is_disconnected() {
            return Err(Error::Busy(current));
        }

        if self.shared.session.is_open() {
            tracing::debug!("Closing stale session before connecting");
            self.shared.session.close().await;
        }

        self.shared
            .set_connection(ConnectionState::Connecting, None, None);
        self.shared
            .record(format!("Connecting to {selector}"), LogCategory::Info);

        let port = match self.shared.session.open(&selector).await {
            Ok(port) => port,
            Err(e) => {
                tracing::error!(selector = %selector, error = %e, "Connect failed");
                self.shared
                    .record(format!("Connection failed: {e}"), LogCategory::Error);
                self.shared
                    .set_connection(ConnectionState::Disconnected, None, Some(e.to_string()));
                return Err(e.into());
            }
        };

        let session_id = SessionId::new();
        *self.shared.session_id.write() = Some(session_id);
        self.shared
            .set_connection(ConnectionState::Connected, Some(session_id), None);
        self.shared
            .record(format!("Connected to {port}"), LogCategory::Success);
        tracing::info!(port = %port, session = %session_id, "Connected");

        let task = tokio::spawn(read_loop::run_read_loop(
            Arc::clone(&self.shared),
            self.dispatcher.clone(),
            session_id,
        ));
        *self.shared.read_task.lock() = Some(task);

        if self.shared.config.request_initial_state {
            self.dispatcher
                .send_command(&QueryCommand::InitialState)
                .await;
        }

        drop(guard);
        Ok(port)
    }

    /// Closes the session.
    ///
    /// Teardown is best-effort: the controller always ends up
    /// [`Disconnected`](ConnectionState::Disconnected). Power and brightness
    /// are kept as last-known values; the firmware version and the
    /// brightness-initialized flag are reset. Does nothing when already
    /// disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if a connect or disconnect is in flight.
    pub async fn disconnect(&self) -> Result<()> {
        let Some(_guard) = self.shared.begin_transition() else {
            return Err(Error::Busy(self.connection_state()));
        };

        if self.shared.connection_state().is_disconnected() && !self.shared.session.is_open() {
            return Ok(());
        }

        teardown(&self.shared, &self.dispatcher, None).await;
        Ok(())
    }

    // ========== Intents ==========

    /// Sends the opposite of the last reported power state.
    ///
    /// Returns `true` if the command was written. The displayed power only
    /// changes once the device reports back.
    pub async fn toggle_power(&self) -> bool {
        self.dispatcher.toggle_power().await
    }

    /// Sends `LASER_ON` or `LASER_OFF`.
    pub async fn set_power(&self, state: PowerState) -> bool {
        self.dispatcher.set_power(state).await
    }

    /// Sets the brightness.
    ///
    /// The displayed value changes immediately; `SET_LASER_PWM` follows once
    /// no further change arrived for the configured debounce delay, and only
    /// if the device has reported its brightness since connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_brightness(&self, level: Brightness) {
        self.dispatcher.set_brightness(level);
    }

    /// Asks the device for a `status` report.
    pub async fn request_status(&self) -> bool {
        self.dispatcher.send_command(&QueryCommand::Status).await
    }

    /// Sends an arbitrary command line.
    ///
    /// Returns `false` (and logs why) if nothing was written.
    pub async fn send_command<C>(&self, command: &C) -> bool
    where
        C: Command + ?Sized,
    {
        self.dispatcher.send_command(command).await
    }

    /// Empties the activity log.
    pub fn clear_log(&self) {
        self.shared.log.clear();
        tracing::debug!("Activity log cleared");
    }

    // ========== Accessors ==========

    /// Returns a snapshot of the device state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.shared.state()
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection_state()
    }

    /// Returns the activity log, oldest first.
    #[must_use]
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.shared.log.entries()
    }

    /// Returns the id of the open session.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.session_id()
    }

    /// Returns the name of the open port.
    #[must_use]
    pub fn port_name(&self) -> Option<String> {
        self.shared.session.port_name()
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Lists the ports the provider can see.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if enumeration fails.
    pub async fn available_ports(&self) -> Result<Vec<PortInfo>> {
        self.shared
            .session
            .available_ports()
            .await
            .map_err(Error::from)
    }

    /// Watches the device state. The receiver always holds the latest
    /// snapshot.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.shared.watch_state()
    }

    /// Watches the connection state.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watch_connection()
    }

    /// Subscribes to the controller event stream.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.events.subscribe()
    }
}

impl Subscribable for LaserController {
    fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_power_changed(callback)
    }

    fn on_brightness_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Brightness) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_brightness_changed(callback)
    }

    fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_connection_changed(callback)
    }

    fn on_log_entry<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_log_entry(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_state_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.callbacks.unsubscribe(id)
    }
}

impl std::fmt::Debug for LaserController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaserController")
            .field("connection", &self.connection_state())
            .field("session", &self.session_id())
            .field("port", &self.port_name())
            .finish_non_exhaustive()
    }
}

impl Drop for LaserController {
    fn drop(&mut self) {
        self.dispatcher.cancel_pending();
        self.shared.session.cancel_read();
    }
}

/// Runs the disconnect sequence. The caller must hold the transition guard.
///
/// Steps: cancel the pending brightness send, close the session, reset the
/// session-scoped state, publish `Disconnected`, then wait (bounded) for the
/// read task.
pub(crate) async fn teardown(
    shared: &Shared,
    dispatcher: &CommandDispatcher,
    reason: Option<String>,
) {
    dispatcher.cancel_pending();
    shared.session.close().await;

    shared.update_state(StateSynchronizer::reset_for_disconnect);

    let session_id = shared.session_id.write().take();
    shared.set_connection(ConnectionState::Disconnected, session_id, reason.clone());

    match reason {
        Some(reason) => shared.record(format!("Disconnected: {reason}"), LogCategory::Warning),
        None => shared.record("Disconnected", LogCategory::Info),
    }

    let task = shared.read_task.lock().take();
    if let Some(mut task) = task {
        if tokio::time::timeout(READ_TASK_JOIN_TIMEOUT, &mut task)
            .await
            .is_err()
        {
            tracing::warn!("Read task did not stop in time, aborting it");
            task.abort();
        }
    }

    match session_id {
        Some(id) => tracing::info!(session = %id, "Disconnected"),
        None => tracing::info!("Disconnected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LoopbackProvider;

    #[tokio::test]
    async fn connect_rejected_while_transition_in_flight() {
        let controller = LaserController::new(LoopbackProvider::new());

        let guard = controller.shared.begin_transition();
        assert!(guard.is_some());

        let err = controller
            .connect(PortSelector::FirstAvailable)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Busy(ConnectionState::Disconnected)));
        assert!(matches!(
            controller.disconnect().await.unwrap_err(),
            Error::Busy(_)
        ));

        drop(guard);
        controller.connect(PortSelector::FirstAvailable).await.unwrap();
        assert!(controller.connection_state().is_connected());
    }

    #[tokio::test]
    async fn connect_twice_is_busy() {
        let provider = LoopbackProvider::new();
        let controller = LaserController::new(provider.clone());
        controller.connect(PortSelector::FirstAvailable).await.unwrap();

        let err = controller
            .connect(PortSelector::FirstAvailable)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Busy(ConnectionState::Connected)));
        assert_eq!(provider.open_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_when_idle_is_a_no_op() {
        let controller = LaserController::new(LoopbackProvider::new());
        controller.disconnect().await.unwrap();
        assert!(controller.log_entries().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ControllerConfig::default().with_log_capacity(0);
        let err = LaserController::with_config(LoopbackProvider::new(), config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
