// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turns controller intents into command lines on the wire.

use std::sync::Arc;

use crate::command::{Command, LaserCommand};
use crate::controller::Shared;
use crate::error::{Error, Result};
use crate::event::LogCategory;
use crate::types::{Brightness, PowerState};

use super::Debouncer;

/// Sends commands over the shared session and debounces brightness changes.
///
/// Every outcome ends up in the activity log; nothing here returns an error.
#[derive(Clone)]
pub(crate) struct CommandDispatcher {
    shared: Arc<Shared>,
    debouncer: Arc<Debouncer>,
}

impl CommandDispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let debouncer = Arc::new(Debouncer::new(shared.config.debounce()));
        Self { shared, debouncer }
    }

    /// Writes one command line and logs the outcome.
    ///
    /// Returns `true` if the bytes reached the transport.
    pub(crate) async fn send_command<C>(&self, command: &C) -> bool
    where
        C: Command + ?Sized,
    {
        let line = command.to_line();

        match self.try_send(command).await {
            Ok(()) => {
                tracing::debug!(command = %line, "Command sent");
                self.shared.record(format!("Sent: {line}"), LogCategory::Info);
                true
            }
            Err(Error::NotConnected) => {
                tracing::warn!(command = %line, "Send attempted without an open session");
                self.shared
                    .record(format!("Cannot send {line}: not connected"), LogCategory::Error);
                false
            }
            Err(e) => {
                tracing::error!(command = %line, error = %e, "Command write failed");
                self.shared
                    .record(format!("Failed to send {line}: {e}"), LogCategory::Error);
                false
            }
        }
    }

    /// Writes one command line without logging.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::Transport`] if the write fails
    async fn try_send<C>(&self, command: &C) -> Result<()>
    where
        C: Command + ?Sized,
    {
        if !self.shared.session.is_open() {
            return Err(Error::NotConnected);
        }
        self.shared.session.write(&command.to_bytes()).await?;
        Ok(())
    }

    /// Sends `LASER_ON` or `LASER_OFF` right away.
    ///
    /// The local power state is left alone; the device echoes the real state.
    pub(crate) async fn set_power(&self, state: PowerState) -> bool {
        self.send_command(&LaserCommand::Power(state)).await
    }

    /// Sends the opposite of the last known power state.
    pub(crate) async fn toggle_power(&self) -> bool {
        let target = self.shared.state().power().toggled();
        self.set_power(target).await
    }

    /// Updates brightness locally and schedules `SET_LASER_PWM` after the
    /// quiet period.
    ///
    /// When the timer fires the send is skipped unless the device has
    /// reported its brightness at least once, so a slider moved before the
    /// first report cannot push a stale value.
    pub(crate) fn set_brightness(&self, level: Brightness) {
        self.shared
            .update_state(|sync| sync.apply_local_brightness(level).into_iter().collect());

        let dispatcher = self.clone();
        self.debouncer.arm(async move {
            let initialized = dispatcher.shared.state().brightness_initialized();
            if !initialized {
                tracing::debug!(brightness = %level, "Brightness send skipped, device not initialized");
                dispatcher.shared.record(
                    format!("Brightness {level} not sent: device brightness not initialized yet"),
                    LogCategory::Warning,
                );
                return;
            }
            dispatcher
                .send_command(&LaserCommand::SetBrightness(level))
                .await;
        });
    }

    /// Drops a brightness send that is still waiting for its quiet period.
    pub(crate) fn cancel_pending(&self) -> bool {
        let cancelled = self.debouncer.cancel();
        if cancelled {
            tracing::debug!("Pending brightness send cancelled");
        }
        cancelled
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::ControllerConfig;
    use crate::protocol::{LoopbackDevice, LoopbackProvider, PortSelector, TransportSession};
    use crate::state::{StateUpdate, UpdateSource};

    fn dispatcher(provider: &LoopbackProvider) -> CommandDispatcher {
        let config = ControllerConfig::default();
        let session = TransportSession::new(Arc::new(provider.clone()), config.serial.clone());
        CommandDispatcher::new(Arc::new(Shared::new(config, session)))
    }

    async fn open(provider: &LoopbackProvider, dispatcher: &CommandDispatcher) -> LoopbackDevice {
        dispatcher
            .shared
            .session
            .open(&PortSelector::FirstAvailable)
            .await
            .unwrap();
        provider.take_device().unwrap()
    }

    fn initialize_brightness(dispatcher: &CommandDispatcher, level: u8) {
        let update = StateUpdate::new(UpdateSource::InitialState)
            .with_brightness(Brightness::new(level).unwrap());
        dispatcher.shared.update_state(|sync| sync.apply(&update));
    }

    #[tokio::test]
    async fn send_without_session_logs_error() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);

        assert!(!dispatcher.send_command(&LaserCommand::on()).await);

        let entries = dispatcher.shared.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, LogCategory::Error);
        assert!(entries[0].message.contains("LASER_ON"));
    }

    #[tokio::test]
    async fn try_send_reports_not_connected() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);

        let err = dispatcher.try_send(&LaserCommand::on()).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(dispatcher.shared.log.is_empty());
    }

    #[tokio::test]
    async fn send_writes_line_and_logs() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        let mut device = open(&provider, &dispatcher).await;

        assert!(dispatcher.send_command(&LaserCommand::off()).await);
        assert_eq!(device.read_line().await.unwrap().as_deref(), Some("LASER_OFF"));
        assert_eq!(dispatcher.shared.log.entries()[0].message, "Sent: LASER_OFF");
    }

    #[tokio::test]
    async fn send_to_vanished_device_logs_failure() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        open(&provider, &dispatcher).await.hang_up();

        assert!(!dispatcher.send_command(&LaserCommand::on()).await);
        let entries = dispatcher.shared.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, LogCategory::Error);
    }

    #[tokio::test]
    async fn toggle_uses_last_known_power() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        let mut device = open(&provider, &dispatcher).await;

        assert!(dispatcher.toggle_power().await);
        assert_eq!(device.read_line().await.unwrap().as_deref(), Some("LASER_ON"));
        // No local flip: the next toggle still targets ON until the device reports.
        assert!(dispatcher.toggle_power().await);
        assert_eq!(device.read_line().await.unwrap().as_deref(), Some("LASER_ON"));
    }

    #[tokio::test(start_paused = true)]
    async fn brightness_burst_sends_last_value_once() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        let mut device = open(&provider, &dispatcher).await;
        initialize_brightness(&dispatcher, 50);

        for level in [10, 20, 30] {
            dispatcher.set_brightness(Brightness::new(level).unwrap());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(dispatcher.shared.state().brightness().value(), 30);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            device.read_line().await.unwrap().as_deref(),
            Some("SET_LASER_PWM:30")
        );

        let sent = dispatcher
            .shared
            .log
            .entries()
            .iter()
            .filter(|e| e.message.starts_with("Sent: SET_LASER_PWM"))
            .count();
        assert_eq!(sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn brightness_gated_until_initialized() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        let _device = open(&provider, &dispatcher).await;

        dispatcher.set_brightness(Brightness::new(40).unwrap());
        tokio::time::sleep(Duration::from_millis(300)).await;

        let entries = dispatcher.shared.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, LogCategory::Warning);
        assert_eq!(dispatcher.shared.state().brightness().value(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_drops_brightness_send() {
        let provider = LoopbackProvider::new();
        let dispatcher = dispatcher(&provider);
        let _device = open(&provider, &dispatcher).await;
        initialize_brightness(&dispatcher, 50);

        dispatcher.set_brightness(Brightness::new(70).unwrap());
        assert!(dispatcher.has_pending());
        assert!(dispatcher.cancel_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(dispatcher.shared.log.is_empty());
    }
}
