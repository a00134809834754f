// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-session read loop: bytes to frames to decoded reports to state.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::CommandDispatcher;
use crate::error::ParseError;
use crate::event::{LogCategory, SessionId};
use crate::protocol::{FrameReader, ReadEvent};
use crate::telemetry::{DecodedLine, DeviceReport, decode_line};

use super::{Shared, teardown};

/// Non-disconnect read errors tolerated in a row before giving up on the
/// device.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// How often an automatic disconnect re-checks the connect/disconnect slot.
const TRANSITION_POLL: Duration = Duration::from_millis(10);

/// Runs until the session is cancelled or the device goes away.
///
/// Each chunk is fully decoded and applied before the next read, so state
/// changes follow line order.
pub(crate) async fn run_read_loop(
    shared: Arc<Shared>,
    dispatcher: CommandDispatcher,
    session_id: SessionId,
) {
    let mut frames = FrameReader::with_max_line_length(shared.config.max_line_length);
    let mut consecutive_errors = 0u32;

    tracing::debug!(session = %session_id, "Read loop started");

    let reason = loop {
        match shared.session.read().await {
            Ok(ReadEvent::Data(chunk)) => {
                consecutive_errors = 0;
                for line in frames.push(&chunk) {
                    handle_line(&shared, &line);
                }
            }
            Ok(ReadEvent::Cancelled) => {
                tracing::debug!(session = %session_id, "Read loop cancelled");
                return;
            }
            Ok(ReadEvent::EndOfStream) => break "device closed the connection".to_string(),
            Err(e) if e.is_disconnect() => break e.to_string(),
            Err(e) => {
                consecutive_errors += 1;
                tracing::warn!(session = %session_id, error = %e, attempt = consecutive_errors, "Read error");
                shared.record(format!("Read error: {e}"), LogCategory::Error);
                if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    break format!("giving up after {consecutive_errors} read errors");
                }
            }
        }
    };

    tracing::warn!(session = %session_id, reason = %reason, "Device connection lost");

    let guard = loop {
        if shared.session_id() != Some(session_id) {
            // Someone else already tore this session down.
            return;
        }
        if let Some(guard) = shared.begin_transition() {
            break guard;
        }
        tokio::time::sleep(TRANSITION_POLL).await;
    };

    if shared.session_id() != Some(session_id) {
        return;
    }

    // This task is the read task; detach it so teardown does not wait on itself.
    drop(shared.read_task.lock().take());
    teardown(&shared, &dispatcher, Some(reason)).await;
    drop(guard);
}

/// Decodes one line and applies whatever it carries.
pub(crate) fn handle_line(shared: &Shared, line: &str) {
    match decode_line(line) {
        Ok(DecodedLine::Structured(report)) => handle_report(shared, line, &report),
        Ok(DecodedLine::Legacy(matches)) => {
            for matched in &matches {
                shared.record(matched.describe(), LogCategory::Info);
                if let Some(update) = matched.to_update() {
                    shared.update_state(|sync| sync.apply(&update));
                }
            }
        }
        Err(ParseError::UnrecognizedLine(_)) => {
            tracing::trace!(line = %line, "Unmatched device line");
            shared.record(format!("Device: {line}"), LogCategory::Info);
        }
        Err(e) => {
            tracing::warn!(line = %line, error = %e, "Malformed device message");
            shared.record(format!("Malformed message skipped: {e}"), LogCategory::Warning);
        }
    }
}

fn handle_report(shared: &Shared, line: &str, report: &DeviceReport) {
    match report {
        DeviceReport::Unrecognized { kind, .. } => {
            tracing::debug!(kind = ?kind, "Unrecognized structured message");
            shared.record(line, LogCategory::RawStructured);
            return;
        }
        DeviceReport::InitialState(_) => {
            shared.record("Received initial state", LogCategory::Success);
        }
        DeviceReport::Status(_) => {
            shared.record("Received status", LogCategory::Info);
        }
        DeviceReport::Heartbeat(fields) => {
            tracing::trace!(brightness = ?fields.laser_brightness, "Heartbeat");
        }
    }

    if let Some(update) = report.to_update() {
        let changes = shared.update_state(|sync| sync.apply(&update));
        tracing::debug!(kind = ?report.kind(), changes = changes.len(), "Report applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::protocol::{LoopbackProvider, TransportSession};
    use crate::state::{StateSynchronizer, UNKNOWN_FIRMWARE};

    fn shared() -> Shared {
        let config = ControllerConfig::default();
        let session = TransportSession::new(
            Arc::new(LoopbackProvider::new()),
            config.serial.clone(),
        );
        Shared::new(config, session)
    }

    #[test]
    fn initial_state_hydrates_device_state() {
        let shared = shared();
        handle_line(
            &shared,
            r#"{"type":"initial_state","laser_brightness":77,"laser_state":true,"version":"v2.1"}"#,
        );

        let state = shared.state();
        assert!(state.power().is_on());
        assert_eq!(state.brightness().value(), 77);
        assert!(state.brightness_initialized());
        assert_eq!(state.firmware_version(), "v2.1");
        assert_eq!(shared.log.entries()[0].category, LogCategory::Success);
    }

    #[test]
    fn small_heartbeat_drift_is_ignored() {
        let shared = shared();
        handle_line(&shared, r#"{"type":"initial_state","laser_brightness":50}"#);

        handle_line(&shared, r#"{"type":"heartbeat","laser_brightness":51}"#);
        assert_eq!(shared.state().brightness().value(), 50);

        handle_line(&shared, r#"{"type":"heartbeat","laser_brightness":10}"#);
        assert_eq!(shared.state().brightness().value(), 10);
    }

    #[test]
    fn heartbeats_stay_out_of_the_log() {
        let shared = shared();
        handle_line(&shared, r#"{"type":"heartbeat","uptime_ms":5000}"#);
        assert!(shared.log.is_empty());
        assert_eq!(shared.state().uptime_seconds(), 5);
    }

    #[test]
    fn heartbeat_uptime_only_moves_forward() {
        let shared = shared();
        handle_line(&shared, r#"{"type":"heartbeat","uptime_ms":100000}"#);
        handle_line(&shared, r#"{"type":"heartbeat","uptime_ms":5000}"#);
        assert_eq!(shared.state().uptime_seconds(), 100);

        shared.update_state(StateSynchronizer::reset_for_disconnect);
        handle_line(&shared, r#"{"type":"heartbeat","uptime_ms":5000}"#);
        assert_eq!(shared.state().uptime_seconds(), 5);
    }

    #[test]
    fn unknown_type_logged_raw() {
        let shared = shared();
        let line = r#"{"type":"debug","msg":"hello"}"#;
        handle_line(&shared, line);

        let entries = shared.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, LogCategory::RawStructured);
        assert_eq!(entries[0].message, line);
        assert!(!shared.state().brightness_initialized());
    }

    #[test]
    fn legacy_lines_apply_in_order() {
        let shared = shared();
        handle_line(&shared, "Firmware: v1.4.2");
        handle_line(&shared, "Device initialized. Brightness: 35%, Laser: ON");

        let state = shared.state();
        assert_eq!(state.firmware_version(), "v1.4.2");
        assert_eq!(state.brightness().value(), 35);
        assert!(state.power().is_on());
        assert!(state.brightness_initialized());
    }

    #[test]
    fn unmatched_text_is_logged_not_applied() {
        let shared = shared();
        handle_line(&shared, "boot: ets Jun  8 2016");

        assert_eq!(shared.log.len(), 1);
        assert_eq!(shared.state().firmware_version(), UNKNOWN_FIRMWARE);
    }

    #[test]
    fn malformed_report_is_a_warning() {
        let shared = shared();
        handle_line(&shared, r#"{"type":"status","laser_brightness":"high"}"#);

        let entries = shared.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, LogCategory::Warning);
    }
}
