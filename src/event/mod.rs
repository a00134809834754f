// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observability: the activity log and controller events.
//!
//! - [`EventLog`]: bounded FIFO of human-readable [`LogEntry`]s for display
//! - [`EventBus`]: tokio broadcast channel of [`ControllerEvent`]s
//! - [`SessionId`]: tags every connection
//!
//! # Examples
//!
//! ```
//! use laserctl_lib::event::{EventLog, LogCategory};
//!
//! let log = EventLog::new();
//! log.append("Connected to /dev/ttyUSB0", LogCategory::Success);
//! assert_eq!(log.len(), 1);
//! ```

mod controller_event;
mod event_bus;
mod event_log;
mod session_id;

pub use controller_event::ControllerEvent;
pub use event_bus::EventBus;
pub use event_log::{DEFAULT_LOG_CAPACITY, EventLog, LogCategory, LogEntry};
pub use session_id::SessionId;
