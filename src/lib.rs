// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `laserctl` Lib - A Rust library to control serial-attached laser modules.
//!
//! The library talks to an ESP32-class laser controller over a serial line
//! (115200 8N1, `\n`-delimited UTF-8) and keeps a local model of the device
//! in sync with what it reports.
//!
//! # Supported Features
//!
//! - **Power control**: `LASER_ON`, `LASER_OFF`, toggle from last known state
//! - **Brightness control**: debounced `SET_LASER_PWM:<0-100>`
//! - **State tracking**: JSON reports (`initial_state`, `status`, `heartbeat`)
//!   and legacy text banners from older firmware
//! - **Activity log**: bounded, timestamped, categorized
//! - **Subscriptions**: `watch` channels, callbacks and an event stream
//!
//! # Quick Start
//!
//! ```no_run
//! use laserctl_lib::{Brightness, LaserController, PortSelector};
//! use laserctl_lib::protocol::SerialProvider;
//! use laserctl_lib::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> laserctl_lib::Result<()> {
//!     let controller = LaserController::new(SerialProvider::new());
//!
//!     controller.on_brightness_changed(|level| println!("Brightness: {level}"));
//!
//!     controller.connect(PortSelector::FirstAvailable).await?;
//!     controller.set_power(laserctl_lib::PowerState::On).await;
//!     controller.set_brightness(Brightness::new(60)?);
//!
//!     for entry in controller.log_entries() {
//!         println!("{entry}");
//!     }
//!
//!     controller.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing without hardware
//!
//! [`protocol::LoopbackProvider`] stands in for a serial port: the test
//! holds the device end of an in-memory pipe and plays the firmware.
//!
//! ```
//! use laserctl_lib::{LaserController, PortSelector};
//! use laserctl_lib::protocol::LoopbackProvider;
//!
//! # #[tokio::main]
//! # async fn main() -> laserctl_lib::Result<()> {
//! let provider = LoopbackProvider::new();
//! let controller = LaserController::new(provider.clone());
//! controller.connect(PortSelector::FirstAvailable).await?;
//!
//! let mut device = provider.take_device().unwrap();
//! assert_eq!(device.read_line().await.unwrap().as_deref(), Some("GET_INITIAL_STATE"));
//!
//! let mut state = controller.watch_state();
//! device
//!     .send_line(r#"{"type":"initial_state","laser_brightness":77,"laser_state":true}"#)
//!     .await
//!     .unwrap();
//! state.wait_for(|s| s.brightness_initialized()).await.unwrap();
//! assert_eq!(controller.state().brightness().value(), 77);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
mod controller;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod telemetry;
pub mod types;

pub use command::{Command, LaserCommand, QueryCommand};
pub use config::ControllerConfig;
pub use controller::LaserController;
pub use error::{Error, ParseError, Result, TransportError, ValueError};
pub use event::{ControllerEvent, LogCategory, LogEntry, SessionId};
pub use protocol::{PortInfo, PortSelector, SerialConfig};
pub use state::{ConnectionState, DeviceState, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{Brightness, PowerState, Uptime};
