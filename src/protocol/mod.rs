// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte transport to the laser device.
//!
//! This module owns everything below the protocol decoder:
//!
//! - [`DeviceProvider`]: capability check, port selection and opening
//! - [`SerialProvider`]: real serial ports via `tokio-serial` (feature `serial`)
//! - [`LoopbackProvider`]: in-memory device for simulators and tests
//! - [`TransportSession`]: the open channel (read, write, close)
//! - [`FrameReader`]: splits received bytes into protocol lines
//!
//! # Wire Parameters
//!
//! The firmware talks 115200 baud, 8 data bits, 1 stop bit, no parity and no
//! flow control. [`SerialConfig::default`] matches it.

mod frame;
mod loopback;
#[cfg(feature = "serial")]
mod serial;
mod session;

pub use frame::{DEFAULT_MAX_LINE_LENGTH, FrameReader};
pub use loopback::{LOOPBACK_PORT, LoopbackDevice, LoopbackProvider};
#[cfg(feature = "serial")]
pub use serial::SerialProvider;
pub use session::{DEFAULT_READ_CHUNK_SIZE, ReadEvent, TransportSession};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::TransportError;

/// Baud rate used by the laser firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port configuration.
///
/// Defaults match the laser firmware: 115200 baud, 8N1, no flow control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Baud rate.
    pub baud_rate: u32,
    /// Number of data bits.
    pub data_bits: DataBits,
    /// Number of stop bits.
    pub stop_bits: StopBits,
    /// Parity checking.
    pub parity: Parity,
    /// Flow control.
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// How the port to open is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSelector {
    /// A specific port path (e.g. `/dev/ttyUSB0`, `COM3`).
    Named(String),
    /// The first port the provider lists.
    FirstAvailable,
    /// The first USB port with the given vendor/product id.
    Usb {
        /// USB vendor id.
        vid: u16,
        /// USB product id.
        pid: u16,
    },
}

impl PortSelector {
    /// Selects a port by path.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Picks a port from `ports` according to this selector.
    ///
    /// `Named` selectors are returned as-is even if the port is not listed,
    /// since some platforms do not enumerate every openable path.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PortSelectionFailed`] if nothing matches.
    pub fn resolve(&self, ports: &[PortInfo]) -> Result<String, TransportError> {
        match self {
            Self::Named(name) => Ok(name.clone()),
            Self::FirstAvailable => ports
                .first()
                .map(|p| p.name.clone())
                .ok_or_else(|| TransportError::PortSelectionFailed("no ports available".into())),
            Self::Usb { vid, pid } => ports
                .iter()
                .find(|p| p.vid == Some(*vid) && p.pid == Some(*pid))
                .map(|p| p.name.clone())
                .ok_or_else(|| {
                    TransportError::PortSelectionFailed(format!(
                        "no USB port with id {vid:04x}:{pid:04x}"
                    ))
                }),
        }
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::FirstAvailable => f.write_str("<first available>"),
            Self::Usb { vid, pid } => write!(f, "usb:{vid:04x}:{pid:04x}"),
        }
    }
}

/// Information about an available port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3").
    pub name: String,
    /// USB vendor id, if the port is a USB adapter.
    pub vid: Option<u16>,
    /// USB product id, if the port is a USB adapter.
    pub pid: Option<u16>,
    /// Manufacturer string, if reported.
    pub manufacturer: Option<String>,
    /// Serial number, if reported.
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// Creates port info with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            serial_number: None,
        }
    }

    /// Sets USB ids.
    #[must_use]
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// Readable half of an open device.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable half of an open device.
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The device handle kept alongside the byte streams.
///
/// Closing it is the last teardown step, after both streams were released.
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    /// Releases the device.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// A freshly opened device.
pub struct OpenedDevice {
    /// Name of the opened port.
    pub port_name: String,
    /// Readable byte stream.
    pub reader: ByteReader,
    /// Writable byte stream.
    pub writer: ByteWriter,
    /// Device handle.
    pub handle: Box<dyn DeviceHandle>,
}

impl fmt::Debug for OpenedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedDevice")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

/// Access to devices on the host.
///
/// Implementations exist for real serial ports ([`SerialProvider`]) and an
/// in-memory device ([`LoopbackProvider`]).
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Returns `true` if the host can open devices of this kind.
    fn is_supported(&self) -> bool;

    /// Lists the ports currently available.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if enumeration fails.
    async fn available_ports(&self) -> Result<Vec<PortInfo>, TransportError>;

    /// Resolves a selector to a port name.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PortSelectionFailed`] if no port matches.
    async fn select_port(&self, selector: &PortSelector) -> Result<String, TransportError> {
        let ports = match selector {
            PortSelector::Named(_) => Vec::new(),
            _ => self.available_ports().await?,
        };
        selector.resolve(&ports)
    }

    /// Opens and configures a port.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::OpenFailed`] on configuration or busy-device
    /// errors.
    async fn open(&self, port: &str, config: &SerialConfig)
    -> Result<OpenedDevice, TransportError>;
}
