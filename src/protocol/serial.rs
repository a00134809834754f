// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial port access via `tokio-serial`.

use async_trait::async_trait;
use tokio_serial::{SerialPortBuilderExt, SerialPortType};

use crate::error::TransportError;

use super::{
    DataBits, DeviceHandle, DeviceProvider, FlowControl, OpenedDevice, Parity, PortInfo,
    SerialConfig, StopBits,
};

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => Self::Five,
            DataBits::Six => Self::Six,
            DataBits::Seven => Self::Seven,
            DataBits::Eight => Self::Eight,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => Self::One,
            StopBits::Two => Self::Two,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => Self::None,
            Parity::Odd => Self::Odd,
            Parity::Even => Self::Even,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => Self::None,
            FlowControl::Software => Self::Software,
            FlowControl::Hardware => Self::Hardware,
        }
    }
}

/// Device provider for the host's serial ports.
///
/// # Examples
///
/// ```no_run
/// use laserctl_lib::protocol::{DeviceProvider, SerialProvider};
///
/// # async fn example() -> Result<(), laserctl_lib::error::TransportError> {
/// for port in SerialProvider::new().available_ports().await? {
///     println!("{} {:?}", port.name, port.manufacturer);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialProvider;

impl SerialProvider {
    /// Creates a serial provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn port_info(port: tokio_serial::SerialPortInfo) -> PortInfo {
    let info = PortInfo::new(port.port_name);
    match port.port_type {
        SerialPortType::UsbPort(usb_info) => {
            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
            info.manufacturer = usb_info.manufacturer;
            info.serial_number = usb_info.serial_number;
            info
        }
        _ => info,
    }
}

#[async_trait]
impl DeviceProvider for SerialProvider {
    fn is_supported(&self) -> bool {
        cfg!(any(unix, windows))
    }

    async fn available_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        let ports = tokio_serial::available_ports().map_err(|e| {
            TransportError::PortSelectionFailed(format!("failed to enumerate ports: {e}"))
        })?;
        tracing::debug!(count = ports.len(), "Enumerated serial ports");
        Ok(ports.into_iter().map(port_info).collect())
    }

    async fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<OpenedDevice, TransportError> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                TransportError::OpenFailed {
                    port: port.to_string(),
                    message: e.to_string(),
                }
            })?;

        let (reader, writer) = tokio::io::split(stream);

        Ok(OpenedDevice {
            port_name: port.to_string(),
            reader: Box::new(reader),
            writer: Box::new(writer),
            handle: Box::new(SerialHandle {
                port_name: port.to_string(),
            }),
        })
    }
}

/// Marks the end of a serial session.
///
/// The port itself is released when both stream halves are dropped, which
/// the session does before closing the handle.
struct SerialHandle {
    port_name: String,
}

#[async_trait]
impl DeviceHandle for SerialHandle {
    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::debug!(port = %self.port_name, "Serial port released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_conversions() {
        assert_eq!(
            tokio_serial::DataBits::from(DataBits::Eight),
            tokio_serial::DataBits::Eight
        );
        assert_eq!(
            tokio_serial::StopBits::from(StopBits::Two),
            tokio_serial::StopBits::Two
        );
        assert_eq!(
            tokio_serial::Parity::from(Parity::Even),
            tokio_serial::Parity::Even
        );
        assert_eq!(
            tokio_serial::FlowControl::from(FlowControl::Hardware),
            tokio_serial::FlowControl::Hardware
        );
    }

    #[test]
    fn usb_port_info_is_mapped() {
        let info = port_info(tokio_serial::SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(tokio_serial::UsbPortInfo {
                vid: 0x10c4,
                pid: 0xea60,
                serial_number: Some("0001".to_string()),
                manufacturer: Some("Silicon Labs".to_string()),
                product: None,
            }),
        });
        assert_eq!(info.name, "/dev/ttyUSB0");
        assert_eq!(info.vid, Some(0x10c4));
        assert_eq!(info.pid, Some(0xea60));
        assert_eq!(info.manufacturer.as_deref(), Some("Silicon Labs"));
        assert_eq!(info.serial_number.as_deref(), Some("0001"));
    }

    #[tokio::test]
    async fn open_missing_port_fails() {
        let err = SerialProvider::new()
            .open("/dev/laserctl-does-not-exist", &SerialConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::OpenFailed { .. }));
    }
}
