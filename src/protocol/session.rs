// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The open channel to the device.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

use super::{
    ByteReader, ByteWriter, DeviceHandle, DeviceProvider, OpenedDevice, PortInfo, PortSelector,
    SerialConfig,
};

/// Default number of bytes requested per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Upper bound for each teardown step that has to wait on the device.
const CLOSE_STEP_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a successful [`TransportSession::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// Bytes received from the device.
    Data(Vec<u8>),
    /// The device closed the stream.
    EndOfStream,
    /// The read was cancelled by [`TransportSession::close`], or no session
    /// is open.
    Cancelled,
}

/// Owns the reader, writer and handle of one open device.
///
/// Reads and writes may run concurrently from different tasks: the reader and
/// writer sit behind separate async mutexes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use laserctl_lib::protocol::{LoopbackProvider, PortSelector, ReadEvent, TransportSession};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), laserctl_lib::error::TransportError> {
/// let provider = LoopbackProvider::new();
/// let session = TransportSession::new(Arc::new(provider.clone()), Default::default());
/// session.open(&PortSelector::FirstAvailable).await?;
///
/// let mut device = provider.take_device().unwrap();
/// device.send_line("hello").await.unwrap();
/// assert_eq!(session.read().await?, ReadEvent::Data(b"hello\n".to_vec()));
///
/// session.close().await;
/// assert!(!session.is_open());
/// # Ok(())
/// # }
/// ```
pub struct TransportSession {
    provider: Arc<dyn DeviceProvider>,
    config: SerialConfig,
    chunk_size: usize,
    port_name: RwLock<Option<String>>,
    cancel: Mutex<CancellationToken>,
    reader: tokio::sync::Mutex<Option<ByteReader>>,
    writer: tokio::sync::Mutex<Option<ByteWriter>>,
    handle: tokio::sync::Mutex<Option<Box<dyn DeviceHandle>>>,
}

impl TransportSession {
    /// Creates a closed session on top of a device provider.
    #[must_use]
    pub fn new(provider: Arc<dyn DeviceProvider>, config: SerialConfig) -> Self {
        Self::with_chunk_size(provider, config, DEFAULT_READ_CHUNK_SIZE)
    }

    /// Creates a closed session that requests `chunk_size` bytes per read.
    #[must_use]
    pub fn with_chunk_size(
        provider: Arc<dyn DeviceProvider>,
        config: SerialConfig,
        chunk_size: usize,
    ) -> Self {
        Self {
            provider,
            config,
            chunk_size: chunk_size.max(1),
            port_name: RwLock::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            reader: tokio::sync::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns the name of the open port, if any.
    #[must_use]
    pub fn port_name(&self) -> Option<String> {
        self.port_name.read().clone()
    }

    /// Returns `true` while a device is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.port_name.read().is_some()
    }

    /// Lists the ports the underlying provider can see.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if enumeration fails.
    pub async fn available_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        self.provider.available_ports().await
    }

    /// Selects, opens and configures a device.
    ///
    /// Returns the name of the opened port.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Unsupported`] if the host has no serial capability
    /// - [`TransportError::PortSelectionFailed`] if selection fails
    /// - [`TransportError::OpenFailed`] if the port cannot be opened, or a
    ///   session is already open
    pub async fn open(&self, selector: &PortSelector) -> Result<String, TransportError> {
        if let Some(port) = self.port_name() {
            return Err(TransportError::OpenFailed {
                port,
                message: "session already open".to_string(),
            });
        }

        if !self.provider.is_supported() {
            return Err(TransportError::Unsupported);
        }

        let port = self.provider.select_port(selector).await?;
        tracing::debug!(port = %port, baud_rate = self.config.baud_rate, "Opening device");

        let OpenedDevice {
            port_name,
            reader,
            writer,
            handle,
        } = self.provider.open(&port, &self.config).await?;

        *self.reader.lock().await = Some(reader);
        *self.writer.lock().await = Some(writer);
        *self.handle.lock().await = Some(handle);
        *self.cancel.lock() = CancellationToken::new();
        *self.port_name.write() = Some(port_name.clone());

        tracing::info!(port = %port_name, "Device opened");
        Ok(port_name)
    }

    /// Waits for the next chunk of bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReadFailed`] on I/O errors; check
    /// [`TransportError::is_disconnect`] to tell device removal apart.
    pub async fn read(&self) -> Result<ReadEvent, TransportError> {
        let cancel = self.cancel.lock().clone();
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(ReadEvent::Cancelled);
        };

        let mut buf = vec![0u8; self.chunk_size];
        tokio::select! {
            biased;

            () = cancel.cancelled() => Ok(ReadEvent::Cancelled),

            result = reader.read(&mut buf) => match result {
                Ok(0) => Ok(ReadEvent::EndOfStream),
                Ok(n) => {
                    buf.truncate(n);
                    tracing::trace!(bytes = n, "Received data");
                    Ok(ReadEvent::Data(buf))
                }
                Err(e) => Err(TransportError::from_read_io(&e)),
            },
        }
    }

    /// Writes all bytes and flushes them to the device.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotOpen`] if no session is open
    /// - [`TransportError::WriteFailed`] if the write fails
    pub async fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotOpen)?;

        writer
            .write_all(bytes)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        tracing::trace!(bytes = bytes.len(), "Sent data");
        Ok(())
    }

    /// Wakes a pending [`read`](Self::read) with [`ReadEvent::Cancelled`]
    /// without releasing the device.
    ///
    /// Usable from synchronous contexts such as `Drop`.
    pub fn cancel_read(&self) {
        self.cancel.lock().cancel();
    }

    /// Tears the session down. Safe to call when already closed.
    ///
    /// Steps run in order (cancel pending read, release reader, close writer,
    /// close device handle) and a failing step never stops the next one.
    pub async fn close(&self) {
        let port = self.port_name.write().take();
        let port = port.as_deref().unwrap_or("<none>");

        self.cancel.lock().cancel();

        if self.reader.lock().await.take().is_some() {
            tracing::debug!(port = %port, "Reader released");
        }

        match tokio::time::timeout(CLOSE_STEP_TIMEOUT, self.writer.lock()).await {
            Ok(mut guard) => {
                if let Some(mut writer) = guard.take() {
                    match tokio::time::timeout(CLOSE_STEP_TIMEOUT, writer.shutdown()).await {
                        Ok(Ok(())) => tracing::debug!(port = %port, "Writer closed"),
                        Ok(Err(e)) => {
                            tracing::warn!(port = %port, error = %e, "Failed to close writer (continuing anyway)");
                        }
                        Err(_) => {
                            tracing::warn!(port = %port, "Timed out closing writer (continuing anyway)");
                        }
                    }
                }
            }
            Err(_) => tracing::warn!(port = %port, "Writer busy, abandoning it"),
        }

        let handle = self.handle.lock().await.take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(CLOSE_STEP_TIMEOUT, handle.close()).await {
                Ok(Ok(())) => tracing::info!(port = %port, "Device closed"),
                Ok(Err(e)) => {
                    tracing::warn!(port = %port, error = %e, "Failed to close device (continuing anyway)");
                }
                Err(_) => tracing::warn!(port = %port, "Timed out closing device"),
            }
        }
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("port_name", &self.port_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
