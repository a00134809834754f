// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device provider.
//!
//! Every [`open`](DeviceProvider::open) creates a fresh in-memory duplex pipe.
//! The host end is handed to the session, the device end is parked until a
//! simulator or test claims it with [`LoopbackProvider::take_device`].

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, DuplexStream, ReadBuf, ReadHalf,
    WriteHalf,
};

use crate::error::TransportError;

use super::{DeviceHandle, DeviceProvider, OpenedDevice, PortInfo, SerialConfig};

/// Name of the single port listed by [`LoopbackProvider::new`].
pub const LOOPBACK_PORT: &str = "loopback0";

const PIPE_CAPACITY: usize = 4096;

#[derive(Debug)]
struct Inner {
    supported: bool,
    ports: Vec<PortInfo>,
    fail_next_open: Option<String>,
    device: Option<LoopbackDevice>,
    closed: Arc<AtomicBool>,
    opened: usize,
}

/// Device provider backed by in-memory pipes.
///
/// Cloning shares the same provider, so a test can keep one clone while the
/// controller owns another.
#[derive(Debug, Clone)]
pub struct LoopbackProvider {
    inner: Arc<Mutex<Inner>>,
}

impl Default for LoopbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackProvider {
    /// Creates a provider listing a single [`LOOPBACK_PORT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_ports(vec![PortInfo::new(LOOPBACK_PORT)])
    }

    /// Creates a provider listing the given ports.
    ///
    /// Any name can still be opened with a named selector.
    #[must_use]
    pub fn with_ports(ports: Vec<PortInfo>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                supported: true,
                ports,
                fail_next_open: None,
                device: None,
                closed: Arc::new(AtomicBool::new(false)),
                opened: 0,
            })),
        }
    }

    /// Creates a provider that reports the host as unsupported.
    #[must_use]
    pub fn unsupported() -> Self {
        let provider = Self::new();
        provider.inner.lock().supported = false;
        provider
    }

    /// Makes the next open fail with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_open = Some(message.into());
    }

    /// Claims the device end of the most recently opened pipe.
    pub fn take_device(&self) -> Option<LoopbackDevice> {
        self.inner.lock().device.take()
    }

    /// Returns `true` once the handle of the last opened pipe was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed.load(Ordering::SeqCst)
    }

    /// Returns how many times a pipe was opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.lock().opened
    }
}

#[async_trait]
impl DeviceProvider for LoopbackProvider {
    fn is_supported(&self) -> bool {
        self.inner.lock().supported
    }

    async fn available_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        Ok(self.inner.lock().ports.clone())
    }

    async fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<OpenedDevice, TransportError> {
        let mut inner = self.inner.lock();

        if let Some(message) = inner.fail_next_open.take() {
            return Err(TransportError::OpenFailed {
                port: port.to_string(),
                message,
            });
        }

        let (host, device) = tokio::io::duplex(PIPE_CAPACITY);
        let (reader, writer) = tokio::io::split(host);
        let faults = Arc::new(Mutex::new(ReadFaults::default()));

        let closed = Arc::new(AtomicBool::new(false));
        inner.closed = Arc::clone(&closed);
        inner.device = Some(LoopbackDevice::new(device, Arc::clone(&faults)));
        inner.opened += 1;

        tracing::debug!(port = %port, baud_rate = config.baud_rate, "Opened loopback pipe");

        Ok(OpenedDevice {
            port_name: port.to_string(),
            reader: Box::new(FaultyReader {
                inner: reader,
                faults,
            }),
            writer: Box::new(writer),
            handle: Box::new(LoopbackHandle { closed }),
        })
    }
}

struct LoopbackHandle {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl DeviceHandle for LoopbackHandle {
    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Read errors queued by [`LoopbackDevice::fail_next_read`].
#[derive(Debug, Default)]
struct ReadFaults {
    queued: VecDeque<io::ErrorKind>,
    waker: Option<Waker>,
}

/// Host-side reader that yields queued faults before pipe data.
struct FaultyReader {
    inner: ReadHalf<DuplexStream>,
    faults: Arc<Mutex<ReadFaults>>,
}

impl AsyncRead for FaultyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        {
            let mut faults = this.faults.lock();
            if let Some(kind) = faults.queued.pop_front() {
                return Poll::Ready(Err(io::Error::new(kind, "simulated read fault")));
            }
            faults.waker = Some(cx.waker().clone());
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

/// The device end of a loopback pipe.
///
/// Lines sent here arrive at the host session; commands the host writes can
/// be read back line by line.
#[derive(Debug)]
pub struct LoopbackDevice {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    faults: Arc<Mutex<ReadFaults>>,
}

impl LoopbackDevice {
    fn new(stream: DuplexStream, faults: Arc<Mutex<ReadFaults>>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
            faults,
        }
    }

    /// Makes the next host read fail with an I/O error of `kind`.
    ///
    /// Calls queue up; each pending fault is returned by one read, ahead of
    /// any data already in the pipe.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        let waker = {
            let mut faults = self.faults.lock();
            faults.queued.push_back(kind);
            faults.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Sends `line` followed by a newline.
    ///
    /// # Errors
    ///
    /// Fails if the host end was closed.
    pub async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.send_bytes(&bytes).await
    }

    /// Sends raw bytes, no terminator added.
    ///
    /// # Errors
    ///
    /// Fails if the host end was closed.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Reads the next line written by the host, without its terminator.
    ///
    /// Returns `None` once the host closed its writer.
    ///
    /// # Errors
    ///
    /// Fails on pipe errors.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Simulates unplugging the device.
    pub fn hang_up(self) {
        tracing::debug!("Loopback device hung up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn pipe_carries_both_directions() {
        let provider = LoopbackProvider::new();
        let mut opened = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap();
        let mut device = provider.take_device().unwrap();

        opened.writer.write_all(b"LASER_ON\n").await.unwrap();
        opened.writer.flush().await.unwrap();
        assert_eq!(device.read_line().await.unwrap().as_deref(), Some("LASER_ON"));

        device.send_line("Laser State: ON").await.unwrap();
        let mut buf = [0u8; 64];
        let n = opened.reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"Laser State: ON\n");
    }

    #[tokio::test]
    async fn hang_up_ends_host_stream() {
        let provider = LoopbackProvider::new();
        let mut opened = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap();
        provider.take_device().unwrap().hang_up();

        let mut buf = [0u8; 8];
        assert_eq!(opened.reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn queued_read_faults_come_before_data() {
        let provider = LoopbackProvider::new();
        let mut opened = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap();
        let mut device = provider.take_device().unwrap();

        device.send_line("ok").await.unwrap();
        device.fail_next_read(io::ErrorKind::InvalidData);

        let mut buf = [0u8; 8];
        let err = opened.reader.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let n = opened.reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ok\n");
    }

    #[tokio::test]
    async fn read_fault_wakes_a_pending_read() {
        let provider = LoopbackProvider::new();
        let mut reader = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap()
            .reader;
        let device = provider.take_device().unwrap();

        let pending = tokio::spawn(async move {
            let mut buf = [0u8; 8];
            reader.read(&mut buf).await
        });
        tokio::task::yield_now().await;

        device.fail_next_read(io::ErrorKind::BrokenPipe);
        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn fail_next_open_applies_once() {
        let provider = LoopbackProvider::new();
        provider.fail_next_open("port in use");

        let err = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::OpenFailed {
                port: LOOPBACK_PORT.to_string(),
                message: "port in use".to_string(),
            }
        );
        assert!(
            provider
                .open(LOOPBACK_PORT, &SerialConfig::default())
                .await
                .is_ok()
        );
        assert_eq!(provider.open_count(), 1);
    }

    #[tokio::test]
    async fn handle_close_is_observable() {
        let provider = LoopbackProvider::new();
        let mut opened = provider
            .open(LOOPBACK_PORT, &SerialConfig::default())
            .await
            .unwrap();
        assert!(!provider.is_closed());
        opened.handle.close().await.unwrap();
        assert!(provider.is_closed());
    }
}
