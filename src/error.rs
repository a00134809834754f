// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `laserctl` library.
//!
//! This module provides the error hierarchy used across the library: value
//! validation, transport communication, line decoding, and controller
//! lifecycle failures.

use thiserror::Error;

use crate::state::ConnectionState;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the transport to the device.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while decoding a protocol line.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A connect or disconnect is already in flight.
    #[error("controller is busy (connection state: {0})")]
    Busy(ConnectionState),

    /// A command was issued without an open session.
    #[error("device is not connected")]
    NotConnected,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),
}

/// Errors raised by the device transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The host has no serial capability.
    #[error("serial transport is not supported on this host")]
    Unsupported,

    /// Port selection was cancelled or matched nothing.
    #[error("port selection failed: {0}")]
    PortSelectionFailed(String),

    /// The port could not be opened or configured.
    #[error("failed to open {port}: {message}")]
    OpenFailed {
        /// Port that was being opened.
        port: String,
        /// Underlying failure.
        message: String,
    },

    /// Writing to the device failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Reading from the device failed.
    #[error("read failed: {message}")]
    ReadFailed {
        /// Underlying failure.
        message: String,
        /// `true` when the failure means the device went away.
        disconnected: bool,
    },

    /// The session is not open.
    #[error("session is not open")]
    NotOpen,
}

impl TransportError {
    /// Returns `true` if this error signals that the device was removed.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ReadFailed {
                disconnected: true,
                ..
            }
        )
    }

    /// Builds a [`TransportError::ReadFailed`] from an I/O error, classifying
    /// removal-type failures as disconnects.
    #[must_use]
    pub fn from_read_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        let disconnected = matches!(
            err.kind(),
            ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::UnexpectedEof
        );
        Self::ReadFailed {
            message: err.to_string(),
            disconnected,
        }
    }
}

/// Errors related to decoding device lines.
///
/// None of these are fatal; the offending line is logged and skipped.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A structured message carried fields of the wrong shape.
    #[error("malformed structured message: {0}")]
    Json(#[from] serde_json::Error),

    /// No structured or legacy rule recognised the line.
    #[error("unrecognized line: {0}")]
    UnrecognizedLine(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn error_from_transport_error() {
        let err: Error = TransportError::WriteFailed("gone".to_string()).into();
        assert!(matches!(
            err,
            Error::Transport(TransportError::WriteFailed(_))
        ));
    }

    #[test]
    fn read_io_classification() {
        let gone = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(TransportError::from_read_io(&gone).is_disconnect());

        let other = std::io::Error::other("framing error");
        assert!(!TransportError::from_read_io(&other).is_disconnect());
    }

    #[test]
    fn not_open_display() {
        let err: Error = TransportError::NotOpen.into();
        assert_eq!(err.to_string(), "transport error: session is not open");
    }

    #[test]
    fn busy_error_display() {
        let err = Error::Busy(ConnectionState::Connecting);
        assert_eq!(
            err.to_string(),
            "controller is busy (connection state: connecting)"
        );
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::UnrecognizedLine("garbage".to_string());
        assert_eq!(err.to_string(), "unrecognized line: garbage");
    }
}
