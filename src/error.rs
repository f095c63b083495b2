// src/error.rs
//
// Error types for the probe link. Transport and sink errors are fatal and
// propagate to `run()`; everything recoverable is absorbed by retry loops.

use std::path::PathBuf;

/// Errors raised by the byte-stream transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The port could not be opened or configured.
    #[error("cannot open {port}: {reason}")]
    Open { port: String, reason: String },

    /// A directive could not be written to the probe.
    #[error("write to {port} failed: {source}")]
    Write {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// The port failed while polling for bytes.
    #[error("read from {port} failed: {source}")]
    Read {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// The port went away (zero-length read).
    #[error("{port} disconnected")]
    Disconnected { port: String },

    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(String),
}

impl TransportError {
    pub fn open(port: &str, reason: impl std::fmt::Display) -> Self {
        TransportError::Open {
            port: port.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while verifying the probe's identity.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operator interrupted the handshake before the probe answered.
    #[error("handshake cancelled before the probe responded")]
    Cancelled,
}

/// Errors raised by an output sink. All of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("cannot write to {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    #[error("database {path}: {source}")]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The line is not a well-formed value tuple.
    #[error("malformed record at byte {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    #[error("record has {got} values but the table has only {max} columns")]
    TooManyValues { got: usize, max: usize },
}

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Framing strings look like `8N1`: data bits, parity letter, stop bits.
    #[error("invalid framing '{0}' (expected e.g. 8N1, 7E1)")]
    Framing(String),

    #[error("{0}")]
    Invalid(String),
}

/// Top-level error for a station run. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
