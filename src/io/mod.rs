// src/io/mod.rs
//
// Byte-stream transport abstraction and the line reassembler that sits on
// top of it. The serial driver is the only real transport; tests replay
// scripted chunks through the same trait.

pub mod reassembler;
pub mod serial;
mod types;

#[cfg(test)]
pub(crate) mod scripted;

pub use reassembler::{LineReassembler, RECEIVE_BUFFER_SIZE};
pub use types::Line;

use crate::error::TransportError;

/// A byte-stream connection to the probe.
///
/// `poll` never blocks for more than a short slice: it returns whatever is
/// available right now, and `Ok(0)` is a normal "nothing yet" answer.
/// Retrying is the caller's business.
pub trait Transport {
    /// Copy up to `buf.len()` available bytes into `buf`.
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `bytes`, blocking until they are handed to the driver.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Human-readable endpoint name for diagnostics (e.g. the port path).
    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).poll(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
