// src/io/reassembler.rs
//
// Turns the probe's byte stream into newline-terminated lines.
//
// Reads arrive in arbitrary chunks: a line may span several polls and a
// terminator may arrive on its own. The reassembler owns the receive buffer,
// its two cursors and the partial-line accumulator, and carries all of them
// across calls so that no byte is lost or duplicated.

use crate::cancel::CancelToken;
use crate::error::TransportError;
use crate::pacing::Pacing;

use super::{Line, Transport};

/// Receive buffer capacity, which is also the longest line we accept.
pub const RECEIVE_BUFFER_SIZE: usize = 4096;

const LINE_END: u8 = b'\n';

/// Per-connection reassembly state.
pub struct LineReassembler {
    buf: Box<[u8]>,
    /// Bytes held from the last poll.
    length: usize,
    /// Bytes of `buf[..length]` already copied out.
    read_pos: usize,
    /// Line under construction; survives timeouts.
    partial: Vec<u8>,
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::with_capacity(RECEIVE_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LineReassembler {
            buf: vec![0u8; capacity].into_boxed_slice(),
            length: 0,
            read_pos: 0,
            partial: Vec::with_capacity(capacity),
        }
    }

    /// Bytes received but not yet copied into a line.
    pub fn buffered(&self) -> usize {
        self.length - self.read_pos
    }

    /// Bytes of an unterminated line carried over from earlier calls.
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }

    /// Return the next complete line, or `None` if the probe went quiet.
    ///
    /// When the buffer is empty the transport is polled, sleeping one unit
    /// between empty polls, for at most `pacing.poll_max_wait` units. A
    /// `None` is a timeout rather than an error: any partial line stays
    /// buffered and the next call picks up where this one stopped.
    pub fn next_line<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        pacing: &Pacing,
        cancel: &CancelToken,
    ) -> Result<Option<Line>, TransportError> {
        loop {
            if self.read_pos >= self.length {
                self.length = 0;
                self.read_pos = 0;
                if !self.fill(transport, pacing, cancel)? {
                    return Ok(None);
                }
            }

            if let Some(line) = self.copy_forward() {
                return Ok(Some(line));
            }
            // Buffer ran out mid-line; poll for the continuation.
        }
    }

    /// Poll until bytes arrive. Returns `false` on timeout or cancellation.
    fn fill<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        pacing: &Pacing,
        cancel: &CancelToken,
    ) -> Result<bool, TransportError> {
        let mut waited = 0u32;
        loop {
            let n = transport.poll(&mut self.buf)?;
            if n > 0 {
                self.length = n.min(self.buf.len());
                self.read_pos = 0;
                return Ok(true);
            }
            if waited >= pacing.poll_max_wait || cancel.is_cancelled() {
                return Ok(false);
            }
            if !cancel.sleep(pacing.unit) {
                return Ok(false);
            }
            waited += 1;
        }
    }

    /// Copy from `read_pos` until a terminator or the end of the buffer.
    fn copy_forward(&mut self) -> Option<Line> {
        let capacity = self.buf.len();
        while self.read_pos < self.length {
            let byte = self.buf[self.read_pos];
            self.read_pos += 1;
            self.partial.push(byte);

            if byte == LINE_END {
                return Some(Line::new(self.take_partial()));
            }
            if self.partial.len() >= capacity {
                tlog!(
                    "[reassembler] No line end within {} bytes, splitting line",
                    capacity
                );
                return Some(Line::forced(self.take_partial()));
            }
        }
        None
    }

    fn take_partial(&mut self) -> Vec<u8> {
        if self.read_pos >= self.length {
            self.length = 0;
            self.read_pos = 0;
        }
        std::mem::replace(&mut self.partial, Vec::with_capacity(self.buf.len()))
    }
}
