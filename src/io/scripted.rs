// src/io/scripted.rs
//
// Test transport: replays a script of poll results and records every write.

use std::collections::VecDeque;
use std::time::Instant;

use super::Transport;
use crate::cancel::CancelToken;
use crate::error::TransportError;

pub(crate) struct ScriptedTransport {
    /// Each entry answers one poll; an empty chunk is an empty poll.
    chunks: VecDeque<Vec<u8>>,
    /// Bytes every write sent, in order.
    pub written: Vec<u8>,
    /// When each write happened, with its bytes.
    pub sent_at: Vec<(Instant, Vec<u8>)>,
    /// Number of poll calls.
    pub polls: usize,
    /// Cancelled as soon as the script runs dry.
    cancel_when_exhausted: Option<CancelToken>,
    /// Scripted replies keyed by the directive that triggers them.
    replies: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
    /// Writes accepted before every further write fails.
    fail_after: Option<usize>,
}

impl ScriptedTransport {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        ScriptedTransport {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            written: Vec::new(),
            sent_at: Vec::new(),
            polls: 0,
            cancel_when_exhausted: None,
            replies: Vec::new(),
            fail_after: None,
        }
    }

    /// Cancel `token` on the first poll after the script is used up.
    pub fn cancel_when_exhausted(mut self, token: &CancelToken) -> Self {
        self.cancel_when_exhausted = Some(token.clone());
        self
    }

    /// Queue `chunks` every time `directive` is written.
    pub fn reply_to<C: AsRef<[u8]>>(mut self, directive: &[u8], chunks: &[C]) -> Self {
        self.replies.push((
            directive.to_vec(),
            chunks.iter().map(|c| c.as_ref().to_vec()).collect(),
        ));
        self
    }

    pub fn fail_writes(self) -> Self {
        self.fail_writes_after(0)
    }

    /// Accept `n` writes, then fail every write after that.
    pub fn fail_writes_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// How many times `directive` appears in the write log.
    pub fn count_written(&self, directive: &[u8]) -> usize {
        self.written
            .windows(directive.len())
            .filter(|w| *w == directive)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.polls += 1;
        match self.chunks.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > buf.len() {
                    let rest = chunk.split_off(buf.len());
                    self.chunks.push_front(rest);
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => {
                if let Some(token) = &self.cancel_when_exhausted {
                    token.cancel();
                }
                Ok(0)
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_after.is_some_and(|n| self.sent_at.len() >= n) {
            return Err(TransportError::Write {
                port: "scripted".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted failure"),
            });
        }
        self.sent_at.push((Instant::now(), bytes.to_vec()));
        self.written.extend_from_slice(bytes);
        for (directive, reply) in &self.replies {
            if directive.as_slice() == bytes {
                self.chunks.extend(reply.iter().cloned());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
