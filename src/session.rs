// src/session.rs
//
// Session controller: handshake, mode negotiation, then the
// sample → drain → dispatch loop until cancelled or the sample limit is hit.
//
//   Idle → Handshaking → ModeNegotiated → Sampling ⇄ Draining
//        → Closing → Terminated
//
// Everything runs on the caller's thread. The only suspension points are the
// reassembler's bounded poll wait, the handshake retry wait and the sleep
// between cycles; all of them observe the cancel token.

use crate::cancel::CancelToken;
use crate::error::{HandshakeError, StationError};
use crate::io::{Line, LineReassembler, Transport};
use crate::pacing::Pacing;
use crate::probe::{self, ModeProfile, ProbeIdentity, SAMPLE};
use crate::sinks::Sink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handshaking,
    ModeNegotiated,
    Sampling,
    Draining,
    Closing,
    Terminated,
}

/// Why the session stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Operator interrupt.
    Cancelled,
    /// The configured number of cycles completed.
    LimitReached,
}

/// Totals reported when a session ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub identity: Option<ProbeIdentity>,
    pub cycles: u64,
    pub lines: u64,
    pub shape_warnings: u64,
    pub stop_reason: StopReason,
}

pub struct Session<T: Transport> {
    transport: T,
    reassembler: LineReassembler,
    profile: ModeProfile,
    sink: Box<dyn Sink>,
    pacing: Pacing,
    cancel: CancelToken,
    sample_limit: Option<u64>,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(
        transport: T,
        profile: ModeProfile,
        sink: Box<dyn Sink>,
        pacing: Pacing,
        cancel: CancelToken,
    ) -> Self {
        Session {
            transport,
            reassembler: LineReassembler::new(),
            profile,
            sink,
            pacing,
            cancel,
            sample_limit: None,
            state: SessionState::Idle,
        }
    }

    /// Stop after `limit` completed cycles.
    pub fn with_sample_limit(mut self, limit: Option<u64>) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn enter(&mut self, next: SessionState) {
        self.state = next;
    }

    /// Run the whole session. A cancelled handshake ends the session
    /// without touching the sink; every other error is fatal.
    pub fn run(&mut self) -> Result<SessionSummary, StationError> {
        self.enter(SessionState::Handshaking);
        let identity = match probe::identify(&mut self.transport, &self.pacing, &self.cancel) {
            Ok(id) => id,
            Err(HandshakeError::Cancelled) => {
                self.enter(SessionState::Terminated);
                return Ok(SessionSummary {
                    identity: None,
                    cycles: 0,
                    lines: 0,
                    shape_warnings: 0,
                    stop_reason: StopReason::Cancelled,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.transport.write(self.profile.startup_directive)?;
        self.enter(SessionState::ModeNegotiated);
        tlog!(
            "[session] Probe set to {} mode, sink: {}",
            self.profile.mode.label(),
            self.sink.name()
        );
        self.cancel.sleep(self.pacing.units(self.pacing.mode_settle));

        let mut summary = SessionSummary {
            identity: Some(identity),
            cycles: 0,
            lines: 0,
            shape_warnings: 0,
            stop_reason: StopReason::Cancelled,
        };

        let outcome = self.sample_loop(&mut summary);
        if let Err(e) = outcome {
            tlog!("[session] Stopping after error: {}", e);
            return Err(e);
        }

        self.close()?;
        tlog!(
            "[session] Finished: {} cycles, {} lines, {} shape warnings ({:?})",
            summary.cycles,
            summary.lines,
            summary.shape_warnings,
            summary.stop_reason
        );
        Ok(summary)
    }

    fn sample_loop(&mut self, summary: &mut SessionSummary) -> Result<(), StationError> {
        loop {
            if self.cancel.is_cancelled() {
                summary.stop_reason = StopReason::Cancelled;
                return Ok(());
            }
            if let Some(limit) = self.sample_limit {
                if summary.cycles >= limit {
                    summary.stop_reason = StopReason::LimitReached;
                    return Ok(());
                }
            }

            self.enter(SessionState::Sampling);
            self.transport.write(SAMPLE)?;
            self.cancel.sleep(self.pacing.units(self.pacing.sample_settle));

            self.enter(SessionState::Draining);
            let drained = self.drain(summary)?;
            summary.cycles += 1;
            if drained == 0 {
                tlog!("[session] No data from probe for sample {}", summary.cycles);
            }

            self.enter(SessionState::Sampling);
            let limit_hit = self
                .sample_limit
                .map(|limit| summary.cycles >= limit)
                .unwrap_or(false);
            if !limit_hit {
                // The period already leaves room for settle and drain time.
                self.cancel.sleep(self.pacing.units(self.pacing.sample_period));
            }
        }
    }

    /// Pull every line the probe produced for this sample and dispatch it.
    fn drain(&mut self, summary: &mut SessionSummary) -> Result<u64, StationError> {
        let mut drained = 0;
        while let Some(line) =
            self.reassembler
                .next_line(&mut self.transport, &self.pacing, &self.cancel)?
        {
            if !self.profile.line_shape.matches(line.as_bytes()) {
                // Forwarded anyway: the sink decides whether it can use it.
                summary.shape_warnings += 1;
                tlog!(
                    "[session] Data line formatted incorrectly for {} mode: {}",
                    self.profile.mode.label(),
                    line
                );
            }
            self.sink.emit(&line)?;
            drained += 1;
            summary.lines += 1;
        }
        Ok(drained)
    }

    fn close(&mut self) -> Result<(), StationError> {
        self.enter(SessionState::Closing);
        if let Some(closing) = self.profile.closing {
            self.sink.emit(&Line::new(closing.to_vec()))?;
        }
        self.enter(SessionState::Terminated);
        Ok(())
    }
}
