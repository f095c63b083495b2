// src/probe/handshake.rs
//
// Confirms that the other end of the port is running weather probe firmware
// before any sampling starts.
//
// After the port opens we don't know what is listening, whether the serial
// settings agree, or whether stale bytes are sitting in the pipe. So: let the
// board boot, throw away whatever is buffered, then ask "who are you" until
// the answer starts with the probe's product code. There is no retry cap; a
// slow-booting probe is normal, and only the operator ends the wait.

use crate::cancel::CancelToken;
use crate::error::HandshakeError;
use crate::io::{Transport, RECEIVE_BUFFER_SIZE};
use crate::pacing::Pacing;

use super::{IDENTITY_PREFIX, WHO_ARE_YOU};

/// What the probe told us about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeIdentity {
    /// First line of the reply, e.g. `WP5.1 DB3.0`.
    pub banner: String,
    /// Identity queries sent, including the successful one.
    pub attempts: u32,
    /// Replies that did not carry the product code.
    pub invalid_replies: u32,
    /// Queries that got no reply at all.
    pub silent_polls: u32,
}

/// Run the identity exchange on an already-open transport.
pub fn identify<T: Transport + ?Sized>(
    transport: &mut T,
    pacing: &Pacing,
    cancel: &CancelToken,
) -> Result<ProbeIdentity, HandshakeError> {
    if !cancel.sleep(pacing.units(pacing.port_settle)) {
        return Err(HandshakeError::Cancelled);
    }

    let mut scratch = vec![0u8; RECEIVE_BUFFER_SIZE];
    let stale = transport.poll(&mut scratch)?;
    if stale > 0 {
        tlog!("[handshake] Discarded {} stale bytes", stale);
    }

    let mut attempts = 0u32;
    let mut invalid_replies = 0u32;
    let mut silent_polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            tlog!("[handshake] Cancelled after {} tries", attempts);
            return Err(HandshakeError::Cancelled);
        }

        transport.write(WHO_ARE_YOU)?;
        attempts += 1;
        if !cancel.sleep(pacing.unit) {
            continue;
        }

        let n = transport.poll(&mut scratch)?;
        if n == 0 {
            silent_polls += 1;
            tlog!(
                "[handshake] No response from {} after {} tries",
                transport.name(),
                attempts
            );
            continue;
        }

        let reply = &scratch[..n];
        if is_probe_banner(reply) {
            let banner = first_line(reply);
            tlog!(
                "[handshake] Probe on {} identified as '{}' after {} tries",
                transport.name(),
                banner,
                attempts
            );
            return Ok(ProbeIdentity {
                banner,
                attempts,
                invalid_replies,
                silent_polls,
            });
        }

        invalid_replies += 1;
        tlog!(
            "[handshake] Invalid response after {} tries: '{}'",
            attempts,
            first_line(reply)
        );
    }
}

/// Whether a reply starts with the probe's two-letter product code.
pub fn is_probe_banner(reply: &[u8]) -> bool {
    reply.len() >= IDENTITY_PREFIX.len()
        && reply[..IDENTITY_PREFIX.len()].eq_ignore_ascii_case(IDENTITY_PREFIX)
}

fn first_line(reply: &[u8]) -> String {
    let end = reply
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .unwrap_or(reply.len());
    String::from_utf8_lossy(&reply[..end]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::scripted::ScriptedTransport;

    #[test]
    fn test_is_probe_banner() {
        assert!(is_probe_banner(b"WP5.1 DB3.0\n"));
        assert!(is_probe_banner(b"wp"));
        assert!(is_probe_banner(b"Wp4.3"));
        assert!(!is_probe_banner(b"ER whoops\n"));
        assert!(!is_probe_banner(b"W"));
        assert!(!is_probe_banner(b""));
    }

    #[test]
    fn test_accepts_probe_banner_first_time() {
        let mut t = ScriptedTransport::new(["", "WP5.1 DB3.0\r\n"]);
        let id = identify(&mut t, &Pacing::immediate(), &CancelToken::new()).unwrap();
        assert_eq!(id.banner, "WP5.1 DB3.0");
        assert_eq!(id.attempts, 1);
        assert_eq!(t.written, WHO_ARE_YOU.to_vec());
    }

    #[test]
    fn test_invalid_and_silent_replies_are_retried_separately() {
        // stale-discard poll, then one reply per query
        let mut t = ScriptedTransport::new(["", "ER whoops\n", "", "WP5.1 ...\n"]);
        let id = identify(&mut t, &Pacing::immediate(), &CancelToken::new()).unwrap();
        assert_eq!(id.attempts, 3);
        assert_eq!(id.invalid_replies, 1);
        assert_eq!(id.silent_polls, 1);
        assert_eq!(id.banner, "WP5.1 ...");
        assert_eq!(t.count_written(WHO_ARE_YOU), 3);
    }

    #[test]
    fn test_stale_bytes_are_discarded() {
        // A stale banner sitting in the pipe must not count as the answer.
        let mut t = ScriptedTransport::new(["WP old junk", "", "wp5.1\n"]);
        let id = identify(&mut t, &Pacing::immediate(), &CancelToken::new()).unwrap();
        assert_eq!(id.attempts, 2);
        assert_eq!(id.silent_polls, 1);
        assert_eq!(id.banner, "wp5.1");
    }

    #[test]
    fn test_cancel_ends_unbounded_wait() {
        let cancel = CancelToken::new();
        let mut t = ScriptedTransport::new(["", "", "", ""]).cancel_when_exhausted(&cancel);
        let err = identify(&mut t, &Pacing::immediate(), &cancel).unwrap_err();
        assert!(matches!(err, HandshakeError::Cancelled));
        assert_eq!(t.count_written(WHO_ARE_YOU), 4);
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mut t = ScriptedTransport::new([""]).fail_writes();
        let err = identify(&mut t, &Pacing::immediate(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, HandshakeError::Transport(_)));
    }
}
