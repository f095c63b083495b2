// src/io/types.rs
//
// Protocol line type shared by the reassembler, the session and the sinks.

use std::fmt;

/// One newline-terminated unit of probe output.
///
/// The terminator is kept: sinks write the bytes exactly as the probe sent
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
    /// Set when the line was cut at buffer capacity instead of a newline.
    forced_split: bool,
}

impl Line {
    pub fn new(bytes: Vec<u8>) -> Self {
        Line {
            bytes,
            forced_split: false,
        }
    }

    pub(crate) fn forced(bytes: Vec<u8>) -> Self {
        Line {
            bytes,
            forced_split: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_forced_split(&self) -> bool {
        self.forced_split
    }

    /// Line content without the trailing `\n` or `\r\n`.
    pub fn trimmed(&self) -> &[u8] {
        let mut end = self.bytes.len();
        if end > 0 && self.bytes[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.bytes[end - 1] == b'\r' {
            end -= 1;
        }
        &self.bytes[..end]
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s.as_bytes().to_vec())
    }
}

/// Lossy text rendering, without the terminator, for log messages.
impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.trimmed()))
    }
}
