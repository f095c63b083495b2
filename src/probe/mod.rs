// src/probe/mod.rs
//
// Weather probe command set and operating modes.
//
// The probe firmware answers a small line-oriented command language. The
// literals below are a contract with that firmware and must match
// byte-for-byte.

pub mod handshake;

pub use handshake::{identify, ProbeIdentity};

/// Identity query. The probe answers with its banner, e.g. `WP5.1 DB3.0`.
pub const WHO_ARE_YOU: &[u8] = b"WhoRU\n";

/// Take one sample and report it in the negotiated format.
pub const SAMPLE: &[u8] = b"sample\n";

/// Product code every probe banner starts with (compared case-insensitively).
pub const IDENTITY_PREFIX: &[u8; 2] = b"wp";

/// Closing tag for the markup document the probe opens on `xmlstart`.
pub const MARKUP_CLOSING_TAG: &[u8] = b"</samples>\n";

/// Output format the probe is asked to produce, chosen once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    None,
    /// Human-readable report printed to stdout.
    Report,
    /// One SQL value tuple per sample, stored in SQLite.
    RecordStore,
    /// XML document appended to a file.
    Markup,
}

impl Mode {
    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::None => ModeProfile {
                mode: self,
                startup_directive: b"\n",
                line_shape: LineShape::Any,
                closing: None,
            },
            Mode::Report => ModeProfile {
                mode: self,
                startup_directive: b"report\n",
                line_shape: LineShape::Any,
                closing: None,
            },
            Mode::RecordStore => ModeProfile {
                mode: self,
                startup_directive: b"csv\n",
                line_shape: LineShape::Prefix(b"('"),
                closing: None,
            },
            Mode::Markup => ModeProfile {
                mode: self,
                startup_directive: b"xmlstart\n",
                line_shape: LineShape::Prefix(b"<"),
                closing: Some(MARKUP_CLOSING_TAG),
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Report => "report",
            Mode::RecordStore => "record-store",
            Mode::Markup => "markup",
        }
    }
}

/// Expected shape of a data line in a given mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineShape {
    Any,
    Prefix(&'static [u8]),
}

impl LineShape {
    pub fn matches(self, line: &[u8]) -> bool {
        match self {
            LineShape::Any => true,
            LineShape::Prefix(p) => line.starts_with(p),
        }
    }
}

/// Everything about a mode the session needs, fixed at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeProfile {
    pub mode: Mode,
    /// Sent once after the handshake.
    pub startup_directive: &'static [u8],
    pub line_shape: LineShape,
    /// Appended to the sink once at shutdown.
    pub closing: Option<&'static [u8]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_directives() {
        assert_eq!(Mode::None.profile().startup_directive, b"\n");
        assert_eq!(Mode::Report.profile().startup_directive, b"report\n");
        assert_eq!(Mode::RecordStore.profile().startup_directive, b"csv\n");
        assert_eq!(Mode::Markup.profile().startup_directive, b"xmlstart\n");
    }

    #[test]
    fn test_line_shapes() {
        let store = Mode::RecordStore.profile().line_shape;
        assert!(store.matches(b"('2024-01-01',1013,21.5)\n"));
        assert!(!store.matches(b"(2024)\n"));
        assert!(!store.matches(b"("));

        let markup = Mode::Markup.profile().line_shape;
        assert!(markup.matches(b"<sample>\n"));
        assert!(!markup.matches(b" <sample>\n"));

        assert!(Mode::Report.profile().line_shape.matches(b"anything\n"));
    }

    #[test]
    fn test_only_markup_has_closing() {
        assert_eq!(Mode::Markup.profile().closing, Some(MARKUP_CLOSING_TAG));
        assert!(Mode::Report.profile().closing.is_none());
        assert!(Mode::RecordStore.profile().closing.is_none());
        assert!(Mode::None.profile().closing.is_none());
    }
}
