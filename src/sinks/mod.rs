// src/sinks/mod.rs
//
// Output sinks. Exactly one is chosen from the mode at startup and receives
// every validated line, in order. A sink error ends the session: silently
// dropping readings is worse than stopping.

mod console;
mod markup;
mod record_store;

pub use console::ConsoleSink;
pub use markup::MarkupSink;
pub use record_store::{parse_record, RecordStore, PROBE_DATA_COLUMNS};

use std::path::PathBuf;

use crate::error::SinkError;
use crate::io::Line;
use crate::probe::Mode;

pub trait Sink {
    /// Deliver one line. Implementations must not reformat it.
    fn emit(&mut self, line: &Line) -> Result<(), SinkError>;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Where the mode-specific sinks write.
#[derive(Clone, Debug, Default)]
pub struct SinkTargets {
    /// SQLite file for record-store mode.
    pub database: PathBuf,
    /// Markup output file; stdout when `None`.
    pub markup_file: Option<PathBuf>,
}

/// Open the sink for `mode`. Opening verifies the destination up front, so a
/// bad path fails before the probe is contacted.
pub fn open_sink(mode: Mode, targets: &SinkTargets) -> Result<Box<dyn Sink>, SinkError> {
    let sink: Box<dyn Sink> = match mode {
        Mode::None => Box::new(DiscardSink),
        Mode::Report => Box::new(ConsoleSink::stdout()),
        Mode::RecordStore => Box::new(RecordStore::open(&targets.database)?),
        Mode::Markup => Box::new(MarkupSink::open(targets.markup_file.as_deref())?),
    };
    Ok(sink)
}

/// Sink for `Mode::None`: the probe was not asked for any format.
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn emit(&mut self, line: &Line) -> Result<(), SinkError> {
        tlog!("[session] Discarding line in mode 'none': {}", line);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discard"
    }
}
