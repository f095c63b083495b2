// src/cli.rs
//
// Command line. The first positional argument picks the recording mode; with
// no recognizable mode we print usage and leave the probe alone.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};

use crate::error::SettingsError;
use crate::probe::Mode;
use crate::settings::{expand_home, StationSettings};

/// Collect samples from a weather probe on a serial port.
#[derive(Debug, Parser, Clone)]
#[command(name = "probelink", version, about)]
pub struct Cli {
    /// Recording mode: rpt (report to stdout), sql (SQLite store), xml (markup)
    #[arg(value_name = "MODE")]
    pub mode: Option<String>,

    /// Markup output file for xml mode; stdout when omitted
    #[arg(value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Settings file (default: <config dir>/probelink/probelink.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serial port the probe is attached to
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Frame format, e.g. 8N1 or 7E2
    #[arg(long)]
    pub framing: Option<String>,

    /// SQLite database for sql mode
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Wait between samples, in pacing units
    #[arg(long, value_name = "UNITS")]
    pub period: Option<u32>,

    /// Stop after this many sample cycles
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Mirror log output to a timestamped file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    #[value(name = "rpt", alias = "report")]
    Report,
    #[value(name = "sql", aliases = ["csv", "record-store"])]
    RecordStore,
    #[value(name = "xml", alias = "markup")]
    Markup,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Report => Mode::Report,
            ModeArg::RecordStore => Mode::RecordStore,
            ModeArg::Markup => Mode::Markup,
        }
    }
}

impl Cli {
    /// The requested mode, or `None` if missing or unrecognized.
    pub fn mode(&self) -> Option<Mode> {
        let raw = self.mode.as_deref()?;
        ModeArg::from_str(raw.trim(), true).ok().map(Mode::from)
    }

    /// Apply command-line overrides on top of file settings.
    pub fn apply_overrides(&self, settings: &mut StationSettings) -> Result<(), SettingsError> {
        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(framing) = &self.framing {
            settings.framing = framing.clone();
        }
        if let Some(database) = &self.database {
            settings.database = expand_home(database);
        }
        if let Some(period) = self.period {
            settings.timing.sample_period = period;
        }
        if let Some(dir) = &self.log_dir {
            settings.log_dir = Some(expand_home(dir));
        }
        settings.validate()
    }
}

/// Print usage to stdout.
pub fn print_usage() {
    let mut cmd = Cli::command();
    if let Err(e) = cmd.print_help() {
        tlog!("[cli] Cannot print usage: {}", e);
    }
}
