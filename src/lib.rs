#[macro_use]
mod logging;

pub mod cancel;
mod cli;
pub mod error;
pub mod io;
pub mod pacing;
pub mod probe;
pub mod session;
pub mod settings;
pub mod sinks;

use clap::Parser;

use crate::cancel::CancelToken;
use crate::cli::Cli;
use crate::error::StationError;
use crate::io::serial::{list_serial_ports, SerialConfig, SerialPortInfo, SerialTransport};
use crate::pacing::Pacing;
use crate::probe::Mode;
use crate::session::{Session, SessionSummary, StopReason};
use crate::settings::{load_settings, StationSettings};
use crate::sinks::{open_sink, SinkTargets};

/// Entry point for the `probelink` binary. Returns the process exit status.
pub fn run() -> i32 {
    let cli = Cli::parse();

    if cli.list_ports {
        return match list_serial_ports() {
            Ok(ports) => {
                for p in &ports {
                    println!("{}", describe_port(p));
                }
                0
            }
            Err(e) => {
                tlog!("[station] fatal: {}", e);
                1
            }
        };
    }

    let Some(mode) = cli.mode() else {
        cli::print_usage();
        return 0;
    };

    let result = run_station(&cli, mode);
    let status = match result {
        Ok(summary) => {
            log_summary(mode, &summary);
            0
        }
        Err(e) => {
            tlog!("[station] fatal: {}", e);
            1
        }
    };
    logging::stop_file_logging();
    status
}

fn run_station(cli: &Cli, mode: Mode) -> Result<SessionSummary, StationError> {
    let mut settings = load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings)?;

    if let Some(dir) = &settings.log_dir {
        if let Err(e) = logging::init_file_logging(dir) {
            tlog!("[station] Cannot start file logging in {}: {}", dir.display(), e);
        }
    }

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_signal_handlers() {
        tlog!("[station] Cannot install interrupt handlers: {}", e);
    }

    // Destination first: a bad database or output path must fail before the
    // probe is woken up.
    let sink = open_sink(
        mode,
        &SinkTargets {
            database: settings.database.clone(),
            markup_file: cli.output.clone(),
        },
    )?;

    let transport = SerialTransport::open(&serial_config(&settings)?)?;
    let pacing = Pacing::from(&settings.timing);
    tlog!(
        "[station] Recording in {} mode to {}, one sample every {} units",
        mode.label(),
        sink.name(),
        pacing.sample_period
    );

    let mut session =
        Session::new(transport, mode.profile(), sink, pacing, cancel).with_sample_limit(cli.count);
    session.run()
}

fn serial_config(settings: &StationSettings) -> Result<SerialConfig, StationError> {
    Ok(SerialConfig {
        port: settings.port.clone(),
        baud_rate: settings.baud_rate,
        format: settings.frame_format()?,
    })
}

fn log_summary(mode: Mode, summary: &SessionSummary) {
    let Some(identity) = &summary.identity else {
        tlog!("[station] Stopped before the probe answered");
        return;
    };
    let reason = match summary.stop_reason {
        StopReason::Cancelled => "interrupted",
        StopReason::LimitReached => "sample limit reached",
    };
    tlog!(
        "[station] {} session with '{}' ended ({}): {} cycles, {} lines, {} shape warnings",
        mode.label(),
        identity.banner,
        reason,
        summary.cycles,
        summary.lines,
        summary.shape_warnings
    );
}

/// One `--list-ports` row: name, type, then USB ids and descriptions when known.
fn describe_port(p: &SerialPortInfo) -> String {
    let mut row = format!("{}\t{}", p.port_name, p.port_type);
    if let (Some(vid), Some(pid)) = (p.vid, p.pid) {
        row.push_str(&format!("\t{:04x}:{:04x}", vid, pid));
    }
    let names: Vec<&str> = [p.manufacturer.as_deref(), p.product.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !names.is_empty() {
        row.push_str(&format!(" ({})", names.join(" ")));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(vid: Option<u16>, pid: Option<u16>, manufacturer: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: "USB".to_string(),
            manufacturer: manufacturer.map(str::to_string),
            product: Some("Uno".to_string()),
            vid,
            pid,
        }
    }

    #[test]
    fn test_describe_port_includes_usb_ids() {
        assert_eq!(
            describe_port(&port(Some(0x2341), Some(0x0043), Some("Arduino"))),
            "/dev/ttyACM0\tUSB\t2341:0043 (Arduino Uno)"
        );
    }

    #[test]
    fn test_describe_port_without_ids() {
        assert_eq!(
            describe_port(&port(None, None, None)),
            "/dev/ttyACM0\tUSB (Uno)"
        );
    }
}
