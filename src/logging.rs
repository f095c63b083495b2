// src/logging.rs
//
// Controller diagnostics. Probe data owns stdout, so every message here goes
// to stderr with a wall-clock stamp, and optionally into a per-run log file.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STAMP: &str = "%H:%M:%S%.3f";
#[cfg(unix)]
const LATEST_LINK: &str = "probelink.log";

/// Per-run log file; `None` until `init_file_logging` succeeds.
static MIRROR: Mutex<Option<File>> = Mutex::new(None);

/// Write one stamped diagnostic line. Use through `tlog!`.
pub(crate) fn emit(args: fmt::Arguments<'_>) {
    let line = format!("{} {}", chrono::Local::now().format(STAMP), args);
    eprintln!("{}", line);
    if let Ok(mut mirror) = MIRROR.lock() {
        if let Some(file) = mirror.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Start mirroring diagnostics to `<dir>/YYYYMMDD-HHMMSS-probelink.log`.
///
/// On Unix a `probelink.log` link in the same directory is moved to the new
/// file. Returns the path of the file being written.
pub(crate) fn init_file_logging(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-probelink.log")
        .to_string();
    let path = dir.join(&name);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    #[cfg(unix)]
    {
        if let Err(e) = relink_latest(dir, &name) {
            emit(format_args!("[logging] Cannot update {}: {}", LATEST_LINK, e));
        }
    }

    if let Ok(mut mirror) = MIRROR.lock() {
        *mirror = Some(file);
    }
    emit(format_args!("[logging] Writing log to {}", path.display()));
    Ok(path)
}

#[cfg(unix)]
fn relink_latest(dir: &Path, target: &str) -> std::io::Result<()> {
    let link = dir.join(LATEST_LINK);
    match std::fs::remove_file(&link) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    std::os::unix::fs::symlink(target, link)
}

/// Close the log file, if one is open.
pub(crate) fn stop_file_logging() {
    let closed = match MIRROR.lock() {
        Ok(mut mirror) => mirror.take().is_some(),
        Err(_) => false,
    };
    if closed {
        emit(format_args!("[logging] Log file closed"));
    }
}

/// `eprintln!` with a `HH:MM:SS.mmm` stamp, mirrored to the log file.
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::logging::emit(format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_mirrors_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_file_logging(dir.path()).unwrap();
        tlog!("[test] mirrored line {}", 42);
        stop_file_logging();

        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("-probelink.log")));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[test] mirrored line 42"));

        #[cfg(unix)]
        assert_eq!(
            std::fs::read_link(dir.path().join(LATEST_LINK)).unwrap(),
            PathBuf::from(path.file_name().unwrap())
        );
    }
}
