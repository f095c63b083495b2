// src/sinks/markup.rs
//
// Markup mode: the probe streams an XML document line by line; we append the
// lines verbatim to a file, or to stdout when no file was named.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Sink;
use crate::error::SinkError;
use crate::io::Line;

enum Output {
    File { path: PathBuf, file: File },
    Stdout(std::io::Stdout),
}

pub struct MarkupSink {
    output: Output,
}

impl MarkupSink {
    /// Open `path` for appending, creating it if needed. Existing content is
    /// kept: each run adds another document to the file.
    pub fn open(path: Option<&Path>) -> Result<Self, SinkError> {
        let output = match path {
            Some(p) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(p)
                    .map_err(|source| SinkError::File {
                        path: p.to_path_buf(),
                        source,
                    })?;
                tlog!("[markup] Appending to {}", p.display());
                Output::File {
                    path: p.to_path_buf(),
                    file,
                }
            }
            None => Output::Stdout(std::io::stdout()),
        };
        Ok(MarkupSink { output })
    }
}

impl Sink for MarkupSink {
    fn emit(&mut self, line: &Line) -> Result<(), SinkError> {
        match &mut self.output {
            Output::File { path, file } => file
                .write_all(line.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|source| SinkError::File {
                    path: path.clone(),
                    source,
                }),
            Output::Stdout(out) => out
                .write_all(line.as_bytes())
                .and_then(|_| out.flush())
                .map_err(SinkError::Stdout),
        }
    }

    fn name(&self) -> &'static str {
        "markup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.xml");
        std::fs::write(&path, "<samples>\n</samples>\n").unwrap();

        let mut sink = MarkupSink::open(Some(&path)).unwrap();
        sink.emit(&Line::from("<samples>\n")).unwrap();
        sink.emit(&Line::from("<sample dt=\"2024-01-01 00:00:00\"/>\n")).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "<samples>\n</samples>\n<samples>\n<sample dt=\"2024-01-01 00:00:00\"/>\n"
        );
    }

    #[test]
    fn test_open_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarkupSink::open(Some(&dir.path().join("no").join("such.xml")));
        assert!(matches!(err, Err(SinkError::File { .. })));
    }
}
