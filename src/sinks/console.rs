// src/sinks/console.rs
//
// Report mode: the probe already formats its report, we just print it.

use std::io::Write;

use super::Sink;
use crate::error::SinkError;
use crate::io::Line;

pub struct ConsoleSink<W: Write = std::io::Stdout> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleSink {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        ConsoleSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn emit(&mut self, line: &Line) -> Result<(), SinkError> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(SinkError::Stdout)
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prints_lines_verbatim() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.emit(&Line::from("Temperature:   21.5 C\n")).unwrap();
        sink.emit(&Line::from("Humidity:      45 %\r\n")).unwrap();
        assert_eq!(
            sink.into_inner(),
            b"Temperature:   21.5 C\nHumidity:      45 %\r\n".to_vec()
        );
    }
}
