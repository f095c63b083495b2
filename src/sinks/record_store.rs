// src/sinks/record_store.rs
//
// SQLite-backed record store. In record-store mode the probe sends one SQL
// value tuple per sample, e.g. `('2024-01-01 12:00:00',1013,21.5,...)`,
// with values in `ProbeData` column order. Older firmware sends fewer
// fields; they fill the leading columns.
//
// Tuples are parsed and bound as parameters rather than pasted into the
// statement text.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Sink;
use crate::error::SinkError;
use crate::io::Line;

/// `ProbeData` columns, in the order the probe reports them.
pub const PROBE_DATA_COLUMNS: &[(&str, &str)] = &[
    ("date_time", "TEXT PRIMARY KEY"),
    ("mpl_press", "INT"),
    ("mpl_temp", "REAL"),
    ("dht22_temp", "REAL"),
    ("dht22_rh", "INT"),
    ("ds18_1_lbl", "TEXT"),
    ("ds18_1_temp", "REAL"),
    ("ds18_2_lbl", "TEXT"),
    ("ds18_2_temp", "REAL"),
    ("ds18_3_lbl", "TEXT"),
    ("ds18_3_temp", "REAL"),
    ("ds18_4_lbl", "TEXT"),
    ("ds18_4_temp", "REAL"),
];

/// Readers (the web graphing scripts) may hold the database briefly.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RecordStore {
    conn: Connection,
    path: PathBuf,
}

impl RecordStore {
    /// Open or create the database and make sure `ProbeData` exists.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let db_err = |source| SinkError::Database {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
        conn.execute_batch(&schema_sql()).map_err(db_err)?;

        tlog!(
            "[record_store] Table 'ProbeData' ready in {}",
            path.display()
        );

        Ok(RecordStore {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Insert one row. The row is either fully written or not at all.
    pub fn append(&mut self, record: &[u8]) -> Result<(), SinkError> {
        let values = parse_record(record)?;
        if values.len() > PROBE_DATA_COLUMNS.len() {
            return Err(SinkError::TooManyValues {
                got: values.len(),
                max: PROBE_DATA_COLUMNS.len(),
            });
        }

        let path = &self.path;
        let db_err = |source| SinkError::Database {
            path: path.clone(),
            source,
        };

        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx.prepare_cached(&insert_sql(values.len())).map_err(db_err)?;
            stmt.execute(params_from_iter(values.iter())).map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}

impl Sink for RecordStore {
    fn emit(&mut self, line: &Line) -> Result<(), SinkError> {
        self.append(line.as_bytes())
    }

    fn name(&self) -> &'static str {
        "record-store"
    }
}

fn schema_sql() -> String {
    let columns: Vec<String> = PROBE_DATA_COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS ProbeData ({});",
        columns.join(", ")
    )
}

fn insert_sql(n: usize) -> String {
    let names: Vec<&str> = PROBE_DATA_COLUMNS[..n].iter().map(|(name, _)| *name).collect();
    let slots: Vec<String> = (1..=n).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO ProbeData ({}) VALUES ({})",
        names.join(", "),
        slots.join(", ")
    )
}

// ============================================================================
// Tuple parsing
// ============================================================================

/// Parse a literal value tuple: `('text', 12, -3.5, NULL)`.
///
/// Strings are single-quoted with `''` as the escape for a quote. Bare
/// numbers become INTEGER or REAL. Trailing whitespace and one `;` are
/// allowed after the closing parenthesis.
pub fn parse_record(record: &[u8]) -> Result<Vec<Value>, SinkError> {
    let text = std::str::from_utf8(record).map_err(|e| SinkError::MalformedRecord {
        offset: e.valid_up_to(),
        reason: "not valid UTF-8".to_string(),
    })?;
    let mut p = TupleParser {
        src: text.as_bytes(),
        text,
        pos: 0,
    };
    p.parse()
}

struct TupleParser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> TupleParser<'a> {
    fn fail<T>(&self, reason: &str) -> Result<T, SinkError> {
        Err(SinkError::MalformedRecord {
            offset: self.pos,
            reason: reason.to_string(),
        })
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse(&mut self) -> Result<Vec<Value>, SinkError> {
        self.skip_ws();
        if self.peek() != Some(b'(') {
            return self.fail("expected '('");
        }
        self.pos += 1;

        let mut values = Vec::new();
        loop {
            self.skip_ws();
            if values.is_empty() && self.peek() == Some(b')') {
                return self.fail("empty record");
            }
            values.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return self.fail("expected ',' or ')'"),
                None => return self.fail("unterminated record"),
            }
        }

        self.skip_ws();
        if self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_ws();
        }
        if self.pos != self.src.len() {
            return self.fail("trailing data after record");
        }
        Ok(values)
    }

    fn value(&mut self) -> Result<Value, SinkError> {
        match self.peek() {
            Some(b'\'') => self.quoted(),
            Some(_) => self.bare(),
            None => self.fail("missing value"),
        }
    }

    fn quoted(&mut self) -> Result<Value, SinkError> {
        self.pos += 1;
        let mut out = String::new();
        let mut start = self.pos;
        loop {
            match self.peek() {
                Some(b'\'') => {
                    out.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    if self.peek() == Some(b'\'') {
                        out.push('\'');
                        self.pos += 1;
                        start = self.pos;
                    } else {
                        return Ok(Value::Text(out));
                    }
                }
                Some(_) => self.pos += 1,
                None => return self.fail("unterminated string"),
            }
        }
    }

    fn bare(&mut self) -> Result<Value, SinkError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b != b',' && b != b')' && !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];

        if token.eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
        match token.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Real(f)),
            _ => {
                self.pos = start;
                self.fail(&format!("unrecognised value '{}'", token))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("WeatherData.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_parse_record_values() {
        let values = parse_record(b"('2024-01-01',1013,21.5, NULL ,'it''s')\n").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Text("2024-01-01".to_string()),
                Value::Integer(1013),
                Value::Real(21.5),
                Value::Null,
                Value::Text("it's".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_record_accepts_trailing_semicolon_and_negative() {
        let values = parse_record(b"('x', -4.25, -7);\r\n").unwrap();
        assert_eq!(values[1], Value::Real(-4.25));
        assert_eq!(values[2], Value::Integer(-7));
    }

    #[test]
    fn test_parse_record_rejects_malformed() {
        for bad in [
            &b"'2024-01-01',1013)\n"[..],
            b"()\n",
            b"('2024-01-01',1013\n",
            b"('2024-01-01, 1013)\n",
            b"('a',DROP)\n",
            b"('a',1) extra\n",
            b"('a',,1)\n",
            b"('a' 1)\n",
        ] {
            assert!(
                matches!(parse_record(bad), Err(SinkError::MalformedRecord { .. })),
                "{:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WeatherData.db");
        RecordStore::open(&path).unwrap();
        RecordStore::open(&path).unwrap();
    }

    #[test]
    fn test_append_full_row() {
        let (dir, mut store) = open_temp();
        store
            .append(b"('2024-01-01 12:00:00',1013,21.5,20.9,45,'A1',19.25,'B2',18.5,'C3',17.75,'D4',NULL)\n")
            .unwrap();

        let conn = Connection::open(dir.path().join("WeatherData.db")).unwrap();
        let (dt, press, temp, lbl4, t4): (String, i64, f64, String, Option<f64>) = conn
            .query_row(
                "SELECT date_time, mpl_press, mpl_temp, ds18_4_lbl, ds18_4_temp FROM ProbeData",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();
        assert_eq!(dt, "2024-01-01 12:00:00");
        assert_eq!(press, 1013);
        assert_eq!(temp, 21.5);
        assert_eq!(lbl4, "D4");
        assert_eq!(t4, None);
    }

    #[test]
    fn test_append_short_row_fills_leading_columns() {
        let (dir, mut store) = open_temp();
        store.append(b"('2024-01-01',1013,21.5,20.9,45)\n").unwrap();

        let conn = Connection::open(dir.path().join("WeatherData.db")).unwrap();
        let (rh, lbl): (i64, Option<String>) = conn
            .query_row("SELECT dht22_rh, ds18_1_lbl FROM ProbeData", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(rh, 45);
        assert_eq!(lbl, None);
    }

    #[test]
    fn test_too_many_values_rejected() {
        let (_dir, mut store) = open_temp();
        let mut row = String::from("('2024-01-01'");
        for i in 0..PROBE_DATA_COLUMNS.len() {
            row.push_str(&format!(",{}", i));
        }
        row.push_str(")\n");
        assert!(matches!(
            store.append(row.as_bytes()),
            Err(SinkError::TooManyValues { got: 14, max: 13 })
        ));
    }

    #[test]
    fn test_duplicate_timestamp_is_an_error_and_writes_nothing() {
        let (dir, mut store) = open_temp();
        store.append(b"('2024-01-01',1013,21.5)\n").unwrap();
        let err = store.append(b"('2024-01-01',1000,20.0)\n").unwrap_err();
        assert!(matches!(err, SinkError::Database { .. }));

        let conn = Connection::open(dir.path().join("WeatherData.db")).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ProbeData", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_insert_sql_shape() {
        assert_eq!(
            insert_sql(2),
            "INSERT INTO ProbeData (date_time, mpl_press) VALUES (?1, ?2)"
        );
    }
}
