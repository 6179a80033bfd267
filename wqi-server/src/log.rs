//! Persistence log of served readings
//!
//! Append-only CSV, one row per non-cached acquisition:
//! `timestamp,ph,turbidity,tds,do,temp,conductivity,chlorine,nitrate,wqi,assessment`.
//!
//! Appends hold an exclusive advisory lock (fs2) for the whole write, and
//! last-row reads hold a shared lock, so a reader never sees half a row. Calls
//! block; async callers run them on the blocking pool.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use wqi_common::params::{Field, ParameterSet, FIELD_COUNT};
use wqi_common::time::{format_timestamp, parse_timestamp};
use wqi_common::Prediction;

pub const HEADER: [&str; 11] = [
    "timestamp",
    "ph",
    "turbidity",
    "tds",
    "do",
    "temp",
    "conductivity",
    "chlorine",
    "nitrate",
    "wqi",
    "assessment",
];

/// Bytes read from the end of the file when looking for the last row
const TAIL_BYTES: u64 = 64 * 1024;

/// Last well-formed row
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedReading {
    pub timestamp: DateTime<Utc>,
    pub params: ParameterSet,
}

#[derive(Debug, Clone)]
pub struct PersistenceLog {
    path: PathBuf,
}

impl PersistenceLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is new or empty
    pub fn append(&self, timestamp: &DateTime<Utc>, params: &ParameterSet, prediction: &Prediction) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut buf = csv::Writer::from_writer(Vec::new());
        let mut record: Vec<String> = Vec::with_capacity(HEADER.len());
        record.push(format_timestamp(timestamp));
        record.extend(params.to_array().iter().map(|v| v.to_string()));
        record.push(prediction.wqi.to_string());
        record.push(prediction.assessment.clone());
        buf.write_record(&record).map_err(io::Error::other)?;
        let row = buf.into_inner().map_err(|e| io::Error::other(e.to_string()))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> io::Result<()> {
            if file.metadata()?.len() == 0 {
                writeln!(file, "{}", HEADER.join(","))?;
            }
            file.write_all(&row)?;
            file.flush()
        })();
        let _ = file.unlock();
        result?;

        debug!("Appended reading to {}", self.path.display());
        Ok(())
    }

    /// Last row if it exists and is well-formed
    ///
    /// A missing file yields `Ok(None)`; a malformed last row yields `Ok(None)`
    /// as well. Only IO failures are errors.
    pub fn last_reading(&self) -> io::Result<Option<LoggedReading>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        file.lock_shared()?;
        let tail = read_tail(&mut file);
        let _ = file.unlock();
        let tail = tail?;

        let last_line = tail.lines().rev().map(str::trim).find(|l| !l.is_empty());
        Ok(last_line.and_then(parse_row))
    }
}

fn read_tail(file: &mut File) -> io::Result<String> {
    let len = file.metadata()?.len();
    let start = len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(start))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_row(line: &str) -> Option<LoggedReading> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let record = reader.records().next()?.ok()?;
    if record.len() < 1 + FIELD_COUNT {
        return None;
    }

    let timestamp = parse_timestamp(record.get(0)?)?;
    let mut values = [0.0; FIELD_COUNT];
    for field in Field::ALL {
        let v: f64 = record.get(1 + field.index())?.trim().parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        values[field.index()] = v;
    }

    Some(LoggedReading {
        timestamp,
        params: ParameterSet::from_array(values),
    })
}
