//! Append-only trace and result logs.
//!
//! Each process opens its logs once at startup, named after the process start
//! time, and flushes after every append so a run that dies midway leaves
//! readable output up to its last completed operation. Logs are never
//! rotated or capped.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use birdtrack_types::{PositionRecord, QueryTrace, TraceSink};
use chrono::Local;

use crate::error::CoreError;

/// File name prefix of the simulator's insert trace log.
pub const TRACE_INSERT_PREFIX: &str = "trace_insert";

/// File name prefix of the tracker's select trace log.
pub const TRACK_SELECT_PREFIX: &str = "track_select";

/// File name prefix of the tracker's result log.
pub const RESULT_PREFIX: &str = "result_txt";

/// Format of the start-time component of log file names.
const STAMP_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

/// Process start time, formatted for log file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    /// Stamp for the current local time.
    pub fn now() -> Self {
        Self(Local::now().format(STAMP_FORMAT).to_string())
    }

    /// Use a preformatted stamp.
    pub fn from_string(stamp: impl Into<String>) -> Self {
        Self(stamp.into())
    }

    /// The stamp text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log path `<dir>/<prefix>_<stamp>.txt`.
    pub fn log_path(&self, dir: &Path, prefix: &str) -> PathBuf {
        dir.join(format!("{prefix}_{}.txt", self.0))
    }
}

/// Trace sink writing rendered traces to a log.
#[derive(Debug)]
pub struct TraceLog<W: Write> {
    writer: W,
    traces_written: u64,
}

impl TraceLog<BufWriter<File>> {
    /// Create (or truncate) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        tracing::info!(path = %path.display(), "Trace log opened");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceLog<W> {
    /// Wrap an arbitrary writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            traces_written: 0,
        }
    }

    /// Traces appended so far.
    pub const fn traces_written(&self) -> u64 {
        self.traces_written
    }

    /// Return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for TraceLog<W> {
    fn append(&mut self, trace: &QueryTrace) -> io::Result<()> {
        self.writer.write_all(trace.render().as_bytes())?;
        self.writer.flush()?;
        self.traces_written = self.traces_written.saturating_add(1);
        Ok(())
    }
}

/// One JSON line per latest-position fetch.
#[derive(Debug)]
pub struct ResultLog<W: Write> {
    writer: W,
    lines_written: u64,
}

impl ResultLog<BufWriter<File>> {
    /// Create (or truncate) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        tracing::info!(path = %path.display(), "Result log opened");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ResultLog<W> {
    /// Wrap an arbitrary writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    /// Append the rows returned by one fetch as a JSON array line.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if serialization or the write fails.
    pub fn append(&mut self, records: &[PositionRecord]) -> Result<(), CoreError> {
        serde_json::to_writer(&mut self.writer, records)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.lines_written = self.lines_written.saturating_add(1);
        Ok(())
    }

    /// Lines appended so far.
    pub const fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
