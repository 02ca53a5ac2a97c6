use std::fmt::{Display, Formatter};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use anyhow::{anyhow, bail, Context};
use tracing::{debug, warn};

use crate::probe::clock::{Timestamp, WallClock};
use crate::probe::counter::{CounterValue, NUM_DIGITS};

/// One line in a measurement log:
///
/// ```ascii
/// seconds, nanoseconds, A, B, C, D, E
/// ```
///
/// Analysis tooling depends on the exact field order and count.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LogRecord {
    pub timestamp: Timestamp,
    pub value: CounterValue,
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.timestamp.secs, self.timestamp.nanos, self.value)
    }
}

impl FromStr for LogRecord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<LogRecord> {
        let fields = s.trim_end().split(',')
            .map(str::trim)
            .collect::<Vec<_>>();
        if fields.len() != 2 + NUM_DIGITS {
            bail!("expected {} fields in log record, found {}: {:?}", 2 + NUM_DIGITS, fields.len(), s);
        }

        let secs: u64 = fields[0].parse()?;
        let nanos: u32 = fields[1].parse()?;
        if nanos >= 1_000_000_000 {
            return Err(anyhow!("nanoseconds out of range: {}", nanos));
        }

        let mut digits = [0u8; NUM_DIGITS];
        for (digit, field) in digits.iter_mut().zip(&fields[2..]) {
            *digit = field.parse()?;
        }

        Ok(LogRecord {
            timestamp: Timestamp { secs, nanos },
            value: CounterValue::from_digits(digits),
        })
    }
}

/// Where log records go. Besides writing, a sink can push its data through to persistent
///  storage if the run is configured to do so.
pub trait LogSink: Write {
    fn sync_to_storage(&mut self) -> std::io::Result<()>;
}
impl LogSink for File {
    fn sync_to_storage(&mut self) -> std::io::Result<()> {
        self.sync_data()
    }
}
#[cfg(test)]
impl LogSink for Vec<u8> {
    fn sync_to_storage(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Append-only measurement log that timestamps every counter it is given.
///
/// Every record is flushed before [RecordLog::record] returns, so a record that was reported as
///  written survives the process being killed right afterwards. A failure to write or flush is
///  returned as an error and must end the run: measurements with silent gaps are worse than none.
///
/// If the clock cannot be read, the record is skipped and a warning is logged. Skipped records
///  show up as missing counter values in the log, just like lost segments would.
pub struct RecordLog<W: LogSink, C: WallClock> {
    out: W,
    clock: C,
    sync_to_disk: bool,
    num_written: u64,
    num_skipped: u64,
}

impl <C: WallClock> RecordLog<File, C> {
    /// Opens (or creates) the log file at `path` for appending, writing `annotation` as a free
    ///  text line first if there is one.
    pub fn open(path: &Path, annotation: Option<&str>, sync_to_disk: bool, clock: C) -> anyhow::Result<RecordLog<File, C>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {:?}", path))?;
        debug!(?path, "opened log file");

        let mut result = RecordLog::new(file, clock, sync_to_disk);
        if let Some(annotation) = annotation {
            result.write_annotation(annotation)?;
        }
        Ok(result)
    }
}

impl <W: LogSink, C: WallClock> RecordLog<W, C> {
    pub fn new(out: W, clock: C, sync_to_disk: bool) -> RecordLog<W, C> {
        RecordLog {
            out,
            clock,
            sync_to_disk,
            num_written: 0,
            num_skipped: 0,
        }
    }

    pub fn write_annotation(&mut self, annotation: &str) -> anyhow::Result<()> {
        if annotation.contains('\n') {
            bail!("log annotation must be a single line");
        }
        self.write_line(annotation)
    }

    /// Timestamps `value` with the current wall clock time and appends it. Returns the record
    ///  that was written, or `None` if it was skipped because the clock could not be read.
    pub fn record(&mut self, value: CounterValue) -> anyhow::Result<Option<LogRecord>> {
        let timestamp = match self.clock.now() {
            Ok(t) => t,
            Err(e) => {
                warn!(?value, "failed to read the clock - skipping log record: {}", e);
                self.num_skipped += 1;
                return Ok(None);
            }
        };

        let record = LogRecord { timestamp, value };
        self.append(&record)?;
        Ok(Some(record))
    }

    /// Appends a record with a timestamp that was taken elsewhere
    pub fn append(&mut self, record: &LogRecord) -> anyhow::Result<()> {
        self.write_line(&record.to_string())?;
        self.num_written += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        // a single write per line, so a killed process never leaves a partial line behind
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        self.out.write_all(buf.as_bytes())
            .context("writing to log")?;
        self.out.flush()
            .context("flushing log")?;
        if self.sync_to_disk {
            self.out.sync_to_storage()
                .context("syncing log to storage")?;
        }
        Ok(())
    }

    pub fn num_written(&self) -> u64 {
        self.num_written
    }

    pub fn num_skipped(&self) -> u64 {
        self.num_skipped
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
