use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};

use crate::error::SimError;
use crate::io::{open_input, TraceInput};
use crate::request::{Request, NEXT_ACCESS_UNKNOWN};

/// Column mapping for delimited text traces: which token holds the
/// timestamp, the object id, and the object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxtColumns {
    pub time: usize,
    pub object: usize,
    pub size: usize,
}

impl Default for TxtColumns {
    fn default() -> Self {
        Self {
            time: 0,
            object: 1,
            size: 2,
        }
    }
}

/// The record layouts the reader understands.
///
/// Binary formats are little-endian, fixed width, no padding. The oracle
/// format additionally carries the virtual time of the next access to the
/// object, which the Belady policy needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// `u32 timestamp, u64 object_id, u32 size` - 16 bytes per record
    StandardBin,
    /// `StandardBin` plus `i64 next_access_vtime` - 24 bytes per record
    OracleGeneral,
    /// Whitespace or comma delimited text, one request per line
    Txt(TxtColumns),
}

impl TraceFormat {
    /// Record width in bytes for the fixed-width formats.
    pub fn record_size(&self) -> Option<usize> {
        match self {
            TraceFormat::StandardBin => Some(16),
            TraceFormat::OracleGeneral => Some(24),
            TraceFormat::Txt(_) => None,
        }
    }

    /// Whether requests decoded from this format carry next-access hints.
    pub fn carries_oracle_hints(&self) -> bool {
        matches!(self, TraceFormat::OracleGeneral)
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFormat::StandardBin => write!(f, "standardBin"),
            TraceFormat::OracleGeneral => write!(f, "oracleGeneral"),
            TraceFormat::Txt(_) => write!(f, "txt"),
        }
    }
}

impl FromStr for TraceFormat {
    type Err = SimError;

    /// Accepts `standardBin`, `oracleGeneral`, `txt`, or `txt:<t>,<o>,<s>`
    /// to remap text columns.
    fn from_str(s: &str) -> Result<Self, SimError> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "standardbin" | "bin" => Ok(TraceFormat::StandardBin),
            "oraclegeneral" | "oracle" => Ok(TraceFormat::OracleGeneral),
            "txt" | "csv" => Ok(TraceFormat::Txt(TxtColumns::default())),
            _ => {
                if let Some(cols) = lower.strip_prefix("txt:").or_else(|| lower.strip_prefix("csv:")) {
                    let parsed: Vec<usize> = cols
                        .split(',')
                        .map(|c| c.trim().parse::<usize>())
                        .collect::<Result<_, _>>()
                        .map_err(|_| SimError::UnknownTraceFormat(s.to_string()))?;
                    if parsed.len() != 3 {
                        return Err(SimError::UnknownTraceFormat(s.to_string()));
                    }
                    Ok(TraceFormat::Txt(TxtColumns {
                        time: parsed[0],
                        object: parsed[1],
                        size: parsed[2],
                    }))
                } else {
                    Err(SimError::UnknownTraceFormat(s.to_string()))
                }
            }
        }
    }
}

/// Streams a trace file as a sequence of [`Request`] values.
///
/// Reading is lazy, sequential, and single pass; the only way to restart is
/// to open a fresh reader. The file length is validated against the record
/// width at open time, so iteration only fails on text parse errors or I/O
pub struct TraceReader {
    path: PathBuf,
    format: TraceFormat,
    input: TraceInput,
    record: Vec<u8>,
    line: String,
    n_read: u64,
    last_timestamp: u32,
    n_non_monotonic: u64,
}

impl TraceReader {
    pub fn open(path: &Path, format: TraceFormat) -> Result<Self, SimError> {
        let file = File::open(path).map_err(|e| SimError::TraceOpen {
            path: path.display().to_string(),
            source: e,
        })?;
        if let Some(record_size) = format.record_size() {
            let len = file.metadata()?.len();
            if len % record_size as u64 != 0 {
                return Err(SimError::TruncatedTrace {
                    path: path.display().to_string(),
                    len,
                    record_size: record_size as u64,
                });
            }
        }
        let record_size = format.record_size().unwrap_or(64);
        Ok(Self {
            path: path.to_path_buf(),
            format,
            input: open_input(file, record_size)?,
            record: vec![0; record_size],
            line: String::new(),
            n_read: 0,
            last_timestamp: 0,
            n_non_monotonic: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TraceFormat {
        self.format
    }

    /// Number of requests delivered so far.
    pub fn n_read(&self) -> u64 {
        self.n_read
    }

    /// Fills the record buffer. `Ok(false)` is a clean end of stream; EOF in
    /// the middle of a record is an error (the open-time length check makes
    /// this unreachable for regular files)
    fn fill_record(&mut self) -> Result<bool, SimError> {
        let mut filled = 0;
        while filled < self.record.len() {
            let n = self.input.read(&mut self.record[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(SimError::MalformedRecord {
                    path: self.path.display().to_string(),
                    record: self.n_read + 1,
                    reason: format!("EOF after {filled} of {} record bytes", self.record.len()),
                });
            }
            filled += n;
        }
        Ok(true)
    }

    fn read_binary(&mut self) -> Result<Option<Request>, SimError> {
        if !self.fill_record()? {
            return Ok(None);
        }
        let buffer = &self.record;
        let timestamp = u32::from_le_bytes(buffer[0..4].try_into().unwrap());
        let object_id = u64::from_le_bytes(buffer[4..12].try_into().unwrap());
        let size = u32::from_le_bytes(buffer[12..16].try_into().unwrap());
        let next_access_vtime = match self.format {
            TraceFormat::OracleGeneral => i64::from_le_bytes(buffer[16..24].try_into().unwrap()),
            _ => NEXT_ACCESS_UNKNOWN,
        };
        Ok(Some(Request {
            timestamp,
            object_id,
            size,
            next_access_vtime,
        }))
    }

    fn read_text(&mut self, columns: TxtColumns) -> Result<Option<Request>, SimError> {
        use std::io::BufRead;
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }
        let malformed = |reason: String, record: u64, path: &Path| SimError::MalformedRecord {
            path: path.display().to_string(),
            record,
            reason,
        };
        let record = self.n_read + 1;
        let tokens: Vec<&str> = self
            .line
            .trim()
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        let needed = columns.time.max(columns.object).max(columns.size) + 1;
        if tokens.len() < needed {
            return Err(malformed(
                format!("{} columns, need {needed}", tokens.len()),
                record,
                &self.path,
            ));
        }
        let timestamp = tokens[columns.time]
            .parse::<u32>()
            .map_err(|e| malformed(format!("bad timestamp: {e}"), record, &self.path))?;
        let object_id = tokens[columns.object]
            .parse::<u64>()
            .map_err(|e| malformed(format!("bad object id: {e}"), record, &self.path))?;
        let size = tokens[columns.size]
            .parse::<u32>()
            .map_err(|e| malformed(format!("bad size: {e}"), record, &self.path))?;
        Ok(Some(Request::new(timestamp, object_id, size)))
    }

    fn check_monotonic(&mut self, req: &Request) {
        if req.timestamp < self.last_timestamp {
            self.n_non_monotonic += 1;
            if self.n_non_monotonic == 1 {
                warn!(
                    "trace {}: timestamp {} after {} at record {}, further occurrences logged at debug",
                    self.path.display(),
                    req.timestamp,
                    self.last_timestamp,
                    self.n_read
                );
            } else {
                debug!(
                    "trace {}: non-monotonic timestamp {} at record {}",
                    self.path.display(),
                    req.timestamp,
                    self.n_read
                );
            }
        } else {
            self.last_timestamp = req.timestamp;
        }
    }
}

impl Iterator for TraceReader {
    type Item = Result<Request, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = match self.format {
            TraceFormat::StandardBin | TraceFormat::OracleGeneral => self.read_binary(),
            TraceFormat::Txt(columns) => self.read_text(columns),
        };
        match next {
            Ok(Some(req)) => {
                self.n_read += 1;
                self.check_monotonic(&req);
                Some(Ok(req))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
