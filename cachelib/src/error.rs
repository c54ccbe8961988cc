use std::io;

use thiserror::Error;

/// Error taxonomy for the simulator.
///
/// Configuration and trace-format problems are fatal and surface before any
/// engine processes a request. Per-request anomalies (oversized objects,
/// non-monotonic timestamps) are handled locally and never appear here.
#[derive(Debug, Error)]
pub enum SimError {
    // --- configuration, rejected before the sweep starts ---
    #[error("unknown policy {0:?}")]
    UnknownPolicy(String),

    #[error("malformed cache size {0:?} (expected an integer, a KiB/MiB/GiB/TiB suffixed size, or a fraction in (0,1))")]
    BadCacheSize(String),

    #[error("unknown trace format {0:?}")]
    UnknownTraceFormat(String),

    #[error("policy {policy} needs next-access hints, but trace format {format} does not carry them")]
    MissingOracleHints { policy: String, format: String },

    #[error("no {0} given")]
    EmptySweep(&'static str),

    // --- trace problems, fatal for the trace ---
    #[error("couldn't open the trace file at {path}: {source}")]
    TraceOpen { path: String, source: io::Error },

    #[error("trace {path}: length {len} is not a multiple of the {record_size} byte record")]
    TruncatedTrace {
        path: String,
        len: u64,
        record_size: u64,
    },

    #[error("trace {path}, record {record}: {reason}")]
    MalformedRecord {
        path: String,
        record: u64,
        reason: String,
    },

    // --- everything else ---
    #[error("a sweep worker thread panicked")]
    WorkerPanic,

    #[error(transparent)]
    Io(#[from] io::Error),
}
