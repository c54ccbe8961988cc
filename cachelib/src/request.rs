/// Next-access hint meaning the object is never requested again.
pub const NEXT_ACCESS_NEVER: i64 = -1;

/// Next-access hint meaning the future was not computed for this trace.
pub const NEXT_ACCESS_UNKNOWN: i64 = -2;

/// A single decoded trace record.
///
/// Requests are immutable once read; every engine participating in a sweep
/// sees the same requests in the same order, so comparisons across policies
/// and cache sizes are over identical input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Trace timestamp in seconds. Expected to be non-decreasing; violations
    /// are logged by the reader but the request is still delivered
    pub timestamp: u32,
    pub object_id: u64,
    /// Object size in bytes. Ignored for accounting when the sweep runs in
    /// object-count mode
    pub size: u32,
    /// Virtual time of the next access to this object, if the trace carries
    /// oracle annotations. [`NEXT_ACCESS_NEVER`] marks the final access,
    /// [`NEXT_ACCESS_UNKNOWN`] marks traces without annotations
    pub next_access_vtime: i64,
}

impl Request {
    pub fn new(timestamp: u32, object_id: u64, size: u32) -> Self {
        Self {
            timestamp,
            object_id,
            size,
            next_access_vtime: NEXT_ACCESS_UNKNOWN,
        }
    }
}
