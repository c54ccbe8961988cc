use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::request::{Request, NEXT_ACCESS_NEVER};

/// Builds requests from (timestamp, object_id, size) triples.
pub fn requests(specs: &[(u32, u64, u32)]) -> Vec<Request> {
    specs
        .iter()
        .map(|&(timestamp, object_id, size)| Request::new(timestamp, object_id, size))
        .collect()
}

/// Fills in `next_access_vtime` for every request by scanning the workload
/// backwards: the value is the index of the object's next appearance, or
/// [`NEXT_ACCESS_NEVER`] for a final appearance
pub fn annotate_next_access(reqs: &mut [Request]) {
    let mut next_seen: HashMap<u64, i64> = HashMap::new();
    for (i, req) in reqs.iter_mut().enumerate().rev() {
        req.next_access_vtime = next_seen
            .get(&req.object_id)
            .copied()
            .unwrap_or(NEXT_ACCESS_NEVER);
        next_seen.insert(req.object_id, i as i64);
    }
}

/// Writes requests as 16-byte little-endian standard binary records.
pub fn write_standard_trace(path: &Path, reqs: &[Request]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for req in reqs {
        out.write_all(&req.timestamp.to_le_bytes())?;
        out.write_all(&req.object_id.to_le_bytes())?;
        out.write_all(&req.size.to_le_bytes())?;
    }
    out.flush()
}

/// Writes requests as 24-byte little-endian records carrying the next-access
/// annotation.
pub fn write_oracle_trace(path: &Path, reqs: &[Request]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for req in reqs {
        out.write_all(&req.timestamp.to_le_bytes())?;
        out.write_all(&req.object_id.to_le_bytes())?;
        out.write_all(&req.size.to_le_bytes())?;
        out.write_all(&req.next_access_vtime.to_le_bytes())?;
    }
    out.flush()
}

/// Writes requests as comma-separated text, one request per line in
/// time,object,size order.
pub fn write_txt_trace(path: &Path, reqs: &[Request]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for req in reqs {
        writeln!(out, "{},{},{}", req.timestamp, req.object_id, req.size)?;
    }
    out.flush()
}

/// A workload that alternates a re-referenced hot set with one-shot scans.
/// Each round requests every hot object `hot_repeats` times, then `scan_len`
/// objects that never recur. Recency-only policies flush the hot set on
/// every scan; scan-resistant policies keep it resident
pub fn hot_cold_trace(
    hot_objects: u64,
    hot_repeats: u32,
    rounds: u32,
    scan_len: u64,
    size: u32,
) -> Vec<Request> {
    let mut reqs = Vec::new();
    let mut ts = 0u32;
    // Cold ids never collide with the hot set
    let mut cold_id = 1u64 << 32;
    for _ in 0..rounds {
        for _ in 0..hot_repeats {
            for id in 0..hot_objects {
                reqs.push(Request::new(ts, id, size));
                ts += 1;
            }
        }
        for _ in 0..scan_len {
            reqs.push(Request::new(ts, cold_id, size));
            cold_id += 1;
            ts += 1;
        }
    }
    reqs
}
