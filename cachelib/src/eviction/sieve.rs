use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::eviction::EvictionPolicy;
use crate::request::Request;

struct SieveMeta {
    seq: u64,
    visited: bool,
}

/// Sieve eviction: a single FIFO queue, a visited bit per object, and a
/// moving eviction hand.
///
/// The hand starts at the queue tail (oldest object) and scans towards the
/// head, clearing visited bits as it passes; the first unvisited object is
/// the victim. The hand then rests just past the victim and resumes from
/// there on the next eviction, wrapping back to the tail when it falls off
/// the head. Insertions never move the hand
pub struct Sieve {
    /// Ascending insertion order: smallest key is the tail (oldest).
    queue: BTreeMap<u64, u64>,
    meta: HashMap<u64, SieveMeta>,
    hand: Option<u64>,
    next_seq: u64,
}

impl Sieve {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            meta: HashMap::new(),
            hand: None,
            next_seq: 0,
        }
    }

    /// First unvisited object at or after `start`, clearing visited bits on
    /// the way.
    fn scan(&mut self, start: u64) -> Option<(u64, u64)> {
        for (&seq, &object_id) in self.queue.range(start..) {
            if let Some(m) = self.meta.get_mut(&object_id) {
                if m.visited {
                    m.visited = false;
                } else {
                    return Some((seq, object_id));
                }
            }
        }
        None
    }
}

impl Default for Sieve {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for Sieve {
    fn on_hit(&mut self, req: &Request) {
        if let Some(m) = self.meta.get_mut(&req.object_id) {
            m.visited = true;
        }
    }

    fn on_insert(&mut self, req: &Request) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert(seq, req.object_id);
        self.meta.insert(req.object_id, SieveMeta { seq, visited: false });
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        if self.queue.is_empty() {
            return None;
        }
        let start = self.hand.unwrap_or(0);
        // The first pass clears every visited bit it crosses, so scanning
        // again from the tail always finds a victim
        let (seq, object_id) = match self.scan(start) {
            Some(found) => found,
            None => self.scan(0)?,
        };
        self.hand = self
            .queue
            .range((Bound::Excluded(seq), Bound::Unbounded))
            .next()
            .map(|(&next, _)| next);
        self.queue.remove(&seq);
        self.meta.remove(&object_id);
        Some(object_id)
    }
}
