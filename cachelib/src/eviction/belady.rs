use std::collections::{BTreeSet, HashMap};

use crate::eviction::EvictionPolicy;
use crate::request::{Request, NEXT_ACCESS_NEVER};

/// Belady's optimal eviction, driven by the trace's next-access annotations.
///
/// The victim is the resident object whose next access lies farthest in the
/// future. Objects that are never requested again are not admitted at all,
/// and a resident object whose latest access turns out to be its last is
/// reprioritised to the eviction front.
///
/// Only usable with trace formats that carry next-access hints; the sweep
/// configuration rejects other combinations up front
pub struct Belady {
    /// Ordered by (distance to next access, age). The last entry is the
    /// farthest next access, ties evict the oldest insertion first
    order: BTreeSet<(i64, u64, u64)>,
    meta: HashMap<u64, (i64, u64)>,
    next_seq: u64,
}

/// Hints below zero (never reused, or unknown) sort as infinitely far away.
fn horizon(next_access_vtime: i64) -> i64 {
    if next_access_vtime < 0 {
        i64::MAX
    } else {
        next_access_vtime
    }
}

impl Belady {
    pub fn new() -> Self {
        Self {
            order: BTreeSet::new(),
            meta: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl Default for Belady {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for Belady {
    fn on_hit(&mut self, req: &Request) {
        if let Some((key, age)) = self.meta.get(&req.object_id).copied() {
            self.order.remove(&(key, age, req.object_id));
            let key = horizon(req.next_access_vtime);
            self.order.insert((key, age, req.object_id));
            self.meta.insert(req.object_id, (key, age));
        }
    }

    fn admit(&self, req: &Request) -> bool {
        // An object that is never requested again can only displace useful
        // bytes
        req.next_access_vtime != NEXT_ACCESS_NEVER
    }

    fn on_insert(&mut self, req: &Request) {
        // Older insertions get a larger age key so that among equal
        // horizons the last entry (the victim) is the oldest
        let age = u64::MAX - self.next_seq;
        self.next_seq += 1;
        let key = horizon(req.next_access_vtime);
        self.order.insert((key, age, req.object_id));
        self.meta.insert(req.object_id, (key, age));
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        let entry = self.order.iter().next_back().copied()?;
        self.order.remove(&entry);
        let (_, _, object_id) = entry;
        self.meta.remove(&object_id);
        Some(object_id)
    }
}
