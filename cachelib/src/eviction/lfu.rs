use std::collections::{BTreeSet, HashMap};

use crate::eviction::EvictionPolicy;
use crate::request::Request;

/// Least frequently used eviction.
///
/// Objects are ordered by (frequency, insertion order), so ties between
/// equally popular objects evict the one inserted first. New objects start
/// with frequency 1 and every hit increments
pub struct LeastFrequentlyUsed {
    order: BTreeSet<(u64, u64, u64)>,
    meta: HashMap<u64, (u64, u64)>,
    next_seq: u64,
}

impl LeastFrequentlyUsed {
    pub fn new() -> Self {
        Self {
            order: BTreeSet::new(),
            meta: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl Default for LeastFrequentlyUsed {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LeastFrequentlyUsed {
    fn on_hit(&mut self, req: &Request) {
        if let Some((freq, seq)) = self.meta.get(&req.object_id).copied() {
            self.order.remove(&(freq, seq, req.object_id));
            self.order.insert((freq + 1, seq, req.object_id));
            self.meta.insert(req.object_id, (freq + 1, seq));
        }
    }

    fn on_insert(&mut self, req: &Request) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert((1, seq, req.object_id));
        self.meta.insert(req.object_id, (1, seq));
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        let entry = self.order.iter().next().copied()?;
        self.order.remove(&entry);
        let (_, _, object_id) = entry;
        self.meta.remove(&object_id);
        Some(object_id)
    }
}
