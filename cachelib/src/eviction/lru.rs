use std::collections::{BTreeMap, HashMap};

use crate::eviction::EvictionPolicy;
use crate::request::Request;

/// Least recently used eviction.
///
/// Recency order is kept as a map from a logical clock to object id: every
/// access stamps the object with a fresh clock value, so the smallest stamp
/// is always the least recently used object and eviction is the first entry.
/// The most recently used object sits at the tail, the victim is the head
pub struct LeastRecentlyUsed {
    queue: BTreeMap<u64, u64>,
    position: HashMap<u64, u64>,
    clock: u64,
}

impl LeastRecentlyUsed {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            position: HashMap::new(),
            clock: 0,
        }
    }

    fn touch(&mut self, object_id: u64) {
        let stamp = self.clock;
        self.clock += 1;
        if let Some(old) = self.position.insert(object_id, stamp) {
            self.queue.remove(&old);
        }
        self.queue.insert(stamp, object_id);
    }
}

impl Default for LeastRecentlyUsed {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LeastRecentlyUsed {
    fn on_hit(&mut self, req: &Request) {
        self.touch(req.object_id);
    }

    fn on_insert(&mut self, req: &Request) {
        self.touch(req.object_id);
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        let (stamp, object_id) = self.queue.pop_first()?;
        debug_assert_eq!(self.position.get(&object_id), Some(&stamp));
        self.position.remove(&object_id);
        Some(object_id)
    }
}
