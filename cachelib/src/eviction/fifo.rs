use std::collections::VecDeque;

use crate::eviction::EvictionPolicy;
use crate::request::Request;

/// First-in first-out eviction. Hits do not touch the queue, so the victim
/// is always the oldest resident object
#[derive(Default)]
pub struct FirstInFirstOut {
    queue: VecDeque<u64>,
}

impl FirstInFirstOut {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for FirstInFirstOut {
    fn on_hit(&mut self, _req: &Request) {}

    fn on_insert(&mut self, req: &Request) {
        self.queue.push_back(req.object_id);
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        self.queue.pop_front()
    }
}
