use std::cmp;
use std::collections::{BTreeMap, HashMap};

use crate::eviction::{EvictionPolicy, Weigher};
use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResidentList {
    T1,
    T2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GhostList {
    B1,
    B2,
}

struct Resident {
    seq: u64,
    weight: u64,
    list: ResidentList,
}

struct Ghost {
    seq: u64,
    weight: u64,
    list: GhostList,
}

/// Adaptive replacement cache (ARC).
///
/// Two resident lists split the capacity: T1 holds objects seen once
/// recently, T2 holds objects seen at least twice. Two ghost lists, B1 and
/// B2, remember objects recently evicted from T1 and T2. A hit on B1 means
/// the recency side was undersized and grows the target `p`; a hit on B2
/// shrinks it. Eviction takes the LRU end of T1 while T1 exceeds `p`,
/// otherwise the LRU end of T2.
///
/// All list lengths are measured in capacity units (bytes, or object slots
/// when sizes are ignored), so the adaptation carries over unchanged to
/// size-aware caching
pub struct AdaptiveReplacement {
    capacity: u64,
    weigher: Weigher,
    /// Target weight of T1
    p: u64,
    t1: BTreeMap<u64, u64>,
    t2: BTreeMap<u64, u64>,
    b1: BTreeMap<u64, u64>,
    b2: BTreeMap<u64, u64>,
    resident: HashMap<u64, Resident>,
    ghosts: HashMap<u64, Ghost>,
    t1_weight: u64,
    t2_weight: u64,
    b1_weight: u64,
    b2_weight: u64,
    next_seq: u64,
    /// Ghost list the current miss hit, if any. Set in `on_miss`, consumed
    /// in `evict`/`on_insert`
    ghost_hit: Option<GhostList>,
}

impl AdaptiveReplacement {
    pub fn new(capacity: u64, weigher: Weigher) -> Self {
        Self {
            capacity,
            weigher,
            p: 0,
            t1: BTreeMap::new(),
            t2: BTreeMap::new(),
            b1: BTreeMap::new(),
            b2: BTreeMap::new(),
            resident: HashMap::new(),
            ghosts: HashMap::new(),
            t1_weight: 0,
            t2_weight: 0,
            b1_weight: 0,
            b2_weight: 0,
            next_seq: 0,
            ghost_hit: None,
        }
    }

    fn stamp(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn push_resident(&mut self, object_id: u64, weight: u64, list: ResidentList) {
        let seq = self.stamp();
        match list {
            ResidentList::T1 => {
                self.t1.insert(seq, object_id);
                self.t1_weight += weight;
            }
            ResidentList::T2 => {
                self.t2.insert(seq, object_id);
                self.t2_weight += weight;
            }
        }
        self.resident.insert(object_id, Resident { seq, weight, list });
    }

    fn push_ghost(&mut self, object_id: u64, weight: u64, list: GhostList) {
        let seq = self.stamp();
        match list {
            GhostList::B1 => {
                self.b1.insert(seq, object_id);
                self.b1_weight += weight;
            }
            GhostList::B2 => {
                self.b2.insert(seq, object_id);
                self.b2_weight += weight;
            }
        }
        self.ghosts.insert(object_id, Ghost { seq, weight, list });
    }

    fn drop_oldest_ghost(&mut self, list: GhostList) {
        let popped = match list {
            GhostList::B1 => self.b1.pop_first(),
            GhostList::B2 => self.b2.pop_first(),
        };
        if let Some((_, object_id)) = popped {
            if let Some(ghost) = self.ghosts.remove(&object_id) {
                match list {
                    GhostList::B1 => self.b1_weight -= ghost.weight,
                    GhostList::B2 => self.b2_weight -= ghost.weight,
                }
            }
        }
    }

    /// Move the LRU end of a resident list to its ghost list, returning the
    /// evicted id.
    fn demote_lru(&mut self, list: ResidentList) -> Option<u64> {
        let popped = match list {
            ResidentList::T1 => self.t1.pop_first(),
            ResidentList::T2 => self.t2.pop_first(),
        };
        let (_, object_id) = popped?;
        let entry = self.resident.remove(&object_id)?;
        match list {
            ResidentList::T1 => {
                self.t1_weight -= entry.weight;
                self.push_ghost(object_id, entry.weight, GhostList::B1);
            }
            ResidentList::T2 => {
                self.t2_weight -= entry.weight;
                self.push_ghost(object_id, entry.weight, GhostList::B2);
            }
        }
        Some(object_id)
    }
}

impl EvictionPolicy for AdaptiveReplacement {
    fn on_hit(&mut self, req: &Request) {
        // Any repeat access proves reuse: move to the MRU end of T2
        let Some(entry) = self.resident.remove(&req.object_id) else {
            return;
        };
        match entry.list {
            ResidentList::T1 => {
                self.t1.remove(&entry.seq);
                self.t1_weight -= entry.weight;
            }
            ResidentList::T2 => {
                self.t2.remove(&entry.seq);
                self.t2_weight -= entry.weight;
            }
        }
        self.push_resident(req.object_id, entry.weight, ResidentList::T2);
    }

    fn on_miss(&mut self, req: &Request) {
        self.ghost_hit = None;
        let Some(ghost) = self.ghosts.remove(&req.object_id) else {
            return;
        };
        let weight = self.weigher.weight(req);
        match ghost.list {
            GhostList::B1 => {
                self.b1.remove(&ghost.seq);
                self.b1_weight -= ghost.weight;
                let delta =
                    cmp::max(1, self.b2_weight / cmp::max(1, self.b1_weight)).saturating_mul(weight);
                self.p = cmp::min(self.capacity, self.p.saturating_add(delta));
            }
            GhostList::B2 => {
                self.b2.remove(&ghost.seq);
                self.b2_weight -= ghost.weight;
                let delta =
                    cmp::max(1, self.b1_weight / cmp::max(1, self.b2_weight)).saturating_mul(weight);
                self.p = self.p.saturating_sub(delta);
            }
        }
        self.ghost_hit = Some(ghost.list);
    }

    fn on_insert(&mut self, req: &Request) {
        let weight = self.weigher.weight(req);
        // A ghost hit is proven reuse and goes straight to T2
        let list = if self.ghost_hit.take().is_some() {
            ResidentList::T2
        } else {
            ResidentList::T1
        };
        self.push_resident(req.object_id, weight, list);
        // Bound the history: L1 = T1+B1 within c, everything within 2c
        while self.b1_weight > 0 && self.t1_weight + self.b1_weight > self.capacity {
            self.drop_oldest_ghost(GhostList::B1);
        }
        while self.b2_weight > 0
            && self.t1_weight + self.t2_weight + self.b1_weight + self.b2_weight
                > self.capacity.saturating_mul(2)
        {
            self.drop_oldest_ghost(GhostList::B2);
        }
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        let b2_miss = self.ghost_hit == Some(GhostList::B2);
        let from_t1 = !self.t1.is_empty()
            && (self.t1_weight > self.p
                || (b2_miss && self.t1_weight == self.p)
                || self.t2.is_empty());
        if from_t1 {
            self.demote_lru(ResidentList::T1)
        } else {
            self.demote_lru(ResidentList::T2)
        }
    }
}
