use std::cmp;
use std::collections::{HashMap, VecDeque};

use serde::Deserialize;

use crate::eviction::{EvictionPolicy, Weigher};
use crate::request::Request;

/// Tuning knobs for [`S3Fifo`]. The reference parameter strings
/// (`s3fifo-0.0500-1`) select the small-queue fraction and the promotion
/// threshold; the ghost list is sized as a fraction of total capacity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct S3FifoParams {
    pub small_ratio: f64,
    pub ghost_ratio: f64,
    pub promote_threshold: u32,
}

impl Default for S3FifoParams {
    fn default() -> Self {
        Self {
            small_ratio: 0.10,
            ghost_ratio: 0.90,
            promote_threshold: 2,
        }
    }
}

impl S3FifoParams {
    pub fn label(&self) -> String {
        format!("S3FIFO-{:.4}-{}", self.small_ratio, self.promote_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Small,
    Main,
}

struct Node {
    segment: Segment,
    freq: u32,
    weight: u64,
}

/// S3-FIFO eviction: a small probationary FIFO, a main FIFO run as a clock,
/// and a ghost FIFO of ids recently evicted from the small queue.
///
/// New objects enter the small queue, unless their id is still in the ghost
/// list, which routes them straight to the main queue. When the small queue
/// must shrink, an object accessed at least `promote_threshold` times moves
/// to the main queue instead of leaving the cache; otherwise it is evicted
/// and remembered in the ghost list. The main queue evicts clock-style,
/// reinserting accessed objects with a decremented counter
pub struct S3Fifo {
    small: VecDeque<u64>,
    main: VecDeque<u64>,
    ghost: VecDeque<u64>,
    resident: HashMap<u64, Node>,
    ghost_weights: HashMap<u64, u64>,
    small_capacity: u64,
    main_capacity: u64,
    ghost_capacity: u64,
    small_weight: u64,
    main_weight: u64,
    ghost_weight: u64,
    promote_threshold: u32,
    weigher: Weigher,
    hit_on_ghost: bool,
}

impl S3Fifo {
    pub fn new(capacity: u64, params: S3FifoParams, weigher: Weigher) -> Self {
        let small_capacity = (capacity as f64 * params.small_ratio) as u64;
        Self {
            small: VecDeque::new(),
            main: VecDeque::new(),
            ghost: VecDeque::new(),
            resident: HashMap::new(),
            ghost_weights: HashMap::new(),
            small_capacity,
            main_capacity: capacity - small_capacity,
            ghost_capacity: (capacity as f64 * params.ghost_ratio) as u64,
            small_weight: 0,
            main_weight: 0,
            ghost_weight: 0,
            promote_threshold: params.promote_threshold,
            weigher,
            hit_on_ghost: false,
        }
    }

    fn push_ghost(&mut self, object_id: u64, weight: u64) {
        self.ghost.push_back(object_id);
        self.ghost_weights.insert(object_id, weight);
        self.ghost_weight += weight;
        while self.ghost_weight > self.ghost_capacity {
            let Some(oldest) = self.ghost.pop_front() else {
                break;
            };
            // Ids resurrected by a ghost hit were already unlinked
            if let Some(w) = self.ghost_weights.remove(&oldest) {
                self.ghost_weight -= w;
            }
        }
    }

    fn evict_small(&mut self) -> Option<u64> {
        let object_id = self.small.pop_front()?;
        let node = self.resident.get_mut(&object_id)?;
        debug_assert_eq!(node.segment, Segment::Small);
        let weight = node.weight;
        if node.freq >= self.promote_threshold {
            // Survived probation: move to the main queue, no space freed
            node.segment = Segment::Main;
            node.freq = 0;
            self.small_weight -= weight;
            self.main_weight += weight;
            self.main.push_back(object_id);
            None
        } else {
            self.small_weight -= weight;
            self.resident.remove(&object_id);
            self.push_ghost(object_id, weight);
            Some(object_id)
        }
    }

    fn evict_main(&mut self) -> Option<u64> {
        let object_id = self.main.pop_front()?;
        let node = self.resident.get_mut(&object_id)?;
        debug_assert_eq!(node.segment, Segment::Main);
        if node.freq >= 1 {
            // 2-bit clock: reinsert with a decremented counter
            node.freq = cmp::min(node.freq, 3) - 1;
            self.main.push_back(object_id);
            None
        } else {
            self.main_weight -= node.weight;
            self.resident.remove(&object_id);
            Some(object_id)
        }
    }
}

impl EvictionPolicy for S3Fifo {
    fn on_hit(&mut self, req: &Request) {
        if let Some(node) = self.resident.get_mut(&req.object_id) {
            node.freq += 1;
        }
    }

    fn on_miss(&mut self, req: &Request) {
        self.hit_on_ghost = match self.ghost_weights.remove(&req.object_id) {
            Some(weight) => {
                self.ghost_weight -= weight;
                true
            }
            None => false,
        };
    }

    fn admit(&self, req: &Request) -> bool {
        // Objects as wide as the whole small queue never earn promotion, so
        // admitting them would only churn it; ghost hits bypass the small
        // queue entirely
        self.hit_on_ghost || self.weigher.weight(req) < self.small_capacity
    }

    fn on_insert(&mut self, req: &Request) {
        let weight = self.weigher.weight(req);
        if self.hit_on_ghost {
            self.hit_on_ghost = false;
            self.main.push_back(req.object_id);
            self.main_weight += weight;
            self.resident.insert(
                req.object_id,
                Node {
                    segment: Segment::Main,
                    freq: 0,
                    weight,
                },
            );
        } else {
            self.small.push_back(req.object_id);
            self.small_weight += weight;
            self.resident.insert(
                req.object_id,
                Node {
                    segment: Segment::Small,
                    freq: 0,
                    weight,
                },
            );
        }
    }

    fn evict(&mut self, _req: &Request) -> Option<u64> {
        if self.main_weight > self.main_capacity || self.small.is_empty() {
            self.evict_main()
        } else {
            self.evict_small()
        }
    }
}
