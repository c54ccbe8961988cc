use std::collections::HashMap;

use crate::config::PolicyConfig;
use crate::eviction::{
    AdaptiveReplacement, Belady, EvictionPolicy, FirstInFirstOut, LeastFrequentlyUsed,
    LeastRecentlyUsed, S3Fifo, Sieve, Weigher,
};
use crate::request::Request;

/// Engine-side record for a resident object. Policy metadata lives in the
/// policy, not here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedObject {
    pub size: u32,
    pub weight: u64,
}

/// Cumulative request counters. Ratios are recomputed from these on demand
/// rather than maintained incrementally, so reporting boundaries introduce no
/// floating-point drift
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub n_req: u64,
    pub n_miss: u64,
    pub n_req_byte: u64,
    pub n_miss_byte: u64,
}

impl EngineStats {
    pub fn miss_ratio(&self) -> f64 {
        if self.n_req == 0 {
            0.0
        } else {
            self.n_miss as f64 / self.n_req as f64
        }
    }

    pub fn byte_miss_ratio(&self) -> f64 {
        if self.n_req_byte == 0 {
            0.0
        } else {
            self.n_miss_byte as f64 / self.n_req_byte as f64
        }
    }
}

/// A fixed-capacity cache engine, parameterised by an eviction policy
///
/// The general approach here is to have one solid implementation which is
/// easy to maintain and expand with more eviction policies without
/// compromising too much on performance
///
/// To facilitate this we rely on Rust's monomorphisation and the inlining of
/// the policy hooks to provide performance, which should be close to on par
/// with writing specialised implementations for each policy
///
/// The engine owns the object index and the capacity accounting; the policy
/// only sees the hooks in [`EvictionPolicy`]. After every processed request
/// `used <= capacity` holds, and every indexed object has live metadata in
/// the policy
pub struct CacheEngine<P: EvictionPolicy> {
    capacity: u64,
    used: u64,
    index: HashMap<u64, CachedObject>,
    policy: P,
    weigher: Weigher,
    stats: EngineStats,
}

impl<P: EvictionPolicy> CacheEngine<P> {
    pub fn new(capacity: u64, ignore_obj_size: bool, policy: P) -> Self {
        Self {
            capacity,
            used: 0,
            index: HashMap::new(),
            policy,
            weigher: Weigher {
                count_objects: ignore_obj_size,
            },
            stats: EngineStats::default(),
        }
    }

    /// Processes one request and updates the counters. Returns true on a
    /// cache hit, false otherwise
    pub fn process(&mut self, req: &Request) -> bool {
        let hit = self.apply(req);
        self.stats.n_req += 1;
        self.stats.n_req_byte += req.size as u64;
        if !hit {
            self.stats.n_miss += 1;
            self.stats.n_miss_byte += req.size as u64;
        }
        hit
    }

    /// Processes one request without counting it. Used for cache warmup
    pub fn warm(&mut self, req: &Request) -> bool {
        self.apply(req)
    }

    fn apply(&mut self, req: &Request) -> bool {
        let weight = self.weigher.weight(req);
        if let Some(obj) = self.index.get_mut(&req.object_id) {
            // Hit. Traces can report a new size for a known object, in
            // which case the accounting follows the trace
            if obj.size != req.size {
                self.used = self.used - obj.weight + weight;
                obj.size = req.size;
                obj.weight = weight;
            }
            self.policy.on_hit(req);
            while self.used > self.capacity {
                self.evict_one(req);
            }
            return true;
        }
        // Miss
        self.policy.on_miss(req);
        if weight > self.capacity || !self.policy.admit(req) {
            // Uncacheable pass-through; the request already counted as a miss
            return false;
        }
        while self.used + weight > self.capacity {
            self.evict_one(req);
        }
        self.index.insert(
            req.object_id,
            CachedObject {
                size: req.size,
                weight,
            },
        );
        self.used += weight;
        self.policy.on_insert(req);
        false
    }

    fn evict_one(&mut self, req: &Request) {
        // None means the policy reorganised without freeing space and is
        // asked again on the next loop iteration
        if let Some(victim) = self.policy.evict(req) {
            if let Some(gone) = self.index.remove(&victim) {
                self.used -= gone.weight;
            }
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    /// Number of resident objects
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, object_id: u64) -> bool {
        self.index.contains_key(&object_id)
    }
}

/// Enum for all engine variants provided by the library
///
/// Using trait objects in Rust reduces boilerplate, but it is surprisingly
/// slow, as this is completely opaque to the compiler
///
/// For most cases this isn't an issue, but for our use case we would be
/// de-referencing for each record in the trace, which imposes significant
/// overhead
///
/// It's much faster to explicitly branch on all implementations, as the
/// compiler can reason about the concrete types, perform function inlining
/// etc
pub enum GenericCache {
    Fifo(CacheEngine<FirstInFirstOut>),
    Lru(CacheEngine<LeastRecentlyUsed>),
    Lfu(CacheEngine<LeastFrequentlyUsed>),
    Arc(CacheEngine<AdaptiveReplacement>),
    Sieve(CacheEngine<Sieve>),
    S3Fifo(CacheEngine<S3Fifo>),
    Belady(CacheEngine<Belady>),
}

impl GenericCache {
    /// Creates a new engine for a policy configuration
    pub fn build(policy: &PolicyConfig, capacity: u64, ignore_obj_size: bool) -> Self {
        let weigher = Weigher {
            count_objects: ignore_obj_size,
        };
        match policy {
            PolicyConfig::Fifo => {
                Self::from(CacheEngine::new(capacity, ignore_obj_size, FirstInFirstOut::new()))
            }
            PolicyConfig::Lru => {
                Self::from(CacheEngine::new(capacity, ignore_obj_size, LeastRecentlyUsed::new()))
            }
            PolicyConfig::Lfu => {
                Self::from(CacheEngine::new(capacity, ignore_obj_size, LeastFrequentlyUsed::new()))
            }
            PolicyConfig::Arc => Self::from(CacheEngine::new(
                capacity,
                ignore_obj_size,
                AdaptiveReplacement::new(capacity, weigher),
            )),
            PolicyConfig::Sieve => {
                Self::from(CacheEngine::new(capacity, ignore_obj_size, Sieve::new()))
            }
            PolicyConfig::S3Fifo(params) => Self::from(CacheEngine::new(
                capacity,
                ignore_obj_size,
                S3Fifo::new(capacity, *params, weigher),
            )),
            PolicyConfig::Belady => {
                Self::from(CacheEngine::new(capacity, ignore_obj_size, Belady::new()))
            }
        }
    }

    pub fn process(&mut self, req: &Request) -> bool {
        match self {
            GenericCache::Fifo(engine) => engine.process(req),
            GenericCache::Lru(engine) => engine.process(req),
            GenericCache::Lfu(engine) => engine.process(req),
            GenericCache::Arc(engine) => engine.process(req),
            GenericCache::Sieve(engine) => engine.process(req),
            GenericCache::S3Fifo(engine) => engine.process(req),
            GenericCache::Belady(engine) => engine.process(req),
        }
    }

    pub fn warm(&mut self, req: &Request) -> bool {
        match self {
            GenericCache::Fifo(engine) => engine.warm(req),
            GenericCache::Lru(engine) => engine.warm(req),
            GenericCache::Lfu(engine) => engine.warm(req),
            GenericCache::Arc(engine) => engine.warm(req),
            GenericCache::Sieve(engine) => engine.warm(req),
            GenericCache::S3Fifo(engine) => engine.warm(req),
            GenericCache::Belady(engine) => engine.warm(req),
        }
    }

    pub fn stats(&self) -> &EngineStats {
        match self {
            GenericCache::Fifo(engine) => engine.stats(),
            GenericCache::Lru(engine) => engine.stats(),
            GenericCache::Lfu(engine) => engine.stats(),
            GenericCache::Arc(engine) => engine.stats(),
            GenericCache::Sieve(engine) => engine.stats(),
            GenericCache::S3Fifo(engine) => engine.stats(),
            GenericCache::Belady(engine) => engine.stats(),
        }
    }

    pub fn used(&self) -> u64 {
        match self {
            GenericCache::Fifo(engine) => engine.used(),
            GenericCache::Lru(engine) => engine.used(),
            GenericCache::Lfu(engine) => engine.used(),
            GenericCache::Arc(engine) => engine.used(),
            GenericCache::Sieve(engine) => engine.used(),
            GenericCache::S3Fifo(engine) => engine.used(),
            GenericCache::Belady(engine) => engine.used(),
        }
    }

    pub fn capacity(&self) -> u64 {
        match self {
            GenericCache::Fifo(engine) => engine.capacity(),
            GenericCache::Lru(engine) => engine.capacity(),
            GenericCache::Lfu(engine) => engine.capacity(),
            GenericCache::Arc(engine) => engine.capacity(),
            GenericCache::Sieve(engine) => engine.capacity(),
            GenericCache::S3Fifo(engine) => engine.capacity(),
            GenericCache::Belady(engine) => engine.capacity(),
        }
    }
}

impl From<CacheEngine<FirstInFirstOut>> for GenericCache {
    fn from(value: CacheEngine<FirstInFirstOut>) -> Self {
        Self::Fifo(value)
    }
}

impl From<CacheEngine<LeastRecentlyUsed>> for GenericCache {
    fn from(value: CacheEngine<LeastRecentlyUsed>) -> Self {
        Self::Lru(value)
    }
}

impl From<CacheEngine<LeastFrequentlyUsed>> for GenericCache {
    fn from(value: CacheEngine<LeastFrequentlyUsed>) -> Self {
        Self::Lfu(value)
    }
}

impl From<CacheEngine<AdaptiveReplacement>> for GenericCache {
    fn from(value: CacheEngine<AdaptiveReplacement>) -> Self {
        Self::Arc(value)
    }
}

impl From<CacheEngine<Sieve>> for GenericCache {
    fn from(value: CacheEngine<Sieve>) -> Self {
        Self::Sieve(value)
    }
}

impl From<CacheEngine<S3Fifo>> for GenericCache {
    fn from(value: CacheEngine<S3Fifo>) -> Self {
        Self::S3Fifo(value)
    }
}

impl From<CacheEngine<Belady>> for GenericCache {
    fn from(value: CacheEngine<Belady>) -> Self {
        Self::Belady(value)
    }
}
