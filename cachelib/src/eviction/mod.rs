//! Eviction policies and the trait the cache engine drives them through.
//!
//! Each policy is a flat struct holding only the ordering metadata it needs.
//! The engine owns the object index and the capacity accounting; policies own
//! queue positions, frequencies, hands, and ghost lists

mod arc;
mod belady;
mod fifo;
mod lfu;
mod lru;
mod s3fifo;
mod sieve;

pub use arc::AdaptiveReplacement;
pub use belady::Belady;
pub use fifo::FirstInFirstOut;
pub use lfu::LeastFrequentlyUsed;
pub use lru::LeastRecentlyUsed;
pub use s3fifo::{S3Fifo, S3FifoParams};
pub use sieve::Sieve;

use crate::request::Request;

/// How much of the cache capacity a request occupies: its size in bytes, or
/// one slot when the sweep ignores object sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weigher {
    pub count_objects: bool,
}

impl Weigher {
    pub fn weight(&self, req: &Request) -> u64 {
        if self.count_objects {
            1
        } else {
            req.size as u64
        }
    }
}

/// A generic trait for implementing eviction policies. Parameterises a
/// [`CacheEngine`](crate::cache::CacheEngine).
///
/// The engine calls these hooks in a fixed order per request: a hit is
/// `on_hit` only; a miss is `on_miss`, then `admit`, then `evict` until the
/// object fits, then `on_insert`
pub trait EvictionPolicy {
    /// Updates policy metadata when a resident object is requested again.
    fn on_hit(&mut self, req: &Request);

    /// Observes a miss before any admission or eviction decision. Ghost-list
    /// based policies use this to record history hits; the default does
    /// nothing
    fn on_miss(&mut self, _req: &Request) {}

    /// Decides whether the missed object should be admitted at all. Objects
    /// refused here are counted as misses and passed through uncached
    fn admit(&self, _req: &Request) -> bool {
        true
    }

    /// Registers a newly admitted object. The engine has already verified
    /// the object fits
    fn on_insert(&mut self, req: &Request);

    /// Selects a victim, unlinks it from the policy's structures, and
    /// returns its id so the engine can drop it from the index.
    ///
    /// `None` means the call only reorganised internal queues without
    /// freeing space (e.g. S3-FIFO promoting a small-queue object to the
    /// main queue) and the engine must call again. Every implementation
    /// guarantees that repeated calls make progress
    fn evict(&mut self, req: &Request) -> Option<u64>;
}
