//! # CacheLib
//!
//! Cachelib is a library for trace-driven cache simulation
//!
//! It provides a generic cache engine which can be parameterised by an
//! eviction policy, readers for common trace formats, and a sweep scheduler
//! that replays one trace through many (policy, cache size) engines in
//! parallel
//!
//! While designed to accommodate high performance, it prioritises
//! flexibility, being easy to maintain and expand with new policies

/// Contains the implementation of the cache engine, and a utility enum for
/// the provided policy engines
pub mod cache;

/// Contains the sweep configuration: policies, cache sizes, and execution
/// knobs
pub mod config;

/// Contains the error type shared across the library
pub mod error;

/// Contains the provided eviction policies, with a trait for implementing
/// custom policies
pub mod eviction;

/// Contains the buffered/memory-mapped input layer for trace files
pub mod io;

/// Contains the request type decoded from traces
pub mod request;

/// Contains the sweep scheduler and the result reporting
pub mod simulator;

/// Contains the trace formats and the trace reader
pub mod trace;

#[cfg(test)]
mod test;

/// Contains utilities for building synthetic traces in tests and benchmarks
pub mod util;
