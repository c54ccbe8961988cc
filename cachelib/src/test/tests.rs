use std::error::Error;

use crate::cache::{CacheEngine, GenericCache};
use crate::config::{CacheSizeSpec, PolicyConfig, SweepConfig};
use crate::error::SimError;
use crate::eviction::{
    AdaptiveReplacement, Belady, EvictionPolicy, FirstInFirstOut, LeastFrequentlyUsed,
    LeastRecentlyUsed, S3Fifo, S3FifoParams, Sieve, Weigher,
};
use crate::request::{Request, NEXT_ACCESS_NEVER, NEXT_ACCESS_UNKNOWN};
use crate::simulator::{format_result_line, working_set_size, SimResult, Sweep};
use crate::trace::{TraceFormat, TraceReader, TxtColumns};
use crate::util::{
    annotate_next_access, hot_cold_trace, requests, write_oracle_trace, write_standard_trace,
    write_txt_trace,
};

/// A deterministic, mildly skewed workload over `n_obj` objects.
fn skewed_trace(n_req: usize, n_obj: u64) -> Vec<Request> {
    let mut state: u64 = 0x2545F4914F6CDD1D;
    let mut reqs = Vec::with_capacity(n_req);
    for i in 0..n_req {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // Min of two draws biases towards small ids
        let id = ((state >> 33) % n_obj).min((state >> 13) % n_obj);
        reqs.push(Request::new(i as u32, id, 100 + (id as u32 % 7) * 50));
    }
    reqs
}

fn miss_ratio_for(policy: &str, capacity: u64, reqs: &[Request]) -> f64 {
    let policy: PolicyConfig = policy.parse().unwrap();
    let mut cache = GenericCache::build(&policy, capacity, true);
    for req in reqs {
        cache.process(req);
    }
    cache.stats().miss_ratio()
}

// --- engine accounting ---

#[test]
fn counts_hits_and_misses() {
    let mut cache = CacheEngine::new(20, false, LeastRecentlyUsed::new());
    for req in requests(&[(0, 1, 10), (1, 2, 10), (2, 1, 10), (3, 3, 10)]) {
        cache.process(&req);
    }
    let stats = cache.stats();
    assert_eq!(stats.n_req, 4);
    assert_eq!(stats.n_miss, 3);
    assert_eq!(stats.n_req_byte, 40);
    assert_eq!(stats.n_miss_byte, 30);
    assert!(cache.used() <= cache.capacity());
}

#[test]
fn oversized_objects_bypass_the_cache() {
    let mut cache = CacheEngine::new(100, false, LeastRecentlyUsed::new());
    cache.process(&Request::new(0, 1, 60));
    cache.process(&Request::new(1, 2, 200));
    // The oversized object is a miss but evicts nothing
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert_eq!(cache.used(), 60);
    assert_eq!(cache.stats().n_miss, 2);
}

#[test]
fn hit_with_changed_size_reaccounts() {
    let mut cache = CacheEngine::new(100, false, LeastRecentlyUsed::new());
    cache.process(&Request::new(0, 1, 60));
    cache.process(&Request::new(1, 2, 30));
    assert_eq!(cache.used(), 90);
    // Object 1 grows on a hit; object 2 is evicted to get back under capacity
    cache.process(&Request::new(2, 1, 90));
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert_eq!(cache.used(), 90);
    assert_eq!(cache.stats().n_miss, 2);
}

#[test]
fn warmup_requests_are_not_counted() {
    let mut cache = CacheEngine::new(10, true, LeastRecentlyUsed::new());
    cache.warm(&Request::new(0, 1, 1));
    cache.warm(&Request::new(1, 2, 1));
    cache.process(&Request::new(2, 1, 1));
    let stats = cache.stats();
    assert_eq!(stats.n_req, 1);
    // The warmed object is resident, so the counted request is a hit
    assert_eq!(stats.n_miss, 0);
}

// --- policy behaviour ---

#[test]
fn lru_evicts_the_least_recently_used() {
    let mut cache = CacheEngine::new(2, true, LeastRecentlyUsed::new());
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 1, 1), (3, 3, 1)]) {
        cache.process(&req);
    }
    // The hit on 1 made 2 the least recent
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert!(cache.contains(3));
}

#[test]
fn fifo_evicts_in_insertion_order() {
    let mut cache = CacheEngine::new(2, true, FirstInFirstOut::new());
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 1, 1), (3, 3, 1)]) {
        cache.process(&req);
    }
    // The hit on 1 does not matter, 1 entered first
    assert!(!cache.contains(1));
    assert!(cache.contains(2));
    assert!(cache.contains(3));
}

#[test]
fn lfu_evicts_the_least_frequent() {
    let mut cache = CacheEngine::new(2, true, LeastFrequentlyUsed::new());
    for req in requests(&[(0, 1, 1), (1, 1, 1), (2, 2, 1), (3, 3, 1)]) {
        cache.process(&req);
    }
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert!(cache.contains(3));
}

#[test]
fn lfu_breaks_frequency_ties_by_age() {
    let mut cache = CacheEngine::new(2, true, LeastFrequentlyUsed::new());
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 3, 1)]) {
        cache.process(&req);
    }
    assert!(!cache.contains(1));
    assert!(cache.contains(2));
    assert!(cache.contains(3));
}

#[test]
fn sieve_hand_skips_visited_objects() {
    let mut cache = CacheEngine::new(3, true, Sieve::new());
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 1, 1)]) {
        cache.process(&req);
    }
    // 1 is visited: the hand clears its bit, passes it, and evicts 2
    cache.process(&Request::new(4, 4, 1));
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert!(cache.contains(3));
    assert!(cache.contains(4));
    // The hand rests after the victim: a visited 3 is passed, 4 is evicted
    cache.process(&Request::new(5, 3, 1));
    cache.process(&Request::new(6, 5, 1));
    assert!(cache.contains(1));
    assert!(cache.contains(3));
    assert!(!cache.contains(4));
    assert!(cache.contains(5));
    // The hand fell off the head and wraps: 1's bit was already cleared
    cache.process(&Request::new(7, 6, 1));
    assert!(!cache.contains(1));
    assert!(cache.contains(3));
    assert!(cache.contains(5));
    assert!(cache.contains(6));
}

#[test]
fn arc_adaptation_saturates_on_huge_byte_weights() {
    let weigher = Weigher {
        count_objects: false,
    };
    let mut arc = AdaptiveReplacement::new(u64::MAX, weigher);
    // Two maximum-size objects pass through T2 into the B2 ghost list
    for id in [1u64, 2] {
        let req = Request::new(0, id, u32::MAX);
        arc.on_miss(&req);
        arc.on_insert(&req);
        arc.on_hit(&req);
        assert_eq!(arc.evict(&req), Some(id));
    }
    let req = Request::new(1, 3, u32::MAX);
    arc.on_miss(&req);
    arc.on_insert(&req);
    assert_eq!(arc.evict(&req), Some(3));
    // The B1 ghost hit scales the target by |B2|/|B1| times the object
    // weight, which exceeds u64::MAX and must clamp
    arc.on_miss(&req);
    arc.on_insert(&req);
    assert_eq!(arc.evict(&req), Some(3));
}

#[test]
fn arc_protects_reused_objects_from_scans() {
    let weigher = Weigher {
        count_objects: true,
    };
    let mut cache = CacheEngine::new(4, true, AdaptiveReplacement::new(4, weigher));
    // 1 and 2 are reused and move to T2; 3 and 4 are seen once
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 1, 1), (3, 2, 1), (4, 3, 1), (5, 4, 1)]) {
        cache.process(&req);
    }
    // A new one-shot object displaces the recency side, not 1 or 2
    cache.process(&Request::new(6, 5, 1));
    assert!(cache.contains(1));
    assert!(cache.contains(2));
    assert!(!cache.contains(3));
    // A ghost hit on 3 grows the recency target and re-enters as reused
    cache.process(&Request::new(7, 3, 1));
    assert!(cache.contains(1));
    assert!(cache.contains(2));
    assert!(cache.contains(3));
    assert!(!cache.contains(4));
}

#[test]
fn s3fifo_routes_ghost_hits_to_the_main_queue() {
    let weigher = Weigher {
        count_objects: true,
    };
    // Half the capacity goes to the small queue so it can hold two objects
    let params = S3FifoParams {
        small_ratio: 0.5,
        ..S3FifoParams::default()
    };
    let mut cache = CacheEngine::new(4, true, S3Fifo::new(4, params, weigher));
    for req in requests(&[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1)]) {
        cache.process(&req);
    }
    // 1 leaves the small queue for the ghost list
    cache.process(&Request::new(4, 5, 1));
    assert!(!cache.contains(1));
    // The ghost hit routes 1 into the main queue, where small-queue churn
    // cannot touch it
    cache.process(&Request::new(5, 1, 1));
    assert!(cache.contains(1));
    for req in requests(&[(6, 6, 1), (7, 7, 1), (8, 8, 1)]) {
        cache.process(&req);
    }
    assert!(cache.contains(1));
}

#[test]
fn belady_evicts_the_farthest_future_access() {
    let mut reqs = requests(&[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 1, 1), (4, 3, 1), (5, 2, 1)]);
    annotate_next_access(&mut reqs);
    let mut cache = CacheEngine::new(2, true, Belady::new());
    let mut hits = 0;
    for req in &reqs {
        if cache.process(req) {
            hits += 1;
        }
    }
    // Inserting 3 evicts 2 (next access at 5) over 1 (next access at 3)
    assert_eq!(hits, 2);
    assert_eq!(cache.stats().n_miss, 4);
}

#[test]
fn belady_skips_never_reused_objects() {
    let mut reqs = requests(&[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 1, 1), (4, 2, 1)]);
    annotate_next_access(&mut reqs);
    let mut cache = CacheEngine::new(2, true, Belady::new());
    for req in &reqs {
        cache.process(req);
    }
    // 3 is never requested again, so it is not admitted and 1 and 2 both hit
    assert_eq!(cache.stats().n_miss, 3);
    assert!(!cache.contains(3));
}

// --- workload-level properties ---

#[test]
fn all_policies_thrash_at_capacity_one() {
    let mut reqs: Vec<Request> = (0..20)
        .map(|i| Request::new(i, 1 + (i as u64 % 2), 1))
        .collect();
    annotate_next_access(&mut reqs);
    for policy in ["fifo", "lru", "lfu", "arc", "sieve", "s3fifo"] {
        let ratio = miss_ratio_for(policy, 1, &reqs);
        assert_eq!(ratio, 1.0, "{policy} should thrash with one slot");
    }
    // The oracle declines the second-to-last request (its id never recurs),
    // so the resident object survives and the closing request hits
    assert_eq!(miss_ratio_for("belady", 1, &reqs), 0.95);
}

#[test]
fn stack_policies_are_monotone_in_capacity() {
    let mut reqs = skewed_trace(2000, 100);
    annotate_next_access(&mut reqs);
    for policy in ["lru", "belady"] {
        let mut previous = f64::INFINITY;
        for capacity in [5u64, 10, 20, 40, 80] {
            let ratio = miss_ratio_for(policy, capacity, &reqs);
            assert!(
                ratio <= previous,
                "{policy} got worse with more capacity: {ratio} after {previous}"
            );
            previous = ratio;
        }
    }
}

#[test]
fn queue_policies_improve_with_much_more_capacity() {
    // FIFO and LFU are not stack algorithms, so strict monotonicity is not
    // guaranteed; a 16x capacity jump still has to help
    let reqs = skewed_trace(2000, 100);
    for policy in ["fifo", "lfu"] {
        let small = miss_ratio_for(policy, 5, &reqs);
        let large = miss_ratio_for(policy, 80, &reqs);
        assert!(
            large < small,
            "{policy} did not improve: {large} at 80 slots vs {small} at 5"
        );
    }
}

#[test]
fn belady_is_a_lower_bound() {
    let mut reqs = skewed_trace(2000, 100);
    annotate_next_access(&mut reqs);
    let optimal = miss_ratio_for("belady", 20, &reqs);
    for policy in ["fifo", "lru", "lfu", "arc", "sieve", "s3fifo"] {
        let ratio = miss_ratio_for(policy, 20, &reqs);
        assert!(
            optimal <= ratio,
            "{policy} beat the oracle: {ratio} < {optimal}"
        );
    }
}

#[test]
fn scan_resistant_policies_beat_recency_on_scans() {
    let reqs = hot_cold_trace(8, 3, 30, 32, 100);
    let lru = miss_ratio_for("lru", 20, &reqs);
    let fifo = miss_ratio_for("fifo", 20, &reqs);
    for policy in ["sieve", "arc", "s3fifo"] {
        let ratio = miss_ratio_for(policy, 20, &reqs);
        assert!(ratio < lru, "{policy} ({ratio}) not better than LRU ({lru})");
        assert!(ratio < fifo, "{policy} ({ratio}) not better than FIFO ({fifo})");
    }
}

// --- trace reading ---

#[test]
fn reads_standard_binary_traces() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.standardbin");
    let reqs = requests(&[(1, 42, 100), (2, 7, 200)]);
    write_standard_trace(&path, &reqs)?;
    let read: Vec<Request> =
        TraceReader::open(&path, TraceFormat::StandardBin)?.collect::<Result<_, _>>()?;
    assert_eq!(read.len(), 2);
    assert_eq!(read[0].object_id, 42);
    assert_eq!(read[1].size, 200);
    assert_eq!(read[0].next_access_vtime, NEXT_ACCESS_UNKNOWN);
    Ok(())
}

#[test]
fn reads_oracle_annotations() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.oracleGeneral");
    let mut reqs = requests(&[(1, 42, 100), (2, 7, 200), (3, 42, 100)]);
    annotate_next_access(&mut reqs);
    write_oracle_trace(&path, &reqs)?;
    let read: Vec<Request> =
        TraceReader::open(&path, TraceFormat::OracleGeneral)?.collect::<Result<_, _>>()?;
    assert_eq!(read[0].next_access_vtime, 2);
    assert_eq!(read[1].next_access_vtime, NEXT_ACCESS_NEVER);
    assert_eq!(read[2].next_access_vtime, NEXT_ACCESS_NEVER);
    Ok(())
}

#[test]
fn rejects_truncated_binary_traces() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cut.standardbin");
    std::fs::write(&path, [0u8; 20])?;
    let err = TraceReader::open(&path, TraceFormat::StandardBin)
        .map(|_| ())
        .unwrap_err();
    match err {
        SimError::TruncatedTrace { len, record_size, .. } => {
            assert_eq!(len, 20);
            assert_eq!(record_size, 16);
        }
        other => panic!("expected a truncation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn reads_text_traces_with_remapped_columns() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.txt");
    std::fs::write(&path, "42 1 100\n7 2 200\n")?;
    // Columns are object, time, size in this file
    let format: TraceFormat = "txt:1,0,2".parse()?;
    assert_eq!(
        format,
        TraceFormat::Txt(TxtColumns {
            time: 1,
            object: 0,
            size: 2,
        })
    );
    let read: Vec<Request> = TraceReader::open(&path, format)?.collect::<Result<_, _>>()?;
    assert_eq!(read[0].timestamp, 1);
    assert_eq!(read[0].object_id, 42);
    assert_eq!(read[1].object_id, 7);
    Ok(())
}

#[test]
fn reports_malformed_text_records() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.txt");
    std::fs::write(&path, "1,1,100\n2,nonsense,100\n")?;
    let mut reader = TraceReader::open(&path, TraceFormat::Txt(TxtColumns::default()))?;
    assert!(reader.next().unwrap().is_ok());
    match reader.next() {
        Some(Err(SimError::MalformedRecord { record, .. })) => assert_eq!(record, 2),
        other => panic!("expected a malformed record error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn txt_round_trips_through_the_writer() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("small.csv");
    let reqs = requests(&[(1, 42, 100), (2, 7, 200)]);
    write_txt_trace(&path, &reqs)?;
    let read: Vec<Request> = TraceReader::open(&path, "csv".parse()?)?.collect::<Result<_, _>>()?;
    assert_eq!(read, reqs);
    Ok(())
}

// --- configuration parsing ---

#[test]
fn parses_cache_size_specs() {
    assert_eq!(
        "1048576".parse::<CacheSizeSpec>().unwrap(),
        CacheSizeSpec::Absolute(1048576)
    );
    assert_eq!(
        "16MiB".parse::<CacheSizeSpec>().unwrap(),
        CacheSizeSpec::Absolute(16 << 20)
    );
    assert_eq!(
        "0.5GiB".parse::<CacheSizeSpec>().unwrap(),
        CacheSizeSpec::Absolute(512 << 20)
    );
    assert_eq!(
        "0.01".parse::<CacheSizeSpec>().unwrap(),
        CacheSizeSpec::Fraction(0.01)
    );
    assert!("0".parse::<CacheSizeSpec>().is_err());
    assert!("1.5".parse::<CacheSizeSpec>().is_err());
    assert!("10kb".parse::<CacheSizeSpec>().is_err());
    assert_eq!(CacheSizeSpec::Fraction(0.5).resolve(1000), 500);
    assert_eq!(CacheSizeSpec::Absolute(42).resolve(1000), 42);
}

#[test]
fn parses_policy_names() {
    assert_eq!("LRU".parse::<PolicyConfig>().unwrap(), PolicyConfig::Lru);
    assert_eq!(
        "oracle".parse::<PolicyConfig>().unwrap(),
        PolicyConfig::Belady
    );
    let policy: PolicyConfig = "s3fifo-0.05-1".parse().unwrap();
    assert_eq!(policy.label(), "S3FIFO-0.0500-1");
    assert_eq!(
        "s3fifo".parse::<PolicyConfig>().unwrap().label(),
        "S3FIFO-0.1000-2"
    );
    assert!("clock".parse::<PolicyConfig>().is_err());
    assert!("s3fifo-2.0".parse::<PolicyConfig>().is_err());
}

#[test]
fn rejects_oracle_policies_on_plain_traces() {
    let config = SweepConfig {
        trace_path: "trace.bin".into(),
        format: TraceFormat::StandardBin,
        policies: vec![PolicyConfig::Belady],
        cache_sizes: vec![CacheSizeSpec::Absolute(1024)],
        ignore_obj_size: false,
        num_threads: 1,
        report_interval: 0,
        warmup_sec: 0,
    };
    assert!(matches!(
        config.validate(),
        Err(SimError::MissingOracleHints { .. })
    ));
}

// --- sweeps ---

fn sweep_config(trace: &std::path::Path, policies: &str, sizes: &str) -> SweepConfig {
    let mut config = SweepConfig::parse(
        trace.to_str().unwrap(),
        "standardBin",
        policies,
        sizes,
    )
    .unwrap();
    config.ignore_obj_size = true;
    config.num_threads = 2;
    config
}

#[test]
fn sweeps_run_policy_major_and_deterministic() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("skewed.standardbin");
    write_standard_trace(&path, &skewed_trace(500, 50))?;
    let sweep = Sweep::new(sweep_config(&path, "lru,fifo", "5,10"))?;
    let results = sweep.run()?;
    assert_eq!(results.len(), 4);
    let labels: Vec<(&str, u64)> = results
        .iter()
        .map(|r| (r.policy.as_str(), r.cache_size))
        .collect();
    assert_eq!(
        labels,
        vec![("LRU", 5), ("LRU", 10), ("FIFO", 5), ("FIFO", 10)]
    );
    for result in &results {
        assert_eq!(result.n_req, 500);
    }
    // A second run over the same trace reproduces every counter
    assert_eq!(results, Sweep::new(sweep_config(&path, "lru,fifo", "5,10"))?.run()?);
    Ok(())
}

#[test]
fn fractional_sizes_resolve_against_the_working_set() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tiny.standardbin");
    let reqs = requests(&[(0, 1, 10), (1, 2, 20), (2, 1, 10), (3, 3, 30), (4, 4, 40)]);
    write_standard_trace(&path, &reqs)?;
    assert_eq!(working_set_size(&path, TraceFormat::StandardBin, false)?, 100);
    assert_eq!(working_set_size(&path, TraceFormat::StandardBin, true)?, 4);
    let sweep = Sweep::new(sweep_config(&path, "lru", "0.5"))?;
    let results = sweep.run()?;
    assert_eq!(results[0].cache_size, 2);
    Ok(())
}

#[test]
fn reporting_survives_backwards_timestamps() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("backwards.standardbin");
    // The timestamp jumps back after the first progress report has fired
    let reqs = requests(&[(0, 1, 1), (90_000, 2, 1), (50, 3, 1)]);
    write_standard_trace(&path, &reqs)?;
    let mut config = sweep_config(&path, "lru", "5");
    config.report_interval = 86_400;
    let results = Sweep::new(config)?.run()?;
    assert_eq!(results[0].n_req, 3);
    assert_eq!(results[0].n_miss, 3);
    Ok(())
}

#[test]
fn warmup_excludes_leading_trace_time() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("warm.standardbin");
    // Ten requests in the first 10 seconds, ten more afterwards
    let reqs: Vec<Request> = (0..20).map(|i| Request::new(i, i as u64 % 5, 1)).collect();
    write_standard_trace(&path, &reqs)?;
    let mut config = sweep_config(&path, "lru", "5");
    config.warmup_sec = 10;
    let results = Sweep::new(config)?.run()?;
    assert_eq!(results[0].n_req, 10);
    // The warmup populated the cache, so the counted half all hits
    assert_eq!(results[0].n_miss, 0);
    Ok(())
}

// --- reporting ---

#[test]
fn result_lines_use_the_fixed_schema() {
    let result = SimResult {
        policy: "LRU".to_string(),
        cache_size: 1024,
        n_req: 100,
        n_miss: 25,
        n_req_byte: 1000,
        n_miss_byte: 250,
        elapsed_trace_sec: 3600,
    };
    assert_eq!(
        format_result_line("cloudphysics.bin", &result),
        "result cloudphysics.bin LRU cache_size 1024, 100 req, miss ratio 0.2500, byte miss ratio 0.2500"
    );
}

#[test]
fn results_round_trip_through_json() -> Result<(), Box<dyn Error>> {
    let result = SimResult {
        policy: "S3FIFO-0.1000-2".to_string(),
        cache_size: 16 << 20,
        n_req: 12345,
        n_miss: 678,
        n_req_byte: 987654,
        n_miss_byte: 54321,
        elapsed_trace_sec: 86400,
    };
    let rendered = serde_json::to_string(&result)?;
    let parsed: SimResult = serde_json::from_str(&rendered)?;
    assert_eq!(parsed, result);
    Ok(())
}
