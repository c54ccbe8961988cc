use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cachelib::cache::GenericCache;
use cachelib::config::PolicyConfig;
use cachelib::request::Request;
use cachelib::util::annotate_next_access;

/// A deterministic skewed workload, kept in memory so the numbers measure
/// the engines and not the I/O.
fn workload(n_req: usize, n_obj: u64) -> Vec<Request> {
    let mut state: u64 = 0x2545F4914F6CDD1D;
    let mut reqs = Vec::with_capacity(n_req);
    for i in 0..n_req {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let id = ((state >> 33) % n_obj).min((state >> 13) % n_obj);
        reqs.push(Request::new(i as u32, id, 4096));
    }
    annotate_next_access(&mut reqs);
    reqs
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let reqs = workload(1_000_000, 100_000);
    let mut group = c.benchmark_group("Engines");
    group.throughput(Throughput::Elements(reqs.len() as u64));
    for policy in ["fifo", "lru", "lfu", "arc", "sieve", "s3fifo", "belady"] {
        let config: PolicyConfig = policy.parse().unwrap();
        group.bench_with_input(BenchmarkId::new("policy", policy), &config, |bench, config| {
            bench.iter(|| {
                let mut cache = GenericCache::build(config, 10_000, true);
                for req in &reqs {
                    cache.process(req);
                }
                cache.stats().miss_ratio()
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
