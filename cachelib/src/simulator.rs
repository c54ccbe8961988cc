use std::cmp;
use std::collections::HashMap;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::cache::{EngineStats, GenericCache};
use crate::config::{CacheSizeSpec, PolicyConfig, SweepConfig};
use crate::error::SimError;
use crate::trace::{TraceFormat, TraceReader};

/// The outcome of one (policy, cache size) run over a trace. Immutable once
/// produced; serialisable for machine-readable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimResult {
    pub policy: String,
    pub cache_size: u64,
    pub n_req: u64,
    pub n_miss: u64,
    pub n_req_byte: u64,
    pub n_miss_byte: u64,
    /// Trace time covered, in seconds from the first request
    pub elapsed_trace_sec: u32,
}

impl SimResult {
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

/// One (policy, cache size) engine instance to drive over the trace.
#[derive(Debug, Clone)]
struct RunSpec {
    policy: PolicyConfig,
    label: String,
    cache_size: u64,
}

/// Total weight of the distinct objects in a trace, used to resolve
/// fractional cache sizes. Streams the whole trace once; sizes count from
/// each object's first appearance
pub fn working_set_size(
    path: &Path,
    format: TraceFormat,
    ignore_obj_size: bool,
) -> Result<u64, SimError> {
    let reader = TraceReader::open(path, format)?;
    let mut seen: HashMap<u64, u64> = HashMap::new();
    let mut total: u64 = 0;
    for req in reader {
        let req = req?;
        let weight = if ignore_obj_size { 1 } else { req.size as u64 };
        seen.entry(req.object_id).or_insert_with(|| {
            total += weight;
            weight
        });
    }
    Ok(total)
}

/// Runs one engine per (policy, cache size) pair over a trace, in parallel.
///
/// Engines never share mutable state: every engine gets its own reader pass
/// over the trace file, so workers only synchronise at start and join. All
/// engines still see the identical request order, because each pass decodes
/// the same file sequentially.
///
/// Construction validates the whole sweep - the trace must open, every
/// policy name must resolve, and fractional sizes are resolved against the
/// working-set size - so `run` starts no work that is known to fail
pub struct Sweep {
    config: SweepConfig,
    dataset: String,
    runs: Vec<RunSpec>,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Result<Self, SimError> {
        config.validate()?;
        // Probe now so a missing or truncated trace fails the sweep before
        // any worker starts
        TraceReader::open(&config.trace_path, config.format)?;
        let dataset = config
            .trace_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.trace_path.display().to_string());
        let working_set = if config.cache_sizes.iter().any(CacheSizeSpec::is_fraction) {
            let wss = working_set_size(&config.trace_path, config.format, config.ignore_obj_size)?;
            let unit = if config.ignore_obj_size { "objects" } else { "bytes" };
            println!("[INFO] {dataset}: working set size {wss} {unit}");
            wss
        } else {
            0
        };
        let mut runs = Vec::with_capacity(config.policies.len() * config.cache_sizes.len());
        for policy in &config.policies {
            for spec in &config.cache_sizes {
                runs.push(RunSpec {
                    policy: policy.clone(),
                    label: policy.label(),
                    cache_size: spec.resolve(working_set),
                });
            }
        }
        Ok(Self {
            config,
            dataset,
            runs,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Drives every engine over the trace and returns the results in
    /// configuration order (policy-major), independent of worker
    /// interleaving.
    pub fn run(&self) -> Result<Vec<SimResult>, SimError> {
        let n_workers = cmp::max(1, cmp::min(self.config.num_threads, self.runs.len()));
        let mut merged: Vec<Option<SimResult>> = vec![None; self.runs.len()];
        thread::scope(|scope| -> Result<(), SimError> {
            let mut handles = Vec::with_capacity(n_workers);
            for worker in 0..n_workers {
                handles.push(scope.spawn(move || {
                    let mut results = Vec::new();
                    for (idx, run) in
                        self.runs.iter().enumerate().skip(worker).step_by(n_workers)
                    {
                        results.push((idx, self.run_one(run)?));
                    }
                    Ok::<_, SimError>(results)
                }));
            }
            for handle in handles {
                let worker_results = handle.join().map_err(|_| SimError::WorkerPanic)??;
                for (idx, result) in worker_results {
                    merged[idx] = Some(result);
                }
            }
            Ok(())
        })?;
        Ok(merged.into_iter().flatten().collect())
    }

    /// One full pass of the trace through one engine.
    fn run_one(&self, run: &RunSpec) -> Result<SimResult, SimError> {
        let config = &self.config;
        let mut reader = TraceReader::open(&config.trace_path, config.format)?;
        let mut engine = GenericCache::build(&run.policy, run.cache_size, config.ignore_obj_size);
        let mut start_ts: Option<u32> = None;
        let mut elapsed: u32 = 0;
        let mut last_report = config.warmup_sec;
        let mut last_stats = EngineStats::default();
        for req in reader.by_ref() {
            let req = req?;
            let start = *start_ts.get_or_insert(req.timestamp);
            elapsed = req.timestamp.saturating_sub(start);
            if elapsed < config.warmup_sec {
                engine.warm(&req);
                continue;
            }
            engine.process(&req);
            // Saturate: timestamps may run backwards mid-trace
            if config.report_interval > 0
                && elapsed.saturating_sub(last_report) >= config.report_interval
            {
                let stats = *engine.stats();
                self.report_progress(run, elapsed, &stats, &last_stats);
                last_stats = stats;
                last_report = elapsed;
            }
        }
        let stats = engine.stats();
        Ok(SimResult {
            policy: run.label.clone(),
            cache_size: run.cache_size,
            n_req: stats.n_req,
            n_miss: stats.n_miss,
            n_req_byte: stats.n_req_byte,
            n_miss_byte: stats.n_miss_byte,
            elapsed_trace_sec: elapsed,
        })
    }

    /// Interim progress line with cumulative and interval miss ratios.
    fn report_progress(
        &self,
        run: &RunSpec,
        elapsed: u32,
        stats: &EngineStats,
        last: &EngineStats,
    ) {
        let interval_req = stats.n_req - last.n_req;
        let interval_ratio = if interval_req == 0 {
            0.0
        } else {
            (stats.n_miss - last.n_miss) as f64 / interval_req as f64
        };
        println!(
            "[INFO] {} {} cache_size {}: {:.2} hour, {} req, miss ratio {:.4}, interval miss ratio {:.4}",
            self.dataset,
            run.label,
            run.cache_size,
            elapsed as f64 / 3600.0,
            stats.n_req,
            stats.miss_ratio(),
            interval_ratio
        );
    }

    /// Emits one `result` line per run on stdout in the fixed
    /// whitespace-tokenized schema callers parse.
    pub fn print_results(&self, results: &[SimResult]) {
        for result in results {
            println!("{}", format_result_line(&self.dataset, result));
        }
    }
}

/// `result <dataset> <policy> cache_size <N>, <n_req> req, miss ratio <f>,
/// byte miss ratio <f>`
pub fn format_result_line(dataset: &str, result: &SimResult) -> String {
    format!(
        "result {} {} cache_size {}, {} req, miss ratio {:.4}, byte miss ratio {:.4}",
        dataset,
        result.policy,
        result.cache_size,
        result.n_req,
        result.miss_ratio(),
        result.byte_miss_ratio()
    )
}
