use std::path::PathBuf;
use std::str::FromStr;
use std::thread;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::SimError;
use crate::eviction::S3FifoParams;
use crate::trace::TraceFormat;

/// The eviction policy for a sweep run - fifo, lru, lfu, arc, sieve, s3fifo,
/// or belady. S3-FIFO variants can carry tuned parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum PolicyConfig {
    #[serde(alias = "fifo")]
    Fifo,
    #[serde(alias = "lru")]
    Lru,
    #[serde(alias = "lfu")]
    Lfu,
    #[serde(alias = "arc")]
    Arc,
    #[serde(alias = "sieve")]
    Sieve,
    #[serde(alias = "s3fifo")]
    S3Fifo(S3FifoParams),
    #[serde(alias = "belady")]
    Belady,
}

impl PolicyConfig {
    /// Name used in report and result lines.
    pub fn label(&self) -> String {
        match self {
            PolicyConfig::Fifo => "FIFO".to_string(),
            PolicyConfig::Lru => "LRU".to_string(),
            PolicyConfig::Lfu => "LFU".to_string(),
            PolicyConfig::Arc => "ARC".to_string(),
            PolicyConfig::Sieve => "Sieve".to_string(),
            PolicyConfig::S3Fifo(params) => params.label(),
            PolicyConfig::Belady => "Belady".to_string(),
        }
    }

    /// Whether the policy needs next-access annotations from the trace.
    pub fn requires_oracle_hints(&self) -> bool {
        matches!(self, PolicyConfig::Belady)
    }
}

impl FromStr for PolicyConfig {
    type Err = SimError;

    /// Accepts lowercase policy names; S3-FIFO additionally as
    /// `s3fifo-<small_ratio>[-<promote_threshold>]` (e.g. `s3fifo-0.05-1`).
    fn from_str(s: &str) -> Result<Self, SimError> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "fifo" => Ok(PolicyConfig::Fifo),
            "lru" => Ok(PolicyConfig::Lru),
            "lfu" => Ok(PolicyConfig::Lfu),
            "arc" => Ok(PolicyConfig::Arc),
            "sieve" => Ok(PolicyConfig::Sieve),
            "s3fifo" => Ok(PolicyConfig::S3Fifo(S3FifoParams::default())),
            "belady" | "oracle" => Ok(PolicyConfig::Belady),
            _ => {
                let Some(rest) = lower.strip_prefix("s3fifo-") else {
                    return Err(SimError::UnknownPolicy(s.to_string()));
                };
                let mut params = S3FifoParams::default();
                let mut parts = rest.split('-');
                match parts.next().map(|r| r.parse::<f64>()) {
                    Some(Ok(ratio)) if ratio > 0.0 && ratio < 1.0 => params.small_ratio = ratio,
                    _ => return Err(SimError::UnknownPolicy(s.to_string())),
                }
                if let Some(threshold) = parts.next() {
                    match threshold.parse::<u32>() {
                        Ok(t) => params.promote_threshold = t,
                        Err(_) => return Err(SimError::UnknownPolicy(s.to_string())),
                    }
                }
                if parts.next().is_some() {
                    return Err(SimError::UnknownPolicy(s.to_string()));
                }
                Ok(PolicyConfig::S3Fifo(params))
            }
        }
    }
}

lazy_static! {
    static ref SIZE_PATTERN: Regex =
        Regex::new(r"^(?P<number>[0-9]+(?:\.[0-9]+)?)(?P<unit>KiB|MiB|GiB|TiB)?$").unwrap();
}

/// A requested cache size: either absolute (bytes, or objects when sizes are
/// ignored) or a fraction of the trace's working-set size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheSizeSpec {
    Absolute(u64),
    Fraction(f64),
}

impl CacheSizeSpec {
    pub fn is_fraction(&self) -> bool {
        matches!(self, CacheSizeSpec::Fraction(_))
    }

    /// Resolves against the working-set size; absolute specs pass through.
    pub fn resolve(&self, working_set_size: u64) -> u64 {
        match *self {
            CacheSizeSpec::Absolute(n) => n,
            CacheSizeSpec::Fraction(f) => ((working_set_size as f64 * f) as u64).max(1),
        }
    }
}

impl FromStr for CacheSizeSpec {
    type Err = SimError;

    /// Accepts plain integers (`1048576`), unit-suffixed sizes (`16MiB`,
    /// `0.5GiB`), and fractions of the working set in (0,1) (`0.01`).
    fn from_str(s: &str) -> Result<Self, SimError> {
        let bad = || SimError::BadCacheSize(s.to_string());
        let trimmed = s.trim();
        let captures = SIZE_PATTERN.captures(trimmed).ok_or_else(bad)?;
        let number = &captures["number"];
        match captures.name("unit").map(|u| u.as_str()) {
            Some(unit) => {
                let multiplier: u64 = match unit {
                    "KiB" => 1 << 10,
                    "MiB" => 1 << 20,
                    "GiB" => 1 << 30,
                    _ => 1 << 40,
                };
                let value: f64 = number.parse().map_err(|_| bad())?;
                if value <= 0.0 {
                    return Err(bad());
                }
                Ok(CacheSizeSpec::Absolute((value * multiplier as f64) as u64))
            }
            None if number.contains('.') => {
                let fraction: f64 = number.parse().map_err(|_| bad())?;
                if fraction <= 0.0 || fraction >= 1.0 {
                    return Err(bad());
                }
                Ok(CacheSizeSpec::Fraction(fraction))
            }
            None => {
                let value: u64 = number.parse().map_err(|_| bad())?;
                if value == 0 {
                    return Err(bad());
                }
                Ok(CacheSizeSpec::Absolute(value))
            }
        }
    }
}

/// Everything a sweep needs: the trace, the policies, the cache sizes, and
/// the execution knobs. All (policy, size) combinations are validated before
/// any engine starts
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub trace_path: PathBuf,
    pub format: TraceFormat,
    pub policies: Vec<PolicyConfig>,
    pub cache_sizes: Vec<CacheSizeSpec>,
    /// Capacity and sizes count objects instead of bytes
    pub ignore_obj_size: bool,
    pub num_threads: usize,
    /// Progress report interval in trace seconds; 0 disables interim reports
    pub report_interval: u32,
    /// Leading trace seconds processed without counting
    pub warmup_sec: u32,
}

impl SweepConfig {
    /// Builds a config from the CLI's comma-separated argument strings.
    pub fn parse(
        trace_path: &str,
        format: &str,
        policies: &str,
        cache_sizes: &str,
    ) -> Result<Self, SimError> {
        let policies = policies
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(PolicyConfig::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        let cache_sizes = cache_sizes
            .split(',')
            .filter(|c| !c.trim().is_empty())
            .map(CacheSizeSpec::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        let config = Self {
            trace_path: PathBuf::from(trace_path),
            format: format.parse()?,
            policies,
            cache_sizes,
            ignore_obj_size: false,
            num_threads: thread::available_parallelism().map_or(1, |n| n.get()),
            report_interval: 0,
            warmup_sec: 0,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.policies.is_empty() {
            return Err(SimError::EmptySweep("policies"));
        }
        if self.cache_sizes.is_empty() {
            return Err(SimError::EmptySweep("cache sizes"));
        }
        for policy in &self.policies {
            if policy.requires_oracle_hints() && !self.format.carries_oracle_hints() {
                return Err(SimError::MissingOracleHints {
                    policy: policy.label(),
                    format: self.format.to_string(),
                });
            }
        }
        Ok(())
    }
}
