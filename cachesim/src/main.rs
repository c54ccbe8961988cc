use std::process::exit;

use clap::Parser;
use log::debug;

use cachelib::config::SweepConfig;
use cachelib::simulator::Sweep;

#[derive(Parser, Debug)]
#[command(about = "Trace-driven cache simulator: sweeps eviction policies across cache sizes")]
struct Args {
    /// Path to the trace file
    trace: String,

    /// Trace format: standardbin, oraclegeneral, or txt[:time,obj,size]
    format: String,

    /// Comma-separated eviction policies, e.g. fifo,lru,arc,sieve,s3fifo,belady
    policies: String,

    /// Comma-separated cache sizes: bytes (1048576), unit-suffixed (16MiB),
    /// or fractions of the working set (0.01)
    cache_sizes: String,

    /// Treat every object as weight 1, so capacity counts objects (0 or 1)
    #[arg(long, default_value_t = 0)]
    ignore_obj_size: u8,

    /// Number of worker threads; defaults to the number of cores
    #[arg(long)]
    num_thread: Option<usize>,

    /// Progress report interval in trace seconds; 0 disables interim reports
    #[arg(long, default_value_t = 86400)]
    report_interval: u32,

    /// Leading trace seconds to replay without counting
    #[arg(long, default_value_t = 0)]
    warmup_sec: u32,

    /// Additionally print the results as pretty JSON
    #[arg(long)]
    json: bool,
}

fn run(args: &Args) -> Result<(), String> {
    let mut config =
        SweepConfig::parse(&args.trace, &args.format, &args.policies, &args.cache_sizes)
            .map_err(|e| e.to_string())?;
    config.ignore_obj_size = args.ignore_obj_size != 0;
    if let Some(n) = args.num_thread {
        if n == 0 {
            return Err("--num-thread must be at least 1".to_string());
        }
        config.num_threads = n;
    }
    config.report_interval = args.report_interval;
    config.warmup_sec = args.warmup_sec;
    let sweep = Sweep::new(config).map_err(|e| e.to_string())?;
    let results = sweep.run().map_err(|e| e.to_string())?;
    sweep.print_results(&results);
    if args.json {
        let rendered = serde_json::to_string_pretty(&results)
            .map_err(|e| format!("Couldn't serialise the results: {e}"))?;
        println!("{rendered}");
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    debug!("Parsed arguments: {args:?}");
    if let Err(e) = run(&args) {
        eprintln!("[ERROR] {e}");
        exit(1);
    }
}
