// experiment/src/main.rs

mod experiment;
mod ledger;
mod plot;
mod report;
mod run_log;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use elsh_fmap::ProtocolParams;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use experiment::{run_experiment, RunOptions};
use ledger::{Ledger, RunEntry};
use report::{percent, ScaleRow};

/// CLI arguments for the multi-scale experiment.
#[derive(Parser, Debug)]
#[command(name = "elsh-experiment")]
#[command(about = "Validate E-LSH Fmap detection rates against the closed-form prediction")]
struct Args {
    /// Vector dimension.
    #[arg(long, default_value_t = 128)]
    d: usize,

    /// Hamming distance threshold.
    #[arg(long, default_value_t = 10)]
    delta: usize,

    /// Number of hash functions (subsets), L.
    #[arg(short = 'L', long, default_value_t = 32)]
    num_hashes: usize,

    /// Entropy threshold in (0, 1).
    #[arg(long, default_value_t = 0.5)]
    tau: f64,

    /// Seed of the public subsets.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Seed of the synthetic test data. Fresh entropy when absent.
    #[arg(long)]
    data_seed: Option<u64>,

    /// Set sizes as powers of two, e.g. `8,10,12`.
    #[arg(long, value_delimiter = ',', default_values_t = vec![8u32, 10, 12])]
    sizes: Vec<u32>,

    /// Root directory for all run artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// JSON file with protocol parameters. Overrides --d, --delta, -L, --tau and --seed.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reuse test_data.bin from an earlier run of the same scale.
    #[arg(long)]
    reuse_data: bool,

    /// Skip chart rendering.
    #[arg(long)]
    no_plot: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let params = match &args.config {
        Some(path) => load_params(path)?,
        None => ProtocolParams {
            d: args.d,
            delta: args.delta,
            num_hashes: args.num_hashes,
            tau: args.tau,
            seed: args.seed,
        },
    };
    params.validate()?;

    if let Some(&s) = args.sizes.iter().find(|&&s| s >= usize::BITS / 2) {
        return Err(format!("size 2^{} is too large for a full cross-product evaluation", s).into());
    }

    fs::create_dir_all(&args.output_dir)?;

    println!("{}", "=".repeat(80));
    println!("🔬 E-LSH FMAP MULTI-SCALE EXPERIMENT");
    println!("{}", "=".repeat(80));
    println!(
        "Params: d={}, delta={}, L={}, tau={}",
        params.d, params.delta, params.num_hashes, params.tau
    );
    let scales: Vec<String> = args.sizes.iter().map(|s| format!("2^{}={}", s, 1usize << s)).collect();
    println!("Scales: [{}]", scales.join(", "));
    println!("{}", "=".repeat(80));

    let mut ledger = Ledger::load(&args.output_dir.join("results.json"))?;
    let mut rows = Vec::with_capacity(args.sizes.len());

    for &s in &args.sizes {
        let n = 1usize << s;
        println!("\n{}", "=".repeat(80));
        println!("▶️  Running n = 2^{} = {}", s, n);
        println!("{}\n", "=".repeat(80));

        let outcome = run_experiment(&RunOptions {
            n,
            params,
            data_seed: args.data_seed,
            output_dir: args.output_dir.clone(),
            reuse_data: args.reuse_data,
            plot: !args.no_plot,
        })?;

        let counters = outcome.evaluation.counters;
        println!("📁 Results in: {}", outcome.dir.display());
        rows.push(ScaleRow {
            n,
            log2_n: s,
            close_rate: percent(counters.true_positive, counters.total_close()),
            far_rate: percent(counters.true_negative, counters.total_far()),
        });
        ledger.insert(RunEntry::new(
            outcome.run_name,
            n,
            params,
            outcome.k,
            counters,
            outcome.evaluation.theory,
            outcome.timings,
        ));
    }

    ledger.save()?;
    let summary_path = args.output_dir.join("all_experiments_summary.txt");
    report::write_all_summary(&summary_path, &params, &rows)?;
    info!("ledger now holds {} runs", ledger.len());

    println!("\n{}", "=".repeat(80));
    println!("✅ All experiments complete!");
    println!("Summary saved to: {}", summary_path.display());
    println!("{}", "=".repeat(80));

    Ok(())
}

fn load_params(path: &Path) -> Result<ProtocolParams, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)?;
    let params: ProtocolParams = serde_json::from_str(&data)?;
    info!("protocol parameters loaded from {}", path.display());
    Ok(params)
}
