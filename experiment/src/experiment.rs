use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use elsh_fmap::{BandRate, ElshFmap, Evaluation, ProtocolParams, TestData, VectorPairGenerator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::plot;
use crate::report::{self, ReportResult};
use crate::run_log::RunLog;

/// Wall-clock time of each phase, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Timings {
    pub setup_ms: f64,
    pub id_ms: f64,
    pub evaluation_ms: f64,
}

pub struct RunOptions {
    pub n: usize,
    pub params: ProtocolParams,
    /// Seed for the test data; fresh entropy when `None`.
    pub data_seed: Option<u64>,
    pub output_dir: PathBuf,
    /// Load `test_data.bin` from a previous run of the same scale if present.
    pub reuse_data: bool,
    pub plot: bool,
}

pub struct RunOutcome {
    pub run_name: String,
    pub dir: PathBuf,
    pub k: usize,
    pub evaluation: Evaluation,
    pub timings: Timings,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    n: usize,
    params: &'a ProtocolParams,
    k: usize,
    counters: &'a elsh_fmap::ConfusionCounters,
    theory: &'a elsh_fmap::TheoreticalPrediction,
    bands: Vec<BandRate>,
    timings: Timings,
}

pub fn run_name(n: usize, params: &ProtocolParams) -> String {
    format!("n{}_d{}_delta{}", n, params.d, params.delta)
}

/// Both sides hold `n` vectors of length `d` and the distance matrix is `n × n`.
fn check_test_data(data: &TestData, n: usize, d: usize) -> Result<(), String> {
    for (side, vectors) in [("senders", &data.senders), ("receivers", &data.receivers)] {
        if vectors.len() != n {
            return Err(format!("{} {} vectors, expected {}", vectors.len(), side, n));
        }
        if let Some(v) = vectors.iter().find(|v| v.len() != d) {
            return Err(format!("{} vector of length {}, expected {}", side, v.len(), d));
        }
    }
    if data.distances.size() != n {
        return Err(format!("distance matrix of size {}, expected {}", data.distances.size(), n));
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// One scale: generate data, fingerprint both sides, evaluate, write every artifact
/// into `<output_dir>/n{n}_d{d}_delta{delta}/`.
pub fn run_experiment(opts: &RunOptions) -> ReportResult<RunOutcome> {
    let params = opts.params;
    let n = opts.n;
    let name = run_name(n, &params);
    let dir = opts.output_dir.join(&name);
    fs::create_dir_all(&dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut log = RunLog::open(&dir.join("experiment.log"))?;

    log.rule()?;
    log.line("E-LSH Fmap experiment")?;
    log.rule()?;
    log.line(format!("Run directory: {}", dir.display()))?;
    log.line(format!("Scale: n={} (2^{})", n, n.max(1).ilog2()))?;
    log.line(format!("Timestamp: {}", timestamp))?;
    log.line("")?;

    // Protocol setup
    let mut timings = Timings::default();
    let start = Instant::now();
    let fmap = ElshFmap::new(params)?;
    timings.setup_ms = elapsed_ms(start);

    log.lines([
        "Parameters:".to_string(),
        format!("  d = {}", params.d),
        format!("  delta = {}", params.delta),
        format!("  k = {}", fmap.k()),
        format!("  L = {}", params.num_hashes),
        format!("  tau = {}", params.tau),
        format!(
            "  high-entropy dimensions = {}{}",
            fmap.pool().len(),
            if fmap.pool().used_fallback() { " (ranked fallback)" } else { "" }
        ),
        String::new(),
    ])?;

    // Test data
    let data_path = dir.join("test_data.bin");
    let data: TestData = if opts.reuse_data && data_path.exists() {
        log.line(format!("Reusing test data from {}", data_path.display()))?;
        let data = report::load_test_data(&data_path)?;
        if let Err(reason) = check_test_data(&data, n, params.d) {
            return Err(format!("{}: {}", data_path.display(), reason).into());
        }
        data
    } else {
        log.line("Generating test data...")?;
        let mut rng = match opts.data_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let data = VectorPairGenerator::new(params.d, params.delta)?.generate(n, &mut rng)?;
        report::save_test_data(&data_path, &data)?;
        log.line(format!("Test data saved to: {}", data_path.display()))?;
        data
    };
    log.line(format!(
        "{} sender vectors and {} receiver vectors ready",
        data.senders.len(),
        data.receivers.len()
    ))?;
    log.line("")?;

    // ID sets
    let start = Instant::now();
    log.line("Computing sender ID sets...")?;
    let sender_ids = fmap.compute_id_batch(&data.senders)?;
    log.line("Computing receiver ID sets...")?;
    let receiver_ids = fmap.compute_id_batch(&data.receivers)?;
    timings.id_ms = elapsed_ms(start);
    log.line("")?;

    log.line("Writing vector dumps...")?;
    let dumps = [
        ("sender_raw_vectors.txt", &data.senders, None),
        ("sender_id_sets.txt", &data.senders, Some(sender_ids.as_slice())),
        ("receiver_raw_vectors.txt", &data.receivers, None),
        ("receiver_id_sets.txt", &data.receivers, Some(receiver_ids.as_slice())),
    ];
    for (file, vectors, ids) in dumps {
        let path = dir.join(file);
        report::save_vectors_to_txt(&path, vectors, ids)?;
        log.line(format!("  {}", path.display()))?;
    }
    log.line("")?;

    // Evaluation
    log.rule()?;
    log.line("Verification")?;
    log.rule()?;

    let start = Instant::now();
    let evaluation = fmap
        .evaluator()
        .evaluate(&sender_ids, &receiver_ids, &data.distances)?;
    timings.evaluation_ms = elapsed_ms(start);

    let csv_path = dir.join("match_results.csv");
    report::write_match_csv(&csv_path, &evaluation.records)?;
    log.line(format!("Match results saved to: {}", csv_path.display()))?;
    log.line("")?;

    log.lines(report::result_lines(&evaluation, params.d))?;
    log.line("")?;
    log.line(format!(
        "Timing: setup {:.2} ms, IDs {:.2} ms, evaluation {:.2} ms",
        timings.setup_ms, timings.id_ms, timings.evaluation_ms
    ))?;

    let summary_path = dir.join("summary.txt");
    report::write_summary_txt(&summary_path, n, &params, fmap.k(), &evaluation)?;
    report::write_json(
        &dir.join("summary.json"),
        &RunSummary {
            n,
            params: &params,
            k: fmap.k(),
            counters: &evaluation.counters,
            theory: &evaluation.theory,
            bands: evaluation.distance_bands(params.d),
            timings,
        },
    )?;
    log.line(format!("Summary saved to: {}", summary_path.display()))?;

    // Plot
    if opts.plot {
        let img_path = dir.join(format!(
            "elsh_results_n{}_d{}_delta{}_{}.png",
            n, params.d, params.delta, timestamp
        ));
        if plot::render(&evaluation, params.d, &img_path)? {
            log.line(format!("Chart saved to: {}", img_path.display()))?;
        } else {
            log.line("Plotting support not compiled in, skipping charts")?;
        }
    } else {
        log.line("Plotting disabled, skipping charts")?;
    }

    log.line("")?;
    log.rule()?;
    log.line(format!("Run complete, results in: {}", dir.display()))?;
    log.rule()?;

    Ok(RunOutcome {
        run_name: name,
        dir,
        k: fmap.k(),
        evaluation,
        timings,
    })
}
