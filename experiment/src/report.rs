use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use elsh_fmap::{BinaryVector, Evaluation, IdSet, PairRecord, ProtocolParams, TestData};
use serde::Serialize;

pub type ReportResult<T> = Result<T, Box<dyn std::error::Error>>;

/// `100 * num / max(1, den)`
pub fn percent(num: u64, den: u64) -> f64 {
    100.0 * num as f64 / den.max(1) as f64
}

/// One line of the multi-scale table.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct ScaleRow {
    pub n: usize,
    pub log2_n: u32,
    pub close_rate: f64,
    pub far_rate: f64,
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ReportResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Raw test data (senders, receivers, distances) as bincode.
pub fn save_test_data(path: &Path, data: &TestData) -> ReportResult<()> {
    let bytes = bincode::serialize(data)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_test_data(path: &Path) -> ReportResult<TestData> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// One block per vector: `Vector {i}:`, its bits, and the ID set when given.
/// Tags are listed in string order (`'10||0'` before `'1||0'`).
pub fn save_vectors_to_txt(
    path: &Path,
    vectors: &[BinaryVector],
    id_sets: Option<&[IdSet]>,
) -> ReportResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let dim = vectors.first().map_or(0, BinaryVector::len);

    writeln!(out, "# Total vectors: {}", vectors.len())?;
    writeln!(out, "# Dimension: {}", dim)?;
    writeln!(out, "#{}", "=".repeat(70))?;
    writeln!(out)?;

    for (i, v) in vectors.iter().enumerate() {
        writeln!(out, "Vector {}:", i)?;
        writeln!(out, "{}", v.to_bit_string())?;
        if let Some(ids) = id_sets.and_then(|sets| sets.get(i)) {
            let mut tags: Vec<String> = ids.iter().map(|t| format!("'{}'", t)).collect();
            tags.sort_unstable();
            writeln!(out, "ID Set: [{}]", tags.join(", "))?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

pub fn write_match_csv(path: &Path, records: &[PairRecord]) -> ReportResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "sender_idx,receiver_idx,hamming_distance,has_intersection,intersection_size"
    )?;
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{}",
            r.sender_idx,
            r.receiver_idx,
            r.hamming_distance,
            if r.has_intersection { "True" } else { "False" },
            r.intersection_size
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Human-readable report lines for one run, shared by the log and `summary.txt`.
pub fn result_lines(eval: &Evaluation, d: usize) -> Vec<String> {
    let c = &eval.counters;
    let t = &eval.theory;
    let delta = eval.delta;
    let mut lines = vec![
        format!("Close pairs (Hamming distance <= {}):", delta),
        format!("  Total: {}", c.total_close()),
        format!(
            "  Detected (intersecting): {} ({:.2}%)",
            c.true_positive,
            percent(c.true_positive, c.total_close())
        ),
        format!(
            "  Missed (disjoint): {} ({:.2}%)",
            c.false_negative,
            percent(c.false_negative, c.total_close())
        ),
        String::new(),
        format!("Far pairs (Hamming distance > {}):", delta),
        format!("  Total: {}", c.total_far()),
        format!(
            "  Rejected (disjoint): {} ({:.2}%)",
            c.true_negative,
            percent(c.true_negative, c.total_far())
        ),
        format!(
            "  False positives (intersecting): {} ({:.2}%)",
            c.false_positive,
            percent(c.false_positive, c.total_far())
        ),
        String::new(),
        "Theoretical prediction:".to_string(),
        format!("  Normalized distance rho = delta/d = {:.4}", t.rho),
        format!("  Single-hash collision probability p = {:.4}", t.p_single),
        format!("  At-least-one collision probability = {:.6}", t.p_collision),
        format!("  Expected detection rate >= {:.4}%", 100.0 * t.p_collision),
        String::new(),
        "Detection rate by distance:".to_string(),
    ];
    for band in eval.distance_bands(d) {
        lines.push(format!(
            "  Distance [{}, {}): {}/{} = {:.2}%",
            band.lo,
            band.hi,
            band.detected,
            band.total,
            100.0 * band.rate()
        ));
    }
    lines
}

pub fn write_summary_txt(
    path: &Path,
    n: usize,
    params: &ProtocolParams,
    k: usize,
    eval: &Evaluation,
) -> ReportResult<()> {
    let c = &eval.counters;
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "E-LSH Fmap experiment summary")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;
    writeln!(out, "Scale: n={} (2^{})", n, n.max(1).ilog2())?;
    writeln!(
        out,
        "Params: d={}, delta={}, k={}, L={}",
        params.d, params.delta, k, params.num_hashes
    )?;
    writeln!(out)?;
    if c.total_close() > 0 {
        writeln!(
            out,
            "Close pairs (<= {}): {}/{} = {:.2}%",
            params.delta,
            c.true_positive,
            c.total_close(),
            percent(c.true_positive, c.total_close())
        )?;
    }
    if c.total_far() > 0 {
        writeln!(
            out,
            "Far pairs (> {}): {}/{} = {:.2}%",
            params.delta,
            c.true_negative,
            c.total_far(),
            percent(c.true_negative, c.total_far())
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Theoretical detection rate: {:.4}%",
        100.0 * eval.theory.p_collision
    )?;
    if c.total_close() > 0 {
        writeln!(
            out,
            "Empirical detection rate: {:.2}%",
            percent(c.true_positive, c.total_close())
        )?;
    }

    out.flush()?;
    Ok(())
}

/// Close detection rate and far rejection rate for every scale that ran.
pub fn write_all_summary(path: &Path, params: &ProtocolParams, rows: &[ScaleRow]) -> ReportResult<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "E-LSH Fmap multi-scale summary")?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out)?;
    writeln!(
        out,
        "Params: d={}, delta={}, L={}",
        params.d, params.delta, params.num_hashes
    )?;
    writeln!(out)?;
    writeln!(out, "{:<15} {:<20} {:<20}", "Scale", "Close detection", "Far rejection")?;
    writeln!(out, "{}", "-".repeat(80))?;
    for row in rows {
        writeln!(
            out,
            "2^{} = {:<6}   {:>6.2}%              {:>6.2}%",
            row.log2_n, row.n, row.close_rate, row.far_rate
        )?;
    }

    out.flush()?;
    Ok(())
}
