//! Result rendering.
//!
//! Terminal output goes through `colored` for pass/fail emphasis; machine
//! output is serde_json over small report shapes. Matrix dumps are
//! best-effort: a failed write is reported on stderr and never aborts the
//! run that produced the result.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::matrix::TestMatrix;
use crate::runner::{CheckReport, TimingReport};

/// How timing values are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportMode {
    Seconds,
    Gflops,
}

/// Sustained throughput for one factorization of order `n`.
///
/// The symmetric-indefinite factorization performs n^3/6 + O(n^2) flops;
/// the cubic term is the conventional figure.
pub fn gflops(order: usize, secs: f64) -> f64 {
    let n = order as f64;
    n * n * n / (6.0 * secs) * 1e-9
}

/// One-line summary for a single timed run.
pub fn render_single(report: &TimingReport, mode: ReportMode) -> String {
    let secs = report.best.as_secs_f64();
    let mut line = match mode {
        ReportMode::Seconds => format!("{secs}s"),
        ReportMode::Gflops => format!("{:.4} Gflops", gflops(report.order, secs)),
    };
    if let Some(err) = &report.last_error {
        let _ = write!(line, "  ({err})");
    }
    line
}

/// Pass/fail summary for a correctness comparison, with the side-by-side
/// timing ratio.
pub fn render_check(report: &CheckReport, mode: ReportMode) -> String {
    let verdict = if report.passed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    let cand = report.candidate_time.as_secs_f64();
    let refc = report.reference_time.as_secs_f64();
    let mut line = format!(
        "order {:>5}  {}  candidate {:.6}s  reference {:.6}s  ratio {:.2}",
        report.order,
        verdict,
        cand,
        refc,
        cand / refc
    );
    if mode == ReportMode::Gflops {
        let _ = write!(line, "  [ref: {:.4} Gflops]", gflops(report.order, refc));
    }
    if let Some(mismatch) = &report.mismatch {
        if let Some(err) = &mismatch.candidate_error {
            let _ = write!(line, "\n  candidate error: {err}");
        }
        if let Some(err) = &mismatch.reference_error {
            let _ = write!(line, "\n  reference error: {err}");
        }
    }
    line
}

/// Sweep results as `{size: value, ...}` with sizes ascending.
pub fn render_sweep(results: &BTreeMap<usize, Duration>, mode: ReportMode) -> String {
    let mut out = String::from("{");
    for (i, (&size, &elapsed)) in results.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let secs = elapsed.as_secs_f64();
        match mode {
            ReportMode::Seconds => {
                let _ = write!(out, "{size}: {secs:.6}");
            }
            ReportMode::Gflops => {
                let _ = write!(out, "{size}: {:.4}", gflops(size, secs));
            }
        }
    }
    out.push('}');
    out
}

#[derive(Debug, Serialize)]
struct TimingJson<'a> {
    order: usize,
    path: &'a crate::runner::AlgoPath,
    seconds: f64,
    gflops: f64,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckJson {
    order: usize,
    passed: bool,
    candidate_seconds: f64,
    reference_seconds: f64,
    candidate_error: Option<String>,
    reference_error: Option<String>,
}

/// Machine-readable form of a single timed run.
pub fn timing_to_json(report: &TimingReport) -> serde_json::Value {
    let secs = report.best.as_secs_f64();
    serde_json::to_value(TimingJson {
        order: report.order,
        path: &report.path,
        seconds: secs,
        gflops: gflops(report.order, secs),
        error: report.last_error.as_ref().map(|e| e.to_string()),
    })
    .unwrap_or(serde_json::Value::Null)
}

/// Machine-readable form of a correctness comparison.
pub fn check_to_json(report: &CheckReport) -> serde_json::Value {
    let (cand_err, ref_err) = match &report.mismatch {
        Some(m) => (
            m.candidate_error.as_ref().map(|e| e.to_string()),
            m.reference_error.as_ref().map(|e| e.to_string()),
        ),
        None => (None, None),
    };
    serde_json::to_value(CheckJson {
        order: report.order,
        passed: report.passed,
        candidate_seconds: report.candidate_time.as_secs_f64(),
        reference_seconds: report.reference_time.as_secs_f64(),
        candidate_error: cand_err,
        reference_error: ref_err,
    })
    .unwrap_or(serde_json::Value::Null)
}

/// Machine-readable form of a sweep, keyed by size in ascending order.
pub fn sweep_to_json(results: &BTreeMap<usize, Duration>, mode: ReportMode) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(&size, &elapsed)| {
            let secs = elapsed.as_secs_f64();
            let value = match mode {
                ReportMode::Seconds => secs,
                ReportMode::Gflops => gflops(size, secs),
            };
            (size.to_string(), serde_json::json!(value))
        })
        .collect();
    serde_json::Value::Object(map)
}

/// Write a matrix to `path` in aligned-column text form. Failures are
/// diagnostic output, never fatal.
pub fn dump_matrix(path: &Path, matrix: &TestMatrix) {
    if let Err(err) = std::fs::write(path, matrix.to_table_string()) {
        eprintln!("could not write {}: {err}", path.display());
    }
}
