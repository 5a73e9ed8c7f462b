//! Command-line entry point for the factorization benchmark harness.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use ldlbench::output::{self, ReportMode};
use ldlbench::{parse_size_list, Config, RunMode, SizeRunner, Triangle};

#[derive(Debug, Parser)]
#[command(
    name = "ldlbench",
    about = "Benchmark and check a blocked symmetric-indefinite factorization"
)]
struct Args {
    /// Matrix order for single-size runs.
    #[arg(short = 'N', long = "order", default_value_t = 100)]
    order: usize,

    /// Column block size for the blocked path; 0 selects the unblocked fallback.
    #[arg(long = "block-size", default_value_t = 0)]
    block_size: usize,

    /// Row tile length for trailing updates.
    #[arg(long = "row-block", default_value_t = 68)]
    row_block: usize,

    /// Column tile length hint.
    #[arg(long = "col-block", default_value_t = 68)]
    col_block: usize,

    /// Cache viewport hint.
    #[arg(long = "viewport", default_value_t = 68)]
    viewport: usize,

    /// Worker threads for parallel trailing updates.
    #[arg(short = 'W', long = "workers", default_value_t = 2)]
    workers: usize,

    /// Single-size mode: one symmetric positive definite input at --order.
    #[arg(short = 's', long = "single")]
    single: bool,

    /// Time the unblocked reference path instead of the candidate.
    #[arg(short = 'r', long = "reference")]
    reference: bool,

    /// Comma-separated size list; malformed entries are skipped.
    #[arg(short = 'L', long = "sizes")]
    sizes: Option<String>,

    /// Repetitions per measurement; the minimum is reported.
    #[arg(short = 'n', long = "runs", default_value_t = 5)]
    runs: usize,

    /// Factor the upper triangle instead of the lower.
    #[arg(short = 'U', long = "upper")]
    upper: bool,

    /// Check the candidate against the reference instead of timing.
    #[arg(short = 'C', long = "check")]
    check: bool,

    /// Per-repetition timings and small-matrix dumps.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Report Gflops instead of seconds.
    #[arg(short = 'g', long = "gflops")]
    gflops: bool,

    /// Magnitude scale for generated entries.
    #[arg(long = "spread", default_value_t = 2.0)]
    spread: f64,

    /// Deterministic seed for matrix generation.
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Path for the input-matrix dump written on check failure.
    #[arg(short = 'F', long = "output", default_value = "saved.dat")]
    output: String,

    /// Emit machine-readable JSON instead of the terminal summary.
    #[arg(long = "json")]
    json: bool,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            order: self.order,
            block_size: self.block_size,
            row_block: self.row_block,
            col_block: self.col_block,
            viewport: self.viewport,
            workers: self.workers,
            runs: self.runs,
            triangle: if self.upper {
                Triangle::Upper
            } else {
                Triangle::Lower
            },
            spread: self.spread,
            single: self.single,
            reference: self.reference,
            check: self.check,
            verbose: self.verbose,
            gflops: self.gflops,
            sizes: self.sizes.as_deref().map(parse_size_list),
            seed: self.seed,
            output: self.output,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let json = args.json;
    let config = args.into_config();

    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build_global()
    {
        eprintln!("could not size the worker pool: {err}");
    }

    let mode = if config.gflops {
        ReportMode::Gflops
    } else {
        ReportMode::Seconds
    };
    let run_mode = config.run_mode();
    let dump_path = config.output.clone();

    let mut runner = match SizeRunner::new(config) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    match run_mode {
        RunMode::SingleTiming { order } => {
            let report = runner.run_timed(order);
            if json {
                println!("{}", output::timing_to_json(&report));
            } else {
                println!("{}", output::render_single(&report, mode));
            }
        }
        RunMode::SingleCheck { order } => {
            let report = runner.run_check(order);
            if json {
                println!("{}", output::check_to_json(&report));
            } else {
                println!("{}", output::render_check(&report, mode));
            }
            if let Some(mismatch) = &report.mismatch {
                output::dump_matrix(Path::new(&dump_path), &mismatch.input);
            }
        }
        RunMode::SweepTiming { sizes } => {
            let results = runner.sweep(&sizes);
            if json {
                println!("{}", output::sweep_to_json(&results, mode));
            } else {
                println!("{}", output::render_sweep(&results, mode));
            }
        }
        RunMode::SweepCheck { sizes } => {
            for report in runner.sweep_check(&sizes) {
                if json {
                    println!("{}", output::check_to_json(&report));
                } else {
                    println!("{}", output::render_check(&report, mode));
                }
                if let Some(mismatch) = &report.mismatch {
                    output::dump_matrix(Path::new(&dump_path), &mismatch.input);
                }
            }
        }
    }

    ExitCode::SUCCESS
}
