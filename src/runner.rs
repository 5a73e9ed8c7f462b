//! Benchmark execution.
//!
//! `SizeRunner` owns the RNG and a validated `Config` and drives the four
//! run shapes: timed single size, checked single size, and sweeps of either
//! over a size list. Timing follows a fixed protocol for every repetition:
//! restore the pristine input, flush the cache outside the timed window,
//! then time exactly one factorization. The minimum across repetitions is
//! reported.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::check::{self, Mismatch, Tolerance};
use crate::config::Config;
use crate::factor::{blocked, reference, FactorError, Tuning, Workspace};
use crate::matrix::{rng_from_seed, TestMatrix};
use crate::measurement::{best_of, time_once, TimingSample};

/// Which factorization path a timing measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AlgoPath {
    Candidate,
    Reference,
}

/// Outcome of a timed run at one order.
#[derive(Debug, Clone)]
pub struct TimingReport {
    pub order: usize,
    pub path: AlgoPath,
    /// Minimum elapsed time across repetitions.
    pub best: Duration,
    /// The most recent factorization error, if any repetition failed.
    pub last_error: Option<FactorError>,
}

/// Outcome of a correctness comparison at one order.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub order: usize,
    pub passed: bool,
    pub candidate_time: Duration,
    pub reference_time: Duration,
    /// Retained artifacts when the comparison failed.
    pub mismatch: Option<Box<Mismatch>>,
}

/// Drives benchmark runs for one configuration.
pub struct SizeRunner {
    config: Config,
    rng: rand_xoshiro::Xoshiro256PlusPlus,
    tolerance: Tolerance,
}

impl SizeRunner {
    /// Validate the configuration and seed the generator.
    pub fn new(config: Config) -> Result<Self, String> {
        config.validate()?;
        let rng = rng_from_seed(config.seed);
        Ok(Self {
            config,
            rng,
            tolerance: Tolerance::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            row_block: self.config.row_block,
            col_block: self.config.col_block,
            viewport: self.config.viewport,
        }
    }

    /// Fresh input for one run. Single-size mode factors a symmetric
    /// positive definite matrix; sweeps use a random triangular fill.
    fn generate(&mut self, order: usize) -> TestMatrix {
        if self.config.single {
            TestMatrix::generate_spd(order, self.config.spread, &mut self.rng)
        } else {
            TestMatrix::generate(order, self.config.triangle, self.config.spread, &mut self.rng)
        }
    }

    /// Time the configured path at `order`, minimum of `runs` repetitions.
    pub fn run_timed(&mut self, order: usize) -> TimingReport {
        let pristine = self.generate(order);
        let mut a = pristine.clone();
        let triangle = self.config.triangle;
        let runs = self.config.runs;
        let path = if self.config.reference {
            AlgoPath::Reference
        } else {
            AlgoPath::Candidate
        };
        let block_size = self.config.block_size;
        let tuning = self.tuning();

        let mut workspace = Workspace::for_factorization(order, block_size);
        let mut cand_piv = vec![0isize; order];
        let mut ref_piv = vec![0i32; order];

        let mut samples: Vec<TimingSample> = Vec::with_capacity(runs);
        let mut last_error = None;
        for rep in 0..runs {
            if rep > 0 {
                a.restore_from(&pristine);
            }
            let sample = match path {
                AlgoPath::Candidate => {
                    let mut work = || {
                        blocked::factorize(
                            &mut a,
                            &mut workspace,
                            &mut cand_piv,
                            triangle,
                            block_size,
                            tuning,
                        )
                    };
                    time_once(&mut work)
                }
                AlgoPath::Reference => {
                    let mut work = || reference::factorize(&mut a, &mut ref_piv, triangle);
                    time_once(&mut work)
                }
            };
            if let Err(err) = &sample.outcome {
                last_error = Some(err.clone());
            }
            if self.config.verbose {
                eprintln!(
                    "  run {}: {:.3} ms",
                    rep + 1,
                    sample.elapsed.as_secs_f64() * 1e3
                );
            }
            samples.push(sample);
        }

        // `runs >= 1` by validation, so a best always exists.
        let best = best_of(&samples).unwrap_or_default();
        TimingReport {
            order,
            path,
            best,
            last_error,
        }
    }

    /// Factor one input through both paths and compare the outputs.
    ///
    /// Both factorizations are timed with the same flush-then-time protocol,
    /// so a check run doubles as a side-by-side timing. A factorization error
    /// on either path fails the check.
    pub fn run_check(&mut self, order: usize) -> CheckReport {
        let pristine = self.generate(order);
        let triangle = self.config.triangle;
        let block_size = self.config.block_size;
        let tuning = self.tuning();

        let mut candidate = pristine.clone();
        let mut workspace = Workspace::for_factorization(order, block_size);
        let mut cand_piv = vec![0isize; order];
        let cand_sample = {
            let mut work = || {
                blocked::factorize(
                    &mut candidate,
                    &mut workspace,
                    &mut cand_piv,
                    triangle,
                    block_size,
                    tuning,
                )
            };
            time_once(&mut work)
        };

        let mut reference_out = pristine.clone();
        let mut ref_piv = vec![0i32; order];
        let ref_sample = {
            let mut work = || reference::factorize(&mut reference_out, &mut ref_piv, triangle);
            time_once(&mut work)
        };

        let candidate_error = cand_sample.outcome.clone().err();
        let reference_error = ref_sample.outcome.clone().err();
        let outputs_equivalent = check::equivalent(
            &candidate,
            &reference_out,
            &cand_piv,
            &ref_piv,
            triangle,
            self.tolerance,
        );
        let passed =
            outputs_equivalent && candidate_error.is_none() && reference_error.is_none();

        if self.config.verbose && order < 10 {
            eprintln!("input:\n{pristine}");
            eprintln!("candidate factors:\n{candidate}");
            eprintln!("reference factors:\n{reference_out}");
            eprintln!("candidate pivots: {cand_piv:?}");
            eprintln!("reference pivots: {ref_piv:?}");
        }

        let mismatch = if passed {
            None
        } else {
            Some(Box::new(Mismatch {
                input: pristine,
                candidate,
                reference: reference_out,
                candidate_pivots: cand_piv,
                reference_pivots: ref_piv,
                candidate_error,
                reference_error,
            }))
        };

        CheckReport {
            order,
            passed,
            candidate_time: cand_sample.elapsed,
            reference_time: ref_sample.elapsed,
            mismatch,
        }
    }

    /// Time the configured path at each size. Keys iterate in ascending
    /// order regardless of the order sizes were given in.
    pub fn sweep(&mut self, sizes: &[usize]) -> BTreeMap<usize, Duration> {
        let mut results = BTreeMap::new();
        for &size in sizes {
            let report = self.run_timed(size);
            if let Some(err) = &report.last_error {
                eprintln!("order {size}: {err}");
            }
            results.insert(size, report.best);
        }
        results
    }

    /// Run a correctness check at each size.
    pub fn sweep_check(&mut self, sizes: &[usize]) -> Vec<CheckReport> {
        sizes.iter().map(|&size| self.run_check(size)).collect()
    }
}
