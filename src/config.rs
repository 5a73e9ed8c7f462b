//! Harness configuration.
//!
//! `Config` collects every knob the harness understands, with defaults that
//! match unattended use. Construction never fails; [`Config::validate`] is
//! the single gate that rejects unusable combinations before a run starts.

use crate::matrix::Triangle;

/// Default sweep ladder: fine steps through small orders, then hundreds up
/// to 1500.
pub const DEFAULT_SIZES: &[usize] = &[
    10, 30, 50, 70, 90, 100, 200, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400,
    1500,
];

/// Which benchmark shape a validated configuration resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// One order, correctness comparison against the reference.
    SingleCheck { order: usize },
    /// One order, timing only.
    SingleTiming { order: usize },
    /// Many orders, correctness comparison at each.
    SweepCheck { sizes: Vec<usize> },
    /// Many orders, timing at each.
    SweepTiming { sizes: Vec<usize> },
}

/// Full harness configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Matrix order for single-size runs.
    pub order: usize,
    /// Blocked-path column block size; 0 selects the unblocked fallback.
    pub block_size: usize,
    /// Row tile length for trailing updates; 0 disables row tiling.
    pub row_block: usize,
    /// Column tile length hint.
    pub col_block: usize,
    /// Cache viewport hint.
    pub viewport: usize,
    /// Rayon worker threads.
    pub workers: usize,
    /// Repetitions per measurement; the minimum is reported.
    pub runs: usize,
    /// Stored triangle.
    pub triangle: Triangle,
    /// Magnitude scale for generated entries.
    pub spread: f64,
    /// Single-size mode: symmetric positive definite input, one factorization.
    pub single: bool,
    /// Time the reference path instead of the candidate.
    pub reference: bool,
    /// Correctness check instead of timing.
    pub check: bool,
    /// Per-repetition and dump chatter.
    pub verbose: bool,
    /// Report Gflops instead of seconds.
    pub gflops: bool,
    /// Explicit sweep sizes; `None` means single-size or the default ladder.
    pub sizes: Option<Vec<usize>>,
    /// Deterministic seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Path for matrix dumps on check failure.
    pub output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order: 100,
            block_size: 0,
            row_block: 68,
            col_block: 68,
            viewport: 68,
            workers: 2,
            runs: 5,
            triangle: Triangle::Lower,
            spread: 2.0,
            single: false,
            reference: false,
            check: false,
            verbose: false,
            gflops: false,
            sizes: None,
            seed: None,
            output: "saved.dat".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn triangle(mut self, triangle: Triangle) -> Self {
        self.triangle = triangle;
        self
    }

    pub fn spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn sizes(mut self, sizes: Vec<usize>) -> Self {
        self.sizes = Some(sizes);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations no run shape can use.
    pub fn validate(&self) -> Result<(), String> {
        if self.order == 0 {
            return Err("matrix order must be at least 1".to_string());
        }
        if self.runs == 0 {
            return Err("repetition count must be at least 1".to_string());
        }
        if self.workers == 0 {
            return Err("worker count must be at least 1".to_string());
        }
        if !self.spread.is_finite() || self.spread <= 0.0 {
            return Err(format!("spread must be finite and positive, got {}", self.spread));
        }
        if let Some(sizes) = &self.sizes {
            if sizes.is_empty() {
                return Err("size list resolved to no usable sizes".to_string());
            }
        }
        Ok(())
    }

    /// Resolve the run shape. Sweep when a size list is present or requested
    /// by the caller having cleared `single`; single-size otherwise.
    pub fn run_mode(&self) -> RunMode {
        if self.single && self.sizes.is_none() {
            if self.check {
                RunMode::SingleCheck { order: self.order }
            } else {
                RunMode::SingleTiming { order: self.order }
            }
        } else {
            let sizes = self
                .sizes
                .clone()
                .unwrap_or_else(|| DEFAULT_SIZES.to_vec());
            if self.check {
                RunMode::SweepCheck { sizes }
            } else {
                RunMode::SweepTiming { sizes }
            }
        }
    }
}

/// Parse a comma-separated size list, dropping malformed and zero entries
/// rather than failing the whole run. "10,x,30" therefore yields [10, 30].
pub fn parse_size_list(raw: &str) -> Vec<usize> {
    raw.split(',')
        .filter_map(|tok| tok.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_runs_rejected() {
        let err = Config::new().runs(0).validate().unwrap_err();
        assert!(err.contains("repetition"));
    }

    #[test]
    fn zero_order_rejected() {
        assert!(Config::new().order(0).validate().is_err());
    }

    #[test]
    fn nonpositive_spread_rejected() {
        assert!(Config::new().spread(0.0).validate().is_err());
        assert!(Config::new().spread(f64::NAN).validate().is_err());
    }

    #[test]
    fn empty_size_list_rejected() {
        assert!(Config::new().sizes(Vec::new()).validate().is_err());
    }

    #[test]
    fn size_list_parsing_is_lenient() {
        assert_eq!(parse_size_list("10,20,30"), vec![10, 20, 30]);
        assert_eq!(parse_size_list("10,x,30"), vec![10, 30]);
        assert_eq!(parse_size_list(" 10 , 20 ,0, 30 "), vec![10, 20, 30]);
        assert_eq!(parse_size_list(""), Vec::<usize>::new());
    }

    #[test]
    fn single_flag_selects_single_modes() {
        let cfg = Config {
            single: true,
            order: 64,
            ..Config::default()
        };
        assert_eq!(cfg.run_mode(), RunMode::SingleTiming { order: 64 });
        let cfg = Config {
            check: true,
            ..cfg
        };
        assert_eq!(cfg.run_mode(), RunMode::SingleCheck { order: 64 });
    }

    #[test]
    fn explicit_sizes_force_sweep() {
        let cfg = Config {
            single: true,
            sizes: Some(vec![10, 20]),
            ..Config::default()
        };
        assert_eq!(
            cfg.run_mode(),
            RunMode::SweepTiming {
                sizes: vec![10, 20]
            }
        );
    }

    #[test]
    fn default_ladder_starts_fine_and_ends_at_1500() {
        assert_eq!(DEFAULT_SIZES.first(), Some(&10));
        assert_eq!(DEFAULT_SIZES.last(), Some(&1500));
        assert!(DEFAULT_SIZES.windows(2).all(|w| w[0] < w[1]));
    }
}
