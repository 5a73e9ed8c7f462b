//! Differential benchmark harness for blocked symmetric-indefinite
//! (Bunch-Kaufman LDL^T) factorization.
//!
//! The crate carries two implementations of the same factorization: a
//! blocked candidate tuned for large orders (with optional rayon-parallel
//! trailing updates) and an unblocked reference that follows the textbook
//! elimination column by column. The harness times either path under a
//! cache-flushed, minimum-of-N protocol, and can check the candidate's
//! output against the reference entry for entry and pivot for pivot.
//!
//! ```no_run
//! use ldlbench::{Config, SizeRunner};
//!
//! let config = Config::new().order(64).runs(3).seed(1).check(true);
//! let mut runner = SizeRunner::new(config).expect("valid config");
//! let report = runner.run_check(64);
//! assert!(report.passed);
//! ```

pub mod check;
pub mod config;
pub mod factor;
pub mod matrix;
pub mod measurement;
pub mod output;
pub mod runner;

pub use check::{Mismatch, Tolerance};
pub use config::{parse_size_list, Config, RunMode, DEFAULT_SIZES};
pub use factor::{FactorError, Tuning, Workspace};
pub use matrix::{rng_from_seed, TestMatrix, Triangle};
pub use output::ReportMode;
pub use runner::{AlgoPath, CheckReport, SizeRunner, TimingReport};
