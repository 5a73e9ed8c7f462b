//! Single-invocation wall-clock timing with cache eviction.

use std::time::{Duration, Instant};

use crate::factor::FactorError;

use super::flush::flush_cache;

/// A unit of work the timer can measure: runs exactly once, may fail.
///
/// Keeping this a trait decouples the timing primitive from which algorithm
/// it measures; the runner builds one workload per factorization path.
pub trait Workload {
    /// Perform one factorization attempt.
    fn run_once(&mut self) -> Result<(), FactorError>;
}

impl<F> Workload for F
where
    F: FnMut() -> Result<(), FactorError>,
{
    fn run_once(&mut self) -> Result<(), FactorError> {
        self()
    }
}

/// One timed invocation: the elapsed wall time plus the invocation outcome.
///
/// The elapsed time is returned even when the workload failed; the outcome
/// is the side channel callers must inspect before trusting the number.
#[derive(Debug)]
pub struct TimingSample {
    /// Wall-clock time of the workload invocation only (flush excluded).
    pub elapsed: Duration,
    /// Result of the invocation.
    pub outcome: Result<(), FactorError>,
}

impl TimingSample {
    /// Whether the measured invocation completed without error.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Flush the cache, then measure exactly one invocation of `work`.
///
/// The eviction happens synchronously before the clock starts, so cache
/// warmth from previous activity never favors one measurement over another.
/// No retries: a failed invocation still yields its elapsed time.
pub fn time_once(work: &mut dyn Workload) -> TimingSample {
    flush_cache();
    let start = Instant::now();
    let outcome = work.run_once();
    TimingSample {
        elapsed: start.elapsed(),
        outcome,
    }
}

/// Minimum elapsed time across samples, the micro-benchmark aggregate for a
/// deterministic workload. Returns `None` for an empty slice; callers
/// validate run counts up front, so that only arises from library misuse.
pub fn best_of(samples: &[TimingSample]) -> Option<Duration> {
    samples.iter().map(|s| s.elapsed).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(nanos: u64) -> TimingSample {
        TimingSample {
            elapsed: Duration::from_nanos(nanos),
            outcome: Ok(()),
        }
    }

    #[test]
    fn time_once_measures_a_single_invocation() {
        let mut calls = 0usize;
        let mut workload = || -> Result<(), FactorError> {
            calls += 1;
            Ok(())
        };
        let s = time_once(&mut workload);
        assert!(s.succeeded());
        assert_eq!(calls, 1);
    }

    #[test]
    fn time_once_returns_elapsed_even_on_failure() {
        let mut workload =
            || -> Result<(), FactorError> { Err(FactorError::SingularPivot { index: 0 }) };
        let s = time_once(&mut workload);
        assert!(!s.succeeded());
        // Elapsed is still a real measurement of the failed attempt.
        assert!(s.elapsed >= Duration::ZERO);
    }

    #[test]
    fn best_of_picks_the_minimum() {
        let samples = vec![sample(300), sample(100), sample(200)];
        assert_eq!(best_of(&samples), Some(Duration::from_nanos(100)));
    }

    #[test]
    fn best_of_single_sample_is_that_sample() {
        let samples = vec![sample(1234)];
        assert_eq!(best_of(&samples), Some(Duration::from_nanos(1234)));
    }

    #[test]
    fn best_of_empty_is_none() {
        assert_eq!(best_of(&[]), None);
    }
}
