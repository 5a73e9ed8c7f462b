//! Measurement infrastructure for the factorization harness.
//!
//! This module provides:
//! - Cache eviction before timed sections, so repeated runs start cold
//! - A single-invocation wall-clock timing primitive
//! - Minimum-of-N aggregation over repeated samples

mod flush;
mod timer;

pub use flush::flush_cache;
pub use timer::{best_of, time_once, TimingSample, Workload};
