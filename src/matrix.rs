//! Symmetric test-matrix generation and storage.
//!
//! A [`TestMatrix`] is a square, dense, double-precision matrix that is
//! logically symmetric but physically populated in only one triangular
//! region. The opposite triangle stays exactly zero and is never read by
//! correctness logic, so the stored triangle fully determines the
//! mathematical matrix.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt;

/// Which triangular region of a symmetric matrix is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum Triangle {
    /// Populate/factor the lower triangle (the default, matching LAPACK 'L').
    #[default]
    Lower,
    /// Populate/factor the upper triangle (LAPACK 'U').
    Upper,
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Triangle::Lower => write!(f, "lower"),
            Triangle::Upper => write!(f, "upper"),
        }
    }
}

/// Dense square matrix used as factorization input and output.
///
/// Backed by a column-major [`DMatrix<f64>`]. Cloning yields the pristine
/// copy that performance mode restores from between repetitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TestMatrix {
    inner: DMatrix<f64>,
}

impl TestMatrix {
    /// All-zero matrix of the given order.
    pub fn zeros(order: usize) -> Self {
        Self {
            inner: DMatrix::zeros(order, order),
        }
    }

    /// Generate a matrix with the selected triangle (diagonal included)
    /// filled from Normal(0, spread). The opposite triangle is exactly zero.
    ///
    /// Reproducible for a fixed RNG state; see [`rng_from_seed`].
    pub fn generate<R: Rng + ?Sized>(
        order: usize,
        triangle: Triangle,
        spread: f64,
        rng: &mut R,
    ) -> Self {
        let mut m = Self::zeros(order);
        for j in 0..order {
            let (lo, hi) = match triangle {
                Triangle::Lower => (j, order),
                Triangle::Upper => (0, j + 1),
            };
            for i in lo..hi {
                let z: f64 = rng.sample(StandardNormal);
                m.inner[(i, j)] = z * spread;
            }
        }
        m
    }

    /// Generate a full symmetric positive definite matrix `A0 * A0^T` from a
    /// fully random `A0` with Normal(0, spread) entries.
    ///
    /// Used by single-size mode, where both triangles carry data and the
    /// factorization is numerically well behaved at any order.
    pub fn generate_spd<R: Rng + ?Sized>(order: usize, spread: f64, rng: &mut R) -> Self {
        let a0 = DMatrix::from_fn(order, order, |_, _| {
            let z: f64 = rng.sample(StandardNormal);
            z * spread
        });
        Self {
            inner: &a0 * a0.transpose(),
        }
    }

    /// Matrix order (rows == columns).
    pub fn order(&self) -> usize {
        self.inner.nrows()
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner[(row, col)]
    }

    /// Overwrite the entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.inner[(row, col)] = value;
    }

    /// Borrow the backing matrix.
    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.inner
    }

    /// Mutably borrow the backing matrix (factorization kernels work here).
    pub fn as_dmatrix_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.inner
    }

    /// Full overwrite from `pristine`. Restores the working copy between
    /// timing repetitions; not an incremental diff, so no residual state
    /// from the previous run survives.
    pub fn restore_from(&mut self, pristine: &TestMatrix) {
        self.inner.copy_from(&pristine.inner);
    }

    /// Render the matrix as a plain-text table, one row per line, entries in
    /// fixed-width scientific notation. This is the debug-dump format.
    pub fn to_table_string(&self) -> String {
        let n = self.order();
        let mut out = String::with_capacity(n * n * 15);
        for i in 0..n {
            for j in 0..n {
                out.push_str(&format!("{:>14.6e}", self.inner[(i, j)]));
                if j + 1 < n {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for TestMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table_string())
    }
}

/// Build the harness RNG: deterministic for `Some(seed)`, entropy-seeded
/// otherwise. Production runs pass `None`; tests pass a fixed seed.
pub fn rng_from_seed(seed: Option<u64>) -> Xoshiro256PlusPlus {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    Xoshiro256PlusPlus::seed_from_u64(seed)
}
