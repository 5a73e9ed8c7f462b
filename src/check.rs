//! Equivalence checking between candidate and reference factorizations.
//!
//! Two factorizations are equivalent when their factor matrices are
//! numerically close over the stored triangle AND their pivot sequences are
//! pointwise identical after normalizing integer width. A mismatch in either
//! dimension fails the check, and the mismatching artifacts are retained in
//! a [`Mismatch`] value scoped to the call, never in process-wide state.

use crate::factor::FactorError;
use crate::matrix::{TestMatrix, Triangle};

/// Absolute/relative hybrid tolerance for factor-matrix closeness.
///
/// Entries `x` (candidate) and `y` (reference) are close when
/// `|x - y| <= atol + rtol * |y|`. The default is far tighter than generic
/// allclose defaults because both codepaths perform arithmetically
/// near-identical eliminations on the same input.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Tolerance {
    /// Relative term, scaled by the reference entry's magnitude.
    pub rtol: f64,
    /// Absolute term for entries near zero.
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-10,
        }
    }
}

impl Tolerance {
    /// Whether a single entry pair is within tolerance.
    pub fn close(&self, x: f64, y: f64) -> bool {
        (x - y).abs() <= self.atol + self.rtol * y.abs()
    }
}

/// Elementwise closeness over the stored triangle only. The opposite
/// triangle carries no information and is never read.
pub fn factors_close(a: &TestMatrix, b: &TestMatrix, triangle: Triangle, tol: Tolerance) -> bool {
    if a.order() != b.order() {
        return false;
    }
    let n = a.order();
    for j in 0..n {
        let (lo, hi) = match triangle {
            Triangle::Lower => (j, n),
            Triangle::Upper => (0, j + 1),
        };
        for i in lo..hi {
            if !tol.close(a.get(i, j), b.get(i, j)) {
                return false;
            }
        }
    }
    true
}

/// Pointwise pivot-sequence equality after widening both encodings to
/// `i64`. The candidate records `isize` pivots, the reference `i32`; the
/// encoded values themselves must agree index for index.
pub fn pivots_match(candidate: &[isize], reference: &[i32]) -> bool {
    candidate.len() == reference.len()
        && candidate
            .iter()
            .zip(reference.iter())
            .all(|(&c, &r)| c as i64 == i64::from(r))
}

/// Retained artifacts from a failed equivalence check, for post-mortem
/// inspection: both factor matrices, both pivot sequences, and any error
/// each path signalled.
#[derive(Debug, Clone)]
pub struct Mismatch {
    /// The unfactored input both paths started from.
    pub input: TestMatrix,
    /// Candidate factor output.
    pub candidate: TestMatrix,
    /// Reference factor output.
    pub reference: TestMatrix,
    /// Candidate pivot sequence.
    pub candidate_pivots: Vec<isize>,
    /// Reference pivot sequence.
    pub reference_pivots: Vec<i32>,
    /// Error signalled by the candidate, if any.
    pub candidate_error: Option<FactorError>,
    /// Error signalled by the reference, if any.
    pub reference_error: Option<FactorError>,
}

/// Full equivalence: close factors AND identical pivots.
pub fn equivalent(
    candidate: &TestMatrix,
    reference: &TestMatrix,
    candidate_pivots: &[isize],
    reference_pivots: &[i32],
    triangle: Triangle,
    tol: Tolerance,
) -> bool {
    factors_close(candidate, reference, triangle, tol)
        && pivots_match(candidate_pivots, reference_pivots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::rng_from_seed;

    #[test]
    fn equivalence_is_reflexive() {
        let mut rng = rng_from_seed(Some(21));
        let a = TestMatrix::generate(10, Triangle::Lower, 2.0, &mut rng);
        let cand_piv: Vec<isize> = (1..=10).collect();
        let ref_piv: Vec<i32> = (1..=10).collect();
        assert!(equivalent(
            &a,
            &a,
            &cand_piv,
            &ref_piv,
            Triangle::Lower,
            Tolerance::default()
        ));
    }

    #[test]
    fn single_pivot_difference_fails() {
        let mut rng = rng_from_seed(Some(22));
        let a = TestMatrix::generate(6, Triangle::Lower, 2.0, &mut rng);
        let cand_piv: Vec<isize> = vec![1, 2, -4, -4, 5, 6];
        let mut ref_piv: Vec<i32> = vec![1, 2, -4, -4, 5, 6];
        assert!(equivalent(
            &a,
            &a,
            &cand_piv,
            &ref_piv,
            Triangle::Lower,
            Tolerance::default()
        ));
        ref_piv[3] = 4;
        assert!(!equivalent(
            &a,
            &a,
            &cand_piv,
            &ref_piv,
            Triangle::Lower,
            Tolerance::default()
        ));
    }

    #[test]
    fn pivot_length_difference_fails() {
        assert!(!pivots_match(&[1, 2, 3], &[1, 2]));
    }

    #[test]
    fn width_normalization_compares_values_not_representations() {
        assert!(pivots_match(&[1, -3, -3], &[1i32, -3, -3]));
        assert!(!pivots_match(&[1, -3, -3], &[1i32, 3, -3]));
    }

    #[test]
    fn factor_difference_beyond_tolerance_fails() {
        let mut rng = rng_from_seed(Some(23));
        let a = TestMatrix::generate(5, Triangle::Lower, 2.0, &mut rng);
        let mut b = a.clone();
        b.set(4, 2, b.get(4, 2) + 1.0);
        assert!(!factors_close(&a, &b, Triangle::Lower, Tolerance::default()));
    }

    #[test]
    fn opposite_triangle_is_ignored() {
        let mut rng = rng_from_seed(Some(24));
        let a = TestMatrix::generate(5, Triangle::Lower, 2.0, &mut rng);
        let mut b = a.clone();
        // Dirty the unstored triangle; the check must not see it.
        b.set(0, 4, 99.0);
        assert!(factors_close(&a, &b, Triangle::Lower, Tolerance::default()));
    }

    #[test]
    fn nearby_values_within_tolerance_pass() {
        let tol = Tolerance::default();
        assert!(tol.close(1.0, 1.0 + 1e-12));
        assert!(!tol.close(1.0, 1.0 + 1e-6));
    }
}
