//! Unblocked reference factorization (the oracle path).
//!
//! Straight Bunch-Kaufman elimination with immediate rank-1/rank-2 trailing
//! updates, the classical `sytf2` formulation. Pivots are `i32`, 1-based,
//! signed: the reference's native encoding, which the equivalence checker
//! widens before comparing against the candidate.

use nalgebra::DMatrix;

use crate::matrix::{TestMatrix, Triangle};

use super::{
    choose_pivot_lower, choose_pivot_upper, interchange_lower, interchange_upper, FactorError,
    PivotChoice,
};

/// Factor the selected triangle of `a` in place as `P*L*D*L^T*P^T`
/// (or `P*U*D*U^T*P^T`), filling `ipiv` with the pivot sequence.
///
/// A zero pivot does not abort the elimination; the first singular index is
/// reported once the sweep over all columns completes.
pub fn factorize(
    a: &mut TestMatrix,
    ipiv: &mut [i32],
    triangle: Triangle,
) -> Result<(), FactorError> {
    let n = a.order();
    if ipiv.len() != n {
        return Err(FactorError::ShapeMismatch {
            expected: n,
            actual: ipiv.len(),
        });
    }
    let singular = match triangle {
        Triangle::Lower => factorize_lower(a.as_dmatrix_mut(), ipiv),
        Triangle::Upper => factorize_upper(a.as_dmatrix_mut(), ipiv),
    };
    match singular {
        Some(index) => Err(FactorError::SingularPivot { index }),
        None => Ok(()),
    }
}

fn factorize_lower(a: &mut DMatrix<f64>, ipiv: &mut [i32]) -> Option<usize> {
    let n = a.nrows();
    let mut first_singular = None;
    let mut k = 0usize;
    while k < n {
        let mut kstep = 1usize;
        let kp;
        match choose_pivot_lower(a, k) {
            PivotChoice::Singular => {
                if first_singular.is_none() {
                    first_singular = Some(k);
                }
                kp = k;
            }
            PivotChoice::One { kp: p } => {
                kp = p;
                interchange_lower(a, k, 1, kp);
                eliminate_lower_1x1(a, k);
            }
            PivotChoice::Two { kp: p } => {
                kstep = 2;
                kp = p;
                interchange_lower(a, k, 2, kp);
                eliminate_lower_2x2(a, k);
            }
        }
        if kstep == 1 {
            ipiv[k] = (kp + 1) as i32;
        } else {
            ipiv[k] = -((kp + 1) as i32);
            ipiv[k + 1] = -((kp + 1) as i32);
        }
        k += kstep;
    }
    first_singular
}

/// Rank-1 update of the trailing submatrix, then scale the pivot column.
fn eliminate_lower_1x1(a: &mut DMatrix<f64>, k: usize) {
    let n = a.nrows();
    let d11 = 1.0 / a[(k, k)];
    for j in k + 1..n {
        if a[(j, k)] != 0.0 {
            let wj = d11 * a[(j, k)];
            for i in j..n {
                a[(i, j)] -= a[(i, k)] * wj;
            }
        }
    }
    for i in k + 1..n {
        a[(i, k)] *= d11;
    }
}

/// Rank-2 update for a 2x2 pivot block in columns `k`, `k+1`; the update
/// overwrites the two pivot columns with the computed multipliers.
fn eliminate_lower_2x2(a: &mut DMatrix<f64>, k: usize) {
    let n = a.nrows();
    if k + 2 >= n {
        return;
    }
    let d21 = a[(k + 1, k)];
    let d11 = a[(k + 1, k + 1)] / d21;
    let d22 = a[(k, k)] / d21;
    let t = 1.0 / (d11 * d22 - 1.0);
    let d21 = t / d21;
    for j in k + 2..n {
        let wk = d21 * (d11 * a[(j, k)] - a[(j, k + 1)]);
        let wkp1 = d21 * (d22 * a[(j, k + 1)] - a[(j, k)]);
        for i in j..n {
            a[(i, j)] = a[(i, j)] - a[(i, k)] * wk - a[(i, k + 1)] * wkp1;
        }
        a[(j, k)] = wk;
        a[(j, k + 1)] = wkp1;
    }
}

fn factorize_upper(a: &mut DMatrix<f64>, ipiv: &mut [i32]) -> Option<usize> {
    let n = a.nrows();
    let mut first_singular = None;
    let mut k = n as isize - 1;
    while k >= 0 {
        let ku = k as usize;
        let mut kstep = 1usize;
        let kp;
        match choose_pivot_upper(a, ku) {
            PivotChoice::Singular => {
                if first_singular.is_none() {
                    first_singular = Some(ku);
                }
                kp = ku;
            }
            PivotChoice::One { kp: p } => {
                kp = p;
                interchange_upper(a, ku, 1, kp);
                eliminate_upper_1x1(a, ku);
            }
            PivotChoice::Two { kp: p } => {
                kstep = 2;
                kp = p;
                interchange_upper(a, ku, 2, kp);
                eliminate_upper_2x2(a, ku);
            }
        }
        if kstep == 1 {
            ipiv[ku] = (kp + 1) as i32;
        } else {
            ipiv[ku] = -((kp + 1) as i32);
            ipiv[ku - 1] = -((kp + 1) as i32);
        }
        k -= kstep as isize;
    }
    first_singular
}

fn eliminate_upper_1x1(a: &mut DMatrix<f64>, k: usize) {
    let d11 = 1.0 / a[(k, k)];
    for j in (0..k).rev() {
        if a[(j, k)] != 0.0 {
            let wj = d11 * a[(j, k)];
            for i in 0..=j {
                a[(i, j)] -= a[(i, k)] * wj;
            }
        }
    }
    for i in 0..k {
        a[(i, k)] *= d11;
    }
}

fn eliminate_upper_2x2(a: &mut DMatrix<f64>, k: usize) {
    if k < 2 {
        return;
    }
    let d12 = a[(k - 1, k)];
    let d22 = a[(k - 1, k - 1)] / d12;
    let d11 = a[(k, k)] / d12;
    let t = 1.0 / (d11 * d22 - 1.0);
    let d12 = t / d12;
    for j in (0..k - 1).rev() {
        let wkm1 = d12 * (d11 * a[(j, k - 1)] - a[(j, k)]);
        let wk = d12 * (d22 * a[(j, k)] - a[(j, k - 1)]);
        for i in (0..=j).rev() {
            a[(i, j)] = a[(i, j)] - a[(i, k)] * wk - a[(i, k - 1)] * wkm1;
        }
        a[(j, k)] = wk;
        a[(j, k - 1)] = wkm1;
    }
}
