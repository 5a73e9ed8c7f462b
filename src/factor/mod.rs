//! Symmetric-indefinite LDL^T factorization, Bunch-Kaufman pivoting.
//!
//! Two codepaths share one pivot rule:
//! - [`reference`]: unblocked oracle, conventionally correct, `i32` pivots
//!   in the LAPACK `sytrf` encoding.
//! - [`blocked`]: candidate under test, with pivot columns staged in a
//!   [`Workspace`] so trailing updates can be tiled and run in parallel over
//!   disjoint column ranges.
//!
//! Both overwrite the selected triangle of the input in place and fill a
//! pivot sequence of length `n`, one entry per row: `kp+1` for a 1x1 pivot
//! interchanged with row `kp`, and `-(kp+1)` on both rows of a 2x2 pivot
//! block. Entries are 1-based to match the reference encoding.

use nalgebra::DMatrix;
use std::fmt;

pub mod blocked;
pub mod reference;

/// Error signalled by a factorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FactorError {
    /// `D(index, index)` is exactly zero. The factorization keeps going
    /// past the singular column, LAPACK-style, and reports the first
    /// offending index at the end.
    SingularPivot {
        /// Zero-based index of the first exactly-singular pivot.
        index: usize,
    },
    /// Pivot buffer length does not match the matrix order.
    ShapeMismatch {
        /// Matrix order.
        expected: usize,
        /// Pivot buffer length supplied by the caller.
        actual: usize,
    },
    /// Workspace smaller than the factorization requires.
    WorkspaceTooSmall {
        /// Rows available in the workspace.
        rows: usize,
        /// Columns available in the workspace.
        cols: usize,
    },
}

impl fmt::Display for FactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingularPivot { index } => {
                write!(f, "matrix is singular: zero pivot at index {index}")
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "pivot buffer length {actual} does not match order {expected}")
            }
            Self::WorkspaceTooSmall { rows, cols } => {
                write!(f, "workspace of {rows}x{cols} is too small for this factorization")
            }
        }
    }
}

impl std::error::Error for FactorError {}

/// Blocking tuning parameters forwarded from the CLI to the candidate.
///
/// The harness treats these as opaque; the candidate uses `row_block` to
/// tile inner update loops. Values of zero fall back to full extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Tuning {
    /// Row blocking size for inner update loops.
    pub row_block: usize,
    /// Column blocking size.
    pub col_block: usize,
    /// Viewport size.
    pub viewport: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            row_block: 68,
            col_block: 68,
            viewport: 68,
        }
    }
}

/// Scratch storage for one factorization invocation.
///
/// Sized `order x (block_size + 2)`; owned exclusively by the invocation for
/// its duration and never aliasing the matrix being factored. The candidate
/// stages pivot columns in the first two columns.
#[derive(Debug, Clone)]
pub struct Workspace {
    data: DMatrix<f64>,
}

impl Workspace {
    /// Allocate scratch for factoring an `order` x `order` matrix with the
    /// given block size (0 = unblocked).
    pub fn for_factorization(order: usize, block_size: usize) -> Self {
        Self {
            data: DMatrix::zeros(order, block_size + 2),
        }
    }

    /// Rows of scratch available.
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Columns of scratch available.
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Mutable views of the two staging columns.
    pub(crate) fn staging_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        let rows = self.data.nrows();
        let (w0, rest) = self.data.as_mut_slice().split_at_mut(rows);
        let (w1, _) = rest.split_at_mut(rows);
        (w0, w1)
    }

    /// Shared views of the two staging columns.
    pub(crate) fn staging(&self) -> (&[f64], &[f64]) {
        let rows = self.data.nrows();
        let s = self.data.as_slice();
        (&s[..rows], &s[rows..2 * rows])
    }
}

/// Bunch-Kaufman pivot threshold, (1 + sqrt(17)) / 8.
pub(crate) fn bk_alpha() -> f64 {
    (1.0 + 17f64.sqrt()) / 8.0
}

/// Outcome of the pivot search at elimination step `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PivotChoice {
    /// Diagonal entry and the entire remaining column are exactly zero;
    /// no elimination is possible at this step.
    Singular,
    /// 1x1 pivot, interchanging with row/column `kp`.
    One { kp: usize },
    /// 2x2 pivot block, interchanging with row/column `kp`.
    Two { kp: usize },
}

/// Pivot search for the lower-triangle factorization at step `k`.
///
/// Both the reference and the candidate call this, which is what makes
/// "pointwise identical pivot sequences" an achievable equivalence bar.
pub(crate) fn choose_pivot_lower(a: &DMatrix<f64>, k: usize) -> PivotChoice {
    let n = a.nrows();
    let alpha = bk_alpha();
    let absakk = a[(k, k)].abs();

    let (imax, colmax) = if k + 1 < n {
        let mut im = k + 1;
        let mut cm = a[(k + 1, k)].abs();
        for i in k + 2..n {
            let v = a[(i, k)].abs();
            if v > cm {
                cm = v;
                im = i;
            }
        }
        (im, cm)
    } else {
        (k, 0.0)
    };

    if absakk.max(colmax) == 0.0 {
        return PivotChoice::Singular;
    }
    if absakk >= alpha * colmax {
        return PivotChoice::One { kp: k };
    }

    // Largest off-diagonal magnitude in row/column imax of the remaining
    // submatrix. Includes |a[imax,k]| == colmax, so rowmax > 0 here.
    let mut rowmax = 0.0f64;
    for j in k..imax {
        rowmax = rowmax.max(a[(imax, j)].abs());
    }
    for i in imax + 1..n {
        rowmax = rowmax.max(a[(i, imax)].abs());
    }

    if absakk >= alpha * colmax * (colmax / rowmax) {
        PivotChoice::One { kp: k }
    } else if a[(imax, imax)].abs() >= alpha * rowmax {
        PivotChoice::One { kp: imax }
    } else {
        PivotChoice::Two { kp: imax }
    }
}

/// Pivot search for the upper-triangle factorization at step `k`
/// (elimination proceeds from the last column down).
pub(crate) fn choose_pivot_upper(a: &DMatrix<f64>, k: usize) -> PivotChoice {
    let alpha = bk_alpha();
    let absakk = a[(k, k)].abs();

    let (imax, colmax) = if k > 0 {
        let mut im = 0;
        let mut cm = a[(0, k)].abs();
        for i in 1..k {
            let v = a[(i, k)].abs();
            if v > cm {
                cm = v;
                im = i;
            }
        }
        (im, cm)
    } else {
        (k, 0.0)
    };

    if absakk.max(colmax) == 0.0 {
        return PivotChoice::Singular;
    }
    if absakk >= alpha * colmax {
        return PivotChoice::One { kp: k };
    }

    let mut rowmax = 0.0f64;
    for j in imax + 1..=k {
        rowmax = rowmax.max(a[(imax, j)].abs());
    }
    for i in 0..imax {
        rowmax = rowmax.max(a[(i, imax)].abs());
    }

    if absakk >= alpha * colmax * (colmax / rowmax) {
        PivotChoice::One { kp: k }
    } else if a[(imax, imax)].abs() >= alpha * rowmax {
        PivotChoice::One { kp: imax }
    } else {
        PivotChoice::Two { kp: imax }
    }
}

/// Symmetric interchange of rows/columns `kk = k + kstep - 1` and `kp`
/// within the lower triangle.
pub(crate) fn interchange_lower(a: &mut DMatrix<f64>, k: usize, kstep: usize, kp: usize) {
    let n = a.nrows();
    let kk = k + kstep - 1;
    if kp == kk {
        return;
    }
    for i in kp + 1..n {
        a.swap((i, kk), (i, kp));
    }
    for j in kk + 1..kp {
        a.swap((j, kk), (kp, j));
    }
    a.swap((kk, kk), (kp, kp));
    if kstep == 2 {
        a.swap((k + 1, k), (kp, k));
    }
}

/// Symmetric interchange of rows/columns `kk = k + 1 - kstep` and `kp`
/// within the upper triangle.
pub(crate) fn interchange_upper(a: &mut DMatrix<f64>, k: usize, kstep: usize, kp: usize) {
    // kstep <= k + 1 always holds: a 2x2 pivot at step k requires k >= 1.
    let kk = k + 1 - kstep;
    if kp == kk {
        return;
    }
    for i in 0..kp {
        a.swap((i, kk), (i, kp));
    }
    for j in kp + 1..kk {
        a.swap((j, kk), (kp, j));
    }
    a.swap((kk, kk), (kp, kp));
    if kstep == 2 {
        a.swap((k - 1, k), (kp, k));
    }
}
