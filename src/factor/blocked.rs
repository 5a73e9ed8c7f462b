//! Blocked candidate factorization (the path under test).
//!
//! Same pivot rule as the reference, different update machinery: the pivot
//! column(s) for each elimination step are staged into the [`Workspace`]
//! first, so the trailing update can be tiled by `block_size` columns and,
//! when a rayon pool with more than one thread is available, applied in
//! parallel over disjoint column tiles of the column-major buffer. Every
//! element update reads only the staged columns, so parallel and serial
//! executions are bitwise identical, and the arithmetic per element matches
//! the reference's exactly.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::matrix::{TestMatrix, Triangle};

use super::{
    choose_pivot_lower, choose_pivot_upper, interchange_lower, interchange_upper, FactorError,
    PivotChoice, Tuning, Workspace,
};

/// Factor the selected triangle of `a` in place, filling `ipiv`.
///
/// `block_size` of 0 selects the unblocked path (one tile spanning the
/// whole trailing submatrix). The workspace must have at least `n` rows and
/// two columns; `Workspace::for_factorization(n, block_size)` satisfies the
/// contract.
pub fn factorize(
    a: &mut TestMatrix,
    workspace: &mut Workspace,
    ipiv: &mut [isize],
    triangle: Triangle,
    block_size: usize,
    tuning: Tuning,
) -> Result<(), FactorError> {
    let n = a.order();
    if ipiv.len() != n {
        return Err(FactorError::ShapeMismatch {
            expected: n,
            actual: ipiv.len(),
        });
    }
    if workspace.rows() < n || workspace.cols() < 2 {
        return Err(FactorError::WorkspaceTooSmall {
            rows: workspace.rows(),
            cols: workspace.cols(),
        });
    }

    let tile = if block_size == 0 { n.max(1) } else { block_size };
    let row_block = if tuning.row_block == 0 { n.max(1) } else { tuning.row_block };
    // Parallel tiles only pay off (and only differ from serial in schedule,
    // never in results) when there is more than one tile and more than one
    // worker thread.
    let parallel = block_size > 0 && rayon::current_num_threads() > 1;

    let singular = match triangle {
        Triangle::Lower => {
            factorize_lower(a.as_dmatrix_mut(), workspace, ipiv, tile, row_block, parallel)
        }
        Triangle::Upper => {
            factorize_upper(a.as_dmatrix_mut(), workspace, ipiv, tile, row_block, parallel)
        }
    };
    match singular {
        Some(index) => Err(FactorError::SingularPivot { index }),
        None => Ok(()),
    }
}

fn factorize_lower(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    ipiv: &mut [isize],
    tile: usize,
    row_block: usize,
    parallel: bool,
) -> Option<usize> {
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
                update_lower_1x1(a, workspace, k, tile, row_block, parallel);
            }
            PivotChoice::Two { kp: p } => {
                kstep = 2;
                kp = p;
                interchange_lower(a, k, 2, kp);
                update_lower_2x2(a, workspace, k, tile, row_block, parallel);
            }
        }
        if kstep == 1 {
            ipiv[k] = (kp + 1) as isize;
        } else {
            ipiv[k] = -((kp + 1) as isize);
            ipiv[k + 1] = -((kp + 1) as isize);
        }
        k += kstep;
    }
    first_singular
}

/// Stage column `k`, apply the rank-1 trailing update over column tiles,
/// then scale the pivot column from the staged copy.
fn update_lower_1x1(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    k: usize,
    tile: usize,
    row_block: usize,
    parallel: bool,
) {
    let n = a.nrows();
    let d11 = 1.0 / a[(k, k)];
    {
        let (w0, _) = workspace.staging_mut();
        for i in k + 1..n {
            w0[i] = a[(i, k)];
        }
    }
    let (w0, _) = workspace.staging();

    let jlo = k + 1;
    let apply = |tile_idx: usize, chunk: &mut [f64]| {
        let jbase = jlo + tile_idx * tile;
        for (c, col) in chunk.chunks_mut(n).enumerate() {
            let j = jbase + c;
            if w0[j] != 0.0 {
                let wj = d11 * w0[j];
                for i0 in (j..n).step_by(row_block) {
                    let i1 = (i0 + row_block).min(n);
                    for i in i0..i1 {
                        col[i] -= w0[i] * wj;
                    }
                }
            }
        }
    };
    run_tiles(a, jlo, n, tile, parallel, &apply);

    for i in k + 1..n {
        a[(i, k)] = w0[i] * d11;
    }
}

/// Stage columns `k` and `k+1`, apply the rank-2 trailing update over
/// column tiles, then overwrite the two pivot columns with the multipliers.
fn update_lower_2x2(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    k: usize,
    tile: usize,
    row_block: usize,
    parallel: bool,
) {
    let n = a.nrows();
    if k + 2 >= n {
        return;
    }
    let d21 = a[(k + 1, k)];
    let d11 = a[(k + 1, k + 1)] / d21;
    let d22 = a[(k, k)] / d21;
    let t = 1.0 / (d11 * d22 - 1.0);
    let d21 = t / d21;
    {
        let (w0, w1) = workspace.staging_mut();
        for i in k + 2..n {
            w0[i] = a[(i, k)];
            w1[i] = a[(i, k + 1)];
        }
    }
    let (w0, w1) = workspace.staging();

    let jlo = k + 2;
    let apply = |tile_idx: usize, chunk: &mut [f64]| {
        let jbase = jlo + tile_idx * tile;
        for (c, col) in chunk.chunks_mut(n).enumerate() {
            let j = jbase + c;
            let wk = d21 * (d11 * w0[j] - w1[j]);
            let wkp1 = d21 * (d22 * w1[j] - w0[j]);
            for i0 in (j..n).step_by(row_block) {
                let i1 = (i0 + row_block).min(n);
                for i in i0..i1 {
                    col[i] = col[i] - w0[i] * wk - w1[i] * wkp1;
                }
            }
        }
    };
    run_tiles(a, jlo, n, tile, parallel, &apply);

    for j in k + 2..n {
        a[(j, k)] = d21 * (d11 * w0[j] - w1[j]);
        a[(j, k + 1)] = d21 * (d22 * w1[j] - w0[j]);
    }
}

fn factorize_upper(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    ipiv: &mut [isize],
    tile: usize,
    row_block: usize,
    parallel: bool,
) -> Option<usize> {
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
                update_upper_1x1(a, workspace, ku, tile, row_block, parallel);
            }
            PivotChoice::Two { kp: p } => {
                kstep = 2;
                kp = p;
                interchange_upper(a, ku, 2, kp);
                update_upper_2x2(a, workspace, ku, tile, row_block, parallel);
            }
        }
        if kstep == 1 {
            ipiv[ku] = (kp + 1) as isize;
        } else {
            ipiv[ku] = -((kp + 1) as isize);
            ipiv[ku - 1] = -((kp + 1) as isize);
        }
        k -= kstep as isize;
    }
    first_singular
}

fn update_upper_1x1(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    k: usize,
    tile: usize,
    row_block: usize,
    parallel: bool,
) {
    let n = a.nrows();
    let d11 = 1.0 / a[(k, k)];
    {
        let (w0, _) = workspace.staging_mut();
        for i in 0..k {
            w0[i] = a[(i, k)];
        }
    }
    let (w0, _) = workspace.staging();

    let apply = |tile_idx: usize, chunk: &mut [f64]| {
        let jbase = tile_idx * tile;
        for (c, col) in chunk.chunks_mut(n).enumerate() {
            let j = jbase + c;
            if w0[j] != 0.0 {
                let wj = d11 * w0[j];
                for i0 in (0..=j).step_by(row_block) {
                    let i1 = (i0 + row_block).min(j + 1);
                    for i in i0..i1 {
                        col[i] -= w0[i] * wj;
                    }
                }
            }
        }
    };
    run_tiles(a, 0, k, tile, parallel, &apply);

    for i in 0..k {
        a[(i, k)] = w0[i] * d11;
    }
}

fn update_upper_2x2(
    a: &mut DMatrix<f64>,
    workspace: &mut Workspace,
    k: usize,
    tile: usize,
    row_block: usize,
    parallel: bool,
) {
    let n = a.nrows();
    if k < 2 {
        return;
    }
    let d12 = a[(k - 1, k)];
    let d22 = a[(k - 1, k - 1)] / d12;
    let d11 = a[(k, k)] / d12;
    let t = 1.0 / (d11 * d22 - 1.0);
    let d12 = t / d12;
    {
        let (w0, w1) = workspace.staging_mut();
        for i in 0..k - 1 {
            // w0 mirrors column k, w1 mirrors column k-1.
            w0[i] = a[(i, k)];
            w1[i] = a[(i, k - 1)];
        }
    }
    let (w0, w1) = workspace.staging();

    let apply = |tile_idx: usize, chunk: &mut [f64]| {
        let jbase = tile_idx * tile;
        for (c, col) in chunk.chunks_mut(n).enumerate() {
            let j = jbase + c;
            let wkm1 = d12 * (d11 * w1[j] - w0[j]);
            let wk = d12 * (d22 * w0[j] - w1[j]);
            for i0 in (0..=j).step_by(row_block) {
                let i1 = (i0 + row_block).min(j + 1);
                for i in i0..i1 {
                    col[i] = col[i] - w0[i] * wk - w1[i] * wkm1;
                }
            }
        }
    };
    run_tiles(a, 0, k - 1, tile, parallel, &apply);

    for j in 0..k - 1 {
        a[(j, k)] = d12 * (d22 * w0[j] - w1[j]);
        a[(j, k - 1)] = d12 * (d11 * w1[j] - w0[j]);
    }
}

/// Apply `f` to every tile of columns `jlo..jhi`, in parallel over disjoint
/// tiles when requested. `f` receives the tile index and the tile's slice of
/// the column-major buffer (each chunk holds whole columns).
fn run_tiles<F>(a: &mut DMatrix<f64>, jlo: usize, jhi: usize, tile: usize, parallel: bool, f: &F)
where
    F: Fn(usize, &mut [f64]) + Sync,
{
    let n = a.nrows();
    if jlo >= jhi {
        return;
    }
    let buf = a.as_mut_slice();
    let region = &mut buf[jlo * n..jhi * n];
    let chunk_len = n * tile;
    if parallel && jhi - jlo > tile {
        region
            .par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(t, chunk)| f(t, chunk));
    } else {
        for (t, chunk) in region.chunks_mut(chunk_len).enumerate() {
            f(t, chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::rng_from_seed;

    fn factor_both(
        order: usize,
        triangle: Triangle,
        block_size: usize,
        seed: u64,
    ) -> (TestMatrix, Vec<isize>, TestMatrix, Vec<i32>) {
        let mut rng = rng_from_seed(Some(seed));
        let pristine = TestMatrix::generate(order, triangle, 2.0, &mut rng);

        let mut cand = pristine.clone();
        let mut workspace = Workspace::for_factorization(order, block_size);
        let mut cand_piv = vec![0isize; order];
        factorize(
            &mut cand,
            &mut workspace,
            &mut cand_piv,
            triangle,
            block_size,
            Tuning::default(),
        )
        .expect("candidate should factor a random matrix");

        let mut reference = pristine.clone();
        let mut ref_piv = vec![0i32; order];
        super::super::reference::factorize(&mut reference, &mut ref_piv, triangle)
            .expect("reference should factor a random matrix");

        (cand, cand_piv, reference, ref_piv)
    }

    fn assert_agreement(order: usize, triangle: Triangle, block_size: usize, seed: u64) {
        let (cand, cand_piv, reference, ref_piv) = factor_both(order, triangle, block_size, seed);
        for k in 0..order {
            assert_eq!(
                cand_piv[k] as i64, ref_piv[k] as i64,
                "pivot divergence at {k} (order {order}, block {block_size})"
            );
        }
        for j in 0..order {
            for i in 0..order {
                let x = cand.get(i, j);
                let y = reference.get(i, j);
                assert!(
                    (x - y).abs() <= 1e-11 * y.abs().max(1.0),
                    "factor divergence at ({i},{j}) (order {order}, block {block_size}): {x} vs {y}"
                );
            }
        }
    }

    #[test]
    fn matches_reference_unblocked() {
        for order in 1..=12 {
            assert_agreement(order, Triangle::Lower, 0, 500 + order as u64);
            assert_agreement(order, Triangle::Upper, 0, 600 + order as u64);
        }
    }

    #[test]
    fn matches_reference_across_block_sizes() {
        for &block in &[1usize, 2, 3, 4, 8] {
            assert_agreement(10, Triangle::Lower, block, 700 + block as u64);
            assert_agreement(10, Triangle::Upper, block, 800 + block as u64);
            assert_agreement(13, Triangle::Lower, block, 900 + block as u64);
        }
    }

    #[test]
    fn upper_two_by_two_pivot_at_top_pair_matches_reference() {
        // Zero diagonal forces a 2x2 pivot at the topmost column pair of the
        // upper elimination on both paths.
        let mut pristine = TestMatrix::zeros(4);
        pristine.set(0, 1, 1.5);
        pristine.set(2, 3, 2.0);
        for &block in &[0usize, 1, 2, 3] {
            let mut cand = pristine.clone();
            let mut workspace = Workspace::for_factorization(4, block);
            let mut cand_piv = vec![0isize; 4];
            factorize(
                &mut cand,
                &mut workspace,
                &mut cand_piv,
                Triangle::Upper,
                block,
                Tuning::default(),
            )
            .expect("nonsingular input");

            let mut reference = pristine.clone();
            let mut ref_piv = vec![0i32; 4];
            super::super::reference::factorize(&mut reference, &mut ref_piv, Triangle::Upper)
                .expect("nonsingular input");

            assert_eq!(cand_piv, vec![-1, -1, -3, -3], "block {block}");
            for k in 0..4 {
                assert_eq!(cand_piv[k] as i64, ref_piv[k] as i64, "block {block} pivot {k}");
            }
            for j in 0..4 {
                for i in 0..4 {
                    assert_eq!(
                        cand.get(i, j),
                        reference.get(i, j),
                        "block {block} entry ({i},{j})"
                    );
                }
            }
        }
    }

    #[test]
    fn workspace_too_small_is_rejected() {
        let mut a = TestMatrix::zeros(8);
        let mut small = Workspace::for_factorization(4, 0);
        let mut ipiv = vec![0isize; 8];
        let err = factorize(
            &mut a,
            &mut small,
            &mut ipiv,
            Triangle::Lower,
            0,
            Tuning::default(),
        )
        .unwrap_err();
        assert_eq!(err, FactorError::WorkspaceTooSmall { rows: 4, cols: 2 });
    }

    #[test]
    fn zero_matrix_reports_singularity() {
        let mut a = TestMatrix::zeros(5);
        let mut workspace = Workspace::for_factorization(5, 2);
        let mut ipiv = vec![0isize; 5];
        let err = factorize(
            &mut a,
            &mut workspace,
            &mut ipiv,
            Triangle::Lower,
            2,
            Tuning::default(),
        )
        .unwrap_err();
        assert_eq!(err, FactorError::SingularPivot { index: 0 });
    }
}
