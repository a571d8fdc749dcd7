//! Residualization: remove regressor signals from a time-series

use crate::matrix::Matrix;
use crate::solvers::{cholesky_decompose, cholesky_solve};

use super::fit::{check_inputs, normal_matrix};

/// Regress the design matrix out of every voxel time-series
///
/// Fits y = X·β per voxel and returns the residual y − X·β, with the same
/// shape as the input. Voxels outside the mask are passed through
/// unchanged.
pub fn regress_out(
    input: &[f64],
    mask: Option<&[u8]>,
    nx: usize, ny: usize, nz: usize, nt: usize,
    regressor: &Matrix,
    debug: bool,
) -> Result<Vec<f64>, String> {
    let nvox = nx * ny * nz;
    let k = regressor.cols;

    let mask = check_inputs(input, mask, nvox, nt, regressor, mask.is_some())?;

    let xtx = normal_matrix(regressor);
    let l = cholesky_decompose(&xtx, k)
        .map_err(|e| format!("regressor is rank deficient: {}", e))?;

    let mut residual = input.to_vec();
    let mut xty = vec![0.0; k];
    let mut cleaned = 0usize;

    for v in 0..nvox {
        if let Some(m) = mask {
            if m[v] == 0 {
                continue;
            }
        }

        for c in 0..k {
            xty[c] = 0.0;
        }
        for t in 0..nt {
            let y = input[v + t * nvox];
            for c in 0..k {
                xty[c] += regressor.get(t, c) * y;
            }
        }

        let beta = cholesky_solve(&l, &xty, k);
        for t in 0..nt {
            let mut fitted = 0.0;
            for c in 0..k {
                fitted += regressor.get(t, c) * beta[c];
            }
            residual[v + t * nvox] -= fitted;
        }
        cleaned += 1;
    }

    if debug {
        eprintln!(
            "regress out: {}/{} voxels, {} frames, {} regressors",
            cleaned, nvox, nt, k
        );
    }

    Ok(residual)
}
