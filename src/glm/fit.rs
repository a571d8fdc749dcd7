//! Per-voxel GLM fit producing beta maps

use crate::matrix::Matrix;
use crate::solvers::{cholesky_decompose, cholesky_solve};

use super::GlmParams;

/// Fit a GLM at every voxel and return the leading task beta maps
///
/// # Arguments
/// * `input` - 4D time-series data (nx * ny * nz * nt, Fortran order)
/// * `mask` - Optional indicator mask (nx * ny * nz), 1 = fit, 0 = skip
/// * `nx`, `ny`, `nz`, `nt` - Input dimensions
/// * `regressor` - Design matrix (nt rows, one column per regressor)
/// * `params` - Task count and mask usage, already normalized by the caller
/// * `debug` - Emit a fit summary
///
/// # Returns
/// Beta maps as a 4D buffer (nx * ny * nz * num_tasks). The fit always uses
/// the full regressor; `num_tasks` only selects how many leading beta maps
/// are emitted. Voxels outside the mask are zero.
pub fn compute_glm(
    input: &[f64],
    mask: Option<&[u8]>,
    nx: usize, ny: usize, nz: usize, nt: usize,
    regressor: &Matrix,
    params: &GlmParams,
    debug: bool,
) -> Result<Vec<f64>, String> {
    let nvox = nx * ny * nz;
    let k = regressor.cols;

    let mask = check_inputs(input, mask, nvox, nt, regressor, params.use_mask)?;
    if params.num_tasks < 1 || params.num_tasks > k {
        return Err(format!(
            "task count {} outside [1, {}]", params.num_tasks, k
        ));
    }

    // XᵀX is shared by every voxel; factor it once
    let xtx = normal_matrix(regressor);
    let l = cholesky_decompose(&xtx, k)
        .map_err(|e| format!("regressor is rank deficient: {}", e))?;

    let mut betas = vec![0.0; nvox * params.num_tasks];
    let mut xty = vec![0.0; k];
    let mut fitted = 0usize;

    for v in 0..nvox {
        if let Some(m) = mask {
            if m[v] == 0 {
                continue;
            }
        }

        // Xᵀy for this voxel's time-series
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
        for c in 0..params.num_tasks {
            betas[v + c * nvox] = beta[c];
        }
        fitted += 1;
    }

    if debug {
        eprintln!(
            "GLM fit: {}/{} voxels, {} frames, {} regressors, {} task maps",
            fitted, nvox, nt, k, params.num_tasks
        );
    }

    Ok(betas)
}

/// Shared input validation for the fit and residualization paths
pub(super) fn check_inputs<'a>(
    input: &[f64],
    mask: Option<&'a [u8]>,
    nvox: usize,
    nt: usize,
    regressor: &Matrix,
    use_mask: bool,
) -> Result<Option<&'a [u8]>, String> {
    if input.len() != nvox * nt {
        return Err(format!(
            "input has {} values, expected {} ({} voxels x {} frames)",
            input.len(), nvox * nt, nvox, nt
        ));
    }
    if regressor.rows != nt {
        return Err(format!(
            "regressor has {} rows but input has {} frames",
            regressor.rows, nt
        ));
    }
    if nt < regressor.cols {
        return Err(format!(
            "{} frames cannot determine {} regressors",
            nt, regressor.cols
        ));
    }
    match (use_mask, mask) {
        (true, Some(m)) => {
            if m.len() != nvox {
                return Err(format!(
                    "mask has {} voxels, expected {}", m.len(), nvox
                ));
            }
            Ok(Some(m))
        }
        (true, None) => Err("mask requested but not supplied".to_string()),
        (false, _) => Ok(None),
    }
}

/// XᵀX as a row-major k x k buffer
pub(super) fn normal_matrix(x: &Matrix) -> Vec<f64> {
    let k = x.cols;
    let mut xtx = vec![0.0; k * k];
    for t in 0..x.rows {
        for i in 0..k {
            let xi = x.get(t, i);
            for j in 0..k {
                xtx[i * k + j] += xi * x.get(t, j);
            }
        }
    }
    xtx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    /// Two regressors: intercept and a ramp over 8 frames
    fn ramp_regressor(nt: usize) -> Matrix {
        let mut data = Vec::with_capacity(nt * 2);
        for t in 0..nt {
            data.push(1.0);
            data.push(t as f64);
        }
        Matrix::new(data, nt, 2).unwrap()
    }

    /// Noiseless series y = b0 + b1 * t per voxel
    fn synthetic_input(nvox: usize, nt: usize, b0: &[f64], b1: &[f64]) -> Vec<f64> {
        let mut input = vec![0.0; nvox * nt];
        for t in 0..nt {
            for v in 0..nvox {
                input[v + t * nvox] = b0[v] + b1[v] * t as f64;
            }
        }
        input
    }

    #[test]
    fn test_recovers_exact_betas() {
        let (nx, ny, nz, nt) = (2, 2, 1, 8);
        let nvox = nx * ny * nz;
        let b0 = [1.0, -2.0, 0.5, 3.0];
        let b1 = [0.0, 1.0, -0.25, 2.0];
        let input = synthetic_input(nvox, nt, &b0, &b1);
        let regressor = ramp_regressor(nt);

        let params = GlmParams { num_tasks: 2, use_mask: false };
        let betas = compute_glm(&input, None, nx, ny, nz, nt, &regressor, &params, false).unwrap();

        assert_eq!(betas.len(), nvox * 2);
        for v in 0..nvox {
            assert!((betas[v] - b0[v]).abs() < 1e-9, "b0 at voxel {}", v);
            assert!((betas[v + nvox] - b1[v]).abs() < 1e-9, "b1 at voxel {}", v);
        }
    }

    #[test]
    fn test_num_tasks_truncates_output() {
        let (nx, ny, nz, nt) = (2, 1, 1, 8);
        let nvox = nx * ny * nz;
        let input = synthetic_input(nvox, nt, &[1.0, 2.0], &[0.5, -0.5]);
        let regressor = ramp_regressor(nt);

        let params = GlmParams { num_tasks: 1, use_mask: false };
        let betas = compute_glm(&input, None, nx, ny, nz, nt, &regressor, &params, false).unwrap();

        // Only the intercept map, but fit with both columns
        assert_eq!(betas.len(), nvox);
        assert!((betas[0] - 1.0).abs() < 1e-9);
        assert!((betas[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_masked_voxels_are_zero() {
        let (nx, ny, nz, nt) = (3, 1, 1, 8);
        let nvox = nx * ny * nz;
        let input = synthetic_input(nvox, nt, &[5.0, 5.0, 5.0], &[1.0, 1.0, 1.0]);
        let regressor = ramp_regressor(nt);
        let mask = vec![1u8, 0, 1];

        let params = GlmParams { num_tasks: 2, use_mask: true };
        let betas = compute_glm(&input, Some(&mask), nx, ny, nz, nt, &regressor, &params, false).unwrap();

        assert!((betas[0] - 5.0).abs() < 1e-9);
        assert_eq!(betas[1], 0.0);
        assert_eq!(betas[1 + nvox], 0.0);
        assert!((betas[2 + nvox] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_mismatch_fails() {
        let regressor = ramp_regressor(10);
        let input = vec![0.0; 4 * 8];
        let params = GlmParams { num_tasks: 2, use_mask: false };
        assert!(compute_glm(&input, None, 2, 2, 1, 8, &regressor, &params, false).is_err());
    }

    #[test]
    fn test_mask_length_mismatch_fails() {
        let nt = 8;
        let regressor = ramp_regressor(nt);
        let input = vec![0.0; 4 * nt];
        let mask = vec![1u8; 3];
        let params = GlmParams { num_tasks: 2, use_mask: true };
        assert!(compute_glm(&input, Some(&mask), 2, 2, 1, nt, &regressor, &params, false).is_err());
    }

    #[test]
    fn test_rank_deficient_regressor_fails() {
        let nt = 8;
        // Second column duplicates the first
        let mut data = Vec::new();
        for _ in 0..nt {
            data.push(1.0);
            data.push(1.0);
        }
        let regressor = Matrix::new(data, nt, 2).unwrap();
        let input = vec![0.0; 2 * nt];
        let params = GlmParams { num_tasks: 2, use_mask: false };
        assert!(compute_glm(&input, None, 2, 1, 1, nt, &regressor, &params, false).is_err());
    }
}
