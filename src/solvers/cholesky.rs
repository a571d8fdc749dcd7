//! Dense Cholesky solver
//!
//! Solves Ax = b for small symmetric positive definite A, as arises in the
//! GLM normal equations. The factorization is done once and reused for many
//! right-hand sides.

/// Cholesky factorization A = L·Lᵀ
///
/// # Arguments
/// * `a` - Symmetric positive definite matrix, row-major (n * n)
/// * `n` - Matrix dimension
///
/// # Returns
/// Lower-triangular factor L in row-major storage, or an error naming the
/// first non-positive pivot (rank-deficient input).
pub fn cholesky_decompose(a: &[f64], n: usize) -> Result<Vec<f64>, String> {
    let mut l = vec![0.0; n * n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }

            if i == j {
                if sum <= 1e-12 {
                    return Err(format!(
                        "matrix is not positive definite (pivot {} = {:.3e})", i, sum
                    ));
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }

    Ok(l)
}

/// Solve L·Lᵀ·x = b given a factor from `cholesky_decompose`
///
/// Forward substitution with L, then backward substitution with Lᵀ.
pub fn cholesky_solve(l: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    // L·y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * n + k] * y[k];
        }
        y[i] = sum / l[i * n + i];
    }

    // Lᵀ·x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[k * n + i] * x[k];
        }
        x[i] = sum / l[i * n + i];
    }

    x
}
