//! General Linear Model fitting
//!
//! Per-voxel ordinary least squares over a shared regressor matrix: every
//! voxel time-series y is fit as y = X·β and the leading task betas are
//! emitted as a 4D map. The normal equations XᵀX·β = Xᵀy share a single
//! Cholesky factorization across all voxels.

mod fit;
mod regress;

pub use fit::compute_glm;
pub use regress::regress_out;

/// Configuration consumed by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlmParams {
    /// How many leading beta maps to emit, in [1, regressor columns]
    pub num_tasks: usize,
    /// Restrict the fit to voxels inside the mask
    pub use_mask: bool,
}

/// Resolve a requested task count against the regressor's column count
///
/// Requests that are non-positive or at/beyond the column count fall back to
/// the full column count; anything strictly inside [1, columns) passes
/// through unchanged.
pub fn clamp_task_count(requested: i32, columns: usize) -> usize {
    if requested <= 0 || requested as usize >= columns {
        columns
    } else {
        requested as usize
    }
}
