//! Dense solvers for the GLM normal equations
//!
//! - Cholesky: factor-once solve for symmetric positive definite systems

pub mod cholesky;

pub use cholesky::*;
