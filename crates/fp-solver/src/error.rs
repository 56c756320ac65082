//! Error types for solver operations.

use fp_core::FpError;
use thiserror::Error;

/// Errors that can occur while inverting a property relation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Newton did not converge after {iterations} iterations (residual = {residual:e})")]
    MaxIterations { iterations: usize, residual: f64 },

    #[error("Singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("Non-finite value in {what}")]
    NonFinite { what: &'static str },

    #[error("Invalid solver configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Residual evaluation failed: {message}")]
    Evaluation { message: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<FpError> for SolverError {
    fn from(e: FpError) -> Self {
        match e {
            FpError::NonFinite { what, .. } => SolverError::NonFinite { what },
            other => SolverError::Evaluation {
                message: other.to_string(),
            },
        }
    }
}
