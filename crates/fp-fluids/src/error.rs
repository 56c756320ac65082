//! Fluid property errors.

use fp_core::FpError;
use fp_solver::SolverError;
use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur during fluid property calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Bad parameters or data file, detected at construction time.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// The fluid does not provide this property.
    #[error("Fluid '{fluid}' has not implemented {method}")]
    NotImplemented { fluid: String, method: &'static str },

    /// The fluid provides the value but not the derivatives.
    #[error(
        "Fluid '{fluid}' has not implemented the derivatives of {method}; \
         set allow_imperfect_jacobians to neglect them"
    )]
    UnimplementedDerivative { fluid: String, method: &'static str },

    /// Input outside a correlation or tabulation range.
    #[error("{what} = {value} is outside the range [{min}, {max}]")]
    OutOfBounds {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Non-physical values (negative density, pressure, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// A variable set conversion did not converge.
    #[error("Conversion from {what} failed: {reason}")]
    ConvergenceFailed { what: String, reason: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Core(#[from] FpError),
}

impl FluidError {
    pub fn config(message: impl Into<String>) -> Self {
        FluidError::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FluidError {
    fn from(err: std::io::Error) -> Self {
        FluidError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FluidError::NonPhysical { what: "pressure" };
        assert!(err.to_string().contains("pressure"));

        let err = FluidError::NotImplemented {
            fluid: "water".into(),
            method: "s_from_h_p",
        };
        let msg = err.to_string();
        assert!(msg.contains("water") && msg.contains("s_from_h_p"));

        let err = FluidError::UnimplementedDerivative {
            fluid: "water".into(),
            method: "mu_from_v_e_derivs",
        };
        assert!(err.to_string().contains("allow_imperfect_jacobians"));
    }

    #[test]
    fn solver_errors_convert() {
        let err: FluidError = SolverError::SingularJacobian { iteration: 3 }.into();
        assert!(matches!(err, FluidError::Solver(_)));
        assert!(err.to_string().contains("iteration 3"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: FluidError = io.into();
        assert!(matches!(err, FluidError::Io { .. }));
    }
}
