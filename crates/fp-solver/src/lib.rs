//! Newton-Raphson inversion of property relations.
//!
//! The solvers work on closures that return a value together with its partial
//! derivatives, so analytic, automatic and finite-difference derivatives can all
//! drive the same iteration. Closures return `Result<_, E>` for any error type
//! that can absorb a [`SolverError`]; evaluation failures propagate unchanged.

pub mod error;
pub mod jacobian;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use jacobian::{
    DifferenceScheme, central_difference_jacobian, difference_partials,
    finite_difference_jacobian,
};
pub use newton::{NewtonConfig, NewtonSolution1d, NewtonSolution2d, newton_solve_1d, newton_solve_2d};
