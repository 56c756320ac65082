//! Newton solver for one and two unknowns.

use fp_core::{Real, WithPartials};
use nalgebra::{Matrix2, Vector2};
use tracing::debug;

use crate::error::{SolverError, SolverResult};

/// Newton solver configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Maximum number of Newton steps
    pub max_iterations: usize,
    /// Relative tolerance on each residual, scaled by its target
    pub rel_tol: Real,
    /// Absolute floor on each residual
    pub abs_tol: Real,
    /// Relative determinant threshold below which the Jacobian is singular
    pub singular_tol: Real,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            rel_tol: 1e-8,
            abs_tol: 1e-12,
            singular_tol: 1e-13,
        }
    }
}

impl NewtonConfig {
    pub fn with_rel_tol(mut self, rel_tol: Real) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> SolverResult<()> {
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidConfig {
                what: "max_iterations must be positive",
            });
        }
        if !(self.rel_tol.is_finite() && self.rel_tol >= 0.0) {
            return Err(SolverError::InvalidConfig {
                what: "rel_tol must be finite and non-negative",
            });
        }
        if !(self.abs_tol.is_finite() && self.abs_tol >= 0.0) {
            return Err(SolverError::InvalidConfig {
                what: "abs_tol must be finite and non-negative",
            });
        }
        if !(self.singular_tol.is_finite() && self.singular_tol >= 0.0) {
            return Err(SolverError::InvalidConfig {
                what: "singular_tol must be finite and non-negative",
            });
        }
        Ok(())
    }

    /// `|value - target| <= max(rel_tol * |target|, abs_tol)`
    #[inline]
    pub fn is_converged(&self, value: Real, target: Real) -> bool {
        (value - target).abs() <= (self.rel_tol * target.abs()).max(self.abs_tol)
    }
}

/// Converged one-unknown solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonSolution1d {
    pub x: Real,
    /// Newton steps taken
    pub iterations: usize,
    /// Signed residual at `x`
    pub residual: Real,
    /// d(value)/dx at `x`
    pub slope: Real,
}

/// Converged two-unknown solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonSolution2d {
    pub x: Real,
    pub y: Real,
    pub iterations: usize,
    /// Jacobian of (f, g) with respect to (x, y) at the solution
    pub jacobian: Matrix2<Real>,
}

impl NewtonSolution2d {
    /// d(x, y)/d(f, g) at the solution, by the implicit function theorem.
    pub fn sensitivity(&self) -> Option<Matrix2<Real>> {
        self.jacobian.try_inverse()
    }
}

/// Solve `f(x) = target` where `f` returns `(value, dvalue/dx)`.
pub fn newton_solve_1d<F, E>(
    target: Real,
    x0: Real,
    config: &NewtonConfig,
    mut f: F,
) -> Result<NewtonSolution1d, E>
where
    F: FnMut(Real) -> Result<(Real, Real), E>,
    E: From<SolverError>,
{
    config.validate()?;
    if !(target.is_finite() && x0.is_finite()) {
        return Err(SolverError::NonFinite {
            what: "newton target or initial guess",
        }
        .into());
    }

    let mut x = x0;
    let mut iteration = 0;
    loop {
        let (value, slope) = f(x)?;
        if !(value.is_finite() && slope.is_finite()) {
            return Err(SolverError::NonFinite {
                what: "newton residual",
            }
            .into());
        }
        let residual = value - target;
        debug!(iteration, x, residual, "newton 1d");

        if config.is_converged(value, target) {
            return Ok(NewtonSolution1d {
                x,
                iterations: iteration,
                residual,
                slope,
            });
        }
        if iteration == config.max_iterations {
            return Err(SolverError::MaxIterations {
                iterations: iteration,
                residual: residual.abs(),
            }
            .into());
        }
        if slope == 0.0 {
            return Err(SolverError::SingularJacobian { iteration }.into());
        }

        x -= residual / slope;
        if !x.is_finite() {
            return Err(SolverError::NonFinite {
                what: "newton iterate",
            }
            .into());
        }
        iteration += 1;
    }
}

/// Solve `f(x, y) = targets.0`, `g(x, y) = targets.1` from `guess`.
pub fn newton_solve_2d<F, G, E>(
    targets: (Real, Real),
    guess: (Real, Real),
    config: &NewtonConfig,
    mut f: F,
    mut g: G,
) -> Result<NewtonSolution2d, E>
where
    F: FnMut(Real, Real) -> Result<WithPartials, E>,
    G: FnMut(Real, Real) -> Result<WithPartials, E>,
    E: From<SolverError>,
{
    config.validate()?;
    if !(targets.0.is_finite() && targets.1.is_finite() && guess.0.is_finite() && guess.1.is_finite())
    {
        return Err(SolverError::NonFinite {
            what: "newton targets or initial guess",
        }
        .into());
    }

    let mut x = Vector2::new(guess.0, guess.1);
    let mut iteration = 0;
    loop {
        let fv = f(x[0], x[1])?;
        let gv = g(x[0], x[1])?;
        if !(fv.is_finite() && gv.is_finite()) {
            return Err(SolverError::NonFinite {
                what: "newton residual",
            }
            .into());
        }
        let residual = Vector2::new(fv.value - targets.0, gv.value - targets.1);
        let jacobian = Matrix2::new(fv.d1, fv.d2, gv.d1, gv.d2);
        debug!(
            iteration,
            x = x[0],
            y = x[1],
            r1 = residual[0],
            r2 = residual[1],
            "newton 2d"
        );

        if config.is_converged(fv.value, targets.0) && config.is_converged(gv.value, targets.1) {
            return Ok(NewtonSolution2d {
                x: x[0],
                y: x[1],
                iterations: iteration,
                jacobian,
            });
        }
        if iteration == config.max_iterations {
            return Err(SolverError::MaxIterations {
                iterations: iteration,
                residual: residual.amax(),
            }
            .into());
        }

        let step = solve_2x2(&jacobian, &residual, config.singular_tol)
            .ok_or(SolverError::SingularJacobian { iteration })?;
        x -= step;
        if !(x[0].is_finite() && x[1].is_finite()) {
            return Err(SolverError::NonFinite {
                what: "newton iterate",
            }
            .into());
        }
        iteration += 1;
    }
}

/// `J^-1 r`, or `None` when `|det J| <= tol * (|J11 J22| + |J12 J21|)`.
fn solve_2x2(jacobian: &Matrix2<Real>, rhs: &Vector2<Real>, tol: Real) -> Option<Vector2<Real>> {
    let det = jacobian.determinant();
    let scale = (jacobian[(0, 0)] * jacobian[(1, 1)]).abs()
        + (jacobian[(0, 1)] * jacobian[(1, 0)]).abs();
    if !det.is_finite() || det == 0.0 || det.abs() <= tol * scale {
        return None;
    }
    jacobian.try_inverse().map(|inv| inv * rhs)
}
