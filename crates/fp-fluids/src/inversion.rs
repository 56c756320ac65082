//! Newton-based conversions between variable sets.
//!
//! These wrap the generic solvers with the fluid's configured tolerance and
//! iteration cap. A solver failure is reported once per object as a warning and
//! returned as [`FluidError::ConvergenceFailed`]; errors raised by the property
//! evaluations themselves propagate unchanged.

use fp_core::{Real, WithPartials};
use fp_solver::{NewtonSolution1d, NewtonSolution2d, newton_solve_1d, newton_solve_2d};
use nalgebra::Matrix2;

use crate::base::FluidPropertiesBase;
use crate::error::{FluidError, FluidResult};

/// Solve `f(p, T) = targets.0`, `g(p, T) = targets.1` for (p, T).
pub fn solve_p_t<F, G>(
    base: &FluidPropertiesBase,
    method: &'static str,
    pair: &'static str,
    targets: (Real, Real),
    guess: (Real, Real),
    f: F,
    g: G,
) -> FluidResult<NewtonSolution2d>
where
    F: FnMut(Real, Real) -> FluidResult<WithPartials>,
    G: FnMut(Real, Real) -> FluidResult<WithPartials>,
{
    let config = base.newton_config();
    newton_solve_2d(targets, guess, &config, f, g).map_err(|err| {
        conversion_failure(
            base,
            method,
            format!("{pair} = ({}, {}) to (p, T)", targets.0, targets.1),
            err,
        )
    })
}

/// Solve `f(x) = target` for one unknown.
pub fn solve_scalar<F>(
    base: &FluidPropertiesBase,
    method: &'static str,
    what: impl FnOnce() -> String,
    target: Real,
    guess: Real,
    f: F,
) -> FluidResult<NewtonSolution1d>
where
    F: FnMut(Real) -> FluidResult<(Real, Real)>,
{
    let config = base.newton_config();
    newton_solve_1d(target, guess, &config, f)
        .map_err(|err| conversion_failure(base, method, what(), err))
}

fn conversion_failure(
    base: &FluidPropertiesBase,
    method: &'static str,
    what: String,
    err: FluidError,
) -> FluidError {
    match err {
        FluidError::Solver(reason) => {
            base.warn_once(method, || format!("Conversion from {what} failed: {reason}"));
            FluidError::ConvergenceFailed {
                what,
                reason: reason.to_string(),
            }
        }
        other => other,
    }
}

/// d(p, T)/d(a, b) given the partials of a(p, T) and b(p, T).
///
/// Rows are (p, T), columns are (a, b).
pub fn sensitivity(a: WithPartials, b: WithPartials) -> FluidResult<Matrix2<Real>> {
    Matrix2::new(a.d1, a.d2, b.d1, b.d2)
        .try_inverse()
        .ok_or(FluidError::NonPhysical {
            what: "singular Jacobian of the (p, T) conversion",
        })
}

/// Re-express partials of `x(p, T)` as partials with respect to (a, b).
pub fn through(x: WithPartials, dpt: &Matrix2<Real>) -> WithPartials {
    WithPartials {
        value: x.value,
        d1: x.d1 * dpt[(0, 0)] + x.d2 * dpt[(1, 0)],
        d2: x.d1 * dpt[(0, 1)] + x.d2 * dpt[(1, 1)],
    }
}
