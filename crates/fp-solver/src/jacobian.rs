//! Finite difference derivatives for residuals without analytic partials.

use fp_core::{Real, WithPartials, fd_step};
use nalgebra::{Matrix2, Vector2};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DifferenceScheme {
    Forward,
    #[default]
    Central,
}

/// Jacobian of a two-component residual using forward differences.
///
/// Column j perturbs `x[j]` by `fd_step(x[j], rel_step)` and takes `(f(x+e) - f(x)) / e`.
pub fn finite_difference_jacobian<F, E>(
    x: &Vector2<Real>,
    rel_step: Real,
    mut f: F,
) -> Result<Matrix2<Real>, E>
where
    F: FnMut(&Vector2<Real>) -> Result<Vector2<Real>, E>,
{
    let f_x = f(x)?;
    let mut jac = Matrix2::zeros();
    for j in 0..2 {
        let dx = fd_step(x[j], rel_step);
        let mut x_perturbed = *x;
        x_perturbed[j] += dx;
        let df = (f(&x_perturbed)? - f_x) / dx;
        jac.set_column(j, &df);
    }
    Ok(jac)
}

/// Jacobian of a two-component residual using central differences (2x the evaluations).
pub fn central_difference_jacobian<F, E>(
    x: &Vector2<Real>,
    rel_step: Real,
    mut f: F,
) -> Result<Matrix2<Real>, E>
where
    F: FnMut(&Vector2<Real>) -> Result<Vector2<Real>, E>,
{
    let mut jac = Matrix2::zeros();
    for j in 0..2 {
        let dx = fd_step(x[j], rel_step);
        let mut x_plus = *x;
        x_plus[j] += dx;
        let mut x_minus = *x;
        x_minus[j] -= dx;
        let df = (f(&x_plus)? - f(&x_minus)?) / (2.0 * dx);
        jac.set_column(j, &df);
    }
    Ok(jac)
}

/// Value and both partials of a scalar property `f(a, b)` by finite differences.
pub fn difference_partials<F, E>(
    a: Real,
    b: Real,
    rel_step: Real,
    scheme: DifferenceScheme,
    mut f: F,
) -> Result<WithPartials, E>
where
    F: FnMut(Real, Real) -> Result<Real, E>,
{
    let value = f(a, b)?;
    let da = fd_step(a, rel_step);
    let db = fd_step(b, rel_step);
    let (d1, d2) = match scheme {
        DifferenceScheme::Forward => ((f(a + da, b)? - value) / da, (f(a, b + db)? - value) / db),
        DifferenceScheme::Central => (
            (f(a + da, b)? - f(a - da, b)?) / (2.0 * da),
            (f(a, b + db)? - f(a, b - db)?) / (2.0 * db),
        ),
    };
    Ok(WithPartials { value, d1, d2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SolverError;

    fn residual(x: &Vector2<Real>) -> Result<Vector2<Real>, SolverError> {
        Ok(Vector2::new(x[0] * x[0] * x[1], 3.0 * x[0] + x[1].exp()))
    }

    fn exact(x: &Vector2<Real>) -> Matrix2<Real> {
        Matrix2::new(2.0 * x[0] * x[1], x[0] * x[0], 3.0, x[1].exp())
    }

    #[test]
    fn forward_jacobian_matches_analytic() {
        let x = Vector2::new(1.5, 0.5);
        let jac = finite_difference_jacobian(&x, 1e-7, residual).unwrap();
        assert!((jac - exact(&x)).amax() < 1e-5);
    }

    #[test]
    fn central_jacobian_is_more_accurate() {
        let x = Vector2::new(1.5, 0.5);
        let fwd = finite_difference_jacobian(&x, 1e-5, residual).unwrap();
        let ctr = central_difference_jacobian(&x, 1e-5, residual).unwrap();
        let exact = exact(&x);
        assert!((ctr - exact).amax() < (fwd - exact).amax());
        assert!((ctr - exact).amax() < 1e-8);
    }

    #[test]
    fn scalar_partials() {
        let f = |a: Real, b: Real| -> Result<Real, SolverError> { Ok(a * b * b) };
        let w = difference_partials(2.0, 3.0, 1e-6, DifferenceScheme::Central, f).unwrap();
        assert_eq!(w.value, 18.0);
        assert!((w.d1 - 9.0).abs() < 1e-6);
        assert!((w.d2 - 12.0).abs() < 1e-6);
    }

    #[test]
    fn evaluation_errors_propagate() {
        let f = |_: Real, _: Real| -> Result<Real, SolverError> {
            Err(SolverError::Evaluation {
                message: "boom".into(),
            })
        };
        let err = difference_partials(1.0, 1.0, 1e-6, DifferenceScheme::Forward, f).unwrap_err();
        assert!(matches!(err, SolverError::Evaluation { .. }));
    }
}
