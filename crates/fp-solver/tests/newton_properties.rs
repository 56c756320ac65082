//! Property-based checks of the Newton solvers on closed-form relations.

use fp_core::{Real, WithPartials};
use fp_solver::{NewtonConfig, SolverError, newton_solve_1d, newton_solve_2d};
use proptest::prelude::*;

// p = (gamma - 1) e / v, T = e / cv for an ideal gas with gamma = 1.4, cv = 717.5
const GAMMA: Real = 1.4;
const CV: Real = 717.5;

fn p_of(v: Real, e: Real) -> WithPartials {
    let p = (GAMMA - 1.0) * e / v;
    WithPartials::new(p, -p / v, (GAMMA - 1.0) / v)
}

fn t_of(_v: Real, e: Real) -> WithPartials {
    WithPartials::new(e / CV, 0.0, 1.0 / CV)
}

proptest! {
    #[test]
    fn recovers_volume_and_energy(v in 0.05..5.0_f64, t in 200.0..1500.0_f64) {
        let e = CV * t;
        let targets = (p_of(v, e).value, t);
        let config = NewtonConfig::default();
        let sol = newton_solve_2d::<_, _, SolverError>(
            targets,
            (1.3 * v, 0.8 * e),
            &config,
            |v, e| Ok(p_of(v, e)),
            |v, e| Ok(t_of(v, e)),
        ).unwrap();
        prop_assert!((sol.x - v).abs() <= 1e-6 * v);
        prop_assert!((sol.y - e).abs() <= 1e-6 * e);
    }

    #[test]
    fn cube_root_round_trip(x in 0.1..100.0_f64) {
        let config = NewtonConfig::default();
        let sol = newton_solve_1d::<_, SolverError>(x * x * x, 1.0, &config, |z| {
            Ok((z * z * z, 3.0 * z * z))
        }).unwrap();
        prop_assert!((sol.x - x).abs() <= 1e-7 * x);
    }
}

#[derive(Debug, PartialEq)]
enum CallerError {
    Solver(SolverError),
    Property(&'static str),
}

impl From<SolverError> for CallerError {
    fn from(e: SolverError) -> Self {
        CallerError::Solver(e)
    }
}

#[test]
fn caller_error_type_passes_through() {
    let config = NewtonConfig::default();
    let err = newton_solve_1d(1.0, 1.0, &config, |_| -> Result<(Real, Real), CallerError> {
        Err(CallerError::Property("density unavailable"))
    })
    .unwrap_err();
    assert_eq!(err, CallerError::Property("density unavailable"));

    let err = newton_solve_1d(1.0, 1.0, &config.with_max_iterations(0), |x| -> Result<_, CallerError> {
        Ok((x, 1.0))
    })
    .unwrap_err();
    assert!(matches!(err, CallerError::Solver(SolverError::InvalidConfig { .. })));
}
