//! Dual-number properties agree with the Real ones.

use std::sync::Arc;

use fp_core::{ADReal, Real};
use fp_fluids::fluids::{
    FlibeFluidProperties, HeliumFluidProperties, IdealGasFluidProperties, SimpleFluidProperties,
};
use fp_fluids::{ADFluidProperties, FluidError, ParamBag, SinglePhaseFluid};
use proptest::prelude::*;

fn fluids() -> Vec<Arc<dyn SinglePhaseFluid>> {
    vec![
        Arc::new(SimpleFluidProperties::new("water")),
        Arc::new(IdealGasFluidProperties::new("air")),
        Arc::new(HeliumFluidProperties::new("he")),
        Arc::new(FlibeFluidProperties::new("salt")),
    ]
}

fn seeded(a: Real, b: Real) -> (ADReal, ADReal) {
    (
        ADReal::variable(a, 0).unwrap(),
        ADReal::variable(b, 1).unwrap(),
    )
}

proptest! {
    #[test]
    fn seeded_duals_carry_the_real_partials(p in 2e5..5e6_f64, t in 850.0..1000.0_f64) {
        for fp in fluids() {
            let (pd, td) = seeded(p, t);
            let rho = fp.rho_from_p_t_ad(&pd, &td).unwrap();
            let w = fp.rho_from_p_t_derivs(p, t).unwrap();
            prop_assert_eq!(rho.value(), w.value);
            prop_assert_eq!(rho.derivative(0), w.d1);
            prop_assert_eq!(rho.derivative(1), w.d2);
            prop_assert_eq!(rho.derivative(2), 0.0);

            let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
            let (vd, ed) = seeded(v, e);
            let pr = fp.p_from_v_e_ad(&vd, &ed).unwrap();
            let w = fp.p_from_v_e_derivs(v, e).unwrap();
            prop_assert_eq!(pr.value(), w.value);
            prop_assert_eq!(pr.derivative(0), w.d1);
            prop_assert_eq!(pr.derivative(1), w.d2);
        }
    }

    #[test]
    fn chained_duals_follow_the_chain_rule(x in 1.0..2.0_f64) {
        // p = 1e5 x^2, T = 300 x: d rho / dx through both arguments
        let air = IdealGasFluidProperties::new("air");
        let xd = ADReal::variable(x, 0).unwrap();
        let pd = xd * xd * 1e5;
        let td = xd * 300.0;
        let rho = air.rho_from_p_t_ad(&pd, &td).unwrap();
        let w = air.rho_from_p_t_derivs(pd.value(), td.value()).unwrap();
        let expected = w.d1 * 2e5 * x + w.d2 * 300.0;
        prop_assert!((rho.derivative(0) - expected).abs() <= 1e-12 * expected.abs());
    }
}

#[test]
fn p_t_from_v_e_ad_matches_closed_form() {
    let air = IdealGasFluidProperties::new("air");
    let (v, e) = air.v_e_from_p_t(3e5, 500.0).unwrap();
    let (vd, ed) = seeded(v, e);
    let (p, t) = air.p_t_from_v_e_ad(&vd, &ed, 1e5, 300.0).unwrap();
    let pw = air.p_from_v_e_derivs(v, e).unwrap();
    let tw = air.t_from_v_e_derivs(v, e).unwrap();
    assert!((p.value() - 3e5).abs() < 1e-6);
    assert!((t.value() - 500.0).abs() < 1e-9);
    assert!((p.derivative(0) - pw.d1).abs() <= 1e-9 * pw.d1.abs());
    assert!((p.derivative(1) - pw.d2).abs() <= 1e-9 * pw.d2.abs());
    assert!((t.derivative(1) - tw.d2).abs() <= 1e-9 * tw.d2.abs());
    assert!(t.derivative(0).abs() < 1e-12);
}

#[test]
fn ad_partials_follow_derivative_policy() {
    let strict = SimpleFluidProperties::new("water");
    let (p, t) = seeded(1e5, 300.0);
    assert!(matches!(
        strict.rho_from_p_t_ad_derivs(&p, &t),
        Err(FluidError::UnimplementedDerivative { .. })
    ));

    let lenient = SimpleFluidProperties::from_params(
        "water",
        &ParamBag::new().with("allow_imperfect_jacobians", true),
    )
    .unwrap();
    let (rho, drho_dp, drho_dt) = lenient.rho_from_p_t_ad_derivs(&p, &t).unwrap();
    let w = lenient.rho_from_p_t_derivs(1e5, 300.0).unwrap();
    assert_eq!(rho.value(), w.value);
    assert_eq!(drho_dp.value(), w.d1);
    assert_eq!(drho_dt.value(), w.d2);
    assert_eq!(drho_dt.derivative(0), 0.0);
}
