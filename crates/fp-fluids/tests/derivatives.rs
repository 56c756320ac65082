//! Hand-coded partial derivatives against central finite differences.

use fp_core::{Real, WithPartials};
use fp_fluids::fluids::{
    FlibeFluidProperties, HeliumFluidProperties, IdealGasFluidProperties, SimpleFluidProperties,
    SodiumLiquidFluidProperties,
};
use fp_fluids::{FluidError, SinglePhaseFluid};
use fp_solver::{DifferenceScheme, difference_partials};
use proptest::prelude::*;

const REL_STEP: Real = 1e-6;
const REL_TOL: Real = 1e-5;

fn assert_partials(what: &str, exact: WithPartials, a: Real, b: Real, fd: WithPartials) {
    assert!(
        (exact.value - fd.value).abs() <= 1e-12 * exact.value.abs().max(1.0),
        "{what}: value {} vs {}",
        exact.value,
        fd.value
    );
    let scale1 = exact.d1.abs() + exact.value.abs() / a.abs();
    let scale2 = exact.d2.abs() + exact.value.abs() / b.abs();
    assert!(
        (exact.d1 - fd.d1).abs() <= REL_TOL * scale1,
        "{what}: d1 {} vs finite difference {}",
        exact.d1,
        fd.d1
    );
    assert!(
        (exact.d2 - fd.d2).abs() <= REL_TOL * scale2,
        "{what}: d2 {} vs finite difference {}",
        exact.d2,
        fd.d2
    );
}

/// Compare `fp.$derivs(a, b)` with central differences of `fp.$name`.
macro_rules! check {
    ($fp:expr, $a:expr, $b:expr; $($name:ident / $derivs:ident),* $(,)?) => {
        $(
            let exact = $fp.$derivs($a, $b).unwrap();
            let fd = difference_partials::<_, FluidError>(
                $a,
                $b,
                REL_STEP,
                DifferenceScheme::Central,
                |x, y| $fp.$name(x, y),
            )
            .unwrap();
            assert_partials(stringify!($name), exact, $a, $b, fd);
        )*
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn simple_fluid(p in 1e5..1e7_f64, t in 280.0..370.0_f64) {
        let fp = SimpleFluidProperties::new("water");
        check!(fp, p, t;
            rho_from_p_t / rho_from_p_t_derivs,
            e_from_p_t / e_from_p_t_derivs,
            h_from_p_t / h_from_p_t_derivs,
            c_from_p_t / c_from_p_t_derivs,
        );
        let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
        check!(fp, v, e;
            p_from_v_e / p_from_v_e_derivs,
            t_from_v_e / t_from_v_e_derivs,
            h_from_v_e / h_from_v_e_derivs,
            c_from_v_e / c_from_v_e_derivs,
        );
        let h = fp.h_from_p_t(p, t).unwrap();
        check!(fp, v, h; e_from_v_h / e_from_v_h_derivs);
    }

    #[test]
    fn ideal_gas(p in 1e4..1e7_f64, t in 200.0..1500.0_f64) {
        let fp = IdealGasFluidProperties::new("air");
        check!(fp, p, t;
            rho_from_p_t / rho_from_p_t_derivs,
            h_from_p_t / h_from_p_t_derivs,
            s_from_p_t / s_from_p_t_derivs,
            c_from_p_t / c_from_p_t_derivs,
        );
        let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
        check!(fp, v, e;
            p_from_v_e / p_from_v_e_derivs,
            c_from_v_e / c_from_v_e_derivs,
            s_from_v_e / s_from_v_e_derivs,
            g_from_v_e / g_from_v_e_derivs,
        );
        let h = fp.h_from_p_t(p, t).unwrap();
        let s = fp.s_from_p_t(p, t).unwrap();
        check!(fp, h, s; p_from_h_s / p_from_h_s_derivs);
        check!(fp, p, s; rho_from_p_s / rho_from_p_s_derivs);
    }

    #[test]
    fn helium(p in 1e5..7e6_f64, t in 300.0..1000.0_f64) {
        let fp = HeliumFluidProperties::new("he");
        check!(fp, p, t;
            rho_from_p_t / rho_from_p_t_derivs,
            k_from_p_t / k_from_p_t_derivs,
            mu_from_p_t / mu_from_p_t_derivs,
            h_from_p_t / h_from_p_t_derivs,
        );
        let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
        check!(fp, v, e; p_from_v_e / p_from_v_e_derivs);
    }

    #[test]
    fn flibe(p in 1e5..1e6_f64, t in 800.0..1200.0_f64) {
        let fp = FlibeFluidProperties::new("salt");
        check!(fp, p, t;
            rho_from_p_t / rho_from_p_t_derivs,
            e_from_p_t / e_from_p_t_derivs,
            mu_from_p_t / mu_from_p_t_derivs,
            k_from_p_t / k_from_p_t_derivs,
        );
        let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
        check!(fp, v, e;
            p_from_v_e / p_from_v_e_derivs,
            t_from_v_e / t_from_v_e_derivs,
        );
    }

    #[test]
    fn sodium(p in 1e5..1e6_f64, t in 400.0..1500.0_f64) {
        let fp = SodiumLiquidFluidProperties::new("na");
        check!(fp, p, t;
            rho_from_p_t / rho_from_p_t_derivs,
            h_from_p_t / h_from_p_t_derivs,
            cp_from_p_t / cp_from_p_t_derivs,
            mu_from_p_t / mu_from_p_t_derivs,
            k_from_p_t / k_from_p_t_derivs,
        );
    }
}
