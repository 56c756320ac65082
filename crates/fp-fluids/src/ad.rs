//! Dual-number variants of the facade.
//!
//! Every `_ad` method takes the scalar values out of its dual-number arguments,
//! asks the Real `_derivs` form for the value and both partials, and rebuilds a
//! dual number by the chain rule:
//! `result.derivatives = a.derivatives * d1 + b.derivatives * d2`.
//! AD results therefore follow from the hand-coded Real derivatives and never
//! duplicate them.

use fp_core::{ADReal, DualNumber, Real, WithPartials};
use nalgebra::Vector2;

use crate::error::FluidResult;
use crate::inversion;
use crate::single_phase::SinglePhaseFluid;

/// Combine two dual-number arguments with the local partials of a property.
pub fn ad_from_partials<const N: usize>(
    a: &DualNumber<N>,
    b: &DualNumber<N>,
    w: WithPartials,
) -> DualNumber<N> {
    DualNumber::new(w.value, *a.derivatives() * w.d1 + *b.derivatives() * w.d2)
}

/// Value and both partials of `f(x, y)`, with `f` written over dual numbers.
///
/// Lets a correlation obtain exact derivatives without hand-coding them.
pub fn xy_derivatives<F>(x: Real, y: Real, f: F) -> WithPartials
where
    F: FnOnce(DualNumber<2>, DualNumber<2>) -> DualNumber<2>,
{
    let xd = DualNumber::new(x, Vector2::new(1.0, 0.0));
    let yd = DualNumber::new(y, Vector2::new(0.0, 1.0));
    let z = f(xd, yd);
    WithPartials::new(z.value(), z.derivative(0), z.derivative(1))
}

macro_rules! ad_properties {
    ($($derivs:ident => $ad:ident, $ad_derivs:ident;)*) => {
        $(
            fn $ad(&self, a: &ADReal, b: &ADReal) -> FluidResult<ADReal> {
                let w = self.$derivs(a.value(), b.value())?;
                Ok(ad_from_partials(a, b, w))
            }

            /// Value plus the two partials as dual numbers. The partials carry
            /// no derivatives of their own, so the derivative policy applies.
            fn $ad_derivs(&self, a: &ADReal, b: &ADReal) -> FluidResult<(ADReal, ADReal, ADReal)> {
                let w = self.$derivs(a.value(), b.value())?;
                self.base().check_imperfect_derivative(stringify!($ad_derivs))?;
                Ok((
                    ad_from_partials(a, b, w),
                    ADReal::constant(w.d1),
                    ADReal::constant(w.d2),
                ))
            }
        )*
    };
}

/// Dual-number variants of every [`SinglePhaseFluid`] property.
///
/// Implemented for every fluid (including `dyn SinglePhaseFluid`) by a blanket
/// impl, so the AD path is always consistent with the Real derivatives.
pub trait ADFluidProperties: SinglePhaseFluid {
    ad_properties! {
        p_from_v_e_derivs => p_from_v_e_ad, p_from_v_e_ad_derivs;
        t_from_v_e_derivs => t_from_v_e_ad, t_from_v_e_ad_derivs;
        c_from_v_e_derivs => c_from_v_e_ad, c_from_v_e_ad_derivs;
        cp_from_v_e_derivs => cp_from_v_e_ad, cp_from_v_e_ad_derivs;
        cv_from_v_e_derivs => cv_from_v_e_ad, cv_from_v_e_ad_derivs;
        mu_from_v_e_derivs => mu_from_v_e_ad, mu_from_v_e_ad_derivs;
        k_from_v_e_derivs => k_from_v_e_ad, k_from_v_e_ad_derivs;
        s_from_v_e_derivs => s_from_v_e_ad, s_from_v_e_ad_derivs;
        s_from_h_p_derivs => s_from_h_p_ad, s_from_h_p_ad_derivs;
        rho_from_p_s_derivs => rho_from_p_s_ad, rho_from_p_s_ad_derivs;
        e_from_v_h_derivs => e_from_v_h_ad, e_from_v_h_ad_derivs;
        s_from_p_t_derivs => s_from_p_t_ad, s_from_p_t_ad_derivs;
        pp_sat_from_p_t_derivs => pp_sat_from_p_t_ad, pp_sat_from_p_t_ad_derivs;
        mu_from_rho_t_derivs => mu_from_rho_t_ad, mu_from_rho_t_ad_derivs;
        k_from_rho_t_derivs => k_from_rho_t_ad, k_from_rho_t_ad_derivs;
        c_from_p_t_derivs => c_from_p_t_ad, c_from_p_t_ad_derivs;
        cp_from_p_t_derivs => cp_from_p_t_ad, cp_from_p_t_ad_derivs;
        cv_from_p_t_derivs => cv_from_p_t_ad, cv_from_p_t_ad_derivs;
        mu_from_p_t_derivs => mu_from_p_t_ad, mu_from_p_t_ad_derivs;
        k_from_p_t_derivs => k_from_p_t_ad, k_from_p_t_ad_derivs;
        rho_from_p_t_derivs => rho_from_p_t_ad, rho_from_p_t_ad_derivs;
        e_from_p_rho_derivs => e_from_p_rho_ad, e_from_p_rho_ad_derivs;
        e_from_t_v_derivs => e_from_t_v_ad, e_from_t_v_ad_derivs;
        p_from_t_v_derivs => p_from_t_v_ad, p_from_t_v_ad_derivs;
        h_from_t_v_derivs => h_from_t_v_ad, h_from_t_v_ad_derivs;
        s_from_t_v_derivs => s_from_t_v_ad, s_from_t_v_ad_derivs;
        cv_from_t_v_derivs => cv_from_t_v_ad, cv_from_t_v_ad_derivs;
        h_from_p_t_derivs => h_from_p_t_ad, h_from_p_t_ad_derivs;
        h_from_v_e_derivs => h_from_v_e_ad, h_from_v_e_ad_derivs;
        g_from_v_e_derivs => g_from_v_e_ad, g_from_v_e_ad_derivs;
        p_from_h_s_derivs => p_from_h_s_ad, p_from_h_s_ad_derivs;
        t_from_h_p_derivs => t_from_h_p_ad, t_from_h_p_ad_derivs;
        t_from_p_h_derivs => t_from_p_h_ad, t_from_p_h_ad_derivs;
        beta_from_p_t_derivs => beta_from_p_t_ad, beta_from_p_t_ad_derivs;
        v_from_p_t_derivs => v_from_p_t_ad, v_from_p_t_ad_derivs;
        e_from_p_t_derivs => e_from_p_t_ad, e_from_p_t_ad_derivs;
        gamma_from_v_e_derivs => gamma_from_v_e_ad, gamma_from_v_e_ad_derivs;
        gamma_from_p_t_derivs => gamma_from_p_t_ad, gamma_from_p_t_ad_derivs;
        t_from_p_rho_derivs => t_from_p_rho_ad, t_from_p_rho_ad_derivs;
    }

    fn vapor_pressure_ad(&self, t: &ADReal) -> FluidResult<ADReal> {
        let (psat, dpsat_dt) = self.vapor_pressure_derivs(t.value())?;
        Ok(t.chain(psat, dpsat_dt))
    }

    fn vapor_temperature_ad(&self, p: &ADReal) -> FluidResult<ADReal> {
        let (tsat, dtsat_dp) = self.vapor_temperature_derivs(p.value())?;
        Ok(p.chain(tsat, dtsat_dp))
    }

    fn rho_mu_from_p_t_ad(&self, p: &ADReal, t: &ADReal) -> FluidResult<(ADReal, ADReal)> {
        let (rho, mu) = self.rho_mu_from_p_t_derivs(p.value(), t.value())?;
        Ok((ad_from_partials(p, t, rho), ad_from_partials(p, t, mu)))
    }

    /// (p, T) from (v, e) with derivatives carried through the converged
    /// solution by the implicit function theorem.
    fn p_t_from_v_e_ad(
        &self,
        v: &ADReal,
        e: &ADReal,
        p0: Real,
        t0: Real,
    ) -> FluidResult<(ADReal, ADReal)> {
        let (p, t) = self.p_t_from_v_e(v.value(), e.value(), p0, t0)?;
        let dpt = inversion::sensitivity(
            self.v_from_p_t_derivs(p, t)?,
            self.e_from_p_t_derivs(p, t)?,
        )?;
        Ok((
            ad_from_partials(v, e, WithPartials::new(p, dpt[(0, 0)], dpt[(0, 1)])),
            ad_from_partials(v, e, WithPartials::new(t, dpt[(1, 0)], dpt[(1, 1)])),
        ))
    }
}

impl<F: SinglePhaseFluid + ?Sized> ADFluidProperties for F {}
