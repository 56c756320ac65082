//! Molten 2LiF-BeF2 salt.
//!
//! Density is linear in both temperature and pressure:
//! `rho = 2413.03 - 0.4884 T + 1.7324e-7 (p - p_atm)`. Enthalpy is `cp T` with a
//! constant `cp`, so the (v, e) conversion is a 2x2 linear solve. The
//! isochoric heat capacity is taken equal to `cp`.

use fp_core::units::constants::P_ATM;
use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::FluidResult;
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;

const RHO_0: Real = 2413.03;
const DRHO_DT: Real = -0.4884;
const DRHO_DP: Real = 1.7324e-7;
const CP: Real = 2416.0;

#[derive(Debug)]
pub struct FlibeFluidProperties {
    base: FluidPropertiesBase,
    molar_mass: Real,
}

impl FlibeFluidProperties {
    pub const TYPE_NAME: &'static str = "FlibeFluidProperties";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: FluidPropertiesBase::new(name, FluidPropertiesParams::default()),
            molar_mass: 3.289e-2,
        }
    }

    pub fn from_params(name: &str, bag: &ParamBag) -> FluidResult<Self> {
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        let molar_mass = r.positive_real("molar_mass", 3.289e-2)?;
        r.finish()?;
        Ok(Self {
            base: FluidPropertiesBase::new(name, common),
            molar_mass,
        })
    }

    fn density(p: Real, t: Real) -> Real {
        RHO_0 + DRHO_DT * t + DRHO_DP * (p - P_ATM)
    }

    fn temperature(p: Real, rho: Real) -> Real {
        (rho - RHO_0 - DRHO_DP * (p - P_ATM)) / DRHO_DT
    }

    fn mu(t: Real) -> Real {
        1.16e-4 * (3755.0 / t).exp()
    }

    fn k(t: Real) -> Real {
        0.63 + 5.0e-4 * t
    }

    /// (p, T) from (v, e): `cp T - v p = e` together with the density relation.
    fn solve_v_e(v: Real, e: Real) -> (Real, Real) {
        let rhs = 1.0 / v - RHO_0 + DRHO_DP * P_ATM;
        let p = (CP * rhs - DRHO_DT * e) / (DRHO_DT * v + DRHO_DP * CP);
        (p, (e + v * p) / CP)
    }
}

impl SinglePhaseFluid for FlibeFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "flibe"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(self.molar_mass)
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(Self::solve_v_e(v, e).0)
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let (p, _) = Self::solve_v_e(v, e);
        let den = DRHO_DT * v + DRHO_DP * CP;
        Ok(WithPartials::new(
            p,
            (-CP / (v * v) - p * DRHO_DT) / den,
            -DRHO_DT / den,
        ))
    }

    fn t_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(Self::solve_v_e(v, e).1)
    }

    fn t_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_v_e_derivs(v, e)?;
        Ok(WithPartials::new(
            (e + v * p.value) / CP,
            (p.value + v * p.d1) / CP,
            (1.0 + v * p.d2) / CP,
        ))
    }

    fn p_t_from_v_e(&self, v: Real, e: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        Ok(Self::solve_v_e(v, e))
    }

    /// `sqrt(dp/drho)` at constant temperature.
    fn c_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok((1.0 / DRHO_DP).sqrt())
    }

    fn c_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.c_from_v_e(v, e)?))
    }

    fn c_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok((1.0 / DRHO_DP).sqrt())
    }

    fn c_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.c_from_p_t(p, t)?))
    }

    fn cp_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(CP)
    }

    fn cp_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(CP))
    }

    fn cv_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(CP)
    }

    fn cv_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(CP))
    }

    fn mu_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(Self::mu(self.t_from_v_e(v, e)?))
    }

    fn mu_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_v_e_derivs(v, e)?;
        let mu = Self::mu(t.value);
        Ok(t.chain(mu, -mu * 3755.0 / (t.value * t.value)))
    }

    fn mu_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::mu(t))
    }

    fn mu_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let mu = Self::mu(t);
        Ok(WithPartials::new(mu, 0.0, -mu * 3755.0 / (t * t)))
    }

    fn mu_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::mu(t))
    }

    fn mu_from_rho_t_derivs(&self, _rho: Real, t: Real) -> FluidResult<WithPartials> {
        let mu = Self::mu(t);
        Ok(WithPartials::new(mu, 0.0, -mu * 3755.0 / (t * t)))
    }

    fn k_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(Self::k(self.t_from_v_e(v, e)?))
    }

    fn k_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_v_e_derivs(v, e)?;
        Ok(t.chain(Self::k(t.value), 5.0e-4))
    }

    fn k_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::k(t))
    }

    fn k_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(Self::k(t), 0.0, 5.0e-4))
    }

    fn k_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::k(t))
    }

    fn k_from_rho_t_derivs(&self, _rho: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(Self::k(t), 0.0, 5.0e-4))
    }

    fn rho_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::density(p, t))
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(Self::density(p, t), DRHO_DP, DRHO_DT))
    }

    fn t_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(Self::temperature(p, rho))
    }

    fn t_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            Self::temperature(p, rho),
            -DRHO_DP / DRHO_DT,
            1.0 / DRHO_DT,
        ))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(CP * Self::temperature(p, rho) - p / rho)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.e_from_p_rho(p, rho)?,
            -CP * DRHO_DP / DRHO_DT - 1.0 / rho,
            CP / DRHO_DT + p / (rho * rho),
        ))
    }

    fn e_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(CP * t - p / Self::density(p, t))
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = Self::density(p, t);
        let r2 = rho * rho;
        Ok(WithPartials::new(
            CP * t - p / rho,
            -1.0 / rho + p * DRHO_DP / r2,
            CP + p * DRHO_DT / r2,
        ))
    }

    fn h_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(CP * t)
    }

    fn h_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_p_t(p, t)?, 0.0, CP))
    }

    fn t_from_p_h(&self, _p: Real, h: Real) -> FluidResult<Real> {
        Ok(h / CP)
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_p_h(p, h)?, 0.0, 1.0 / CP))
    }

    /// `T = h / cp`, p from the density relation, then `e = h - p v`.
    fn e_from_v_h(&self, v: Real, h: Real) -> FluidResult<Real> {
        Ok(self.e_from_v_h_derivs(v, h)?.value)
    }

    fn e_from_v_h_derivs(&self, v: Real, h: Real) -> FluidResult<WithPartials> {
        let t = h / CP;
        let p = (1.0 / v - RHO_0 - DRHO_DT * t) / DRHO_DP + P_ATM;
        let dp_dv = -1.0 / (v * v * DRHO_DP);
        let dp_dh = -DRHO_DT / (CP * DRHO_DP);
        Ok(WithPartials::new(
            h - p * v,
            -(dp_dv * v + p),
            1.0 - dp_dh * v,
        ))
    }
}
