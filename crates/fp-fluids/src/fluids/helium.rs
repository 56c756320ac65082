//! Helium gas correlations for high temperature gas-cooled reactor conditions.
//!
//! Density follows the Petersen real-gas correction of the ideal gas law with
//! pressure in bar: `rho = 48.14 pb / (T + 0.4446 pb / T^0.2)`. The heat
//! capacities are constant, viscosity is a power law in T and conductivity a
//! power law whose exponent depends on pressure.

use fp_core::units::constants::R_UNIVERSAL;
use fp_core::{DualNumber, Real, WithPartials};

use crate::ad::xy_derivatives;
use crate::base::FluidPropertiesBase;
use crate::error::FluidResult;
use crate::inversion;
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;

const CV: Real = 3117.0;
const CP: Real = 5195.0;
const MOLAR_MASS: Real = 4.002602e-3;
const PA_PER_BAR: Real = 1e5;

type D2 = DualNumber<2>;

/// Density [kg/m^3]; pressure in bar.
fn density(pb: D2, t: D2) -> D2 {
    pb * 48.14 / (t + pb * 0.4446 / t.powf(0.2))
}

/// Thermal conductivity [W/(m K)]; pressure in bar.
fn conductivity(pb: D2, t: D2) -> D2 {
    let exponent = (pb * -2.0e-4 + 1.0) * 0.71;
    (pb * 1.123e-3 + 1.0) * 2.682e-3 * (t.ln() * exponent).exp()
}

/// Pressure [Pa] that gives specific volume `v` at temperature `t`.
fn pressure(v: D2, t: D2) -> D2 {
    t * PA_PER_BAR / (v * 48.14 - t.powf(-0.2) * 0.4446)
}

#[derive(Debug)]
pub struct HeliumFluidProperties {
    base: FluidPropertiesBase,
}

impl HeliumFluidProperties {
    pub const TYPE_NAME: &'static str = "HeliumFluidProperties";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: FluidPropertiesBase::new(name, FluidPropertiesParams::default()),
        }
    }

    pub fn from_params(name: &str, bag: &ParamBag) -> FluidResult<Self> {
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        r.finish()?;
        Ok(Self {
            base: FluidPropertiesBase::new(name, common),
        })
    }

    fn mu(t: Real) -> Real {
        3.674e-7 * t.powf(0.7)
    }
}

impl SinglePhaseFluid for HeliumFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "helium"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(MOLAR_MASS)
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.p_from_v_e_derivs(v, e)?.value)
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(xy_derivatives(v, e, |v, e| pressure(v, e / CV)))
    }

    fn t_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(e / CV)
    }

    fn t_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_v_e(v, e)?, 0.0, 1.0 / CV))
    }

    /// Ideal-gas sound speed `sqrt(gamma R T / M)`.
    fn c_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok((CP / CV * R_UNIVERSAL * (e / CV) / MOLAR_MASS).sqrt())
    }

    fn c_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let c = self.c_from_v_e(v, e)?;
        Ok(WithPartials::new(c, 0.0, 0.5 * c / e))
    }

    fn cp_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(CP)
    }

    fn cp_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(CP))
    }

    fn cv_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(CV)
    }

    fn cv_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(CV))
    }

    fn mu_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(Self::mu(e / CV))
    }

    fn mu_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_v_e_derivs(v, e)?;
        let mu = Self::mu(t.value);
        Ok(t.chain(mu, 0.7 * mu / t.value))
    }

    fn mu_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::mu(t))
    }

    fn mu_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let mu = Self::mu(t);
        Ok(WithPartials::new(mu, 0.0, 0.7 * mu / t))
    }

    fn mu_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(Self::mu(t))
    }

    fn mu_from_rho_t_derivs(&self, _rho: Real, t: Real) -> FluidResult<WithPartials> {
        let mu = Self::mu(t);
        Ok(WithPartials::new(mu, 0.0, 0.7 * mu / t))
    }

    fn k_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.k_from_v_e_derivs(v, e)?.value)
    }

    fn k_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(xy_derivatives(v, e, |v, e| {
            let t = e / CV;
            conductivity(pressure(v, t) / PA_PER_BAR, t)
        }))
    }

    fn k_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.k_from_p_t_derivs(p, t)?.value)
    }

    fn k_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(xy_derivatives(p, t, |p, t| conductivity(p / PA_PER_BAR, t)))
    }

    fn k_from_rho_t(&self, rho: Real, t: Real) -> FluidResult<Real> {
        Ok(self.k_from_rho_t_derivs(rho, t)?.value)
    }

    /// Pressure recovered from the density correlation, then `k(p, T)`.
    fn k_from_rho_t_derivs(&self, rho: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(xy_derivatives(rho, t, |rho, t| {
            let pb = rho * t / (rho * t.powf(-0.2) * -0.4446 + 48.14);
            conductivity(pb, t)
        }))
    }

    fn rho_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.rho_from_p_t_derivs(p, t)?.value)
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(xy_derivatives(p, t, |p, t| density(p / PA_PER_BAR, t)))
    }

    fn t_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        let t0 = p * MOLAR_MASS / (R_UNIVERSAL * rho);
        let sol = inversion::solve_scalar(
            &self.base,
            "t_from_p_rho",
            || format!("(p, rho) = ({p}, {rho}) to T"),
            rho,
            t0,
            |t| self.rho_from_p_t_derivs(p, t).map(|w| (w.value, w.d2)),
        )?;
        Ok(sol.x)
    }

    fn t_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho(p, rho)?;
        let r = self.rho_from_p_t_derivs(p, t)?;
        Ok(WithPartials::new(t, -r.d1 / r.d2, 1.0 / r.d2))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(CV * self.t_from_p_rho(p, rho)?)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho_derivs(p, rho)?;
        Ok(t.chain(CV * t.value, CV))
    }

    fn e_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(CV * t)
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_p_t(p, t)?, 0.0, CV))
    }

    fn h_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(CP * t)
    }

    fn h_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_p_t(p, t)?, 0.0, CP))
    }

    fn h_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(CP * e / CV)
    }

    fn h_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_v_e(v, e)?, 0.0, CP / CV))
    }

    fn e_from_v_h(&self, _v: Real, h: Real) -> FluidResult<Real> {
        Ok(CV * h / CP)
    }

    fn e_from_v_h_derivs(&self, v: Real, h: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_v_h(v, h)?, 0.0, CV / CP))
    }

    fn t_from_p_h(&self, _p: Real, h: Real) -> FluidResult<Real> {
        Ok(h / CP)
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_p_h(p, h)?, 0.0, 1.0 / CP))
    }
}
