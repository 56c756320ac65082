//! Calorically perfect ideal gas.
//!
//! `p = (gamma - 1) rho e`, `e = cv T`, `h = cp T`. Entropy is referenced so that
//! `s = cp ln(T) - R ln(p)`. Transport properties are constants.

use fp_core::units::constants::R_UNIVERSAL;
use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::FluidResult;
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;

#[derive(Debug)]
pub struct IdealGasFluidProperties {
    base: FluidPropertiesBase,
    gamma: Real,
    molar_mass: Real,
    mu: Real,
    k: Real,
    /// Specific gas constant R / M
    r_specific: Real,
    cv: Real,
    cp: Real,
}

impl IdealGasFluidProperties {
    pub const TYPE_NAME: &'static str = "IdealGasFluidProperties";

    /// Air with the default transport properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(
            FluidPropertiesBase::new(name, FluidPropertiesParams::default()),
            1.4,
            29.0e-3,
            18.23e-6,
            25.68e-3,
        )
    }

    pub fn from_params(name: &str, bag: &ParamBag) -> FluidResult<Self> {
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        let gamma = r.real_checked("gamma", 1.4, |g| g > 1.0, "greater than 1")?;
        let molar_mass = r.positive_real("molar_mass", 29.0e-3)?;
        let mu = r.positive_real("mu", 18.23e-6)?;
        let k = r.positive_real("k", 25.68e-3)?;
        r.finish()?;
        Ok(Self::build(
            FluidPropertiesBase::new(name, common),
            gamma,
            molar_mass,
            mu,
            k,
        ))
    }

    fn build(base: FluidPropertiesBase, gamma: Real, molar_mass: Real, mu: Real, k: Real) -> Self {
        let r_specific = R_UNIVERSAL / molar_mass;
        let cv = r_specific / (gamma - 1.0);
        Self {
            base,
            gamma,
            molar_mass,
            mu,
            k,
            r_specific,
            cv,
            cp: gamma * cv,
        }
    }

    pub fn gamma(&self) -> Real {
        self.gamma
    }

    pub fn specific_gas_constant(&self) -> Real {
        self.r_specific
    }

    fn entropy(&self, p: Real, t: Real) -> Real {
        self.cp * t.ln() - self.r_specific * p.ln()
    }
}

impl SinglePhaseFluid for IdealGasFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "ideal_gas"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(self.molar_mass)
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok((self.gamma - 1.0) * e / v)
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_v_e(v, e)?;
        Ok(WithPartials::new(p, -p / v, (self.gamma - 1.0) / v))
    }

    fn t_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(e / self.cv)
    }

    fn t_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_v_e(v, e)?, 0.0, 1.0 / self.cv))
    }

    fn c_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok((self.gamma * (self.gamma - 1.0) * e).sqrt())
    }

    fn c_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let c = self.c_from_v_e(v, e)?;
        Ok(WithPartials::new(c, 0.0, 0.5 * c / e))
    }

    fn c_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok((self.gamma * self.r_specific * t).sqrt())
    }

    fn c_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let c = self.c_from_p_t(p, t)?;
        Ok(WithPartials::new(c, 0.0, 0.5 * c / t))
    }

    fn cp_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.cp)
    }

    fn cp_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cp))
    }

    fn cv_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.cv)
    }

    fn cv_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cv))
    }

    fn cv_from_t_v(&self, _t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.cv)
    }

    fn cv_from_t_v_derivs(&self, _t: Real, _v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cv))
    }

    fn mu_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.mu)
    }

    fn mu_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.mu))
    }

    fn mu_from_rho_t(&self, _rho: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.mu)
    }

    fn mu_from_rho_t_derivs(&self, _rho: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.mu))
    }

    fn k_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.k)
    }

    fn k_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.k))
    }

    fn k_from_rho_t(&self, _rho: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.k)
    }

    fn k_from_rho_t_derivs(&self, _rho: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.k))
    }

    fn s_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.entropy(self.p_from_v_e(v, e)?, self.t_from_v_e(v, e)?))
    }

    fn s_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.s_from_v_e(v, e)?,
            self.r_specific / v,
            self.cv / e,
        ))
    }

    fn s_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.entropy(p, t))
    }

    fn s_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.entropy(p, t),
            -self.r_specific / p,
            self.cp / t,
        ))
    }

    fn s_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        Ok(self.entropy(p, h / self.cp))
    }

    fn s_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.s_from_h_p(h, p)?,
            1.0 / (h / self.cp),
            -self.r_specific / p,
        ))
    }

    fn s_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        Ok(self.entropy(self.r_specific * t / v, t))
    }

    fn s_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.s_from_t_v(t, v)?,
            self.cv / t,
            self.r_specific / v,
        ))
    }

    fn rho_from_p_s(&self, p: Real, s: Real) -> FluidResult<Real> {
        let t = ((s + self.r_specific * p.ln()) / self.cp).exp();
        Ok(p / (self.r_specific * t))
    }

    fn rho_from_p_s_derivs(&self, p: Real, s: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_s(p, s)?;
        Ok(WithPartials::new(
            rho,
            rho / (self.gamma * p),
            -rho / self.cp,
        ))
    }

    /// `h = gamma e` for a calorically perfect gas.
    fn e_from_v_h(&self, _v: Real, h: Real) -> FluidResult<Real> {
        Ok(h / self.gamma)
    }

    fn e_from_v_h_derivs(&self, v: Real, h: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_v_h(v, h)?, 0.0, 1.0 / self.gamma))
    }

    fn rho_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(p / (self.r_specific * t))
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t(p, t)?;
        Ok(WithPartials::new(rho, rho / p, -rho / t))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(p / ((self.gamma - 1.0) * rho))
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let e = self.e_from_p_rho(p, rho)?;
        Ok(WithPartials::new(
            e,
            1.0 / ((self.gamma - 1.0) * rho),
            -e / rho,
        ))
    }

    fn t_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(p / (self.r_specific * rho))
    }

    fn t_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho(p, rho)?;
        Ok(WithPartials::new(t, 1.0 / (self.r_specific * rho), -t / rho))
    }

    fn e_from_t_v(&self, t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.cv * t)
    }

    fn e_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_t_v(t, v)?, self.cv, 0.0))
    }

    fn p_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        Ok(self.r_specific * t / v)
    }

    fn p_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_t_v(t, v)?;
        Ok(WithPartials::new(p, self.r_specific / v, -p / v))
    }

    fn h_from_t_v(&self, t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.cp * t)
    }

    fn h_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_t_v(t, v)?, self.cp, 0.0))
    }

    fn h_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.cp * t)
    }

    fn h_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_p_t(p, t)?, 0.0, self.cp))
    }

    fn e_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.cv * t)
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_p_t(p, t)?, 0.0, self.cv))
    }

    /// `g = h - T s`
    fn g_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let t = self.t_from_v_e(v, e)?;
        Ok(self.gamma * e - t * self.s_from_v_e(v, e)?)
    }

    fn g_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_v_e(v, e)?;
        let s = self.s_from_v_e_derivs(v, e)?;
        Ok(WithPartials::new(
            self.gamma * e - t * s.value,
            -t * s.d1,
            self.gamma - s.value / self.cv - t * s.d2,
        ))
    }

    fn p_from_h_s(&self, h: Real, s: Real) -> FluidResult<Real> {
        let t = h / self.cp;
        Ok(((self.cp * t.ln() - s) / self.r_specific).exp())
    }

    fn p_from_h_s_derivs(&self, h: Real, s: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_h_s(h, s)?;
        let t = h / self.cp;
        Ok(WithPartials::new(
            p,
            p / (self.r_specific * t),
            -p / self.r_specific,
        ))
    }

    fn t_from_p_h(&self, _p: Real, h: Real) -> FluidResult<Real> {
        Ok(h / self.cp)
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_p_h(p, h)?, 0.0, 1.0 / self.cp))
    }

    fn t_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        self.t_from_p_h(p, h)
    }

    fn t_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_p_h(p, h)?, 1.0 / self.cp, 0.0))
    }

    fn p_t_from_v_e(&self, v: Real, e: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        Ok((self.p_from_v_e(v, e)?, self.t_from_v_e(v, e)?))
    }

    fn p_t_from_v_h(&self, v: Real, h: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        let t = h / self.cp;
        Ok((self.r_specific * t / v, t))
    }

    fn p_t_from_h_s(&self, h: Real, s: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        Ok((self.p_from_h_s(h, s)?, h / self.cp))
    }
}
