//! Liquid sodium, after Fink & Leibowitz.
//!
//! Every correlation depends on temperature only. Pressure enters through
//! `e = h(T) - p / rho(T)` alone, so (v, e) fixes T through the density and p
//! through the energy. Temperatures outside the liquid range are rejected.

use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::{FluidError, FluidResult};
use crate::inversion;
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;

const T_MELT: Real = 370.98;
const T_CRIT: Real = 2503.7;
const RHO_CRIT: Real = 219.0;
const MOLAR_MASS: Real = 22.989769e-3;

fn density(t: Real) -> Real {
    let x = 1.0 - t / T_CRIT;
    RHO_CRIT + 275.32 * x + 511.58 * x.sqrt()
}

fn ddensity_dt(t: Real) -> Real {
    let x = 1.0 - t / T_CRIT;
    -(275.32 + 255.79 / x.sqrt()) / T_CRIT
}

/// J/kg, relative to the solid at 298.15 K.
fn enthalpy(t: Real) -> Real {
    1e3 * (-365.77 + 1.6582 * t - 4.2395e-4 * t * t + 1.4847e-7 * t * t * t + 2992.6 / t)
}

fn heat_capacity(t: Real) -> Real {
    1e3 * (1.6582 - 8.4790e-4 * t + 4.4541e-7 * t * t - 2992.6 / (t * t))
}

fn dheat_capacity_dt(t: Real) -> Real {
    1e3 * (-8.4790e-4 + 8.9082e-7 * t + 5985.2 / (t * t * t))
}

fn viscosity(t: Real) -> Real {
    (-6.4406 - 0.3958 * t.ln() + 556.835 / t).exp()
}

fn dviscosity_dt(t: Real) -> Real {
    viscosity(t) * (-0.3958 / t - 556.835 / (t * t))
}

fn conductivity(t: Real) -> Real {
    124.67 - 0.11381 * t + 5.5226e-5 * t * t - 1.1842e-8 * t * t * t
}

fn dconductivity_dt(t: Real) -> Real {
    -0.11381 + 1.10452e-4 * t - 3.5526e-8 * t * t
}

#[derive(Debug)]
pub struct SodiumLiquidFluidProperties {
    base: FluidPropertiesBase,
}

impl SodiumLiquidFluidProperties {
    pub const TYPE_NAME: &'static str = "SodiumLiquidFluidProperties";

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

    fn check(t: Real) -> FluidResult<Real> {
        if (T_MELT..T_CRIT).contains(&t) {
            Ok(t)
        } else {
            Err(FluidError::OutOfBounds {
                what: "temperature",
                value: t,
                min: T_MELT,
                max: T_CRIT,
            })
        }
    }

    /// Temperature at which the liquid has density `rho`.
    fn temperature(&self, rho: Real) -> FluidResult<Real> {
        let sol = inversion::solve_scalar(
            &self.base,
            "t_from_p_rho",
            || format!("rho = {rho} to T"),
            rho,
            800.0,
            |t| Ok((density(t), ddensity_dt(t))),
        )?;
        Self::check(sol.x)
    }

    /// T and its partials with respect to (v, e).
    fn temperature_v_e(&self, v: Real) -> FluidResult<WithPartials> {
        let t = self.temperature(1.0 / v)?;
        Ok(WithPartials::new(t, -1.0 / (v * v * ddensity_dt(t)), 0.0))
    }
}

impl SinglePhaseFluid for SodiumLiquidFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "sodium"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(MOLAR_MASS)
    }

    fn critical_temperature(&self) -> FluidResult<Real> {
        Ok(T_CRIT)
    }

    fn critical_density(&self) -> FluidResult<Real> {
        Ok(RHO_CRIT)
    }

    fn rho_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(density(Self::check(t)?))
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.rho_from_p_t(p, t)?, 0.0, ddensity_dt(t)))
    }

    fn t_from_p_rho(&self, _p: Real, rho: Real) -> FluidResult<Real> {
        self.temperature(rho)
    }

    fn t_from_p_rho_derivs(&self, _p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.temperature(rho)?;
        Ok(WithPartials::new(t, 0.0, 1.0 / ddensity_dt(t)))
    }

    fn h_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(enthalpy(Self::check(t)?))
    }

    fn h_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.h_from_p_t(p, t)?, 0.0, heat_capacity(t)))
    }

    /// Newton on h(T) from inside the liquid range.
    fn t_from_p_h(&self, _p: Real, h: Real) -> FluidResult<Real> {
        let sol = inversion::solve_scalar(
            &self.base,
            "t_from_p_h",
            || format!("h = {h} to T"),
            h,
            800.0,
            |t| Ok((enthalpy(t), heat_capacity(t))),
        )?;
        Self::check(sol.x)
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_h(p, h)?;
        Ok(WithPartials::new(t, 0.0, 1.0 / heat_capacity(t)))
    }

    fn e_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(enthalpy(Self::check(t)?) - p / density(t))
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let e = self.e_from_p_t(p, t)?;
        let rho = density(t);
        Ok(WithPartials::new(
            e,
            -1.0 / rho,
            heat_capacity(t) + p * ddensity_dt(t) / (rho * rho),
        ))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(enthalpy(self.temperature(rho)?) - p / rho)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.temperature(rho)?;
        Ok(WithPartials::new(
            enthalpy(t) - p / rho,
            -1.0 / rho,
            heat_capacity(t) / ddensity_dt(t) + p / (rho * rho),
        ))
    }

    fn t_from_v_e(&self, v: Real, _e: Real) -> FluidResult<Real> {
        self.temperature(1.0 / v)
    }

    fn t_from_v_e_derivs(&self, v: Real, _e: Real) -> FluidResult<WithPartials> {
        self.temperature_v_e(v)
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok((enthalpy(self.temperature(1.0 / v)?) - e) / v)
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.temperature_v_e(v)?;
        let h = enthalpy(t.value);
        Ok(WithPartials::new(
            (h - e) / v,
            heat_capacity(t.value) * t.d1 / v - (h - e) / (v * v),
            -1.0 / v,
        ))
    }

    fn p_t_from_v_e(&self, v: Real, e: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        let t = self.temperature(1.0 / v)?;
        Ok(((enthalpy(t) - e) / v, t))
    }

    fn cp_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(heat_capacity(Self::check(t)?))
    }

    fn cp_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.cp_from_p_t(p, t)?, 0.0, dheat_capacity_dt(t)))
    }

    fn cp_from_v_e(&self, v: Real, _e: Real) -> FluidResult<Real> {
        Ok(heat_capacity(self.temperature(1.0 / v)?))
    }

    fn cp_from_v_e_derivs(&self, v: Real, _e: Real) -> FluidResult<WithPartials> {
        let t = self.temperature_v_e(v)?;
        Ok(t.chain(heat_capacity(t.value), dheat_capacity_dt(t.value)))
    }

    fn cv_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        self.cp_from_p_t(p, t)
    }

    fn cv_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        self.cp_from_p_t_derivs(p, t)
    }

    fn cv_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        self.cp_from_v_e(v, e)
    }

    fn cv_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        self.cp_from_v_e_derivs(v, e)
    }

    fn mu_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(viscosity(Self::check(t)?))
    }

    fn mu_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.mu_from_p_t(p, t)?, 0.0, dviscosity_dt(t)))
    }

    fn mu_from_v_e(&self, v: Real, _e: Real) -> FluidResult<Real> {
        Ok(viscosity(self.temperature(1.0 / v)?))
    }

    fn mu_from_v_e_derivs(&self, v: Real, _e: Real) -> FluidResult<WithPartials> {
        let t = self.temperature_v_e(v)?;
        Ok(t.chain(viscosity(t.value), dviscosity_dt(t.value)))
    }

    fn mu_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(viscosity(Self::check(t)?))
    }

    fn mu_from_rho_t_derivs(&self, rho: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.mu_from_rho_t(rho, t)?, 0.0, dviscosity_dt(t)))
    }

    fn k_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(conductivity(Self::check(t)?))
    }

    fn k_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.k_from_p_t(p, t)?, 0.0, dconductivity_dt(t)))
    }

    fn k_from_v_e(&self, v: Real, _e: Real) -> FluidResult<Real> {
        Ok(conductivity(self.temperature(1.0 / v)?))
    }

    fn k_from_v_e_derivs(&self, v: Real, _e: Real) -> FluidResult<WithPartials> {
        let t = self.temperature_v_e(v)?;
        Ok(t.chain(conductivity(t.value), dconductivity_dt(t.value)))
    }

    fn k_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(conductivity(Self::check(t)?))
    }

    fn k_from_rho_t_derivs(&self, rho: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.k_from_rho_t(rho, t)?, 0.0, dconductivity_dt(t)))
    }
}
