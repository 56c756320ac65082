//! Fluid with constant bulk modulus, thermal expansion and heat capacities.
//!
//! Density follows `rho = density0 exp(p / K - alpha T)`, internal energy is
//! `cv T` and enthalpy is `e + porepressure_coefficient p / rho`. Viscosity,
//! thermal conductivity and entropy are constants.

use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::FluidResult;
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;

#[derive(Debug)]
pub struct SimpleFluidProperties {
    base: FluidPropertiesBase,
    molar_mass: Real,
    thermal_expansion: Real,
    cv: Real,
    cp: Real,
    bulk_modulus: Real,
    thermal_conductivity: Real,
    specific_entropy: Real,
    viscosity: Real,
    density0: Real,
    pp_coeff: Real,
}

impl SimpleFluidProperties {
    pub const TYPE_NAME: &'static str = "SimpleFluidProperties";

    /// Water-like defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: FluidPropertiesBase::new(name, FluidPropertiesParams::default()),
            molar_mass: 1.8e-2,
            thermal_expansion: 2.14e-4,
            cv: 4186.0,
            cp: 4194.0,
            bulk_modulus: 2.0e9,
            thermal_conductivity: 0.6,
            specific_entropy: 300.0,
            viscosity: 1.0e-3,
            density0: 1000.0,
            pp_coeff: 1.0,
        }
    }

    pub fn from_params(name: &str, bag: &ParamBag) -> FluidResult<Self> {
        let d = Self::new(name);
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        let fluid = Self {
            molar_mass: r.positive_real("molar_mass", d.molar_mass)?,
            thermal_expansion: r.real_checked(
                "thermal_expansion",
                d.thermal_expansion,
                |v| v != 0.0,
                "non-zero",
            )?,
            cv: r.positive_real("cv", d.cv)?,
            cp: r.positive_real("cp", d.cp)?,
            bulk_modulus: r.positive_real("bulk_modulus", d.bulk_modulus)?,
            thermal_conductivity: r
                .positive_real("thermal_conductivity", d.thermal_conductivity)?,
            specific_entropy: r.real("specific_entropy", d.specific_entropy)?,
            viscosity: r.positive_real("viscosity", d.viscosity)?,
            density0: r.positive_real("density0", d.density0)?,
            pp_coeff: r.real("porepressure_coefficient", d.pp_coeff)?,
            base: FluidPropertiesBase::new(name, common),
        };
        r.finish()?;
        Ok(fluid)
    }

    /// `K (ln(1 / (v rho0)) + alpha T)`
    fn p_from_v_t(&self, v: Real, t: Real) -> Real {
        self.bulk_modulus * ((1.0 / (v * self.density0)).ln() + self.thermal_expansion * t)
    }
}

impl SinglePhaseFluid for SimpleFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "simple_fluid"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(self.molar_mass)
    }

    fn beta_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.thermal_expansion)
    }

    fn beta_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.thermal_expansion))
    }

    fn cp_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.cp)
    }

    fn cp_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cp))
    }

    fn cp_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.cp)
    }

    fn cp_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cp))
    }

    fn cv_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.cv)
    }

    fn cv_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.cv))
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

    fn c_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok((self.bulk_modulus / self.rho_from_p_t(p, t)?).sqrt())
    }

    fn c_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let c = (self.bulk_modulus / rho.value).sqrt();
        Ok(rho.chain(c, -0.5 * c / rho.value))
    }

    /// `sqrt(K v)`: the density at (v, e) is exactly `1 / v`.
    fn c_from_v_e(&self, v: Real, _e: Real) -> FluidResult<Real> {
        Ok((self.bulk_modulus * v).sqrt())
    }

    fn c_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let c = self.c_from_v_e(v, e)?;
        Ok(WithPartials::new(c, 0.5 * self.bulk_modulus / c, 0.0))
    }

    fn k_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.thermal_conductivity)
    }

    fn k_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.thermal_conductivity))
    }

    fn k_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.thermal_conductivity)
    }

    fn k_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.thermal_conductivity))
    }

    fn k_from_rho_t(&self, _rho: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.thermal_conductivity)
    }

    fn k_from_rho_t_derivs(&self, _rho: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.thermal_conductivity))
    }

    fn s_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.specific_entropy)
    }

    fn s_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.specific_entropy))
    }

    fn s_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.specific_entropy)
    }

    fn s_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.specific_entropy))
    }

    fn s_from_h_p(&self, _h: Real, _p: Real) -> FluidResult<Real> {
        Ok(self.specific_entropy)
    }

    fn s_from_h_p_derivs(&self, _h: Real, _p: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.specific_entropy))
    }

    fn s_from_t_v(&self, _t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.specific_entropy)
    }

    fn s_from_t_v_derivs(&self, _t: Real, _v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.specific_entropy))
    }

    fn rho_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.density0 * (p / self.bulk_modulus - self.thermal_expansion * t).exp())
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t(p, t)?;
        Ok(WithPartials::new(
            rho,
            rho / self.bulk_modulus,
            -self.thermal_expansion * rho,
        ))
    }

    fn t_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(((rho / self.density0).ln() - p / self.bulk_modulus) / -self.thermal_expansion)
    }

    fn t_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho(p, rho)?;
        let alpha = self.thermal_expansion;
        Ok(WithPartials::new(
            t,
            1.0 / (alpha * self.bulk_modulus),
            -1.0 / (alpha * rho),
        ))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        Ok(self.cv * self.t_from_p_rho(p, rho)?)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho_derivs(p, rho)?;
        Ok(t.chain(self.cv * t.value, self.cv))
    }

    fn e_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.cv * t)
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_p_t(p, t)?, 0.0, self.cv))
    }

    fn e_from_t_v(&self, t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.cv * t)
    }

    fn e_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.e_from_t_v(t, v)?, self.cv, 0.0))
    }

    fn p_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        Ok(self.p_from_v_t(v, t))
    }

    fn p_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.p_from_v_t(v, t),
            self.bulk_modulus * self.thermal_expansion,
            -self.bulk_modulus / v,
        ))
    }

    fn h_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        Ok(self.cv * t + self.pp_coeff * self.p_from_v_t(v, t) * v)
    }

    fn h_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_t_v_derivs(t, v)?;
        Ok(WithPartials::new(
            self.cv * t + self.pp_coeff * p.value * v,
            self.cv + self.pp_coeff * p.d1 * v,
            self.pp_coeff * (p.d2 * v + p.value),
        ))
    }

    fn h_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.cv * t + self.pp_coeff * p / self.rho_from_p_t(p, t)?)
    }

    fn h_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let r2 = rho.value * rho.value;
        Ok(WithPartials::new(
            self.cv * t + self.pp_coeff * p / rho.value,
            self.pp_coeff / rho.value - self.pp_coeff * p * rho.d1 / r2,
            self.cv - self.pp_coeff * p * rho.d2 / r2,
        ))
    }

    fn h_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(e + self.pp_coeff * self.p_from_v_e(v, e)? * v)
    }

    fn h_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_v_e_derivs(v, e)?;
        Ok(WithPartials::new(
            e + self.pp_coeff * p.value * v,
            self.pp_coeff * (p.value + v * p.d1),
            1.0 + self.pp_coeff * v * p.d2,
        ))
    }

    fn e_from_v_h(&self, v: Real, h: Real) -> FluidResult<Real> {
        Ok(self.e_from_v_h_derivs(v, h)?.value)
    }

    /// `h = cv T + pp K v (L + alpha T)` with `L = ln(1 / (v rho0))`, solved for T.
    fn e_from_v_h_derivs(&self, v: Real, h: Real) -> FluidResult<WithPartials> {
        let (k, a, pp) = (self.bulk_modulus, self.thermal_expansion, self.pp_coeff);
        let l = (1.0 / (v * self.density0)).ln();
        let num = h - pp * v * k * l;
        let den = self.cv + pp * v * k * a;
        let t = num / den;
        let dnum_dv = pp * k * (1.0 - l);
        let dden_dv = pp * k * a;
        let dt_dv = (dnum_dv * den - num * dden_dv) / (den * den);
        Ok(WithPartials::new(
            self.cv * t,
            self.cv * dt_dv,
            self.cv / den,
        ))
    }

    fn mu_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.viscosity)
    }

    fn mu_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.viscosity))
    }

    fn mu_from_v_e(&self, _v: Real, _e: Real) -> FluidResult<Real> {
        Ok(self.viscosity)
    }

    fn mu_from_v_e_derivs(&self, _v: Real, _e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.viscosity))
    }

    fn mu_from_rho_t(&self, _rho: Real, _t: Real) -> FluidResult<Real> {
        Ok(self.viscosity)
    }

    fn mu_from_rho_t_derivs(&self, _rho: Real, _t: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::constant(self.viscosity))
    }

    fn t_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(e / self.cv)
    }

    fn t_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(self.t_from_v_e(v, e)?, 0.0, 1.0 / self.cv))
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.p_from_v_t(v, e / self.cv))
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(WithPartials::new(
            self.p_from_v_e(v, e)?,
            -self.bulk_modulus / v,
            self.bulk_modulus * self.thermal_expansion / self.cv,
        ))
    }

    /// Closed form: T = e / cv, then p from the density relation.
    fn p_t_from_v_e(&self, v: Real, e: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        Ok((self.p_from_v_e(v, e)?, e / self.cv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FluidError;

    #[test]
    fn water_like_density_and_energy() {
        let fp = SimpleFluidProperties::new("water");
        let rho = fp.rho_from_p_t(1e5, 300.0).unwrap();
        let expected = 1000.0 * (1e5 / 2e9 - 2.14e-4 * 300.0_f64).exp();
        assert!((rho - expected).abs() < 1e-9);
        assert!((rho - 935.9).abs() / 935.9 < 5e-3);
        assert_eq!(fp.e_from_p_t(1e5, 300.0).unwrap(), 1_255_800.0);
    }

    #[test]
    fn v_e_closed_form_inverts_p_t() {
        let fp = SimpleFluidProperties::new("water");
        let (v, e) = fp.v_e_from_p_t(2e6, 350.0).unwrap();
        assert!((fp.p_from_v_e(v, e).unwrap() - 2e6).abs() < 1e-4);
        assert!((fp.t_from_v_e(v, e).unwrap() - 350.0).abs() < 1e-10);
        let t = fp.t_from_p_rho(2e6, 1.0 / v).unwrap();
        assert!((t - 350.0).abs() < 1e-8);
    }

    #[test]
    fn enthalpy_inverts_through_e_from_v_h() {
        let fp = SimpleFluidProperties::new("water");
        let (v, e) = fp.v_e_from_p_t(5e5, 320.0).unwrap();
        let h = fp.h_from_v_e(v, e).unwrap();
        assert!((fp.e_from_v_h(v, h).unwrap() - e).abs() / e < 1e-12);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let bag = ParamBag::new().with("bulk_modulos", 1e9);
        let err = SimpleFluidProperties::from_params("water", &bag).unwrap_err();
        assert!(matches!(err, FluidError::Config { .. }));
    }

    #[test]
    fn parameters_override_defaults() {
        let bag = ParamBag::new()
            .with("density0", 800.0)
            .with("thermal_expansion", 1e-3);
        let fp = SimpleFluidProperties::from_params("oil", &bag).unwrap();
        let expected = 800.0 * (-0.3_f64).exp();
        assert!((fp.rho_from_p_t(0.0, 300.0).unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn zero_thermal_expansion_is_rejected() {
        let bag = ParamBag::new().with("thermal_expansion", 0.0);
        let err = SimpleFluidProperties::from_params("oil", &bag).unwrap_err();
        assert!(matches!(err, FluidError::Config { .. }));
        assert!(err.to_string().contains("'thermal_expansion' = 0 must be non-zero"));
    }

    #[test]
    fn temperature_from_enthalpy_uses_newton_default() {
        let fp = SimpleFluidProperties::new("water");
        let h = fp.h_from_p_t(1e6, 330.0).unwrap();
        let t = fp.t_from_p_h(1e6, h).unwrap();
        assert!((t - 330.0).abs() < 1e-5);
    }
}
