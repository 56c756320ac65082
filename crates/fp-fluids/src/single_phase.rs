//! Single-phase fluid property facade.
//!
//! Every property `x_from_a_b` comes as a pair of methods: the value alone, and
//! `x_from_a_b_derivs` returning the value with its partials with respect to `a`
//! and `b`. A fluid overrides the properties it has correlations for. The rest
//! either fall back to a default built from other properties (listed on each
//! method) or fail with [`FluidError::NotImplemented`].
//!
//! When only the value of a property is overridden, the `_derivs` form applies
//! the derivative policy: with `allow_imperfect_jacobians` it warns once and
//! returns zero partials, otherwise it fails with
//! [`FluidError::UnimplementedDerivative`].
//!
//! Dual-number variants of every property live in [`crate::ADFluidProperties`].

use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::{FluidError, FluidResult};
use crate::inversion;

/// Partials of `outer(x(a, b), y(a, b))` with respect to (a, b).
pub(crate) fn compose(outer: WithPartials, x: WithPartials, y: WithPartials) -> WithPartials {
    WithPartials {
        value: outer.value,
        d1: outer.d1 * x.d1 + outer.d2 * y.d1,
        d2: outer.d1 * x.d2 + outer.d2 * y.d2,
    }
}

/// `num / den` with partials.
pub(crate) fn ratio(num: WithPartials, den: WithPartials) -> WithPartials {
    let value = num.value / den.value;
    let inv2 = 1.0 / (den.value * den.value);
    WithPartials {
        value,
        d1: (num.d1 * den.value - den.d1 * num.value) * inv2,
        d2: (num.d2 * den.value - den.d2 * num.value) * inv2,
    }
}

/// A property without a default: not implemented unless overridden.
macro_rules! property {
    ($(#[$meta:meta])* $name:ident, $derivs:ident, $a:ident, $b:ident) => {
        $(#[$meta])*
        fn $name(&self, $a: Real, $b: Real) -> FluidResult<Real> {
            let _ = ($a, $b);
            Err(self.base().not_implemented(stringify!($name)))
        }

        fn $derivs(&self, $a: Real, $b: Real) -> FluidResult<WithPartials> {
            let value = self.$name($a, $b)?;
            self.base().imperfect_derivative(stringify!($derivs), value)
        }
    };
}

/// A (p, T) property that defaults to its (v, e) counterpart.
macro_rules! property_via_v_e {
    ($(#[$meta:meta])* $name:ident, $derivs:ident, $ve:ident, $ve_derivs:ident) => {
        $(#[$meta])*
        fn $name(&self, p: Real, t: Real) -> FluidResult<Real> {
            let (v, e) = self.v_e_from_p_t(p, t)?;
            self.$ve(v, e)
        }

        fn $derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
            let (v, e) = self.v_e_from_p_t_derivs(p, t)?;
            let x = self.$ve_derivs(v.value, e.value)?;
            Ok(compose(x, v, e))
        }
    };
}

/// Single-phase fluid property facade.
///
/// Implementations must be thread-safe (Send + Sync) and immutable after
/// construction; the facade is shared as `Arc<dyn SinglePhaseFluid>`.
/// Units are SI throughout: Pa, K, m^3/kg, J/kg, J/(kg K), kg/m^3, m/s, Pa s, W/(m K).
pub trait SinglePhaseFluid: Send + Sync {
    fn base(&self) -> &FluidPropertiesBase;

    /// Name of the fluid the correlations describe (not the object name).
    fn fluid_name(&self) -> &str;

    /// Initial (p, T) guess for the Newton conversions.
    fn initial_guess(&self) -> (Real, Real) {
        let params = self.base().params();
        (params.p_initial_guess, params.t_initial_guess)
    }

    // --- metadata ---

    /// Molar mass [kg/mol]
    fn molar_mass(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("molar_mass"))
    }

    fn critical_pressure(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("critical_pressure"))
    }

    fn critical_temperature(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("critical_temperature"))
    }

    fn critical_density(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("critical_density"))
    }

    fn critical_internal_energy(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("critical_internal_energy"))
    }

    fn triple_point_pressure(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("triple_point_pressure"))
    }

    fn triple_point_temperature(&self) -> FluidResult<Real> {
        Err(self.base().not_implemented("triple_point_temperature"))
    }

    /// Saturation pressure at temperature `t`.
    fn vapor_pressure(&self, t: Real) -> FluidResult<Real> {
        let _ = t;
        Err(self.base().not_implemented("vapor_pressure"))
    }

    /// `(psat, dpsat/dT)`
    fn vapor_pressure_derivs(&self, t: Real) -> FluidResult<(Real, Real)> {
        let value = self.vapor_pressure(t)?;
        let w = self
            .base()
            .imperfect_derivative("vapor_pressure_derivs", value)?;
        Ok((w.value, w.d1))
    }

    /// Saturation temperature at pressure `p`.
    fn vapor_temperature(&self, p: Real) -> FluidResult<Real> {
        let _ = p;
        Err(self.base().not_implemented("vapor_temperature"))
    }

    /// `(Tsat, dTsat/dp)`
    fn vapor_temperature_derivs(&self, p: Real) -> FluidResult<(Real, Real)> {
        let value = self.vapor_temperature(p)?;
        let w = self
            .base()
            .imperfect_derivative("vapor_temperature_derivs", value)?;
        Ok((w.value, w.d1))
    }

    // --- (v, e) properties ---

    property!(
        /// Pressure from specific volume and specific internal energy
        p_from_v_e, p_from_v_e_derivs, v, e
    );
    property!(
        /// Temperature from specific volume and specific internal energy
        t_from_v_e, t_from_v_e_derivs, v, e
    );
    property!(
        /// Speed of sound
        c_from_v_e, c_from_v_e_derivs, v, e
    );
    property!(
        /// Isobaric specific heat
        cp_from_v_e, cp_from_v_e_derivs, v, e
    );
    property!(
        /// Isochoric specific heat
        cv_from_v_e, cv_from_v_e_derivs, v, e
    );
    property!(
        /// Dynamic viscosity
        mu_from_v_e, mu_from_v_e_derivs, v, e
    );
    property!(
        /// Thermal conductivity
        k_from_v_e, k_from_v_e_derivs, v, e
    );

    /// Specific entropy. Default: convert (v, e) to (p, T), then `s_from_p_t`.
    fn s_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let (p0, t0) = self.initial_guess();
        let (p, t) = self.p_t_from_v_e(v, e, p0, t0)?;
        self.s_from_p_t(p, t)
    }

    fn s_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let (p0, t0) = self.initial_guess();
        let (p, t) = self.p_t_from_v_e(v, e, p0, t0)?;
        let dpt = inversion::sensitivity(
            self.v_from_p_t_derivs(p, t)?,
            self.e_from_p_t_derivs(p, t)?,
        )?;
        Ok(inversion::through(self.s_from_p_t_derivs(p, t)?, &dpt))
    }

    property!(s_from_h_p, s_from_h_p_derivs, h, p);
    property!(rho_from_p_s, rho_from_p_s_derivs, p, s);
    property!(e_from_v_h, e_from_v_h_derivs, v, h);

    property!(
        /// Specific entropy from pressure and temperature. No default, so
        /// defaults that go through (p, T) always terminate here.
        s_from_p_t, s_from_p_t_derivs, p, t
    );
    property!(
        /// Partial pressure at saturation in a gas mixture
        pp_sat_from_p_t, pp_sat_from_p_t_derivs, p, t
    );
    property!(mu_from_rho_t, mu_from_rho_t_derivs, rho, t);
    property!(k_from_rho_t, k_from_rho_t_derivs, rho, t);

    // --- (p, T) properties ---

    property_via_v_e!(
        /// Speed of sound. Default: via `v_e_from_p_t` and `c_from_v_e`.
        c_from_p_t, c_from_p_t_derivs, c_from_v_e, c_from_v_e_derivs
    );
    property_via_v_e!(
        /// Isobaric specific heat. Default: via `v_e_from_p_t` and `cp_from_v_e`.
        cp_from_p_t, cp_from_p_t_derivs, cp_from_v_e, cp_from_v_e_derivs
    );
    property_via_v_e!(
        /// Isochoric specific heat. Default: via `v_e_from_p_t` and `cv_from_v_e`.
        cv_from_p_t, cv_from_p_t_derivs, cv_from_v_e, cv_from_v_e_derivs
    );
    property_via_v_e!(
        /// Dynamic viscosity. Default: via `v_e_from_p_t` and `mu_from_v_e`.
        mu_from_p_t, mu_from_p_t_derivs, mu_from_v_e, mu_from_v_e_derivs
    );
    property_via_v_e!(
        /// Thermal conductivity. Default: via `v_e_from_p_t` and `k_from_v_e`.
        k_from_p_t, k_from_p_t_derivs, k_from_v_e, k_from_v_e_derivs
    );

    property!(
        /// Density from pressure and temperature
        rho_from_p_t, rho_from_p_t_derivs, p, t
    );
    property!(
        /// Specific internal energy from pressure and density
        e_from_p_rho, e_from_p_rho_derivs, p, rho
    );
    property!(e_from_t_v, e_from_t_v_derivs, t, v);
    property!(p_from_t_v, p_from_t_v_derivs, t, v);
    property!(h_from_t_v, h_from_t_v_derivs, t, v);
    property!(s_from_t_v, s_from_t_v_derivs, t, v);
    property!(cv_from_t_v, cv_from_t_v_derivs, t, v);
    property!(
        /// Specific enthalpy from pressure and temperature
        h_from_p_t, h_from_p_t_derivs, p, t
    );

    /// Specific enthalpy. Default: `e + p(v, e) v`.
    fn h_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(e + self.p_from_v_e(v, e)? * v)
    }

    fn h_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_v_e_derivs(v, e)?;
        Ok(WithPartials {
            value: e + p.value * v,
            d1: p.value + v * p.d1,
            d2: 1.0 + v * p.d2,
        })
    }

    property!(
        /// Gibbs free energy
        g_from_v_e, g_from_v_e_derivs, v, e
    );

    /// Pressure from specific enthalpy and entropy. Default: Newton (h, s) -> (p, T).
    fn p_from_h_s(&self, h: Real, s: Real) -> FluidResult<Real> {
        let (p0, t0) = self.initial_guess();
        Ok(self.p_t_from_h_s(h, s, p0, t0)?.0)
    }

    fn p_from_h_s_derivs(&self, h: Real, s: Real) -> FluidResult<WithPartials> {
        let (p0, t0) = self.initial_guess();
        let (p, t) = self.p_t_from_h_s(h, s, p0, t0)?;
        let dpt = inversion::sensitivity(
            self.h_from_p_t_derivs(p, t)?,
            self.s_from_p_t_derivs(p, t)?,
        )?;
        Ok(WithPartials::new(p, dpt[(0, 0)], dpt[(0, 1)]))
    }

    property!(t_from_h_p, t_from_h_p_derivs, h, p);

    /// Temperature from pressure and specific enthalpy. Default: 1D Newton on `h_from_p_t`.
    fn t_from_p_h(&self, p: Real, h: Real) -> FluidResult<Real> {
        let (_, t0) = self.initial_guess();
        let sol = inversion::solve_scalar(
            self.base(),
            "t_from_p_h",
            || format!("(p, h) = ({p}, {h}) to T"),
            h,
            t0,
            |t| self.h_from_p_t_derivs(p, t).map(|w| (w.value, w.d2)),
        )?;
        Ok(sol.x)
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_h(p, h)?;
        let hw = self.h_from_p_t_derivs(p, t)?;
        Ok(WithPartials::new(t, -hw.d1 / hw.d2, 1.0 / hw.d2))
    }

    /// Volumetric thermal expansion coefficient. Default: `-(1/rho) drho/dT`.
    fn beta_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        Ok(-rho.d2 / rho.value)
    }

    fn beta_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let value = self.beta_from_p_t(p, t)?;
        self.base()
            .imperfect_derivative("beta_from_p_t_derivs", value)
    }

    /// Specific volume. Default: `1 / rho_from_p_t`.
    fn v_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(1.0 / self.rho_from_p_t(p, t)?)
    }

    fn v_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        Ok(rho.chain(1.0 / rho.value, -1.0 / (rho.value * rho.value)))
    }

    /// Specific internal energy. Default: `e_from_p_rho(p, rho_from_p_t(p, T))`.
    fn e_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        let rho = self.rho_from_p_t(p, t)?;
        self.e_from_p_rho(p, rho)
    }

    fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let e = self.e_from_p_rho_derivs(p, rho.value)?;
        Ok(WithPartials {
            value: e.value,
            d1: e.d1 + e.d2 * rho.d1,
            d2: e.d2 * rho.d2,
        })
    }

    /// Ratio of specific heats. Default: `cp / cv`.
    fn gamma_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.cp_from_v_e(v, e)? / self.cv_from_v_e(v, e)?)
    }

    fn gamma_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        Ok(ratio(
            self.cp_from_v_e_derivs(v, e)?,
            self.cv_from_v_e_derivs(v, e)?,
        ))
    }

    /// Ratio of specific heats. Default: `cp / cv`.
    fn gamma_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.cp_from_p_t(p, t)? / self.cv_from_p_t(p, t)?)
    }

    fn gamma_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        Ok(ratio(
            self.cp_from_p_t_derivs(p, t)?,
            self.cv_from_p_t_derivs(p, t)?,
        ))
    }

    property!(
        /// Temperature from pressure and density
        t_from_p_rho, t_from_p_rho_derivs, p, rho
    );

    // --- combined queries ---

    /// `(v, e)` at (p, T). Uses `e_from_p_t`, falling back to `e_from_p_rho`
    /// only when the fluid does not provide it; other errors propagate.
    fn v_e_from_p_t(&self, p: Real, t: Real) -> FluidResult<(Real, Real)> {
        let rho = self.rho_from_p_t(p, t)?;
        let e = match self.e_from_p_t(p, t) {
            Err(FluidError::NotImplemented { .. }) => self.e_from_p_rho(p, rho)?,
            e => e?,
        };
        Ok((1.0 / rho, e))
    }

    fn v_e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<(WithPartials, WithPartials)> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let v = rho.chain(1.0 / rho.value, -1.0 / (rho.value * rho.value));
        let e = match self.e_from_p_t_derivs(p, t) {
            Err(FluidError::NotImplemented { .. } | FluidError::UnimplementedDerivative { .. }) => {
                let e = self.e_from_p_rho_derivs(p, rho.value)?;
                WithPartials::new(e.value, e.d1 + e.d2 * rho.d1, e.d2 * rho.d2)
            }
            e => e?,
        };
        Ok((v, e))
    }

    /// Density and viscosity in one call: `rho_from_p_t`, then `mu_from_rho_t`.
    fn rho_mu_from_p_t(&self, p: Real, t: Real) -> FluidResult<(Real, Real)> {
        let rho = self.rho_from_p_t(p, t)?;
        Ok((rho, self.mu_from_rho_t(rho, t)?))
    }

    fn rho_mu_from_p_t_derivs(
        &self,
        p: Real,
        t: Real,
    ) -> FluidResult<(WithPartials, WithPartials)> {
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let mu = self.mu_from_rho_t_derivs(rho.value, t)?;
        Ok((
            rho,
            WithPartials::new(mu.value, mu.d1 * rho.d1, mu.d2 + mu.d1 * rho.d2),
        ))
    }

    /// Density and internal energy with partials in one call.
    fn rho_e_from_p_t_derivs(
        &self,
        p: Real,
        t: Real,
    ) -> FluidResult<(WithPartials, WithPartials)> {
        Ok((
            self.rho_from_p_t_derivs(p, t)?,
            self.e_from_p_t_derivs(p, t)?,
        ))
    }

    // --- conversions ---

    /// (p, T) from (v, e) by 2D Newton on `v_from_p_t` and `e_from_p_t`.
    fn p_t_from_v_e(&self, v: Real, e: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        let sol = inversion::solve_p_t(
            self.base(),
            "p_t_from_v_e",
            "(v, e)",
            (v, e),
            (p0, t0),
            |p, t| self.v_from_p_t_derivs(p, t),
            |p, t| self.e_from_p_t_derivs(p, t),
        )?;
        Ok((sol.x, sol.y))
    }

    /// (p, T) from (v, h) by 2D Newton on `v_from_p_t` and `h_from_p_t`.
    fn p_t_from_v_h(&self, v: Real, h: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        let sol = inversion::solve_p_t(
            self.base(),
            "p_t_from_v_h",
            "(v, h)",
            (v, h),
            (p0, t0),
            |p, t| self.v_from_p_t_derivs(p, t),
            |p, t| self.h_from_p_t_derivs(p, t),
        )?;
        Ok((sol.x, sol.y))
    }

    /// (p, T) from (h, s) by 2D Newton on `h_from_p_t` and `s_from_p_t`.
    fn p_t_from_h_s(&self, h: Real, s: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        let sol = inversion::solve_p_t(
            self.base(),
            "p_t_from_h_s",
            "(h, s)",
            (h, s),
            (p0, t0),
            |p, t| self.h_from_p_t_derivs(p, t),
            |p, t| self.s_from_p_t_derivs(p, t),
        )?;
        Ok((sol.x, sol.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FluidPropertiesParams;

    /// Constant density; `e_from_p_t` either fails with `e_error` or is missing.
    struct Stub {
        base: FluidPropertiesBase,
        e_error: Option<FluidError>,
    }

    impl Stub {
        fn new(e_error: Option<FluidError>) -> Self {
            Self {
                base: FluidPropertiesBase::new("stub", FluidPropertiesParams::default()),
                e_error,
            }
        }
    }

    impl SinglePhaseFluid for Stub {
        fn base(&self) -> &FluidPropertiesBase {
            &self.base
        }

        fn fluid_name(&self) -> &str {
            "stub"
        }

        fn rho_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
            Ok(2.0)
        }

        fn rho_from_p_t_derivs(&self, _p: Real, _t: Real) -> FluidResult<WithPartials> {
            Ok(WithPartials::constant(2.0))
        }

        fn e_from_p_t(&self, _p: Real, _t: Real) -> FluidResult<Real> {
            match &self.e_error {
                Some(err) => Err(err.clone()),
                None => Err(self.base.not_implemented("e_from_p_t")),
            }
        }

        fn e_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
            self.e_from_p_t(p, t).map(WithPartials::constant)
        }

        fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
            Ok(p / rho)
        }

        fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
            Ok(WithPartials::new(p / rho, 1.0 / rho, -p / (rho * rho)))
        }
    }

    #[test]
    fn missing_energy_falls_back_to_p_rho() {
        let fp = Stub::new(None);
        assert_eq!(fp.v_e_from_p_t(10.0, 300.0).unwrap(), (0.5, 5.0));
        let (v, e) = fp.v_e_from_p_t_derivs(10.0, 300.0).unwrap();
        assert_eq!(v.value, 0.5);
        assert_eq!(e.value, 5.0);
        assert_eq!(e.d1, 0.5);
        assert_eq!(e.d2, 0.0);
    }

    #[test]
    fn energy_domain_errors_propagate() {
        let err = FluidError::NonPhysical { what: "temperature" };
        let fp = Stub::new(Some(err.clone()));
        assert_eq!(fp.v_e_from_p_t(10.0, -1.0).unwrap_err(), err);
        assert_eq!(fp.v_e_from_p_t_derivs(10.0, -1.0).unwrap_err(), err);

        let oob = FluidError::OutOfBounds {
            what: "temperature",
            value: 5000.0,
            min: 300.0,
            max: 1500.0,
        };
        let fp = Stub::new(Some(oob.clone()));
        assert_eq!(fp.v_e_from_p_t(10.0, 5000.0).unwrap_err(), oob);
    }
}
