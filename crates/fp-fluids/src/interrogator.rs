//! Report every property a fluid can give at one state.
//!
//! The state is pinned down first (p, T, rho, e); failure there is an error.
//! Every other property is queried through the (v, e) interface and recorded
//! as unavailable when the fluid cannot provide it. With a velocity, the
//! isentropic stagnation state is added.

use std::fmt;

use fp_core::Real;
use fp_core::units::{
    Density, DynVisc, Pressure, SpecEnergy, SpecHeat, SpecVolume, Temperature, ThermCond,
    Velocity, j_per_kg, j_per_kg_k, k, kg_per_m3, m3_per_kg, mps, pa, pa_s, w_per_m_k,
};
use tracing::{debug, warn};

use crate::error::FluidResult;
use crate::single_phase::SinglePhaseFluid;

/// Variables fixing the thermodynamic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateSpec {
    PressureTemperature { p: Real, t: Real },
    DensityEnergy { rho: Real, e: Real },
    DensityPressure { rho: Real, p: Real },
    /// Conserved variables; the velocity follows from them.
    Conserved { rho: Real, rhou: Real, rho_e: Real },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticProperties {
    pub p: Pressure,
    pub t: Temperature,
    pub rho: Density,
    pub v: SpecVolume,
    pub e: SpecEnergy,
    pub h: Option<SpecEnergy>,
    pub s: Option<SpecHeat>,
    pub c: Option<Velocity>,
    pub mu: Option<DynVisc>,
    pub cp: Option<SpecHeat>,
    pub cv: Option<SpecHeat>,
    pub k: Option<ThermCond>,
    /// Volumetric expansion coefficient [1/K]
    pub beta: Option<Real>,
}

/// Isentropic stagnation state.
#[derive(Debug, Clone, PartialEq)]
pub struct StagnationProperties {
    pub h: SpecEnergy,
    pub p: Option<Pressure>,
    pub t: Option<Temperature>,
    pub rho: Option<Density>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub fluid: String,
    pub velocity: Option<Velocity>,
    pub properties: StaticProperties,
    pub stagnation: Option<StagnationProperties>,
    /// Properties the fluid could not provide, with the reason.
    pub unavailable: Vec<(&'static str, String)>,
    /// Some computed value is NaN.
    pub nan_encountered: bool,
}

struct Collector {
    unavailable: Vec<(&'static str, String)>,
    nan: Vec<&'static str>,
}

impl Collector {
    fn take(&mut self, what: &'static str, result: FluidResult<Real>) -> Option<Real> {
        match result {
            Ok(v) => {
                if v.is_nan() {
                    self.nan.push(what);
                }
                Some(v)
            }
            Err(err) => {
                debug!(property = what, %err, "property unavailable");
                self.unavailable.push((what, err.to_string()));
                None
            }
        }
    }

    fn check(&mut self, what: &'static str, v: Real) -> Real {
        if v.is_nan() {
            self.nan.push(what);
        }
        v
    }
}

/// Properties of `fluid` at `state`. An explicit `velocity` is ignored for
/// [`StateSpec::Conserved`], which carries its own.
pub fn interrogate(
    fluid: &dyn SinglePhaseFluid,
    state: StateSpec,
    velocity: Option<Real>,
) -> FluidResult<Report> {
    let mut c = Collector {
        unavailable: Vec::new(),
        nan: Vec::new(),
    };

    let (p, t, rho, e, vel) = match state {
        StateSpec::PressureTemperature { p, t } => {
            let (v, e) = fluid.v_e_from_p_t(p, t)?;
            (p, t, 1.0 / v, e, velocity)
        }
        StateSpec::DensityEnergy { rho, e } => {
            let v = 1.0 / rho;
            (fluid.p_from_v_e(v, e)?, fluid.t_from_v_e(v, e)?, rho, e, velocity)
        }
        StateSpec::DensityPressure { rho, p } => {
            let e = fluid.e_from_p_rho(p, rho)?;
            (p, fluid.t_from_p_rho(p, rho)?, rho, e, velocity)
        }
        StateSpec::Conserved { rho, rhou, rho_e } => {
            let vel = rhou / rho;
            let e = rho_e / rho - 0.5 * vel * vel;
            let v = 1.0 / rho;
            (fluid.p_from_v_e(v, e)?, fluid.t_from_v_e(v, e)?, rho, e, Some(vel))
        }
    };
    let v = 1.0 / rho;
    for (what, x) in [("p", p), ("T", t), ("rho", rho), ("e", e)] {
        c.check(what, x);
    }

    let h = c.take("h", fluid.h_from_v_e(v, e));
    let s = c.take("s", fluid.s_from_v_e(v, e));
    let properties = StaticProperties {
        p: pa(p),
        t: k(t),
        rho: kg_per_m3(rho),
        v: m3_per_kg(v),
        e: j_per_kg(e),
        h: h.map(j_per_kg),
        s: s.map(j_per_kg_k),
        c: c.take("c", fluid.c_from_v_e(v, e)).map(mps),
        mu: c.take("mu", fluid.mu_from_v_e(v, e)).map(pa_s),
        cp: c.take("cp", fluid.cp_from_v_e(v, e)).map(j_per_kg_k),
        cv: c.take("cv", fluid.cv_from_v_e(v, e)).map(j_per_kg_k),
        k: c.take("k", fluid.k_from_v_e(v, e)).map(w_per_m_k),
        beta: c.take("beta", fluid.beta_from_p_t(p, t)),
    };

    let stagnation = match (vel, h, s) {
        (Some(vel), Some(h), Some(s)) => {
            let h0 = c.check("h0", h + 0.5 * vel * vel);
            let p0 = c.take("p0", fluid.p_from_h_s(h0, s));
            let rho0 = p0.and_then(|p0| c.take("rho0", fluid.rho_from_p_s(p0, s)));
            let t0 = match (p0, rho0) {
                (Some(p0), Some(rho0)) => c.take("T0", fluid.t_from_p_rho(p0, rho0)),
                _ => None,
            };
            Some(StagnationProperties {
                h: j_per_kg(h0),
                p: p0.map(pa),
                t: t0.map(k),
                rho: rho0.map(kg_per_m3),
            })
        }
        (Some(_), _, _) => {
            c.unavailable.push((
                "stagnation",
                "stagnation properties need h and s".to_string(),
            ));
            None
        }
        (None, _, _) => None,
    };

    let nan_encountered = !c.nan.is_empty();
    if nan_encountered {
        warn!(
            fluid = %fluid.base().name(),
            properties = ?c.nan,
            "NaN encountered while interrogating the fluid; the state may be non-physical"
        );
    }

    Ok(Report {
        fluid: fluid.base().name().to_string(),
        velocity: vel.map(mps),
        properties,
        stagnation,
        unavailable: c.unavailable,
        nan_encountered,
    })
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: Option<Real>, unit: &str) -> fmt::Result {
    match value {
        Some(v) => writeln!(f, "  {label:<26}{v:>16.8e} {unit}"),
        None => writeln!(f, "  {label:<26}{:>16}", "unavailable"),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.properties;
        writeln!(f, "Fluid: {}", self.fluid)?;
        writeln!(f, "Static properties:")?;
        row(f, "pressure", Some(p.p.value), "Pa")?;
        row(f, "temperature", Some(p.t.value), "K")?;
        row(f, "density", Some(p.rho.value), "kg/m^3")?;
        row(f, "specific volume", Some(p.v.value), "m^3/kg")?;
        row(f, "specific internal energy", Some(p.e.value), "J/kg")?;
        row(f, "specific enthalpy", p.h.map(|x| x.value), "J/kg")?;
        row(f, "specific entropy", p.s.map(|x| x.value), "J/(kg K)")?;
        row(f, "speed of sound", p.c.map(|x| x.value), "m/s")?;
        row(f, "dynamic viscosity", p.mu.map(|x| x.value), "Pa s")?;
        row(f, "cp", p.cp.map(|x| x.value), "J/(kg K)")?;
        row(f, "cv", p.cv.map(|x| x.value), "J/(kg K)")?;
        row(f, "thermal conductivity", p.k.map(|x| x.value), "W/(m K)")?;
        row(f, "thermal expansion", p.beta, "1/K")?;
        if let Some(vel) = self.velocity {
            row(f, "velocity", Some(vel.value), "m/s")?;
        }
        if let Some(st) = &self.stagnation {
            writeln!(f, "Stagnation properties:")?;
            row(f, "specific enthalpy", Some(st.h.value), "J/kg")?;
            row(f, "pressure", st.p.map(|x| x.value), "Pa")?;
            row(f, "temperature", st.t.map(|x| x.value), "K")?;
            row(f, "density", st.rho.map(|x| x.value), "kg/m^3")?;
        }
        if self.nan_encountered {
            writeln!(f, "Warning: NaN encountered")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluids::{FlibeFluidProperties, IdealGasFluidProperties};

    #[test]
    fn pressure_temperature_state() {
        let air = IdealGasFluidProperties::new("air");
        let r = interrogate(&air, StateSpec::PressureTemperature { p: 1e5, t: 300.0 }, None)
            .unwrap();
        let rho = air.rho_from_p_t(1e5, 300.0).unwrap();
        assert!((r.properties.rho.value - rho).abs() < 1e-12);
        assert!((r.properties.p.value - 1e5).abs() < 1e-6);
        assert!(r.unavailable.is_empty());
        assert!(r.stagnation.is_none());
        assert!(!r.nan_encountered);
    }

    #[test]
    fn states_agree() {
        let air = IdealGasFluidProperties::new("air");
        let pt = interrogate(&air, StateSpec::PressureTemperature { p: 3e5, t: 410.0 }, None)
            .unwrap()
            .properties;
        let re = interrogate(
            &air,
            StateSpec::DensityEnergy {
                rho: pt.rho.value,
                e: pt.e.value,
            },
            None,
        )
        .unwrap()
        .properties;
        assert!((re.p.value - 3e5).abs() / 3e5 < 1e-10);
        assert!((re.t.value - 410.0).abs() < 1e-8);
        let rp = interrogate(
            &air,
            StateSpec::DensityPressure {
                rho: pt.rho.value,
                p: 3e5,
            },
            None,
        )
        .unwrap()
        .properties;
        assert!((rp.t.value - 410.0).abs() < 1e-8);
    }

    #[test]
    fn stagnation_of_moving_gas() {
        let air = IdealGasFluidProperties::new("air");
        let (p, t, vel) = (1e5, 300.0, 100.0);
        let (v, e) = air.v_e_from_p_t(p, t).unwrap();
        let rho = 1.0 / v;
        let state = StateSpec::Conserved {
            rho,
            rhou: rho * vel,
            rho_e: rho * (e + 0.5 * vel * vel),
        };
        let r = interrogate(&air, state, None).unwrap();
        assert!((r.velocity.unwrap().value - vel).abs() < 1e-9);
        let st = r.stagnation.unwrap();
        let cp = air.cp_from_p_t(p, t).unwrap();
        let t0 = t + 0.5 * vel * vel / cp;
        let gamma = air.gamma();
        let p0 = p * (t0 / t).powf(gamma / (gamma - 1.0));
        assert!((st.t.unwrap().value - t0).abs() < 1e-6);
        assert!((st.p.unwrap().value - p0).abs() / p0 < 1e-9);
    }

    #[test]
    fn missing_properties_are_recorded() {
        let salt = FlibeFluidProperties::new("salt");
        let r = interrogate(&salt, StateSpec::PressureTemperature { p: 1e5, t: 900.0 }, Some(1.0))
            .unwrap();
        assert!(r.properties.s.is_none());
        assert!(r.unavailable.iter().any(|(what, _)| *what == "s"));
        assert!(r.stagnation.is_none());
        assert!(r.properties.mu.is_some());
        assert!(r.to_string().contains("unavailable"));
    }

    #[test]
    fn nan_is_flagged() {
        let air = IdealGasFluidProperties::new("air");
        let r = interrogate(&air, StateSpec::DensityEnergy { rho: 1.0, e: -1e5 }, None).unwrap();
        assert!(r.nan_encountered);
        assert!(r.properties.c.unwrap().value.is_nan());
    }
}
