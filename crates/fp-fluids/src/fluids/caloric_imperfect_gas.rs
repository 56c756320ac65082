//! Ideal gas with temperature-dependent specific heats.
//!
//! `p v = R T` holds as for the perfect gas, but the internal energy is a
//! tabulated function `e(T)`: knots given as parameters and fitted with a
//! natural cubic spline, so `cv = de/dT` and `cp = cv + R`. The inverses
//! `T(e)` and `T(h)` are tabulated on uniform energy and enthalpy grids and
//! interpolated linearly, and `Z(T) = int cv / T dT` is accumulated with the
//! trapezoidal rule so that `s = Z(T) + R ln v`.
//!
//! Viscosity and conductivity are either constants or splines on the same
//! temperature knots.

use fp_core::units::constants::R_UNIVERSAL;
use fp_core::{Real, WithPartials};

use crate::base::FluidPropertiesBase;
use crate::error::{FluidError, FluidResult};
use crate::params::{FluidPropertiesParams, ParamBag};
use crate::single_phase::SinglePhaseFluid;
use crate::tabulated::CubicSpline;

/// Relative temperature step for the finite-difference slopes of cv.
const FD_REL: Real = 1e-7;
const BISECTION_ITERATIONS: usize = 200;

/// A transport property as a function of temperature.
#[derive(Debug)]
enum TemperatureFunction {
    Constant(Real),
    Spline(CubicSpline),
}

impl TemperatureFunction {
    /// One value is a constant; otherwise one value per temperature knot.
    fn new(knots: &[Real], values: Vec<Real>) -> FluidResult<Self> {
        match values.as_slice() {
            [value] => Ok(Self::Constant(*value)),
            _ => Ok(Self::Spline(CubicSpline::new(knots.to_vec(), values)?)),
        }
    }

    /// `(value, d/dT)`
    fn sample(&self, t: Real) -> (Real, Real) {
        match self {
            Self::Constant(value) => (*value, 0.0),
            Self::Spline(spline) => spline.sample(t),
        }
    }
}

/// Values on a uniform grid of the argument, interpolated linearly and
/// clamped to the end values outside it.
#[derive(Debug)]
struct UniformLookup {
    min: Real,
    max: Real,
    step: Real,
    values: Vec<Real>,
}

impl UniformLookup {
    fn new(min: Real, max: Real, values: Vec<Real>) -> Self {
        let step = (max - min) / (values.len() - 1) as Real;
        Self {
            min,
            max,
            step,
            values,
        }
    }

    fn range(&self) -> (Real, Real) {
        (self.min, self.max)
    }

    fn sample(&self, x: Real) -> Real {
        let x = x.clamp(self.min, self.max);
        let index = (((x - self.min) / self.step).floor() as usize).min(self.values.len() - 2);
        let frac = (x - self.min - index as Real * self.step) / self.step;
        frac * self.values[index + 1] + (1.0 - frac) * self.values[index]
    }
}

/// Root of `f(x) = target` for increasing `f` on `[lo, hi]`.
fn bisect(f: impl Fn(Real) -> Real, (mut lo, mut hi): (Real, Real), target: Real) -> Real {
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if f(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-13 * hi.abs() {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Inverse caloric lookups and the entropy integral.
#[derive(Debug)]
struct Lookups {
    t_from_e: UniformLookup,
    t_from_h: UniformLookup,
    z_from_t: UniformLookup,
}

impl Lookups {
    /// Tabulate `T(e)`, `T(h)` and `Z(T)` on `n` points, with the temperature
    /// step shrunk so that it divides the range exactly.
    fn build(
        name: &str,
        e_t: &CubicSpline,
        r_specific: Real,
        (min_t, max_t): (Real, Real),
        resolution: Real,
    ) -> FluidResult<Self> {
        let n = (((max_t - min_t) / resolution).floor() as usize + 1).max(2);
        let dt = (max_t - min_t) / (n - 1) as Real;
        let temperatures: Vec<Real> = (0..n).map(|j| min_t + j as Real * dt).collect();

        // de/dT may vanish at the end points only.
        for (j, &t) in temperatures.iter().enumerate() {
            let cv = e_t.sample(t).1;
            if cv < 0.0 || (cv == 0.0 && j > 0 && j < n - 1) || cv.is_nan() {
                return Err(FluidError::config(format!(
                    "{name}: e(T) is not monotonically increasing with T (de/dT = {cv} at T = {t})"
                )));
            }
        }

        let energy = |t: Real| e_t.sample(t).0;
        let enthalpy = |t: Real| energy(t) + r_specific * t;
        let (min_e, max_e) = (energy(min_t), energy(max_t));
        if !(max_e > min_e) {
            return Err(FluidError::config(format!(
                "{name}: e(T) must increase over [{min_t}, {max_t}]"
            )));
        }
        let (min_h, max_h) = (enthalpy(min_t), enthalpy(max_t));
        let de = (max_e - min_e) / (n - 1) as Real;
        let dh = (max_h - min_h) / (n - 1) as Real;

        let t_of_e = (0..n)
            .map(|j| bisect(energy, (min_t, max_t), (min_e + j as Real * de).min(max_e)))
            .collect();
        let t_of_h = (0..n)
            .map(|j| bisect(enthalpy, (min_t, max_t), (min_h + j as Real * dh).min(max_h)))
            .collect();

        let mut z = Vec::with_capacity(n);
        z.push(0.0);
        for j in 1..n {
            let f1 = e_t.sample(temperatures[j]).1 / temperatures[j];
            let f0 = e_t.sample(temperatures[j - 1]).1 / temperatures[j - 1];
            z.push(z[j - 1] + 0.5 * dt * (f1 + f0));
        }

        Ok(Self {
            t_from_e: UniformLookup::new(min_e, max_e, t_of_e),
            t_from_h: UniformLookup::new(min_h, max_h, t_of_h),
            z_from_t: UniformLookup::new(min_t, max_t, z),
        })
    }
}

/// Internal energy and its temperature slopes.
#[derive(Debug, Clone, Copy)]
struct Caloric {
    e: Real,
    cv: Real,
    dcv_dt: Real,
}

#[derive(Debug)]
pub struct CaloricallyImperfectGasFluidProperties {
    base: FluidPropertiesBase,
    molar_mass: Real,
    /// Specific gas constant R / M
    r_specific: Real,
    t_c: Real,
    rho_c: Real,
    e_c: Real,
    e_t: CubicSpline,
    mu_t: TemperatureFunction,
    k_t: TemperatureFunction,
    out_of_bound_error: bool,
    lookups: Lookups,
}

impl CaloricallyImperfectGasFluidProperties {
    pub const TYPE_NAME: &'static str = "CaloricallyImperfectGas";

    pub fn from_params(name: &str, bag: &ParamBag) -> FluidResult<Self> {
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        let molar_mass = r.required_real("molar_mass")?;
        let knots = r.required_real_list("temperatures")?;
        let energies = r.required_real_list("e")?;
        let mu = r.required_real_list("mu")?;
        let k = r.required_real_list("k")?;
        let t_c = r.real("T_c", 0.0)?;
        let rho_c = r.real("rho_c", 0.0)?;
        let e_c = r.real("e_c", 0.0)?;
        let min_t = r.required_real("min_temperature")?;
        let max_t = r.required_real("max_temperature")?;
        let resolution = r.positive_real("temperature_resolution", 1.0)?;
        let out_of_bound_error = r.boolean("out_of_bound_error", true)?;
        r.finish()?;

        if !(molar_mass > 0.0 && molar_mass.is_finite()) {
            return Err(FluidError::config(format!(
                "{name}: parameter 'molar_mass' = {molar_mass} must be positive"
            )));
        }
        if !(min_t > 0.0 && max_t > min_t && max_t.is_finite()) {
            return Err(FluidError::config(format!(
                "{name}: the temperature range [{min_t}, {max_t}] must satisfy \
                 0 < min_temperature < max_temperature"
            )));
        }

        let e_t = CubicSpline::new(knots.clone(), energies)
            .map_err(|err| FluidError::config(format!("{name}: e(T): {err}")))?;
        let mu_t = TemperatureFunction::new(&knots, mu)
            .map_err(|err| FluidError::config(format!("{name}: mu(T): {err}")))?;
        let k_t = TemperatureFunction::new(&knots, k)
            .map_err(|err| FluidError::config(format!("{name}: k(T): {err}")))?;

        let lookups = Lookups::build(
            name,
            &e_t,
            R_UNIVERSAL / molar_mass,
            (min_t, max_t),
            resolution,
        )?;
        Ok(Self {
            base: FluidPropertiesBase::new(name, common),
            molar_mass,
            r_specific: R_UNIVERSAL / molar_mass,
            t_c,
            rho_c,
            e_c,
            e_t,
            mu_t,
            k_t,
            out_of_bound_error,
            lookups,
        })
    }

    pub fn specific_gas_constant(&self) -> Real {
        self.r_specific
    }

    pub fn temperature_range(&self) -> (Real, Real) {
        self.lookups.z_from_t.range()
    }

    pub fn internal_energy_range(&self) -> (Real, Real) {
        self.lookups.t_from_e.range()
    }

    /// Fails outside `range`, or warns once per method and carries on when
    /// out-of-bounds values are tolerated.
    fn bounded(
        &self,
        method: &'static str,
        what: &'static str,
        value: Real,
        (min, max): (Real, Real),
    ) -> FluidResult<Real> {
        if (min..=max).contains(&value) {
            return Ok(value);
        }
        if self.out_of_bound_error || value.is_nan() {
            return Err(FluidError::OutOfBounds {
                what,
                value,
                min,
                max,
            });
        }
        self.base.warn_once(method, || {
            format!("{method}: {what} = {value} is outside the range [{min}, {max}]")
        });
        Ok(value)
    }

    fn checked_t(&self, method: &'static str, t: Real) -> FluidResult<Real> {
        self.bounded(method, "temperature", t, self.lookups.z_from_t.range())
    }

    fn t_of_e(&self, method: &'static str, e: Real) -> FluidResult<Real> {
        let e = self.bounded(method, "internal energy", e, self.lookups.t_from_e.range())?;
        Ok(self.lookups.t_from_e.sample(e))
    }

    fn t_of_h(&self, method: &'static str, h: Real) -> FluidResult<Real> {
        let h = self.bounded(method, "enthalpy", h, self.lookups.t_from_h.range())?;
        Ok(self.lookups.t_from_h.sample(h))
    }

    fn caloric(&self, t: Real) -> Caloric {
        let (e, cv) = self.e_t.sample(t);
        let dt = t * FD_REL;
        let cv_pert = self.e_t.sample(t + dt).1;
        Caloric {
            e,
            cv,
            dcv_dt: (cv_pert - cv) / dt,
        }
    }

    /// `(c, dc/dT)`
    fn sound_speed(&self, t: Real) -> (Real, Real) {
        let cal = self.caloric(t);
        let gamma = (cal.cv + self.r_specific) / cal.cv;
        let dgamma_dt = cal.dcv_dt * (1.0 - gamma) / cal.cv;
        let c = (gamma * self.r_specific * t).sqrt();
        (c, 0.5 / c * self.r_specific * (gamma + t * dgamma_dt))
    }

    /// `Z(T) + R ln(R T / p)`, unchecked.
    fn entropy(&self, p: Real, t: Real) -> Real {
        self.lookups.z_from_t.sample(t) + self.r_specific * (self.r_specific * t / p).ln()
    }

    fn check_v(v: Real) -> FluidResult<Real> {
        if v == 0.0 {
            Err(FluidError::NonPhysical {
                what: "specific volume (v = 0)",
            })
        } else {
            Ok(v)
        }
    }
}

impl SinglePhaseFluid for CaloricallyImperfectGasFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        "caloric_imperfect_gas"
    }

    fn molar_mass(&self) -> FluidResult<Real> {
        Ok(self.molar_mass)
    }

    fn critical_temperature(&self) -> FluidResult<Real> {
        Ok(self.t_c)
    }

    fn critical_density(&self) -> FluidResult<Real> {
        Ok(self.rho_c)
    }

    fn critical_internal_energy(&self) -> FluidResult<Real> {
        Ok(self.e_c)
    }

    // --- (v, e) ---

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let v = Self::check_v(v)?;
        Ok(self.r_specific * self.t_of_e("p_from_v_e", e)? / v)
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let v = Self::check_v(v)?;
        let t = self.t_of_e("p_from_v_e", e)?;
        let p = self.r_specific * t / v;
        Ok(WithPartials::new(
            p,
            -p / v,
            self.r_specific / (v * self.caloric(t).cv),
        ))
    }

    fn t_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        self.t_of_e("t_from_v_e", e)
    }

    fn t_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("t_from_v_e", e)?;
        Ok(WithPartials::new(t, 0.0, 1.0 / self.caloric(t).cv))
    }

    fn c_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.sound_speed(self.t_of_e("c_from_v_e", e)?).0)
    }

    fn c_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("c_from_v_e", e)?;
        let (c, dc_dt) = self.sound_speed(t);
        Ok(WithPartials::new(c, 0.0, dc_dt / self.caloric(t).cv))
    }

    fn cp_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        let t = self.t_of_e("cp_from_v_e", e)?;
        Ok(self.caloric(t).cv + self.r_specific)
    }

    fn cp_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.t_of_e("cp_from_v_e", e)?);
        Ok(WithPartials::new(
            cal.cv + self.r_specific,
            0.0,
            cal.dcv_dt / cal.cv,
        ))
    }

    fn cv_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.t_of_e("cv_from_v_e", e)?).cv)
    }

    fn cv_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.t_of_e("cv_from_v_e", e)?);
        Ok(WithPartials::new(cal.cv, 0.0, cal.dcv_dt / cal.cv))
    }

    fn mu_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.mu_t.sample(self.t_of_e("mu_from_v_e", e)?).0)
    }

    fn mu_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("mu_from_v_e", e)?;
        let (mu, dmu_dt) = self.mu_t.sample(t);
        Ok(WithPartials::new(mu, 0.0, dmu_dt / self.caloric(t).cv))
    }

    fn k_from_v_e(&self, _v: Real, e: Real) -> FluidResult<Real> {
        Ok(self.k_t.sample(self.t_of_e("k_from_v_e", e)?).0)
    }

    fn k_from_v_e_derivs(&self, _v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("k_from_v_e", e)?;
        let (k, dk_dt) = self.k_t.sample(t);
        Ok(WithPartials::new(k, 0.0, dk_dt / self.caloric(t).cv))
    }

    fn s_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let t = self.t_of_e("s_from_v_e", e)?;
        Ok(self.lookups.z_from_t.sample(t) + self.r_specific * v.ln())
    }

    fn s_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("s_from_v_e", e)?;
        Ok(WithPartials::new(
            self.lookups.z_from_t.sample(t) + self.r_specific * v.ln(),
            self.r_specific / v,
            1.0 / t,
        ))
    }

    /// `e(T(h))`
    fn e_from_v_h(&self, _v: Real, h: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.t_of_h("e_from_v_h", h)?).e)
    }

    fn e_from_v_h_derivs(&self, _v: Real, h: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.t_of_h("e_from_v_h", h)?);
        Ok(WithPartials::new(
            cal.e,
            0.0,
            cal.cv / (cal.cv + self.r_specific),
        ))
    }

    /// `g = h - T s`
    fn g_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let t = self.t_of_e("g_from_v_e", e)?;
        let s = self.lookups.z_from_t.sample(t) + self.r_specific * v.ln();
        Ok(e + self.r_specific * t - t * s)
    }

    fn g_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_e("g_from_v_e", e)?;
        let s = self.lookups.z_from_t.sample(t) + self.r_specific * v.ln();
        let cv = self.caloric(t).cv;
        Ok(WithPartials::new(
            e + self.r_specific * t - t * s,
            -t * self.r_specific / v,
            (self.r_specific - s) / cv,
        ))
    }

    // --- (p, T) and friends ---

    fn rho_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(p / (self.r_specific * t))
    }

    fn rho_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_t(p, t)?;
        Ok(WithPartials::new(rho, rho / p, -rho / t))
    }

    fn e_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.checked_t("e_from_p_t", t)?).e)
    }

    fn e_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.checked_t("e_from_p_t", t)?);
        Ok(WithPartials::new(cal.e, 0.0, cal.cv))
    }

    fn h_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        let t = self.checked_t("h_from_p_t", t)?;
        Ok(self.caloric(t).e + self.r_specific * t)
    }

    fn h_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let t = self.checked_t("h_from_p_t", t)?;
        let cal = self.caloric(t);
        Ok(WithPartials::new(
            cal.e + self.r_specific * t,
            0.0,
            cal.cv + self.r_specific,
        ))
    }

    fn cv_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.checked_t("cv_from_p_t", t)?).cv)
    }

    fn cv_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.checked_t("cv_from_p_t", t)?);
        Ok(WithPartials::new(cal.cv, 0.0, cal.dcv_dt))
    }

    fn cp_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.checked_t("cp_from_p_t", t)?).cv + self.r_specific)
    }

    fn cp_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.checked_t("cp_from_p_t", t)?);
        Ok(WithPartials::new(cal.cv + self.r_specific, 0.0, cal.dcv_dt))
    }

    fn c_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.sound_speed(self.checked_t("c_from_p_t", t)?).0)
    }

    fn c_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let (c, dc_dt) = self.sound_speed(self.checked_t("c_from_p_t", t)?);
        Ok(WithPartials::new(c, 0.0, dc_dt))
    }

    fn mu_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.mu_t.sample(t).0)
    }

    fn mu_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let (mu, dmu_dt) = self.mu_t.sample(t);
        Ok(WithPartials::new(mu, 0.0, dmu_dt))
    }

    fn mu_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(self.mu_t.sample(t).0)
    }

    fn mu_from_rho_t_derivs(&self, _rho: Real, t: Real) -> FluidResult<WithPartials> {
        let (mu, dmu_dt) = self.mu_t.sample(t);
        Ok(WithPartials::new(mu, 0.0, dmu_dt))
    }

    fn k_from_p_t(&self, _p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.k_t.sample(t).0)
    }

    fn k_from_p_t_derivs(&self, _p: Real, t: Real) -> FluidResult<WithPartials> {
        let (k, dk_dt) = self.k_t.sample(t);
        Ok(WithPartials::new(k, 0.0, dk_dt))
    }

    fn k_from_rho_t(&self, _rho: Real, t: Real) -> FluidResult<Real> {
        Ok(self.k_t.sample(t).0)
    }

    fn k_from_rho_t_derivs(&self, _rho: Real, t: Real) -> FluidResult<WithPartials> {
        let (k, dk_dt) = self.k_t.sample(t);
        Ok(WithPartials::new(k, 0.0, dk_dt))
    }

    fn s_from_p_t(&self, p: Real, t: Real) -> FluidResult<Real> {
        Ok(self.entropy(p, self.checked_t("s_from_p_t", t)?))
    }

    fn s_from_p_t_derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
        let t = self.checked_t("s_from_p_t", t)?;
        Ok(WithPartials::new(
            self.entropy(p, t),
            -self.r_specific / p,
            (self.caloric(t).cv + self.r_specific) / t,
        ))
    }

    fn s_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        Ok(self.entropy(p, self.t_of_h("s_from_h_p", h)?))
    }

    fn s_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_h("s_from_h_p", h)?;
        Ok(WithPartials::new(
            self.entropy(p, t),
            1.0 / t,
            -self.r_specific / p,
        ))
    }

    /// Bisection on `s(p, T)`, which increases with T.
    fn rho_from_p_s(&self, p: Real, s: Real) -> FluidResult<Real> {
        let (min_t, max_t) = self.lookups.z_from_t.range();
        let range = (self.entropy(p, min_t), self.entropy(p, max_t));
        let s = self.bounded("rho_from_p_s", "entropy", s, range)?;
        let t = bisect(|t| self.entropy(p, t), (min_t, max_t), s);
        Ok(p / (self.r_specific * t))
    }

    fn rho_from_p_s_derivs(&self, p: Real, s: Real) -> FluidResult<WithPartials> {
        let rho = self.rho_from_p_s(p, s)?;
        let t = p / (self.r_specific * rho);
        let cp = self.caloric(t).cv + self.r_specific;
        Ok(WithPartials::new(
            rho,
            rho * (1.0 - self.r_specific / cp) / p,
            -rho / cp,
        ))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        let t = self.t_from_p_rho(p, rho)?;
        Ok(self.caloric(self.checked_t("e_from_p_rho", t)?).e)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho(p, rho)?;
        let cal = self.caloric(self.checked_t("e_from_p_rho", t)?);
        Ok(WithPartials::new(
            cal.e,
            cal.cv / (self.r_specific * rho),
            -cal.cv * t / rho,
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
        Ok(self.caloric(self.checked_t("e_from_t_v", t)?).e)
    }

    fn e_from_t_v_derivs(&self, t: Real, _v: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.checked_t("e_from_t_v", t)?);
        Ok(WithPartials::new(cal.e, cal.cv, 0.0))
    }

    fn p_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        Ok(self.r_specific * t / v)
    }

    fn p_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_t_v(t, v)?;
        Ok(WithPartials::new(p, self.r_specific / v, -p / v))
    }

    fn h_from_t_v(&self, t: Real, _v: Real) -> FluidResult<Real> {
        let t = self.checked_t("h_from_t_v", t)?;
        Ok(self.caloric(t).e + self.r_specific * t)
    }

    fn h_from_t_v_derivs(&self, t: Real, _v: Real) -> FluidResult<WithPartials> {
        let t = self.checked_t("h_from_t_v", t)?;
        let cal = self.caloric(t);
        Ok(WithPartials::new(
            cal.e + self.r_specific * t,
            cal.cv + self.r_specific,
            0.0,
        ))
    }

    fn s_from_t_v(&self, t: Real, v: Real) -> FluidResult<Real> {
        let t = self.checked_t("s_from_t_v", t)?;
        Ok(self.lookups.z_from_t.sample(t) + self.r_specific * v.ln())
    }

    fn s_from_t_v_derivs(&self, t: Real, v: Real) -> FluidResult<WithPartials> {
        let t = self.checked_t("s_from_t_v", t)?;
        Ok(WithPartials::new(
            self.lookups.z_from_t.sample(t) + self.r_specific * v.ln(),
            self.caloric(t).cv / t,
            self.r_specific / v,
        ))
    }

    fn cv_from_t_v(&self, t: Real, _v: Real) -> FluidResult<Real> {
        Ok(self.caloric(self.checked_t("cv_from_t_v", t)?).cv)
    }

    fn cv_from_t_v_derivs(&self, t: Real, _v: Real) -> FluidResult<WithPartials> {
        let cal = self.caloric(self.checked_t("cv_from_t_v", t)?);
        Ok(WithPartials::new(cal.cv, cal.dcv_dt, 0.0))
    }

    /// `v = exp((s - Z(T)) / R)` at `T = T(h)`, then `p = R T / v`.
    fn p_from_h_s(&self, h: Real, s: Real) -> FluidResult<Real> {
        let t = self.t_of_h("p_from_h_s", h)?;
        let v = ((s - self.lookups.z_from_t.sample(t)) / self.r_specific).exp();
        Ok(self.r_specific * t / v)
    }

    fn p_from_h_s_derivs(&self, h: Real, s: Real) -> FluidResult<WithPartials> {
        let p = self.p_from_h_s(h, s)?;
        let t = self.t_of_h("p_from_h_s", h)?;
        Ok(WithPartials::new(
            p,
            p / (self.r_specific * t),
            -p / self.r_specific,
        ))
    }

    fn t_from_p_h(&self, _p: Real, h: Real) -> FluidResult<Real> {
        self.t_of_h("t_from_p_h", h)
    }

    fn t_from_p_h_derivs(&self, _p: Real, h: Real) -> FluidResult<WithPartials> {
        let t = self.t_of_h("t_from_p_h", h)?;
        Ok(WithPartials::new(
            t,
            0.0,
            1.0 / (self.caloric(t).cv + self.r_specific),
        ))
    }

    fn t_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        self.t_from_p_h(p, h)
    }

    fn t_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        let w = self.t_from_p_h_derivs(p, h)?;
        Ok(WithPartials::new(w.value, w.d2, w.d1))
    }

    fn p_t_from_v_e(&self, v: Real, e: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        let v = Self::check_v(v)?;
        let t = self.t_of_e("p_t_from_v_e", e)?;
        Ok((self.r_specific * t / v, t))
    }

    fn p_t_from_v_h(&self, v: Real, h: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        let v = Self::check_v(v)?;
        let t = self.t_of_h("p_t_from_v_h", h)?;
        Ok((self.r_specific * t / v, t))
    }

    fn p_t_from_h_s(&self, h: Real, s: Real, _p0: Real, _t0: Real) -> FluidResult<(Real, Real)> {
        Ok((self.p_from_h_s(h, s)?, self.t_of_h("p_t_from_h_s", h)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluids::IdealGasFluidProperties;
    use crate::params::ParamValue;

    const KNOTS: [Real; 8] = [200.0, 400.0, 600.0, 800.0, 1000.0, 1200.0, 1400.0, 1600.0];

    fn bag(e: impl Fn(Real) -> Real) -> ParamBag {
        ParamBag::new()
            .with("molar_mass", 29.0e-3)
            .with("temperatures", KNOTS.to_vec())
            .with("e", KNOTS.iter().map(|&t| e(t)).collect::<Vec<_>>())
            .with("mu", 18.23e-6)
            .with("k", KNOTS.iter().map(|&t| 1e-2 + 5e-5 * t).collect::<Vec<_>>())
            .with("min_temperature", 250.0)
            .with("max_temperature", 1500.0)
    }

    /// `cv = 700 + 0.1 T`
    fn imperfect() -> CaloricallyImperfectGasFluidProperties {
        CaloricallyImperfectGasFluidProperties::from_params("gas", &bag(|t| 700.0 * t + 0.05 * t * t))
            .unwrap()
    }

    #[test]
    fn linear_energy_matches_the_perfect_gas() {
        let cv = 717.5;
        let fp = CaloricallyImperfectGasFluidProperties::from_params("gas", &bag(|t| cv * t)).unwrap();
        let r = fp.specific_gas_constant();
        let ig = IdealGasFluidProperties::from_params(
            "air",
            &ParamBag::new().with("gamma", 1.0 + r / cv),
        )
        .unwrap();
        let (p, t) = (2e5, 450.0);
        let close = |a: Real, b: Real, tol: Real| (a - b).abs() <= tol * b.abs();
        assert!(close(fp.rho_from_p_t(p, t).unwrap(), ig.rho_from_p_t(p, t).unwrap(), 1e-12));
        assert!(close(fp.e_from_p_t(p, t).unwrap(), ig.e_from_p_t(p, t).unwrap(), 1e-10));
        assert!(close(fp.h_from_p_t(p, t).unwrap(), ig.h_from_p_t(p, t).unwrap(), 1e-10));
        assert!(close(fp.cp_from_p_t(p, t).unwrap(), ig.cp_from_p_t(p, t).unwrap(), 1e-8));
        assert!(close(fp.c_from_p_t(p, t).unwrap(), ig.c_from_p_t(p, t).unwrap(), 1e-8));
        // Entropies share the temperature dependence but not the reference.
        let ds = fp.s_from_p_t(p, 900.0).unwrap() - fp.s_from_p_t(p, t).unwrap();
        let ds_ig = ig.s_from_p_t(p, 900.0).unwrap() - ig.s_from_p_t(p, t).unwrap();
        assert!(close(ds, ds_ig, 1e-5));
    }

    #[test]
    fn lookups_invert_energy_and_enthalpy() {
        let fp = imperfect();
        for t in [250.0, 333.3, 800.0, 1234.5, 1500.0] {
            let (v, e) = fp.v_e_from_p_t(1e5, t).unwrap();
            assert!((fp.t_from_v_e(v, e).unwrap() - t).abs() < 1e-3, "T(e) at {t}");
            let h = fp.h_from_p_t(1e5, t).unwrap();
            assert!((fp.t_from_p_h(1e5, h).unwrap() - t).abs() < 1e-3, "T(h) at {t}");
            assert!((fp.e_from_v_h(v, h).unwrap() - e).abs() / e < 1e-6);
            let (p, t2) = fp.p_t_from_v_h(v, h, 0.0, 0.0).unwrap();
            assert!((p - 1e5).abs() < 1.0 && (t2 - t).abs() < 1e-3);
        }
    }

    #[test]
    fn specific_heats_follow_the_energy_slope() {
        let fp = imperfect();
        let cv = fp.cv_from_p_t(1e5, 600.0).unwrap();
        assert!((cv - 760.0).abs() < 1.0);
        let cp = fp.cp_from_p_t(1e5, 600.0).unwrap();
        assert!((cp - cv - fp.specific_gas_constant()).abs() < 1e-9);
        let gamma = fp.gamma_from_p_t(1e5, 600.0).unwrap();
        let c = fp.c_from_p_t(1e5, 600.0).unwrap();
        assert!((c * c - gamma * fp.specific_gas_constant() * 600.0).abs() < 1e-6 * c * c);
    }

    #[test]
    fn entropy_round_trips() {
        let fp = imperfect();
        let (p, t) = (3e5, 700.0);
        let s = fp.s_from_p_t(p, t).unwrap();
        let rho = fp.rho_from_p_t(p, t).unwrap();
        let (v, e) = fp.v_e_from_p_t(p, t).unwrap();
        assert!((fp.s_from_v_e(v, e).unwrap() - s).abs() < 1e-3);
        assert!((fp.s_from_t_v(t, v).unwrap() - s).abs() < 1e-9);
        assert!((fp.rho_from_p_s(p, s).unwrap() - rho).abs() / rho < 1e-8);
        let h = fp.h_from_p_t(p, t).unwrap();
        assert!((fp.s_from_h_p(h, p).unwrap() - s).abs() < 1e-3);
        assert!((fp.p_from_h_s(h, s).unwrap() - p).abs() / p < 1e-5);
        let g = fp.g_from_v_e(v, e).unwrap();
        assert!((g - (h - t * fp.s_from_v_e(v, e).unwrap())).abs() < 1e-6 * h.abs());
    }

    #[test]
    fn pressure_partials_match_finite_differences() {
        let fp = imperfect();
        let (v, e) = fp.v_e_from_p_t(1e5, 500.0).unwrap();
        let w = fp.p_from_v_e_derivs(v, e).unwrap();
        let dv = 1e-6 * v;
        let de = 1e-4 * e;
        let fd_v = (fp.p_from_v_e(v + dv, e).unwrap() - fp.p_from_v_e(v - dv, e).unwrap()) / (2.0 * dv);
        let fd_e = (fp.p_from_v_e(v, e + de).unwrap() - fp.p_from_v_e(v, e - de).unwrap()) / (2.0 * de);
        assert!((w.d1 - fd_v).abs() < 1e-6 * fd_v.abs());
        assert!((w.d2 - fd_e).abs() < 1e-3 * fd_e.abs());
    }

    #[test]
    fn transport_properties_follow_temperature() {
        let fp = imperfect();
        assert_eq!(fp.mu_from_p_t(1e5, 900.0).unwrap(), 18.23e-6);
        let k = fp.k_from_p_t_derivs(1e5, 900.0).unwrap();
        assert!((k.value - 0.055).abs() < 1e-9);
        assert!((k.d2 - 5e-5).abs() < 1e-9);
    }

    #[test]
    fn out_of_bounds_errors_or_warns() {
        let fp = imperfect();
        assert!(matches!(
            fp.e_from_p_t(1e5, 2000.0),
            Err(FluidError::OutOfBounds { what: "temperature", .. })
        ));
        let (_, e_max) = fp.internal_energy_range();
        assert!(matches!(
            fp.p_from_v_e(1.0, 2.0 * e_max),
            Err(FluidError::OutOfBounds { what: "internal energy", .. })
        ));

        let lenient = bag(|t| 700.0 * t + 0.05 * t * t).with("out_of_bound_error", false);
        let fp = CaloricallyImperfectGasFluidProperties::from_params("gas", &lenient).unwrap();
        let t = fp.t_from_v_e(1.0, 2.0 * e_max).unwrap();
        assert!((t - 1500.0).abs() < 1e-6);
        assert!(fp.e_from_p_t(1e5, 1550.0).is_ok());
    }

    #[test]
    fn decreasing_energy_is_rejected() {
        let err = CaloricallyImperfectGasFluidProperties::from_params(
            "gas",
            &bag(|t| 1e6 - 700.0 * t),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not monotonically increasing"));
    }

    #[test]
    fn configuration_is_checked() {
        let missing = bag(|t| 717.5 * t);
        let mut no_mass = ParamBag::new();
        for key in missing.keys().filter(|k| *k != "molar_mass") {
            no_mass.set(key, missing.get(key).unwrap().clone());
        }
        let err = CaloricallyImperfectGasFluidProperties::from_params("gas", &no_mass).unwrap_err();
        assert!(err.to_string().contains("'molar_mass'"));

        let short_k = bag(|t| 717.5 * t).with("k", vec![0.02, 0.03]);
        let err = CaloricallyImperfectGasFluidProperties::from_params("gas", &short_k).unwrap_err();
        assert!(err.to_string().contains("k(T)"));

        let inverted = bag(|t| 717.5 * t).with("min_temperature", 1600.0);
        assert!(CaloricallyImperfectGasFluidProperties::from_params("gas", &inverted).is_err());

        let text = bag(|t| 717.5 * t).with("mu", ParamValue::Text("sutherland".into()));
        assert!(CaloricallyImperfectGasFluidProperties::from_params("gas", &text).is_err());
    }

    #[test]
    fn metadata() {
        let fp = CaloricallyImperfectGasFluidProperties::from_params(
            "gas",
            &bag(|t| 717.5 * t).with("T_c", 132.5).with("rho_c", 316.0),
        )
        .unwrap();
        assert_eq!(fp.fluid_name(), "caloric_imperfect_gas");
        assert_eq!(fp.molar_mass().unwrap(), 29.0e-3);
        assert_eq!(fp.critical_temperature().unwrap(), 132.5);
        assert_eq!(fp.critical_density().unwrap(), 316.0);
        assert_eq!(fp.critical_internal_energy().unwrap(), 0.0);
        assert_eq!(fp.temperature_range(), (250.0, 1500.0));
    }
}
