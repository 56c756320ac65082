//! Fluid properties interpolated from a (p, T) table.
//!
//! The table is read from CSV or generated from a source fluid when the object
//! is built, and never changes afterwards. Properties held in the table are
//! sampled with a bicubic spline; everything else is forwarded to the source
//! fluid when there is one. Conversions to (p, T) from other variable pairs
//! are Newton solves on the splines, unless (v, e) tables were built: then
//! (v, e) queries use the direct (v, e) splines or the (p, T) lookup tables.

mod spline;
mod table;
mod ve;

pub use spline::{BicubicSpline, CubicSpline};
pub use table::{GridVariables, PropertyTable, TabulatedProperty};
pub use ve::{VolumeEnergyGrid, VolumeEnergyOptions, grid_axis, tabulate_v_e};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fp_core::{Real, WithPartials};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::base::FluidPropertiesBase;
use crate::error::{FluidError, FluidResult};
use crate::inversion;
use crate::params::{FluidPropertiesParams, ParamBag, ParamReader};
use crate::registry::FluidSet;
use crate::single_phase::{SinglePhaseFluid, compose};
use ve::{PTLookup, VolumeEnergyData, corner_range};

/// What a query outside the tabulated range does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfBounds {
    /// Fail with [`FluidError::OutOfBounds`].
    #[default]
    Throw,
    /// Clamp the input to the nearest bound.
    SetToClosestBound,
    /// Clamp, warning once per variable.
    WarnAndClamp,
    /// Clamp and count the query as invalid; see
    /// [`TabulatedFluidProperties::invalid_evaluations`].
    DeclareInvalid,
    /// Extrapolate the end polynomials.
    Ignore,
}

impl OutOfBounds {
    pub const CHOICES: [&'static str; 5] = [
        "throw",
        "set_to_closest_bound",
        "warn_and_clamp",
        "declare_invalid",
        "ignore",
    ];

    fn parse(s: &str) -> Self {
        match s {
            "set_to_closest_bound" => Self::SetToClosestBound,
            "warn_and_clamp" => Self::WarnAndClamp,
            "declare_invalid" => Self::DeclareInvalid,
            "ignore" => Self::Ignore,
            _ => Self::Throw,
        }
    }
}

/// Grid used when generating a table from a source fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabulationGrid {
    pub pressure_min: Real,
    pub pressure_max: Real,
    pub temperature_min: Real,
    pub temperature_max: Real,
    pub num_p: usize,
    pub num_t: usize,
}

impl Default for TabulationGrid {
    fn default() -> Self {
        Self {
            pressure_min: 1e5,
            pressure_max: 50e6,
            temperature_min: 300.0,
            temperature_max: 500.0,
            num_p: 100,
            num_t: 100,
        }
    }
}

impl TabulationGrid {
    pub fn validate(&self) -> FluidResult<()> {
        if !(self.temperature_max > self.temperature_min) {
            return Err(FluidError::config(
                "temperature_max must be greater than temperature_min",
            ));
        }
        if !(self.pressure_max > self.pressure_min) {
            return Err(FluidError::config(
                "pressure_max must be greater than pressure_min",
            ));
        }
        if self.num_p < 2 || self.num_t < 2 {
            return Err(FluidError::config(
                "num_p and num_T must be at least 2",
            ));
        }
        Ok(())
    }

    fn axis(min: Real, max: Real, n: usize) -> Vec<Real> {
        let step = (max - min) / (n - 1) as Real;
        (0..n).map(|i| min + i as Real * step).collect()
    }

    pub fn pressures(&self) -> Vec<Real> {
        Self::axis(self.pressure_min, self.pressure_max, self.num_p)
    }

    pub fn temperatures(&self) -> Vec<Real> {
        Self::axis(self.temperature_min, self.temperature_max, self.num_t)
    }
}

macro_rules! tabulated_p_t {
    ($($prop:ident => $name:ident, $derivs:ident;)*) => {
        $(
            fn $name(&self, p: Real, t: Real) -> FluidResult<Real> {
                match self.spline(TabulatedProperty::$prop) {
                    Some(spline) => {
                        let (p, t) = self.check_p_t(p, t)?;
                        Ok(spline.sample(p, t).value)
                    }
                    None => self.forward(stringify!($name))?.$name(p, t),
                }
            }

            fn $derivs(&self, p: Real, t: Real) -> FluidResult<WithPartials> {
                match self.spline(TabulatedProperty::$prop) {
                    Some(spline) => {
                        let (p, t) = self.check_p_t(p, t)?;
                        Ok(spline.sample(p, t))
                    }
                    None => self.forward(stringify!($derivs))?.$derivs(p, t),
                }
            }
        )*
    };
}

/// Forward a metadata query to the source fluid.
macro_rules! forwarded_metadata {
    ($($name:ident),* $(,)?) => {
        $(
            fn $name(&self) -> FluidResult<Real> {
                self.forward(stringify!($name))?.$name()
            }
        )*
    };
}

/// (v, e) property: the direct (v, e) spline, else the (p, T) form at the
/// state the pair converts to.
macro_rules! on_v_e {
    ($($prop:ident => $name:ident, $derivs:ident => $pt:ident, $pt_derivs:ident;)*) => {
        $(
            fn $name(&self, v: Real, e: Real) -> FluidResult<Real> {
                self.value_on_v_e(TabulatedProperty::$prop, v, e, |fp, p, t| fp.$pt(p, t))
            }

            fn $derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
                self.derivs_on_v_e(TabulatedProperty::$prop, v, e, |fp, p, t| fp.$pt_derivs(p, t))
            }
        )*
    };
}

pub struct TabulatedFluidProperties {
    base: FluidPropertiesBase,
    source: Option<Arc<dyn SinglePhaseFluid>>,
    pressure: Vec<Real>,
    temperature: Vec<Real>,
    splines: Vec<(TabulatedProperty, BicubicSpline)>,
    ve: Option<VolumeEnergyData>,
    out_of_bounds: OutOfBounds,
    invalid: AtomicUsize,
}

impl fmt::Debug for TabulatedFluidProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabulatedFluidProperties")
            .field("name", &self.base.name())
            .field("source", &self.source.as_ref().map(|fp| fp.base().name().to_string()))
            .field("num_p", &self.pressure.len())
            .field("num_t", &self.temperature.len())
            .field(
                "properties",
                &self.splines.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
            )
            .field(
                "ve_properties",
                &self
                    .ve
                    .as_ref()
                    .map(|ve| ve.splines.iter().map(|(p, _)| *p).collect::<Vec<_>>()),
            )
            .field("out_of_bounds", &self.out_of_bounds)
            .finish()
    }
}

impl TabulatedFluidProperties {
    pub const TYPE_NAME: &'static str = "TabulatedFluidProperties";

    /// Build from an already assembled table.
    pub fn from_table(
        name: impl Into<String>,
        params: FluidPropertiesParams,
        table: PropertyTable,
        source: Option<Arc<dyn SinglePhaseFluid>>,
        out_of_bounds: OutOfBounds,
    ) -> FluidResult<Self> {
        if table.variables != GridVariables::PressureTemperature {
            return Err(FluidError::config(
                "the main table of a tabulated fluid must span (pressure, temperature)",
            ));
        }
        let splines = splines_on(&table)?;
        let fluid = Self {
            base: FluidPropertiesBase::new(name, params),
            source,
            pressure: table.axis1,
            temperature: table.axis2,
            splines,
            ve: None,
            out_of_bounds,
            invalid: AtomicUsize::new(0),
        };
        fluid.check_initial_guess();
        Ok(fluid)
    }

    /// Read the table from a CSV file.
    pub fn from_csv(
        name: impl Into<String>,
        params: FluidPropertiesParams,
        path: &Path,
        source: Option<Arc<dyn SinglePhaseFluid>>,
        out_of_bounds: OutOfBounds,
    ) -> FluidResult<Self> {
        let table = PropertyTable::read_csv(path, GridVariables::PressureTemperature)?;
        Self::from_table(name, params, table, source, out_of_bounds)
    }

    /// Tabulate `properties` of `source` on `grid`. Pressure rows are evaluated in parallel.
    pub fn generate(
        name: impl Into<String>,
        params: FluidPropertiesParams,
        source: Arc<dyn SinglePhaseFluid>,
        grid: &TabulationGrid,
        properties: &[TabulatedProperty],
        out_of_bounds: OutOfBounds,
    ) -> FluidResult<Self> {
        let table = tabulate(source.as_ref(), grid, properties)?;
        Self::from_table(name, params, table, Some(source), out_of_bounds)
    }

    /// Add the (v, e) interpolations `options` asks for. `table` is a (v, e)
    /// tabulation read from file; without one the direct tables are generated
    /// from the source fluid on the grid in `options`.
    pub fn with_volume_energy(
        mut self,
        options: &VolumeEnergyOptions,
        properties: &[TabulatedProperty],
        table: Option<PropertyTable>,
    ) -> FluidResult<Self> {
        options.grid.validate()?;
        let (volume, energy, splines) = match table {
            Some(table) => {
                if table.variables != GridVariables::VolumeEnergy {
                    return Err(FluidError::config(
                        "a (v, e) tabulation must span (specific_volume, internal_energy)",
                    ));
                }
                let splines = splines_on(&table)?;
                (table.axis1, table.axis2, splines)
            }
            None => {
                let (volume, energy) = self.v_e_axes(&options.grid)?;
                let splines = if options.direct {
                    let source = self.source.as_deref().ok_or_else(|| {
                        FluidError::config(format!(
                            "{}: (v, e) interpolations need 'fp' or 'fluid_property_ve_file'",
                            self.base.name()
                        ))
                    })?;
                    splines_on(&tabulate_v_e(source, &volume, &energy, properties)?)?
                } else {
                    Vec::new()
                };
                (volume, energy, splines)
            }
        };

        let (p0, t0) = self.initial_guess();
        let guess = self.clamped_guess(p0, t0);
        let from_v_e = if options.p_t_from_v_e {
            info!(fluid = %self.base.name(), "building (v, e) to (p, T) lookup");
            Some(PTLookup::build(&volume, &energy, guess, |v, e, g| {
                self.node_p_t("p_t_from_v_e", (v, e), g, TabulatedProperty::InternalEnergy)
            })?)
        } else {
            None
        };
        let from_v_h = if options.p_t_from_v_h {
            info!(fluid = %self.base.name(), "building (v, h) to (p, T) lookup");
            let (h_min, h_max) =
                corner_range(self.pressure_range(), self.temperature_range(), |p, t| {
                    self.h_from_p_t(p, t)
                })?;
            let grid = &options.grid;
            let enthalpy = grid_axis("enthalpy", h_min, h_max, grid.num_e, grid.log_h)?;
            let lookup = PTLookup::build(&volume, &enthalpy, guess, |v, h, g| {
                self.node_p_t("p_t_from_v_h", (v, h), g, TabulatedProperty::Enthalpy)
            })?;
            Some((lookup, enthalpy))
        } else {
            None
        };

        self.ve = Some(VolumeEnergyData {
            volume,
            energy,
            splines,
            from_v_e,
            from_v_h,
        });
        Ok(self)
    }

    /// Build from parameters. `fp` names a fluid already in `built`.
    pub fn from_params(name: &str, bag: &ParamBag, built: &FluidSet) -> FluidResult<Self> {
        let mut r = bag.reader(name);
        let common = FluidPropertiesParams::read(&mut r)?;
        let d = TabulationGrid::default();
        let grid = TabulationGrid {
            pressure_min: r.real("pressure_min", d.pressure_min)?,
            pressure_max: r.real("pressure_max", d.pressure_max)?,
            temperature_min: r.real("temperature_min", d.temperature_min)?,
            temperature_max: r.real("temperature_max", d.temperature_max)?,
            num_p: r.count("num_p", d.num_p)?,
            num_t: r.count("num_T", d.num_t)?,
        };
        let default_props = TabulatedProperty::DEFAULT_SET.map(TabulatedProperty::column);
        let properties = r
            .text_list("interpolated_properties", &default_props)?
            .iter()
            .map(|s| s.parse())
            .collect::<FluidResult<Vec<TabulatedProperty>>>()?;
        let out_of_bounds = OutOfBounds::parse(&r.choice(
            "out_of_bounds_behavior",
            "throw",
            &OutOfBounds::CHOICES,
        )?);
        let input = r.optional_text("fluid_property_file")?.map(PathBuf::from);
        let output = r.optional_text("fluid_property_output_file")?.map(PathBuf::from);
        let ve_input = r.optional_text("fluid_property_ve_file")?.map(PathBuf::from);
        let ve_output = r.optional_text("fluid_property_ve_output_file")?.map(PathBuf::from);
        let mut ve_options = read_ve_options(&mut r)?;
        ve_options.direct |= ve_input.is_some();
        let source = match r.optional_text("fp")? {
            Some(fp) => Some(built.get(&fp).ok_or_else(|| {
                FluidError::config(format!("{name}: fluid '{fp}' given as 'fp' is not defined"))
            })?),
            None => None,
        };
        r.finish()?;

        if !ve_options.direct {
            if let Some(prop) = properties.iter().find(|p| !TabulatedProperty::P_T.contains(p)) {
                return Err(FluidError::config(format!(
                    "{name}: '{prop}' can only be interpolated on a (v, e) grid; \
                     set 'create_ve_interpolations' or give 'fluid_property_ve_file'"
                )));
            }
        }
        let p_t_properties: Vec<_> = properties
            .iter()
            .copied()
            .filter(|p| TabulatedProperty::P_T.contains(p))
            .collect();

        let mut fluid = match (input, source) {
            (Some(path), source) if path.exists() || source.is_none() => {
                Self::from_csv(name, common, &path, source, out_of_bounds)?
            }
            (_, Some(source)) => {
                Self::generate(name, common, source, &grid, &p_t_properties, out_of_bounds)?
            }
            (_, None) => {
                return Err(FluidError::config(format!(
                    "{name}: either 'fluid_property_file' or 'fp' must be given"
                )));
            }
        };
        if !ve_options.is_empty() {
            let ve_table = match &ve_input {
                Some(path) if path.exists() || fluid.source.is_none() => {
                    Some(PropertyTable::read_csv(path, GridVariables::VolumeEnergy)?)
                }
                _ => None,
            };
            fluid = fluid.with_volume_energy(&ve_options, &properties, ve_table)?;
        }

        if let Some(path) = &output {
            fluid.write_csv(path)?;
        }
        if let Some(table) = fluid.ve_table() {
            let path = ve_output.or_else(|| output.as_deref().map(ve_file_name));
            if let Some(path) = path {
                table.write_csv(&path, fluid.fluid_name())?;
            }
        }
        Ok(fluid)
    }

    pub fn pressure_range(&self) -> (Real, Real) {
        (self.pressure[0], self.pressure[self.pressure.len() - 1])
    }

    pub fn temperature_range(&self) -> (Real, Real) {
        (self.temperature[0], self.temperature[self.temperature.len() - 1])
    }

    pub fn properties(&self) -> impl Iterator<Item = TabulatedProperty> + '_ {
        self.splines.iter().map(|(p, _)| *p)
    }

    /// Snapshot of the grid and tabulated values.
    pub fn table(&self) -> PropertyTable {
        PropertyTable {
            variables: GridVariables::PressureTemperature,
            axis1: self.pressure.clone(),
            axis2: self.temperature.clone(),
            columns: self
                .splines
                .iter()
                .map(|(p, s)| (*p, s.values().clone()))
                .collect(),
        }
    }

    pub fn write_csv(&self, path: &Path) -> FluidResult<()> {
        self.table().write_csv(path, self.fluid_name())
    }

    /// Snapshot of the (v, e) tables, if any were built.
    pub fn ve_table(&self) -> Option<PropertyTable> {
        self.ve.as_ref().map(VolumeEnergyData::table)
    }

    /// `(v_min, v_max)` and `(e_min, e_max)` of the (v, e) grid.
    pub fn volume_energy_range(&self) -> Option<((Real, Real), (Real, Real))> {
        self.ve.as_ref().map(|ve| (ve.v_range(), ve.e_range()))
    }

    /// Out-of-bounds queries clamped under [`OutOfBounds::DeclareInvalid`].
    pub fn invalid_evaluations(&self) -> usize {
        self.invalid.load(Ordering::Relaxed)
    }

    /// Grid axes for generated (v, e) tables. Unset bounds span the values
    /// at the corners of the (p, T) table.
    fn v_e_axes(&self, grid: &VolumeEnergyGrid) -> FluidResult<(Vec<Real>, Vec<Real>)> {
        let (p, t) = (self.pressure_range(), self.temperature_range());
        let (v_min, v_max) = match grid.v_bounds {
            Some(bounds) => bounds,
            None => corner_range(p, t, |p, t| self.v_from_p_t(p, t))?,
        };
        let (e_min, e_max) = match grid.e_bounds {
            Some(bounds) => bounds,
            None => corner_range(p, t, |p, t| self.e_from_p_t(p, t))?,
        };
        Ok((
            grid_axis("specific volume", v_min, v_max, grid.num_v, grid.log_v)?,
            grid_axis("internal energy", e_min, e_max, grid.num_e, grid.log_e)?,
        ))
    }

    /// (p, T) at one lookup node: `(v, b)` where `b` is `energy` (internal
    /// energy or enthalpy). Uses the source fluid when there is one, else an
    /// unchecked Newton solve on the splines.
    fn node_p_t(
        &self,
        method: &'static str,
        (v, b): (Real, Real),
        (p0, t0): (Real, Real),
        energy: TabulatedProperty,
    ) -> FluidResult<(Real, Real)> {
        if let Some(source) = &self.source {
            return match energy {
                TabulatedProperty::Enthalpy => source.p_t_from_v_h(v, b, p0, t0),
                _ => source.p_t_from_v_e(v, b, p0, t0),
            };
        }
        let (rho, other) = self
            .pair(TabulatedProperty::Density, energy)
            .ok_or_else(|| self.base.not_implemented(method))?;
        self.solve_p_t_unchecked(
            method,
            "(v, energy)",
            (v, b),
            (p0, t0),
            |p, t| {
                let r = rho.sample(p, t);
                r.chain(1.0 / r.value, -1.0 / (r.value * r.value))
            },
            |p, t| other.sample(p, t),
        )
    }

    fn spline(&self, prop: TabulatedProperty) -> Option<&BicubicSpline> {
        self.splines
            .iter()
            .find(|(p, _)| *p == prop)
            .map(|(_, s)| s)
    }

    fn forward(&self, method: &'static str) -> FluidResult<&dyn SinglePhaseFluid> {
        self.source
            .as_deref()
            .ok_or_else(|| self.base.not_implemented(method))
    }

    fn check_initial_guess(&self) {
        let (p0, t0) = self.initial_guess();
        let (p_min, p_max) = self.pressure_range();
        let (t_min, t_max) = self.temperature_range();
        if !(p_min..=p_max).contains(&p0) {
            warn!(fluid = %self.base.name(), p0, p_min, p_max,
                "pressure initial guess is outside the tabulated range");
        }
        if !(t_min..=t_max).contains(&t0) {
            warn!(fluid = %self.base.name(), t0, t_min, t_max,
                "temperature initial guess is outside the tabulated range");
        }
    }

    fn check_one(&self, what: &'static str, value: Real, min: Real, max: Real) -> FluidResult<Real> {
        const TOL: Real = 1e-6;
        if self.out_of_bounds == OutOfBounds::Ignore || (min - TOL..=max + TOL).contains(&value) {
            return Ok(value);
        }
        match self.out_of_bounds {
            OutOfBounds::Throw => Err(FluidError::OutOfBounds {
                what,
                value,
                min,
                max,
            }),
            OutOfBounds::WarnAndClamp => {
                self.base.warn_once(what, || {
                    format!("{what} {value} is outside the tabulated range ({min}, {max}) and is clamped")
                });
                Ok(value.clamp(min, max))
            }
            OutOfBounds::DeclareInvalid => {
                self.invalid.fetch_add(1, Ordering::Relaxed);
                debug!(fluid = %self.base.name(), what, value, min, max, "out-of-bounds query declared invalid");
                Ok(value.clamp(min, max))
            }
            _ => Ok(value.clamp(min, max)),
        }
    }

    /// Apply the out-of-bounds policy to a (v, e) query.
    fn check_v_e(&self, ve: &VolumeEnergyData, v: Real, e: Real) -> FluidResult<(Real, Real)> {
        let (v_min, v_max) = ve.v_range();
        let (e_min, e_max) = ve.e_range();
        Ok((
            self.check_one("specific volume", v, v_min, v_max)?,
            self.check_one("internal energy", e, e_min, e_max)?,
        ))
    }

    /// Apply the out-of-bounds policy to a (p, T) query.
    fn check_p_t(&self, p: Real, t: Real) -> FluidResult<(Real, Real)> {
        let (p_min, p_max) = self.pressure_range();
        let (t_min, t_max) = self.temperature_range();
        Ok((
            self.check_one("pressure", p, p_min, p_max)?,
            self.check_one("temperature", t, t_min, t_max)?,
        ))
    }

    fn clamped_guess(&self, p0: Real, t0: Real) -> (Real, Real) {
        let (p_min, p_max) = self.pressure_range();
        let (t_min, t_max) = self.temperature_range();
        (p0.clamp(p_min, p_max), t0.clamp(t_min, t_max))
    }

    /// 2D Newton on two splines, evaluated without bounds checks so iterates
    /// may leave the grid; the policy applies to the converged point.
    fn solve_p_t(
        &self,
        method: &'static str,
        pair: &'static str,
        targets: (Real, Real),
        guess: (Real, Real),
        a: impl Fn(Real, Real) -> WithPartials,
        b: impl Fn(Real, Real) -> WithPartials,
    ) -> FluidResult<(Real, Real)> {
        let (p, t) = self.solve_p_t_unchecked(method, pair, targets, guess, a, b)?;
        self.check_p_t(p, t)
    }

    fn solve_p_t_unchecked(
        &self,
        method: &'static str,
        pair: &'static str,
        targets: (Real, Real),
        guess: (Real, Real),
        a: impl Fn(Real, Real) -> WithPartials,
        b: impl Fn(Real, Real) -> WithPartials,
    ) -> FluidResult<(Real, Real)> {
        let guess = self.clamped_guess(guess.0, guess.1);
        let sol = inversion::solve_p_t(
            &self.base,
            method,
            pair,
            targets,
            guess,
            |p, t| Ok(a(p, t)),
            |p, t| Ok(b(p, t)),
        )?;
        Ok((sol.x, sol.y))
    }

    /// Temperature at pressure `p` where spline `prop` equals `target`.
    fn solve_t(
        &self,
        method: &'static str,
        prop: TabulatedProperty,
        p: Real,
        target: Real,
    ) -> FluidResult<Real> {
        let spline = self
            .spline(prop)
            .ok_or_else(|| self.base.not_implemented(method))?;
        let (p, _) = self.check_p_t(p, self.temperature[0])?;
        let (_, t0) = self.clamped_guess(p, self.initial_guess().1);
        let sol = inversion::solve_scalar(
            &self.base,
            method,
            || format!("(p, {prop}) = ({p}, {target}) to T"),
            target,
            t0,
            |t| {
                let w = spline.sample(p, t);
                Ok((w.value, w.d2))
            },
        )?;
        Ok(self.check_p_t(p, sol.x)?.1)
    }

    /// (p, T) for a (v, e) query, from the initial guess.
    fn p_t_at(&self, v: Real, e: Real) -> FluidResult<(Real, Real)> {
        let (p0, t0) = self.initial_guess();
        self.p_t_from_v_e(v, e, p0, t0)
    }

    fn via_v_e_derivs(
        &self,
        v: Real,
        e: Real,
        f: impl FnOnce(&Self, Real, Real) -> FluidResult<WithPartials>,
    ) -> FluidResult<WithPartials> {
        let (p, t) = self.p_t_at(v, e)?;
        let dpt = inversion::sensitivity(
            self.v_from_p_t_derivs(p, t)?,
            self.e_from_p_t_derivs(p, t)?,
        )?;
        Ok(inversion::through(f(self, p, t)?, &dpt))
    }

    /// `prop` at (v, e) from the direct (v, e) spline, else `f` at the (p, T)
    /// given by the lookup table or the Newton conversion.
    fn value_on_v_e(
        &self,
        prop: TabulatedProperty,
        v: Real,
        e: Real,
        f: impl FnOnce(&Self, Real, Real) -> FluidResult<Real>,
    ) -> FluidResult<Real> {
        if let Some(ve) = &self.ve {
            let (v, e) = self.check_v_e(ve, v, e)?;
            if let Some(spline) = ve.spline(prop) {
                return Ok(spline.sample(v, e).value);
            }
            if let Some(lookup) = &ve.from_v_e {
                let (p, t) = lookup.sample(v, e);
                return f(self, p.value, t.value);
            }
        }
        let (p, t) = self.p_t_at(v, e)?;
        f(self, p, t)
    }

    fn derivs_on_v_e(
        &self,
        prop: TabulatedProperty,
        v: Real,
        e: Real,
        f: impl FnOnce(&Self, Real, Real) -> FluidResult<WithPartials>,
    ) -> FluidResult<WithPartials> {
        if let Some(ve) = &self.ve {
            let (v, e) = self.check_v_e(ve, v, e)?;
            if let Some(spline) = ve.spline(prop) {
                return Ok(spline.sample(v, e));
            }
            if let Some(lookup) = &ve.from_v_e {
                let (p, t) = lookup.sample(v, e);
                return Ok(compose(f(self, p.value, t.value)?, p, t));
            }
        }
        self.via_v_e_derivs(v, e, f)
    }

    /// `prop` sampled on its direct (v, e) spline, if there is one.
    fn direct_v_e(
        &self,
        prop: TabulatedProperty,
        v: Real,
        e: Real,
    ) -> FluidResult<Option<WithPartials>> {
        match self.ve.as_ref().and_then(|ve| Some((ve, ve.spline(prop)?))) {
            Some((ve, spline)) => {
                let (v, e) = self.check_v_e(ve, v, e)?;
                Ok(Some(spline.sample(v, e)))
            }
            None => Ok(None),
        }
    }

    /// (p, T) from the (v, h) lookup, with the out-of-bounds policy applied to (v, h).
    fn lookup_v_h(&self, v: Real, h: Real) -> FluidResult<Option<(WithPartials, WithPartials)>> {
        let Some((ve, (lookup, enthalpy))) = self
            .ve
            .as_ref()
            .and_then(|ve| ve.from_v_h.as_ref().map(|l| (ve, l)))
        else {
            return Ok(None);
        };
        let (v_min, v_max) = ve.v_range();
        let v = self.check_one("specific volume", v, v_min, v_max)?;
        let h = self.check_one("enthalpy", h, enthalpy[0], enthalpy[enthalpy.len() - 1])?;
        Ok(Some(lookup.sample(v, h)))
    }

    fn pair(
        &self,
        a: TabulatedProperty,
        b: TabulatedProperty,
    ) -> Option<(&BicubicSpline, &BicubicSpline)> {
        Some((self.spline(a)?, self.spline(b)?))
    }
}

/// Evaluate `properties` of `source` on `grid`, one pressure row per task.
pub fn tabulate(
    source: &dyn SinglePhaseFluid,
    grid: &TabulationGrid,
    properties: &[TabulatedProperty],
) -> FluidResult<PropertyTable> {
    grid.validate()?;
    if let Some(prop) = properties.iter().find(|p| !TabulatedProperty::P_T.contains(p)) {
        return Err(FluidError::config(format!(
            "'{prop}' cannot be tabulated on a (p, T) grid"
        )));
    }
    info!(
        fluid = %source.base().name(),
        num_p = grid.num_p,
        num_t = grid.num_t,
        "generating tabulated properties"
    );
    let pressure = grid.pressures();
    let temperature = grid.temperatures();

    let rows = pressure
        .par_iter()
        .map(|&p| {
            temperature
                .iter()
                .map(|&t| {
                    properties
                        .iter()
                        .map(|prop| evaluate(source, *prop, p, t))
                        .collect::<FluidResult<Vec<Real>>>()
                })
                .collect::<FluidResult<Vec<Vec<Real>>>>()
        })
        .collect::<FluidResult<Vec<_>>>()?;

    let columns = properties
        .iter()
        .enumerate()
        .map(|(k, prop)| {
            let values = DMatrix::from_fn(pressure.len(), temperature.len(), |i, j| rows[i][j][k]);
            (*prop, values)
        })
        .collect();
    Ok(PropertyTable {
        variables: GridVariables::PressureTemperature,
        axis1: pressure,
        axis2: temperature,
        columns,
    })
}

/// One spline per column of `table`.
fn splines_on(table: &PropertyTable) -> FluidResult<Vec<(TabulatedProperty, BicubicSpline)>> {
    table
        .columns
        .iter()
        .map(|(prop, values)| {
            let spline = BicubicSpline::new(table.axis1.clone(), table.axis2.clone(), values.clone())?;
            Ok((*prop, spline))
        })
        .collect()
}

fn read_ve_options(r: &mut ParamReader<'_>) -> FluidResult<VolumeEnergyOptions> {
    let d = VolumeEnergyGrid::default();
    let mut bounds = |min: &'static str, max: &'static str| -> FluidResult<Option<(Real, Real)>> {
        match (r.optional_real(min)?, r.optional_real(max)?) {
            (Some(lo), Some(hi)) => Ok(Some((lo, hi))),
            (None, None) => Ok(None),
            _ => Err(FluidError::config(format!(
                "either both or none of '{min}' and '{max}' should be given"
            ))),
        }
    };
    let v_bounds = bounds("v_min", "v_max")?;
    let e_bounds = bounds("e_min", "e_max")?;
    Ok(VolumeEnergyOptions {
        direct: r.boolean("create_ve_interpolations", false)?,
        p_t_from_v_e: r.boolean("construct_pT_from_ve", false)?,
        p_t_from_v_h: r.boolean("construct_pT_from_vh", false)?,
        grid: VolumeEnergyGrid {
            v_bounds,
            e_bounds,
            num_v: r.count("num_v", d.num_v)?,
            num_e: r.count("num_e", d.num_e)?,
            log_v: r.boolean("use_log_grid_v", d.log_v)?,
            log_e: r.boolean("use_log_grid_e", d.log_e)?,
            log_h: r.boolean("use_log_grid_h", d.log_h)?,
        },
    })
}

/// `table.csv` -> `table_ve.csv`
fn ve_file_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_ve.csv"))
}

fn evaluate(fp: &dyn SinglePhaseFluid, prop: TabulatedProperty, p: Real, t: Real) -> FluidResult<Real> {
    match prop {
        TabulatedProperty::Density => fp.rho_from_p_t(p, t),
        TabulatedProperty::Enthalpy => fp.h_from_p_t(p, t),
        TabulatedProperty::InternalEnergy => fp.e_from_p_t(p, t),
        TabulatedProperty::Viscosity => fp.mu_from_p_t(p, t),
        TabulatedProperty::ThermalConductivity => fp.k_from_p_t(p, t),
        TabulatedProperty::SpeedOfSound => fp.c_from_p_t(p, t),
        TabulatedProperty::Cv => fp.cv_from_p_t(p, t),
        TabulatedProperty::Cp => fp.cp_from_p_t(p, t),
        TabulatedProperty::Entropy => fp.s_from_p_t(p, t),
        TabulatedProperty::Pressure => Ok(p),
        TabulatedProperty::Temperature => Ok(t),
    }
}

impl SinglePhaseFluid for TabulatedFluidProperties {
    fn base(&self) -> &FluidPropertiesBase {
        &self.base
    }

    fn fluid_name(&self) -> &str {
        match &self.source {
            Some(fp) => fp.fluid_name(),
            None => "tabulated",
        }
    }

    forwarded_metadata!(
        molar_mass,
        critical_pressure,
        critical_temperature,
        critical_density,
        critical_internal_energy,
        triple_point_pressure,
        triple_point_temperature,
    );

    fn vapor_pressure(&self, t: Real) -> FluidResult<Real> {
        self.forward("vapor_pressure")?.vapor_pressure(t)
    }

    fn vapor_pressure_derivs(&self, t: Real) -> FluidResult<(Real, Real)> {
        self.forward("vapor_pressure_derivs")?.vapor_pressure_derivs(t)
    }

    fn vapor_temperature(&self, p: Real) -> FluidResult<Real> {
        self.forward("vapor_temperature")?.vapor_temperature(p)
    }

    fn vapor_temperature_derivs(&self, p: Real) -> FluidResult<(Real, Real)> {
        self.forward("vapor_temperature_derivs")?.vapor_temperature_derivs(p)
    }

    tabulated_p_t! {
        Density => rho_from_p_t, rho_from_p_t_derivs;
        Enthalpy => h_from_p_t, h_from_p_t_derivs;
        InternalEnergy => e_from_p_t, e_from_p_t_derivs;
        Viscosity => mu_from_p_t, mu_from_p_t_derivs;
        ThermalConductivity => k_from_p_t, k_from_p_t_derivs;
        SpeedOfSound => c_from_p_t, c_from_p_t_derivs;
        Cv => cv_from_p_t, cv_from_p_t_derivs;
        Cp => cp_from_p_t, cp_from_p_t_derivs;
        Entropy => s_from_p_t, s_from_p_t_derivs;
    }

    on_v_e! {
        SpeedOfSound => c_from_v_e, c_from_v_e_derivs => c_from_p_t, c_from_p_t_derivs;
        Cp => cp_from_v_e, cp_from_v_e_derivs => cp_from_p_t, cp_from_p_t_derivs;
        Cv => cv_from_v_e, cv_from_v_e_derivs => cv_from_p_t, cv_from_p_t_derivs;
        Viscosity => mu_from_v_e, mu_from_v_e_derivs => mu_from_p_t, mu_from_p_t_derivs;
        ThermalConductivity => k_from_v_e, k_from_v_e_derivs => k_from_p_t, k_from_p_t_derivs;
        Entropy => s_from_v_e, s_from_v_e_derivs => s_from_p_t, s_from_p_t_derivs;
    }

    /// Direct (v, e) spline, else `e + p(v, e) v`.
    fn h_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        if let Some(w) = self.direct_v_e(TabulatedProperty::Enthalpy, v, e)? {
            return Ok(w.value);
        }
        Ok(e + self.p_from_v_e(v, e)? * v)
    }

    fn h_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        if let Some(w) = self.direct_v_e(TabulatedProperty::Enthalpy, v, e)? {
            return Ok(w);
        }
        let p = self.p_from_v_e_derivs(v, e)?;
        Ok(WithPartials::new(
            e + p.value * v,
            p.value + v * p.d1,
            1.0 + v * p.d2,
        ))
    }

    fn p_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        self.value_on_v_e(TabulatedProperty::Pressure, v, e, |_, p, _| Ok(p))
    }

    fn p_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        self.derivs_on_v_e(TabulatedProperty::Pressure, v, e, |_, p, _| {
            Ok(WithPartials::new(p, 1.0, 0.0))
        })
    }

    fn t_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        self.value_on_v_e(TabulatedProperty::Temperature, v, e, |_, _, t| Ok(t))
    }

    fn t_from_v_e_derivs(&self, v: Real, e: Real) -> FluidResult<WithPartials> {
        self.derivs_on_v_e(TabulatedProperty::Temperature, v, e, |_, _, t| {
            Ok(WithPartials::new(t, 0.0, 1.0))
        })
    }

    /// `g = h - T s`
    fn g_from_v_e(&self, v: Real, e: Real) -> FluidResult<Real> {
        let (p, t) = self.p_t_at(v, e)?;
        Ok(self.h_from_p_t(p, t)? - t * self.s_from_p_t(p, t)?)
    }

    fn mu_from_rho_t(&self, rho: Real, t: Real) -> FluidResult<Real> {
        match self.spline(TabulatedProperty::Viscosity) {
            Some(_) => {
                let p = self.p_from_rho_t(rho, t)?;
                self.mu_from_p_t(p, t)
            }
            None => self.forward("mu_from_rho_t")?.mu_from_rho_t(rho, t),
        }
    }

    fn k_from_rho_t(&self, rho: Real, t: Real) -> FluidResult<Real> {
        match self.spline(TabulatedProperty::ThermalConductivity) {
            Some(_) => {
                let p = self.p_from_rho_t(rho, t)?;
                self.k_from_p_t(p, t)
            }
            None => self.forward("k_from_rho_t")?.k_from_rho_t(rho, t),
        }
    }

    /// Both from the table at the same (p, T), bypassing the (rho, T) inversion.
    fn rho_mu_from_p_t(&self, p: Real, t: Real) -> FluidResult<(Real, Real)> {
        Ok((self.rho_from_p_t(p, t)?, self.mu_from_p_t(p, t)?))
    }

    fn rho_mu_from_p_t_derivs(
        &self,
        p: Real,
        t: Real,
    ) -> FluidResult<(WithPartials, WithPartials)> {
        Ok((self.rho_from_p_t_derivs(p, t)?, self.mu_from_p_t_derivs(p, t)?))
    }

    fn t_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        if self.spline(TabulatedProperty::Density).is_some() {
            self.solve_t("t_from_p_rho", TabulatedProperty::Density, p, rho)
        } else {
            self.forward("t_from_p_rho")?.t_from_p_rho(p, rho)
        }
    }

    fn t_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho(p, rho)?;
        let r = self.rho_from_p_t_derivs(p, t)?;
        Ok(WithPartials::new(t, -r.d1 / r.d2, 1.0 / r.d2))
    }

    fn e_from_p_rho(&self, p: Real, rho: Real) -> FluidResult<Real> {
        let t = self.t_from_p_rho(p, rho)?;
        self.e_from_p_t(p, t)
    }

    fn e_from_p_rho_derivs(&self, p: Real, rho: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_rho_derivs(p, rho)?;
        let e = self.e_from_p_t_derivs(p, t.value)?;
        Ok(WithPartials::new(
            e.value,
            e.d1 + e.d2 * t.d1,
            e.d2 * t.d2,
        ))
    }

    fn t_from_p_h(&self, p: Real, h: Real) -> FluidResult<Real> {
        if self.spline(TabulatedProperty::Enthalpy).is_some() {
            self.solve_t("t_from_p_h", TabulatedProperty::Enthalpy, p, h)
        } else {
            self.forward("t_from_p_h")?.t_from_p_h(p, h)
        }
    }

    fn t_from_p_h_derivs(&self, p: Real, h: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_h(p, h)?;
        let hw = self.h_from_p_t_derivs(p, t)?;
        Ok(WithPartials::new(t, -hw.d1 / hw.d2, 1.0 / hw.d2))
    }

    fn t_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        self.t_from_p_h(p, h)
    }

    fn t_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        let w = self.t_from_p_h_derivs(p, h)?;
        Ok(WithPartials::new(w.value, w.d2, w.d1))
    }

    fn s_from_h_p(&self, h: Real, p: Real) -> FluidResult<Real> {
        let t = self.t_from_p_h(p, h)?;
        self.s_from_p_t(p, t)
    }

    fn s_from_h_p_derivs(&self, h: Real, p: Real) -> FluidResult<WithPartials> {
        let t = self.t_from_p_h_derivs(p, h)?;
        let s = self.s_from_p_t_derivs(p, t.value)?;
        Ok(WithPartials::new(
            s.value,
            s.d2 * t.d2,
            s.d1 + s.d2 * t.d1,
        ))
    }

    fn rho_from_p_s(&self, p: Real, s: Real) -> FluidResult<Real> {
        if self.spline(TabulatedProperty::Entropy).is_some() {
            let t = self.solve_t("rho_from_p_s", TabulatedProperty::Entropy, p, s)?;
            self.rho_from_p_t(p, t)
        } else {
            self.forward("rho_from_p_s")?.rho_from_p_s(p, s)
        }
    }

    fn rho_from_p_s_derivs(&self, p: Real, s: Real) -> FluidResult<WithPartials> {
        if self.spline(TabulatedProperty::Entropy).is_none() {
            return self.forward("rho_from_p_s_derivs")?.rho_from_p_s_derivs(p, s);
        }
        let t = self.solve_t("rho_from_p_s", TabulatedProperty::Entropy, p, s)?;
        let sw = self.s_from_p_t_derivs(p, t)?;
        let rho = self.rho_from_p_t_derivs(p, t)?;
        let (dt_dp, dt_ds) = (-sw.d1 / sw.d2, 1.0 / sw.d2);
        Ok(WithPartials::new(
            rho.value,
            rho.d1 + rho.d2 * dt_dp,
            rho.d2 * dt_ds,
        ))
    }

    fn e_from_v_h(&self, v: Real, h: Real) -> FluidResult<Real> {
        if let Some((p, t)) = self.lookup_v_h(v, h)? {
            return self.e_from_p_t(p.value, t.value);
        }
        let (p0, t0) = self.initial_guess();
        let (p, t) = self.p_t_from_v_h(v, h, p0, t0)?;
        self.e_from_p_t(p, t)
    }

    fn e_from_v_h_derivs(&self, v: Real, h: Real) -> FluidResult<WithPartials> {
        if let Some((p, t)) = self.lookup_v_h(v, h)? {
            return Ok(compose(self.e_from_p_t_derivs(p.value, t.value)?, p, t));
        }
        let (p0, t0) = self.initial_guess();
        let (p, t) = self.p_t_from_v_h(v, h, p0, t0)?;
        let dpt = inversion::sensitivity(
            self.v_from_p_t_derivs(p, t)?,
            self.h_from_p_t_derivs(p, t)?,
        )?;
        Ok(inversion::through(self.e_from_p_t_derivs(p, t)?, &dpt))
    }

    fn p_t_from_v_e(&self, v: Real, e: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        use TabulatedProperty::{Density, InternalEnergy};
        match self.pair(Density, InternalEnergy) {
            Some((rho, energy)) => self.solve_p_t(
                "p_t_from_v_e",
                "(v, e)",
                (v, e),
                (p0, t0),
                |p, t| {
                    let r = rho.sample(p, t);
                    r.chain(1.0 / r.value, -1.0 / (r.value * r.value))
                },
                |p, t| energy.sample(p, t),
            ),
            None => self.forward("p_t_from_v_e")?.p_t_from_v_e(v, e, p0, t0),
        }
    }

    fn p_t_from_v_h(&self, v: Real, h: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        use TabulatedProperty::{Density, Enthalpy};
        match self.pair(Density, Enthalpy) {
            Some((rho, enthalpy)) => self.solve_p_t(
                "p_t_from_v_h",
                "(v, h)",
                (v, h),
                (p0, t0),
                |p, t| {
                    let r = rho.sample(p, t);
                    r.chain(1.0 / r.value, -1.0 / (r.value * r.value))
                },
                |p, t| enthalpy.sample(p, t),
            ),
            None => self.forward("p_t_from_v_h")?.p_t_from_v_h(v, h, p0, t0),
        }
    }

    fn p_t_from_h_s(&self, h: Real, s: Real, p0: Real, t0: Real) -> FluidResult<(Real, Real)> {
        use TabulatedProperty::{Enthalpy, Entropy};
        match self.pair(Enthalpy, Entropy) {
            Some((enthalpy, entropy)) => self.solve_p_t(
                "p_t_from_h_s",
                "(h, s)",
                (h, s),
                (p0, t0),
                |p, t| enthalpy.sample(p, t),
                |p, t| entropy.sample(p, t),
            ),
            None => self.forward("p_t_from_h_s")?.p_t_from_h_s(h, s, p0, t0),
        }
    }
}

impl TabulatedFluidProperties {
    /// Pressure at which the tabulated density equals `rho` at temperature `t`.
    fn p_from_rho_t(&self, rho: Real, t: Real) -> FluidResult<Real> {
        let spline = self
            .spline(TabulatedProperty::Density)
            .ok_or_else(|| self.base.not_implemented("p_from_rho_t"))?;
        let (_, t) = self.check_p_t(self.pressure[0], t)?;
        let (p0, _) = self.clamped_guess(self.initial_guess().0, t);
        let sol = inversion::solve_scalar(
            &self.base,
            "p_from_rho_t",
            || format!("(rho, T) = ({rho}, {t}) to p"),
            rho,
            p0,
            |p| {
                let w = spline.sample(p, t);
                Ok((w.value, w.d1))
            },
        )?;
        Ok(self.check_p_t(sol.x, t)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluids::IdealGasFluidProperties;

    fn air_table(oob: OutOfBounds) -> TabulatedFluidProperties {
        let source: Arc<dyn SinglePhaseFluid> = Arc::new(IdealGasFluidProperties::new("air"));
        let grid = TabulationGrid {
            pressure_min: 1e5,
            pressure_max: 1e6,
            temperature_min: 300.0,
            temperature_max: 600.0,
            num_p: 20,
            num_t: 20,
        };
        TabulatedFluidProperties::generate(
            "air_tab",
            FluidPropertiesParams::default(),
            source,
            &grid,
            &TabulatedProperty::P_T[..4],
            oob,
        )
        .unwrap()
    }

    #[test]
    fn generated_table_matches_source_at_nodes() {
        let tab = air_table(OutOfBounds::Throw);
        let p = tab.pressure[3];
        let t = tab.temperature[7];
        let air = IdealGasFluidProperties::new("air");
        let rho = tab.rho_from_p_t(p, t).unwrap();
        assert!((rho - air.rho_from_p_t(p, t).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn out_of_bounds_policies() {
        let strict = air_table(OutOfBounds::Throw);
        assert!(matches!(
            strict.rho_from_p_t(2e6, 400.0),
            Err(FluidError::OutOfBounds { what: "pressure", .. })
        ));

        let clamp = air_table(OutOfBounds::SetToClosestBound);
        let at_bound = clamp.rho_from_p_t(1e6, 400.0).unwrap();
        assert_eq!(clamp.rho_from_p_t(2e6, 400.0).unwrap(), at_bound);

        let warn = air_table(OutOfBounds::WarnAndClamp);
        assert_eq!(warn.rho_from_p_t(2e6, 400.0).unwrap(), at_bound);
        assert!(!warn.base().warn_once("pressure", String::new));

        let loose = air_table(OutOfBounds::Ignore);
        assert!(loose.rho_from_p_t(1.1e6, 400.0).unwrap() > at_bound);
    }

    #[test]
    fn unavailable_property_is_forwarded() {
        let tab = air_table(OutOfBounds::Throw);
        let k = tab.k_from_p_t(2e5, 400.0).unwrap();
        assert!((k - 25.68e-3).abs() < 1e-15);
        assert_eq!(tab.molar_mass().unwrap(), 29.0e-3);
        assert_eq!(tab.fluid_name(), "ideal_gas");
    }

    #[test]
    fn missing_property_without_source_is_not_implemented() {
        let tab = air_table(OutOfBounds::Throw);
        let standalone = TabulatedFluidProperties::from_table(
            "standalone",
            FluidPropertiesParams::default(),
            tab.table(),
            None,
            OutOfBounds::Throw,
        )
        .unwrap();
        assert!(matches!(
            standalone.k_from_p_t(2e5, 400.0),
            Err(FluidError::NotImplemented { .. })
        ));
        assert!(standalone.rho_from_p_t(2e5, 400.0).is_ok());
    }

    #[test]
    fn v_e_conversion_on_splines() {
        let tab = air_table(OutOfBounds::Throw);
        let air = IdealGasFluidProperties::new("air");
        let (v, e) = air.v_e_from_p_t(4.4e5, 455.0).unwrap();
        let (p, t) = tab.p_t_from_v_e(v, e, 2e5, 350.0).unwrap();
        assert!((p - 4.4e5).abs() / 4.4e5 < 1e-4);
        assert!((t - 455.0).abs() < 1e-2);
        let h = tab.h_from_p_t(4.4e5, 455.0).unwrap();
        assert!((tab.t_from_p_h(4.4e5, h).unwrap() - 455.0).abs() < 1e-6);
    }

    #[test]
    fn grid_validation() {
        let grid = TabulationGrid {
            temperature_max: 200.0,
            ..TabulationGrid::default()
        };
        assert!(grid.validate().is_err());
        let grid = TabulationGrid {
            num_p: 1,
            ..TabulationGrid::default()
        };
        assert!(grid.validate().is_err());
        assert_eq!(TabulationGrid::default().pressures().len(), 100);
    }

    #[test]
    fn declare_invalid_clamps_and_counts() {
        let tab = air_table(OutOfBounds::DeclareInvalid);
        let at_bound = tab.rho_from_p_t(1e6, 400.0).unwrap();
        assert_eq!(tab.invalid_evaluations(), 0);
        assert_eq!(tab.rho_from_p_t(2e6, 400.0).unwrap(), at_bound);
        assert!(tab.rho_from_p_t(5e5, 700.0).is_ok());
        assert_eq!(tab.invalid_evaluations(), 2);
    }

    fn air_with_ve(options: VolumeEnergyOptions) -> TabulatedFluidProperties {
        use TabulatedProperty::*;
        air_table(OutOfBounds::Throw)
            .with_volume_energy(&options, &[Density, Viscosity, Pressure, Temperature], None)
            .unwrap()
    }

    fn log_v_grid() -> VolumeEnergyGrid {
        VolumeEnergyGrid {
            num_v: 40,
            num_e: 20,
            log_v: true,
            ..VolumeEnergyGrid::default()
        }
    }

    #[test]
    fn direct_v_e_tables() {
        let tab = air_with_ve(VolumeEnergyOptions {
            direct: true,
            grid: log_v_grid(),
            ..VolumeEnergyOptions::default()
        });
        let air = IdealGasFluidProperties::new("air");
        let ((v_min, v_max), (e_min, e_max)) = tab.volume_energy_range().unwrap();
        assert!((v_min - air.v_from_p_t(1e6, 300.0).unwrap()).abs() < 1e-12);
        assert!((v_max - air.v_from_p_t(1e5, 600.0).unwrap()).abs() < 1e-12);
        assert!((e_min - air.e_from_p_t(1e5, 300.0).unwrap()).abs() < 1e-9);
        assert!((e_max - air.e_from_p_t(1e5, 600.0).unwrap()).abs() < 1e-9);

        let (v, e) = air.v_e_from_p_t(4e5, 450.0).unwrap();
        let p = tab.p_from_v_e_derivs(v, e).unwrap();
        assert!((p.value - 4e5).abs() / 4e5 < 1e-4);
        assert!((p.d1 + 4e5 / v).abs() / (4e5 / v) < 1e-2);
        assert!((tab.t_from_v_e(v, e).unwrap() - 450.0).abs() < 1e-6);

        assert!(matches!(
            tab.p_from_v_e(10.0 * v_max, e),
            Err(FluidError::OutOfBounds { what: "specific volume", .. })
        ));
        assert!(matches!(
            tab.t_from_v_e(v, 0.5 * e_min),
            Err(FluidError::OutOfBounds { what: "internal energy", .. })
        ));
        let written = tab.ve_table().unwrap();
        assert_eq!(written.axis1.len(), 40);
        assert_eq!(written.columns.len(), 4);
    }

    #[test]
    fn lookup_tables_feed_p_t_forms() {
        let tab = air_with_ve(VolumeEnergyOptions {
            p_t_from_v_e: true,
            p_t_from_v_h: true,
            grid: log_v_grid(),
            ..VolumeEnergyOptions::default()
        });
        let air = IdealGasFluidProperties::new("air");
        let (p, t) = (4e5, 450.0);
        let (v, e) = air.v_e_from_p_t(p, t).unwrap();
        assert!((tab.t_from_v_e(v, e).unwrap() - t).abs() < 1e-6);
        let c = tab.c_from_v_e(v, e).unwrap();
        assert!((c - air.c_from_p_t(p, t).unwrap()).abs() < 1e-6);
        let cv = tab.t_from_v_e_derivs(v, e).unwrap();
        assert!((cv.d2 - 1.0 / air.cv_from_v_e(v, e).unwrap()).abs() < 1e-9);

        let h = air.h_from_p_t(p, t).unwrap();
        let from_h = tab.e_from_v_h(v, h).unwrap();
        assert!((from_h - e).abs() / e < 1e-4);

        // lookup nodes show up as columns of the (v, e) table
        let table = tab.ve_table().unwrap();
        assert!(table.column(TabulatedProperty::Pressure).is_some());
        assert!(table.column(TabulatedProperty::Temperature).is_some());
    }

    #[test]
    fn direct_tables_need_a_source_or_file() {
        let standalone = TabulatedFluidProperties::from_table(
            "standalone",
            FluidPropertiesParams::default(),
            air_table(OutOfBounds::Throw).table(),
            None,
            OutOfBounds::Throw,
        )
        .unwrap();
        let options = VolumeEnergyOptions {
            direct: true,
            ..VolumeEnergyOptions::default()
        };
        let err = standalone
            .with_volume_energy(&options, &[TabulatedProperty::Pressure], None)
            .unwrap_err();
        assert!(err.to_string().contains("fluid_property_ve_file"));
    }

    #[test]
    fn p_t_tables_reject_v_e_only_properties() {
        let source = IdealGasFluidProperties::new("air");
        let err = tabulate(
            &source,
            &TabulationGrid::default(),
            &[TabulatedProperty::Density, TabulatedProperty::Pressure],
        )
        .unwrap_err();
        assert!(matches!(err, FluidError::Config { .. }));
    }

    #[test]
    fn ve_output_name_follows_main_file() {
        assert_eq!(
            ve_file_name(Path::new("/tmp/water.csv")),
            PathBuf::from("/tmp/water_ve.csv")
        );
    }
}
