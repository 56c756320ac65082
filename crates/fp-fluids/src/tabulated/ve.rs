//! (v, e) tabulation.
//!
//! Two kinds of interpolation live on a (specific volume, internal energy)
//! grid: properties tabulated directly in (v, e), and lookup tables holding the
//! (p, T) each (v, e) node converts to. A third table maps (v, h) to (p, T).

use fp_core::{Real, WithPartials};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::info;

use super::spline::BicubicSpline;
use super::table::{GridVariables, PropertyTable, TabulatedProperty};
use crate::error::{FluidError, FluidResult};
use crate::single_phase::SinglePhaseFluid;

/// Extent and spacing of the (v, e) grid. Bounds left unset come from the
/// corners of the (p, T) table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeEnergyGrid {
    pub v_bounds: Option<(Real, Real)>,
    pub e_bounds: Option<(Real, Real)>,
    pub num_v: usize,
    pub num_e: usize,
    pub log_v: bool,
    pub log_e: bool,
    /// Log spacing of the enthalpy axis of the (v, h) lookup
    pub log_h: bool,
}

impl Default for VolumeEnergyGrid {
    fn default() -> Self {
        Self {
            v_bounds: None,
            e_bounds: None,
            num_v: 100,
            num_e: 100,
            log_v: false,
            log_e: false,
            log_h: false,
        }
    }
}

impl VolumeEnergyGrid {
    pub fn validate(&self) -> FluidResult<()> {
        if self.num_v < 2 || self.num_e < 2 {
            return Err(FluidError::config("num_v and num_e must be at least 2"));
        }
        if let Some((lo, hi)) = self.v_bounds {
            if !(lo > 0.0 && hi > lo) {
                return Err(FluidError::config(format!(
                    "specific volume bounds ({lo}, {hi}) must be positive and increasing"
                )));
            }
        }
        if let Some((lo, hi)) = self.e_bounds {
            if !(hi > lo) {
                return Err(FluidError::config(format!(
                    "e_max {hi} must be greater than e_min {lo}"
                )));
            }
        }
        Ok(())
    }
}

/// `n` points from `min` to `max`, evenly spaced in the value or its log10.
pub fn grid_axis(what: &str, min: Real, max: Real, n: usize, log: bool) -> FluidResult<Vec<Real>> {
    if log {
        if !(min > 0.0) {
            return Err(FluidError::config(format!(
                "a logarithmic {what} grid needs a positive minimum, found {min}"
            )));
        }
        let (lo, hi) = (min.log10(), max.log10());
        let step = (hi - lo) / (n - 1) as Real;
        Ok((0..n).map(|j| 10.0_f64.powf(lo + j as Real * step)).collect())
    } else {
        let step = (max - min) / (n - 1) as Real;
        Ok((0..n).map(|j| min + j as Real * step).collect())
    }
}

/// What to build on the (v, e) grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeEnergyOptions {
    /// Tabulate the interpolated properties directly in (v, e)
    pub direct: bool,
    /// Lookup table (v, e) -> (p, T)
    pub p_t_from_v_e: bool,
    /// Lookup table (v, h) -> (p, T)
    pub p_t_from_v_h: bool,
    pub grid: VolumeEnergyGrid,
}

impl VolumeEnergyOptions {
    pub fn is_empty(&self) -> bool {
        !(self.direct || self.p_t_from_v_e || self.p_t_from_v_h)
    }
}

/// (p, T) sampled over a pair of variables.
#[derive(Debug, Clone)]
pub(super) struct PTLookup {
    pub p: BicubicSpline,
    pub t: BicubicSpline,
}

impl PTLookup {
    /// `node(a, b, guess)` converts one grid node. Rows of `a` run in
    /// parallel; each row starts from `guess` and reuses the previous node.
    pub fn build<F>(a: &[Real], b: &[Real], guess: (Real, Real), node: F) -> FluidResult<Self>
    where
        F: Fn(Real, Real, (Real, Real)) -> FluidResult<(Real, Real)> + Sync,
    {
        let rows = a
            .par_iter()
            .map(|&x| {
                let mut last = guess;
                b.iter()
                    .map(|&y| {
                        last = node(x, y, last)?;
                        Ok(last)
                    })
                    .collect::<FluidResult<Vec<_>>>()
            })
            .collect::<FluidResult<Vec<_>>>()?;
        let p = DMatrix::from_fn(a.len(), b.len(), |i, j| rows[i][j].0);
        let t = DMatrix::from_fn(a.len(), b.len(), |i, j| rows[i][j].1);
        Ok(Self {
            p: BicubicSpline::new(a.to_vec(), b.to_vec(), p)?,
            t: BicubicSpline::new(a.to_vec(), b.to_vec(), t)?,
        })
    }

    pub fn sample(&self, a: Real, b: Real) -> (WithPartials, WithPartials) {
        (self.p.sample(a, b), self.t.sample(a, b))
    }
}

/// Everything built on the (v, e) grid.
#[derive(Debug, Clone)]
pub(super) struct VolumeEnergyData {
    pub volume: Vec<Real>,
    pub energy: Vec<Real>,
    pub splines: Vec<(TabulatedProperty, BicubicSpline)>,
    pub from_v_e: Option<PTLookup>,
    /// Lookup and its enthalpy axis
    pub from_v_h: Option<(PTLookup, Vec<Real>)>,
}

impl VolumeEnergyData {
    pub fn v_range(&self) -> (Real, Real) {
        (self.volume[0], self.volume[self.volume.len() - 1])
    }

    pub fn e_range(&self) -> (Real, Real) {
        (self.energy[0], self.energy[self.energy.len() - 1])
    }

    pub fn spline(&self, prop: TabulatedProperty) -> Option<&BicubicSpline> {
        self.splines
            .iter()
            .find(|(p, _)| *p == prop)
            .map(|(_, s)| s)
    }

    /// Direct tables, plus the (v, e) lookup as pressure and temperature
    /// columns when those are not tabulated directly.
    pub fn table(&self) -> PropertyTable {
        let mut columns: Vec<_> = self
            .splines
            .iter()
            .filter(|(p, _)| !GridVariables::VolumeEnergy.is_axis(*p))
            .map(|(p, s)| (*p, s.values().clone()))
            .collect();
        if let Some(lookup) = &self.from_v_e {
            for (prop, spline) in [
                (TabulatedProperty::Pressure, &lookup.p),
                (TabulatedProperty::Temperature, &lookup.t),
            ] {
                if self.spline(prop).is_none() {
                    columns.push((prop, spline.values().clone()));
                }
            }
        }
        PropertyTable {
            variables: GridVariables::VolumeEnergy,
            axis1: self.volume.clone(),
            axis2: self.energy.clone(),
            columns,
        }
    }
}

/// Evaluate `properties` of `source` on the (v, e) grid, one volume row per task.
pub fn tabulate_v_e(
    source: &dyn SinglePhaseFluid,
    volume: &[Real],
    energy: &[Real],
    properties: &[TabulatedProperty],
) -> FluidResult<PropertyTable> {
    info!(
        fluid = %source.base().name(),
        num_v = volume.len(),
        num_e = energy.len(),
        "generating (v, e) tabulated properties"
    );
    let rows = volume
        .par_iter()
        .map(|&v| {
            energy
                .iter()
                .map(|&e| {
                    properties
                        .iter()
                        .map(|prop| evaluate_v_e(source, *prop, v, e))
                        .collect::<FluidResult<Vec<Real>>>()
                })
                .collect::<FluidResult<Vec<Vec<Real>>>>()
        })
        .collect::<FluidResult<Vec<_>>>()?;

    let columns = properties
        .iter()
        .enumerate()
        .map(|(k, prop)| {
            let values = DMatrix::from_fn(volume.len(), energy.len(), |i, j| rows[i][j][k]);
            (*prop, values)
        })
        .collect();
    Ok(PropertyTable {
        variables: GridVariables::VolumeEnergy,
        axis1: volume.to_vec(),
        axis2: energy.to_vec(),
        columns,
    })
}

fn evaluate_v_e(
    fp: &dyn SinglePhaseFluid,
    prop: TabulatedProperty,
    v: Real,
    e: Real,
) -> FluidResult<Real> {
    match prop {
        TabulatedProperty::Density => Ok(1.0 / v),
        TabulatedProperty::InternalEnergy => Ok(e),
        TabulatedProperty::Enthalpy => fp.h_from_v_e(v, e),
        TabulatedProperty::Viscosity => fp.mu_from_v_e(v, e),
        TabulatedProperty::ThermalConductivity => fp.k_from_v_e(v, e),
        TabulatedProperty::SpeedOfSound => fp.c_from_v_e(v, e),
        TabulatedProperty::Cv => fp.cv_from_v_e(v, e),
        TabulatedProperty::Cp => fp.cp_from_v_e(v, e),
        TabulatedProperty::Entropy => fp.s_from_v_e(v, e),
        TabulatedProperty::Pressure => fp.p_from_v_e(v, e),
        TabulatedProperty::Temperature => fp.t_from_v_e(v, e),
    }
}

/// Smallest and largest of `f` over the four corners of a (p, T) rectangle.
pub(super) fn corner_range(
    p: (Real, Real),
    t: (Real, Real),
    f: impl Fn(Real, Real) -> FluidResult<Real>,
) -> FluidResult<(Real, Real)> {
    let mut lo = Real::INFINITY;
    let mut hi = Real::NEG_INFINITY;
    for (pi, ti) in [(p.0, t.0), (p.1, t.0), (p.0, t.1), (p.1, t.1)] {
        let x = f(pi, ti)?;
        lo = lo.min(x);
        hi = hi.max(x);
    }
    Ok((lo, hi))
}
