//! Natural cubic splines in one and two dimensions.

use fp_core::{Real, WithPartials};
use nalgebra::DMatrix;

use crate::error::{FluidError, FluidResult};

/// Knots must number at least two, increase strictly and match the data length.
fn check_knots(axis: &str, x: &[Real], n: usize) -> FluidResult<()> {
    if x.len() < 2 {
        return Err(FluidError::config(format!(
            "a spline needs at least two {axis} knots, found {}",
            x.len()
        )));
    }
    if x.len() != n {
        return Err(FluidError::config(format!(
            "{} {axis} knots but {n} data values",
            x.len()
        )));
    }
    if x.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(FluidError::config(format!(
            "spline {axis} knots must be strictly increasing"
        )));
    }
    Ok(())
}

/// Second derivatives of the natural cubic spline through `(x[i], y(i))`.
fn second_derivatives(x: &[Real], y: impl Fn(usize) -> Real) -> Vec<Real> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope_diff = (y(i + 1) - y(i)) / (x[i + 1] - x[i]) - (y(i) - y(i - 1)) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope_diff / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    if n > 0 {
        y2[n - 1] = 0.0;
    }
    for k in (0..n.saturating_sub(1)).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

/// Value and slope of the spline at `at`. Outside the knots the end
/// polynomials are extended.
fn evaluate(x: &[Real], y: impl Fn(usize) -> Real, y2: &[Real], at: Real) -> (Real, Real) {
    let n = x.len();
    let klo = x.partition_point(|&xi| xi <= at).saturating_sub(1).min(n - 2);
    let khi = klo + 1;
    let h = x[khi] - x[klo];
    let a = (x[khi] - at) / h;
    let b = (at - x[klo]) / h;
    let value = a * y(klo)
        + b * y(khi)
        + ((a * a * a - a) * y2[klo] + (b * b * b - b) * y2[khi]) * h * h / 6.0;
    let slope = (y(khi) - y(klo)) / h - (3.0 * a * a - 1.0) / 6.0 * h * y2[klo]
        + (3.0 * b * b - 1.0) / 6.0 * h * y2[khi];
    (value, slope)
}

/// Natural cubic spline through strictly increasing knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<Real>,
    y: Vec<Real>,
    y2: Vec<Real>,
}

impl CubicSpline {
    /// Needs at least two knots.
    pub fn new(x: Vec<Real>, y: Vec<Real>) -> FluidResult<Self> {
        check_knots("x", &x, y.len())?;
        let y2 = second_derivatives(&x, |i| y[i]);
        Ok(Self { x, y, y2 })
    }

    /// `(value, slope)`
    pub fn sample(&self, at: Real) -> (Real, Real) {
        evaluate(&self.x, |i| self.y[i], &self.y2, at)
    }
}

/// Bicubic spline on a rectangular grid: natural cubic splines along the
/// second axis for every row, then along the first axis through the row values.
#[derive(Debug, Clone)]
pub struct BicubicSpline {
    x1: Vec<Real>,
    x2: Vec<Real>,
    y: DMatrix<Real>,
    /// Second derivatives along x2, stored transposed so column `i` holds row `i`
    y2t: DMatrix<Real>,
}

impl BicubicSpline {
    /// `y` has one row per `x1` knot and one column per `x2` knot.
    pub fn new(x1: Vec<Real>, x2: Vec<Real>, y: DMatrix<Real>) -> FluidResult<Self> {
        check_knots("first axis", &x1, y.nrows())?;
        check_knots("second axis", &x2, y.ncols())?;
        let mut y2t = DMatrix::zeros(x2.len(), x1.len());
        for i in 0..x1.len() {
            let row = second_derivatives(&x2, |j| y[(i, j)]);
            y2t.column_mut(i).copy_from_slice(&row);
        }
        Ok(Self { x1, x2, y, y2t })
    }

    pub fn x1(&self) -> &[Real] {
        &self.x1
    }

    pub fn x2(&self) -> &[Real] {
        &self.x2
    }

    pub fn values(&self) -> &DMatrix<Real> {
        &self.y
    }

    /// Value with partials with respect to (x1, x2).
    pub fn sample(&self, x1: Real, x2: Real) -> WithPartials {
        let (n1, n2) = (self.x1.len(), self.x2.len());
        let y2 = self.y2t.as_slice();
        let mut row_values = Vec::with_capacity(n1);
        let mut row_slopes = Vec::with_capacity(n1);
        for i in 0..n1 {
            let y2_row = &y2[i * n2..(i + 1) * n2];
            let (v, s) = evaluate(&self.x2, |j| self.y[(i, j)], y2_row, x2);
            row_values.push(v);
            row_slopes.push(s);
        }

        let y2_values = second_derivatives(&self.x1, |i| row_values[i]);
        let (value, d1) = evaluate(&self.x1, |i| row_values[i], &y2_values, x1);
        let y2_slopes = second_derivatives(&self.x1, |i| row_slopes[i]);
        let (d2, _) = evaluate(&self.x1, |i| row_slopes[i], &y2_slopes, x1);
        WithPartials::new(value, d1, d2)
    }
}
