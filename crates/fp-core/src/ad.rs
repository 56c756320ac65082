//! Forward-mode automatic differentiation.
//!
//! A [`DualNumber`] carries a value plus a fixed-size vector of partial
//! derivatives with respect to `N` upstream independent variables. The size is
//! part of the type, so dual numbers that are combined in one expression always
//! agree on the length and position convention of their derivative vectors.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use nalgebra::SVector;

use crate::{FpError, FpResult, Real};

/// Number of independent variables tracked by [`ADReal`].
pub const AD_MAX_DOFS: usize = 5;

/// Dual number used by consumers that assemble Jacobian contributions.
pub type ADReal = DualNumber<AD_MAX_DOFS>;

/// A value and its first derivatives with respect to `N` independent variables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualNumber<const N: usize> {
    value: Real,
    derivatives: SVector<Real, N>,
}

impl<const N: usize> DualNumber<N> {
    pub fn new(value: Real, derivatives: SVector<Real, N>) -> Self {
        Self { value, derivatives }
    }

    /// A value that does not depend on any independent variable.
    pub fn constant(value: Real) -> Self {
        Self {
            value,
            derivatives: SVector::zeros(),
        }
    }

    /// An independent variable, seeded with unit derivative at `index`.
    pub fn variable(value: Real, index: usize) -> FpResult<Self> {
        if index >= N {
            return Err(FpError::DerivativeIndex { index, len: N });
        }
        let mut derivatives = SVector::zeros();
        derivatives[index] = 1.0;
        Ok(Self { value, derivatives })
    }

    #[inline]
    pub fn value(&self) -> Real {
        self.value
    }

    #[inline]
    pub fn derivatives(&self) -> &SVector<Real, N> {
        &self.derivatives
    }

    pub fn derivatives_mut(&mut self) -> &mut SVector<Real, N> {
        &mut self.derivatives
    }

    /// Partial derivative with respect to independent variable `index` (zero if out of range).
    pub fn derivative(&self, index: usize) -> Real {
        self.derivatives.get(index).copied().unwrap_or(0.0)
    }

    /// Apply a scalar function with known value `f` and slope `df_dx` at `self.value()`.
    #[inline]
    pub fn chain(&self, f: Real, df_dx: Real) -> Self {
        Self {
            value: f,
            derivatives: self.derivatives * df_dx,
        }
    }

    pub fn recip(self) -> Self {
        let inv = 1.0 / self.value;
        self.chain(inv, -inv * inv)
    }

    pub fn exp(self) -> Self {
        let f = self.value.exp();
        self.chain(f, f)
    }

    pub fn ln(self) -> Self {
        self.chain(self.value.ln(), 1.0 / self.value)
    }

    pub fn sqrt(self) -> Self {
        let f = self.value.sqrt();
        self.chain(f, 0.5 / f)
    }

    pub fn powi(self, n: i32) -> Self {
        let f = self.value.powi(n);
        self.chain(f, Real::from(n) * self.value.powi(n - 1))
    }

    pub fn powf(self, n: Real) -> Self {
        let f = self.value.powf(n);
        self.chain(f, n * self.value.powf(n - 1.0))
    }

    /// `self^exponent` where both base and exponent carry derivatives.
    pub fn powd(self, exponent: Self) -> Self {
        (exponent * self.ln()).exp()
    }

    pub fn abs(self) -> Self {
        if self.value < 0.0 { -self } else { self }
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.derivatives.iter().all(|d| d.is_finite())
    }
}

impl<const N: usize> Default for DualNumber<N> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl<const N: usize> From<Real> for DualNumber<N> {
    fn from(value: Real) -> Self {
        Self::constant(value)
    }
}

impl<const N: usize> fmt::Display for DualNumber<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<const N: usize> Neg for DualNumber<N> {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            derivatives: -self.derivatives,
        }
    }
}

impl<const N: usize> Add for DualNumber<N> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            derivatives: self.derivatives + rhs.derivatives,
        }
    }
}

impl<const N: usize> Sub for DualNumber<N> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            derivatives: self.derivatives - rhs.derivatives,
        }
    }
}

impl<const N: usize> Mul for DualNumber<N> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.value * rhs.value,
            derivatives: self.derivatives * rhs.value + rhs.derivatives * self.value,
        }
    }
}

impl<const N: usize> Div for DualNumber<N> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        Self {
            value: self.value * inv,
            derivatives: (self.derivatives * rhs.value - rhs.derivatives * self.value)
                * (inv * inv),
        }
    }
}

impl<const N: usize> Add<Real> for DualNumber<N> {
    type Output = Self;
    fn add(self, rhs: Real) -> Self {
        Self {
            value: self.value + rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<const N: usize> Sub<Real> for DualNumber<N> {
    type Output = Self;
    fn sub(self, rhs: Real) -> Self {
        Self {
            value: self.value - rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<const N: usize> Mul<Real> for DualNumber<N> {
    type Output = Self;
    fn mul(self, rhs: Real) -> Self {
        Self {
            value: self.value * rhs,
            derivatives: self.derivatives * rhs,
        }
    }
}

impl<const N: usize> Div<Real> for DualNumber<N> {
    type Output = Self;
    fn div(self, rhs: Real) -> Self {
        Self {
            value: self.value / rhs,
            derivatives: self.derivatives / rhs,
        }
    }
}

impl<const N: usize> Add<DualNumber<N>> for Real {
    type Output = DualNumber<N>;
    fn add(self, rhs: DualNumber<N>) -> DualNumber<N> {
        rhs + self
    }
}

impl<const N: usize> Sub<DualNumber<N>> for Real {
    type Output = DualNumber<N>;
    fn sub(self, rhs: DualNumber<N>) -> DualNumber<N> {
        -rhs + self
    }
}

impl<const N: usize> Mul<DualNumber<N>> for Real {
    type Output = DualNumber<N>;
    fn mul(self, rhs: DualNumber<N>) -> DualNumber<N> {
        rhs * self
    }
}

impl<const N: usize> Div<DualNumber<N>> for Real {
    type Output = DualNumber<N>;
    fn div(self, rhs: DualNumber<N>) -> DualNumber<N> {
        rhs.recip() * self
    }
}

impl<const N: usize> AddAssign for DualNumber<N> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const N: usize> SubAssign for DualNumber<N> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const N: usize> MulAssign for DualNumber<N> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
