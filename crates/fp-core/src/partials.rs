use crate::Real;

/// A property value together with its partial derivatives with respect to the
/// two arguments of the query that produced it, in argument order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WithPartials {
    pub value: Real,
    /// d(value)/d(first argument)
    pub d1: Real,
    /// d(value)/d(second argument)
    pub d2: Real,
}

impl WithPartials {
    #[inline]
    pub fn new(value: Real, d1: Real, d2: Real) -> Self {
        Self { value, d1, d2 }
    }

    /// Value with both partials zero.
    #[inline]
    pub fn constant(value: Real) -> Self {
        Self {
            value,
            d1: 0.0,
            d2: 0.0,
        }
    }

    /// Compose with a scalar function `g`: returns `g(value)` given `g` and `g'` at `value`.
    #[inline]
    pub fn chain(self, g: Real, dg: Real) -> Self {
        Self {
            value: g,
            d1: self.d1 * dg,
            d2: self.d2 * dg,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.d1.is_finite() && self.d2.is_finite()
    }
}

impl From<(Real, Real, Real)> for WithPartials {
    fn from((value, d1, d2): (Real, Real, Real)) -> Self {
        Self { value, d1, d2 }
    }
}
