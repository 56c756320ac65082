//! fp-core: shared foundation for the fluid property crates.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - units (uom SI types + constructors)
//! - ad (forward-mode dual numbers with fixed-size derivative vectors)
//! - partials (value + two partial derivatives)
//! - error (shared error types)

pub mod ad;
pub mod error;
pub mod numeric;
pub mod partials;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use ad::{AD_MAX_DOFS, ADReal, DualNumber};
pub use error::{FpError, FpResult};
pub use numeric::*;
pub use partials::WithPartials;
