//! fp-fluids: single-phase fluid properties.
//!
//! Provides:
//! - the [`SinglePhaseFluid`] facade (every property as a value and as value plus partials)
//! - dual-number variants through [`ADFluidProperties`]
//! - closed-form fluids (simple liquid, ideal gas, helium, FLiBe, liquid sodium)
//! - an ideal gas with temperature-dependent specific heats
//! - a tabulated fluid interpolating a (p, T) grid, with optional (v, e) grids,
//!   read from CSV or generated
//! - a registry building named fluids from YAML, and a state interrogator
//!
//! # Example
//!
//! ```
//! use fp_fluids::{SinglePhaseFluid, fluids::IdealGasFluidProperties};
//!
//! let air = IdealGasFluidProperties::new("air");
//! let (v, e) = air.v_e_from_p_t(101_325.0, 300.0).unwrap();
//! let p = air.p_from_v_e(v, e).unwrap();
//! assert!((p - 101_325.0).abs() < 1e-6);
//! ```

pub mod ad;
pub mod base;
pub mod error;
pub mod fluids;
pub mod interrogator;
pub mod inversion;
pub mod params;
pub mod registry;
pub mod single_phase;
pub mod tabulated;

// Re-exports for ergonomics
pub use ad::{ADFluidProperties, ad_from_partials, xy_derivatives};
pub use base::FluidPropertiesBase;
pub use error::{FluidError, FluidResult};
pub use interrogator::{Report, StateSpec, interrogate};
pub use params::{FluidPropertiesParams, ParamBag, ParamValue};
pub use registry::{FluidDef, FluidRegistry, FluidSet, FluidSetDef};
pub use single_phase::SinglePhaseFluid;
pub use tabulated::{OutOfBounds, TabulatedFluidProperties, TabulationGrid};
