//! Closed-form fluids.

mod caloric_imperfect_gas;
mod flibe;
mod helium;
mod ideal_gas;
mod simple;
mod sodium;

pub use caloric_imperfect_gas::CaloricallyImperfectGasFluidProperties;
pub use flibe::FlibeFluidProperties;
pub use helium::HeliumFluidProperties;
pub use ideal_gas::IdealGasFluidProperties;
pub use simple::SimpleFluidProperties;
pub use sodium::SodiumLiquidFluidProperties;
