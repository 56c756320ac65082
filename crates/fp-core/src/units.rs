// fp-core/src/units.rs

use uom::si::f64::{
    AvailableEnergy as UomAvailableEnergy, DynamicViscosity as UomDynamicViscosity,
    MassDensity as UomMassDensity, MolarMass as UomMolarMass, Pressure as UomPressure,
    SpecificHeatCapacity as UomSpecificHeatCapacity, SpecificVolume as UomSpecificVolume,
    ThermalConductivity as UomThermalConductivity,
    ThermodynamicTemperature as UomThermodynamicTemperature, Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Density = UomMassDensity;
pub type DynVisc = UomDynamicViscosity;
pub type MolarMass = UomMolarMass;
pub type Pressure = UomPressure;
/// Specific energy [J/kg]: internal energy and enthalpy.
pub type SpecEnergy = UomAvailableEnergy;
/// Specific entropy and specific heats [J/(kg·K)].
pub type SpecHeat = UomSpecificHeatCapacity;
pub type SpecVolume = UomSpecificVolume;
pub type Temperature = UomThermodynamicTemperature;
pub type ThermCond = UomThermalConductivity;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn m3_per_kg(v: f64) -> SpecVolume {
    use uom::si::specific_volume::cubic_meter_per_kilogram;
    SpecVolume::new::<cubic_meter_per_kilogram>(v)
}

#[inline]
pub fn j_per_kg(v: f64) -> SpecEnergy {
    use uom::si::available_energy::joule_per_kilogram;
    SpecEnergy::new::<joule_per_kilogram>(v)
}

#[inline]
pub fn j_per_kg_k(v: f64) -> SpecHeat {
    use uom::si::specific_heat_capacity::joule_per_kilogram_kelvin;
    SpecHeat::new::<joule_per_kilogram_kelvin>(v)
}

#[inline]
pub fn pa_s(v: f64) -> DynVisc {
    use uom::si::dynamic_viscosity::pascal_second;
    DynVisc::new::<pascal_second>(v)
}

#[inline]
pub fn w_per_m_k(v: f64) -> ThermCond {
    use uom::si::thermal_conductivity::watt_per_meter_kelvin;
    ThermCond::new::<watt_per_meter_kelvin>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn kg_per_mol(v: f64) -> MolarMass {
    use uom::si::molar_mass::kilogram_per_mole;
    MolarMass::new::<kilogram_per_mole>(v)
}

pub mod constants {
    /// Universal gas constant [J/(mol·K)]
    pub const R_UNIVERSAL: f64 = 8.314_462_618;

    /// Standard atmosphere [Pa]
    pub const P_ATM: f64 = 101_325.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _t = k(300.0);
        let _rho = kg_per_m3(1000.0);
        let _v = m3_per_kg(1e-3);
        let _e = j_per_kg(1.2e6);
        let _cp = j_per_kg_k(4186.0);
        let _mu = pa_s(1e-3);
        let _k = w_per_m_k(0.6);
        let _c = mps(1400.0);
        let _m = kg_per_mol(0.018);
    }

    #[test]
    fn values_are_stored_in_si() {
        assert_eq!(pa(2.0e5).value, 2.0e5);
        assert_eq!(k(300.0).value, 300.0);
        assert_eq!(j_per_kg(1.0e3).value, 1.0e3);
    }
}
