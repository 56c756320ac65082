//! Fluid objects are shared read-only across threads.

use std::sync::Arc;
use std::thread;

use fp_fluids::fluids::HeliumFluidProperties;
use fp_fluids::tabulated::TabulatedProperty;
use fp_fluids::{
    FluidPropertiesParams, OutOfBounds, SinglePhaseFluid, TabulatedFluidProperties,
    TabulationGrid,
};

#[test]
fn shared_fluid_gives_identical_answers() {
    let he: Arc<dyn SinglePhaseFluid> = Arc::new(HeliumFluidProperties::new("he"));
    let grid = TabulationGrid {
        pressure_min: 1e5,
        pressure_max: 7e6,
        temperature_min: 300.0,
        temperature_max: 1000.0,
        num_p: 20,
        num_t: 20,
    };
    let tab: Arc<dyn SinglePhaseFluid> = Arc::new(
        TabulatedFluidProperties::generate(
            "he_tab",
            FluidPropertiesParams::default(),
            Arc::clone(&he),
            &grid,
            &TabulatedProperty::DEFAULT_SET,
            OutOfBounds::Throw,
        )
        .unwrap(),
    );

    let states: Vec<(f64, f64)> = (0..8)
        .map(|i| (1e6 + 5e5 * i as f64, 400.0 + 50.0 * i as f64))
        .collect();
    let expected: Vec<_> = states
        .iter()
        .map(|&(p, t)| {
            let (v, e) = he.v_e_from_p_t(p, t).unwrap();
            (
                he.p_t_from_v_e(v, e, 0.7 * p, 0.9 * t).unwrap(),
                tab.rho_from_p_t(p, t).unwrap(),
            )
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let he = Arc::clone(&he);
            let tab = Arc::clone(&tab);
            let states = states.clone();
            thread::spawn(move || {
                states
                    .iter()
                    .map(|&(p, t)| {
                        let (v, e) = he.v_e_from_p_t(p, t).unwrap();
                        (
                            he.p_t_from_v_e(v, e, 0.7 * p, 0.9 * t).unwrap(),
                            tab.rho_from_p_t(p, t).unwrap(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
