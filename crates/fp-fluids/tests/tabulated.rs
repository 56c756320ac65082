//! Tabulated fluid: generation, CSV round trip and construction from parameters.

use std::sync::Arc;

use fp_fluids::fluids::{IdealGasFluidProperties, SimpleFluidProperties};
use fp_fluids::tabulated::{GridVariables, PropertyTable, TabulatedProperty};
use fp_fluids::{
    FluidError, FluidPropertiesParams, FluidRegistry, FluidSetDef, OutOfBounds, SinglePhaseFluid,
    TabulatedFluidProperties, TabulationGrid,
};

fn water_grid() -> TabulationGrid {
    TabulationGrid {
        pressure_min: 1e5,
        pressure_max: 1e7,
        temperature_min: 280.0,
        temperature_max: 370.0,
        num_p: 12,
        num_t: 15,
    }
}

fn water_table() -> TabulatedFluidProperties {
    let source: Arc<dyn SinglePhaseFluid> = Arc::new(SimpleFluidProperties::new("water"));
    TabulatedFluidProperties::generate(
        "water_tab",
        FluidPropertiesParams::default(),
        source,
        &water_grid(),
        &TabulatedProperty::P_T,
        OutOfBounds::Throw,
    )
    .unwrap()
}

#[test]
fn interpolation_tracks_source() {
    let tab = water_table();
    let water = SimpleFluidProperties::new("water");
    for &(p, t) in &[(3.3e5, 291.0), (4.1e6, 333.3), (9.9e6, 369.0)] {
        let exact = water.rho_from_p_t(p, t).unwrap();
        let rho = tab.rho_from_p_t(p, t).unwrap();
        assert!((rho - exact).abs() / exact < 1e-6, "rho at ({p}, {t})");
        let exact = water.h_from_p_t(p, t).unwrap();
        let h = tab.h_from_p_t(p, t).unwrap();
        assert!((h - exact).abs() / exact < 1e-6, "h at ({p}, {t})");
        let k = tab.k_from_p_t(p, t).unwrap();
        assert!((k - 0.6).abs() < 1e-12);
    }
}

#[test]
fn csv_round_trip() {
    let tab = water_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("water.csv");
    tab.write_csv(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("# simple_fluid properties created by TabulatedFluidProperties"));

    let table = PropertyTable::read_csv(&path, GridVariables::PressureTemperature).unwrap();
    assert_eq!(table.axis1.len(), 12);
    assert_eq!(table.axis2.len(), 15);
    assert_eq!(table.columns.len(), TabulatedProperty::P_T.len());

    let reread = TabulatedFluidProperties::from_csv(
        "reread",
        FluidPropertiesParams::default(),
        &path,
        None,
        OutOfBounds::Throw,
    )
    .unwrap();
    let (p, t) = (2.2e6, 301.0);
    let a = tab.e_from_p_t(p, t).unwrap();
    let b = reread.e_from_p_t(p, t).unwrap();
    assert!((a - b).abs() / a < 1e-12);
    assert_eq!(reread.fluid_name(), "tabulated");
}

#[test]
fn reads_file_named_in_params() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("air.csv");
    let yaml = format!(
        "
- name: air
  type: IdealGasFluidProperties
- name: air_tab
  type: TabulatedFluidProperties
  params:
    fp: air
    num_p: 6
    num_T: 6
    temperature_min: 250.0
    temperature_max: 600.0
    fluid_property_output_file: {out}
- name: air_file
  type: TabulatedFluidProperties
  params:
    fluid_property_file: {out}
    out_of_bounds_behavior: set_to_closest_bound
",
        out = path.display()
    );
    let set = FluidRegistry::with_builtin()
        .build(&FluidSetDef::from_yaml(&yaml).unwrap())
        .unwrap();
    assert!(path.exists());
    let generated = set.get("air_tab").unwrap();
    let from_file = set.get("air_file").unwrap();
    let (p, t) = (7e6, 420.0);
    let a = generated.rho_from_p_t(p, t).unwrap();
    let b = from_file.rho_from_p_t(p, t).unwrap();
    assert!((a - b).abs() / a < 1e-12);
    // clamped to the upper pressure bound rather than failing
    let clamped = from_file.rho_from_p_t(1e8, t).unwrap();
    let at_bound = from_file.rho_from_p_t(50e6, t).unwrap();
    assert!((clamped - at_bound).abs() / at_bound < 1e-12);
    assert!(generated.rho_from_p_t(1e8, t).is_err());
}

#[test]
fn bad_parameters_are_config_errors() {
    let registry = FluidRegistry::with_builtin();
    let def = FluidSetDef::from_yaml(
        "
- name: air
  type: IdealGasFluidProperties
- name: tab
  type: TabulatedFluidProperties
  params: { fp: air, temperature_min: 500.0, temperature_max: 400.0 }
",
    )
    .unwrap();
    assert!(matches!(registry.build(&def), Err(FluidError::Config { .. })));

    let def = FluidSetDef::from_yaml(
        "
- name: tab
  type: TabulatedFluidProperties
  params: { out_of_bounds_behavior: explode }
",
    )
    .unwrap();
    assert!(matches!(registry.build(&def), Err(FluidError::Config { .. })));

    let def = FluidSetDef::from_yaml(
        "
- name: tab
  type: TabulatedFluidProperties
",
    )
    .unwrap();
    let err = registry.build(&def).unwrap_err();
    assert!(err.to_string().contains("fluid_property_file"));

    let def = FluidSetDef::from_yaml(
        "
- name: air
  type: IdealGasFluidProperties
- name: tab
  type: TabulatedFluidProperties
  params: { fp: air, interpolated_properties: [density, pressure] }
",
    )
    .unwrap();
    assert!(registry.build(&def).is_err());
}

#[test]
fn missing_file_without_source_is_io_error() {
    let err = TabulatedFluidProperties::from_csv(
        "tab",
        FluidPropertiesParams::default(),
        std::path::Path::new("/nonexistent/table.csv"),
        None,
        OutOfBounds::Throw,
    )
    .unwrap_err();
    assert!(matches!(err, FluidError::Io { .. }));
}

#[test]
fn conversions_on_the_table() {
    let source: Arc<dyn SinglePhaseFluid> = Arc::new(IdealGasFluidProperties::new("air"));
    let tab = TabulatedFluidProperties::generate(
        "air_tab",
        FluidPropertiesParams::default(),
        Arc::clone(&source),
        &TabulationGrid {
            pressure_min: 1e5,
            pressure_max: 1e6,
            temperature_min: 300.0,
            temperature_max: 600.0,
            num_p: 30,
            num_t: 30,
        },
        &TabulatedProperty::P_T,
        OutOfBounds::Throw,
    )
    .unwrap();
    let (p, t) = (5.5e5, 470.0);
    let (v, e) = source.v_e_from_p_t(p, t).unwrap();
    assert!((tab.p_from_v_e(v, e).unwrap() - p).abs() / p < 1e-4);
    assert!((tab.t_from_v_e(v, e).unwrap() - t).abs() < 1e-2);
    let h = source.h_from_p_t(p, t).unwrap();
    let s = source.s_from_p_t(p, t).unwrap();
    let (p1, t1) = tab.p_t_from_h_s(h, s, 3e5, 400.0).unwrap();
    assert!((p1 - p).abs() / p < 1e-4);
    assert!((t1 - t).abs() < 1e-2);
    let (p2, t2) = tab.p_t_from_v_h(v, h, 3e5, 400.0).unwrap();
    assert!((p2 - p).abs() / p < 1e-4);
    assert!((t2 - t).abs() < 1e-2);

    // beyond the grid the converged state is rejected
    let (v, e) = source.v_e_from_p_t(5e6, 470.0).unwrap();
    assert!(matches!(
        tab.p_t_from_v_e(v, e, 3e5, 400.0),
        Err(FluidError::OutOfBounds { what: "pressure", .. })
    ));
}

#[test]
fn mixed_pressure_blocks_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragged.csv");
    std::fs::write(
        &path,
        "pressure,temperature,density\n1,300,1\n1,400,2\n2,300,3\n2,400,4\n2,300,5\n3,400,6\n",
    )
    .unwrap();
    let err = PropertyTable::read_csv(&path, GridVariables::PressureTemperature).unwrap_err();
    assert!(matches!(err, FluidError::Config { .. }));

    let err = TabulatedFluidProperties::from_csv(
        "ragged",
        FluidPropertiesParams::default(),
        &path,
        None,
        OutOfBounds::Throw,
    )
    .unwrap_err();
    assert!(err.to_string().contains("pressure"));
}

#[test]
fn volume_energy_tables_from_params() {
    let dir = tempfile::tempdir().unwrap();
    let pt = dir.path().join("air.csv");
    let yaml = format!(
        "
- name: air
  type: IdealGasFluidProperties
- name: air_ve
  type: TabulatedFluidProperties
  params:
    fp: air
    num_p: 10
    num_T: 10
    pressure_min: 1.0e5
    pressure_max: 1.0e6
    temperature_min: 300.0
    temperature_max: 600.0
    interpolated_properties: [density, internal_energy, viscosity, pressure, temperature]
    create_ve_interpolations: true
    construct_pT_from_ve: true
    num_v: 30
    num_e: 12
    use_log_grid_v: true
    out_of_bounds_behavior: declare_invalid
    fluid_property_output_file: {pt}
- name: from_files
  type: TabulatedFluidProperties
  params:
    fluid_property_file: {pt}
    fluid_property_ve_file: {ve}
",
        pt = pt.display(),
        ve = dir.path().join("air_ve.csv").display(),
    );
    let set = FluidRegistry::with_builtin()
        .build(&FluidSetDef::from_yaml(&yaml).unwrap())
        .unwrap();
    let text = std::fs::read_to_string(dir.path().join("air_ve.csv")).unwrap();
    assert!(text.lines().nth(1).unwrap().starts_with("specific_volume, internal_energy"));

    let air = IdealGasFluidProperties::new("air");
    let (p, t) = (3e5, 500.0);
    let (v, e) = air.v_e_from_p_t(p, t).unwrap();
    for name in ["air_ve", "from_files"] {
        let fluid = set.get(name).unwrap();
        assert!((fluid.p_from_v_e(v, e).unwrap() - p).abs() / p < 1e-3, "{name}");
        assert!((fluid.t_from_v_e(v, e).unwrap() - t).abs() < 1e-6, "{name}");
    }

    // e beyond the grid is clamped rather than rejected
    let fluid = set.get("air_ve").unwrap();
    let e_max = air.e_from_p_t(1e5, 600.0).unwrap();
    let clamped = fluid.t_from_v_e(v, 2.0 * e_max).unwrap();
    assert!((clamped - 600.0).abs() < 1e-6);
    assert!(set.get("from_files").unwrap().t_from_v_e(v, 2.0 * e_max).is_err());
}

#[test]
fn volume_energy_bounds_come_in_pairs() {
    let def = FluidSetDef::from_yaml(
        "
- name: air
  type: IdealGasFluidProperties
- name: tab
  type: TabulatedFluidProperties
  params: { fp: air, create_ve_interpolations: true, v_min: 0.1 }
",
    )
    .unwrap();
    let err = FluidRegistry::with_builtin().build(&def).unwrap_err();
    assert!(err.to_string().contains("v_max"));
}
