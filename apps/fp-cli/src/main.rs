use clap::{Parser, Subcommand};
use fp_fluids::tabulated::{TabulatedProperty, tabulate};
use fp_fluids::{
    FluidError, FluidRegistry, FluidResult, FluidSet, FluidSetDef, SinglePhaseFluid, StateSpec,
    TabulationGrid, interrogate,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fp-cli")]
#[command(about = "Fluid properties CLI - query and tabulate single-phase fluids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fluid types that can appear in a fluid set file
    Types,
    /// List the fluids defined in a fluid set file
    Fluids {
        /// Path to the fluid set YAML file
        fluids_path: PathBuf,
    },
    /// Print every available property at one state
    Interrogate {
        /// Path to the fluid set YAML file
        fluids_path: PathBuf,
        /// Name of the fluid in the set
        name: String,
        /// Pressure [Pa]
        #[arg(long)]
        p: Option<f64>,
        /// Temperature [K]
        #[arg(long = "T")]
        t: Option<f64>,
        /// Density [kg/m^3]
        #[arg(long)]
        rho: Option<f64>,
        /// Specific internal energy [J/kg]
        #[arg(long)]
        e: Option<f64>,
        /// Momentum density [kg/(m^2 s)]
        #[arg(long)]
        rhou: Option<f64>,
        /// Total energy density [J/m^3]
        #[arg(long = "rhoE")]
        rho_e: Option<f64>,
        /// Velocity [m/s]; adds stagnation properties
        #[arg(long)]
        vel: Option<f64>,
    },
    /// Write a (p, T) property table to CSV
    Tabulate {
        /// Path to the fluid set YAML file
        fluids_path: PathBuf,
        /// Name of the fluid in the set
        name: String,
        /// Output CSV file
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1e5)]
        p_min: f64,
        #[arg(long, default_value_t = 50e6)]
        p_max: f64,
        #[arg(long = "T-min", default_value_t = 300.0)]
        t_min: f64,
        #[arg(long = "T-max", default_value_t = 500.0)]
        t_max: f64,
        #[arg(long, default_value_t = 100)]
        num_p: usize,
        #[arg(long = "num-T", default_value_t = 100)]
        num_t: usize,
        /// Comma-separated column names (density, enthalpy, internal_energy, viscosity, k, c, cv, cp, entropy)
        #[arg(long, value_delimiter = ',')]
        properties: Vec<String>,
    },
}

fn main() -> FluidResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Types => cmd_types(),
        Commands::Fluids { fluids_path } => cmd_fluids(&fluids_path),
        Commands::Interrogate {
            fluids_path,
            name,
            p,
            t,
            rho,
            e,
            rhou,
            rho_e,
            vel,
        } => {
            let state = state_spec(p, t, rho, e, rhou, rho_e)?;
            cmd_interrogate(&fluids_path, &name, state, vel)
        }
        Commands::Tabulate {
            fluids_path,
            name,
            out,
            p_min,
            p_max,
            t_min,
            t_max,
            num_p,
            num_t,
            properties,
        } => {
            let grid = TabulationGrid {
                pressure_min: p_min,
                pressure_max: p_max,
                temperature_min: t_min,
                temperature_max: t_max,
                num_p,
                num_t,
            };
            cmd_tabulate(&fluids_path, &name, &out, &grid, &properties)
        }
    }
}

fn state_spec(
    p: Option<f64>,
    t: Option<f64>,
    rho: Option<f64>,
    e: Option<f64>,
    rhou: Option<f64>,
    rho_e: Option<f64>,
) -> FluidResult<StateSpec> {
    match (p, t, rho, e, rhou, rho_e) {
        (Some(p), Some(t), None, None, None, None) => Ok(StateSpec::PressureTemperature { p, t }),
        (None, None, Some(rho), Some(e), None, None) => Ok(StateSpec::DensityEnergy { rho, e }),
        (Some(p), None, Some(rho), None, None, None) => Ok(StateSpec::DensityPressure { rho, p }),
        (None, None, Some(rho), None, Some(rhou), Some(rho_e)) => {
            Ok(StateSpec::Conserved { rho, rhou, rho_e })
        }
        _ => Err(FluidError::config(
            "give one of: --p and --T; --rho and --e; --rho and --p; --rho, --rhou and --rhoE",
        )),
    }
}

fn load_set(fluids_path: &Path) -> FluidResult<FluidSet> {
    let def = FluidSetDef::load(fluids_path)?;
    FluidRegistry::with_builtin().build(&def)
}

fn lookup(set: &FluidSet, name: &str) -> FluidResult<Arc<dyn SinglePhaseFluid>> {
    set.get(name).ok_or_else(|| {
        FluidError::config(format!(
            "no fluid named '{name}'; the set defines {}",
            set.names().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn cmd_types() -> FluidResult<()> {
    println!("Registered fluid types:");
    for type_name in FluidRegistry::with_builtin().types() {
        println!("  {type_name}");
    }
    Ok(())
}

fn cmd_fluids(fluids_path: &Path) -> FluidResult<()> {
    let set = load_set(fluids_path)?;
    if set.is_empty() {
        println!("No fluids defined in {}", fluids_path.display());
    } else {
        println!("Fluids in {}:", fluids_path.display());
        for name in set.names() {
            if let Some(fluid) = set.get(name) {
                println!("  {} ({})", name, fluid.fluid_name());
            }
        }
    }
    Ok(())
}

fn cmd_interrogate(
    fluids_path: &Path,
    name: &str,
    state: StateSpec,
    velocity: Option<f64>,
) -> FluidResult<()> {
    let set = load_set(fluids_path)?;
    let fluid = lookup(&set, name)?;
    let report = interrogate(fluid.as_ref(), state, velocity)?;
    print!("{report}");
    if !report.unavailable.is_empty() {
        println!("Unavailable:");
        for (what, reason) in &report.unavailable {
            println!("  {what}: {reason}");
        }
    }
    Ok(())
}

fn cmd_tabulate(
    fluids_path: &Path,
    name: &str,
    out: &Path,
    grid: &TabulationGrid,
    properties: &[String],
) -> FluidResult<()> {
    let set = load_set(fluids_path)?;
    let fluid = lookup(&set, name)?;
    let properties = if properties.is_empty() {
        TabulatedProperty::DEFAULT_SET.to_vec()
    } else {
        properties
            .iter()
            .map(|s| s.trim().parse())
            .collect::<FluidResult<Vec<TabulatedProperty>>>()?
    };
    println!(
        "Tabulating {} on {} x {} points",
        name, grid.num_p, grid.num_t
    );
    let table = tabulate(fluid.as_ref(), grid, &properties)?;
    table.write_csv(out, fluid.fluid_name())?;
    println!("✓ Wrote {}", out.display());
    Ok(())
}
