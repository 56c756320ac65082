//! Property grids and their CSV form.
//!
//! A grid is spanned by either (pressure, temperature) or (specific_volume,
//! internal_energy). The file holds one row per grid point, major in the first
//! variable: the first column repeats each of its values once per value of the
//! second, and the second column's block is identical for every value of the
//! first. Lines starting with `#` are comments.

use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;

use fp_core::Real;
use nalgebra::DMatrix;
use tracing::{info, warn};

use crate::error::{FluidError, FluidResult};

/// Properties a table may hold, named by their CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TabulatedProperty {
    Density,
    Enthalpy,
    InternalEnergy,
    Viscosity,
    ThermalConductivity,
    SpeedOfSound,
    Cv,
    Cp,
    Entropy,
    /// Only held by (v, e) tables
    Pressure,
    /// Only held by (v, e) tables
    Temperature,
}

impl TabulatedProperty {
    pub const ALL: [TabulatedProperty; 11] = [
        Self::Density,
        Self::Enthalpy,
        Self::InternalEnergy,
        Self::Viscosity,
        Self::ThermalConductivity,
        Self::SpeedOfSound,
        Self::Cv,
        Self::Cp,
        Self::Entropy,
        Self::Pressure,
        Self::Temperature,
    ];

    /// Properties a (p, T) table can hold.
    pub const P_T: [TabulatedProperty; 9] = [
        Self::Density,
        Self::Enthalpy,
        Self::InternalEnergy,
        Self::Viscosity,
        Self::ThermalConductivity,
        Self::SpeedOfSound,
        Self::Cv,
        Self::Cp,
        Self::Entropy,
    ];

    /// Generated when the user does not choose.
    pub const DEFAULT_SET: [TabulatedProperty; 4] = [
        Self::Density,
        Self::Enthalpy,
        Self::InternalEnergy,
        Self::Viscosity,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Enthalpy => "enthalpy",
            Self::InternalEnergy => "internal_energy",
            Self::Viscosity => "viscosity",
            Self::ThermalConductivity => "k",
            Self::SpeedOfSound => "c",
            Self::Cv => "cv",
            Self::Cp => "cp",
            Self::Entropy => "entropy",
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
        }
    }
}

impl fmt::Display for TabulatedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for TabulatedProperty {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.column() == s)
            .ok_or_else(|| {
                FluidError::config(format!(
                    "'{s}' is not a tabulated property; expected one of {}",
                    Self::ALL.map(Self::column).join(", ")
                ))
            })
    }
}

/// The pair of variables spanning a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridVariables {
    PressureTemperature,
    VolumeEnergy,
}

impl GridVariables {
    /// CSV column names of the two axes.
    pub fn axes(self) -> [&'static str; 2] {
        match self {
            Self::PressureTemperature => ["pressure", "temperature"],
            Self::VolumeEnergy => ["specific_volume", "internal_energy"],
        }
    }

    /// Whether `prop` is one of the axes rather than a column.
    pub fn is_axis(self, prop: TabulatedProperty) -> bool {
        matches!(
            (self, prop),
            (
                Self::PressureTemperature,
                TabulatedProperty::Pressure | TabulatedProperty::Temperature
            ) | (Self::VolumeEnergy, TabulatedProperty::InternalEnergy)
        )
    }
}

/// Property values on a grid; each matrix has one row per `axis1` value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTable {
    pub variables: GridVariables,
    pub axis1: Vec<Real>,
    pub axis2: Vec<Real>,
    pub columns: Vec<(TabulatedProperty, DMatrix<Real>)>,
}

impl PropertyTable {
    /// Read and validate a CSV tabulation spanned by `variables`.
    pub fn read_csv(path: &Path, variables: GridVariables) -> FluidResult<Self> {
        info!(file = %path.display(), "reading tabulated properties");
        let text = fs::read_to_string(path).map_err(|err| FluidError::Io {
            message: format!("{}: {err}", path.display()),
        })?;
        Self::parse_csv(&text, &path.display().to_string(), variables)
    }

    /// Parse CSV text; `source` names the input in error messages.
    pub fn parse_csv(text: &str, source: &str, variables: GridVariables) -> FluidResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let (_, header) = lines
            .next()
            .ok_or_else(|| FluidError::config(format!("{source} holds no header row")))?;
        let names: Vec<&str> = header.split(',').map(str::trim).collect();

        let find = |name: &str| {
            names.iter().position(|n| *n == name).ok_or_else(|| {
                FluidError::config(format!(
                    "No {name} data read in {source}. A column named {name} must be present"
                ))
            })
        };
        let [name1, name2] = variables.axes();
        let col1 = find(name1)?;
        let col2 = find(name2)?;

        let mut props = Vec::new();
        for (col, name) in names.iter().enumerate() {
            if col == col1 || col == col2 {
                continue;
            }
            match name.parse::<TabulatedProperty>() {
                Ok(prop) if variables.is_axis(prop) || props.iter().any(|(_, p)| *p == prop) => {
                    return Err(FluidError::config(format!(
                        "column {name} appears twice in {source}"
                    )));
                }
                Ok(prop) => props.push((col, prop)),
                Err(_) => warn!(
                    column = %name,
                    file = %source,
                    "column is not a tabulated property and is ignored"
                ),
            }
        }

        let mut data: Vec<Vec<Real>> = vec![Vec::new(); names.len()];
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != names.len() {
                return Err(FluidError::config(format!(
                    "{source}:{line_no}: expected {} values, found {}",
                    names.len(),
                    fields.len()
                )));
            }
            for (col, field) in fields.iter().enumerate() {
                let value: Real = field.parse().map_err(|_| {
                    FluidError::config(format!(
                        "{source}:{line_no}: '{field}' in column {} is not a number",
                        names[col]
                    ))
                })?;
                data[col].push(value);
            }
        }

        let (axis1, axis2) = check_grid(&data[col1], &data[col2], [name1, name2], source)?;
        let (n1, n2) = (axis1.len(), axis2.len());
        let columns = props
            .into_iter()
            .map(|(col, prop)| (prop, DMatrix::from_row_slice(n1, n2, &data[col])))
            .collect();
        Ok(Self {
            variables,
            axis1,
            axis2,
            columns,
        })
    }

    /// Write the table in the form [`PropertyTable::read_csv`] accepts.
    pub fn write_csv(&self, path: &Path, fluid: &str) -> FluidResult<()> {
        info!(file = %path.display(), "writing tabulated properties");
        let mut out = fs::File::create(path)?;
        writeln!(out, "# {fluid} properties created by TabulatedFluidProperties")?;
        let [name1, name2] = self.variables.axes();
        write!(out, "{name1}, {name2}")?;
        for (prop, _) in &self.columns {
            write!(out, ", {prop}")?;
        }
        writeln!(out)?;
        for (i, a) in self.axis1.iter().enumerate() {
            for (j, b) in self.axis2.iter().enumerate() {
                write!(out, "{a}, {b}")?;
                for (_, values) in &self.columns {
                    write!(out, ", {}", values[(i, j)])?;
                }
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn column(&self, prop: TabulatedProperty) -> Option<&DMatrix<Real>> {
        self.columns
            .iter()
            .find(|(p, _)| *p == prop)
            .map(|(_, values)| values)
    }
}

/// Reduce the repeated axis columns of a file to the two grid axes, checking
/// the layout on the way.
fn check_grid(
    first: &[Real],
    second: &[Real],
    [name1, name2]: [&str; 2],
    source: &str,
) -> FluidResult<(Vec<Real>, Vec<Real>)> {
    let Some(&start) = first.first() else {
        return Err(FluidError::config(format!("{source} holds no data rows")));
    };
    let num2 = first.iter().take_while(|&&a| a == start).count();
    let num1 = first.len() / num2;
    if first.len() != num1 * num2 {
        return Err(FluidError::config(format!(
            "The number of rows in {source} is not equal to the number of unique {name1} \
             values multiplied by the number of unique {name2} values {num2}"
        )));
    }

    let mut axis1 = Vec::with_capacity(num1);
    for block in first.chunks(num2) {
        let value = block[0];
        if block.iter().any(|&a| a != value) {
            return Err(FluidError::config(format!(
                "The {name1} column of {source} must repeat each value exactly {num2} times"
            )));
        }
        if axis1.last().is_some_and(|&prev| prev >= value) {
            return Err(FluidError::config(format!(
                "The column data for {name1} is not monotonically increasing in {source}"
            )));
        }
        axis1.push(value);
    }

    let base = &second[..num2];
    if !base.windows(2).all(|w| w[0] < w[1]) {
        return Err(FluidError::config(format!(
            "The column data for {name2} is not monotonically increasing in {source}"
        )));
    }
    for (i, block) in second.chunks(num2).enumerate().skip(1) {
        if block != base {
            return Err(FluidError::config(format!(
                "{name2} values for {name1} {} are not identical to values for {name1} {start} in {source}",
                axis1[i]
            )));
        }
    }

    if num1 < 2 || num2 < 2 {
        return Err(FluidError::config(format!(
            "{source} must hold at least two values of {name1} and of {name2}"
        )));
    }
    Ok((axis1, base.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "\
# water properties
pressure, temperature, density, bogus
1e5, 300, 1.0, 9
1e5, 400, 2.0, 9
2e5, 300, 3.0, 9
2e5, 400, 4.0, 9
";

    fn parse(text: &str) -> FluidResult<PropertyTable> {
        PropertyTable::parse_csv(text, "x.csv", GridVariables::PressureTemperature)
    }

    #[test]
    fn parses_pressure_major_grid() {
        let table = parse(GOOD).unwrap();
        assert_eq!(table.axis1, vec![1e5, 2e5]);
        assert_eq!(table.axis2, vec![300.0, 400.0]);
        assert_eq!(table.columns.len(), 1);
        let rho = table.column(TabulatedProperty::Density).unwrap();
        assert_eq!(rho[(1, 0)], 3.0);
        assert_eq!(rho[(0, 1)], 2.0);
    }

    #[test]
    fn parses_volume_energy_grid() {
        let text = "\
specific_volume, internal_energy, pressure, temperature
0.5, 1e5, 10, 300
0.5, 2e5, 20, 400
1.0, 1e5, 5, 300
1.0, 2e5, 10, 400
";
        let table = PropertyTable::parse_csv(text, "ve.csv", GridVariables::VolumeEnergy).unwrap();
        assert_eq!(table.axis1, vec![0.5, 1.0]);
        assert_eq!(table.axis2, vec![1e5, 2e5]);
        let p = table.column(TabulatedProperty::Pressure).unwrap();
        assert_eq!(p[(1, 0)], 5.0);
        assert!(table.column(TabulatedProperty::Temperature).is_some());

        // read as (p, T), the pressure column is not a grid axis
        assert!(parse(text).is_err());
    }

    #[test]
    fn missing_required_column() {
        let err = parse("pressure, density\n1, 2\n").unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn ragged_grid_is_rejected() {
        let err = parse("pressure, temperature\n1, 300\n1, 400\n2, 300\n").unwrap_err();
        assert!(err.to_string().contains("number of rows"));
    }

    #[test]
    fn pressure_blocks_must_be_constant() {
        // the row count is consistent but the last block mixes two pressures
        let text = "pressure,temperature,density\n1,300,1\n1,400,2\n2,300,3\n2,400,4\n2,300,5\n3,400,6\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, FluidError::Config { .. }));
        assert!(err.to_string().contains("repeat each value"));

        let text = "pressure,temperature\n1,300\n1,400\n2,300\n2,400\n2,300\n2,400\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("not monotonically increasing"));
    }

    #[test]
    fn unsorted_axes_are_rejected() {
        assert!(parse("pressure, temperature\n2, 300\n2, 400\n1, 300\n1, 400\n").is_err());
        assert!(parse("pressure, temperature\n1, 400\n1, 300\n2, 400\n2, 300\n").is_err());
        let err = parse("pressure, temperature\n1, 300\n1, 400\n2, 300\n2, 500\n").unwrap_err();
        assert!(err.to_string().contains("not identical"));
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse("pressure, temperature\n1, 300\n1, abc\n").unwrap_err();
        assert!(err.to_string().contains("x.csv:3"));
    }

    #[test]
    fn property_names_parse() {
        assert_eq!(
            "k".parse::<TabulatedProperty>().unwrap(),
            TabulatedProperty::ThermalConductivity
        );
        assert_eq!(
            "pressure".parse::<TabulatedProperty>().unwrap(),
            TabulatedProperty::Pressure
        );
        assert!("specific_volume".parse::<TabulatedProperty>().is_err());
    }
}
