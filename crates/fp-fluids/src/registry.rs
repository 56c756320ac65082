//! Fluid construction by type name.
//!
//! A [`FluidRegistry`] maps type names to factories. A fluid set file lists
//! named fluids in order, so a later entry (a tabulated fluid, say) can refer to
//! an earlier one by name.
//!
//! ```yaml
//! - name: water
//!   type: SimpleFluidProperties
//!   params:
//!     bulk_modulus: 2.2e9
//! - name: water_tab
//!   type: TabulatedFluidProperties
//!   params:
//!     fp: water
//!     num_p: 20
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FluidError, FluidResult};
use crate::fluids::{
    CaloricallyImperfectGasFluidProperties, FlibeFluidProperties, HeliumFluidProperties,
    IdealGasFluidProperties, SimpleFluidProperties, SodiumLiquidFluidProperties,
};
use crate::params::ParamBag;
use crate::single_phase::SinglePhaseFluid;
use crate::tabulated::TabulatedFluidProperties;

/// Builds a fluid named `name` from `params`; `built` holds the fluids defined before it.
pub type FluidFactory =
    fn(name: &str, params: &ParamBag, built: &FluidSet) -> FluidResult<Arc<dyn SinglePhaseFluid>>;

#[derive(Default)]
pub struct FluidRegistry {
    factories: BTreeMap<&'static str, FluidFactory>,
}

impl FluidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every fluid type in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SimpleFluidProperties::TYPE_NAME, |name, params, _| {
            Ok(Arc::new(SimpleFluidProperties::from_params(name, params)?))
        });
        registry.register(IdealGasFluidProperties::TYPE_NAME, |name, params, _| {
            Ok(Arc::new(IdealGasFluidProperties::from_params(name, params)?))
        });
        registry.register(
            CaloricallyImperfectGasFluidProperties::TYPE_NAME,
            |name, params, _| {
                Ok(Arc::new(CaloricallyImperfectGasFluidProperties::from_params(
                    name, params,
                )?))
            },
        );
        registry.register(HeliumFluidProperties::TYPE_NAME, |name, params, _| {
            Ok(Arc::new(HeliumFluidProperties::from_params(name, params)?))
        });
        registry.register(FlibeFluidProperties::TYPE_NAME, |name, params, _| {
            Ok(Arc::new(FlibeFluidProperties::from_params(name, params)?))
        });
        registry.register(SodiumLiquidFluidProperties::TYPE_NAME, |name, params, _| {
            Ok(Arc::new(SodiumLiquidFluidProperties::from_params(name, params)?))
        });
        registry.register(TabulatedFluidProperties::TYPE_NAME, |name, params, built| {
            Ok(Arc::new(TabulatedFluidProperties::from_params(name, params, built)?))
        });
        registry
    }

    /// Replaces any factory already registered under `type_name`.
    pub fn register(&mut self, type_name: &'static str, factory: FluidFactory) {
        self.factories.insert(type_name, factory);
    }

    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Build a standalone fluid.
    pub fn create(
        &self,
        type_name: &str,
        name: &str,
        params: &ParamBag,
    ) -> FluidResult<Arc<dyn SinglePhaseFluid>> {
        self.create_in(type_name, name, params, &FluidSet::default())
    }

    fn create_in(
        &self,
        type_name: &str,
        name: &str,
        params: &ParamBag,
        built: &FluidSet,
    ) -> FluidResult<Arc<dyn SinglePhaseFluid>> {
        let factory = self.factories.get(type_name).ok_or_else(|| {
            FluidError::config(format!(
                "unknown fluid type '{type_name}'; registered types are {}",
                self.types().collect::<Vec<_>>().join(", ")
            ))
        })?;
        debug!(fluid = name, type_name, "constructing fluid");
        factory(name, params, built)
    }

    /// Build every fluid of `def` in order.
    pub fn build(&self, def: &FluidSetDef) -> FluidResult<FluidSet> {
        let mut set = FluidSet::default();
        for entry in &def.fluids {
            if set.get(&entry.name).is_some() {
                return Err(FluidError::config(format!(
                    "fluid '{}' is defined twice",
                    entry.name
                )));
            }
            let fluid = self.create_in(&entry.type_name, &entry.name, &entry.params, &set)?;
            set.fluids.push((entry.name.clone(), fluid));
        }
        info!(count = set.len(), "built fluid set");
        Ok(set)
    }
}

/// One entry of a fluid set file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluidDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: ParamBag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FluidSetDef {
    pub fluids: Vec<FluidDef>,
}

impl FluidSetDef {
    pub fn from_yaml(text: &str) -> FluidResult<Self> {
        serde_yaml::from_str(text).map_err(|err| FluidError::config(format!("fluid set: {err}")))
    }

    pub fn load(path: &Path) -> FluidResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| FluidError::Io {
            message: format!("{}: {err}", path.display()),
        })?;
        Self::from_yaml(&text).map_err(|err| match err {
            FluidError::Config { message } => {
                FluidError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }
}

/// Named fluids, in definition order.
#[derive(Clone, Default)]
pub struct FluidSet {
    fluids: Vec<(String, Arc<dyn SinglePhaseFluid>)>,
}

impl FluidSet {
    pub fn get(&self, name: &str) -> Option<Arc<dyn SinglePhaseFluid>> {
        self.fluids
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, fp)| Arc::clone(fp))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fluids.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fluids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluids.is_empty()
    }
}

impl std::fmt::Debug for FluidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
