//! State shared by every fluid object: its name, the common parameters, and
//! the once-per-method warning latch behind the derivative policy.

use std::collections::BTreeSet;
use std::sync::Mutex;

use fp_core::{Real, WithPartials};
use fp_solver::NewtonConfig;
use tracing::warn;

use crate::error::{FluidError, FluidResult};
use crate::params::FluidPropertiesParams;

#[derive(Debug)]
pub struct FluidPropertiesBase {
    name: String,
    params: FluidPropertiesParams,
    warned: Mutex<BTreeSet<&'static str>>,
}

impl FluidPropertiesBase {
    pub fn new(name: impl Into<String>, params: FluidPropertiesParams) -> Self {
        Self {
            name: name.into(),
            params,
            warned: Mutex::new(BTreeSet::new()),
        }
    }

    /// Object name, as given in the fluid set definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &FluidPropertiesParams {
        &self.params
    }

    pub fn newton_config(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.params.max_newton_its,
            rel_tol: self.params.tolerance,
            ..NewtonConfig::default()
        }
    }

    pub fn not_implemented(&self, method: &'static str) -> FluidError {
        FluidError::NotImplemented {
            fluid: self.name.clone(),
            method,
        }
    }

    /// Emit `message` as a warning the first time `key` is seen on this object.
    /// Returns whether the warning was emitted.
    pub fn warn_once(&self, key: &'static str, message: impl FnOnce() -> String) -> bool {
        let first = self
            .warned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key);
        if first {
            warn!(fluid = %self.name, "{}", message());
        }
        first
    }

    /// Derivative policy for a property whose value is known but whose partials are not.
    pub fn imperfect_derivative(
        &self,
        method: &'static str,
        value: Real,
    ) -> FluidResult<WithPartials> {
        self.check_imperfect_derivative(method)?;
        Ok(WithPartials::constant(value))
    }

    /// Fails unless imperfect Jacobians are allowed, in which case warns once.
    pub fn check_imperfect_derivative(&self, method: &'static str) -> FluidResult<()> {
        if !self.params.allow_imperfect_jacobians {
            return Err(FluidError::UnimplementedDerivative {
                fluid: self.name.clone(),
                method,
            });
        }
        self.warn_once(method, || {
            format!("derivatives of {method} are not implemented and are neglected (set to 0)")
        });
        Ok(())
    }
}
