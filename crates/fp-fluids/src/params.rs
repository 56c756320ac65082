//! Construction parameters.
//!
//! A [`ParamBag`] is the key/value map a fluid is built from, usually read from
//! YAML. Fluids consume it through a [`ParamReader`], which applies defaults and
//! range checks and rejects keys that nothing consumed, so a misspelt parameter
//! is a configuration error rather than a silently ignored setting.

use std::collections::{BTreeMap, BTreeSet};

use fp_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, FluidResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    RealList(Vec<f64>),
    TextList(Vec<String>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Real(_) => "real",
            ParamValue::Text(_) => "string",
            ParamValue::RealList(_) => "list of reals",
            ParamValue::TextList(_) => "list of strings",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::RealList(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::TextList(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag {
    values: BTreeMap<String, ParamValue>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Start consuming the bag on behalf of `context` (used in error messages).
    pub fn reader<'a>(&'a self, context: &'a str) -> ParamReader<'a> {
        ParamReader {
            bag: self,
            context,
            used: BTreeSet::new(),
        }
    }
}

/// Typed, tracked access to a [`ParamBag`].
pub struct ParamReader<'a> {
    bag: &'a ParamBag,
    context: &'a str,
    used: BTreeSet<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn lookup(&mut self, key: &'a str) -> Option<&'a ParamValue> {
        self.used.insert(key);
        self.bag.get(key)
    }

    fn wrong_type(&self, key: &str, expected: &str, found: &ParamValue) -> FluidError {
        FluidError::config(format!(
            "{}: parameter '{key}' must be a {expected}, found a {}",
            self.context,
            found.kind()
        ))
    }

    pub fn optional_real(&mut self, key: &'a str) -> FluidResult<Option<Real>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(ParamValue::Real(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as Real)),
            Some(other) => Err(self.wrong_type(key, "real", other)),
        }
    }

    pub fn real(&mut self, key: &'a str, default: Real) -> FluidResult<Real> {
        Ok(self.optional_real(key)?.unwrap_or(default))
    }

    /// Real parameter that must satisfy `check`; `requirement` describes it for the error.
    pub fn real_checked(
        &mut self,
        key: &'a str,
        default: Real,
        check: impl Fn(Real) -> bool,
        requirement: &str,
    ) -> FluidResult<Real> {
        let v = self.real(key, default)?;
        if !v.is_finite() || !check(v) {
            return Err(FluidError::config(format!(
                "{}: parameter '{key}' = {v} must be {requirement}",
                self.context
            )));
        }
        Ok(v)
    }

    pub fn positive_real(&mut self, key: &'a str, default: Real) -> FluidResult<Real> {
        self.real_checked(key, default, |v| v > 0.0, "positive")
    }

    pub fn required_real(&mut self, key: &'a str) -> FluidResult<Real> {
        self.optional_real(key)?.ok_or_else(|| {
            FluidError::config(format!(
                "{}: missing required parameter '{key}'",
                self.context
            ))
        })
    }

    /// List of reals; a single number is read as a one-element list.
    pub fn optional_real_list(&mut self, key: &'a str) -> FluidResult<Option<Vec<Real>>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(ParamValue::RealList(v)) => Ok(Some(v.clone())),
            Some(ParamValue::Real(v)) => Ok(Some(vec![*v])),
            Some(ParamValue::Int(v)) => Ok(Some(vec![*v as Real])),
            Some(other) => Err(self.wrong_type(key, "list of reals", other)),
        }
    }

    pub fn required_real_list(&mut self, key: &'a str) -> FluidResult<Vec<Real>> {
        self.optional_real_list(key)?.ok_or_else(|| {
            FluidError::config(format!(
                "{}: missing required parameter '{key}'",
                self.context
            ))
        })
    }

    pub fn boolean(&mut self, key: &'a str, default: bool) -> FluidResult<bool> {
        match self.lookup(key) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(other) => Err(self.wrong_type(key, "boolean", other)),
        }
    }

    pub fn count(&mut self, key: &'a str, default: usize) -> FluidResult<usize> {
        match self.lookup(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) if *v > 0 => Ok(*v as usize),
            Some(ParamValue::Int(v)) => Err(FluidError::config(format!(
                "{}: parameter '{key}' = {v} must be positive",
                self.context
            ))),
            Some(other) => Err(self.wrong_type(key, "positive integer", other)),
        }
    }

    pub fn optional_text(&mut self, key: &'a str) -> FluidResult<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(ParamValue::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Err(self.wrong_type(key, "string", other)),
        }
    }

    pub fn text(&mut self, key: &'a str, default: &str) -> FluidResult<String> {
        Ok(self
            .optional_text(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// String parameter restricted to `choices`.
    pub fn choice(&mut self, key: &'a str, default: &str, choices: &[&str]) -> FluidResult<String> {
        let v = self.text(key, default)?;
        if choices.contains(&v.as_str()) {
            Ok(v)
        } else {
            Err(FluidError::config(format!(
                "{}: parameter '{key}' = '{v}' must be one of {}",
                self.context,
                choices.join(", ")
            )))
        }
    }

    pub fn text_list(&mut self, key: &'a str, default: &[&str]) -> FluidResult<Vec<String>> {
        match self.lookup(key) {
            None => Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(ParamValue::TextList(v)) => Ok(v.clone()),
            Some(ParamValue::Text(v)) => Ok(v.split_whitespace().map(str::to_string).collect()),
            Some(other) => Err(self.wrong_type(key, "list of strings", other)),
        }
    }

    /// Fail if the bag holds keys nobody asked for.
    pub fn finish(self) -> FluidResult<()> {
        let unused: Vec<&str> = self
            .bag
            .keys()
            .filter(|k| !self.used.contains(k))
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(FluidError::config(format!(
                "{}: unknown parameter(s): {}",
                self.context,
                unused.join(", ")
            )))
        }
    }
}

/// Parameters shared by every single-phase fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidPropertiesParams {
    /// Neglect unimplemented derivatives (zero + one-time warning) instead of failing.
    pub allow_imperfect_jacobians: bool,
    /// Relative tolerance of the variable set conversions
    pub tolerance: Real,
    /// Initial pressure guess for conversions [Pa]
    pub p_initial_guess: Real,
    /// Initial temperature guess for conversions [K]
    pub t_initial_guess: Real,
    /// Iteration cap of the conversion Newton solves
    pub max_newton_its: usize,
}

impl Default for FluidPropertiesParams {
    fn default() -> Self {
        Self {
            allow_imperfect_jacobians: false,
            tolerance: 1e-8,
            p_initial_guess: 2e5,
            t_initial_guess: 300.0,
            max_newton_its: 100,
        }
    }
}

impl FluidPropertiesParams {
    pub fn read(reader: &mut ParamReader<'_>) -> FluidResult<Self> {
        let d = Self::default();
        Ok(Self {
            allow_imperfect_jacobians: reader
                .boolean("allow_imperfect_jacobians", d.allow_imperfect_jacobians)?,
            tolerance: reader.positive_real("tolerance", d.tolerance)?,
            p_initial_guess: reader.real("p_initial_guess", d.p_initial_guess)?,
            t_initial_guess: reader.positive_real("T_initial_guess", d.t_initial_guess)?,
            max_newton_its: reader.count("max_newton_its", d.max_newton_its)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let bag = ParamBag::new();
        let mut reader = bag.reader("test");
        let params = FluidPropertiesParams::read(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(params, FluidPropertiesParams::default());
    }

    #[test]
    fn integers_are_accepted_as_reals() {
        let bag = ParamBag::new().with("cv", 4186_i64);
        let mut reader = bag.reader("test");
        assert_eq!(reader.real("cv", 1.0).unwrap(), 4186.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let bag = ParamBag::new().with("bulk_modulus", 2e9).with("bulk_modulos", 2e9);
        let mut reader = bag.reader("water");
        reader.positive_real("bulk_modulus", 1.0).unwrap();
        let err = reader.finish().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bulk_modulos"));
        assert!(!msg.contains("bulk_modulus,"));
    }

    #[test]
    fn range_and_type_checks() {
        let bag = ParamBag::new()
            .with("cv", -1.0)
            .with("flag", "yes")
            .with("num_p", 0_i64);
        let mut reader = bag.reader("test");
        assert!(matches!(
            reader.positive_real("cv", 1.0),
            Err(FluidError::Config { .. })
        ));
        assert!(reader.boolean("flag", false).is_err());
        assert!(reader.count("num_p", 10).is_err());
    }

    #[test]
    fn choices_are_enforced() {
        let bag = ParamBag::new().with("out_of_bounds_behavior", "explode");
        let mut reader = bag.reader("tab");
        let err = reader
            .choice("out_of_bounds_behavior", "throw", &["throw", "ignore"])
            .unwrap_err();
        assert!(err.to_string().contains("throw, ignore"));
    }

    #[test]
    fn deserializes_from_yaml() {
        let yaml = "cv: 4186\nallow_imperfect_jacobians: true\nname: water\nprops: [density, k]\n";
        let bag: ParamBag = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(bag.get("cv"), Some(&ParamValue::Int(4186)));
        assert_eq!(
            bag.get("allow_imperfect_jacobians"),
            Some(&ParamValue::Bool(true))
        );
        assert_eq!(
            bag.get("props"),
            Some(&ParamValue::TextList(vec!["density".into(), "k".into()]))
        );
    }

    #[test]
    fn real_lists_and_required_values() {
        let yaml = "molar_mass: 0.029\nknots: [200, 300.5, 400]\nmu: 1.8e-5\n";
        let bag: ParamBag = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            bag.get("knots"),
            Some(&ParamValue::RealList(vec![200.0, 300.5, 400.0]))
        );
        let mut reader = bag.reader("gas");
        assert_eq!(reader.required_real("molar_mass").unwrap(), 0.029);
        assert_eq!(
            reader.required_real_list("knots").unwrap(),
            vec![200.0, 300.5, 400.0]
        );
        assert_eq!(reader.optional_real_list("mu").unwrap(), Some(vec![1.8e-5]));
        let err = reader.required_real("e_c_missing").unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'e_c_missing'"));
        assert!(reader.optional_real_list("absent").unwrap().is_none());
        reader.finish().unwrap();
    }
}
