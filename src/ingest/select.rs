//! Variable selectors and deferred fragment sets

use crate::errors::{MonitorError, Result};
use crate::field::{Field, FieldList};
use crate::netcdf_io::read_fragments;
use regex::Regex;
use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;

/// How a requested variable is picked out of a fragment set
#[derive(Debug, Clone)]
pub enum VariableSelector {
    /// Standard name (or long name / `ncvar%` identity)
    Identity(String),
    /// Exact netCDF variable name
    NcVar(String),
    /// Regular expression over the netCDF variable name
    NcVarPattern(Regex),
}

/// UM short-code for a STASH code: `1201` -> `m01s01i201`
pub fn stash_short_code(code: u32) -> String {
    let padded = format!("{code:05}");
    let split = padded.len() - 3;
    format!("m01s{}i{}", &padded[..split], &padded[split..])
}

impl VariableSelector {
    /// Selector for a UM STASH code, tolerating `_<n>` suffixed names
    ///
    /// # Errors
    ///
    /// Never fails for numeric codes; the `Result` covers regex compilation.
    pub fn stash(code: u32) -> Result<Self> {
        let pattern = format!("^{}(_[0-9]+)?$", regex::escape(&stash_short_code(code)));
        Self::pattern(&pattern)
    }

    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(VariableSelector::NcVarPattern)
            .map_err(|e| MonitorError::InvalidSelector(format!("'{pattern}': {e}")))
    }

    pub fn matches(&self, field: &Field) -> bool {
        match self {
            VariableSelector::Identity(name) => {
                field.standard_name() == Some(name.as_str()) || &field.identity() == name
            }
            VariableSelector::NcVar(name) => &field.ncvar == name,
            VariableSelector::NcVarPattern(re) => re.is_match(&field.ncvar),
        }
    }
}

impl fmt::Display for VariableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableSelector::Identity(name) => write!(f, "{name}"),
            VariableSelector::NcVar(name) => write!(f, "ncvar%{name}"),
            VariableSelector::NcVarPattern(re) => write!(f, "ncvar~{}", re.as_str()),
        }
    }
}

/// Fields matching `selector`
pub fn select(fields: &[Field], selector: &VariableSelector) -> FieldList {
    fields
        .iter()
        .filter(|f| selector.matches(f))
        .cloned()
        .collect()
}

/// Fields whose properties hold every `(key, value)` pair
pub fn select_by_properties(fields: &[Field], required: &[(&str, &str)]) -> FieldList {
    fields
        .iter()
        .filter(|f| required.iter().all(|(k, v)| f.properties.matches(k, v)))
        .cloned()
        .collect()
}

/// Fragment files of one stream, read on first use
pub struct FragmentSet {
    label: String,
    paths: Vec<PathBuf>,
    loaded: OnceCell<FieldList>,
}

impl FragmentSet {
    pub fn new(label: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            label: label.into(),
            paths,
            loaded: OnceCell::new(),
        }
    }

    /// A set whose fields are already in memory
    pub fn from_fields(label: impl Into<String>, fields: FieldList) -> Self {
        Self {
            label: label.into(),
            paths: Vec::new(),
            loaded: OnceCell::from(fields),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// True when there is nothing to read
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.loaded.get().map_or(true, Vec::is_empty)
    }

    /// Fields of every fragment, reading the files the first time
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be read.
    pub fn fields(&self) -> Result<&[Field]> {
        if let Some(fields) = self.loaded.get() {
            return Ok(fields);
        }
        let fields = read_fragments(&self.paths)?;
        Ok(self.loaded.get_or_init(|| fields))
    }
}
