//! Free-form metadata attached to fields and coordinates

use std::collections::BTreeMap;
use std::fmt;

/// A single property value, as read from a netCDF attribute
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s.as_str()),
            PropertyValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

/// Ordered property bag (`standard_name`, `units`, `job`, ...)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Text value of a property; numbers are not coerced
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(PropertyValue::as_text)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `key` holds `expected`, comparing numerically when the
    /// stored value is a number (`lbproc = 128` matches `"128"`).
    pub fn matches(&self, key: &str, expected: &str) -> bool {
        match self.0.get(key) {
            Some(PropertyValue::Text(s)) => s.trim() == expected,
            Some(PropertyValue::Number(n)) => expected
                .trim()
                .parse::<f64>()
                .map(|e| e == *n)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Appends a `cell_methods` entry, keeping earlier ones
    pub fn push_cell_method(&mut self, method: &str) {
        let updated = match self.text("cell_methods") {
            Some(existing) if !existing.is_empty() => format!("{existing} {method}"),
            _ => method.to_string(),
        };
        self.set("cell_methods", updated);
    }
}
