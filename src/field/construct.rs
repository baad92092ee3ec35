//! Coordinate and measure constructs owned by a [`Field`](super::Field)

use super::properties::Properties;
use ndarray::{Array1, Array2, ArrayD};

/// Physical role of a domain axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    X,
    Y,
    Z,
    T,
}

impl AxisKind {
    /// Parse a CF `axis` attribute value
    pub fn from_declared(value: &str) -> Option<Self> {
        match value.trim() {
            "X" | "x" => Some(AxisKind::X),
            "Y" | "y" => Some(AxisKind::Y),
            "Z" | "z" => Some(AxisKind::Z),
            "T" | "t" => Some(AxisKind::T),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AxisKind::X => "X",
            AxisKind::Y => "Y",
            AxisKind::Z => "Z",
            AxisKind::T => "T",
        }
    }
}

/// Guess an axis role from standard name, units and `positive`
fn infer_kind(properties: &Properties) -> Option<AxisKind> {
    match properties.text("standard_name") {
        Some("latitude" | "grid_latitude") => return Some(AxisKind::Y),
        Some("longitude" | "grid_longitude") => return Some(AxisKind::X),
        Some("time") => return Some(AxisKind::T),
        Some("depth" | "height" | "air_pressure" | "model_level_number") => {
            return Some(AxisKind::Z)
        }
        _ => {}
    }
    if let Some(units) = properties.text("units") {
        if units.contains(" since ") {
            return Some(AxisKind::T);
        }
        match units.trim() {
            "degrees_north" | "degree_north" | "degree_N" | "degrees_N" | "degreeN" => {
                return Some(AxisKind::Y)
            }
            "degrees_east" | "degree_east" | "degree_E" | "degrees_E" | "degreeE" => {
                return Some(AxisKind::X)
            }
            _ => {}
        }
    }
    if properties.contains("positive") {
        return Some(AxisKind::Z);
    }
    None
}

/// One-dimensional coordinate spanning a single domain axis
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionCoordinate {
    pub values: Array1<f64>,
    /// Cell bounds, shape (n, 2)
    pub bounds: Option<Array2<f64>>,
    pub properties: Properties,
}

impl DimensionCoordinate {
    pub fn new(values: Array1<f64>) -> Self {
        Self {
            values,
            bounds: None,
            properties: Properties::new(),
        }
    }

    /// Regular index coordinate `0..size` declared as `kind`
    pub fn index(size: usize, kind: AxisKind) -> Self {
        let mut coord = Self::new(Array1::from_iter((0..size).map(|i| i as f64)));
        coord.properties.set("axis", kind.as_str());
        coord.properties.set("standard_name", kind.as_str());
        coord
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<super::PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Array2<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn standard_name(&self) -> Option<&str> {
        self.properties.text("standard_name")
    }

    pub fn units(&self) -> Option<&str> {
        self.properties.text("units")
    }

    /// Role declared through the `axis` property only
    pub fn declared_kind(&self) -> Option<AxisKind> {
        self.properties.text("axis").and_then(AxisKind::from_declared)
    }

    /// Declared role, falling back to name/units heuristics
    pub fn kind(&self) -> Option<AxisKind> {
        self.declared_kind().or_else(|| infer_kind(&self.properties))
    }

    /// Regular cell bounds halfway between neighbouring values
    pub fn create_bounds(&self) -> Array2<f64> {
        let n = self.values.len();
        let mut bounds = Array2::zeros((n, 2));
        if n == 0 {
            return bounds;
        }
        if n == 1 {
            bounds[[0, 0]] = self.values[0] - 0.5;
            bounds[[0, 1]] = self.values[0] + 0.5;
            return bounds;
        }
        for i in 0..n {
            let lower = if i == 0 {
                self.values[0] - 0.5 * (self.values[1] - self.values[0])
            } else {
                0.5 * (self.values[i - 1] + self.values[i])
            };
            let upper = if i == n - 1 {
                self.values[n - 1] + 0.5 * (self.values[n - 1] - self.values[n - 2])
            } else {
                0.5 * (self.values[i] + self.values[i + 1])
            };
            bounds[[i, 0]] = lower;
            bounds[[i, 1]] = upper;
        }
        bounds
    }
}

/// A dimension of a field's data array
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAxis {
    /// netCDF dimension name; unique within a field
    pub ncdim: String,
    pub size: usize,
    pub coordinate: Option<DimensionCoordinate>,
}

impl DomainAxis {
    pub fn new(ncdim: impl Into<String>, size: usize) -> Self {
        Self {
            ncdim: ncdim.into(),
            size,
            coordinate: None,
        }
    }

    #[must_use]
    pub fn with_coordinate(mut self, coordinate: DimensionCoordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    pub fn kind(&self) -> Option<AxisKind> {
        self.coordinate.as_ref().and_then(DimensionCoordinate::kind)
    }

    pub fn declared_kind(&self) -> Option<AxisKind> {
        self.coordinate
            .as_ref()
            .and_then(DimensionCoordinate::declared_kind)
    }
}

/// Non-dimensional coordinate, e.g. 2-D latitude on a curvilinear grid
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryCoordinate {
    pub ncvar: String,
    /// Domain axes (by `ncdim`) the values span, in array order
    pub axes: Vec<String>,
    pub values: ArrayD<f64>,
    pub properties: Properties,
}

impl AuxiliaryCoordinate {
    pub fn new(ncvar: impl Into<String>, axes: Vec<String>, values: ArrayD<f64>) -> Self {
        Self {
            ncvar: ncvar.into(),
            axes,
            values,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<super::PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    pub fn standard_name(&self) -> Option<&str> {
        self.properties.text("standard_name")
    }

    pub fn long_name(&self) -> Option<&str> {
        self.properties.text("long_name")
    }

    pub fn identity(&self) -> &str {
        self.standard_name().unwrap_or(&self.ncvar)
    }
}

/// Kind of weighting a cell measure provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureKind {
    Area,
    Volume,
}

impl MeasureKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "area" => Some(MeasureKind::Area),
            "volume" => Some(MeasureKind::Volume),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MeasureKind::Area => "area",
            MeasureKind::Volume => "volume",
        }
    }
}

/// Weighting array over some of a field's axes
#[derive(Debug, Clone, PartialEq)]
pub struct CellMeasure {
    pub kind: MeasureKind,
    pub axes: Vec<String>,
    /// `None` for an external measure named in `cell_measures` but not
    /// present in the file
    pub values: Option<ArrayD<f64>>,
    pub units: Option<String>,
    pub ncvar: Option<String>,
}

impl CellMeasure {
    pub fn new(kind: MeasureKind, axes: Vec<String>, values: ArrayD<f64>) -> Self {
        Self {
            kind,
            axes,
            values: Some(values),
            units: None,
            ncvar: None,
        }
    }

    pub fn external(kind: MeasureKind, ncvar: impl Into<String>) -> Self {
        Self {
            kind,
            axes: Vec::new(),
            values: None,
            units: None,
            ncvar: Some(ncvar.into()),
        }
    }

    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    #[must_use]
    pub fn with_ncvar(mut self, ncvar: impl Into<String>) -> Self {
        self.ncvar = Some(ncvar.into());
        self
    }

    pub fn has_units(&self) -> bool {
        self.units.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn is_square_metres(&self) -> bool {
        matches!(self.units.as_deref().map(str::trim), Some("m2" | "m^2" | "m**2"))
    }
}
