//! Loads netCDF fragments into [`Field`]s
//!
//! One field is produced per data variable. Coordinate variables become
//! dimension coordinates, variables named in a `coordinates` attribute
//! become auxiliary coordinates, and `cell_measures` references become
//! cell measures (external when the referenced variable is not in the file).

use crate::errors::Result;
use crate::field::{
    AuxiliaryCoordinate, CellMeasure, DimensionCoordinate, DomainAxis, Field, FieldList,
    MeasureKind, Properties, PropertyValue,
};
use ndarray::{Array1, Array2, ArrayD};
use netcdf::AttributeValue;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Values above this magnitude are treated as the netCDF default fill
const DEFAULT_FILL_THRESHOLD: f64 = 9.0e36;

/// Attributes consumed by the reader rather than kept as properties
const STRUCTURAL_ATTRIBUTES: [&str; 5] = [
    "_FillValue",
    "missing_value",
    "coordinates",
    "cell_measures",
    "bounds",
];

struct RawVariable {
    name: String,
    dims: Vec<(String, usize)>,
    attributes: Vec<(String, AttributeValue)>,
    values: Option<Vec<f64>>,
}

impl RawVariable {
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn text_attribute(&self, name: &str) -> Option<&str> {
        match self.attribute(name) {
            Some(AttributeValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|(_, len)| *len).collect()
    }

    fn dim_names(&self) -> Vec<String> {
        self.dims.iter().map(|(name, _)| name.clone()).collect()
    }

    fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        for (name, value) in &self.attributes {
            if STRUCTURAL_ATTRIBUTES.contains(&name.as_str()) {
                continue;
            }
            if let Some(value) = property_value(value) {
                properties.set(name.clone(), value);
            }
        }
        properties
    }

    /// Data with fill and non-finite values replaced by NaN
    fn masked_array(&self) -> Option<ArrayD<f64>> {
        let fills: Vec<f64> = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|n| self.attribute(n).and_then(property_value))
            .filter_map(|v| v.as_number())
            .collect();
        let values: Vec<f64> = self
            .values
            .as_ref()?
            .iter()
            .map(|&v| {
                if !v.is_finite() || v.abs() > DEFAULT_FILL_THRESHOLD || fills.contains(&v) {
                    f64::NAN
                } else {
                    v
                }
            })
            .collect();
        ArrayD::from_shape_vec(self.shape(), values).ok()
    }
}

/// Converts a netCDF attribute into a property; multi-valued numeric
/// attributes other than single-element ones are dropped.
pub(crate) fn property_value(value: &AttributeValue) -> Option<PropertyValue> {
    let number = match value {
        AttributeValue::Str(s) => return Some(PropertyValue::Text(s.clone())),
        AttributeValue::Strs(ss) => return Some(PropertyValue::Text(ss.join(" "))),
        AttributeValue::Double(v) => *v,
        AttributeValue::Float(v) => f64::from(*v),
        AttributeValue::Int(v) => f64::from(*v),
        AttributeValue::Uint(v) => f64::from(*v),
        AttributeValue::Short(v) => f64::from(*v),
        AttributeValue::Ushort(v) => f64::from(*v),
        AttributeValue::Schar(v) => f64::from(*v),
        AttributeValue::Uchar(v) => f64::from(*v),
        AttributeValue::Longlong(v) => *v as f64,
        AttributeValue::Ulonglong(v) => *v as f64,
        AttributeValue::Doubles(vs) if vs.len() == 1 => vs[0],
        AttributeValue::Floats(vs) if vs.len() == 1 => f64::from(vs[0]),
        AttributeValue::Ints(vs) if vs.len() == 1 => f64::from(vs[0]),
        AttributeValue::Shorts(vs) if vs.len() == 1 => f64::from(vs[0]),
        _ => return None,
    };
    Some(PropertyValue::Number(number))
}

/// Parses `"area: tarea volume: cellvol"`
fn parse_cell_measures(text: &str) -> Vec<(MeasureKind, String)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .windows(2)
        .filter_map(|pair| {
            let kind = MeasureKind::parse(pair[0].strip_suffix(':')?)?;
            Some((kind, pair[1].to_string()))
        })
        .collect()
}

fn read_raw_variables(file: &netcdf::File) -> Vec<RawVariable> {
    file.variables()
        .map(|var| {
            let name = var.name();
            let dims = var
                .dimensions()
                .iter()
                .map(|d| (d.name(), d.len()))
                .collect();
            let attributes = var
                .attributes()
                .filter_map(|attr| Some((attr.name().to_string(), attr.value().ok()?)))
                .collect();
            let values = match var.get_values::<f64, _>(..) {
                Ok(values) => Some(values),
                Err(e) => {
                    debug!("Skipping non-numeric variable '{}': {}", name, e);
                    None
                }
            };
            RawVariable {
                name,
                dims,
                attributes,
                values,
            }
        })
        .collect()
}

fn dimension_coordinate(
    var: &RawVariable,
    bounds: Option<&RawVariable>,
) -> Option<DimensionCoordinate> {
    let values = var.masked_array()?;
    let mut coordinate = DimensionCoordinate::new(Array1::from_iter(values.iter().copied()));
    coordinate.properties = var.properties();
    if let Some(bounds) = bounds {
        if let (Some(b), [n, 2]) = (bounds.masked_array(), bounds.shape().as_slice()) {
            if *n == coordinate.len() {
                coordinate.bounds =
                    Array2::from_shape_vec((*n, 2), b.iter().copied().collect()).ok();
            }
        }
    }
    Some(coordinate)
}

/// Reads every data variable in one fragment
///
/// # Errors
///
/// Returns an error if the file cannot be opened as netCDF.
pub fn read_fragment(path: &Path) -> Result<FieldList> {
    let file = netcdf::open(path)?;
    let raw = read_raw_variables(&file);
    let by_name: HashMap<&str, &RawVariable> = raw.iter().map(|v| (v.name.as_str(), v)).collect();

    let global: Vec<(String, PropertyValue)> = file
        .attributes()
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), property_value(&value)?))
        })
        .collect();

    let is_coordinate_variable =
        |v: &RawVariable| v.dims.len() == 1 && v.dims[0].0 == v.name;

    let mut non_data: HashSet<&str> = HashSet::new();
    for var in &raw {
        if is_coordinate_variable(var) {
            non_data.insert(var.name.as_str());
        }
        if let Some(coords) = var.text_attribute("coordinates") {
            non_data.extend(coords.split_whitespace());
        }
        if let Some(bounds) = var.text_attribute("bounds") {
            non_data.insert(bounds);
        }
    }

    let mut fields = FieldList::new();
    for var in &raw {
        if non_data.contains(var.name.as_str()) {
            continue;
        }
        let Some(data) = var.masked_array() else {
            continue;
        };

        let axes: Vec<DomainAxis> = var
            .dims
            .iter()
            .map(|(dim, len)| {
                let mut axis = DomainAxis::new(dim.clone(), *len);
                let coord_var = by_name
                    .get(dim.as_str())
                    .filter(|v| is_coordinate_variable(v));
                if let Some(coord_var) = coord_var {
                    let bounds = coord_var
                        .text_attribute("bounds")
                        .and_then(|b| by_name.get(b).copied());
                    axis.coordinate = dimension_coordinate(coord_var, bounds);
                }
                axis
            })
            .collect();

        let mut field = Field::new(var.name.clone(), data, axes)?;
        field.properties = var.properties();
        for (name, value) in &global {
            if !field.properties.contains(name) {
                field.properties.set(name.clone(), value.clone());
            }
        }
        field
            .properties
            .set("source_file", path.display().to_string());

        let dim_names = var.dim_names();
        if let Some(coords) = var.text_attribute("coordinates") {
            for name in coords.split_whitespace() {
                let Some(aux_var) = by_name.get(name) else {
                    continue;
                };
                if is_coordinate_variable(aux_var)
                    || !aux_var.dims.iter().all(|(d, _)| dim_names.contains(d))
                {
                    continue;
                }
                if let Some(values) = aux_var.masked_array() {
                    let mut aux = AuxiliaryCoordinate::new(name, aux_var.dim_names(), values);
                    aux.properties = aux_var.properties();
                    field.aux_coords.push(aux);
                }
            }
        }

        if let Some(measures) = var.text_attribute("cell_measures") {
            for (kind, name) in parse_cell_measures(measures) {
                let measure = match by_name.get(name.as_str()) {
                    Some(m) if m.dims.iter().all(|(d, _)| dim_names.contains(d)) => {
                        match m.masked_array() {
                            Some(values) => {
                                let mut measure = CellMeasure::new(kind, m.dim_names(), values)
                                    .with_ncvar(name.clone());
                                measure.units = m.text_attribute("units").map(str::to_string);
                                measure
                            }
                            None => CellMeasure::external(kind, name.clone()),
                        }
                    }
                    _ => CellMeasure::external(kind, name.clone()),
                };
                field.measures.push(measure);
            }
        }

        fields.push(field);
    }

    debug!("Read {} fields from {}", fields.len(), path.display());
    Ok(fields)
}

/// Reads a set of fragments into one flat list
///
/// # Errors
///
/// Fails on the first fragment that cannot be read.
pub fn read_fragments(paths: &[PathBuf]) -> Result<FieldList> {
    info!("Reading {} fragment files", paths.len());
    let mut fields = FieldList::new();
    for path in paths {
        fields.extend(read_fragment(path)?);
    }
    Ok(fields)
}
