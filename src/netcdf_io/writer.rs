//! Writes an assembled index collection to a single netCDF file
//!
//! The file is first written under a temporary name and only renamed into
//! place once complete, so a failed write never leaves a partial index.

use crate::errors::Result;
use crate::field::{DimensionCoordinate, Field, PropertyValue};
use chrono::Utc;
use ndarray::ArrayD;
use netcdf::{create, FileMut};
use std::collections::HashSet;
use std::{fs, path::Path};
use tracing::{debug, warn};

/// Fill value for missing data (netCDF default for doubles)
pub const FILL_VALUE_F64: f64 = 9.969_209_968_386_869e36;

struct WrittenDimension {
    name: String,
    len: usize,
    coordinate: Option<DimensionCoordinate>,
}

/// Writer for the monitoring index file
pub struct IndexWriter<'a> {
    output_path: &'a Path,
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        cleaned
    } else {
        format!("v_{cleaned}")
    }
}

fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn put_property(var: &mut netcdf::VariableMut<'_>, key: &str, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Text(s) => {
            var.put_attribute(key, s.clone())?;
        }
        PropertyValue::Number(n) => {
            var.put_attribute(key, *n)?;
        }
    }
    Ok(())
}

impl<'a> IndexWriter<'a> {
    /// Create a new index writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write all fields, sharing dimensions between identical axes
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, fields: &[Field]) -> Result<()> {
        let partial = self.output_path.with_extension("nc.partial");
        if partial.exists() {
            fs::remove_file(&partial)?;
        }

        {
            let mut file = create(&partial)?;
            self.write_into(&mut file, fields)?;
        }

        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }
        fs::rename(&partial, self.output_path)?;
        Ok(())
    }

    fn write_into(&self, file: &mut FileMut, fields: &[Field]) -> Result<()> {
        let mut dimensions: Vec<WrittenDimension> = Vec::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut has_bounds_dim = false;

        for field in fields {
            let mut dim_names = Vec::with_capacity(field.axes.len());
            for axis in &field.axes {
                let existing = dimensions.iter().find(|d| {
                    d.len == axis.size
                        && match (&d.coordinate, &axis.coordinate) {
                            (Some(a), Some(b)) => a.values == b.values && a.units() == b.units(),
                            (None, None) => true,
                            _ => false,
                        }
                });
                if let Some(dim) = existing {
                    dim_names.push(dim.name.clone());
                    continue;
                }

                let base = axis
                    .coordinate
                    .as_ref()
                    .and_then(DimensionCoordinate::standard_name)
                    .unwrap_or(&axis.ncdim);
                let name = unique_name(&sanitize(base), &mut taken);
                file.add_dimension(&name, axis.size)?;

                if let Some(coord) = &axis.coordinate {
                    let mut var = file.add_variable::<f64>(&name, &[name.as_str()])?;
                    for (key, value) in coord.properties.iter() {
                        put_property(&mut var, key, value)?;
                    }
                    var.put(coord.values.view().into_dyn(), ..)?;

                    if let Some(bounds) = &coord.bounds {
                        let bounds_name = format!("{name}_bnds");
                        var.put_attribute("bounds", bounds_name.clone())?;
                        drop(var);
                        if !has_bounds_dim {
                            file.add_dimension("bnds", 2)?;
                            has_bounds_dim = true;
                        }
                        let mut bounds_var =
                            file.add_variable::<f64>(&bounds_name, &[name.as_str(), "bnds"])?;
                        bounds_var.put(bounds.view().into_dyn(), ..)?;
                        taken.insert(bounds_name);
                    }
                }

                dimensions.push(WrittenDimension {
                    name: name.clone(),
                    len: axis.size,
                    coordinate: axis.coordinate.clone(),
                });
                dim_names.push(name);
            }

            let var_name = unique_name(&sanitize(&field.ncvar), &mut taken);
            let dim_refs: Vec<&str> = dim_names.iter().map(String::as_str).collect();
            let mut var = file.add_variable::<f64>(&var_name, &dim_refs)?;
            var.put_attribute("_FillValue", FILL_VALUE_F64)?;
            for (key, value) in field.properties.iter() {
                if key == "_FillValue" || key == "missing_value" {
                    continue;
                }
                put_property(&mut var, key, value)?;
            }

            let filled: ArrayD<f64> = field
                .data
                .mapv(|v| if v.is_finite() { v } else { FILL_VALUE_F64 });
            var.put(filled.view(), ..)?;
            debug!("Wrote '{}' as '{}'", field.identity(), var_name);
        }

        if fields.is_empty() {
            warn!("Index collection is empty; writing file with no variables");
        }

        file.add_attribute("Conventions", "CF-1.8")?;
        file.add_attribute(
            "history",
            format!("Created by monitor_index on {}", Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}

/// Writes `fields` to `output_path`
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_index(fields: &[Field], output_path: &Path) -> Result<()> {
    IndexWriter::new(output_path).write(fields)
}
