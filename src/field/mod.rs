//! Labeled scientific fields
//!
//! A [`Field`] is an N-dimensional `f64` array (NaN marks missing entries)
//! plus its domain axes, auxiliary coordinates, cell measures and a
//! property bag. Fields are created by ingestion, repaired in place by the
//! axis repairer and weight deriver, and consumed by the reductions, which
//! return new lower-rank fields.

mod construct;
mod properties;

pub use construct::{
    AuxiliaryCoordinate, AxisKind, CellMeasure, DimensionCoordinate, DomainAxis, MeasureKind,
};
pub use properties::{Properties, PropertyValue};

use crate::errors::{MonitorError, Result};
use ndarray::{ArrayD, Axis};

/// A named scientific quantity on a labeled domain
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// netCDF variable name the field was read from
    pub ncvar: String,
    pub data: ArrayD<f64>,
    /// Domain axes in data order
    pub axes: Vec<DomainAxis>,
    pub aux_coords: Vec<AuxiliaryCoordinate>,
    pub measures: Vec<CellMeasure>,
    pub properties: Properties,
}

impl Field {
    /// Creates a field, checking the axes against the data shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the number or sizes of the axes disagree with
    /// the data array.
    pub fn new(ncvar: impl Into<String>, data: ArrayD<f64>, axes: Vec<DomainAxis>) -> Result<Self> {
        let ncvar = ncvar.into();
        let sizes: Vec<usize> = axes.iter().map(|a| a.size).collect();
        if sizes != data.shape() {
            return Err(MonitorError::axis(
                ncvar,
                format!(
                    "axes {:?} do not match data shape {:?}",
                    sizes,
                    data.shape()
                ),
            ));
        }
        Ok(Self {
            ncvar,
            data,
            axes,
            aux_coords: Vec::new(),
            measures: Vec::new(),
            properties: Properties::new(),
        })
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    #[must_use]
    pub fn with_aux(mut self, aux: AuxiliaryCoordinate) -> Self {
        self.aux_coords.push(aux);
        self
    }

    /// Adds a measure without the one-per-kind check; ingestion uses this
    /// to record what the file declared.
    #[must_use]
    pub fn with_measure(mut self, measure: CellMeasure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn standard_name(&self) -> Option<&str> {
        self.properties.text("standard_name")
    }

    pub fn long_name(&self) -> Option<&str> {
        self.properties.text("long_name")
    }

    pub fn units(&self) -> Option<&str> {
        self.properties.text("units")
    }

    pub fn set_standard_name(&mut self, name: impl Into<String>) {
        self.properties.set("standard_name", name.into());
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        self.properties.set("units", units.into());
    }

    /// Standard name, long name, or `ncvar%<name>` in that order
    pub fn identity(&self) -> String {
        self.standard_name()
            .or_else(|| self.long_name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("ncvar%{}", self.ncvar))
    }

    /// Variable short-code: the ncvar without a trailing `_<digits>`
    pub fn short_code(&self) -> &str {
        match self.ncvar.rsplit_once('_') {
            Some((stem, suffix))
                if !stem.is_empty()
                    && !suffix.is_empty()
                    && suffix.bytes().all(|b| b.is_ascii_digit()) =>
            {
                stem
            }
            _ => &self.ncvar,
        }
    }

    /// Position of the first axis whose coordinate plays `kind`
    pub fn axis_position(&self, kind: AxisKind) -> Option<usize> {
        self.axes.iter().position(|a| a.kind() == Some(kind))
    }

    /// Position of the axis declared (via `axis`) as `kind`
    pub fn declared_axis_position(&self, kind: AxisKind) -> Option<usize> {
        self.axes.iter().position(|a| a.declared_kind() == Some(kind))
    }

    pub fn axis_position_by_ncdim(&self, ncdim: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.ncdim == ncdim)
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&DomainAxis> {
        self.axis_position(kind).map(|i| &self.axes[i])
    }

    pub fn time_coordinate(&self) -> Option<&DimensionCoordinate> {
        self.axis(AxisKind::T).and_then(|a| a.coordinate.as_ref())
    }

    /// Auxiliary coordinate by standard name or ncvar
    pub fn aux(&self, identity: &str) -> Option<&AuxiliaryCoordinate> {
        self.aux_coords
            .iter()
            .find(|c| c.standard_name() == Some(identity) || c.ncvar == identity)
    }

    pub fn remove_aux(&mut self, identity: &str) -> Option<AuxiliaryCoordinate> {
        let pos = self
            .aux_coords
            .iter()
            .position(|c| c.standard_name() == Some(identity) || c.ncvar == identity)?;
        Some(self.aux_coords.remove(pos))
    }

    /// First measure of `kind` that carries data
    pub fn measure(&self, kind: MeasureKind) -> Option<&CellMeasure> {
        self.measures
            .iter()
            .find(|m| m.kind == kind && m.values.is_some())
    }

    pub fn measures_of(&self, kind: MeasureKind) -> impl Iterator<Item = &CellMeasure> {
        self.measures.iter().filter(move |m| m.kind == kind)
    }

    /// Attaches a measure, replacing any existing one of the same kind.
    ///
    /// # Errors
    ///
    /// Returns a weight-resolution error when the measure spans an axis
    /// the field does not have, or its shape disagrees with those axes.
    pub fn set_measure(&mut self, measure: CellMeasure) -> Result<()> {
        let mut expected = Vec::with_capacity(measure.axes.len());
        for name in &measure.axes {
            match self.axes.iter().find(|a| &a.ncdim == name) {
                Some(axis) => expected.push(axis.size),
                None => {
                    return Err(MonitorError::weight(
                        self.identity(),
                        format!(
                            "{} measure spans axis '{}' which the field does not have",
                            measure.kind.as_str(),
                            name
                        ),
                    ))
                }
            }
        }
        if let Some(values) = &measure.values {
            if values.shape() != expected.as_slice() {
                return Err(MonitorError::weight(
                    self.identity(),
                    format!(
                        "{} measure shape {:?} does not match axes {:?}",
                        measure.kind.as_str(),
                        values.shape(),
                        expected
                    ),
                ));
            }
        }
        self.measures.retain(|m| m.kind != measure.kind);
        self.measures.push(measure);
        Ok(())
    }

    /// Removes a size-1 axis from the data and every construct spanning it.
    ///
    /// # Errors
    ///
    /// Returns an axis-resolution error if the axis is not degenerate.
    pub fn squeeze_axis(&mut self, position: usize) -> Result<()> {
        let axis = self.axes.get(position).ok_or_else(|| {
            MonitorError::axis(self.identity(), format!("no axis at position {position}"))
        })?;
        if axis.size != 1 {
            return Err(MonitorError::axis(
                self.identity(),
                format!("cannot squeeze axis '{}' of size {}", axis.ncdim, axis.size),
            ));
        }
        let ncdim = axis.ncdim.clone();
        let data = std::mem::take(&mut self.data);
        self.data = data.index_axis_move(Axis(position), 0);
        self.axes.remove(position);

        for aux in &mut self.aux_coords {
            if let Some(i) = aux.axes.iter().position(|a| a == &ncdim) {
                let values = std::mem::take(&mut aux.values);
                aux.values = values.index_axis_move(Axis(i), 0);
                aux.axes.remove(i);
            }
        }
        for measure in &mut self.measures {
            if let Some(i) = measure.axes.iter().position(|a| a == &ncdim) {
                if let Some(values) = measure.values.take() {
                    measure.values = Some(values.index_axis_move(Axis(i), 0));
                }
                measure.axes.remove(i);
            }
        }
        Ok(())
    }

    /// Keeps only the given steps along the axis at `position`
    ///
    /// Constructs spanning the axis are subset alongside the data.
    pub fn select_along(&self, position: usize, indices: &[usize]) -> Field {
        let ncdim = &self.axes[position].ncdim;
        let mut out = self.clone();
        out.data = self.data.select(Axis(position), indices);
        out.axes[position].size = indices.len();
        if let Some(coord) = &mut out.axes[position].coordinate {
            coord.values = coord.values.select(Axis(0), indices);
            if let Some(bounds) = &coord.bounds {
                coord.bounds = Some(bounds.select(Axis(0), indices));
            }
        }
        for aux in &mut out.aux_coords {
            if let Some(i) = aux.axes.iter().position(|a| a == ncdim) {
                aux.values = aux.values.select(Axis(i), indices);
            }
        }
        for measure in &mut out.measures {
            if let Some(i) = measure.axes.iter().position(|a| a == ncdim) {
                if let Some(values) = &measure.values {
                    measure.values = Some(values.select(Axis(i), indices));
                }
            }
        }
        out
    }
}

/// An ordered collection of fields
pub type FieldList = Vec<Field>;
