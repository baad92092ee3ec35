//! Core collapse operations and traits
//!
//! This module defines the collapse methods and the generic field collapse
//! the named reductions are built on.

use super::kernels;
use crate::errors::Result;
use crate::field::Field;
use ndarray::ArrayD;

/// Supported collapse methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseMethod {
    /// (Weighted) arithmetic mean
    Mean,
    /// Unweighted sum
    Sum,
    /// Maximum value
    Maximum,
    /// Weighted sum, i.e. sum of value times measure
    Integral,
}

impl CollapseMethod {
    /// CF `cell_methods` name of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Maximum => "maximum",
            Self::Integral => "integral",
        }
    }
}

/// Trait for arrays that can be collapsed over a set of axes
pub trait AxisReduction {
    /// Collapse over `axes`, optionally weighted by a same-shape array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An axis is out of bounds for the array
    /// - The weights do not match the array shape
    fn collapse_axes(
        &self,
        axes: &[usize],
        method: CollapseMethod,
        weights: Option<&ArrayD<f64>>,
    ) -> Result<ArrayD<f64>>;
}

impl AxisReduction for ArrayD<f64> {
    fn collapse_axes(
        &self,
        axes: &[usize],
        method: CollapseMethod,
        weights: Option<&ArrayD<f64>>,
    ) -> Result<ArrayD<f64>> {
        kernels::reduce_axes(self, axes, method, weights)
    }
}

/// Collapses `field` over the axes at `positions`, returning a new field.
///
/// The collapsed axes disappear from the result together with every
/// auxiliary coordinate and measure spanning them; `label` names the
/// collapsed axes in the appended cell method (`area: mean`).
///
/// # Errors
///
/// Returns an error if the reduction cannot be applied.
pub fn collapse(
    field: &Field,
    positions: &[usize],
    method: CollapseMethod,
    weights: Option<&ArrayD<f64>>,
    label: &str,
) -> Result<Field> {
    let data = field.data.collapse_axes(positions, method, weights)?;
    let removed: Vec<&str> = positions
        .iter()
        .filter_map(|&i| field.axes.get(i).map(|a| a.ncdim.as_str()))
        .collect();

    let mut result = field.clone();
    result.data = data;
    result.axes = field
        .axes
        .iter()
        .enumerate()
        .filter(|(i, _)| !positions.contains(i))
        .map(|(_, a)| a.clone())
        .collect();
    result
        .aux_coords
        .retain(|c| !c.axes.iter().any(|a| removed.contains(&a.as_str())));
    result
        .measures
        .retain(|m| !m.axes.iter().any(|a| removed.contains(&a.as_str())));
    result
        .properties
        .push_cell_method(&format!("{label}: {}", method.as_str()));
    Ok(result)
}
