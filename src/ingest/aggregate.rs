//! Aggregation of fragments into contiguous time series
//!
//! Fragments are grouped by variable key and a compatibility signature
//! (units, cell methods, and the kind and size of every non-time axis).
//! Each group is rebased onto a common time reference, concatenated and
//! sorted by time. A group whose fragments overlap in time stays unmerged.

use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field, FieldList, Properties};
use crate::time::TimeUnits;
use ndarray::{concatenate, Array1, Array2, ArrayD, ArrayViewD, Axis};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How fragments are judged to be the same variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityMatch {
    /// Same declared identity (standard name, long name or ncvar)
    #[default]
    Strict,
    /// Same short-code, ignoring naming metadata
    Relaxed,
}

/// Outcome of aggregating the fragments of one requested variable
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// No fragment matched
    Absent,
    /// All fragments merged into one series
    Merged(Field),
    /// More than one non-mergeable group remains
    Ambiguous(FieldList),
}

impl Aggregation {
    pub fn is_absent(&self) -> bool {
        matches!(self, Aggregation::Absent)
    }

    /// The merged field, `None` when absent
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousAggregation` when several groups remain.
    pub fn into_field(self, variable: &str) -> Result<Option<Field>> {
        match self {
            Aggregation::Absent => Ok(None),
            Aggregation::Merged(field) => Ok(Some(field)),
            Aggregation::Ambiguous(groups) => Err(MonitorError::AmbiguousAggregation {
                variable: variable.to_string(),
                groups: groups.len(),
            }),
        }
    }
}

fn variable_key(field: &Field, mode: IdentityMatch) -> String {
    match mode {
        IdentityMatch::Strict => field.identity(),
        IdentityMatch::Relaxed => field.short_code().to_string(),
    }
}

/// Compatibility signature; fields with different signatures never merge
fn signature(field: &Field) -> String {
    let axes: Vec<String> = field
        .axes
        .iter()
        .map(|a| match a.kind() {
            Some(AxisKind::T) => "T".to_string(),
            Some(kind) => format!("{}={}", kind.as_str(), a.size),
            None => format!("{}={}", a.ncdim, a.size),
        })
        .collect();
    format!(
        "{}|{}|{}",
        field.units().unwrap_or(""),
        field.properties.text("cell_methods").unwrap_or(""),
        axes.join(",")
    )
}

/// Time values of a fragment on an absolute axis, plus the units needed
/// to express them again
struct Timeline {
    absolute: Vec<f64>,
    bounds: Option<Vec<[f64; 2]>>,
    units: Option<TimeUnits>,
}

fn timeline(field: &Field, position: usize) -> Result<Timeline> {
    let coord = field.axes[position].coordinate.as_ref().ok_or_else(|| {
        MonitorError::axis(field.identity(), "time axis has no coordinate")
    })?;
    let units = match coord.units() {
        Some(u) if u.contains(" since ") => Some(TimeUnits::parse(
            u,
            coord.properties.text("calendar"),
        )?),
        _ => None,
    };
    let convert = |v: f64| -> Result<f64> {
        match &units {
            Some(units) => units.absolute_days(v),
            None => Ok(v),
        }
    };
    let absolute = coord
        .values
        .iter()
        .map(|&v| convert(v))
        .collect::<Result<Vec<f64>>>()?;
    let bounds = coord
        .bounds
        .as_ref()
        .map(|b| {
            b.outer_iter()
                .map(|row| Ok([convert(row[0])?, convert(row[1])?]))
                .collect::<Result<Vec<[f64; 2]>>>()
        })
        .transpose()?;
    Ok(Timeline {
        absolute,
        bounds,
        units,
    })
}

/// Properties shared (with equal values) by every fragment
fn common_properties(fields: &[Field]) -> Properties {
    let mut common = Properties::new();
    if let Some((first, rest)) = fields.split_first() {
        for (key, value) in first.properties.iter() {
            if rest.iter().all(|f| f.properties.get(key) == Some(value)) {
                common.set(key.clone(), value.clone());
            }
        }
    }
    common.remove("source_file");
    common
}

fn concat_along(arrays: &[ArrayViewD<'_, f64>], axis: usize) -> Result<ArrayD<f64>> {
    Ok(concatenate(Axis(axis), arrays)?)
}

/// Merges one compatible class of fragments.
///
/// Returns a single field on success, or the fragments (in time order)
/// when they overlap and cannot form one series.
fn merge_class(mut fields: Vec<Field>) -> Result<FieldList> {
    if fields.len() < 2 {
        return Ok(fields);
    }

    let Some(t) = fields[0].axis_position(AxisKind::T) else {
        // Static fields repeat in every fragment; identical copies collapse
        if fields[1..].iter().all(|f| f.data == fields[0].data) {
            let mut merged = fields.swap_remove(0);
            merged.properties.remove("source_file");
            return Ok(vec![merged]);
        }
        return Ok(fields);
    };
    if fields.iter().any(|f| f.axis_position(AxisKind::T) != Some(t)) {
        return Ok(fields);
    }

    let timelines = fields
        .iter()
        .map(|f| timeline(f, t))
        .collect::<Result<Vec<_>>>()?;
    let plain_units: Vec<Option<&str>> = fields
        .iter()
        .map(|f| f.axes[t].coordinate.as_ref().and_then(|c| c.units()))
        .collect();
    if timelines.iter().any(|tl| tl.units.is_none())
        && plain_units.iter().any(|u| *u != plain_units[0])
    {
        debug!("Fragments of '{}' have incomparable time units", fields[0].identity());
        return Ok(fields);
    }

    // Fragments in order of their first time step
    let mut order: Vec<usize> = (0..fields.len()).collect();
    order.sort_by(|&a, &b| {
        let first = |i: usize| timelines[i].absolute.first().copied().unwrap_or(f64::INFINITY);
        first(a).total_cmp(&first(b)).then_with(|| fields[a].ncvar.cmp(&fields[b].ncvar))
    });
    let reference = order[0];

    let absolute: Vec<f64> = order
        .iter()
        .flat_map(|&i| timelines[i].absolute.iter().copied())
        .collect();
    let mut sorted = absolute.clone();
    sorted.sort_by(f64::total_cmp);
    if sorted.windows(2).any(|w| (w[1] - w[0]).abs() < 1e-9) {
        warn!(
            "Fragments of '{}' overlap in time; leaving them unmerged",
            fields[reference].identity()
        );
        let ordered = order.iter().map(|&i| fields[i].clone()).collect();
        return Ok(ordered);
    }

    let express = |days: f64| -> Result<f64> {
        match &timelines[reference].units {
            Some(units) => units.from_absolute_days(days),
            None => Ok(days),
        }
    };

    let mut merged = fields[reference].clone();
    let views: Vec<ArrayViewD<'_, f64>> = order.iter().map(|&i| fields[i].data.view()).collect();
    merged.data = concat_along(&views, t)?;
    merged.axes[t].size = absolute.len();

    if let Some(coord) = merged.axes[t].coordinate.as_mut() {
        coord.values = absolute
            .iter()
            .map(|&d| express(d))
            .collect::<Result<Array1<f64>>>()?;
        coord.bounds = if order.iter().all(|&i| timelines[i].bounds.is_some()) {
            let rows = order
                .iter()
                .filter_map(|&i| timelines[i].bounds.as_ref())
                .flatten()
                .map(|[lo, hi]| Ok([express(*lo)?, express(*hi)?]))
                .collect::<Result<Vec<[f64; 2]>>>()?;
            Some(Array2::from(rows))
        } else {
            None
        };
    }

    let t_name = merged.axes[t].ncdim.clone();
    merged.aux_coords = fields[reference]
        .aux_coords
        .iter()
        .filter_map(|aux| {
            let Some(k) = aux.axes.iter().position(|a| a == &t_name) else {
                return Some(Ok(aux.clone()));
            };
            let parts: Option<Vec<ArrayViewD<'_, f64>>> = order
                .iter()
                .map(|&i| fields[i].aux(&aux.ncvar).map(|a| a.values.view()))
                .collect();
            let parts = parts?;
            Some(concat_along(&parts, k).map(|values| {
                let mut out = aux.clone();
                out.values = values;
                out
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    merged.measures = fields[reference]
        .measures
        .iter()
        .filter_map(|measure| {
            let Some(k) = measure.axes.iter().position(|a| a == &t_name) else {
                return Some(Ok(measure.clone()));
            };
            let parts: Option<Vec<ArrayViewD<'_, f64>>> = order
                .iter()
                .map(|&i| {
                    fields[i]
                        .measure(measure.kind)
                        .and_then(|m| m.values.as_ref())
                        .map(|v| v.view())
                })
                .collect();
            let parts = parts?;
            Some(concat_along(&parts, k).map(|values| {
                let mut out = measure.clone();
                out.values = Some(values);
                out
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    merged.properties = common_properties(&fields);

    // Fragments may interleave; restore global time order
    let mut steps: Vec<usize> = (0..absolute.len()).collect();
    steps.sort_by(|&a, &b| absolute[a].total_cmp(&absolute[b]));
    if steps.iter().enumerate().any(|(i, &s)| i != s) {
        merged = merged.select_along(t, &steps);
    }

    debug!(
        "Merged {} fragments of '{}' into {} time steps",
        fields.len(),
        merged.identity(),
        absolute.len()
    );
    Ok(vec![merged])
}

/// Aggregates `fields` into as few series as the matching rules allow.
///
/// The output order depends only on the variable keys and signatures, not
/// on the order of the input fragments.
///
/// # Errors
///
/// Returns an error if time units cannot be interpreted or arrays cannot
/// be concatenated.
pub fn aggregate(fields: &[Field], mode: IdentityMatch) -> Result<FieldList> {
    let mut classes: BTreeMap<(String, String), Vec<Field>> = BTreeMap::new();
    for field in fields {
        classes
            .entry((variable_key(field, mode), signature(field)))
            .or_default()
            .push(field.clone());
    }

    let mut out = FieldList::new();
    for ((key, _), class) in classes {
        let merged = merge_class(class)?;
        if merged.len() > 1 {
            debug!("'{key}' left {} unmerged fragments", merged.len());
        }
        out.extend(merged);
    }
    Ok(out)
}

/// Aggregates the fragments of a single requested variable
///
/// # Errors
///
/// Propagates failures from [`aggregate`].
pub fn aggregate_one(fields: &[Field], mode: IdentityMatch) -> Result<Aggregation> {
    let mut merged = aggregate(fields, mode)?;
    Ok(match merged.len() {
        0 => Aggregation::Absent,
        1 => Aggregation::Merged(merged.remove(0)),
        _ => Aggregation::Ambiguous(merged),
    })
}
