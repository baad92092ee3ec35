//! Calendar-month means from daily or hourly series

use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field};
use crate::reduce::kernels::reduce_axes;
use crate::reduce::CollapseMethod;
use crate::time::TimeUnits;
use ndarray::{concatenate, Array1, Array2, ArrayD, Axis};
use std::collections::BTreeMap;
use tracing::debug;

/// Atmosphere streams tried, in order, when a monthly mean is missing
pub const FALLBACK_STREAMS: [&str; 2] = ["day", "1hr"];

/// Averages `field` over calendar months.
///
/// The new time coordinate holds the mean time of each month's steps with
/// bounds spanning them. Constructs spanning time are dropped.
///
/// # Errors
///
/// Returns an axis-resolution error if the field has no time axis, or a
/// time error if its units cannot be interpreted.
pub fn monthly_mean(field: &Field) -> Result<Field> {
    let t = field
        .axis_position(AxisKind::T)
        .ok_or_else(|| MonitorError::axis(field.identity(), "no T axis for monthly mean"))?;
    let coord = field.axes[t]
        .coordinate
        .as_ref()
        .ok_or_else(|| MonitorError::axis(field.identity(), "T axis has no coordinate"))?;
    let units = TimeUnits::parse(
        coord.units().unwrap_or(""),
        coord.properties.text("calendar"),
    )?;

    let mut months: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
    for (i, &value) in coord.values.iter().enumerate() {
        months.entry(units.year_month(value)?).or_default().push(i);
    }

    let mut means = Vec::with_capacity(months.len());
    let mut times = Vec::with_capacity(months.len());
    let mut bounds = Vec::with_capacity(months.len());
    for steps in months.values() {
        let subset = field.data.select(Axis(t), steps);
        let mean = reduce_axes(&subset, &[t], CollapseMethod::Mean, None)?;
        means.push(mean.insert_axis(Axis(t)));

        let values: Vec<f64> = steps.iter().map(|&i| coord.values[i]).collect();
        times.push(values.iter().sum::<f64>() / values.len() as f64);
        let (lo, hi) = match &coord.bounds {
            Some(b) => (
                steps.iter().map(|&i| b[[i, 0]]).fold(f64::INFINITY, f64::min),
                steps.iter().map(|&i| b[[i, 1]]).fold(f64::NEG_INFINITY, f64::max),
            ),
            None => (
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ),
        };
        bounds.push([lo, hi]);
    }

    let views: Vec<_> = means.iter().map(ArrayD::view).collect();
    let data = concatenate(Axis(t), &views)?;
    debug!(
        "Monthly mean of '{}': {} steps into {} months",
        field.identity(),
        coord.values.len(),
        months.len()
    );

    let ncdim = field.axes[t].ncdim.clone();
    let mut out = field.clone();
    out.data = data;
    out.axes[t].size = times.len();
    if let Some(coord) = out.axes[t].coordinate.as_mut() {
        coord.values = Array1::from(times);
        coord.bounds = Some(Array2::from(bounds));
    }
    out.aux_coords.retain(|c| !c.axes.contains(&ncdim));
    out.measures.retain(|m| !m.axes.contains(&ncdim));
    out.properties.push_cell_method("time: mean");
    Ok(out)
}
