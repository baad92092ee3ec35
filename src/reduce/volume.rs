//! Volume-weighted global means

use super::operations::{collapse, CollapseMethod};
use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field, MeasureKind};
use crate::weights::measure_weights;

/// Prefix given to the identity of volume means
pub const GLOBAL_MEAN_PREFIX: &str = "global_mean_";

/// Volume-weighted mean over every axis except time.
///
/// The result is renamed `global_mean_<identity>` and keeps the source
/// units.
///
/// # Errors
///
/// Returns a weight-resolution error if no volume measure is attached.
pub fn volume_mean(field: &Field, job: &str) -> Result<Field> {
    let measure = field.measure(MeasureKind::Volume).ok_or_else(|| {
        MonitorError::weight(field.identity(), "no volume measure attached")
    })?;
    let weights = measure_weights(field, measure)?;
    let time = field.axis_position(AxisKind::T);
    let spatial: Vec<usize> = (0..field.ndim()).filter(|&i| Some(i) != time).collect();

    let mut mean = collapse(field, &spatial, CollapseMethod::Mean, Some(&weights), "volume")?;
    let name = field
        .standard_name()
        .map(str::to_string)
        .unwrap_or_else(|| field.identity());
    mean.set_standard_name(format!("{GLOBAL_MEAN_PREFIX}{name}"));
    mean.properties.set("job", job);
    Ok(mean)
}
