//! Area-weighted horizontal means

use super::operations::{collapse, CollapseMethod};
use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field};
use crate::weights::{area_weights, ensure_horizontal_bounds};
use tracing::debug;

/// Area-weighted mean over the two horizontal axes.
///
/// Horizontal bounds are synthesized when missing. Other axes (time,
/// levels) are kept, so the result is a time series or a scalar.
///
/// # Errors
///
/// Returns an axis-resolution error if X or Y is missing and a
/// weight-resolution error if no area weights can be formed.
pub fn area_mean(field: &Field, job: &str) -> Result<Field> {
    let mut field = field.clone();
    ensure_horizontal_bounds(&mut field)?;
    let y = field
        .axis_position(AxisKind::Y)
        .ok_or_else(|| MonitorError::axis(field.identity(), "no Y axis"))?;
    let x = field
        .axis_position(AxisKind::X)
        .ok_or_else(|| MonitorError::axis(field.identity(), "no X axis"))?;

    let weights = area_weights(&field)?;
    debug!("Area mean of '{}' over axes {y} and {x}", field.identity());
    let mut mean = collapse(&field, &[y, x], CollapseMethod::Mean, Some(&weights), "area")?;
    mean.properties.set("job", job);
    Ok(mean)
}
