//! Axis repair for fields whose files lack standard axis tags
//!
//! Each repair only acts when the condition it fixes is present, so
//! applying it to an already repaired field changes nothing.

use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, DimensionCoordinate, Field};
use tracing::debug;

/// Replaces the time coordinate with an auxiliary `time` coordinate.
///
/// Applies only when the field carries an auxiliary coordinate identified
/// as time; exactly one dimension coordinate must be declared `axis: T`.
///
/// # Errors
///
/// Returns an axis-resolution error ("can't find T axis") when zero or
/// several coordinates are declared as T, or the auxiliary time does not
/// fit that axis.
pub fn repair_time_axis(field: &mut Field) -> Result<()> {
    let Some(aux) = field.aux("time") else {
        return Ok(());
    };

    let declared: Vec<usize> = field
        .axes
        .iter()
        .enumerate()
        .filter(|(_, a)| a.declared_kind() == Some(AxisKind::T))
        .map(|(i, _)| i)
        .collect();
    let &[position] = declared.as_slice() else {
        return Err(MonitorError::axis(
            field.identity(),
            format!("can't find T axis ({} declared)", declared.len()),
        ));
    };

    let size = field.axes[position].size;
    if aux.values.len() != size {
        return Err(MonitorError::axis(
            field.identity(),
            format!(
                "auxiliary time has {} values but the T axis has {}",
                aux.values.len(),
                size
            ),
        ));
    }

    let values = aux.values.iter().copied().collect();
    let mut coord = DimensionCoordinate::new(values);
    coord.properties = aux.properties.clone();
    coord.properties.set("axis", "T");
    debug!(
        "Replacing T coordinate of '{}' with auxiliary '{}'",
        field.identity(),
        aux.ncvar
    );
    field.axes[position].coordinate = Some(coord);
    field.remove_aux("time");
    Ok(())
}

/// Applies [`repair_time_axis`] to every field
///
/// # Errors
///
/// Returns the first repair failure.
pub fn repair_time_axes(fields: &mut [Field]) -> Result<()> {
    fields.iter_mut().try_for_each(repair_time_axis)
}

/// Synthesizes index X/Y axes on curvilinear grids.
///
/// An auxiliary latitude gives a regular Y axis on its first dimension and
/// an auxiliary longitude an X axis on its last, unless the field already
/// has that axis.
///
/// # Errors
///
/// Returns an axis-resolution error for any other auxiliary coordinate.
pub fn repair_horizontal_axes(field: &mut Field) -> Result<()> {
    let mut targets = Vec::new();
    for aux in &field.aux_coords {
        let (kind, ncdim) = match aux.standard_name() {
            Some("latitude") => (AxisKind::Y, aux.axes.first()),
            Some("longitude") => (AxisKind::X, aux.axes.last()),
            _ => {
                return Err(MonitorError::axis(
                    field.identity(),
                    format!("unknown auxiliary coordinate '{}'", aux.identity()),
                ))
            }
        };
        let ncdim = ncdim.ok_or_else(|| {
            MonitorError::axis(field.identity(), format!("'{}' spans no axes", aux.identity()))
        })?;
        targets.push((kind, ncdim.clone()));
    }

    for (kind, ncdim) in targets {
        if field.axis_position(kind).is_some() {
            continue;
        }
        let position = field.axis_position_by_ncdim(&ncdim).ok_or_else(|| {
            MonitorError::axis(field.identity(), format!("no axis named '{ncdim}'"))
        })?;
        let size = field.axes[position].size;
        debug!("Synthesizing {} index axis on '{ncdim}'", kind.as_str());
        field.axes[position].coordinate = Some(DimensionCoordinate::index(size, kind));
    }
    Ok(())
}

fn attach_index_axis(field: &mut Field, kind: AxisKind, ncdim: &str) -> Result<()> {
    let position = field.axis_position_by_ncdim(ncdim).ok_or_else(|| {
        MonitorError::axis(field.identity(), format!("can't find {} axis", ncdim.to_uppercase()))
    })?;
    let size = field.axes[position].size;
    field.axes[position].coordinate = Some(DimensionCoordinate::index(size, kind));
    Ok(())
}

/// Normalizes sea-ice model axes.
///
/// - coordinates with `since` in their units are named `time`
/// - coordinates described as "first"/"second dimension" are declared X/Y
/// - otherwise index X/Y axes are synthesized on the `ni`/`nj` dimensions
/// - auxiliary coordinates take `latitude`/`longitude` standard names from
///   their long names
///
/// # Errors
///
/// Returns an axis-resolution error if X or Y is needed but neither a
/// described coordinate nor the `ni`/`nj` dimension exists.
pub fn repair_sea_ice_axes(field: &mut Field) -> Result<()> {
    for axis in &mut field.axes {
        let Some(coord) = axis.coordinate.as_mut() else {
            continue;
        };
        if coord.units().is_some_and(|u| u.contains("since")) {
            coord.properties.set("standard_name", "time");
        }
        let long_name = coord.properties.text("long_name").unwrap_or("").to_string();
        if long_name.contains("first dimension") {
            coord.properties.set("axis", "X");
        } else if long_name.contains("second dimension") {
            coord.properties.set("axis", "Y");
        }
    }

    if field.declared_axis_position(AxisKind::X).is_none() {
        attach_index_axis(field, AxisKind::X, "ni")?;
    }
    if field.declared_axis_position(AxisKind::Y).is_none() {
        attach_index_axis(field, AxisKind::Y, "nj")?;
    }

    for aux in &mut field.aux_coords {
        if aux.properties.text("units").is_some_and(|u| u.contains("since")) {
            aux.properties.set("standard_name", "time");
        }
        let long_name = aux.long_name().unwrap_or("").to_string();
        for name in ["longitude", "latitude"] {
            if long_name.contains(name) {
                aux.properties.set("standard_name", name);
            }
        }
    }
    Ok(())
}
