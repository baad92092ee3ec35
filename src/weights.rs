//! Weight derivation: locating area measures, building volume measures and
//! computing area weights for horizontal means.

use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, CellMeasure, DimensionCoordinate, Field, MeasureKind};
use crate::reduce::kernels::broadcast_weights;
use ndarray::{Array1, ArrayD, Axis, IxDyn};
use tracing::debug;

/// Mean Earth radius used for spherical cell areas (metres)
pub const EARTH_RADIUS: f64 = 6_371_229.0;

/// Identity of an explicit cell-area diagnostic
pub const CELL_AREA: &str = "cell_area";

/// Where the area operand of a volume measure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaSource {
    /// A separate cell-area field in the same stream
    ExplicitField,
    /// The area measure already attached to the thickness field
    AttachedMeasure,
}

/// Resolves the cell area for `thickness`.
///
/// Search order: an explicit `cell_area` field among `fields`, then the
/// area measure attached to the thickness field itself.
///
/// # Errors
///
/// Returns a weight-resolution error if neither exists.
pub fn resolve_area(fields: &[Field], thickness: &Field) -> Result<(CellMeasure, AreaSource)> {
    if let Some(area) = fields
        .iter()
        .find(|f| f.standard_name() == Some(CELL_AREA))
    {
        debug!("Using explicit {} field '{}'", CELL_AREA, area.ncvar);
        let mut measure = CellMeasure::new(
            MeasureKind::Area,
            area.axes.iter().map(|a| a.ncdim.clone()).collect(),
            area.data.clone(),
        )
        .with_ncvar(area.ncvar.clone());
        measure.units = area.units().map(str::to_string);
        return Ok((measure, AreaSource::ExplicitField));
    }

    if let Some(measure) = thickness.measure(MeasureKind::Area) {
        debug!("Using area measure attached to '{}'", thickness.ncvar);
        return Ok((measure.clone(), AreaSource::AttachedMeasure));
    }

    Err(MonitorError::weight(
        thickness.identity(),
        "no cell area field and no area measure on the thickness field",
    ))
}

/// Removes size-1 axes of `measure` that `axes` does not have.
///
/// Axes with a real extent are never removed.
pub fn squeeze_measure(measure: &CellMeasure, axes: &[String]) -> CellMeasure {
    let mut out = measure.clone();
    let Some(mut values) = out.values.take() else {
        return out;
    };
    let mut i = out.axes.len();
    while i > 0 {
        i -= 1;
        if values.shape()[i] == 1 && !axes.contains(&out.axes[i]) {
            values = values.index_axis_move(Axis(i), 0);
            out.axes.remove(i);
        }
    }
    out.values = Some(values);
    out
}

/// Expands a measure to the full data shape of `field`
///
/// # Errors
///
/// Returns a weight-resolution error if the measure has no data or spans
/// an axis the field lacks.
pub fn measure_weights(field: &Field, measure: &CellMeasure) -> Result<ArrayD<f64>> {
    let values = measure.values.as_ref().ok_or_else(|| {
        MonitorError::weight(
            field.identity(),
            format!("{} measure has no data", measure.kind.as_str()),
        )
    })?;
    let positions = measure
        .axes
        .iter()
        .map(|name| {
            field.axis_position_by_ncdim(name).ok_or_else(|| {
                MonitorError::weight(
                    field.identity(),
                    format!(
                        "{} measure spans axis '{}' which the field does not have",
                        measure.kind.as_str(),
                        name
                    ),
                )
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    broadcast_weights(values, &positions, field.shape())
        .map_err(|e| MonitorError::weight(field.identity(), e.to_string()))
}

/// Volume measure (area × thickness, per time step) on the thickness grid
///
/// # Errors
///
/// Returns a weight-resolution error if the area cannot be broadcast
/// against the thickness field.
pub fn volume_measure(thickness: &Field, area: &CellMeasure) -> Result<CellMeasure> {
    let names: Vec<String> = thickness.axes.iter().map(|a| a.ncdim.clone()).collect();
    let area = squeeze_measure(area, &names);
    let area_weights = measure_weights(thickness, &area)?;
    let volume = &thickness.data * &area_weights;
    Ok(CellMeasure::new(MeasureKind::Volume, names, volume)
        .with_units("m3")
        .with_ncvar("cell_volume"))
}

/// Attaches a volume measure to `target`, replacing any previous one.
///
/// # Errors
///
/// Returns a weight-resolution error if the target's axes do not cover the
/// measure's.
pub fn attach_volume(target: &mut Field, volume: CellMeasure) -> Result<()> {
    debug!("Attaching volume measure to '{}'", target.identity());
    target.set_measure(volume)
}

/// Creates regular cell bounds on the X and Y coordinates where missing.
///
/// # Errors
///
/// Returns an axis-resolution error when either horizontal axis has no
/// coordinate.
pub fn ensure_horizontal_bounds(field: &mut Field) -> Result<()> {
    for kind in [AxisKind::X, AxisKind::Y] {
        let position = field.axis_position(kind).ok_or_else(|| {
            MonitorError::axis(field.identity(), format!("no {} axis", kind.as_str()))
        })?;
        if let Some(coord) = field.axes[position].coordinate.as_mut() {
            if coord.bounds.is_none() {
                coord.bounds = Some(coord.create_bounds());
            }
        }
    }
    Ok(())
}

fn is_latitude(coord: &DimensionCoordinate) -> bool {
    matches!(coord.standard_name(), Some("latitude" | "grid_latitude"))
        || coord.units().is_some_and(|u| u.starts_with("degree") && u.ends_with('N'))
        || coord.units().is_some_and(|u| u.contains("north"))
}

fn is_longitude(coord: &DimensionCoordinate) -> bool {
    matches!(coord.standard_name(), Some("longitude" | "grid_longitude"))
        || coord.units().is_some_and(|u| u.starts_with("degree") && u.ends_with('E'))
        || coord.units().is_some_and(|u| u.contains("east"))
}

/// Cell extents along one horizontal axis
fn cell_widths(coord: &DimensionCoordinate, kind: AxisKind) -> Array1<f64> {
    let bounds = coord.bounds.clone().unwrap_or_else(|| coord.create_bounds());
    bounds
        .outer_iter()
        .map(|b| {
            let (lo, hi) = (b[0].min(b[1]), b[0].max(b[1]));
            match kind {
                AxisKind::Y if is_latitude(coord) => {
                    let lo = lo.clamp(-90.0, 90.0).to_radians();
                    let hi = hi.clamp(-90.0, 90.0).to_radians();
                    EARTH_RADIUS * (hi.sin() - lo.sin())
                }
                AxisKind::X if is_longitude(coord) => EARTH_RADIUS * (hi - lo).to_radians(),
                _ => hi - lo,
            }
        })
        .collect()
}

/// Area weights over the full data shape of `field`.
///
/// An attached area measure is used when present; otherwise cell areas
/// are computed from the horizontal coordinate bounds, spherically for
/// latitude/longitude and with unit widths for index axes.
///
/// # Errors
///
/// Returns an error if a horizontal axis is missing or the measure does
/// not fit the field.
pub fn area_weights(field: &Field) -> Result<ArrayD<f64>> {
    if let Some(measure) = field.measure(MeasureKind::Area) {
        return measure_weights(field, measure);
    }

    let mut widths = Vec::with_capacity(2);
    let mut positions = Vec::with_capacity(2);
    for kind in [AxisKind::Y, AxisKind::X] {
        let position = field.axis_position(kind).ok_or_else(|| {
            MonitorError::weight(
                field.identity(),
                format!("no {} axis for area weights", kind.as_str()),
            )
        })?;
        let coord = field.axes[position].coordinate.as_ref().ok_or_else(|| {
            MonitorError::weight(
                field.identity(),
                format!("{} axis has no coordinate", kind.as_str()),
            )
        })?;
        widths.push(cell_widths(coord, kind));
        positions.push(position);
    }

    let (ny, nx) = (widths[0].len(), widths[1].len());
    let cells = ArrayD::from_shape_fn(IxDyn(&[ny, nx]), |ix| widths[0][ix[0]] * widths[1][ix[1]]);
    broadcast_weights(&cells, &positions, field.shape())
}
