//! AMOC at 45°N from the Atlantic meridional overturning streamfunction
//!
//! The diaptr output carries no usable latitude for its `j` lines, so the
//! line nearest 45°N is looked up from the grid's meridional size.

use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field};
use ndarray::{Array1, ArrayD, IxDyn};
use tracing::{debug, info};

/// Grid meridional size -> `j` line closest to 45°N
///
/// New model resolutions must be added here explicitly.
const LATITUDE_LINES: [(usize, usize); 3] = [
    // ORCA1
    (332, 251),
    // ORCA025
    (1207, 886),
    // ORCA12
    (3606, 2647),
];

pub const AMOC_STANDARD_NAME: &str = "amoc_45n";
pub const AMOC_NCVAR: &str = "amoc45n";
pub const AMOC_UNITS: &str = "Sv";

/// Read-only lookup of the 45°N line per model resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct LatitudeLineTable;

impl LatitudeLineTable {
    /// `j` index of the 45°N line for a grid with `ysize` rows
    pub fn line_for(&self, ysize: usize) -> Option<usize> {
        LATITUDE_LINES
            .iter()
            .find(|(size, _)| *size == ysize)
            .map(|(_, line)| *line)
    }

    /// Meridional sizes with a known line
    pub fn resolutions(&self) -> impl Iterator<Item = usize> {
        LATITUDE_LINES.iter().map(|(size, _)| *size)
    }
}

/// Positions of the (time, depth, meridional, zonal) axes
fn section_axes(field: &Field) -> Result<[usize; 4]> {
    if field.ndim() != 4 {
        return Err(MonitorError::axis(
            field.identity(),
            format!("expected a 4-D transport field, got {} dimensions", field.ndim()),
        ));
    }
    let t = field
        .axis_position(AxisKind::T)
        .ok_or_else(|| MonitorError::axis(field.identity(), "can't find T axis"))?;
    let rest: Vec<usize> = (0..4).filter(|&i| i != t).collect();
    Ok([t, rest[0], rest[1], rest[2]])
}

/// Extracts the AMOC-at-45°N time series.
///
/// The zonal axis is used directly when it has one column; otherwise the
/// first column with any unmasked value along the 45°N line is taken.
/// Depth is reduced by its maximum for each time step.
///
/// # Errors
///
/// - `UnknownResolution` when the meridional size has no table entry
/// - `MissingData` when the 45°N line is entirely masked
/// - `AxisResolution` when the field is not 4-D with a time axis
pub fn extract_amoc_45n(field: &Field, table: &LatitudeLineTable, job: &str) -> Result<Field> {
    let [t, z, y, x] = section_axes(field)?;
    let shape = field.shape();
    let ysize = shape[y];
    let line = table
        .line_for(ysize)
        .ok_or(MonitorError::UnknownResolution { ysize })?;
    info!("AMOC at 45N from j line {line} (ny = {ysize})");

    let data: ArrayD<f64> = field
        .data
        .view()
        .permuted_axes(IxDyn(&[t, z, y, x]))
        .to_owned();
    let (nt, nz, nx) = (shape[t], shape[z], shape[x]);

    let column = if nx == 1 {
        0
    } else {
        (0..nx)
            .find(|&i| {
                (0..nt).any(|ti| (0..nz).any(|zi| data[&[ti, zi, line, i][..]].is_finite()))
            })
            .ok_or_else(|| {
                MonitorError::missing(format!("unmasked ocean column on j line {line}"))
            })?
    };
    debug!("Using zonal column {column}");

    let series: Array1<f64> = (0..nt)
        .map(|ti| {
            (0..nz)
                .map(|zi| data[&[ti, zi, line, column][..]])
                .filter(|v| v.is_finite())
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
                .unwrap_or(f64::NAN)
        })
        .collect();

    let mut amoc = Field::new(AMOC_NCVAR, series.into_dyn(), vec![field.axes[t].clone()])?;
    amoc.set_units(AMOC_UNITS);
    amoc.set_standard_name(AMOC_STANDARD_NAME);
    amoc.properties.push_cell_method("depth: maximum");
    amoc.properties.set("job", job);
    Ok(amoc)
}
