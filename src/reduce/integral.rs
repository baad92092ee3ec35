//! Sea-ice area integrals with hemispheric split

use super::kernels::broadcast_weights;
use super::operations::{collapse, CollapseMethod};
use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field, FieldList, MeasureKind};
use crate::weights::measure_weights;
use ndarray::{ArrayD, Zip};
use tracing::debug;

/// Square metres per output unit (`Mm2`, i.e. 10^12 m²)
pub const SQUARE_METRES_PER_MM2: f64 = 1.0e12;

/// Output units of the sea-ice integrals
pub const INTEGRAL_UNITS: &str = "Mm2";

/// Region an integral is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Global,
    North,
    South,
}

impl Hemisphere {
    pub const ALL: [Hemisphere; 3] = [Hemisphere::Global, Hemisphere::North, Hemisphere::South];

    /// Output identity of the integral over this region
    pub const fn standard_name(self) -> &'static str {
        match self {
            Hemisphere::Global => "global_sea_ice_area",
            Hemisphere::North => "northern_sea_ice_area",
            Hemisphere::South => "southern_sea_ice_area",
        }
    }

    fn contains(self, latitude: f64) -> bool {
        match self {
            Hemisphere::Global => true,
            Hemisphere::North => latitude > 0.0,
            Hemisphere::South => latitude < 0.0,
        }
    }
}

/// Drops unitless area measures when one with units is present.
///
/// Some ingestion paths attach both the file's own area measure and an
/// external one without units; only the former is meaningful.
pub fn discard_unitless_area_measures(field: &mut Field) {
    let with_units = field
        .measures_of(MeasureKind::Area)
        .filter(|m| m.has_units())
        .count();
    if with_units == 0 {
        return;
    }
    let before = field.measures.len();
    field
        .measures
        .retain(|m| m.kind != MeasureKind::Area || m.has_units());
    let dropped = before - field.measures.len();
    if dropped > 0 {
        debug!("Discarded {dropped} unitless area measure(s) from '{}'", field.identity());
    }
}

/// Latitude of every data cell
fn cell_latitudes(field: &Field) -> Result<ArrayD<f64>> {
    if let Some(aux) = field.aux("latitude") {
        let positions = aux
            .axes
            .iter()
            .map(|name| {
                field.axis_position_by_ncdim(name).ok_or_else(|| {
                    MonitorError::axis(
                        field.identity(),
                        format!("latitude spans unknown axis '{name}'"),
                    )
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        return broadcast_weights(&aux.values, &positions, field.shape());
    }

    if let Some(y) = field.axis_position(AxisKind::Y) {
        if let Some(coord) = &field.axes[y].coordinate {
            if coord.standard_name() == Some("latitude") {
                let values = coord.values.clone().into_dyn();
                return broadcast_weights(&values, &[y], field.shape());
            }
        }
    }

    Err(MonitorError::axis(field.identity(), "no latitude coordinate for hemispheric split"))
}

/// Global, northern and southern area integrals of a sea-ice field.
///
/// The field must carry an area measure in square metres. Cells with zero
/// area are treated as missing. Results are in `Mm2`.
///
/// # Errors
///
/// Returns a weight-resolution error if no suitable area measure exists,
/// or an axis-resolution error if the horizontal axes or latitudes are
/// missing.
pub fn sea_ice_area_integrals(field: &Field, job: &str) -> Result<FieldList> {
    let mut field = field.clone();
    discard_unitless_area_measures(&mut field);

    let measure = field
        .measures_of(MeasureKind::Area)
        .find(|m| m.is_square_metres() && m.values.is_some())
        .ok_or_else(|| MonitorError::weight(field.identity(), "can't find area measure in m2"))?
        .clone();

    let mut area = measure_weights(&field, &measure)?;
    let zero_cells = area.iter().filter(|&&a| a == 0.0).count();
    if zero_cells > 0 {
        debug!("Masking {zero_cells} zero-area cells");
    }
    area.mapv_inplace(|a| if a == 0.0 { f64::NAN } else { a });

    let y = field
        .axis_position(AxisKind::Y)
        .ok_or_else(|| MonitorError::axis(field.identity(), "no Y axis"))?;
    let x = field
        .axis_position(AxisKind::X)
        .ok_or_else(|| MonitorError::axis(field.identity(), "no X axis"))?;
    let latitudes = cell_latitudes(&field)?;

    let mut integrals = FieldList::with_capacity(Hemisphere::ALL.len());
    for region in Hemisphere::ALL {
        let mut subset = field.clone();
        if region != Hemisphere::Global {
            Zip::from(&mut subset.data)
                .and(&latitudes)
                .for_each(|v, &lat| {
                    if !region.contains(lat) {
                        *v = f64::NAN;
                    }
                });
        }

        let mut integral =
            collapse(&subset, &[y, x], CollapseMethod::Integral, Some(&area), "area")?;
        integral.data.mapv_inplace(|v| v / SQUARE_METRES_PER_MM2);
        integral.set_units(INTEGRAL_UNITS);
        integral.set_standard_name(region.standard_name());
        integral.properties.set("job", job);
        integrals.push(integral);
    }
    Ok(integrals)
}
