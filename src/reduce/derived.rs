//! Indices derived from other atmosphere indices

use super::operations::{collapse, CollapseMethod};
use crate::errors::{MonitorError, Result};
use crate::field::{AxisKind, Field};
use tracing::{info, warn};

pub const SOIL_MOISTURE_LAYER: &str = "moisture_content_of_soil_layer";
pub const SOIL_MOISTURE_TOTAL: &str = "mass_content_of_water_in_soil";
pub const TOA_INCOMING_SW: &str = "toa_incoming_shortwave_flux";
pub const TOA_OUTGOING_SW: &str = "toa_outgoing_shortwave_flux";
pub const TOA_OUTGOING_LW: &str = "toa_outgoing_longwave_flux";
pub const TOA_NET: &str = "toa_net_incoming_flux";

fn find<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.standard_name() == Some(name))
}

/// Total soil moisture: the layer field summed over its levels
///
/// Returns `Ok(None)` when the layer field is absent.
///
/// # Errors
///
/// Returns an axis-resolution error if the layer field has no level axis.
pub fn soil_moisture_total(fields: &[Field], job: &str) -> Result<Option<Field>> {
    let Some(layers) = find(fields, SOIL_MOISTURE_LAYER) else {
        warn!("No soil moisture data");
        return Ok(None);
    };
    info!("Summing soil moisture over layers");

    let time = layers.axis_position(AxisKind::T);
    let level = layers
        .axis_position(AxisKind::Z)
        .or_else(|| (0..layers.ndim()).find(|&i| Some(i) != time))
        .ok_or_else(|| MonitorError::axis(layers.identity(), "no soil level axis to sum over"))?;

    let mut total = collapse(layers, &[level], CollapseMethod::Sum, None, "depth")?;
    total.set_standard_name(SOIL_MOISTURE_TOTAL);
    total.properties.remove("long_name");
    total.properties.set("job", job);
    Ok(Some(total))
}

/// Net downward TOA flux `rsdt - rsut - rlut`
///
/// Returns `Ok(None)` unless all three fluxes are present.
///
/// # Errors
///
/// Returns a reduction error if the flux series do not share a shape.
pub fn toa_net_flux(fields: &[Field], job: &str) -> Result<Option<Field>> {
    let (Some(rsdt), Some(rsut), Some(rlut)) = (
        find(fields, TOA_INCOMING_SW),
        find(fields, TOA_OUTGOING_SW),
        find(fields, TOA_OUTGOING_LW),
    ) else {
        warn!("Not enough radiation data for net TOA flux");
        return Ok(None);
    };

    if rsut.shape() != rsdt.shape() || rlut.shape() != rsdt.shape() {
        return Err(MonitorError::Reduction(format!(
            "TOA flux shapes differ: {:?}, {:?}, {:?}",
            rsdt.shape(),
            rsut.shape(),
            rlut.shape()
        )));
    }

    let mut net = rsdt.clone();
    net.data = &rsdt.data - &rsut.data - &rlut.data;
    net.ncvar = "toa_net".to_string();
    net.set_standard_name(TOA_NET);
    net.properties.remove("long_name");
    net.properties.set("job", job);
    Ok(Some(net))
}
