//! Sea-ice indices: global and hemispheric sea-ice area

use crate::axes::repair_sea_ice_axes;
use crate::config::RunContext;
use crate::errors::{MonitorError, Result, Stage, StageContext};
use crate::field::{CellMeasure, Field, FieldList, MeasureKind};
use crate::ingest::{
    aggregate_one, find_fragments, select, FragmentSet, IdentityMatch, VariableSelector,
};
use crate::reduce::sea_ice_area_integrals;
use tracing::{debug, info, info_span};

pub const CONCENTRATION_NCVAR: &str = "aice";
pub const CELL_AREA_NCVAR: &str = "tarea";
pub const CONCENTRATION_STANDARD_NAME: &str = "sea_ice_area_fraction";

/// Attaches the `tarea` field as the area measure when the concentration
/// field has none with data.
///
/// # Errors
///
/// Returns a weight-resolution error when `tarea` is needed but absent.
pub fn attach_cell_area(concentration: &mut Field, fields: &[Field]) -> Result<()> {
    if concentration.measure(MeasureKind::Area).is_some() {
        return Ok(());
    }
    let tarea = select(fields, &VariableSelector::NcVar(CELL_AREA_NCVAR.to_string()));
    let tarea = tarea.first().ok_or_else(|| {
        MonitorError::weight(
            concentration.identity(),
            "no area measure and no tarea field",
        )
    })?;
    debug!("Attaching {} as area measure", CELL_AREA_NCVAR);
    let measure = CellMeasure::new(
        MeasureKind::Area,
        tarea.axes.iter().map(|a| a.ncdim.clone()).collect(),
        tarea.data.clone(),
    )
    .with_units("m2")
    .with_ncvar(CELL_AREA_NCVAR);
    concentration.set_measure(measure)
}

/// Sea-ice area integrals from the concentration fragments
///
/// # Errors
///
/// Fails when the concentration is missing or ambiguous, or no area
/// measure can be attached.
pub fn sea_ice_area(fields: &[Field], job: &str) -> Result<FieldList> {
    let mut aice = aggregate_one(
        &select(fields, &VariableSelector::NcVar(CONCENTRATION_NCVAR.to_string())),
        IdentityMatch::Relaxed,
    )
    .and_then(|a| a.into_field(CONCENTRATION_NCVAR))
    .stage(Stage::Ingest)?
    .ok_or_else(|| MonitorError::missing("sea-ice concentration (aice)"))
    .stage(Stage::Ingest)?;

    attach_cell_area(&mut aice, fields).stage(Stage::DeriveWeights)?;
    aice.set_standard_name(CONCENTRATION_STANDARD_NAME);
    repair_sea_ice_axes(&mut aice).stage(Stage::RepairAxes)?;
    sea_ice_area_integrals(&aice, job).stage(Stage::Reduce)
}

/// All sea-ice indices of the run
///
/// # Errors
///
/// Absence of any sea-ice data is fatal.
pub fn sea_ice_indices(ctx: &RunContext) -> Result<FieldList> {
    let _span = info_span!("sea_ice").entered();
    info!("Reading sea ice files");
    let paths = find_fragments(&ctx.input_dir, &ctx.patterns.sea_ice, None).stage(Stage::Ingest)?;
    if paths.is_empty() {
        return Err(MonitorError::missing("sea-ice data").at(Stage::Ingest));
    }
    let set = FragmentSet::new("sea_ice", paths);
    sea_ice_area(set.fields().stage(Stage::Ingest)?, &ctx.job)
}
