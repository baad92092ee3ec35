//! Ocean indices: volume means on the T grid and AMOC at 45°N

use crate::axes::{repair_horizontal_axes, repair_time_axis};
use crate::config::RunContext;
use crate::errors::{MonitorError, Result, Stage, StageContext};
use crate::field::{Field, FieldList};
use crate::ingest::{
    aggregate, aggregate_one, find_fragments, select, FragmentSet, IdentityMatch, VariableSelector,
};
use crate::reduce::volume_mean;
use crate::section::{extract_amoc_45n, LatitudeLineTable};
use crate::weights::{attach_volume, resolve_area, volume_measure, CELL_AREA};
use tracing::{info, info_span};

/// Cell thickness diagnostic (the standard name is shared by others)
pub const THICKNESS_NCVAR: &str = "thkcello";

/// Atlantic overturning streamfunction in the diaptr output
pub const AMOC_SOURCE_NCVAR: &str = "zomsfatl";

fn grid_fragments(ctx: &RunContext, grid: &str) -> Result<FragmentSet> {
    let paths = find_fragments(&ctx.input_dir, &ctx.patterns.ocean, Some(grid))?;
    if paths.is_empty() {
        return Err(MonitorError::missing(format!("ocean {grid} data")));
    }
    Ok(FragmentSet::new(grid, paths))
}

/// Volume-weighted global means of the configured T-grid variables
///
/// # Errors
///
/// Fails when the thickness, an area source or any requested variable is
/// missing, or a repair or reduction fails.
pub fn volume_means(fields: &[Field], variables: &[String], job: &str) -> Result<FieldList> {
    let thickness = aggregate_one(
        &select(fields, &VariableSelector::NcVar(THICKNESS_NCVAR.to_string())),
        IdentityMatch::Relaxed,
    )
    .and_then(|a| a.into_field(THICKNESS_NCVAR))
    .stage(Stage::Ingest)?
    .ok_or_else(|| MonitorError::missing("cell thickness (thkcello)"))
    .stage(Stage::Ingest)?;

    let areas = aggregate(
        &select(fields, &VariableSelector::Identity(CELL_AREA.to_string())),
        IdentityMatch::Strict,
    )
    .stage(Stage::Ingest)?;
    let (area, source) = resolve_area(&areas, &thickness).stage(Stage::DeriveWeights)?;
    info!("Cell area from {:?}", source);
    let volume = volume_measure(&thickness, &area).stage(Stage::DeriveWeights)?;

    let mut means = FieldList::with_capacity(variables.len());
    for variable in variables {
        info!("Global mean of {variable}");
        let mut field = aggregate_one(
            &select(fields, &VariableSelector::Identity(variable.clone())),
            IdentityMatch::Strict,
        )
        .and_then(|a| a.into_field(variable))
        .stage(Stage::Ingest)?
        .ok_or_else(|| MonitorError::missing(format!("ocean variable {variable}")))
        .stage(Stage::Ingest)?;

        repair_time_axis(&mut field).stage(Stage::RepairAxes)?;
        repair_horizontal_axes(&mut field).stage(Stage::RepairAxes)?;
        attach_volume(&mut field, volume.clone()).stage(Stage::DeriveWeights)?;
        means.push(volume_mean(&field, job).stage(Stage::Reduce)?);
    }
    Ok(means)
}

/// AMOC at 45°N from the diaptr fragments
///
/// # Errors
///
/// Fails when the streamfunction is missing or ambiguous, or the grid
/// resolution is unknown.
pub fn amoc_index(fields: &[Field], table: &LatitudeLineTable, job: &str) -> Result<Field> {
    let mut transport = select(fields, &VariableSelector::NcVar(AMOC_SOURCE_NCVAR.to_string()));
    if transport.is_empty() {
        return Err(
            MonitorError::missing(format!("{AMOC_SOURCE_NCVAR} for AMOC")).at(Stage::Ingest)
        );
    }

    // Latitude/longitude of the diaptr lines carry no usable position
    for field in &mut transport {
        field.remove_aux("latitude");
        field.remove_aux("longitude");
        repair_time_axis(field).stage(Stage::RepairAxes)?;
    }

    let amoc = aggregate_one(&transport, IdentityMatch::Relaxed)
        .and_then(|a| a.into_field(AMOC_SOURCE_NCVAR))
        .stage(Stage::Ingest)?
        .ok_or_else(|| MonitorError::missing(AMOC_SOURCE_NCVAR))
        .stage(Stage::Ingest)?;
    extract_amoc_45n(&amoc, table, job).stage(Stage::Reduce)
}

/// All ocean indices of the run
///
/// # Errors
///
/// Any missing ocean stream is fatal.
pub fn ocean_indices(ctx: &RunContext, table: &LatitudeLineTable) -> Result<FieldList> {
    let mut indices = FieldList::new();

    {
        let grid = ctx.patterns.ocean_t_grid.as_str();
        let _span = info_span!("ocean", grid).entered();
        info!("Reading ocean data");
        let t_grid = grid_fragments(ctx, grid).stage(Stage::Ingest)?;
        let fields = t_grid.fields().stage(Stage::Ingest)?;
        indices.extend(volume_means(fields, &ctx.settings.ocean_variables, &ctx.job)?);
    }

    {
        let grid = ctx.patterns.ocean_diaptr.as_str();
        let _span = info_span!("ocean", grid).entered();
        info!("Processing diaptr");
        let diaptr = grid_fragments(ctx, grid).stage(Stage::Ingest)?;
        let fields = diaptr.fields().stage(Stage::Ingest)?;
        indices.push(amoc_index(fields, table, &ctx.job)?);
    }

    Ok(indices)
}
