//! Per-run orchestration
//!
//! One run processes one model cycle: ocean, then sea ice, then
//! atmosphere. Every stage is fail-fast; a missing single diagnostic is
//! logged and its index omitted. Nothing is written unless all streams
//! succeed.

pub mod atm;
pub mod ice;
pub mod ocean;

use crate::assemble::IndexCollection;
use crate::config::RunContext;
use crate::errors::{Result, Stage, StageContext};
use crate::netcdf_io::write_index;
use crate::section::LatitudeLineTable;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Computes every index of the run
///
/// # Errors
///
/// Returns the first fatal failure, annotated with its stage.
pub fn run(ctx: &RunContext) -> Result<IndexCollection> {
    info!("Opening job {} date: {}", ctx.job, ctx.cycle);
    let table = LatitudeLineTable;
    let mut collection = IndexCollection::new(&ctx.job, &ctx.cycle);

    collection.extend(ocean::ocean_indices(ctx, &table)?);
    collection.extend(ice::sea_ice_indices(ctx)?);
    collection.extend(atm::atmosphere_indices(ctx)?);

    info!("Computed {} indices", collection.len());
    Ok(collection)
}

/// Writes the collection to `<output_dir>/index_<job>_<cycle>.nc`
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write(collection: IndexCollection, ctx: &RunContext) -> Result<PathBuf> {
    let dir = &ctx.settings.output_dir;
    if !dir.exists() {
        fs::create_dir_all(dir).stage(Stage::Assemble)?;
        info!("Created output directory: {}", dir.display());
    }
    let path = collection.output_path(dir);
    let fields = collection.finish();
    info!("Writing {}", path.display());
    write_index(&fields, &path).stage(Stage::Assemble)?;
    Ok(path)
}
