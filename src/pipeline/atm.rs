//! Atmosphere indices: area means of monitored STASH codes and the
//! indices derived from them

use crate::config::RunContext;
use crate::errors::{MonitorError, Result, Stage, StageContext};
use crate::field::{Field, FieldList};
use crate::ingest::{
    aggregate_one, find_fragments, find_stream_fragments, monthly_mean, select,
    select_by_properties, stash_short_code, FragmentSet, IdentityMatch, VariableSelector,
    FALLBACK_STREAMS,
};
use crate::reduce::{area_mean, soil_moisture_total, toa_net_flux};
use std::path::Path;
use tracing::{info, info_span, warn};

/// Property filters identifying full monthly means, in order of preference
const MONTHLY_MEAN_FILTERS: [&[(&str, &str)]; 2] = [
    &[("online_operation", "average"), ("interval_write", "1 month")],
    &[("lbtim", "122"), ("lbproc", "128")],
];

/// Monthly-mean fields of the monthly stream
///
/// # Errors
///
/// Returns `MissingData` when no field passes either filter.
pub fn monthly_means(fields: &[Field]) -> Result<FieldList> {
    for filter in MONTHLY_MEAN_FILTERS {
        let selected = select_by_properties(fields, filter);
        if !selected.is_empty() {
            return Ok(selected);
        }
    }
    Err(MonitorError::missing("monthly-mean atmosphere fields"))
}

/// `long_name` made usable as an identity
pub fn sanitize_long_name(long_name: &str) -> String {
    long_name.replace([' ', '/', ':'], "_")
}

/// Finer-resolution streams consulted when a code has no monthly mean
pub struct FallbackStreams {
    sets: Vec<FragmentSet>,
}

impl FallbackStreams {
    /// Locates the fallback streams; their files are read on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory cannot be listed.
    pub fn discover(dir: &Path) -> Result<Self> {
        let sets = FALLBACK_STREAMS
            .iter()
            .map(|stream| Ok(FragmentSet::new(*stream, find_stream_fragments(dir, stream)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sets })
    }

    pub fn from_sets(sets: Vec<FragmentSet>) -> Self {
        Self { sets }
    }

    /// Monthly mean of `selector` from the first stream that has it
    ///
    /// # Errors
    ///
    /// Fails if a stream cannot be read or its fragments do not merge.
    pub fn monthly(&self, selector: &VariableSelector, name: &str) -> Result<Option<Field>> {
        for set in &self.sets {
            if set.is_empty() {
                continue;
            }
            let found = select(set.fields()?, selector);
            if found.is_empty() {
                continue;
            }
            info!("{name} found in {} data, converting to monthly means", set.label());
            if let Some(field) = aggregate_one(&found, IdentityMatch::Relaxed)?.into_field(name)? {
                return Ok(Some(monthly_mean(&field)?));
            }
        }
        Ok(None)
    }
}

/// Area mean of one STASH code, `None` when the code is not output
///
/// # Errors
///
/// Fails on ambiguous aggregation or a failed reduction.
pub fn stash_area_mean(
    monthly: &[Field],
    fallback: &FallbackStreams,
    code: u32,
    job: &str,
) -> Result<Option<Field>> {
    let short_code = stash_short_code(code);
    let selector = VariableSelector::stash(code)?;

    let candidates = select(monthly, &selector);
    let field = if candidates.is_empty() {
        fallback.monthly(&selector, &short_code).stage(Stage::Ingest)?
    } else {
        aggregate_one(&candidates, IdentityMatch::Relaxed)
            .and_then(|a| a.into_field(&short_code))
            .stage(Stage::Ingest)?
    };
    let Some(mut field) = field else {
        warn!("No entry for {short_code}");
        return Ok(None);
    };

    if field.standard_name().is_none() {
        if let Some(long_name) = field.long_name().map(sanitize_long_name) {
            field.set_standard_name(long_name);
        }
    }
    info!("{short_code}: {}", field.identity());
    area_mean(&field, job).stage(Stage::Reduce).map(Some)
}

/// Area means plus the derived soil moisture and TOA indices
///
/// # Errors
///
/// Absence of monthly atmosphere data is fatal; single missing codes are
/// skipped.
pub fn atmosphere_from(
    monthly: &[Field],
    fallback: &FallbackStreams,
    codes: &[u32],
    job: &str,
) -> Result<FieldList> {
    let means = monthly_means(monthly).stage(Stage::Ingest)?;
    let mut indices = FieldList::new();
    for &code in codes {
        if let Some(mean) = stash_area_mean(&means, fallback, code, job)? {
            indices.push(mean);
        }
    }

    let soil = soil_moisture_total(&indices, job).stage(Stage::Reduce)?;
    let toa = toa_net_flux(&indices, job).stage(Stage::Reduce)?;
    indices.extend(soil);
    indices.extend(toa);
    Ok(indices)
}

/// All atmosphere indices of the run
///
/// # Errors
///
/// Absence of any monthly atmosphere data is fatal.
pub fn atmosphere_indices(ctx: &RunContext) -> Result<FieldList> {
    let _span = info_span!("atmosphere", stream = "monthly").entered();
    info!("Reading monthly atmosphere files");
    let paths =
        find_fragments(&ctx.input_dir, &ctx.patterns.atmosphere, None).stage(Stage::Ingest)?;
    if paths.is_empty() {
        return Err(MonitorError::missing("atmosphere data").at(Stage::Ingest));
    }
    let monthly = FragmentSet::new("monthly", paths);
    let fallback = FallbackStreams::discover(&ctx.input_dir).stage(Stage::Ingest)?;
    atmosphere_from(
        monthly.fields().stage(Stage::Ingest)?,
        &fallback,
        &ctx.settings.atm_stash_codes,
        &ctx.job,
    )
}
