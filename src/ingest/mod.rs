//! Fragment ingestion: discovery, selection, aggregation and resampling
//!
//! - [`discovery`]: finds fragment files for a stream in the input directory
//! - [`select`]: variable selectors and lazily read fragment sets
//! - [`aggregate`]: merges same-variable fragments into one time series
//! - [`resample`]: monthly means from finer-resolution series
//!
//! Ingestion reports presence, absence and ambiguity; whether a missing
//! variable is fatal is decided by the caller.

pub mod aggregate;
pub mod discovery;
pub mod resample;
pub mod select;

pub use aggregate::{aggregate, aggregate_one, Aggregation, IdentityMatch};
pub use discovery::{find_fragments, find_stream_fragments};
pub use resample::{monthly_mean, FALLBACK_STREAMS};
pub use select::{select, select_by_properties, stash_short_code, FragmentSet, VariableSelector};
