//! monitor_index: run-monitoring indices from fragmented climate-model output
//!
//! Computes the scalar "health" indices of a climate-model run for one
//! model cycle: volume-weighted global means of ocean temperature and
//! salinity, the Atlantic overturning at 45°N, global and hemispheric
//! sea-ice area, and area-weighted means of monitored atmosphere fields.
//!
//! ## Pipeline
//!
//! Each stream passes through the same stages, each fail-fast:
//!
//! `ingest → repair axes → derive weights → reduce / extract → assemble`
//!
//! ## Module Organization
//!
//! - [`field`]: labeled fields with coordinates, measures and properties
//! - [`netcdf_io`]: netCDF fragment reader and index writer
//! - [`time`]: CF time units and model calendars
//! - [`ingest`]: fragment discovery, selection, aggregation and resampling
//! - [`axes`]: axis repair for fields lacking standard axis tags
//! - [`weights`]: area and volume measures
//! - [`reduce`]: weighted means, integrals and derived indices
//! - [`section`]: AMOC at 45°N
//! - [`assemble`]: the output index collection
//! - [`pipeline`]: per-stream orchestration
//! - [`config`]: run context and settings
//! - [`notify`]: operator notification of failures
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use monitor_index::prelude::*;
//!
//! let settings = MonitorSettings::load(None).unwrap();
//! let context = RunContext::from_env(settings).unwrap();
//! let collection = monitor_index::pipeline::run(&context).unwrap();
//! monitor_index::pipeline::write(collection, &context).unwrap();
//! ```

pub mod assemble;
pub mod axes;
pub mod config;
pub mod errors;
pub mod field;
pub mod ingest;
pub mod netcdf_io;
pub mod notify;
pub mod parallel;
pub mod pipeline;
pub mod reduce;
pub mod section;
pub mod time;
pub mod weights;

pub use errors::{MonitorError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::assemble::IndexCollection;
    pub use crate::config::{MonitorSettings, RunContext, StreamPatterns};
    pub use crate::errors::{ErrorKind, MonitorError, Result, Stage};
    pub use crate::field::{
        AuxiliaryCoordinate, AxisKind, CellMeasure, DimensionCoordinate, DomainAxis, Field,
        FieldList, MeasureKind,
    };
    pub use crate::ingest::{Aggregation, IdentityMatch, VariableSelector};
    pub use crate::parallel::ParallelConfig;
    pub use crate::section::LatitudeLineTable;
}
