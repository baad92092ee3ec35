//! Centralized error handling for the monitoring pipeline
//!
//! The fatal conditions of a run are distinct variants so the top-level
//! boundary can classify them (see [`ErrorKind`]) and pick an exit status.
//! "Variable not present" is not an error here: ingestion reports it as
//! [`crate::ingest::Aggregation::Absent`] and the caller decides.

use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    RepairAxes,
    DeriveWeights,
    Reduce,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::RepairAxes => "repair-axes",
            Stage::DeriveWeights => "derive-weights",
            Stage::Reduce => "reduce",
            Stage::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// Main error type for monitoring runs
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A requested stream or variable yielded no fragments
    #[error("Missing data: {what}")]
    MissingData { what: String },

    /// Fragments of one variable did not merge into a single series
    #[error("Ambiguous aggregation of '{variable}': {groups} non-mergeable groups remain")]
    AmbiguousAggregation { variable: String, groups: usize },

    /// A coordinate axis could not be identified or synthesized
    #[error("Axis resolution failed for '{field}': {message}")]
    AxisResolution { field: String, message: String },

    /// No area/volume measure could be found or derived
    #[error("Weight resolution failed for '{field}': {message}")]
    WeightResolution { field: String, message: String },

    /// Grid size has no entry in the latitude-line table
    #[error("Unrecognised model resolution: meridional size {ysize} has no 45N line")]
    UnknownResolution { ysize: usize },

    /// A variable selector could not be built
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A file-name pattern is not a valid glob
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Required run context is absent
    #[error("Missing run context: {0}")]
    MissingContext(String),

    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// CF time units could not be interpreted
    #[error("Time units error: {0}")]
    Time(String),

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Reduction could not be applied to the array
    #[error("Reduction error: {0}")]
    Reduction(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Operator notification could not be delivered
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Failure annotated with the stage it surfaced in
    #[error("{stage} stage failed")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<MonitorError>,
    },
}

/// Coarse classification used for exit statuses and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingData,
    AmbiguousAggregation,
    AxisResolution,
    WeightResolution,
    UnknownResolution,
    Configuration,
    Other,
}

impl MonitorError {
    pub fn axis(field: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::AxisResolution {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn weight(field: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::WeightResolution {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        MonitorError::MissingData { what: what.into() }
    }

    /// Wraps the error with the stage it occurred in. Already staged
    /// errors keep their innermost stage.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            staged @ MonitorError::Stage { .. } => staged,
            other => MonitorError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the failure was attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MonitorError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MonitorError::Stage { source, .. } => source.kind(),
            MonitorError::MissingData { .. } => ErrorKind::MissingData,
            MonitorError::AmbiguousAggregation { .. } => ErrorKind::AmbiguousAggregation,
            MonitorError::AxisResolution { .. } => ErrorKind::AxisResolution,
            MonitorError::WeightResolution { .. } => ErrorKind::WeightResolution,
            MonitorError::UnknownResolution { .. } => ErrorKind::UnknownResolution,
            MonitorError::MissingContext(_)
            | MonitorError::Config(_)
            | MonitorError::InvalidSelector(_)
            | MonitorError::Pattern(_) => ErrorKind::Configuration,
            _ => ErrorKind::Other,
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::MissingData => 99,
            ErrorKind::AmbiguousAggregation => 98,
            ErrorKind::AxisResolution => 97,
            ErrorKind::WeightResolution => 96,
            ErrorKind::UnknownResolution => 95,
            ErrorKind::Configuration => 2,
            ErrorKind::Other => 1,
        }
    }
}

impl From<figment::Error> for MonitorError {
    fn from(error: figment::Error) -> Self {
        MonitorError::Config(Box::new(error))
    }
}

/// Result type alias for monitoring operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension for attaching a stage to fallible calls
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<MonitorError>> StageContext<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.into().at(stage))
    }
}
