//! Run context and tool settings
//!
//! The run context (job, cycle, input directory, stream patterns) comes
//! from the workflow environment and is fixed for the whole run. Tool
//! settings layer library defaults, an optional `monitor.toml` and
//! `MONITOR_`-prefixed environment variables.

use crate::errors::{MonitorError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file read when no `--config` is given
pub const DEFAULT_SETTINGS_FILE: &str = "monitor.toml";

/// UM STASH codes area-averaged from the monthly atmosphere stream
pub const DEFAULT_STASH_CODES: [u32; 39] = [
    1201, 1207, 1208, 1209, 1210, 1211, 1235, 2201, 2204, 2205, 2206, 2207, 2208, 3217, 3223,
    3225, 3226, 3232, 3234, 3236, 3237, 3245, 3317, 4204, 5205, 5206, 5215, 5216, 23, 24, 409,
    8023, 8208, 8209, 8223, 8225, 8234, 4203, 16222,
];

/// External command that receives failure reports on stdin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySettings {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Directory the index file is written to
    pub output_dir: PathBuf,
    pub atm_stash_codes: Vec<u32>,
    /// Ocean T-grid variables given a volume mean
    pub ocean_variables: Vec<String>,
    /// Worker threads for reductions; all cores when unset
    pub threads: Option<usize>,
    pub notify: Option<NotifySettings>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("monitor_index"),
            atm_stash_codes: DEFAULT_STASH_CODES.to_vec(),
            ocean_variables: vec![
                "sea_water_potential_temperature".to_string(),
                "sea_water_salinity".to_string(),
            ],
            threads: None,
            notify: None,
        }
    }
}

impl MonitorSettings {
    /// Loads settings: defaults, then the settings file, then `MONITOR_*`
    /// environment variables.
    ///
    /// A missing settings file is not an error.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a provider holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
        if !path.exists() {
            debug!("Settings file {} not found, using defaults", path.display());
        }
        let settings = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MONITOR_").split("__"))
            .extract()?;
        Ok(settings)
    }
}

/// Environment values may parse as numbers (`CYLC_VERSION=7.8`,
/// `CYLC_TASK_CYCLE_POINT=198801`); keep their text either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EnvValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Text(s) => f.write_str(s),
            EnvValue::Integer(n) => write!(f, "{n}"),
            EnvValue::Float(x) => write!(f, "{x}"),
            EnvValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

const RUN_ENVIRONMENT: [&str; 10] = [
    "cylc_version",
    "cylc_suite_name",
    "cylc_workflow_name",
    "transfer_dir",
    "cylc_task_cycle_point",
    "atm_patterns",
    "ice_patterns",
    "ocn_patterns",
    "ocn_t_grid",
    "ocn_diaptr",
];

#[derive(Debug, Default, Deserialize)]
struct RunEnvironment {
    cylc_version: Option<EnvValue>,
    cylc_suite_name: Option<EnvValue>,
    cylc_workflow_name: Option<EnvValue>,
    transfer_dir: Option<EnvValue>,
    cylc_task_cycle_point: Option<EnvValue>,
    atm_patterns: Option<EnvValue>,
    ice_patterns: Option<EnvValue>,
    ocn_patterns: Option<EnvValue>,
    ocn_t_grid: Option<EnvValue>,
    ocn_diaptr: Option<EnvValue>,
}

fn required(value: Option<EnvValue>, name: &str) -> Result<String> {
    value
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| MonitorError::MissingContext(format!("{name} is not set")))
}

/// File-name fragment patterns per stream (comma-separated lists)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPatterns {
    pub atmosphere: String,
    pub sea_ice: String,
    pub ocean: String,
    /// Ocean T-grid tag, e.g. `grid_T`
    pub ocean_t_grid: String,
    /// Ocean meridional-transport tag, e.g. `diaptr`
    pub ocean_diaptr: String,
}

/// Everything a run needs to know about where it is running
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub workflow: String,
    /// Run id: the last `-` separated token of the workflow name
    pub job: String,
    /// Model cycle point
    pub cycle: String,
    pub input_dir: PathBuf,
    pub patterns: StreamPatterns,
    pub settings: MonitorSettings,
}

/// Job id of a workflow name (`u-cn134` -> `cn134`)
pub fn job_from_workflow(workflow: &str) -> &str {
    workflow.rsplit('-').next().unwrap_or(workflow)
}

impl RunContext {
    /// Builds a context for an explicit input directory
    pub fn new(
        workflow: impl Into<String>,
        cycle: impl Into<String>,
        input_dir: impl Into<PathBuf>,
        patterns: StreamPatterns,
        settings: MonitorSettings,
    ) -> Self {
        let workflow = workflow.into();
        Self {
            job: job_from_workflow(&workflow).to_string(),
            workflow,
            cycle: cycle.into(),
            input_dir: input_dir.into(),
            patterns,
            settings,
        }
    }

    /// Reads the run context from the workflow environment.
    ///
    /// Cylc 8 and later name the workflow in `CYLC_WORKFLOW_NAME`, older
    /// versions in `CYLC_SUITE_NAME`. The input directory is
    /// `TRANSFER_DIR/<workflow>/<cycle>`.
    ///
    /// # Errors
    ///
    /// Returns `MissingContext` if any required variable is absent.
    pub fn from_env(settings: MonitorSettings) -> Result<Self> {
        let env: RunEnvironment = Figment::from(Env::raw().only(&RUN_ENVIRONMENT)).extract()?;

        let version = required(env.cylc_version, "CYLC_VERSION")?;
        let major: u32 = version
            .split('.')
            .next()
            .and_then(|m| m.trim().parse().ok())
            .ok_or_else(|| {
                MonitorError::MissingContext(format!("CYLC_VERSION '{version}' is not a version"))
            })?;
        let workflow = if major < 8 {
            required(env.cylc_suite_name, "CYLC_SUITE_NAME")?
        } else {
            required(env.cylc_workflow_name, "CYLC_WORKFLOW_NAME")?
        };

        let transfer_dir = required(env.transfer_dir, "TRANSFER_DIR")?;
        let cycle = required(env.cylc_task_cycle_point, "CYLC_TASK_CYCLE_POINT")?;
        let patterns = StreamPatterns {
            atmosphere: required(env.atm_patterns, "ATM_PATTERNS")?,
            sea_ice: required(env.ice_patterns, "ICE_PATTERNS")?,
            ocean: required(env.ocn_patterns, "OCN_PATTERNS")?,
            ocean_t_grid: required(env.ocn_t_grid, "OCN_T_GRID")?,
            ocean_diaptr: required(env.ocn_diaptr, "OCN_DIAPTR")?,
        };

        let input_dir = Path::new(&transfer_dir).join(&workflow).join(&cycle);
        Ok(Self::new(workflow, cycle, input_dir, patterns, settings))
    }
}
