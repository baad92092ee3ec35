//! Defines command-line interface options using `clap` for the monitor-index application.

use clap::Parser;
use std::path::PathBuf;

/// Computes run-monitoring indices for one model cycle
///
/// The run itself (workflow, cycle point, input directory, stream
/// patterns) is taken from the Cylc task environment.
#[derive(Parser, Debug)]
#[command(
    version,
    name = "monitor-index",
    about = "Computes climate-model monitoring indices from fragmented netCDF output"
)]
pub struct Args {
    /// Settings file (defaults to ./monitor.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to write the index file to, overriding the settings
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Compute and log the indices without writing the index file
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
