//! Parallel processing configuration
//!
//! The reduction kernels run on Rayon's global thread pool; this module
//! sizes it once at startup.

use crate::errors::{MonitorError, Result};
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was already initialized or cannot be
    /// built.
    pub fn setup_global_pool(&self) -> Result<()> {
        let cores = num_cpus::get();
        if let Some(num_threads) = self.num_threads {
            if num_threads > cores {
                warn!("Requested {num_threads} threads but only {cores} cores are available");
            }
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    MonitorError::ThreadPool(format!(
                        "Failed to initialize thread pool with {num_threads} threads: {e}"
                    ))
                })?;
            info!("Configured parallel processing with {num_threads} threads ({cores} cores)");
        } else {
            info!(
                "Using default thread pool ({} threads, {cores} cores)",
                rayon::current_num_threads()
            );
        }
        Ok(())
    }
}
