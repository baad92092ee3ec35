//! Entry point for the monitor-index application.
//! Reads the run context, computes the indices and writes the index file;
//! any failure is reported to the operator channel and sets the exit status.

use clap::Parser;
use monitor_index::config::{MonitorSettings, RunContext};
use monitor_index::errors::{MonitorError, Result};
use monitor_index::notify::{error_report, notifier_for, notify_best_effort};
use monitor_index::parallel::ParallelConfig;
use monitor_index::pipeline;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,monitor_index=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Settings with command-line overrides applied
fn load_settings(args: &Args) -> Result<MonitorSettings> {
    let mut settings = MonitorSettings::load(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
    if args.threads.is_some() {
        settings.threads = args.threads;
    }
    Ok(settings)
}

fn run(args: &Args, context: &RunContext) -> Result<()> {
    ParallelConfig::new(context.settings.threads).setup_global_pool()?;
    let collection = pipeline::run(context)?;
    if args.dry_run {
        for field in collection.fields() {
            info!("{} {:?}", field.identity(), field.shape());
        }
        info!("Dry run: not writing {} indices", collection.len());
        return Ok(());
    }
    let path = pipeline::write(collection, context)?;
    info!("Done: {}", path.display());
    Ok(())
}

/// Logs and reports a fatal error, returning the exit status
fn fail(
    err: &MonitorError,
    context: Option<&RunContext>,
    settings: Option<&MonitorSettings>,
) -> ExitCode {
    let report = error_report(err, context);
    error!("{report}");
    let notifier = notifier_for(settings.and_then(|s| s.notify.as_ref()));
    notify_best_effort(notifier.as_ref(), &report);
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => return fail(&e, None, None),
    };
    let context = match RunContext::from_env(settings.clone()) {
        Ok(context) => context,
        Err(e) => return fail(&e, None, Some(&settings)),
    };

    match run(&args, &context) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, Some(&context), Some(&context.settings)),
    }
}
