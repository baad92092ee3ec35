//! Operator notification of failed runs
//!
//! Delivery is best effort: a failed notification is logged and never
//! replaces the error being reported.

use crate::config::{NotifySettings, RunContext};
use crate::errors::{MonitorError, Result};
use serde_json::json;
use std::error::Error as _;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{error, info};

/// A channel failure reports can be sent to
pub trait Notifier {
    /// # Errors
    ///
    /// Returns a notification error if the report was not delivered.
    fn notify(&self, report: &str) -> Result<()>;
}

/// Pipes `{"text": <report>}` to an external command's stdin
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_settings(settings: &NotifySettings) -> Self {
        Self::new(settings.command.clone(), settings.args.clone())
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, report: &str) -> Result<()> {
        let payload = json!({ "text": report }).to_string();
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                MonitorError::Notification(format!("cannot run '{}': {e}", self.command))
            })?;

        // stdin is dropped before waiting so the command sees end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(payload.as_bytes()),
            None => Ok(()),
        };
        if let Err(e) = written {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MonitorError::Notification(format!(
                "cannot write to '{}': {e}",
                self.command
            )));
        }
        let status = child
            .wait()
            .map_err(|e| MonitorError::Notification(e.to_string()))?;
        if !status.success() {
            return Err(MonitorError::Notification(format!(
                "'{}' exited with {status}",
                self.command
            )));
        }
        Ok(())
    }
}

/// Only logs the report
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, report: &str) -> Result<()> {
        info!("No notification channel configured; report:\n{report}");
        Ok(())
    }
}

/// The configured notifier, or [`LogNotifier`] when none is set
pub fn notifier_for(settings: Option<&NotifySettings>) -> Box<dyn Notifier> {
    match settings {
        Some(settings) => Box::new(CommandNotifier::from_settings(settings)),
        None => Box::new(LogNotifier),
    }
}

/// Failure report with run context, stage and the full error chain
pub fn error_report(err: &MonitorError, context: Option<&RunContext>) -> String {
    let mut report = String::new();
    match context {
        Some(ctx) => {
            report.push_str(&format!("Error report for {} {}\n", ctx.job, ctx.cycle));
            report.push_str(&format!("Input directory: {}\n", ctx.input_dir.display()));
        }
        None => report.push_str("Error report (run context unavailable)\n"),
    }
    if let Some(stage) = err.stage() {
        report.push_str(&format!("Stage: {stage}\n"));
    }
    report.push_str(&format!("Error: {err}\n"));
    let mut source = err.source();
    while let Some(cause) = source {
        report.push_str(&format!("  caused by: {cause}\n"));
        source = cause.source();
    }
    report
}

/// Sends `report`, logging rather than returning any delivery failure
pub fn notify_best_effort(notifier: &dyn Notifier, report: &str) {
    if let Err(e) = notifier.notify(report) {
        error!("Failed to deliver notification: {e}");
    }
}
