//! Human and JSON rendering of sync reports.

use colored::Colorize;

use crate::error::Result;
use crate::sync::{BatchSummary, FileStatus, ProjectReport, SyncState};

/// Print one project's report.
///
/// # Errors
///
/// Returns an error if the report cannot be serialized.
pub fn print_project(report: &ProjectReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    let direction = report
        .direction
        .map_or_else(String::new, |d| format!(" ({d})"));
    println!("{}{}", report.project.bold(), direction.dimmed());

    if report.dry_run {
        print_dry_run(report);
        return Ok(());
    }

    for file in &report.files {
        match &file.status {
            FileStatus::Written { replacements } => {
                println!("  {} {} ({replacements} rewrites)", "↓".green(), file.name);
            }
            FileStatus::Copied => println!("  {} {}", "↓".green(), file.name),
            FileStatus::Unchanged => {}
            FileStatus::Failed { message } => {
                println!("  {} {}: {message}", "✗".red(), file.name);
            }
        }
    }
    println!("  {}", line(report));
    Ok(())
}

/// Print a `sync-all` summary.
///
/// # Errors
///
/// Returns an error if the summary cannot be serialized.
pub fn print_batch(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "total": summary.total(),
            "succeeded": summary.succeeded_count(),
            "failed": summary.failed_count(),
            "cancelled": summary.cancelled,
            "skipped": summary.skipped,
            "projects": summary.reports,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if summary.reports.is_empty() && summary.skipped.is_empty() {
        println!("No projects to sync.");
        return Ok(());
    }

    for report in &summary.reports {
        let mark = if report.is_failure() {
            "✗".red()
        } else {
            "✓".green()
        };
        println!("{mark} {:<20} {}", report.project, line(report));
    }
    for name in &summary.skipped {
        println!("{} {name:<20} {}", "-".dimmed(), "skipped (cancelled)".dimmed());
    }

    println!();
    let failed = summary.failed_count();
    let tally = format!(
        "{} of {} projects synced",
        summary.succeeded_count(),
        summary.total()
    );
    if failed == 0 {
        println!("{}", tally.green());
    } else {
        println!("{}, {}", tally, format!("{failed} failed").red());
    }
    Ok(())
}

fn print_dry_run(report: &ProjectReport) {
    println!("  {}", "Dry run: nothing will be written".yellow());
    if !report.pipeline.is_empty() {
        println!("  Rewrites, in order:");
        for op in &report.pipeline {
            println!("    {} → {}", op.find, op.replace);
        }
    }
    if report.candidates.is_empty() {
        println!("  No files to sync.");
    } else {
        println!("  {} file(s) would be synced:", report.candidates.len());
        for name in &report.candidates {
            println!("    {name}");
        }
    }
}

/// One-line outcome, e.g. `3 written, 10 unchanged (1200 ms)`.
fn line(report: &ProjectReport) -> String {
    match report.final_state() {
        SyncState::Failed => report
            .failure
            .as_ref()
            .map_or_else(|| "failed".to_string(), |f| f.message.clone())
            .red()
            .to_string(),
        SyncState::ApprovalPending => "awaiting approval".yellow().to_string(),
        _ if report.dry_run => format!("{} file(s) would be synced", report.candidates.len()),
        _ => {
            let mut parts = vec![
                format!("{} written", report.files_written()),
                format!("{} unchanged", report.files_unchanged()),
            ];
            if report.files_failed() > 0 {
                parts.push(format!("{} failed", report.files_failed()).red().to_string());
            }
            format!("{} ({} ms)", parts.join(", "), report.duration_ms)
        }
    }
}
