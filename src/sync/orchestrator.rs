//! Drives one sync per project through its state machine.
//!
//! ```text
//! Resolving -> DirectionCheck -> (ApprovalPending | Transforming) -> Transferring -> Done
//! ```
//!
//! Any step may end in `Failed`. The report records every state visited.
//! Projects are processed strictly one after another; the config is a
//! shared read-only snapshot.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use crate::config::SyncConfig;
use crate::error::Error;
use crate::model::{ProjectMapping, SyncDirection};
use crate::registry::{Approval, DirectionDecision, SyncCommand};
use crate::rewrite::{resolve_pipeline, rewrite_stream};

use super::transport::{TransferJob, Transport};
use super::types::{BatchSummary, CancelFlag, ProjectReport, SyncState};

/// Per-invocation knobs.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute and report, but move nothing.
    pub dry_run: bool,
    pub timeout: Duration,
    pub cancel: CancelFlag,
}

impl SyncOptions {
    /// Defaults taken from the config's transfer settings.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            dry_run: false,
            timeout: config.transfer.timeout,
            cancel: CancelFlag::new(),
        }
    }
}

pub struct Orchestrator<'a, T: Transport> {
    config: &'a SyncConfig,
    transport: &'a T,
    options: SyncOptions,
}

impl<'a, T: Transport> Orchestrator<'a, T> {
    pub fn new(config: &'a SyncConfig, transport: &'a T, options: SyncOptions) -> Self {
        Self {
            config,
            transport,
            options,
        }
    }

    /// Run `command` for the project called `name`.
    ///
    /// Never returns an error: the outcome, including failures and a pause
    /// for approval, is in the report.
    pub fn run(&self, name: &str, command: SyncCommand, approval: Approval) -> ProjectReport {
        let start = Instant::now();
        let mut report = ProjectReport::new(name, command, self.options.dry_run);

        tracing::debug!(project = %name, %command, ?approval, dry_run = self.options.dry_run, "sync requested");
        self.drive(&mut report, name, command, approval);
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match report.final_state() {
            SyncState::Done => tracing::info!(
                project = %name,
                written = report.files_written(),
                unchanged = report.files_unchanged(),
                failed = report.files_failed(),
                duration_ms = report.duration_ms,
                "sync finished"
            ),
            SyncState::ApprovalPending => {
                tracing::debug!(project = %name, "push awaiting approval");
            }
            _ => {
                if let Some(failure) = &report.failure {
                    tracing::warn!(project = %name, error = %failure.message, "sync failed");
                }
            }
        }

        report
    }

    /// Pull every batch candidate, continuing past failures.
    ///
    /// The cancel flag is honored between projects; once set, the
    /// remaining projects are listed as skipped.
    pub fn sync_all(&self) -> BatchSummary {
        let candidates = self.config.registry.batch_candidates();
        let mut summary = BatchSummary::default();

        for (i, mapping) in candidates.iter().enumerate() {
            if self.options.cancel.is_cancelled() {
                summary.cancelled = true;
                summary.skipped = candidates[i..].iter().map(|m| m.name.clone()).collect();
                tracing::warn!(skipped = summary.skipped.len(), "sync-all cancelled");
                break;
            }
            summary
                .reports
                .push(self.run(&mapping.name, SyncCommand::Pull, Approval::None));
        }

        tracing::info!(
            total = summary.total(),
            failed = summary.failed_count(),
            "sync-all finished"
        );
        summary
    }

    fn drive(&self, report: &mut ProjectReport, name: &str, command: SyncCommand, approval: Approval) {
        let registry = &self.config.registry;

        let mapping = match registry.resolve(name) {
            Ok(mapping) => mapping,
            Err(e) => return report.fail(e),
        };

        report.enter(SyncState::DirectionCheck);
        let direction = match registry.resolve_direction_for(mapping, command, approval) {
            Ok(DirectionDecision::Proceed(direction)) => direction,
            Ok(DirectionDecision::RequiresApproval(direction)) => {
                report.direction = Some(direction);
                report.enter(SyncState::ApprovalPending);
                return;
            }
            Err(e) => return report.fail(e),
        };
        report.direction = Some(direction);

        report.enter(SyncState::Transforming);
        let pipeline = match resolve_pipeline(&self.config.rules, direction) {
            Ok(pipeline) => pipeline,
            Err(e) => return report.fail(Error::Config(e)),
        };
        report.pipeline = pipeline.ops().to_vec();

        let job = self.job_for(mapping, direction);

        if self.options.dry_run {
            match self.transport.list_candidates(&job) {
                Ok(candidates) => report.candidates = candidates,
                Err(e) => return report.fail(Error::Transfer(e)),
            }
            report.enter(SyncState::Done);
            return;
        }

        report.enter(SyncState::Transferring);
        let (from, to) = job.endpoints();
        tracing::debug!(project = %name, %direction, %from, %to, ops = pipeline.len(), "transferring");

        let hook = |reader: &mut dyn BufRead, writer: &mut dyn Write| {
            rewrite_stream(reader, writer, &pipeline)
        };
        match self.transport.transfer(&job, &hook) {
            Ok(files) => {
                report.files = files;
                report.enter(SyncState::Done);
            }
            Err(e) => report.fail(Error::Transfer(e)),
        }
    }

    fn job_for(&self, mapping: &ProjectMapping, direction: SyncDirection) -> TransferJob {
        TransferJob {
            project: mapping.name.clone(),
            direction,
            remote_dir: self.config.remote_project_dir(mapping),
            local_dir: self.config.local_project_dir(mapping),
            timeout: self.options.timeout,
        }
    }
}
