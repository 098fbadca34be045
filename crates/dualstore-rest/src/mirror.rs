//! Mirror writes.
//!
//! A mirror write runs only after the authoritative write succeeded. Its
//! result is folded into a [`MirrorOutcome`] and handed to a [`MirrorSink`];
//! whether the caller ever sees a failure depends on the route's
//! [`MirrorPolicy`].

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dualstore_storage::{Operation, RequestContext, StorageError};
use tracing::{debug, error};

use crate::mode::{Backend, DualWriterMode, MirrorPolicy};

/// Why a mirror write was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The request was a dry run; nothing was persisted upstream.
    DryRun,
    /// The request deadline passed after the authoritative write.
    DeadlineExceeded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DryRun => write!(f, "dry_run"),
            SkipReason::DeadlineExceeded => write!(f, "deadline_exceeded"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MirrorOutcome {
    Mirrored,
    Skipped(SkipReason),
    Failed(StorageError),
}

impl MirrorOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MirrorOutcome::Failed(_))
    }
}

/// Runs a mirror write unless the request is a dry run or out of time.
///
/// `write` is not polled when the write is skipped.
pub async fn try_mirror<T, F>(ctx: &RequestContext, dry_run: bool, write: F) -> MirrorOutcome
where
    F: Future<Output = Result<T, StorageError>>,
{
    if dry_run {
        return MirrorOutcome::Skipped(SkipReason::DryRun);
    }
    if ctx.is_expired() {
        return MirrorOutcome::Skipped(SkipReason::DeadlineExceeded);
    }
    match write.await {
        Ok(_) => MirrorOutcome::Mirrored,
        Err(err) => MirrorOutcome::Failed(err),
    }
}

/// Everything known about one mirror write.
#[derive(Debug, Clone)]
pub struct MirrorReport {
    pub mode: DualWriterMode,
    pub operation: Operation,
    pub backend: Backend,
    pub policy: MirrorPolicy,
    pub resource: String,
    pub name: String,
    pub request_id: String,
    pub outcome: MirrorOutcome,
}

/// Receives the outcome of every mirror write.
pub trait MirrorSink: Send + Sync {
    fn record(&self, report: &MirrorReport);
}

/// Hands a report to the sink and decides what the caller sees.
///
/// Only a failed `Required` mirror produces an error.
pub(crate) fn settle(sink: &dyn MirrorSink, report: MirrorReport) -> Result<(), StorageError> {
    sink.record(&report);
    match (report.outcome, report.policy) {
        (MirrorOutcome::Failed(err), MirrorPolicy::Required) => Err(err),
        _ => Ok(()),
    }
}

/// Counters kept by [`TracingMirrorSink`].
#[derive(Debug, Default)]
pub struct MirrorStats {
    mirrored: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorStatsSnapshot {
    pub mirrored: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl MirrorStats {
    pub fn snapshot(&self) -> MirrorStatsSnapshot {
        MirrorStatsSnapshot {
            mirrored: self.mirrored.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Default sink: logs through `tracing` and counts outcomes.
#[derive(Debug, Default)]
pub struct TracingMirrorSink {
    stats: MirrorStats,
}

impl TracingMirrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MirrorStatsSnapshot {
        self.stats.snapshot()
    }
}

impl MirrorSink for TracingMirrorSink {
    fn record(&self, report: &MirrorReport) {
        match &report.outcome {
            MirrorOutcome::Mirrored => {
                self.stats.mirrored.fetch_add(1, Ordering::Relaxed);
                debug!(
                    mode = %report.mode,
                    operation = %report.operation,
                    backend = %report.backend,
                    resource = %report.resource,
                    name = %report.name,
                    request_id = %report.request_id,
                    "object mirrored"
                );
            }
            MirrorOutcome::Skipped(reason) => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    mode = %report.mode,
                    operation = %report.operation,
                    backend = %report.backend,
                    resource = %report.resource,
                    name = %report.name,
                    request_id = %report.request_id,
                    reason = %reason,
                    "mirror write skipped"
                );
            }
            MirrorOutcome::Failed(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    mode = %report.mode,
                    operation = %report.operation,
                    backend = %report.backend,
                    policy = %report.policy,
                    resource = %report.resource,
                    name = %report.name,
                    request_id = %report.request_id,
                    category = %err.category(),
                    error = %err,
                    "unable to write object to mirror storage"
                );
            }
        }
    }
}
