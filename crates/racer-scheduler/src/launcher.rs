//! Plan racing tasks from the snapshot and run them to completion.

use std::sync::Arc;

use racer_clock::{Clock, ClockOffset};
use racer_core::{AppError, Catalog, FireRequest, ReserveEndpoint};
use racer_lock::CallGate;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::eligibility::{Ineligibility, check_eligibility};
use crate::racing::{RaceTarget, RacingSettings, RacingTask, TaskReport, TaskState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Slot or ticket absent from the snapshot.
    NotInSnapshot(AppError),
    Ineligible(Ineligibility),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInSnapshot(e) => write!(f, "{e}"),
            Self::Ineligible(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedTask {
    Ready(RaceTarget),
    Skipped {
        request: FireRequest,
        reason: SkipReason,
    },
}

/// Resolve each job against the snapshot, one entry per job in input order.
///
/// A pair missing from the snapshot or failing eligibility is skipped with
/// an error log; the rest of the plan is unaffected.
pub fn plan(catalog: &Catalog, jobs: &[FireRequest]) -> Vec<PlannedTask> {
    jobs.iter()
        .map(|job| {
            let resolved = catalog
                .pair(job.slot_id, &job.ticket_id)
                .map_err(SkipReason::NotInSnapshot)
                .and_then(|(slot, ticket)| {
                    check_eligibility(slot, ticket)
                        .map(|()| RaceTarget::new(slot, ticket))
                        .map_err(SkipReason::Ineligible)
                });
            match resolved {
                Ok(target) => PlannedTask::Ready(target),
                Err(reason) => {
                    error!(
                        slot = job.slot_id,
                        ticket = %job.ticket_id,
                        reason = %reason,
                        "job skipped"
                    );
                    PlannedTask::Skipped {
                        request: job.clone(),
                        reason,
                    }
                }
            }
        })
        .collect()
}

/// Spawns one racing task per target and waits for all of them.
pub struct Launcher<E: ?Sized> {
    endpoint: Arc<E>,
    gate: CallGate,
    clock: Arc<dyn Clock>,
    settings: RacingSettings,
}

impl<E> Launcher<E>
where
    E: ReserveEndpoint + ?Sized + 'static,
{
    pub fn new(
        endpoint: Arc<E>,
        gate: CallGate,
        clock: Arc<dyn Clock>,
        settings: RacingSettings,
    ) -> Self {
        Self {
            endpoint,
            gate,
            clock,
            settings,
        }
    }

    pub fn gate(&self) -> &CallGate {
        &self.gate
    }

    /// Run every target concurrently. All tasks share the call gate and read
    /// the same `offset`. Reports come back ordered by slot then ticket.
    pub async fn launch_all(
        &self,
        targets: Vec<RaceTarget>,
        offset: ClockOffset,
    ) -> Vec<TaskReport> {
        let mut set = JoinSet::new();
        for target in targets {
            let task = RacingTask::new(
                target,
                Arc::clone(&self.endpoint),
                self.gate.clone(),
                Arc::clone(&self.clock),
                offset,
                self.settings,
            );
            set.spawn(task.run());
        }
        info!(tasks = set.len(), offset = %offset, "racing tasks launched");

        let mut reports = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "racing task did not complete"),
            }
        }
        reports.sort_by(|a, b| {
            a.target
                .request
                .slot_id
                .cmp(&b.target.request.slot_id)
                .then_with(|| a.target.request.ticket_id.cmp(&b.target.request.ticket_id))
        });
        reports
    }
}

/// Counts for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub skipped: usize,
    pub succeeded: usize,
    pub terminated: usize,
    /// Tasks that never reported (panicked or cancelled).
    pub lost: usize,
    pub gated_calls: u64,
}

impl RunSummary {
    pub fn new(plan: &[PlannedTask], reports: &[TaskReport], gated_calls: u64) -> Self {
        let launched = plan
            .iter()
            .filter(|task| matches!(task, PlannedTask::Ready(_)))
            .count();
        let count = |state: TaskState| reports.iter().filter(|r| r.state == state).count();
        Self {
            skipped: plan.len() - launched,
            succeeded: count(TaskState::Succeeded),
            terminated: count(TaskState::Terminated),
            lost: launched.saturating_sub(reports.len()),
            gated_calls,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} terminated, {} skipped, {} lost, {} calls",
            self.succeeded, self.terminated, self.skipped, self.lost, self.gated_calls
        )
    }
}
