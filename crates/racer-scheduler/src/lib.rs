//! Scheduler: outcome classification, eligibility, convergence wait, the
//! per-target racing state machine and the task launcher.

pub mod classifier;
pub mod convergence;
pub mod eligibility;
pub mod launcher;
pub mod path;
pub mod racing;

#[cfg(test)]
mod test_support;

pub use classifier::{ControlAction, classify, interpret};
pub use convergence::{Deadline, next_wait};
pub use eligibility::{Ineligibility, check_eligibility, is_eligible};
pub use launcher::{Launcher, PlannedTask, RunSummary, SkipReason, plan};
pub use path::PathSelector;
pub use racing::{RaceTarget, RacingSettings, RacingTask, TaskReport, TaskState};
