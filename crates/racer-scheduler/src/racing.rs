//! Per-(slot, ticket) racing state machine.
//!
//! ```text
//! Waiting --deadline reached--> Firing
//! Firing  --Success-----------> Succeeded (after the success cooldown)
//! Firing  --RetrySwitchProxy--> Firing (fallback available) | Retrying
//! Firing  --RetryBackoff------> Retrying
//! Firing  --transport error---> Firing
//! Firing  --Abandon-----------> Terminated
//! Retrying --backoff elapsed--> Firing
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use racer_clock::{Clock, ClockOffset};
use racer_config::RacingConfig;
use racer_core::{
    FireRequest, FireResponse, NetworkPath, ReservableSlot, ReserveEndpoint, Ticket,
};
use racer_lock::CallGate;
use tracing::{debug, error, info, warn};

use crate::classifier::{ControlAction, describe, interpret};
use crate::convergence::Deadline;
use crate::path::PathSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Waiting,
    Firing,
    Retrying,
    Succeeded,
    Terminated,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Terminated)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Firing => "firing",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Timing knobs shared by every task in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RacingSettings {
    pub backoff: Duration,
    pub success_cooldown: Duration,
    pub min_tick: Duration,
}

impl Default for RacingSettings {
    fn default() -> Self {
        Self::from(&RacingConfig::default())
    }
}

impl From<&RacingConfig> for RacingSettings {
    fn from(config: &RacingConfig) -> Self {
        Self {
            backoff: Duration::from_millis(config.backoff_ms),
            success_cooldown: Duration::from_millis(config.success_cooldown_ms),
            min_tick: Duration::from_millis(config.min_tick_ms.max(1)),
        }
    }
}

/// What a task races for, resolved from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceTarget {
    pub request: FireRequest,
    /// Slot display name.
    pub name: String,
    /// Ticket date label.
    pub label: String,
    /// Open time of the governing window, epoch millis.
    pub fire_at_ms: i64,
}

impl RaceTarget {
    pub fn new(slot: &ReservableSlot, ticket: &Ticket) -> Self {
        Self {
            request: FireRequest {
                slot_id: slot.id,
                ticket_id: ticket.id.clone(),
            },
            name: slot.name.clone(),
            label: ticket.label.clone(),
            fire_at_ms: slot.governing_window().open_time_millis(),
        }
    }

    /// Fire time rendered in local time, for log lines.
    pub fn fire_at_display(&self) -> String {
        match DateTime::from_timestamp_millis(self.fire_at_ms) {
            Some(at) => at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            None => self.fire_at_ms.to_string(),
        }
    }
}

/// Final account of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub target: RaceTarget,
    pub state: TaskState,
    /// Firing calls made, including transport failures.
    pub attempts: u32,
    /// Convergence sleeps taken before the first call.
    pub wait_cycles: u32,
    pub last_code: Option<i64>,
    pub last_message: Option<String>,
}

/// One racing task. Owns its state; shares only the endpoint, the call
/// gate, the clock and the read-only offset.
pub struct RacingTask<E: ?Sized> {
    target: RaceTarget,
    endpoint: Arc<E>,
    gate: CallGate,
    deadline: Deadline,
    settings: RacingSettings,
    state: TaskState,
    path: PathSelector,
    attempts: u32,
    wait_cycles: u32,
    last_reply: Option<FireResponse>,
}

impl<E> RacingTask<E>
where
    E: ReserveEndpoint + ?Sized,
{
    pub fn new(
        target: RaceTarget,
        endpoint: Arc<E>,
        gate: CallGate,
        clock: Arc<dyn Clock>,
        offset: ClockOffset,
        settings: RacingSettings,
    ) -> Self {
        let deadline = Deadline::new(target.fire_at_ms, offset, clock);
        let path = PathSelector::new(endpoint.has_fallback());
        Self {
            target,
            endpoint,
            gate,
            deadline,
            settings,
            state: TaskState::Waiting,
            path,
            attempts: 0,
            wait_cycles: 0,
            last_reply: None,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Drive the task until it succeeds or is terminated.
    ///
    /// There is no attempt ceiling and no overall timeout: a remote that
    /// keeps answering with retry-class codes keeps the task alive. Unknown
    /// codes are terminal, which is what bounds the loop in practice.
    pub async fn run(mut self) -> TaskReport {
        info!(
            name = %self.target.name,
            label = %self.target.label,
            slot = self.target.request.slot_id,
            fire_at = %self.target.fire_at_display(),
            "racing task started"
        );
        loop {
            self.state = match self.state {
                TaskState::Waiting => self.wait_step().await,
                TaskState::Firing => self.fire_step().await,
                TaskState::Retrying => self.backoff_step().await,
                TaskState::Succeeded | TaskState::Terminated => break,
            };
        }
        self.report()
    }

    async fn wait_step(&mut self) -> TaskState {
        match self.deadline.next_wait(self.settings.min_tick) {
            Some(wait) => {
                self.wait_cycles += 1;
                debug!(
                    name = %self.target.name,
                    label = %self.target.label,
                    wait_ms = wait.as_millis() as u64,
                    "waiting for window"
                );
                tokio::time::sleep(wait).await;
                TaskState::Waiting
            }
            None => {
                info!(
                    name = %self.target.name,
                    label = %self.target.label,
                    server_now_ms = self.deadline.server_now_ms(),
                    "window open, firing"
                );
                TaskState::Firing
            }
        }
    }

    async fn fire_step(&mut self) -> TaskState {
        let path = self.path.current();
        self.attempts += 1;
        let endpoint = &self.endpoint;
        let request = &self.target.request;
        let result = self
            .gate
            .with_exclusive_access(|| endpoint.fire(request, path))
            .await;
        let used = self.path.consume();

        match result {
            Ok(reply) => self.handle_reply(reply, used).await,
            Err(e) => {
                warn!(
                    name = %self.target.name,
                    label = %self.target.label,
                    path = %used,
                    error = %e,
                    "reservation call failed, retrying"
                );
                TaskState::Firing
            }
        }
    }

    async fn handle_reply(&mut self, reply: FireResponse, used: NetworkPath) -> TaskState {
        let action = interpret(&reply);
        let code = reply.code;
        let message = reply.message.clone();
        self.last_reply = Some(reply);

        match action {
            ControlAction::Success => {
                info!(
                    name = %self.target.name,
                    label = %self.target.label,
                    code,
                    message = %message,
                    "reservation succeeded"
                );
                tokio::time::sleep(self.settings.success_cooldown).await;
                TaskState::Succeeded
            }
            ControlAction::RetrySwitchProxy => {
                if self.path.switch_after_rate_limit(used) {
                    warn!(
                        name = %self.target.name,
                        label = %self.target.label,
                        code,
                        message = %message,
                        reason = describe(code),
                        "switching to fallback path for one attempt"
                    );
                    TaskState::Firing
                } else {
                    warn!(
                        name = %self.target.name,
                        label = %self.target.label,
                        code,
                        message = %message,
                        path = %used,
                        reason = describe(code),
                        "rate limited, backing off"
                    );
                    TaskState::Retrying
                }
            }
            ControlAction::RetryBackoff => {
                self.path.revert();
                warn!(
                    name = %self.target.name,
                    label = %self.target.label,
                    code,
                    message = %message,
                    reason = describe(code),
                    "reservation not confirmed, backing off"
                );
                TaskState::Retrying
            }
            ControlAction::Abandon => {
                error!(
                    name = %self.target.name,
                    label = %self.target.label,
                    code,
                    message = %message,
                    reason = describe(code),
                    "reservation abandoned"
                );
                TaskState::Terminated
            }
        }
    }

    async fn backoff_step(&mut self) -> TaskState {
        tokio::time::sleep(self.settings.backoff).await;
        TaskState::Firing
    }

    fn report(self) -> TaskReport {
        let (last_code, last_message) = match self.last_reply {
            Some(reply) => (Some(reply.code), Some(reply.message)),
            None => (None, None),
        };
        TaskReport {
            target: self.target,
            state: self.state,
            attempts: self.attempts,
            wait_cycles: self.wait_cycles,
            last_code,
            last_message,
        }
    }
}

#[cfg(test)]
#[path = "racing_tests.rs"]
mod tests;
