//! Startup sequence: config, clock sync, snapshot, plan, launch, summary.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use racer_clock::{Clock, ClockOffset, ClockSynchronizer, SystemClock};
use racer_client::{AuditStats, BwsClient, spawn_audit_writer};
use racer_config::RacerConfig;
use racer_core::{Catalog, Credentials};
use racer_lock::CallGate;
use racer_scheduler::{Launcher, PlannedTask, RaceTarget, RacingSettings, RunSummary, plan};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::Cli;

pub(crate) async fn handle_run(cli: &Cli) -> Result<()> {
    let config = RacerConfig::load(&cli.config)?;
    info!(config = %cli.config.display(), jobs = config.job.len(), "config loaded");
    execute(&config, cli.dry_run).await?;
    Ok(())
}

/// Run against an already-loaded config. Returns `None` for a dry run.
pub(crate) async fn execute(config: &RacerConfig, dry_run: bool) -> Result<Option<RunSummary>> {
    let credentials =
        Credentials::from_cookie(&config.cookie).context("Cannot derive request credentials")?;
    let jobs = config.jobs()?;
    let synchronizer = synchronizer(config);

    let precheck = synchronizer.sync_or_zero().await;
    info!(offset = %precheck, "clock pre-check done");

    let client = BwsClient::new(config, credentials)?;
    let snapshot = client
        .fetch_snapshot()
        .await
        .context("Cannot race without the reservation snapshot")?;
    let catalog = Catalog::from_snapshot(&snapshot);
    log_inventory(&catalog);

    let planned = plan(&catalog, &jobs);
    let targets = ready_targets(&planned);

    // Measured again right before launch; this value is what tasks use.
    let offset = synchronizer.sync_or_zero().await;

    if dry_run {
        log_plan(&targets, offset, &SystemClock);
        return Ok(None);
    }

    let (client, audit_writer) = attach_audit(client, &config.audit_path);
    let launcher = Launcher::new(
        Arc::new(client),
        CallGate::new(),
        Arc::new(SystemClock),
        RacingSettings::from(&config.racing),
    );
    let reports = launcher.launch_all(targets, offset).await;
    let summary = RunSummary::new(&planned, &reports, launcher.gate().admitted());
    drop(launcher);

    if let Some(writer) = audit_writer {
        finish_audit(writer, &config.audit_path).await;
    }
    info!(summary = %summary, "run finished");
    Ok(Some(summary))
}

fn synchronizer(config: &RacerConfig) -> ClockSynchronizer {
    match &config.ntp_servers {
        Some(servers) => ClockSynchronizer::new(servers.clone()),
        None => ClockSynchronizer::default(),
    }
}

fn log_inventory(catalog: &Catalog) {
    info!(slots = catalog.slot_count(), "snapshot loaded");
    for ticket in catalog.tickets() {
        info!(
            category = %ticket.category,
            ticket = %ticket.id,
            label = %ticket.label,
            "ticket available"
        );
    }
}

fn ready_targets(planned: &[PlannedTask]) -> Vec<RaceTarget> {
    planned
        .iter()
        .filter_map(|task| match task {
            PlannedTask::Ready(target) => Some(target.clone()),
            PlannedTask::Skipped { .. } => None,
        })
        .collect()
}

fn log_plan(targets: &[RaceTarget], offset: ClockOffset, clock: &dyn Clock) {
    let server_now = offset.apply(clock.now_millis());
    for target in targets {
        info!(
            name = %target.name,
            label = %target.label,
            slot = target.request.slot_id,
            ticket = %target.request.ticket_id,
            fire_at = %target.fire_at_display(),
            in_ms = target.fire_at_ms - server_now,
            "dry run: would race"
        );
    }
    info!(tasks = targets.len(), "dry run finished, nothing fired");
}

fn attach_audit(client: BwsClient, path: &Path) -> (BwsClient, Option<JoinHandle<AuditStats>>) {
    match spawn_audit_writer(path) {
        Ok((sink, writer)) => (client.with_audit(sink), Some(writer)),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "audit file unavailable, replies will not be recorded");
            (client, None)
        }
    }
}

async fn finish_audit(writer: JoinHandle<AuditStats>, path: &Path) {
    match writer.await {
        Ok(stats) => info!(
            path = %path.display(),
            records = stats.records_written,
            failures = stats.write_failures,
            "audit file closed"
        ),
        Err(e) => warn!(error = %e, "audit writer did not finish cleanly"),
    }
}

#[cfg(test)]
#[path = "run_cmd_tests.rs"]
mod tests;
