//! One run: launch the browser, drive the flow, always shut down.

use std::sync::Arc;

use action_flow::{FlowOrchestrator, FlowReport, PageSnapshotRecorder};
use anyhow::{bail, Context};
use cdp_adapter::{BrowserSession, PageDriver};
use ticketpilot_core_types::RunId;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::{build_steps, FlowContext, FlowKind};
use crate::config::FlowConfig;

/// Launches Chromium, runs `kind` and closes the browser whatever happened.
#[instrument(skip_all, fields(flow = %kind))]
pub async fn execute(
    kind: FlowKind,
    config: Arc<FlowConfig>,
    url: Option<&str>,
    cancel: CancellationToken,
) -> anyhow::Result<FlowReport> {
    config
        .validate_for(kind)
        .with_context(|| format!("configuration is not usable for {kind}"))?;
    if matches!(kind, FlowKind::Lottery | FlowKind::Purchase) && url.is_none() {
        bail!("{kind} needs a target --url");
    }

    let session = BrowserSession::launch(&config.cdp_config())
        .await
        .context("failed to start the browser")?;
    let result = drive(kind, config, url, session.page(), RunId::new(), cancel).await;
    if let Err(err) = session.shutdown().await {
        warn!(%err, "browser shutdown reported an error");
    }
    result
}

/// Runs `kind` against an already open page.
pub async fn drive(
    kind: FlowKind,
    config: Arc<FlowConfig>,
    url: Option<&str>,
    page: Arc<dyn PageDriver>,
    run_id: RunId,
    cancel: CancellationToken,
) -> anyhow::Result<FlowReport> {
    let steps = build_steps(kind, &config, url);
    let snapshots = Arc::new(PageSnapshotRecorder::new(
        page.clone(),
        config.recording.screenshot_dir.clone(),
        run_id.clone(),
    ));
    let ctx = Arc::new(FlowContext::new(config.clone(), page, cancel.clone()));
    let orchestrator = FlowOrchestrator::new(run_id, ctx, steps, snapshots)
        .context("flow definition rejected")?
        .with_cancellation(cancel.clone());

    info!(run = %describe_states(&orchestrator), "flow starting");
    let report = orchestrator.run().await;
    if report.is_done() {
        hold_open(&config, &cancel).await;
    }
    Ok(report)
}

fn describe_states(orchestrator: &FlowOrchestrator<FlowContext>) -> String {
    orchestrator
        .states()
        .iter()
        .map(|state| state.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Keeps the browser up for review after a finished run.
async fn hold_open(config: &FlowConfig, cancel: &CancellationToken) {
    let keep = config.timing.keep_open();
    if keep.is_zero() {
        return;
    }
    info!(minutes = config.timing.keep_open_minutes, "keeping the browser open for review");
    tokio::select! {
        _ = cancel.cancelled() => info!("review window closed early"),
        _ = tokio::time::sleep(keep) => info!("review window over"),
    }
}
