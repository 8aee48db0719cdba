use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::flows::{self, FlowKind};

use super::context::CliContext;
use super::output::render_report;

/// Exit code of a run that ended `Aborted`.
pub const ABORTED: u8 = 2;

#[derive(Clone, Debug)]
pub struct FlowRequest {
    pub kind: FlowKind,
    pub event_id: Option<String>,
    pub url: Option<String>,
}

impl FlowRequest {
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            event_id: None,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

pub async fn cmd_flow(request: FlowRequest, ctx: &CliContext) -> Result<ExitCode> {
    let mut config = ctx.config().clone();
    if let Some(event_id) = request.event_id.filter(|id| !id.trim().is_empty()) {
        config.target.event_id = event_id.trim().to_string();
    }
    let config = Arc::new(config);

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_watch(cancel.clone());

    let result = flows::execute(request.kind, config, request.url.as_deref(), cancel).await;
    interrupt.abort();
    let report = result?;

    println!("{}", render_report(&report, ctx.output())?);
    if report.is_done() {
        info!(flow = %request.kind, "flow finished");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(flow = %request.kind, "flow aborted");
        Ok(ExitCode::from(ABORTED))
    }
}

/// Ctrl-C cancels the run; the session still shuts down normally.
fn spawn_interrupt_watch(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received; stopping the run");
                cancel.cancel();
            }
            Err(err) => warn!(%err, "cannot listen for Ctrl-C"),
        }
    })
}
