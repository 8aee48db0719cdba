use std::process::ExitCode;

use anyhow::Result;

use super::commands::Commands;
use super::config::cmd_config;
use super::context::CliContext;
use super::env::CliArgs;
use super::run::{cmd_flow, FlowRequest};
use crate::flows::FlowKind;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::FirstCome(args) => {
            cmd_flow(
                FlowRequest {
                    kind: FlowKind::FirstCome,
                    event_id: args.event_id,
                    url: None,
                },
                ctx,
            )
            .await
        }
        Commands::Login => cmd_flow(FlowRequest::new(FlowKind::Login), ctx).await,
        Commands::Lottery(args) => {
            cmd_flow(FlowRequest::new(FlowKind::Lottery).with_url(args.url), ctx).await
        }
        Commands::Purchase(args) => {
            cmd_flow(FlowRequest::new(FlowKind::Purchase).with_url(args.url), ctx).await
        }
        Commands::Config(args) => cmd_config(args, ctx).await.map(|_| ExitCode::SUCCESS),
    }
}
