use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env, LoadedConfig};

pub async fn run() -> Result<ExitCode> {
    load_local_env();
    let cli = CliArgs::parse();

    let _log_guard = init_logging(&cli.log_level, cli.debug, cli.log_format, cli.log_file.as_deref())?;

    info!(
        "Starting ticketpilot v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let LoadedConfig { mut config, path } = load_config(cli.config.as_ref()).await?;
    config.apply_env_overrides()?;
    if cli.headless {
        config.browser.headless = true;
    }
    let ctx = CliContext::new(config, path, cli.output);

    match dispatch(&cli, &ctx).await {
        Ok(code) => {
            info!("Command completed");
            Ok(code)
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
