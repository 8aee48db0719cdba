use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;
use crate::flows::FlowKind;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets masked
    Show,

    /// Check the configuration and list the flows it can run
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    match args.action {
        ConfigAction::Show => {
            let masked = config.masked();
            match ctx.output() {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&masked)?),
                OutputFormat::Human => {
                    println!("Current configuration ({}):", ctx.config_path().display());
                    print!("{}", serde_yaml::to_string(&masked)?);
                }
            }
        }
        ConfigAction::Validate => {
            config.validate()?;
            println!("Configuration is valid");
            for kind in [
                FlowKind::FirstCome,
                FlowKind::Login,
                FlowKind::Lottery,
                FlowKind::Purchase,
            ] {
                match config.validate_for(kind) {
                    Ok(()) => println!("  {kind:<11} ready"),
                    Err(err) => println!("  {kind:<11} not ready: {err}"),
                }
            }
        }
    }
    Ok(())
}
