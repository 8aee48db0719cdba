use clap::{Args, Subcommand};

use super::config::ConfigArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Wait for a first-come sale to open and walk to the confirmation page
    FirstCome(FirstComeArgs),

    /// Log in from the top page and keep the session open
    Login,

    /// Fill in a lottery entry up to its confirmation page
    Lottery(TargetArgs),

    /// Put a ticket in the cart from a direct purchase page
    Purchase(TargetArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Clone, Debug)]
pub struct FirstComeArgs {
    /// Event id, e.g. 0424600001-P0030270 (overrides the configuration)
    #[arg(long, value_name = "ID")]
    pub event_id: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct TargetArgs {
    /// Page to start from
    #[arg(long, value_name = "URL")]
    pub url: String,
}
