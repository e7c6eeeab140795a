use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::entsoe::DEFAULT_BASE_URL;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// TOML file with the tariff, market and refresh settings.
    #[clap(long, env = "CONFIG_PATH", default_value = "prices.toml")]
    pub config: PathBuf,

    #[clap(flatten)]
    pub entsoe: EntsoeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser)]
pub struct EntsoeArgs {
    /// Transparency Platform security token, only the spot tariff needs it.
    #[clap(long = "entsoe-token", env = "ENTSOE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[clap(long = "entsoe-base-url", env = "ENTSOE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Refresh once and print today's and tomorrow's consumer prices.
    #[clap(name = "price")]
    Price,

    /// Print the cheapest and the most expensive windows till the end of tomorrow.
    #[clap(name = "windows")]
    Windows(WindowsArgs),

    /// Keep refreshing and logging the channel values.
    #[clap(name = "watch")]
    Watch(WatchArgs),
}

#[derive(Parser)]
pub struct WindowsArgs {
    /// Window length, overrides `refresh.cheapest_hours`.
    #[clap(long)]
    pub hours: Option<u32>,
}

#[derive(Parser)]
pub struct WatchArgs {
    /// Overrides `refresh.interval`.
    #[clap(long, env = "REFRESH_INTERVAL")]
    pub interval: Option<humantime::Duration>,

    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub heartbeat_url: Option<String>,
}
