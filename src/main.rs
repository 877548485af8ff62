#![cfg(not(tarpaulin_include))]

use case_portal::app;
use case_portal::settings::Settings;
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "portal", about = "Client portal for following legal cases")]
struct Args {
    /// TOML configuration file (defaults to ./portal.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.server.bind = bind;
    }

    info!(
        "Starting portal with {:?} source on {}",
        settings.source.kind, settings.server.bind
    );
    app::run(settings).await
}
