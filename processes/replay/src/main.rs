//! 'main' for the txwatch replay process

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use tracing::info;
use tracing_subscriber::{
    filter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter, Layer as _,
    Registry,
};
use txwatch_module_tx_tracker::TxTrackerConfig;

mod replay_config;
mod scenario;

use replay_config::ReplayConfig;
use scenario::Scenario;

fn default_config_path() -> PathBuf {
    PathBuf::from(option_env!("TXWATCH_REPLAY_DEFAULT_CONFIG").unwrap_or("txwatch-replay.toml"))
}

#[derive(Debug, clap::Parser)]
struct Args {
    /// Path to configuration.
    #[arg(long, default_value = default_config_path().into_os_string())]
    config: PathBuf,
    /// Scenario file with chain data, events and expected notifications.
    scenario: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout carries the notifications
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(filter::LevelFilter::INFO.into()));
    Registry::default().with(fmt_layer).init();

    info!("txwatch replay");

    let config = Config::builder()
        .add_source(File::from(args.config.as_path()).required(false))
        .add_source(Environment::with_prefix("TXWATCH"))
        .build()?;
    let replay_config = ReplayConfig::new(&config);

    let scenario = Scenario::load(&args.scenario).await?;

    let mut stdout = std::io::stdout().lock();
    let produced = scenario.replay(TxTrackerConfig::new(&config), |notification| {
        serde_json::to_writer(&mut stdout, notification)?;
        writeln!(stdout)?;
        Ok(())
    })?;

    if replay_config.check_expected {
        scenario.check(&produced)?;
    }

    info!("Exiting");
    Ok(())
}
