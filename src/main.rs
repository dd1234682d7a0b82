use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use stockwatch::api::YahooFinanceProvider;
use stockwatch::clock::SystemTimeSource;
use stockwatch::config::{MonitorConfig, Settings};
use stockwatch::monitor::MonitorEngine;
use stockwatch::sink::JsonFileSink;
use stockwatch::watchlist::WatchListManager;

/// Intraday volatility monitor for NSE/BSE securities
#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about)]
struct Cli {
    /// Symbols to watch, e.g. RELIANCE.NS TCS.NS INFY.BO.
    /// Append :PCT for a per-symbol threshold (TCS.NS:3.5).
    #[arg(required = true)]
    symbols: Vec<String>,

    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/config")]
    config: String,

    /// Alert history file
    #[arg(long, default_value = "data/alerts_history.json")]
    alerts_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load configuration from '{}'", cli.config))?;
    let config = MonitorConfig::from_settings(settings).context("invalid configuration")?;

    // ========================================================================
    // Watch list
    // ========================================================================

    let mut watchlist = WatchListManager::new(
        config.default_threshold_percent,
        config.stock_thresholds.clone(),
    );
    for arg in &cli.symbols {
        let (symbol, threshold) = parse_symbol_arg(arg)?;
        watchlist
            .add(&symbol, threshold)
            .with_context(|| format!("cannot watch '{}'", symbol))?;
    }

    tracing::info!("stockwatch starting");
    tracing::info!("  default threshold: {}%", config.default_threshold_percent);
    tracing::info!("  check interval: {} min", config.check_interval.as_secs() / 60);
    tracing::info!(
        "  market hours: {} - {} IST",
        config.market_open.format("%H:%M"),
        config.market_close.format("%H:%M")
    );
    tracing::info!("  alert cooldown: {} min", config.alert_cooldown.as_secs() / 60);
    for entry in watchlist.entries() {
        tracing::info!("  - {} (threshold: {}%)", entry.symbol, entry.threshold_percent);
    }

    // ========================================================================
    // Engine
    // ========================================================================

    let provider = YahooFinanceProvider::new(config.api_timeout);
    let sink = JsonFileSink::new(&cli.alerts_file);
    let shutdown = CancellationToken::new();

    let mut engine = MonitorEngine::new(
        config,
        watchlist,
        provider,
        sink,
        SystemTimeSource,
        shutdown.clone(),
    )?;

    let mut engine_task = tokio::spawn(async move {
        engine.run().await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, stopping after the current cycle...");
            shutdown.cancel();
            engine_task.await.context("engine task panicked")?;
        }
        result = &mut engine_task => {
            result.context("engine task exited unexpectedly")?;
        }
    }

    tracing::info!("goodbye");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stockwatch=info")),
        )
        .init();
}

/// `SYMBOL` or `SYMBOL:PCT`
fn parse_symbol_arg(arg: &str) -> anyhow::Result<(String, Option<f64>)> {
    match arg.split_once(':') {
        None => Ok((arg.to_string(), None)),
        Some((symbol, pct)) => {
            let threshold = pct
                .parse::<f64>()
                .with_context(|| format!("bad threshold '{}' for symbol '{}'", pct, symbol))?;
            Ok((symbol.to_string(), Some(threshold)))
        }
    }
}
