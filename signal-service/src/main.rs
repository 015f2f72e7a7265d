// Trading signal service
// Analyzes configured symbols on an interval, emits signals through the
// distributor, and monitors open signals to closure. Analysis-only: this
// binary never places an order.

use anyhow::{Context, Result};
use market_data::BinanceClient;
use signal_engine::{
    JsonFileStore, LogDistributor, SignalDistributor, SignalLifecycleManager, TradingParams,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};

const CONFIG_PATH: &str = "signals.toml";
const DATA_DIR: &str = "data";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🚀 starting trading signal service");

    let params = Arc::new(
        TradingParams::load_or_default(CONFIG_PATH).context("loading trading parameters")?,
    );
    params.validate().context("validating trading parameters")?;
    info!(
        "analyzing {} symbols on {} candles every {}s",
        params.symbols.len(),
        params.timeframe,
        params.analysis_interval_secs
    );

    let market = Arc::new(BinanceClient::new());
    let store = Box::new(JsonFileStore::new(DATA_DIR));
    let mut manager = SignalLifecycleManager::new(market, store, params.clone())
        .await
        .context("initializing signal lifecycle manager")?;
    let distributor = LogDistributor;

    if let Some(stats) = manager.performance_stats(7) {
        info!(
            "last 7 days: {} signals, win rate {:.1}%, total P&L {:+.2}%",
            stats.total_signals,
            stats.win_rate * 100.0,
            stats.total_pnl
        );
    }

    let interval = Duration::from_secs(params.analysis_interval_secs);
    let mut iteration: u64 = 0;

    loop {
        iteration += 1;
        tracing::debug!("analysis cycle #{iteration}");

        for symbol in &params.symbols {
            match manager.analyze_symbol(symbol).await {
                Ok(Some(signal)) => match distributor.deliver(&signal).await {
                    Ok(sent) => info!("signal {} delivered to {sent} subscribers", signal.signal_id),
                    Err(e) => warn!("delivery failed for {}: {e}", signal.signal_id),
                },
                Ok(None) => {}
                Err(e) => error!("analysis failed for {symbol}: {e:#}"),
            }
        }

        match manager.monitor_active_signals().await {
            Ok(closed) => {
                for signal in &closed {
                    if let Err(e) = distributor.deliver_closure(signal).await {
                        warn!("closure delivery failed for {}: {e}", signal.signal_id);
                    }
                }
            }
            Err(e) => error!("monitoring pass failed: {e:#}"),
        }

        // shutdown only interrupts the sleep, so an in-flight cycle always
        // finishes before the service halts
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("👋 shutting down gracefully");
                break;
            }
        }
    }

    Ok(())
}
