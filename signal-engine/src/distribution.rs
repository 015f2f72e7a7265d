//! Signal distribution collaborator
//!
//! The core hands finalized signals and closure notifications to a
//! distributor and moves on; delivery success is never load-bearing.

use anyhow::Result;
use common::Signal;
use tracing::info;

/// Fan-out of signals to subscribers. Implementations report how many
/// recipients were reached.
#[async_trait::async_trait]
pub trait SignalDistributor: Send + Sync {
    /// Deliver a freshly opened signal.
    async fn deliver(&self, signal: &Signal) -> Result<usize>;

    /// Deliver a closure notification for a signal.
    async fn deliver_closure(&self, signal: &Signal) -> Result<usize>;
}

/// Writes deliveries to the log; the default when no chat transport is
/// wired in.
pub struct LogDistributor;

#[async_trait::async_trait]
impl SignalDistributor for LogDistributor {
    async fn deliver(&self, signal: &Signal) -> Result<usize> {
        info!(
            "signal {} {} @ {} (confidence {:.0}%, SL {}, TP {}, R:R 1:{})",
            signal.direction,
            signal.symbol,
            signal.entry_price,
            signal.confidence * 100.0,
            signal.stop_loss,
            signal.take_profit,
            signal.risk_reward_ratio
        );
        Ok(1)
    }

    async fn deliver_closure(&self, signal: &Signal) -> Result<usize> {
        info!(
            "signal {} closed: {} ({:+.2}% in {:.0} min)",
            signal.signal_id,
            signal.status,
            signal.pnl_percent.unwrap_or(0.0),
            signal.duration_minutes.unwrap_or(0.0)
        );
        Ok(1)
    }
}
