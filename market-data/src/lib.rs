// Market data collaborator
// The analysis core only ever sees this trait; the Binance REST client is
// one implementation of it

use anyhow::Result;
use common::Candle;

pub mod binance;

pub use binance::BinanceClient;

/// Read-only market data source.
///
/// Fetch failures surface as errors; callers treat an error as "this
/// symbol is unavailable this cycle" and skip rather than abort.
#[async_trait::async_trait]
pub trait MarketData: Send + Sync {
    /// The most recent `limit` candles for `symbol` at `interval`,
    /// ordered by timestamp ascending.
    async fn candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>>;

    /// Latest traded price for `symbol`.
    async fn current_price(&self, symbol: &str) -> Result<f64>;
}
