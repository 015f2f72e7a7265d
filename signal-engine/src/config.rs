//! Trading parameter configuration
//!
//! The bot never executes trades; these parameters only shape which signals
//! get generated, their protective levels, and how long they are monitored.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Timeframes the exchange accepts for candle requests.
const VALID_TIMEFRAMES: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d",
];

/// Relative importance of each scoring component.
///
/// The six weights must sum to 1.0 (within 0.01); cross bonuses and volume
/// confirmation are added on top of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// EMA trend direction
    pub ema_trend: f64,
    /// RSI momentum
    pub rsi_momentum: f64,
    /// Bollinger band touches
    pub bollinger: f64,
    /// VWAP crosses and deviation
    pub vwap: f64,
    /// Volume confirmation of the leading side
    pub volume: f64,
    /// Single-candle price action
    pub price_action: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ema_trend: 0.25,
            rsi_momentum: 0.20,
            bollinger: 0.15,
            vwap: 0.15,
            volume: 0.15,
            price_action: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.ema_trend
            + self.rsi_momentum
            + self.bollinger
            + self.vwap
            + self.volume
            + self.price_action
    }
}

/// Parameters of the signal service.
///
/// Every field has a default so a partial TOML file works; `validate` must
/// pass before any component is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingParams {
    /// Symbols analyzed every cycle
    pub symbols: Vec<String>,

    /// Candle interval used for analysis
    pub timeframe: String,

    /// Seconds between analysis cycles
    pub analysis_interval_secs: u64,

    /// Candles requested per analysis window
    pub candle_limit: usize,

    /// Fast EMA look-back
    pub ema_fast: usize,

    /// Slow EMA look-back
    pub ema_slow: usize,

    /// RSI look-back
    pub rsi_period: usize,

    /// RSI level treated as overbought
    pub rsi_overbought: f64,

    /// RSI level treated as oversold
    pub rsi_oversold: f64,

    /// Bollinger band look-back
    pub bollinger_period: usize,

    /// Bollinger band width in standard deviations
    pub bollinger_std: f64,

    /// ATR look-back
    pub atr_period: usize,

    /// Stop loss distance = ATR x this multiplier
    pub stop_loss_multiplier: f64,

    /// Take profit distance = ATR x this multiplier
    pub take_profit_multiplier: f64,

    /// Minimum confidence required to emit a signal
    pub min_confidence: f64,

    /// Volume must exceed this multiple of its average to confirm
    pub min_volume_ratio: f64,

    /// Band width below which Bollinger scoring is skipped
    pub min_volatility: f64,

    /// Minimum minutes between emissions per (symbol, direction)
    pub signal_cooldown_minutes: i64,

    /// Scoring weights
    pub weights: ScoreWeights,

    /// Default risk fraction for the informational position-size helper
    pub recommended_risk_per_trade: f64,

    /// Open signals monitored at once, across all symbols
    pub max_active_signals: usize,

    /// Open signals allowed per symbol
    pub max_signals_per_symbol: usize,

    /// Hours after which an open signal expires
    pub max_signal_lifetime_hours: i64,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
                "BNBUSDT".to_string(),
            ],
            timeframe: "1m".to_string(),
            analysis_interval_secs: 10,
            candle_limit: 100,
            ema_fast: 9,
            ema_slow: 21,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            bollinger_period: 20,
            bollinger_std: 2.0,
            atr_period: 14,
            stop_loss_multiplier: 2.0,
            take_profit_multiplier: 3.0,
            min_confidence: 0.50,
            min_volume_ratio: 1.5,
            min_volatility: 0.02,
            signal_cooldown_minutes: 5,
            weights: ScoreWeights::default(),
            recommended_risk_per_trade: 0.02,
            max_active_signals: 10,
            max_signals_per_symbol: 2,
            max_signal_lifetime_hours: 24,
        }
    }
}

impl TradingParams {
    /// Load parameters from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let params: TradingParams = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;

        Ok(params)
    }

    /// Reject incoherent parameter sets before anything runs.
    pub fn validate(&self) -> Result<()> {
        let total = self.weights.sum();
        if (total - 1.0).abs() > 0.01 {
            bail!("scoring weights must sum to 1.0, got {total:.3}");
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!(
                "min_confidence must be within [0.0, 1.0], got {}",
                self.min_confidence
            );
        }

        if self.ema_fast >= self.ema_slow {
            bail!(
                "ema_fast ({}) must be shorter than ema_slow ({})",
                self.ema_fast,
                self.ema_slow
            );
        }

        if !VALID_TIMEFRAMES.contains(&self.timeframe.as_str()) {
            bail!(
                "invalid timeframe {:?}, expected one of {}",
                self.timeframe,
                VALID_TIMEFRAMES.join(", ")
            );
        }

        if self.symbols.is_empty() {
            bail!("at least one symbol must be configured");
        }

        if self.rsi_oversold >= self.rsi_overbought {
            bail!(
                "rsi_oversold ({}) must be below rsi_overbought ({})",
                self.rsi_oversold,
                self.rsi_overbought
            );
        }

        Ok(())
    }
}
