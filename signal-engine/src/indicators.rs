//! Technical indicator computation
//!
//! Turns an ordered candle window into one [`IndicatorSnapshot`] per candle:
//! EMAs for trend, RSI for momentum, Bollinger bands for volatility, VWAP as
//! the institutional reference line, volume analysis, ATR for protective
//! levels, and raw price action. The engine is stateless; the same window
//! and parameters always produce the same output.

use common::Candle;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::TradingParams;

/// Volume moving-average window, independent of the configurable periods.
const VOLUME_MA_WINDOW: usize = 20;

/// Rolling window for the price-change mean.
const PRICE_CHANGE_MA_WINDOW: usize = 5;

/// Look-back of the multi-step momentum delta.
const MOMENTUM_STEPS: usize = 4;

/// Indicator fields the strategy refuses to score without.
pub const REQUIRED_FIELDS: &[&str] = &[
    "ema_fast",
    "ema_slow",
    "rsi",
    "bb_upper",
    "bb_lower",
    "vwap",
    "atr",
    "volume_ratio",
];

/// Why a whole indicator computation failed.
///
/// Individual families degrade to NaN instead of raising this; only bad
/// input aborts the computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// The candle window was empty.
    EmptyWindow,
    /// One or more OHLCV fields were non-finite somewhere in the window.
    MissingFields { fields: Vec<&'static str> },
}

impl std::fmt::Display for IndicatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorError::EmptyWindow => write!(f, "candle window is empty"),
            IndicatorError::MissingFields { fields } => {
                write!(f, "candles missing required fields: {}", fields.join(", "))
            }
        }
    }
}

impl std::error::Error for IndicatorError {}

/// All indicator values for one candle.
///
/// Fields of a family that failed to compute hold NaN; the data-quality
/// gate downstream rejects snapshots with NaN in [`REQUIRED_FIELDS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    /// (upper - lower) / middle, the volatility gauge
    pub bb_width: f64,
    pub vwap: f64,
    pub volume_ma: f64,
    pub volume_ratio: f64,
    pub atr: f64,
    /// Single-step close change as a ratio
    pub price_change: f64,
    pub price_change_ma: f64,
    /// close minus close four candles back
    pub momentum: f64,
}

impl IndicatorSnapshot {
    fn nan() -> Self {
        Self {
            ema_fast: f64::NAN,
            ema_slow: f64::NAN,
            rsi: f64::NAN,
            bb_upper: f64::NAN,
            bb_middle: f64::NAN,
            bb_lower: f64::NAN,
            bb_width: f64::NAN,
            vwap: f64::NAN,
            volume_ma: f64::NAN,
            volume_ratio: f64::NAN,
            atr: f64::NAN,
            price_change: f64::NAN,
            price_change_ma: f64::NAN,
            momentum: f64::NAN,
        }
    }

    /// Required fields that are absent (non-finite) in this snapshot.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let values = [
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("rsi", self.rsi),
            ("bb_upper", self.bb_upper),
            ("bb_lower", self.bb_lower),
            ("vwap", self.vwap),
            ("atr", self.atr),
            ("volume_ratio", self.volume_ratio),
        ];

        values
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| *name)
            .collect()
    }

    /// True when every required field is finite.
    pub fn has_required_fields(&self) -> bool {
        self.missing_required_fields().is_empty()
    }
}

/// A candle paired with its computed indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedCandle {
    pub candle: Candle,
    pub indicators: IndicatorSnapshot,
}

/// Market trend read from the EMA pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Headline view of one symbol, for logs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub symbol: String,
    pub price: f64,
    pub trend: Trend,
    pub volatility: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub vwap: f64,
    pub atr: f64,
    pub volume_ratio: f64,
}

/// Computes indicator snapshots over a candle window.
pub struct IndicatorEngine {
    params: Arc<TradingParams>,
}

impl IndicatorEngine {
    pub fn new(params: Arc<TradingParams>) -> Self {
        Self { params }
    }

    /// Compute every indicator family over `candles`.
    ///
    /// A family that cannot be computed (window shorter than its period,
    /// degenerate inputs) is logged and left as NaN in the snapshots; only
    /// empty or non-finite input aborts the whole computation.
    pub fn compute(&self, candles: &[Candle]) -> Result<Vec<AnalyzedCandle>, IndicatorError> {
        if candles.is_empty() {
            return Err(IndicatorError::EmptyWindow);
        }
        validate_fields(candles)?;

        let len = candles.len();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let ema_fast = family("ema_fast", len, ema_series(&closes, self.params.ema_fast));
        let ema_slow = family("ema_slow", len, ema_series(&closes, self.params.ema_slow));
        let rsi = family("rsi", len, rsi_series(&closes, self.params.rsi_period));
        let (bb_upper, bb_middle, bb_lower, bb_width) = match bollinger_series(
            &closes,
            self.params.bollinger_period,
            self.params.bollinger_std,
        ) {
            Ok(bands) => bands,
            Err(reason) => {
                warn!("indicator family bollinger failed: {reason}");
                (nan_vec(len), nan_vec(len), nan_vec(len), nan_vec(len))
            }
        };
        let vwap = vwap_series(candles);
        let (volume_ma, volume_ratio) = volume_series(&volumes);
        let atr = family("atr", len, atr_series(candles, self.params.atr_period));
        let (price_change, price_change_ma, momentum) = price_action_series(&closes);

        let snapshots = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| AnalyzedCandle {
                candle: candle.clone(),
                indicators: IndicatorSnapshot {
                    ema_fast: ema_fast[i],
                    ema_slow: ema_slow[i],
                    rsi: rsi[i],
                    bb_upper: bb_upper[i],
                    bb_middle: bb_middle[i],
                    bb_lower: bb_lower[i],
                    bb_width: bb_width[i],
                    vwap: vwap[i],
                    volume_ma: volume_ma[i],
                    volume_ratio: volume_ratio[i],
                    atr: atr[i],
                    price_change: price_change[i],
                    price_change_ma: price_change_ma[i],
                    momentum: momentum[i],
                },
            })
            .collect();

        debug!("computed indicators for {len} candles");
        Ok(snapshots)
    }

    /// Current trend, with a 1% margin before the EMAs count as separated.
    pub fn trend(&self, series: &[AnalyzedCandle]) -> Trend {
        let Some(latest) = series.last() else {
            return Trend::Neutral;
        };
        let ind = &latest.indicators;
        if !ind.ema_fast.is_finite() || !ind.ema_slow.is_finite() {
            return Trend::Neutral;
        }

        if ind.ema_fast > ind.ema_slow * 1.01 {
            Trend::Bullish
        } else if ind.ema_fast < ind.ema_slow * 0.99 {
            Trend::Bearish
        } else {
            Trend::Neutral
        }
    }

    /// Latest band width; 0.0 when unavailable.
    pub fn volatility(&self, series: &[AnalyzedCandle]) -> f64 {
        series
            .last()
            .map(|bar| bar.indicators.bb_width)
            .filter(|w| w.is_finite())
            .unwrap_or(0.0)
    }

    /// Headline summary of the latest bar, None for an empty series.
    pub fn market_summary(&self, series: &[AnalyzedCandle], symbol: &str) -> Option<MarketSummary> {
        let latest = series.last()?;
        let ind = &latest.indicators;

        Some(MarketSummary {
            symbol: symbol.to_string(),
            price: latest.candle.close,
            trend: self.trend(series),
            volatility: self.volatility(series),
            ema_fast: ind.ema_fast,
            ema_slow: ind.ema_slow,
            rsi: ind.rsi,
            vwap: ind.vwap,
            atr: ind.atr,
            volume_ratio: ind.volume_ratio,
        })
    }
}

fn validate_fields(candles: &[Candle]) -> Result<(), IndicatorError> {
    let mut missing = Vec::new();
    for (field, accessor) in [
        ("open", (|c: &Candle| c.open) as fn(&Candle) -> f64),
        ("high", |c| c.high),
        ("low", |c| c.low),
        ("close", |c| c.close),
        ("volume", |c| c.volume),
    ] {
        if candles.iter().any(|c| !accessor(c).is_finite()) {
            missing.push(field);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IndicatorError::MissingFields { fields: missing })
    }
}

fn nan_vec(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

/// Unwrap a family result, degrading to NaN on failure.
fn family(name: &str, len: usize, result: Result<Vec<f64>, String>) -> Vec<f64> {
    match result {
        Ok(values) => values,
        Err(reason) => {
            warn!("indicator family {name} failed: {reason}");
            nan_vec(len)
        }
    }
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values; indices before the seed are back-filled with it.
fn ema_series(values: &[f64], period: usize) -> Result<Vec<f64>, String> {
    if period == 0 {
        return Err("period must be positive".to_string());
    }
    if values.len() < period {
        return Err(format!(
            "needs {period} values, window has {}",
            values.len()
        ));
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().mean();

    let mut out = vec![seed; values.len()];
    for i in period..values.len() {
        out[i] = alpha * values[i] + (1.0 - alpha) * out[i - 1];
    }
    Ok(out)
}

/// RSI with Wilder smoothing, bounded [0, 100]; leading values fill at the
/// neutral 50.
fn rsi_series(closes: &[f64], period: usize) -> Result<Vec<f64>, String> {
    if period == 0 {
        return Err("period must be positive".to_string());
    }
    if closes.len() < period + 1 {
        return Err(format!(
            "needs {} closes, window has {}",
            period + 1,
            closes.len()
        ));
    }

    let mut out = vec![50.0; closes.len()];

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        avg_gain += delta.max(0.0);
        avg_loss += (-delta).max(0.0);
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let n = period as f64;
    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        avg_gain = (avg_gain * (n - 1.0) + delta.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-delta).max(0.0)) / n;
        out[i] = rsi_value(avg_gain, avg_loss);
    }

    Ok(out)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

/// Bollinger bands: rolling SMA +/- `k` population standard deviations,
/// plus the normalized width. Leading values back-fill from the first
/// complete window.
#[allow(clippy::type_complexity)]
fn bollinger_series(
    closes: &[f64],
    period: usize,
    k: f64,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>), String> {
    if period == 0 {
        return Err("period must be positive".to_string());
    }
    if closes.len() < period {
        return Err(format!(
            "needs {period} closes, window has {}",
            closes.len()
        ));
    }

    let len = closes.len();
    let mut upper = nan_vec(len);
    let mut middle = nan_vec(len);
    let mut lower = nan_vec(len);
    let mut width = nan_vec(len);

    for i in (period - 1)..len {
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().mean();
        let sd = window.iter().population_std_dev();

        middle[i] = mean;
        upper[i] = mean + k * sd;
        lower[i] = mean - k * sd;
        width[i] = if mean != 0.0 {
            (upper[i] - lower[i]) / mean
        } else {
            f64::NAN
        };
    }

    for i in 0..(period - 1) {
        upper[i] = upper[period - 1];
        middle[i] = middle[period - 1];
        lower[i] = lower[period - 1];
        width[i] = width[period - 1];
    }

    Ok((upper, middle, lower, width))
}

/// Running volume-weighted average price over the whole window.
fn vwap_series(candles: &[Candle]) -> Vec<f64> {
    let mut cumulative_pv = 0.0;
    let mut cumulative_volume = 0.0;

    candles
        .iter()
        .map(|candle| {
            cumulative_pv += candle.typical_price() * candle.volume;
            cumulative_volume += candle.volume;
            if cumulative_volume > 0.0 {
                cumulative_pv / cumulative_volume
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Rolling volume mean (expanding warm-up) and current/average ratio.
/// Degenerate ratios normalize to 1.0, "typical volume".
fn volume_series(volumes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let len = volumes.len();
    let mut ma = Vec::with_capacity(len);
    let mut ratio = Vec::with_capacity(len);

    for i in 0..len {
        let start = (i + 1).saturating_sub(VOLUME_MA_WINDOW);
        let mean = volumes[start..=i].iter().mean();
        ma.push(mean);

        let r = volumes[i] / mean;
        ratio.push(if r.is_finite() { r } else { 1.0 });
    }

    (ma, ratio)
}

/// ATR with Wilder smoothing over the true range; leading values back-fill
/// from the seed.
fn atr_series(candles: &[Candle], period: usize) -> Result<Vec<f64>, String> {
    if period == 0 {
        return Err("period must be positive".to_string());
    }
    if candles.len() < period {
        return Err(format!(
            "needs {period} candles, window has {}",
            candles.len()
        ));
    }

    let tr: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let high_low = candle.high - candle.low;
            if i == 0 {
                high_low
            } else {
                let prev_close = candles[i - 1].close;
                high_low
                    .max((candle.high - prev_close).abs())
                    .max((candle.low - prev_close).abs())
            }
        })
        .collect();

    let seed = tr[..period].iter().mean();
    let mut out = vec![seed; candles.len()];

    let n = period as f64;
    for i in period..candles.len() {
        out[i] = (out[i - 1] * (n - 1.0) + tr[i]) / n;
    }

    Ok(out)
}

/// Single-step percentage change, its short rolling mean, and the
/// multi-step momentum delta. Missing leading values fill with zero.
fn price_action_series(closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let len = closes.len();

    let change: Vec<f64> = (0..len)
        .map(|i| {
            if i == 0 {
                return 0.0;
            }
            let r = (closes[i] - closes[i - 1]) / closes[i - 1];
            if r.is_finite() {
                r
            } else {
                0.0
            }
        })
        .collect();

    let change_ma: Vec<f64> = (0..len)
        .map(|i| {
            let start = (i + 1).saturating_sub(PRICE_CHANGE_MA_WINDOW);
            change[start..=i].iter().mean()
        })
        .collect();

    let momentum: Vec<f64> = (0..len)
        .map(|i| {
            if i >= MOMENTUM_STEPS {
                closes[i] - closes[i - MOMENTUM_STEPS]
            } else {
                0.0
            }
        })
        .collect();

    (change, change_ma, momentum)
}
