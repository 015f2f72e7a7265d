// Shared domain types for the signal service
// Candles in, signals out - every crate in the workspace speaks these shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV interval as delivered by the exchange.
///
/// Candles are immutable once received and always ordered by `timestamp`
/// ascending inside an analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Typical price used by volume-weighted calculations.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Trade direction of an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of a signal.
///
/// `Active` transitions exactly once into one of the three terminal states;
/// a closed signal never becomes active again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Active,
    StopLoss,
    TakeProfit,
    Expired,
}

impl SignalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignalStatus::Active)
    }
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalStatus::Active => write!(f, "ACTIVE"),
            SignalStatus::StopLoss => write!(f, "STOP_LOSS"),
            SignalStatus::TakeProfit => write!(f, "TAKE_PROFIT"),
            SignalStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A trading signal through its whole lifecycle.
///
/// Created ACTIVE by the lifecycle manager; the closing fields
/// (`closed_at`, `close_price`, `pnl_percent`, `duration_minutes`) are
/// written exactly once at closure and the record is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique id: `"{symbol}_{creation_epoch_secs}"`.
    pub signal_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    /// Weighted strategy score; at least the configured minimum, may
    /// exceed 1.0 when bonuses stack.
    pub confidence: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub atr_at_entry: f64,
    pub risk_reward_ratio: f64,
    pub status: SignalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
}

impl Signal {
    pub fn is_open(&self) -> bool {
        self.status == SignalStatus::Active
    }
}

/// Round to `dp` decimal places.
///
/// Prices and P&L percentages are rounded at the record boundary so the
/// persisted artifacts round-trip exactly.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn closed_signal() -> Signal {
        Signal {
            signal_id: "BTCUSDT_1735689600".to_string(),
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Buy,
            entry_price: 95500.0,
            confidence: 0.725,
            stop_loss: 95200.0,
            take_profit: 96000.0,
            atr_at_entry: 150.0,
            risk_reward_ratio: 1.67,
            status: SignalStatus::TakeProfit,
            created_at: Utc.timestamp_opt(1_735_689_600, 0).unwrap(),
            closed_at: Some(Utc.timestamp_opt(1_735_693_200, 0).unwrap()),
            close_price: Some(96000.0),
            pnl_percent: Some(0.52),
            duration_minutes: Some(60.0),
        }
    }

    #[test]
    fn closed_signal_round_trips() {
        let signal = closed_signal();
        let json = serde_json::to_string(&signal).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, back);
    }

    #[test]
    fn status_and_direction_wire_strings() {
        assert_eq!(
            serde_json::to_string(&SignalStatus::StopLoss).unwrap(),
            "\"STOP_LOSS\""
        );
        assert_eq!(
            serde_json::to_string(&SignalStatus::TakeProfit).unwrap(),
            "\"TAKE_PROFIT\""
        );
        assert_eq!(
            serde_json::to_string(&SignalStatus::Expired).unwrap(),
            "\"EXPIRED\""
        );
        assert_eq!(serde_json::to_string(&Direction::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Direction::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn active_signal_omits_closing_fields() {
        let mut signal = closed_signal();
        signal.status = SignalStatus::Active;
        signal.closed_at = None;
        signal.close_price = None;
        signal.pnl_percent = None;
        signal.duration_minutes = None;

        let json = serde_json::to_string(&signal).unwrap();
        assert!(!json.contains("close_price"));
        assert!(json.contains("\"ACTIVE\""));
        assert!(signal.is_open());
    }

    #[test]
    fn round_dp_matches_record_precision() {
        assert_eq!(round_dp(95_500.128, 2), 95_500.13);
        assert_eq!(round_dp(0.72349, 3), 0.723);
        assert_eq!(round_dp(-5.006, 2), -5.01);
        assert_eq!(round_dp(60.04, 1), 60.0);
    }

    #[test]
    fn typical_price_is_hlc_mean() {
        let candle = Candle {
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 10.5,
            volume: 100.0,
        };
        assert!((candle.typical_price() - 10.5).abs() < 1e-12);
    }
}
