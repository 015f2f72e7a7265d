//! Signal lifecycle management
//!
//! Workflow per cycle: analyze a symbol, persist any new signal into the
//! open set, monitor every open signal against live price, close on
//! stop/target/expiry, append the result to the performance log. A signal
//! transitions out of ACTIVE exactly once and is immutable afterwards.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use common::{round_dp, Direction, Signal, SignalStatus};
use market_data::MarketData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TradingParams;
use crate::indicators::IndicatorEngine;
use crate::storage::SignalStore;
use crate::strategy::{ScalpingStrategy, Verdict};

/// Realized P&L of a closed trade, as a percentage of entry.
///
/// BUY profits when price rises, SELL when it falls.
pub fn pnl_percent(direction: Direction, entry_price: f64, close_price: f64) -> f64 {
    match direction {
        Direction::Buy => (close_price - entry_price) / entry_price * 100.0,
        Direction::Sell => (entry_price - close_price) / entry_price * 100.0,
    }
}

/// Aggregate performance over a trailing window. Derived on demand from
/// the performance log, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_signals: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub total_pnl: f64,
}

/// Generates signals and tracks them to closure.
pub struct SignalLifecycleManager {
    market: Arc<dyn MarketData>,
    store: Box<dyn SignalStore>,
    engine: IndicatorEngine,
    strategy: ScalpingStrategy,
    params: Arc<TradingParams>,
    active: HashMap<String, Signal>,
    performance: Vec<Signal>,
}

impl SignalLifecycleManager {
    /// Build the manager and load persisted state from `store`.
    pub async fn new(
        market: Arc<dyn MarketData>,
        store: Box<dyn SignalStore>,
        params: Arc<TradingParams>,
    ) -> Result<Self> {
        let active = store.load_active().await.context("loading open signals")?;
        let performance = store
            .load_performance()
            .await
            .context("loading performance log")?;

        info!(
            "signal lifecycle manager ready ({} open, {} in history)",
            active.len(),
            performance.len()
        );

        Ok(Self {
            market,
            store,
            engine: IndicatorEngine::new(params.clone()),
            strategy: ScalpingStrategy::new(params.clone()),
            params,
            active,
            performance,
        })
    }

    /// Analyze one symbol and emit a signal when the strategy, cooldown and
    /// open-set caps all allow it.
    ///
    /// Market-data and indicator failures are contained here: the symbol is
    /// skipped this cycle and `Ok(None)` returned. Only a persistence
    /// failure is an error, since losing the open set risks duplicate or
    /// lost signals.
    pub async fn analyze_symbol(&mut self, symbol: &str) -> Result<Option<Signal>> {
        debug!("analyzing {symbol}");

        let candles = match self
            .market
            .candles(symbol, &self.params.timeframe, self.params.candle_limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!("market data unavailable for {symbol}: {e}");
                return Ok(None);
            }
        };

        let series = match self.engine.compute(&candles) {
            Ok(series) => series,
            Err(e) => {
                warn!("indicator computation failed for {symbol}: {e}");
                return Ok(None);
            }
        };

        if let Some(summary) = self.engine.market_summary(&series, symbol) {
            debug!(
                "{symbol}: price {:.2}, trend {}, volatility {:.4}, rsi {:.1}, volume {:.1}x",
                summary.price, summary.trend, summary.volatility, summary.rsi, summary.volume_ratio
            );
        }

        let (direction, confidence, levels) = match self.strategy.analyze(&series) {
            Verdict::Hold { confidence } => {
                debug!("{symbol}: HOLD (confidence {confidence:.2})");
                return Ok(None);
            }
            Verdict::Signal {
                direction,
                confidence,
                levels,
            } => (direction, confidence, levels),
        };

        if self.active.len() >= self.params.max_active_signals {
            warn!(
                "open signal cap reached ({}), suppressing {direction} {symbol}",
                self.params.max_active_signals
            );
            return Ok(None);
        }

        let open_for_symbol = self.active.values().filter(|s| s.symbol == symbol).count();
        if open_for_symbol >= self.params.max_signals_per_symbol {
            debug!("{symbol} already has {open_for_symbol} open signals, suppressing");
            return Ok(None);
        }

        if !self.strategy.validate_signal(symbol, direction) {
            debug!("{symbol}: {direction} suppressed by cooldown");
            return Ok(None);
        }

        let created_at = Utc::now();
        let signal = Signal {
            signal_id: format!("{symbol}_{}", created_at.timestamp()),
            symbol: symbol.to_string(),
            direction,
            entry_price: levels.entry_price,
            confidence: round_dp(confidence, 3),
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            atr_at_entry: levels.atr,
            risk_reward_ratio: levels.risk_reward,
            status: SignalStatus::Active,
            created_at,
            closed_at: None,
            close_price: None,
            pnl_percent: None,
            duration_minutes: None,
        };

        self.active.insert(signal.signal_id.clone(), signal.clone());
        self.store
            .save_active(&self.active)
            .await
            .context("persisting open signals")?;

        info!(
            "signal generated: {direction} {symbol} @ {} (confidence {:.0}%)",
            signal.entry_price,
            signal.confidence * 100.0
        );

        Ok(Some(signal))
    }

    /// One monitoring pass over every open signal.
    ///
    /// A signal whose price is unavailable stays open and is retried next
    /// pass. Returns the signals closed in this pass, in open-set iteration
    /// order.
    pub async fn monitor_active_signals(&mut self) -> Result<Vec<Signal>> {
        if self.active.is_empty() {
            return Ok(Vec::new());
        }

        debug!("monitoring {} open signals", self.active.len());

        let open: Vec<(String, String)> = self
            .active
            .iter()
            .map(|(id, signal)| (id.clone(), signal.symbol.clone()))
            .collect();

        let mut closed = Vec::new();

        for (id, symbol) in open {
            let price = match self.market.current_price(&symbol).await {
                Ok(price) => price,
                Err(e) => {
                    warn!("price unavailable for {symbol}, signal {id} retried next cycle: {e}");
                    continue;
                }
            };

            let Some(signal) = self.active.get(&id) else {
                continue;
            };

            let now = Utc::now();
            let status = match closure_status(signal, price) {
                Some(status) => status,
                None if self.is_expired(signal, now) => SignalStatus::Expired,
                None => continue,
            };

            let mut closing = signal.clone();
            closing.status = status;
            closing.close_price = Some(price);
            closing.closed_at = Some(now);
            closing.pnl_percent = Some(round_dp(
                pnl_percent(closing.direction, closing.entry_price, price),
                2,
            ));
            closing.duration_minutes = Some(round_dp(
                (now - closing.created_at).num_seconds() as f64 / 60.0,
                1,
            ));

            info!(
                "signal closed: {} {} ({:+.2}% in {:.0} min)",
                closing.symbol,
                status,
                closing.pnl_percent.unwrap_or(0.0),
                closing.duration_minutes.unwrap_or(0.0)
            );

            self.performance.push(closing.clone());
            self.store
                .save_performance(&self.performance)
                .await
                .context("persisting performance log")?;

            self.active.remove(&id);
            self.store
                .save_active(&self.active)
                .await
                .context("persisting open signals")?;

            closed.push(closing);
        }

        if !closed.is_empty() {
            info!("{} signals closed this pass", closed.len());
        }

        Ok(closed)
    }

    /// Performance over the trailing `days`; None when no signal closed in
    /// the window.
    pub fn performance_stats(&self, days: i64) -> Option<PerformanceStats> {
        if self.performance.is_empty() {
            return None;
        }

        let cutoff = Utc::now() - Duration::days(days);
        let recent: Vec<&Signal> = self
            .performance
            .iter()
            .filter(|s| s.closed_at.is_some_and(|closed| closed > cutoff))
            .collect();

        if recent.is_empty() {
            return None;
        }

        let pnl = |s: &&Signal| s.pnl_percent.unwrap_or(0.0);
        let winners: Vec<&&Signal> = recent.iter().filter(|s| pnl(s) > 0.0).collect();
        let losers: Vec<&&Signal> = recent.iter().filter(|s| pnl(s) <= 0.0).collect();

        let total = recent.len();
        let win_count = winners.len();
        let loss_count = losers.len();

        let total_wins: f64 = winners.iter().map(|s| pnl(s)).sum();
        let total_losses: f64 = losers.iter().map(|s| pnl(s)).sum();

        let avg_win = if win_count > 0 {
            total_wins / win_count as f64
        } else {
            0.0
        };
        let avg_loss = if loss_count > 0 {
            total_losses / loss_count as f64
        } else {
            0.0
        };
        let profit_factor = if total_losses.abs() > 0.0 {
            total_wins / total_losses.abs()
        } else {
            0.0
        };

        Some(PerformanceStats {
            total_signals: total,
            winners: win_count,
            losers: loss_count,
            win_rate: win_count as f64 / total as f64,
            avg_win,
            avg_loss,
            profit_factor,
            total_pnl: recent.iter().map(pnl).sum(),
        })
    }

    /// Currently open signals, in no particular order.
    pub fn active_signals(&self) -> Vec<&Signal> {
        self.active.values().collect()
    }

    /// Look up one open signal by id.
    pub fn signal(&self, signal_id: &str) -> Option<&Signal> {
        self.active.get(signal_id)
    }

    fn is_expired(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        now - signal.created_at > Duration::hours(self.params.max_signal_lifetime_hours)
    }
}

/// Terminal status reached at `price`, if any. Expiry is handled separately.
fn closure_status(signal: &Signal, price: f64) -> Option<SignalStatus> {
    match signal.direction {
        Direction::Buy => {
            if price <= signal.stop_loss {
                Some(SignalStatus::StopLoss)
            } else if price >= signal.take_profit {
                Some(SignalStatus::TakeProfit)
            } else {
                None
            }
        }
        Direction::Sell => {
            if price >= signal.stop_loss {
                Some(SignalStatus::StopLoss)
            } else if price <= signal.take_profit {
                Some(SignalStatus::TakeProfit)
            } else {
                None
            }
        }
    }
}
