// Market analysis & signal lifecycle core
// Candle windows become indicator snapshots, snapshots are scored into
// directional signals, and signals are tracked from ACTIVE to closure

pub mod config;
pub mod distribution;
pub mod indicators;
pub mod lifecycle;
pub mod storage;
pub mod strategy;

pub use config::{ScoreWeights, TradingParams};
pub use indicators::{
    AnalyzedCandle, IndicatorEngine, IndicatorError, IndicatorSnapshot, MarketSummary, Trend,
};
pub use lifecycle::{PerformanceStats, SignalLifecycleManager};
pub use storage::{InMemoryStore, JsonFileStore, SignalStore};
pub use strategy::{
    CooldownState, ProtectiveLevels, ScalpingStrategy, StrategyStats, Verdict,
    MIN_ANALYSIS_CANDLES,
};
pub use distribution::{LogDistributor, SignalDistributor};
