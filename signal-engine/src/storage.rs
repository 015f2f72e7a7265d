//! Signal persistence
//!
//! Two durable artifacts: the open-signal set (keyed by signal id) and the
//! append-only performance log of closed signals. A crash between a close
//! computation and its save just means the next monitoring pass re-evaluates
//! the signal; the price condition makes closure idempotent.

use anyhow::{Context, Result};
use common::Signal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ACTIVE_SIGNALS_FILE: &str = "active_signals.json";
const PERFORMANCE_FILE: &str = "performance.json";

/// Storage backend for the lifecycle manager's durable state.
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    /// The open-signal set; empty when nothing was persisted yet.
    async fn load_active(&self) -> Result<HashMap<String, Signal>>;

    /// Persist the whole open-signal set.
    async fn save_active(&self, active: &HashMap<String, Signal>) -> Result<()>;

    /// The performance log of closed signals, oldest first.
    async fn load_performance(&self) -> Result<Vec<Signal>>;

    /// Persist the whole performance log.
    async fn save_performance(&self, log: &[Signal]) -> Result<()>;
}

/// JSON files in a data directory, written via temp file + rename.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn load_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(data) => {
                    debug!("loaded {}", path.display());
                    Ok(data)
                }
                Err(e) => {
                    warn!("invalid JSON in {}, using default: {e}", path.display());
                    Ok(T::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist, using default", path.display());
                Ok(T::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn save_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating data directory {}", self.dir.display()))?;

        let bytes = serde_json::to_vec_pretty(data).context("serializing signal data")?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;

        debug!("saved {}", path.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl SignalStore for JsonFileStore {
    async fn load_active(&self) -> Result<HashMap<String, Signal>> {
        self.load_json(&self.path(ACTIVE_SIGNALS_FILE)).await
    }

    async fn save_active(&self, active: &HashMap<String, Signal>) -> Result<()> {
        self.save_json(&self.path(ACTIVE_SIGNALS_FILE), active).await
    }

    async fn load_performance(&self) -> Result<Vec<Signal>> {
        self.load_json(&self.path(PERFORMANCE_FILE)).await
    }

    async fn save_performance(&self, log: &[Signal]) -> Result<()> {
        self.save_json(&self.path(PERFORMANCE_FILE), &log).await
    }
}

/// In-memory store for testing and development.
#[derive(Default)]
pub struct InMemoryStore {
    active: tokio::sync::RwLock<HashMap<String, Signal>>,
    performance: tokio::sync::RwLock<Vec<Signal>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SignalStore for InMemoryStore {
    async fn load_active(&self) -> Result<HashMap<String, Signal>> {
        Ok(self.active.read().await.clone())
    }

    async fn save_active(&self, active: &HashMap<String, Signal>) -> Result<()> {
        *self.active.write().await = active.clone();
        Ok(())
    }

    async fn load_performance(&self) -> Result<Vec<Signal>> {
        Ok(self.performance.read().await.clone())
    }

    async fn save_performance(&self, log: &[Signal]) -> Result<()> {
        *self.performance.write().await = log.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{Direction, SignalStatus};

    fn sample_signal(id: &str) -> Signal {
        Signal {
            signal_id: id.to_string(),
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Buy,
            entry_price: 95_500.0,
            confidence: 0.65,
            stop_loss: 95_200.0,
            take_profit: 96_000.0,
            atr_at_entry: 150.0,
            risk_reward_ratio: 1.67,
            status: SignalStatus::Active,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            closed_at: None,
            close_price: None,
            pnl_percent: None,
            duration_minutes: None,
        }
    }

    #[tokio::test]
    async fn missing_files_load_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load_active().await.unwrap().is_empty());
        assert!(store.load_performance().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_round_trips_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let mut active = HashMap::new();
        active.insert("BTCUSDT_1".to_string(), sample_signal("BTCUSDT_1"));

        let mut closed = sample_signal("ETHUSDT_2");
        closed.status = SignalStatus::TakeProfit;
        closed.close_price = Some(96_000.0);
        closed.pnl_percent = Some(0.52);

        store.save_active(&active).await.unwrap();
        store.save_performance(std::slice::from_ref(&closed)).await.unwrap();

        assert_eq!(store.load_active().await.unwrap(), active);
        assert_eq!(store.load_performance().await.unwrap(), vec![closed]);
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active_signals.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = JsonFileStore::new(dir.path());
        assert!(store.load_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryStore::new();

        let mut active = HashMap::new();
        active.insert("BTCUSDT_1".to_string(), sample_signal("BTCUSDT_1"));
        store.save_active(&active).await.unwrap();

        assert_eq!(store.load_active().await.unwrap(), active);
        assert!(store.load_performance().await.unwrap().is_empty());
    }
}
