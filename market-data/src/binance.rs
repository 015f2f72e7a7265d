// Binance REST client
// Thin wrapper over the public spot endpoints the analysis loop needs:
// /api/v3/klines for candle windows, /api/v3/ticker/price for live price

use anyhow::{anyhow, Context, Result};
use chrono::{TimeZone, Utc};
use common::Candle;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::MarketData;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// REST client for Binance spot market data.
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
    max_attempts: usize,
    retry_delay: Duration,
}

/// One kline as Binance returns it: a positional array mixing numbers and
/// decimal strings. Only the OHLCV fields are kept.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawKline(
    i64,    // open time (ms)
    String, // open
    String, // high
    String, // low
    String, // close
    String, // volume
    i64,    // close time (ms)
    String, // quote asset volume
    u64,    // number of trades
    String, // taker buy base volume
    String, // taker buy quote volume
    String, // ignore
);

#[derive(Debug, Deserialize)]
struct PriceTicker {
    price: String,
}

impl BinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint (testnet, local stub).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// GET with bounded retry. Transient failures are retried with a flat
    /// delay; the last error is returned once attempts are exhausted.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            let request = self.http.get(url).timeout(Duration::from_secs(10));
            match request.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("decoding response from {url}"));
                    }
                    Err(e) => last_err = Some(anyhow!(e)),
                },
                Err(e) => last_err = Some(anyhow!(e)),
            }

            if attempt < self.max_attempts {
                warn!("request to {url} failed (attempt {attempt}), retrying");
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("request to {url} failed")))
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MarketData for BinanceClient {
    async fn candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let raw: Vec<RawKline> = self.get_json(&url).await?;
        let mut candles = Vec::with_capacity(raw.len());

        for kline in raw {
            candles.push(parse_kline(&kline)?);
        }

        debug!("fetched {} candles for {symbol} @ {interval}", candles.len());
        Ok(candles)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        let ticker: PriceTicker = self.get_json(&url).await?;

        ticker
            .price
            .parse::<f64>()
            .with_context(|| format!("parsing ticker price {:?} for {symbol}", ticker.price))
    }
}

fn parse_kline(kline: &RawKline) -> Result<Candle> {
    let timestamp = Utc
        .timestamp_millis_opt(kline.0)
        .single()
        .ok_or_else(|| anyhow!("kline open time {} out of range", kline.0))?;

    Ok(Candle {
        timestamp,
        open: parse_price(&kline.1, "open")?,
        high: parse_price(&kline.2, "high")?,
        low: parse_price(&kline.3, "low")?,
        close: parse_price(&kline.4, "close")?,
        volume: parse_price(&kline.5, "volume")?,
    })
}

fn parse_price(value: &str, field: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("parsing kline {field} {value:?}"))
}
