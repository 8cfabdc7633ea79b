//! Market ticker client.
//!
//! Reads a spot price and 24h change from a CoinCap-compatible assets API.
//! Gold has no free keyless source, so XAU quotes are simulated around a
//! fixed reference price. Every failure degrades to a zeroed reading.

use crate::config::TickerConfig;
use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GOLD_SYMBOL: &str = "XAUUSD";
const GOLD_BASE_PRICE: f64 = 2420.50;
const GOLD_BASE_CHANGE: f64 = 0.15;

/// A single price reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTicker {
    pub symbol: String,
    pub price: f64,
    /// 24h change in percent
    pub change: f64,
}

impl MarketTicker {
    /// Zeroed reading shown when a fetch fails
    pub fn fallback(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price: 0.0,
            change: 0.0,
        }
    }
}

/// Map a ticker symbol to its CoinCap asset id.
pub fn asset_id(symbol: &str) -> String {
    match symbol.to_uppercase().as_str() {
        "BTC" => "bitcoin".to_string(),
        "ETH" => "ethereum".to_string(),
        "SOL" => "solana".to_string(),
        _ => symbol.to_lowercase(),
    }
}

fn is_gold(symbol: &str) -> bool {
    symbol.to_uppercase().contains("XAU")
}

/// Simulated gold quote: base price ±2.5, change 0.15 ±0.025.
pub fn simulated_gold<R: Rng>(rng: &mut R) -> MarketTicker {
    MarketTicker {
        symbol: GOLD_SYMBOL.to_string(),
        price: GOLD_BASE_PRICE + (rng.gen::<f64>() - 0.5) * 5.0,
        change: GOLD_BASE_CHANGE + (rng.gen::<f64>() - 0.5) * 0.05,
    }
}

/// Response from GET /assets/{id}
#[derive(Debug, Deserialize)]
struct AssetResponse {
    data: AssetData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetData {
    symbol: String,
    price_usd: String,
    change_percent24_hr: Option<String>,
}

impl AssetData {
    fn into_ticker(self) -> Result<MarketTicker> {
        let price = self
            .price_usd
            .parse::<f64>()
            .map_err(|e| Error::Ticker(format!("invalid priceUsd {:?}: {}", self.price_usd, e)))?;
        let change = self
            .change_percent24_hr
            .as_deref()
            .map(str::parse::<f64>)
            .transpose()
            .map_err(|e| Error::Ticker(format!("invalid changePercent24Hr: {}", e)))?
            .unwrap_or(0.0);

        Ok(MarketTicker {
            symbol: format!("{}USD", self.symbol.to_uppercase()),
            price,
            change,
        })
    }
}

/// HTTP client for ticker readings
pub struct TickerClient {
    base_url: String,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl TickerClient {
    pub fn new(config: &TickerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Ticker(format!("failed to build tokio runtime: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Ticker(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            runtime,
            http,
        })
    }

    /// Fetch a reading; never fails. Errors are logged and yield a zeroed reading.
    pub fn fetch(&self, symbol: &str) -> MarketTicker {
        if is_gold(symbol) {
            return simulated_gold(&mut rand::thread_rng());
        }

        match self.try_fetch(symbol) {
            Ok(ticker) => ticker,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to fetch market data");
                MarketTicker::fallback(symbol)
            }
        }
    }

    fn try_fetch(&self, symbol: &str) -> Result<MarketTicker> {
        let url = format!(
            "{}/assets/{}",
            self.base_url,
            urlencoding::encode(&asset_id(symbol))
        );

        self.runtime.block_on(async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Ticker(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Ticker(format!("API error ({})", status)));
            }

            let body: AssetResponse = response
                .json()
                .await
                .map_err(|e| Error::Ticker(format!("failed to parse response: {}", e)))?;
            body.data.into_ticker()
        })
    }
}
