use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{FetchError, PriceProvider};

const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Client for the Yahoo Finance chart API, the venue carrying NSE/BSE quotes
#[derive(Debug, Clone)]
pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[allow(dead_code)]
    symbol: String,
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
}

impl YahooFinanceProvider {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: YAHOO_API_BASE.to_string(),
        }
    }

    /// Point the provider at a different host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_chart(&self, symbol: &str) -> Result<ChartResult, FetchError> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::Unavailable(format!(
                "no listing for '{}'",
                symbol
            )));
        }
        if !status.is_success() {
            // 5xx and 429 come and go on Yahoo's free endpoints
            return Err(FetchError::Transient(format!(
                "HTTP {} from quote API",
                status
            )));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("undecodable quote response: {}", e)))?;

        if let Some(error) = envelope.chart.error {
            return Err(FetchError::Unavailable(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        envelope
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| FetchError::Unavailable(format!("empty chart result for '{}'", symbol)))
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    async fn fetch_opening_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let chart = self.fetch_chart(symbol).await?;
        let opening = chart
            .indicators
            .quote
            .first()
            .and_then(|quote| quote.open.iter().flatten().next().copied())
            .ok_or_else(|| {
                FetchError::Unavailable(format!("no opening sample for '{}' today", symbol))
            })?;

        if opening <= 0.0 {
            return Err(FetchError::Unavailable(format!(
                "non-positive opening price {} for '{}'",
                opening, symbol
            )));
        }
        Ok(opening)
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let chart = self.fetch_chart(symbol).await?;
        let price = chart.meta.regular_market_price.ok_or_else(|| {
            FetchError::Unavailable(format!("no market price for '{}'", symbol))
        })?;

        if price <= 0.0 {
            return Err(FetchError::Unavailable(format!(
                "non-positive market price {} for '{}'",
                price, symbol
            )));
        }
        Ok(price)
    }
}
