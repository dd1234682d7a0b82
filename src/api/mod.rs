// Market data access
pub mod yahoo;

pub use yahoo::YahooFinanceProvider;

use async_trait::async_trait;
use thiserror::Error;

/// How a single price lookup can fail. `Transient` is worth retrying,
/// `Unavailable` is not.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The venue has no trade data for the symbol
    #[error("no trade data: {0}")]
    Unavailable(String),

    /// Network trouble, timeouts, throttling
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

/// Capability interface for quote lookups.
///
/// Implementations perform exactly one attempt per call; the engine owns the
/// retry policy.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Today's opening price for `symbol`
    async fn fetch_opening_price(&self, symbol: &str) -> Result<f64, FetchError>;

    /// Latest traded price for `symbol`
    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, FetchError>;
}
