use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use crate::api::{FetchError, PriceProvider};
use crate::clock::{ist, MarketClock, TimeSource};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::monitor::evaluator;
use crate::monitor::gate::AlertGate;
use crate::sink::AlertSink;
use crate::watchlist::WatchListManager;

const INITIAL_BACKOFF_MS: u64 = 500;

/// Scheduler states; transitions happen only at cycle boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    AwaitingSession,
    Checking,
    Sleeping,
    Stopped,
}

/// The cyclic monitoring scheduler: gates on trading hours, fetches prices,
/// evaluates thresholds, and pushes gated alerts at the sink.
///
/// Owns the watch list for the session, so the list cannot change under a
/// running cycle. One symbol's failure never aborts the cycle for the rest.
pub struct MonitorEngine<P, S, T> {
    config: MonitorConfig,
    clock: MarketClock,
    watchlist: WatchListManager,
    gate: AlertGate,
    provider: P,
    sink: S,
    time: T,
    shutdown: CancellationToken,
    state: EngineState,
    session_date: Option<NaiveDate>,
}

impl<P, S, T> MonitorEngine<P, S, T>
where
    P: PriceProvider,
    S: AlertSink,
    T: TimeSource,
{
    pub fn new(
        config: MonitorConfig,
        watchlist: WatchListManager,
        provider: P,
        sink: S,
        time: T,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let clock = MarketClock::new(
            config.market_open,
            config.market_close,
            config.check_interval,
        )?;
        let gate = AlertGate::new(config.alert_cooldown);

        Ok(Self {
            config,
            clock,
            watchlist,
            gate,
            provider,
            sink,
            time,
            shutdown,
            state: EngineState::AwaitingSession,
            session_date: None,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn watchlist(&self) -> &WatchListManager {
        &self.watchlist
    }

    /// Add a symbol between sessions; same validation as the manager
    pub fn add_symbol(&mut self, symbol: &str, threshold: Option<f64>) -> Result<()> {
        self.watchlist.add(symbol, threshold)?;
        self.gate.reset_symbol(symbol);
        Ok(())
    }

    /// Remove a symbol and drop its cooldown state
    pub fn remove_symbol(&mut self, symbol: &str) -> Result<()> {
        self.watchlist.remove(symbol)?;
        self.gate.reset_symbol(symbol);
        Ok(())
    }

    /// Run until the cancellation token fires. The token is polled at cycle
    /// boundaries only; a symbol batch in flight always finishes.
    pub async fn run(&mut self) {
        tracing::info!(
            symbols = self.watchlist.len(),
            interval_secs = self.config.check_interval.as_secs(),
            "monitor engine starting"
        );

        while !self.shutdown.is_cancelled() {
            let now = self.time.now();

            if self.clock.is_trading_now(now) {
                self.state = EngineState::Checking;
                self.roll_trading_day(now);
                self.capture_opening_prices(now).await;
                self.run_cycle().await;
            } else {
                self.state = EngineState::AwaitingSession;
                tracing::debug!("market closed, waiting for next session");
            }

            let wait = self.clock.time_until_next_check(self.time.now());
            tracing::debug!(wait_secs = wait.as_secs(), "sleeping until next check");
            self.state = EngineState::Sleeping;

            tokio::select! {
                _ = self.time.sleep(wait) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        self.state = EngineState::Stopped;
        self.log_session_summary();
    }

    /// Opening prices belong to an IST calendar day; crossing into a new
    /// trading day clears them and the cooldown slate.
    fn roll_trading_day(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&ist()).date_naive();
        if self.session_date == Some(today) {
            return;
        }

        if self.session_date.is_some() {
            tracing::info!(date = %today, "new trading day, resetting opening prices");
            for entry in self.watchlist.entries_mut() {
                entry.reset_opening();
            }
            self.gate.reset_all();
        }
        self.session_date = Some(today);
    }

    /// Fetch opening prices for entries that still lack one. A symbol whose
    /// opening cannot be fetched is skipped this cycle, not dropped.
    async fn capture_opening_prices(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&ist()).date_naive();
        let missing: Vec<String> = self
            .watchlist
            .entries()
            .filter(|entry| entry.opening_price.is_none())
            .map(|entry| entry.symbol.clone())
            .collect();

        for symbol in missing {
            match self.fetch_with_retry(&symbol, PriceKind::Opening).await {
                Ok(price) => {
                    tracing::info!(symbol = %symbol, opening = price, "captured opening price");
                    if let Some(entry) = self.watchlist.get_mut(&symbol) {
                        entry.opening_price = Some(price);
                        entry.opening_captured_on = Some(today);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %symbol,
                        error = %e,
                        "opening price unavailable, symbol skipped this cycle"
                    );
                }
            }
        }
    }

    async fn run_cycle(&mut self) {
        let symbols: Vec<String> = self
            .watchlist
            .entries()
            .map(|entry| entry.symbol.clone())
            .collect();

        for symbol in symbols {
            let Some((opening, threshold)) = self
                .watchlist
                .get(&symbol)
                .and_then(|e| e.opening_price.map(|o| (o, e.threshold_percent)))
            else {
                tracing::warn!(symbol = %symbol, "no opening price yet, skipping");
                continue;
            };

            let current = match self.fetch_with_retry(&symbol, PriceKind::Current).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "price fetch failed, skipping this cycle");
                    continue;
                }
            };

            if let Some(entry) = self.watchlist.get_mut(&symbol) {
                entry.last_known_price = Some(current);
            }

            let evaluation = match evaluator::evaluate(opening, current, threshold) {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "evaluation failed, skipping this cycle");
                    continue;
                }
            };

            tracing::info!(
                symbol = %symbol,
                price = current,
                change_pct = %format!("{:+.2}", evaluation.percentage_change),
                "checked"
            );

            if !evaluation.breached {
                continue;
            }

            let now = self.time.now();
            match self.gate.admit(&symbol, opening, current, &evaluation, now) {
                Some(event) => {
                    tracing::warn!(
                        symbol = %symbol,
                        change_pct = %format!("{:+.2}", evaluation.percentage_change),
                        direction = ?event.direction,
                        "volatility alert"
                    );
                    if let Err(e) = self.sink.emit(&event) {
                        tracing::warn!(symbol = %symbol, error = %e, "failed to deliver alert to sink");
                    }
                }
                None => {
                    tracing::debug!(symbol = %symbol, "breach suppressed by cooldown");
                }
            }
        }
    }

    /// Up to `api_retry_attempts` tries for transient failures with
    /// exponential backoff in between. `Unavailable` is never retried.
    async fn fetch_with_retry(
        &self,
        symbol: &str,
        kind: PriceKind,
    ) -> std::result::Result<f64, FetchError> {
        let attempts = self.config.api_retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let result = match kind {
                PriceKind::Opening => self.provider.fetch_opening_price(symbol).await,
                PriceKind::Current => self.provider.fetch_current_price(symbol).await,
            };

            match result {
                Ok(price) => {
                    if attempt > 1 {
                        tracing::info!(symbol = %symbol, attempt, "fetch succeeded after retry");
                    }
                    return Ok(price);
                }
                Err(FetchError::Unavailable(reason)) => {
                    return Err(FetchError::Unavailable(reason));
                }
                Err(error @ FetchError::Transient(_)) => {
                    if attempt < attempts {
                        let backoff =
                            Duration::from_millis(INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1));
                        tracing::warn!(
                            symbol = %symbol,
                            attempt,
                            error = %error,
                            backoff_ms = backoff.as_millis() as u64,
                            "transient fetch failure, retrying"
                        );
                        self.time.sleep(backoff).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::Transient("all retry attempts failed".to_string())))
    }

    fn log_session_summary(&self) {
        tracing::info!("monitoring stopped");
        for entry in self.watchlist.entries() {
            if let (Some(opening), Some(last)) = (entry.opening_price, entry.last_known_price) {
                let change = (last - opening) / opening * 100.0;
                tracing::info!(
                    symbol = %entry.symbol,
                    last_price = last,
                    change_pct = %format!("{:+.2}", change),
                    "final status"
                );
            }
        }
    }
}

#[derive(Clone, Copy)]
enum PriceKind {
    Opening,
    Current,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemTimeSource;
    use crate::config::{MonitorConfig, Settings};
    use crate::error::MonitorError;
    use crate::models::AlertEvent;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct NoopProvider;

    #[async_trait]
    impl PriceProvider for NoopProvider {
        async fn fetch_opening_price(&self, _symbol: &str) -> std::result::Result<f64, FetchError> {
            Err(FetchError::Unavailable("noop".to_string()))
        }

        async fn fetch_current_price(&self, _symbol: &str) -> std::result::Result<f64, FetchError> {
            Err(FetchError::Unavailable("noop".to_string()))
        }
    }

    struct NoopSink;

    impl AlertSink for NoopSink {
        fn emit(&mut self, _event: &AlertEvent) -> crate::Result<()> {
            Ok(())
        }
    }

    fn engine() -> MonitorEngine<NoopProvider, NoopSink, SystemTimeSource> {
        let config = MonitorConfig::from_settings(Settings {
            threshold_percent: 5.0,
            check_interval_minutes: 5,
            market_open_time: "09:15".to_string(),
            market_close_time: "15:30".to_string(),
            alert_cooldown_minutes: 30,
            api_timeout_seconds: 5,
            api_retry_attempts: 3,
            stock_thresholds: HashMap::new(),
        })
        .unwrap();
        let watchlist = WatchListManager::new(config.default_threshold_percent, HashMap::new());

        MonitorEngine::new(
            config,
            watchlist,
            NoopProvider,
            NoopSink,
            SystemTimeSource,
            CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_engine_starts_awaiting_session() {
        let engine = engine();
        assert_eq!(engine.state(), EngineState::AwaitingSession);
    }

    #[test]
    fn test_add_and_remove_symbol() {
        let mut engine = engine();

        engine.add_symbol("TCS.NS", Some(3.0)).unwrap();
        assert!(engine.watchlist().contains("TCS.NS"));

        engine.remove_symbol("TCS.NS").unwrap();
        assert!(!engine.watchlist().contains("TCS.NS"));

        let result = engine.remove_symbol("TCS.NS");
        assert!(matches!(result, Err(MonitorError::NotFound(_))));
    }

    #[test]
    fn test_bad_session_hours_fail_at_construction() {
        let config = MonitorConfig::from_settings(Settings {
            threshold_percent: 5.0,
            check_interval_minutes: 5,
            market_open_time: "15:30".to_string(),
            market_close_time: "09:15".to_string(),
            alert_cooldown_minutes: 30,
            api_timeout_seconds: 5,
            api_retry_attempts: 3,
            stock_thresholds: HashMap::new(),
        })
        .unwrap();
        let watchlist = WatchListManager::new(5.0, HashMap::new());

        let result = MonitorEngine::new(
            config,
            watchlist,
            NoopProvider,
            NoopSink,
            SystemTimeSource,
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(MonitorError::ClockConfig(_))));
    }
}
