use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::AlertEvent;
use crate::monitor::evaluator::Evaluation;

/// Per-symbol cooldown so a sustained breach fires once per window instead
/// of once per cycle.
///
/// State persists for the whole session; it is cleared for a symbol when it
/// is re-added after removal, and wholesale when a new trading day begins.
#[derive(Debug)]
pub struct AlertGate {
    cooldown: Duration,
    last_alert_at: HashMap<String, DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert_at: HashMap::new(),
        }
    }

    /// True when no prior alert exists for `symbol` or the cooldown has
    /// fully elapsed (inclusive boundary)
    pub fn should_alert(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert_at.get(symbol) {
            None => true,
            Some(last) => match (now - *last).to_std() {
                Ok(elapsed) => elapsed >= self.cooldown,
                // `now` behind the stamp; stay quiet
                Err(_) => false,
            },
        }
    }

    pub fn record_alert(&mut self, symbol: &str, now: DateTime<Utc>) {
        self.last_alert_at.insert(symbol.to_string(), now);
    }

    /// Cooldown-check a breach and, if allowed, stamp the cooldown and build
    /// the event. The stamp lands before the caller can hand the event to a
    /// sink, so a failing sink cannot cause a duplicate emission.
    pub fn admit(
        &mut self,
        symbol: &str,
        opening_price: f64,
        current_price: f64,
        evaluation: &Evaluation,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        if !self.should_alert(symbol, now) {
            return None;
        }
        self.record_alert(symbol, now);
        Some(AlertEvent::new(
            now,
            symbol,
            opening_price,
            current_price,
            evaluation.percentage_change,
            evaluation.direction,
        ))
    }

    pub fn last_alert_at(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.last_alert_at.get(symbol).copied()
    }

    pub fn reset_symbol(&mut self, symbol: &str) {
        self.last_alert_at.remove(symbol);
    }

    pub fn reset_all(&mut self) {
        self.last_alert_at.clear();
    }
}
