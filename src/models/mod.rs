use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One monitored security on the watch list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    pub symbol: String,
    pub threshold_percent: f64,
    /// Captured once per trading day; baseline for breach evaluation
    pub opening_price: Option<f64>,
    /// IST calendar date the opening price belongs to
    pub opening_captured_on: Option<NaiveDate>,
    pub last_known_price: Option<f64>,
}

impl WatchEntry {
    pub fn new(symbol: impl Into<String>, threshold_percent: f64) -> Self {
        Self {
            symbol: symbol.into(),
            threshold_percent,
            opening_price: None,
            opening_captured_on: None,
            last_known_price: None,
        }
    }

    /// Forget the captured opening price so the next session re-fetches it
    pub fn reset_opening(&mut self) {
        self.opening_price = None;
        self.opening_captured_on = None;
    }
}

/// Direction of an intraday move relative to the opening price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

/// Record of a threshold breach that passed the cooldown gate.
///
/// Serializes to the alert-history shape: IST wall-clock timestamp and the
/// percentage change rounded to two decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertEvent {
    #[serde(with = "ist_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub opening_price: f64,
    pub current_price: f64,
    pub percentage_change: f64,
    pub direction: Direction,
}

impl AlertEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        opening_price: f64,
        current_price: f64,
        percentage_change: f64,
        direction: Direction,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            opening_price,
            current_price,
            percentage_change: (percentage_change * 100.0).round() / 100.0,
            direction,
        }
    }
}

/// `"%Y-%m-%d %H:%M:%S"` in IST, the timezone all session bookkeeping uses
mod ist_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::clock::ist;

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let local = timestamp.with_timezone(&ist());
        serializer.serialize_str(&local.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)?;
        naive
            .and_local_timezone(ist())
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| serde::de::Error::custom("timestamp not representable in IST"))
    }
}
