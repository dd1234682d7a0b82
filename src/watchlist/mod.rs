use std::collections::HashMap;

use crate::error::{MonitorError, Result};
use crate::models::WatchEntry;

/// Maximum number of securities tracked at once
pub const MAX_WATCHED: usize = 10;

/// Owns the set of watched symbols and their per-symbol thresholds.
///
/// Entries keep insertion order and are unique by symbol.
#[derive(Debug, Clone)]
pub struct WatchListManager {
    entries: Vec<WatchEntry>,
    default_threshold: f64,
    threshold_overrides: HashMap<String, f64>,
}

impl WatchListManager {
    pub fn new(default_threshold: f64, threshold_overrides: HashMap<String, f64>) -> Self {
        Self {
            entries: Vec::new(),
            default_threshold,
            threshold_overrides,
        }
    }

    /// Add a symbol to the watch list.
    ///
    /// Threshold resolution: explicit argument, then the configured
    /// per-symbol override, then the default.
    pub fn add(&mut self, symbol: &str, threshold: Option<f64>) -> Result<()> {
        if !is_valid_symbol(symbol) {
            return Err(MonitorError::Validation(format!(
                "invalid symbol '{}': expected uppercase alphanumeric root with .NS or .BO suffix",
                symbol
            )));
        }
        if self.contains(symbol) {
            return Err(MonitorError::Validation(format!(
                "symbol '{}' is already watched",
                symbol
            )));
        }
        if self.entries.len() >= MAX_WATCHED {
            return Err(MonitorError::Validation(format!(
                "watch list is full ({} symbols)",
                MAX_WATCHED
            )));
        }

        let threshold = threshold.unwrap_or_else(|| {
            self.threshold_overrides
                .get(symbol)
                .copied()
                .unwrap_or(self.default_threshold)
        });
        if threshold <= 0.0 {
            return Err(MonitorError::Validation(format!(
                "threshold for '{}' must be positive, got {}",
                symbol, threshold
            )));
        }

        self.entries.push(WatchEntry::new(symbol, threshold));
        Ok(())
    }

    /// Remove a symbol, returning its entry
    pub fn remove(&mut self, symbol: &str) -> Result<WatchEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.symbol == symbol)
            .ok_or_else(|| MonitorError::NotFound(symbol.to_string()))?;
        Ok(self.entries.remove(index))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.iter().any(|entry| entry.symbol == symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&WatchEntry> {
        self.entries.iter().find(|entry| entry.symbol == symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut WatchEntry> {
        self.entries.iter_mut().find(|entry| entry.symbol == symbol)
    }

    /// Current entries in insertion order; restartable
    pub fn entries(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut WatchEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `^[A-Z0-9]+\.(NS|BO)$` — uppercase alphanumeric root, NSE or BSE suffix,
/// case-sensitive
pub fn is_valid_symbol(symbol: &str) -> bool {
    let Some((root, exchange)) = symbol.rsplit_once('.') else {
        return false;
    };
    if root.is_empty()
        || !root
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return false;
    }
    matches!(exchange, "NS" | "BO")
}
