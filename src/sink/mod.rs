use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;
use crate::models::AlertEvent;

/// Receives finalized alert events. Delivery is synchronous; the engine logs
/// and moves on when a sink fails (the cooldown stamp is already recorded,
/// so a failure never causes a re-fire).
pub trait AlertSink: Send {
    fn emit(&mut self, event: &AlertEvent) -> Result<()>;
}

/// Appends alerts to a JSON array on disk, one object per alert
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_history(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

impl AlertSink for JsonFileSink {
    fn emit(&mut self, event: &AlertEvent) -> Result<()> {
        let mut history = self.load_history()?;
        history.push(serde_json::to_value(event)?);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&history)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use chrono::{TimeZone, Utc};

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stockwatch-{}-{}.json", name, std::process::id()))
    }

    fn sample_event(symbol: &str, change: f64) -> AlertEvent {
        AlertEvent::new(
            Utc.with_ymd_and_hms(2024, 1, 3, 4, 45, 0).unwrap(),
            symbol,
            3450.0,
            3623.0,
            change,
            Direction::Up,
        )
    }

    #[test]
    fn test_emit_accumulates_an_array() {
        let path = scratch_file("accumulate");
        let _ = fs::remove_file(&path);
        let mut sink = JsonFileSink::new(&path);

        sink.emit(&sample_event("TCS.NS", 5.014)).unwrap();
        sink.emit(&sample_event("INFY.BO", 6.2)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let history: Vec<Value> = serde_json::from_str(&raw).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["symbol"], "TCS.NS");
        assert_eq!(history[0]["timestamp"], "2024-01-03 10:15:00");
        assert_eq!(history[0]["percentage_change"], 5.01);
        assert_eq!(history[1]["symbol"], "INFY.BO");
        assert_eq!(history[1]["direction"], "UP");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_emit_tolerates_empty_existing_file() {
        let path = scratch_file("empty");
        fs::write(&path, "").unwrap();
        let mut sink = JsonFileSink::new(&path);

        sink.emit(&sample_event("TCS.NS", 5.014)).unwrap();

        let history: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(history.len(), 1);

        let _ = fs::remove_file(&path);
    }
}
