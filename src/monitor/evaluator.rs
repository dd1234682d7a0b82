use crate::error::{MonitorError, Result};
use crate::models::Direction;

/// Outcome of comparing a current price against the day's opening price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub percentage_change: f64,
    pub direction: Direction,
    pub breached: bool,
}

/// Signed intraday move and breach decision for one symbol.
///
/// Breach is inclusive at the boundary: a move of exactly the threshold
/// raises an alert. A zero or negative opening price cannot be a baseline
/// and fails instead of dividing by zero.
pub fn evaluate(opening_price: f64, current_price: f64, threshold_percent: f64) -> Result<Evaluation> {
    if opening_price <= 0.0 {
        return Err(MonitorError::InvalidOpeningPrice(opening_price));
    }

    let percentage_change = (current_price - opening_price) / opening_price * 100.0;
    let direction = if percentage_change > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };

    Ok(Evaluation {
        percentage_change,
        direction,
        breached: percentage_change.abs() >= threshold_percent,
    })
}
