use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};

use crate::error::{MonitorError, Result};

/// Indian Standard Time: fixed UTC+05:30, no daylight saving
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
}

/// Decides whether an instant falls inside the NSE/BSE trading session and
/// how long the engine should sleep before its next wake-up.
///
/// Weekday-only gating; a weekday market holiday is treated as open (no
/// holiday calendar).
#[derive(Debug, Clone)]
pub struct MarketClock {
    open: NaiveTime,
    close: NaiveTime,
    check_interval: Duration,
}

impl MarketClock {
    pub fn new(open: NaiveTime, close: NaiveTime, check_interval: Duration) -> Result<Self> {
        if open >= close {
            return Err(MonitorError::ClockConfig(format!(
                "market open {} must be before close {}",
                open, close
            )));
        }
        Ok(Self {
            open,
            close,
            check_interval,
        })
    }

    /// True on weekdays within `[open, close)` IST
    pub fn is_trading_now(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&ist());
        if !is_trading_day(local.weekday()) {
            return false;
        }
        let time = local.time();
        time >= self.open && time < self.close
    }

    /// How long to sleep from `now`.
    ///
    /// Inside the session: the check interval, clipped so the engine wakes
    /// exactly at the close. Outside: the full wait until the next weekday
    /// open, never a short poll.
    pub fn time_until_next_check(&self, now: DateTime<Utc>) -> Duration {
        let local = now.with_timezone(&ist());

        if self.is_trading_now(now) {
            let close_at = local
                .date_naive()
                .and_time(self.close)
                .and_local_timezone(ist())
                .unwrap();
            let until_close = (close_at - local).to_std().unwrap_or(Duration::ZERO);
            self.check_interval.min(until_close)
        } else {
            let open_at = self.next_open(local);
            (open_at - local).to_std().unwrap_or(Duration::ZERO)
        }
    }

    /// Next weekday occurrence of the open time after `local`
    fn next_open(&self, local: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let mut date = local.date_naive();
        if local.time() >= self.open {
            date = date.succ_opt().unwrap();
        }
        while !is_trading_day(date.weekday()) {
            date = date.succ_opt().unwrap();
        }
        date.and_time(self.open).and_local_timezone(ist()).unwrap()
    }
}

fn is_trading_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Injectable wall clock so the engine can be driven deterministically in
/// tests without real waits.
#[async_trait]
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Production time source: real clock, real tokio sleeps
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

#[async_trait]
impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn nse_clock() -> MarketClock {
        MarketClock::new(
            NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            Duration::from_secs(300),
        )
        .unwrap()
    }

    fn ist_instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        ist()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_rejects_open_not_before_close() {
        let result = MarketClock::new(
            NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            Duration::from_secs(300),
        );

        assert!(matches!(result, Err(MonitorError::ClockConfig(_))));
    }

    #[test]
    fn test_wednesday_morning_is_trading() {
        // 2024-01-03 is a Wednesday
        let clock = nse_clock();
        assert!(clock.is_trading_now(ist_instant(2024, 1, 3, 10, 0)));
    }

    #[test]
    fn test_saturday_is_not_trading() {
        // 2024-01-06 is a Saturday
        let clock = nse_clock();
        assert!(!clock.is_trading_now(ist_instant(2024, 1, 6, 10, 0)));
    }

    #[test]
    fn test_close_boundary_is_exclusive() {
        let clock = nse_clock();
        assert!(clock.is_trading_now(ist_instant(2024, 1, 3, 9, 15)));
        assert!(!clock.is_trading_now(ist_instant(2024, 1, 3, 15, 30)));
    }

    #[test]
    fn test_in_session_wait_is_check_interval() {
        let clock = nse_clock();
        let wait = clock.time_until_next_check(ist_instant(2024, 1, 3, 10, 0));
        assert_eq!(wait, Duration::from_secs(300));
    }

    #[test]
    fn test_wait_clips_to_market_close() {
        let clock = nse_clock();
        // 15:28, two minutes before close
        let wait = clock.time_until_next_check(ist_instant(2024, 1, 3, 15, 28));
        assert_eq!(wait, Duration::from_secs(120));
    }

    #[test]
    fn test_after_close_waits_until_next_open() {
        let clock = nse_clock();
        // Wednesday 16:00 -> Thursday 09:15 is 17h15m
        let wait = clock.time_until_next_check(ist_instant(2024, 1, 3, 16, 0));
        assert_eq!(wait, Duration::from_secs(17 * 3600 + 15 * 60));
    }

    #[test]
    fn test_weekend_wait_skips_to_monday() {
        let clock = nse_clock();
        // Saturday 10:00 -> Monday 09:15 is 47h15m
        let wait = clock.time_until_next_check(ist_instant(2024, 1, 6, 10, 0));
        assert_eq!(wait, Duration::from_secs(47 * 3600 + 15 * 60));
    }

    #[test]
    fn test_early_morning_waits_until_todays_open() {
        let clock = nse_clock();
        // Wednesday 08:00 -> 09:15 same day
        let wait = clock.time_until_next_check(ist_instant(2024, 1, 3, 8, 0));
        assert_eq!(wait, Duration::from_secs(75 * 60));
    }
}
