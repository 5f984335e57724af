//! Game Clock
//!
//! Period lengths and the mapping from (period, seconds remaining) to total elapsed game time.
//! Only feed-provided clock values are used; wall-clock time never enters a snapshot.

use serde::{Deserialize, Serialize};

/// Standard regulation quarter length.
pub const REGULATION_PERIOD_SECS: f64 = 720.0;
/// Standard overtime period length.
pub const OVERTIME_PERIOD_SECS: f64 = 300.0;
/// Standard number of regulation periods.
pub const REGULATION_PERIODS: u32 = 4;

/// Period structure of a game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodTiming {
    #[serde(default = "default_regulation_periods")]
    pub regulation_periods: u32,
    #[serde(default = "default_regulation_period_secs")]
    pub regulation_period_secs: f64,
    #[serde(default = "default_overtime_period_secs")]
    pub overtime_period_secs: f64,
}

fn default_regulation_periods() -> u32 {
    REGULATION_PERIODS
}

fn default_regulation_period_secs() -> f64 {
    REGULATION_PERIOD_SECS
}

fn default_overtime_period_secs() -> f64 {
    OVERTIME_PERIOD_SECS
}

impl Default for PeriodTiming {
    fn default() -> Self {
        Self {
            regulation_periods: REGULATION_PERIODS,
            regulation_period_secs: REGULATION_PERIOD_SECS,
            overtime_period_secs: OVERTIME_PERIOD_SECS,
        }
    }
}

impl PeriodTiming {
    /// Length of `period` in seconds. Periods are 1-based; 0 is treated as period 1.
    pub fn period_length(&self, period: u32) -> f64 {
        if period <= self.regulation_periods {
            self.regulation_period_secs
        } else {
            self.overtime_period_secs
        }
    }

    /// Seconds elapsed in all periods strictly before `period`.
    pub fn secs_before_period(&self, period: u32) -> f64 {
        let completed = period.saturating_sub(1);
        let regulation = completed.min(self.regulation_periods);
        let overtime = completed - regulation;
        regulation as f64 * self.regulation_period_secs
            + overtime as f64 * self.overtime_period_secs
    }

    /// Total game seconds elapsed at (`period`, `secs_remaining`).
    ///
    /// The remaining time is clamped into `[0, period_length]` so a feed reporting a clock
    /// larger than the period never yields negative in-period time.
    pub fn elapsed(&self, period: u32, secs_remaining: f64) -> f64 {
        let length = self.period_length(period);
        let remaining = secs_remaining.clamp(0.0, length);
        self.secs_before_period(period) + (length - remaining)
    }
}

/// Format seconds remaining as a game clock ("11:42", "0:24.3" under a minute).
pub fn clock_display(secs_remaining: f64) -> String {
    let secs = secs_remaining.max(0.0);
    if secs < 60.0 && secs.fract() > 0.0 {
        return format!("0:{:04.1}", secs);
    }
    let whole = secs.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
