//! Rebase window arithmetic
//!
//! Every `min_rebase_time_interval_sec` period has one window opening
//! `rebase_window_offset_sec` after the period boundary and staying open for
//! `rebase_window_length_sec`. A window is eligible only if it opens at least
//! one full interval after the previous rebase, so each window is consumed at
//! most once and rebases are never closer than the interval.
//!
//! Windows are closed-open: `[open, close)`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Window timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseTiming {
    /// Minimum seconds between rebases; also the period length
    pub min_rebase_time_interval_sec: u64,

    /// Seconds after the period boundary at which the window opens
    pub rebase_window_offset_sec: u64,

    /// Seconds the window stays open
    pub rebase_window_length_sec: u64,
}

impl Default for RebaseTiming {
    fn default() -> Self {
        Self {
            min_rebase_time_interval_sec: 24 * 60 * 60,
            rebase_window_offset_sec: 72_000, // 20:00 UTC
            rebase_window_length_sec: 15 * 60,
        }
    }
}

impl RebaseTiming {
    /// Validated timing
    pub fn new(interval: u64, offset: u64, length: u64) -> Result<Self> {
        let timing = Self {
            min_rebase_time_interval_sec: interval,
            rebase_window_offset_sec: offset,
            rebase_window_length_sec: length,
        };
        timing.validate()?;
        Ok(timing)
    }

    /// Require `interval > 0` and `offset + length <= interval`
    pub fn validate(&self) -> Result<()> {
        if self.min_rebase_time_interval_sec == 0 {
            return Err(Error::InvalidConfiguration(
                "rebase interval must be positive".to_string(),
            ));
        }
        let end = self
            .rebase_window_offset_sec
            .checked_add(self.rebase_window_length_sec)
            .ok_or_else(|| Error::InvalidConfiguration("window end overflows".to_string()))?;
        if end > self.min_rebase_time_interval_sec {
            return Err(Error::InvalidConfiguration(format!(
                "window offset {} + length {} exceeds interval {}",
                self.rebase_window_offset_sec,
                self.rebase_window_length_sec,
                self.min_rebase_time_interval_sec
            )));
        }
        Ok(())
    }
}

/// Closed-open time range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseWindow {
    /// First second inside the window
    pub open: u64,
    /// First second after the window
    pub close: u64,
}

impl RebaseWindow {
    /// `open <= now < close`
    pub fn contains(&self, now: u64) -> bool {
        self.open <= now && now < self.close
    }
}

/// Earliest eligible window for the period containing `now`
///
/// `last_rebase` of 0 means no rebase has happened yet. The returned window may
/// lie in the past (missed) or the future (not yet open); callers test it with
/// [`RebaseWindow::contains`].
pub fn window_for(now: u64, last_rebase: u64, timing: &RebaseTiming) -> RebaseWindow {
    let interval = timing.min_rebase_time_interval_sec.max(1);
    let boundary = now - now % interval;
    let mut open = boundary.saturating_add(timing.rebase_window_offset_sec);

    if last_rebase > 0 {
        let earliest = last_rebase.saturating_add(interval);
        if open < earliest {
            let periods = (earliest - open).div_ceil(interval);
            open = open.saturating_add(periods.saturating_mul(interval));
        }
    }

    RebaseWindow {
        open,
        close: open.saturating_add(timing.rebase_window_length_sec),
    }
}

/// Next window a rebase could still land in: the current one if it has not
/// closed yet, otherwise the one a period later
pub fn next_window(now: u64, last_rebase: u64, timing: &RebaseTiming) -> RebaseWindow {
    let window = window_for(now, last_rebase, timing);
    if now < window.close {
        return window;
    }
    let interval = timing.min_rebase_time_interval_sec.max(1);
    RebaseWindow {
        open: window.open.saturating_add(interval),
        close: window.close.saturating_add(interval),
    }
}
