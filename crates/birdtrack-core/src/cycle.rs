//! Fixed-period tick driver.
//!
//! The driver hands out tick indices `0..cycles` and sleeps one period before
//! every tick except the first. The sleep is the only suspension point of a
//! tick loop; work inside a tick runs sequentially.

use std::time::Duration;

/// Drives a bounded number of ticks at a fixed period.
#[derive(Debug, Clone)]
pub struct CycleDriver {
    period: Duration,
    cycles: u32,
    started: u32,
}

impl CycleDriver {
    /// Create a driver for `cycles` ticks, `period` apart.
    pub const fn new(period: Duration, cycles: u32) -> Self {
        Self {
            period,
            cycles,
            started: 0,
        }
    }

    /// Wait for and return the next tick index, or `None` once every tick has
    /// been handed out.
    pub async fn next_tick(&mut self) -> Option<u32> {
        if self.started >= self.cycles {
            return None;
        }
        if self.started > 0 && !self.period.is_zero() {
            tokio::time::sleep(self.period).await;
        }
        let tick = self.started;
        self.started = self.started.saturating_add(1);
        Some(tick)
    }

    /// Ticks handed out so far.
    pub const fn started(&self) -> u32 {
        self.started
    }

    /// Total ticks this driver will hand out.
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Interval between ticks.
    pub const fn period(&self) -> Duration {
        self.period
    }
}
