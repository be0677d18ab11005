// ticker.rs — 自动旋转的可取消定时任务句柄

use std::time::{Duration, Instant};

/// Repeating deadline schedule for auto-rotation.
///
/// The handle is armed on its first `poll` and cancelled by dropping it.
/// The host never owns a free-running timer: it asks `deadline()` when to
/// wake up and calls `poll(now)` when it does.
#[derive(Debug)]
pub struct AutoRotateTicker {
    period: Duration,
    next_due: Option<Instant>,
    max_catch_up: u32,
}

impl AutoRotateTicker {
    pub fn new(period: Duration, max_catch_up: u32) -> Self {
        let period = period.max(Duration::from_millis(1));
        log::debug!("auto-rotate ticker started (period {:?})", period);
        Self {
            period,
            next_due: None,
            max_catch_up: max_catch_up.max(1),
        }
    }

    #[cfg(test)]
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_due
    }

    /// Returns how many ticks are due at `now`.
    ///
    /// Backlog above `max_catch_up` is dropped and the next deadline is
    /// realigned to the period grid.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(next) = self.next_due else {
            self.next_due = Some(now + self.period);
            return 0;
        };
        if now < next {
            return 0;
        }

        let period_ns = self.period.as_nanos();
        let behind_ns = now.duration_since(next).as_nanos();
        let elapsed = 1 + behind_ns / period_ns;
        let rem = (behind_ns % period_ns) as u64;

        self.next_due = Some(now + self.period - Duration::from_nanos(rem));

        let fired = elapsed.min(self.max_catch_up as u128) as u32;
        if (fired as u128) < elapsed {
            log::debug!(
                "auto-rotate ticker dropped {} late ticks",
                elapsed - fired as u128
            );
        }
        fired
    }
}

impl Drop for AutoRotateTicker {
    fn drop(&mut self) {
        log::debug!("auto-rotate ticker stopped");
    }
}
