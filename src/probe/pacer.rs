use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Hands out a fixed number of send opportunities, spaced at least `min_interval` apart. The first
///  opportunity is available immediately.
///
/// If a send overruns the interval, the next opportunity is issued right away and the schedule
///  restarts from there. Missed opportunities are never made up in a burst.
pub struct Pacer {
    total: u64,
    num_issued: u64,
    ticks: Option<Interval>,
}

impl Pacer {
    pub fn new(total: u64, min_interval: Duration) -> Pacer {
        // tokio's interval panics on a zero period
        let ticks = if min_interval.is_zero() {
            None
        }
        else {
            let mut ticks = interval(min_interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticks)
        };

        Pacer {
            total,
            num_issued: 0,
            ticks,
        }
    }

    /// Waits for the next send opportunity, returning its zero-based index, or `None` after the
    ///  last one was issued.
    pub async fn next(&mut self) -> Option<u64> {
        if self.num_issued >= self.total {
            return None;
        }

        if let Some(ticks) = &mut self.ticks {
            ticks.tick().await;
        }

        let idx = self.num_issued;
        self.num_issued += 1;
        Some(idx)
    }

    pub fn num_issued(&self) -> u64 {
        self.num_issued
    }
}
