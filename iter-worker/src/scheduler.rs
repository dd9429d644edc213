use std::time::Duration;
use tokio::time::Instant;

/// Tracks the next absolute wake-up time for a step ramp, advancing by
/// fixed offsets rather than sleeping relative amounts each time — this
/// is what keeps a long phase from drifting by the sum of its own
/// scheduling jitter (spec §5's hard-real-time requirement; recovered
/// from the original's `clock_nanosleep(..., TIMER_ABSTIME, &t_set, ...)`
/// pattern, which this type ports to `tokio::time::sleep_until`).
#[derive(Debug, Clone, Copy)]
pub struct DeadlineClock {
    next: Instant,
}

impl DeadlineClock {
    pub fn starting_now() -> Self {
        Self { next: Instant::now() }
    }

    pub fn current(&self) -> Instant {
        self.next
    }

    /// Advances the deadline by `ms` without sleeping — used when a step
    /// is skipped (`pause_ms == 0` fast-forward) so later real sleeps stay
    /// anchored to the original cadence instead of resetting it.
    pub fn advance(&mut self, ms: u32) {
        self.next += Duration::from_millis(ms as u64);
    }

    /// Advances the deadline by `ms`, then sleeps until it — the top-of-step
    /// move the original makes to `t_set` before writing the DAC, so that
    /// `sleep_until_offset` afterward reads the settle wait from *this*
    /// step's deadline rather than the one the step after it would use.
    pub async fn advance_and_sleep(&mut self, ms: u32) {
        self.advance(ms);
        tokio::time::sleep_until(self.next).await;
    }

    /// Sleeps until the current deadline without moving it — used for the
    /// settle wait and the mid-pause snapshot wait, which are offsets from
    /// the same anchor rather than independent periods.
    pub async fn sleep_until_offset(&self, ms: u32) {
        tokio::time::sleep_until(self.next + Duration::from_millis(ms as u64)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn absolute_deadlines_do_not_accumulate_drift() {
        let mut clock = DeadlineClock::starting_now();
        let start = Instant::now();

        for _ in 0..10 {
            clock.advance_and_sleep(100).await;
        }

        // 10 periods of 100ms each: exactly 1000ms elapsed, not 1000ms plus
        // whatever scheduling overhead each individual sleep would add if
        // sleeps were relative instead of against an advancing deadline.
        assert_eq!(Instant::now() - start, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_forward_advances_without_sleeping() {
        let mut clock = DeadlineClock::starting_now();
        let start = Instant::now();
        clock.advance(500);
        assert_eq!(Instant::now() - start, Duration::from_millis(0));
        clock.advance_and_sleep(100).await;
        assert_eq!(Instant::now() - start, Duration::from_millis(600));
    }
}
