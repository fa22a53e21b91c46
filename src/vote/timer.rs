/// Counts an open session down to its deadline. The timer has no clock of its own: whoever owns
/// it calls [`CountdownTimer::tick`] once per interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountdownTimer {
    duration: u64,
    remaining: u64,
}

impl CountdownTimer {
    pub fn new(duration: u64) -> Self {
        CountdownTimer {
            duration,
            remaining: duration,
        }
    }

    /// Resumes a countdown that had already run part of the way.
    pub fn resume(duration: u64, remaining: u64) -> Self {
        CountdownTimer {
            duration,
            remaining: remaining.min(duration),
        }
    }

    /// Moves the countdown one step closer to zero. Does nothing once expired.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_to_expiry() {
        let mut timer = CountdownTimer::new(3);
        assert!(!timer.is_expired());
        timer.tick();
        timer.tick();
        assert_eq!(timer.remaining(), 1);
        assert!(!timer.is_expired());
        timer.tick();
        assert!(timer.is_expired());
    }

    #[test]
    fn tick_is_idempotent_at_zero() {
        let mut timer = CountdownTimer::new(1);
        timer.tick();
        timer.tick();
        timer.tick();
        assert_eq!(timer.remaining(), 0);
        assert!(timer.is_expired());
        assert_eq!(timer.duration(), 1);
    }

    #[test]
    fn resume_is_capped_at_duration() {
        let timer = CountdownTimer::resume(25, 40);
        assert_eq!(timer.remaining(), 25);
        let timer = CountdownTimer::resume(25, 7);
        assert_eq!(timer.remaining(), 7);
    }
}
