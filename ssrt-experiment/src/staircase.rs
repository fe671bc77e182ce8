use std::time::Duration;

use crate::config::SsdConfig;

/// One-up/one-down stop-signal delay tracker.
///
/// Successful inhibition lengthens the delay, failed inhibition shortens it,
/// always within `[min, max]`. Go trials leave it alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staircase {
    current: Duration,
    initial: Duration,
    min: Duration,
    max: Duration,
    step: Duration,
}

impl Staircase {
    pub fn new(config: &SsdConfig) -> Self {
        let min = Duration::from_millis(config.min_ms);
        let max = Duration::from_millis(config.max_ms.max(config.min_ms));
        let initial = Duration::from_millis(config.initial_ms).clamp(min, max);
        Self {
            current: initial,
            initial,
            min,
            max,
            step: Duration::from_millis(config.step_ms),
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }

    /// Back to the initial delay, whatever the previous block ended on.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Apply the outcome of one stop trial and return the new delay.
    pub fn record_stop(&mut self, inhibited: bool) -> Duration {
        self.current = if inhibited {
            (self.current + self.step).min(self.max)
        } else {
            self.current.saturating_sub(self.step).max(self.min)
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn scenario_config() -> SsdConfig {
        SsdConfig {
            initial_ms: 500,
            min_ms: 100,
            max_ms: 1000,
            step_ms: 50,
        }
    }

    #[test]
    fn successful_stops_climb() {
        let mut staircase = Staircase::new(&scenario_config());
        let mut seen = vec![staircase.current()];
        for _ in 0..3 {
            seen.push(staircase.record_stop(true));
        }
        assert_eq!(seen, vec![ms(500), ms(550), ms(600), ms(650)]);
    }

    #[test]
    fn failed_stops_descend() {
        let mut staircase = Staircase::new(&scenario_config());
        let mut seen = vec![staircase.current()];
        for _ in 0..3 {
            seen.push(staircase.record_stop(false));
        }
        assert_eq!(seen, vec![ms(500), ms(450), ms(400), ms(350)]);
    }

    #[test]
    fn clamps_at_both_bounds() {
        let mut staircase = Staircase::new(&scenario_config());
        for _ in 0..20 {
            staircase.record_stop(true);
        }
        assert_eq!(staircase.current(), ms(1000));
        for _ in 0..40 {
            staircase.record_stop(false);
        }
        assert_eq!(staircase.current(), ms(100));
    }

    #[test]
    fn reset_ignores_previous_block() {
        let mut a = Staircase::new(&scenario_config());
        let mut b = a.clone();
        for _ in 0..5 {
            a.record_stop(true);
            b.record_stop(false);
        }
        a.reset();
        b.reset();
        assert_eq!(a.current(), ms(500));
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn stays_within_bounds(outcomes in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut staircase = Staircase::new(&scenario_config());
            let (min, max) = staircase.bounds();
            for inhibited in outcomes {
                let before = staircase.current();
                let after = staircase.record_stop(inhibited);
                prop_assert!(after >= min && after <= max);
                if inhibited {
                    prop_assert!(after > before || after == max);
                } else {
                    prop_assert!(after < before || after == min);
                }
            }
        }
    }
}
