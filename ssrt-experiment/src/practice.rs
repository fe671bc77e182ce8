use ssrt_core::TrialOutcome;

/// Counts behind the practice feedback screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PracticeTally {
    pub go_total: usize,
    pub go_correct: usize,
    pub stop_total: usize,
    pub stop_success: usize,
}

impl PracticeTally {
    pub fn record(&mut self, outcome: &TrialOutcome) {
        if outcome.stop_trial {
            self.stop_total += 1;
            self.stop_success += usize::from(outcome.correct);
        } else {
            self.go_total += 1;
            self.go_correct += usize::from(outcome.correct);
        }
    }

    pub fn trials(&self) -> usize {
        self.go_total + self.stop_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssrt_core::{StimulusKind, TaskVariant};

    fn outcome(stop_trial: bool, correct: bool) -> TrialOutcome {
        TrialOutcome {
            task: TaskVariant::Simple,
            stimulus: StimulusKind::Circle,
            stop_trial,
            response_key: None,
            response_time_ms: None,
            correct,
            ssd_ms: 500,
        }
    }

    #[test]
    fn splits_go_and_stop() {
        let mut tally = PracticeTally::default();
        for (stop, correct) in [(false, true), (false, false), (true, true), (true, false), (false, true)] {
            tally.record(&outcome(stop, correct));
        }
        assert_eq!(
            tally,
            PracticeTally {
                go_total: 3,
                go_correct: 2,
                stop_total: 2,
                stop_success: 1,
            }
        );
        assert_eq!(tally.trials(), 5);
    }
}
