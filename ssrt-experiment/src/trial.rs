//! Trial engine: one stimulus, one response window, one outcome.

use std::time::Duration;

use rand::Rng;
use ssrt_core::{
    BlockKind, ControlInput, Display, DisplayCommand, KeyEvent, ResponseKey, StimulusStyle,
    TrialOutcome, TrialSpec, TrialState,
};
use ssrt_timing::{EventSource, Listener, Race, RaceOutcome, RaceStep, Timer};

use crate::config::ExperimentConfig;
use crate::plan::BlockPlan;
use crate::state::ExperimentSession;
use crate::submit::ResultSink;

const STOP_CUE_ALARM: usize = 0;

/// Signals that cut a block short. Ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Interrupt {
    Skip,
    Abort,
}

impl Interrupt {
    pub fn from_control(input: ControlInput) -> Option<Self> {
        match input {
            ControlInput::Skip => Some(Self::Skip),
            ControlInput::Abort => Some(Self::Abort),
            ControlInput::Continue => None,
        }
    }
}

impl From<Interrupt> for ControlInput {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Skip => ControlInput::Skip,
            Interrupt::Abort => ControlInput::Abort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialExit {
    Completed(TrialOutcome),
    /// Abandoned before resolution; nothing was recorded.
    Interrupted(Interrupt),
}

enum TrialInput {
    Response(ResponseKey),
    Interrupt(Interrupt),
}

/// Score a resolved trial.
///
/// `response` is the accepted key and its latency from stimulus onset; it is
/// only present when the key arrived before the deadline.
pub fn score_trial(
    spec: &TrialSpec,
    correct_key: &ResponseKey,
    response: Option<(ResponseKey, Duration)>,
    ssd: Duration,
) -> TrialOutcome {
    let correct = match &response {
        None => spec.stop_trial,
        Some(_) if spec.stop_trial => false,
        Some((key, _)) => key == correct_key,
    };
    let (response_key, response_time_ms) = match response {
        Some((key, latency)) => (Some(key), Some(latency.as_millis() as u64)),
        None => (None, None),
    };
    TrialOutcome {
        task: spec.task,
        stimulus: spec.stimulus,
        stop_trial: spec.stop_trial,
        response_key,
        response_time_ms,
        correct,
        ssd_ms: ssd.as_millis() as u64,
    }
}

/// Display failures inside a trial or screen are logged and the session goes on.
pub(crate) fn show<D: Display>(display: &mut D, command: DisplayCommand) {
    if let Err(err) = display.apply(command) {
        tracing::warn!(error = %err, "display command failed");
    }
}

/// Highest-priority skip/abort among events queued before a listener opened.
pub(crate) fn stale_interrupt(config: &ExperimentConfig, stale: &[KeyEvent]) -> Option<Interrupt> {
    stale
        .iter()
        .filter_map(|event| config.controls.resolve(&config.keymap, event))
        .filter_map(Interrupt::from_control)
        .max()
}

impl<C, S, D, R, K> ExperimentSession<C, S, D, R, K>
where
    C: Timer,
    S: EventSource<Event = KeyEvent>,
    D: Display,
    R: Rng,
    K: ResultSink,
{
    /// Run trial `index` of `plan`.
    ///
    /// Scored blocks append the outcome to the result log; practice feeds the
    /// practice tally. The trial's listener is closed before the inter-trial
    /// wait starts.
    pub fn run_trial(&mut self, block: BlockKind, plan: &BlockPlan, index: usize) -> TrialExit {
        let task = block.task_variant();
        let mapping = self.config.registry.task(task);
        let Some(binding) = mapping.choose(&mut self.rng).cloned() else {
            tracing::error!(%task, "task has no stimuli");
            return TrialExit::Interrupted(Interrupt::Abort);
        };
        let spec = TrialSpec {
            task,
            stimulus: binding.kind,
            stop_trial: plan.is_stop(index),
        };
        let (correct_key, candidates) = if block.is_scored() {
            (binding.key.clone(), mapping.response_keys())
        } else {
            let key = self.config.practice_key.clone();
            (key.clone(), vec![key])
        };
        let ssd = self.staircase.current();
        let go_deadline = self.config.go_deadline(block);
        let stop_symbol = self.config.registry.stop_symbol.clone();

        let mut listener = Listener::open(&mut self.input);
        if let Some(interrupt) = stale_interrupt(&self.config, listener.stale()) {
            tracing::debug!(trial = index, ?interrupt, "interrupt queued before trial start");
            return TrialExit::Interrupted(interrupt);
        }

        show(
            &mut self.display,
            DisplayCommand::SetStimulus {
                glyph: binding.symbol.clone(),
                style: StimulusStyle::Normal,
            },
        );
        self.trial_state = TrialState::StimulusShown;
        let start = self.timer.now();
        let mut race = Race::new(&self.timer, start + go_deadline);
        if spec.stop_trial {
            race = race.with_alarm(STOP_CUE_ALARM, start + ssd);
        }
        self.trial_state = TrialState::AwaitingResponse;

        let keymap = &self.config.keymap;
        let controls = &self.config.controls;
        let mut cue_shown = false;
        let settled = loop {
            let step = race.poll(&mut listener, |event: KeyEvent| {
                if let Some(interrupt) = controls
                    .resolve(keymap, &event)
                    .and_then(Interrupt::from_control)
                {
                    return Some(TrialInput::Interrupt(interrupt));
                }
                keymap.resolve(&event, &candidates).map(TrialInput::Response)
            });
            match step {
                RaceStep::Alarm(STOP_CUE_ALARM) => {
                    show(
                        &mut self.display,
                        DisplayCommand::SetStimulus {
                            glyph: stop_symbol.clone(),
                            style: StimulusStyle::StopCue,
                        },
                    );
                    cue_shown = true;
                }
                RaceStep::Alarm(_) => {}
                RaceStep::Settled(outcome) => break outcome,
            }
        };
        drop(listener);

        let response = match settled {
            RaceOutcome::Responded {
                value: TrialInput::Response(key),
                at,
            } => Some((key, at.saturating_sub(start))),
            RaceOutcome::TimedOut => None,
            RaceOutcome::Responded {
                value: TrialInput::Interrupt(interrupt),
                ..
            } => return self.abandon_trial(index, interrupt),
            RaceOutcome::Closed => return self.abandon_trial(index, Interrupt::Abort),
        };
        self.trial_state = TrialState::Resolved;

        let outcome = score_trial(&spec, &correct_key, response, ssd);
        if spec.stop_trial {
            let next = self.staircase.record_stop(outcome.correct);
            if !cue_shown {
                show(
                    &mut self.display,
                    DisplayCommand::SetStimulus {
                        glyph: stop_symbol,
                        style: StimulusStyle::StopCue,
                    },
                );
            }
            self.timer.sleep(self.config.stop_cue_hold());
            tracing::debug!(
                trial = index,
                inhibited = outcome.correct,
                ssd_ms = outcome.ssd_ms,
                next_ssd_ms = next.as_millis() as u64,
                "stop trial resolved"
            );
        } else {
            tracing::debug!(
                trial = index,
                stimulus = ?spec.stimulus,
                latency_ms = ?outcome.response_time_ms,
                correct = outcome.correct,
                "go trial resolved"
            );
        }

        if block.is_scored() {
            self.results.append(outcome.clone());
        } else {
            self.practice.record(&outcome);
        }

        show(&mut self.display, DisplayCommand::ClearStimulus);
        self.trial_state = TrialState::InterTrialWait;
        let iti = self
            .rng
            .random_range(self.config.iti_ms.min..=self.config.iti_ms.max);
        self.timer.sleep(Duration::from_millis(iti));
        self.trial_state = TrialState::Idle;
        TrialExit::Completed(outcome)
    }

    fn abandon_trial(&mut self, index: usize, interrupt: Interrupt) -> TrialExit {
        tracing::debug!(trial = index, ?interrupt, "trial abandoned");
        show(&mut self.display, DisplayCommand::ClearStimulus);
        self.trial_state = TrialState::Idle;
        TrialExit::Interrupted(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::MemorySink;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ssrt_core::{RecordingDisplay, StimulusKind, TaskVariant};
    use ssrt_timing::{ChannelSource, ManualClock, ScriptedSource};

    type TestSession =
        ExperimentSession<ManualClock, ScriptedSource<KeyEvent>, RecordingDisplay, StdRng, MemorySink>;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn key(name: &str) -> KeyEvent {
        match name {
            "f8" => KeyEvent::new("F8", "F8"),
            "escape" => KeyEvent::new("Escape", "Escape"),
            "space" => KeyEvent::new(" ", "Space"),
            letter => KeyEvent::new(letter, format!("Key{}", letter.to_uppercase())),
        }
    }

    fn session(config: ExperimentConfig, scripts: Vec<Vec<(u64, &str)>>, seed: u64) -> TestSession {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        for script in scripts {
            source.push(script.into_iter().map(|(at, k)| (ms(at), key(k))).collect());
        }
        ExperimentSession::new(
            config,
            clock,
            source,
            RecordingDisplay::new(),
            StdRng::seed_from_u64(seed),
            MemorySink::new(),
        )
    }

    fn go_plan() -> BlockPlan {
        BlockPlan::with_stop_count(1, 0, &mut StdRng::seed_from_u64(0))
    }

    fn stop_plan() -> BlockPlan {
        BlockPlan::with_stop_count(1, 1, &mut StdRng::seed_from_u64(0))
    }

    fn single_circle_config() -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.registry.simple.stimuli.retain(|s| s.kind == StimulusKind::Circle);
        config.go_deadline_ms.simple = 700;
        config
    }

    fn completed(exit: TrialExit) -> TrialOutcome {
        match exit {
            TrialExit::Completed(outcome) => outcome,
            other => panic!("trial did not complete: {other:?}"),
        }
    }

    #[test]
    fn correct_go_response_before_deadline() {
        let mut s = session(single_circle_config(), vec![vec![(650, "s")]], 1);
        let outcome = completed(s.run_trial(BlockKind::Simple, &go_plan(), 0));
        assert!(outcome.correct);
        assert_eq!(outcome.response_time_ms, Some(650));
        assert_eq!(outcome.response_key, Some(ResponseKey::new("s")));
        assert_eq!(outcome.task, TaskVariant::Simple);
        assert_eq!(s.results.len(), 1);
        assert_eq!(s.trial_state, TrialState::Idle);
        assert_eq!(s.input.active_listeners(), 0);
    }

    #[test]
    fn hebrew_layout_press_counts_for_bound_key() {
        let mut s = session(single_circle_config(), vec![vec![]], 1);
        s.input = ScriptedSource::new(s.timer.clone()).then(vec![(ms(300), KeyEvent::new("ד", "KeyS"))]);
        let outcome = completed(s.run_trial(BlockKind::Simple, &go_plan(), 0));
        assert!(outcome.correct);
    }

    #[test]
    fn wrong_task_key_is_recorded_as_error() {
        let mut config = ExperimentConfig::default();
        config
            .registry
            .complex
            .stimuli
            .retain(|b| matches!(b.kind, StimulusKind::Triangle | StimulusKind::Square));
        let mut s = session(config, vec![vec![(400, "a")]], 2);
        let outcome = completed(s.run_trial(BlockKind::Complex, &go_plan(), 0));
        assert_eq!(outcome.correct, outcome.stimulus == StimulusKind::Square);
        assert_eq!(outcome.response_time_ms, Some(400));
        assert_eq!(outcome.response_key, Some(ResponseKey::new("a")));
    }

    #[test]
    fn unbound_keys_are_ignored_until_timeout() {
        let mut s = session(single_circle_config(), vec![vec![(100, "q"), (200, "l")]], 3);
        let outcome = completed(s.run_trial(BlockKind::Simple, &go_plan(), 0));
        assert!(!outcome.correct);
        assert_eq!(outcome.response_time_ms, None);
    }

    #[test]
    fn successful_stop_shows_cue_and_raises_ssd() {
        let mut s = session(ExperimentConfig::default(), vec![vec![]], 4);
        let outcome = completed(s.run_trial(BlockKind::Simple, &stop_plan(), 0));
        assert!(outcome.correct);
        assert_eq!(outcome.ssd_ms, 500);
        assert_eq!(s.staircase.current(), ms(550));
        let stimuli: Vec<_> = s.display.stimuli().collect();
        assert_eq!(stimuli.len(), 2);
        assert_eq!(stimuli[1], ("X", StimulusStyle::StopCue));
        assert_eq!(s.display.commands.last(), Some(&DisplayCommand::ClearStimulus));
    }

    #[test]
    fn failed_stop_lowers_ssd() {
        let mut s = session(ExperimentConfig::default(), vec![vec![(600, "s")]], 5);
        let outcome = completed(s.run_trial(BlockKind::Simple, &stop_plan(), 0));
        assert!(!outcome.correct);
        assert_eq!(outcome.response_time_ms, Some(600));
        assert_eq!(s.staircase.current(), ms(450));
        assert_eq!(s.display.stimuli().filter(|(_, st)| *st == StimulusStyle::StopCue).count(), 1);
    }

    #[test]
    fn response_before_ssd_still_shows_cue_for_hold() {
        let mut s = session(ExperimentConfig::default(), vec![vec![(200, "k")]], 6);
        let before = s.timer.now();
        let outcome = completed(s.run_trial(BlockKind::Simple, &stop_plan(), 0));
        assert!(!outcome.correct);
        assert_eq!(s.display.stimuli().filter(|(_, st)| *st == StimulusStyle::StopCue).count(), 1);
        // response at 200, cue held 200, iti at least 1000
        assert!(s.timer.now() - before >= ms(1_400));
    }

    #[test]
    fn go_trials_leave_ssd_alone() {
        let mut s = session(ExperimentConfig::default(), vec![vec![(300, "s")], vec![]], 7);
        s.run_trial(BlockKind::Simple, &go_plan(), 0);
        s.run_trial(BlockKind::Simple, &go_plan(), 0);
        assert_eq!(s.staircase.current(), ms(500));
    }

    #[test]
    fn skip_mid_trial_records_nothing() {
        let mut s = session(ExperimentConfig::default(), vec![vec![(100, "f8")]], 8);
        assert_eq!(
            s.run_trial(BlockKind::Complex, &stop_plan(), 0),
            TrialExit::Interrupted(Interrupt::Skip)
        );
        assert!(s.results.is_empty());
        assert_eq!(s.staircase.current(), ms(500));
        assert_eq!(s.display.commands.last(), Some(&DisplayCommand::ClearStimulus));
    }

    #[test]
    fn closed_input_aborts_trial() {
        let (tx, rx) = std::sync::mpsc::channel::<KeyEvent>();
        drop(tx);
        let mut s = ExperimentSession::new(
            ExperimentConfig::default(),
            ManualClock::new(),
            ChannelSource::new(rx),
            RecordingDisplay::new(),
            StdRng::seed_from_u64(9),
            MemorySink::new(),
        );
        assert_eq!(
            s.run_trial(BlockKind::Simple, &go_plan(), 0),
            TrialExit::Interrupted(Interrupt::Abort)
        );
        assert!(s.results.is_empty());
        assert!(!s.input.is_subscribed());
    }

    #[test]
    fn practice_uses_universal_key_and_skips_log() {
        let mut s = session(ExperimentConfig::default(), vec![vec![(350, "space")]], 10);
        let outcome = completed(s.run_trial(BlockKind::Practice, &go_plan(), 0));
        assert!(outcome.correct);
        assert!(s.results.is_empty());
        assert_eq!(s.practice.go_correct, 1);
    }

    #[test]
    fn scoring_rules() {
        let go = TrialSpec {
            task: TaskVariant::Simple,
            stimulus: StimulusKind::Arrow,
            stop_trial: false,
        };
        let stop = TrialSpec { stop_trial: true, ..go };
        let k = ResponseKey::new("k");
        let s = ResponseKey::new("s");
        let ssd = ms(500);

        assert!(score_trial(&go, &k, Some((k.clone(), ms(650))), ssd).correct);
        assert!(!score_trial(&go, &k, Some((s.clone(), ms(650))), ssd).correct);
        assert!(!score_trial(&go, &k, None, ssd).correct);
        assert!(score_trial(&stop, &k, None, ssd).correct);
        let failed = score_trial(&stop, &k, Some((k.clone(), ms(610))), ssd);
        assert!(!failed.correct);
        assert_eq!(failed.response_time_ms, Some(610));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn go_correct_iff_bound_key_before_deadline(
            pressed in prop::sample::select(vec!["s", "k", "a"]),
            at in 0u64..1_400,
            seed: u64,
        ) {
            let mut config = ExperimentConfig::default();
            config.go_deadline_ms.simple = 700;
            let mut s = session(config, vec![vec![(at, pressed)]], seed);
            let outcome = completed(s.run_trial(BlockKind::Simple, &go_plan(), 0));
            let bound = s.config.registry.simple.correct_key(outcome.stimulus).cloned();
            let in_time = at < 700;
            let is_candidate = pressed != "a";
            prop_assert_eq!(outcome.correct, in_time && bound == Some(ResponseKey::new(pressed)));
            let expected_rt = (in_time && is_candidate).then_some(at);
            prop_assert_eq!(outcome.response_time_ms, expected_rt);
            prop_assert_eq!(s.input.peak_listeners(), 1);
        }
    }
}
