use rand::Rng;
use ssrt_core::demographic::unix_millis;
use ssrt_core::{
    BlockKind, ControlInput, DemographicRecord, Display, DisplayCommand, KeyEvent, Phase,
    SessionPhase, TrialState,
};
use ssrt_timing::{await_accepted, EventSource, Listener, Timer};

use crate::config::ExperimentConfig;
use crate::plan::BlockPlan;
use crate::practice::PracticeTally;
use crate::results::{ResultLog, SessionResult};
use crate::staircase::Staircase;
use crate::submit::{submit, RecordId, ResultSink};
use crate::summary::SessionSummary;
use crate::trial::{show, stale_interrupt, Interrupt, TrialExit};

/// How a block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    Finished,
    Skipped,
    Aborted,
}

/// How the session ended before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    /// Skip during the final block.
    Skipped,
    Aborted,
    /// The display could not be prepared.
    SetupFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub end: SessionEnd,
    /// Scored trials handed to the sink.
    pub trials: usize,
    pub record_id: Option<RecordId>,
    pub summary: SessionSummary,
}

/// Session state, passed by `&mut` through every phase, block and trial.
pub struct ExperimentSession<C, S, D, R, K>
where
    C: Timer,
    S: EventSource<Event = KeyEvent>,
    D: Display,
    R: Rng,
    K: ResultSink,
{
    pub config: ExperimentConfig,
    pub timer: C,
    pub input: S,
    pub display: D,
    pub rng: R,
    pub sink: K,
    pub phase: SessionPhase,
    pub trial_state: TrialState,
    pub staircase: Staircase,
    pub results: ResultLog,
    pub practice: PracticeTally,
    pub participant_id: String,
    pub demographic: Option<DemographicRecord>,
}

impl<C, S, D, R, K> ExperimentSession<C, S, D, R, K>
where
    C: Timer,
    S: EventSource<Event = KeyEvent>,
    D: Display,
    R: Rng,
    K: ResultSink,
{
    pub fn new(config: ExperimentConfig, timer: C, input: S, display: D, rng: R, sink: K) -> Self {
        let staircase = Staircase::new(&config.ssd);
        Self {
            config,
            timer,
            input,
            display,
            rng,
            sink,
            phase: SessionPhase::default(),
            trial_state: TrialState::default(),
            staircase,
            results: ResultLog::new(),
            practice: PracticeTally::default(),
            participant_id: unix_millis().to_string(),
            demographic: None,
        }
    }

    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = participant_id.into();
        self
    }

    pub fn with_demographic(mut self, demographic: DemographicRecord) -> Self {
        self.demographic = Some(demographic);
        self
    }

    pub fn advance_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            tracing::info!(from = ?self.phase, to = ?next, "phase transition");
            self.phase = next;
            true
        } else {
            false
        }
    }

    /// Runs the whole session and submits whatever was recorded.
    pub fn run(&mut self) -> SessionReport {
        let end = self.drive();
        self.finish(end)
    }

    fn drive(&mut self) -> SessionEnd {
        if let Err(err) = self.config.validate() {
            tracing::error!(error = %err, "invalid experiment configuration; ending session");
            return SessionEnd::SetupFailed;
        }
        if let Err(err) = self.display.ensure_ready() {
            tracing::error!(error = %err, "display setup failed; ending session");
            return SessionEnd::SetupFailed;
        }
        if self.config.collect_demographics && self.demographic.is_none() {
            tracing::warn!("demographic collection enabled but no record was provided");
        }

        loop {
            let phase = self.phase;
            if let Some(block) = phase.block() {
                if let Some(end) = self.run_block_phase(block) {
                    return end;
                }
            } else if phase.awaits_continue() {
                if let Some(text) = self.screen_text(phase) {
                    if self.show_screen(&text) == ControlInput::Abort {
                        return SessionEnd::Aborted;
                    }
                }
            } else if phase == SessionPhase::Completed {
                let text = self.config.instructions.completed.clone();
                show(&mut self.display, DisplayCommand::ShowInstructions(text));
                self.timer.sleep(self.config.completion_pause());
                return SessionEnd::Completed;
            }
            if phase.is_terminal() {
                return SessionEnd::Completed;
            }
            self.advance_phase();
        }
    }

    /// Text for a standalone screen phase; `None` when the phase is disabled.
    fn screen_text(&self, phase: SessionPhase) -> Option<String> {
        let instructions = &self.config.instructions;
        match phase {
            SessionPhase::Welcome => Some(instructions.welcome.clone()),
            SessionPhase::Consent if self.config.show_consent => Some(instructions.consent.clone()),
            SessionPhase::Break => Some(instructions.break_screen.clone()),
            _ => None,
        }
    }

    /// Intro screen, trials, and for practice the feedback screen.
    /// Returns `Some` when the session has to end.
    fn run_block_phase(&mut self, block: BlockKind) -> Option<SessionEnd> {
        let intro = match block {
            BlockKind::Practice => &self.config.instructions.practice,
            BlockKind::Simple => &self.config.instructions.simple_task,
            BlockKind::Complex => &self.config.instructions.complex_task,
        }
        .clone();

        let exit = match self.show_screen(&intro) {
            ControlInput::Abort => BlockExit::Aborted,
            ControlInput::Skip => {
                tracing::info!(%block, "block skipped before its first trial");
                BlockExit::Skipped
            }
            ControlInput::Continue => self.run_block(block),
        };

        match exit {
            BlockExit::Aborted => Some(SessionEnd::Aborted),
            BlockExit::Skipped if block == BlockKind::Complex => Some(SessionEnd::Skipped),
            BlockExit::Skipped => None,
            BlockExit::Finished if block == BlockKind::Practice && self.config.practice_feedback => {
                let text = self.config.instructions.practice_feedback_text(&self.practice);
                (self.show_screen(&text) == ControlInput::Abort).then_some(SessionEnd::Aborted)
            }
            BlockExit::Finished => None,
        }
    }

    /// Runs every trial of a fresh plan for `block`, starting from the initial SSD.
    pub fn run_block(&mut self, block: BlockKind) -> BlockExit {
        let plan = match block {
            BlockKind::Practice => BlockPlan::with_stop_count(
                self.config.practice_trials,
                self.config.practice_stop_trials,
                &mut self.rng,
            ),
            BlockKind::Simple | BlockKind::Complex => BlockPlan::generate(
                self.config.trials_per_block,
                self.config.stop_ratio,
                &mut self.rng,
            ),
        };
        self.staircase.reset();

        let span = tracing::info_span!("block", %block, trials = plan.len(), stops = plan.stop_count());
        let _enter = span.enter();
        tracing::info!(ssd_ms = self.staircase.current().as_millis() as u64, "block started");

        let reminder = if block.is_scored() {
            self.config.registry.task(block.task_variant()).reminder.clone()
        } else {
            self.config.instructions.practice_reminder.clone()
        };
        show(&mut self.display, DisplayCommand::ShowKeyReminder(reminder));

        let mut exit = BlockExit::Finished;
        let mut completed = 0;
        for index in 0..plan.len() {
            match self.run_trial(block, &plan, index) {
                TrialExit::Completed(_) => completed += 1,
                TrialExit::Interrupted(Interrupt::Skip) => {
                    tracing::info!(completed, remaining = plan.len() - index, "block skipped");
                    exit = BlockExit::Skipped;
                    break;
                }
                TrialExit::Interrupted(Interrupt::Abort) => {
                    tracing::info!(completed, "session aborted during block");
                    exit = BlockExit::Aborted;
                    break;
                }
            }
        }

        show(&mut self.display, DisplayCommand::HideKeyReminder);
        if exit == BlockExit::Finished {
            tracing::info!(completed, ssd_ms = self.staircase.current().as_millis() as u64, "block finished");
        }
        exit
    }

    /// Shows `text` and waits for a control input. A closed input source
    /// reads as abort.
    pub fn show_screen(&mut self, text: &str) -> ControlInput {
        show(&mut self.display, DisplayCommand::ShowInstructions(text.to_string()));
        let input = {
            let mut listener = Listener::open(&mut self.input);
            match stale_interrupt(&self.config, listener.stale()) {
                Some(interrupt) => interrupt.into(),
                None => {
                    let keymap = &self.config.keymap;
                    let controls = &self.config.controls;
                    await_accepted(&mut listener, |event: KeyEvent| controls.resolve(keymap, &event))
                        .unwrap_or_else(|| {
                            tracing::info!("input closed while waiting on screen");
                            ControlInput::Abort
                        })
                }
            }
        };
        show(&mut self.display, DisplayCommand::HideInstructions);
        tracing::debug!(phase = ?self.phase, ?input, "screen dismissed");
        input
    }

    fn finish(&mut self, end: SessionEnd) -> SessionReport {
        if end != SessionEnd::Completed {
            let text = self.config.instructions.ended.clone();
            show(&mut self.display, DisplayCommand::ShowInstructions(text));
        }
        self.phase = SessionPhase::Submitted;
        self.trial_state = TrialState::Idle;
        tracing::info!(?end, trials = self.results.len(), "session ended");

        let result = SessionResult::new(
            self.participant_id.clone(),
            self.demographic.clone(),
            std::mem::take(&mut self.results),
        );
        let summary = SessionSummary::from_outcomes(&result.results);
        summary.log();
        let record_id = submit(&mut self.sink, &result);
        SessionReport {
            end,
            trials: result.results.len(),
            record_id,
            summary,
        }
    }
}
