use serde::Serialize;
use ssrt_core::{TaskVariant, TrialOutcome};

/// Per-task aggregates over the result log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task: TaskVariant,
    pub go_trials: usize,
    pub go_correct: usize,
    /// Fraction of go trials answered correctly in time.
    pub go_accuracy: f64,
    /// Mean latency of correct go responses.
    pub mean_go_rt_ms: Option<f64>,
    pub stop_trials: usize,
    pub stop_success: usize,
    pub stop_success_rate: f64,
    pub mean_ssd_ms: Option<f64>,
    /// Mean-method stop-signal reaction time: mean go RT minus mean SSD.
    pub ssrt_ms: Option<f64>,
}

impl TaskSummary {
    pub fn from_outcomes<'a>(
        task: TaskVariant,
        outcomes: impl IntoIterator<Item = &'a TrialOutcome>,
    ) -> Self {
        let mut go_trials = 0;
        let mut go_correct = 0;
        let mut go_rts = Vec::new();
        let mut stop_trials = 0;
        let mut stop_success = 0;
        let mut ssds = Vec::new();

        for outcome in outcomes.into_iter().filter(|o| o.task == task) {
            if outcome.stop_trial {
                stop_trials += 1;
                stop_success += usize::from(outcome.correct);
                ssds.push(outcome.ssd_ms as f64);
            } else {
                go_trials += 1;
                if outcome.correct {
                    go_correct += 1;
                    if let Some(rt) = outcome.response_time_ms {
                        go_rts.push(rt as f64);
                    }
                }
            }
        }

        let mean_go_rt_ms = mean(&go_rts);
        let mean_ssd_ms = mean(&ssds);
        Self {
            task,
            go_trials,
            go_correct,
            go_accuracy: ratio(go_correct, go_trials),
            mean_go_rt_ms,
            stop_trials,
            stop_success,
            stop_success_rate: ratio(stop_success, stop_trials),
            mean_ssd_ms,
            ssrt_ms: mean_go_rt_ms.zip(mean_ssd_ms).map(|(rt, ssd)| rt - ssd),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub trials: usize,
    pub tasks: Vec<TaskSummary>,
}

impl SessionSummary {
    /// Tasks with no recorded trials are left out.
    pub fn from_outcomes(outcomes: &[TrialOutcome]) -> Self {
        let tasks = [TaskVariant::Simple, TaskVariant::Complex]
            .into_iter()
            .map(|task| TaskSummary::from_outcomes(task, outcomes))
            .filter(|s| s.go_trials + s.stop_trials > 0)
            .collect();
        Self {
            trials: outcomes.len(),
            tasks,
        }
    }

    pub fn task(&self, task: TaskVariant) -> Option<&TaskSummary> {
        self.tasks.iter().find(|s| s.task == task)
    }

    pub fn log(&self) {
        tracing::info!(trials = self.trials, "session summary");
        for s in &self.tasks {
            tracing::info!(
                task = %s.task,
                go_trials = s.go_trials,
                go_accuracy = format_args!("{:.2}", s.go_accuracy),
                mean_go_rt_ms = ?s.mean_go_rt_ms,
                stop_trials = s.stop_trials,
                stop_success_rate = format_args!("{:.2}", s.stop_success_rate),
                mean_ssd_ms = ?s.mean_ssd_ms,
                ssrt_ms = ?s.ssrt_ms,
                "task summary"
            );
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}
