use serde::{Deserialize, Serialize};
use ssrt_core::{DemographicRecord, TrialOutcome};

/// Append-only, execution-ordered trial outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLog {
    entries: Vec<TrialOutcome>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, outcome: TrialOutcome) {
        self.entries.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TrialOutcome] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TrialOutcome> {
        self.entries.last()
    }

    pub fn into_entries(self) -> Vec<TrialOutcome> {
        self.entries
    }
}

/// Payload handed to the result sink once the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub participant_id: String,
    #[serde(default)]
    pub demographic: Option<DemographicRecord>,
    pub results: Vec<TrialOutcome>,
}

impl SessionResult {
    pub fn new(
        participant_id: impl Into<String>,
        demographic: Option<DemographicRecord>,
        log: ResultLog,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            demographic,
            results: log.into_entries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssrt_core::{Gender, Handedness, StimulusKind, TaskVariant};

    fn outcome(ssd_ms: u64) -> TrialOutcome {
        TrialOutcome {
            task: TaskVariant::Complex,
            stimulus: StimulusKind::Hash,
            stop_trial: false,
            response_key: None,
            response_time_ms: None,
            correct: false,
            ssd_ms,
        }
    }

    #[test]
    fn log_keeps_execution_order() {
        let mut log = ResultLog::new();
        for ssd in [500, 550, 600] {
            log.append(outcome(ssd));
        }
        let result = SessionResult::new("p-1", None, log);
        let order: Vec<u64> = result.results.iter().map(|o| o.ssd_ms).collect();
        assert_eq!(order, vec![500, 550, 600]);
    }

    #[test]
    fn payload_uses_document_field_names() {
        let demographic = DemographicRecord {
            age: 30,
            gender: Gender::Female,
            handedness: Handedness::Right,
            timestamp: 1,
        };
        let mut log = ResultLog::new();
        log.append(outcome(500));
        let json = serde_json::to_value(SessionResult::new("p-7", Some(demographic), log)).unwrap();
        assert_eq!(json["participantId"], "p-7");
        assert_eq!(json["demographic"]["age"], 30);
        assert_eq!(json["results"].as_array().map(Vec::len), Some(1));
    }
}
