use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::ResponseKey;
use crate::stimulus::{StimulusKind, TaskVariant};

/// Trial engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Idle,
    StimulusShown,
    AwaitingResponse,
    Resolved,
    InterTrialWait,
}

/// Which run of trials a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Practice,
    Simple,
    Complex,
}

impl BlockKind {
    /// Practice draws from the simple task's symbols.
    pub fn task_variant(&self) -> TaskVariant {
        match self {
            Self::Practice | Self::Simple => TaskVariant::Simple,
            Self::Complex => TaskVariant::Complex,
        }
    }

    /// Scored blocks append to the result log; practice only feeds tallies.
    pub fn is_scored(&self) -> bool {
        !matches!(self, Self::Practice)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Practice => "practice",
            Self::Simple => "simple",
            Self::Complex => "complex",
        })
    }
}

/// What a trial presents; fixed once the trial starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialSpec {
    pub task: TaskVariant,
    pub stimulus: StimulusKind,
    pub stop_trial: bool,
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    #[serde(rename = "taskType")]
    pub task: TaskVariant,
    #[serde(rename = "stimulusType")]
    pub stimulus: StimulusKind,
    #[serde(rename = "stopTrial")]
    pub stop_trial: bool,
    #[serde(rename = "responseKey", default)]
    pub response_key: Option<ResponseKey>,
    #[serde(rename = "responseTime")]
    pub response_time_ms: Option<u64>,
    pub correct: bool,
    /// Stop-signal delay in effect while the trial ran.
    #[serde(rename = "ssd")]
    pub ssd_ms: u64,
}

impl TrialOutcome {
    pub fn latency(&self) -> Option<Duration> {
        self.response_time_ms.map(Duration::from_millis)
    }

    pub fn responded(&self) -> bool {
        self.response_time_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_document_field_names() {
        let outcome = TrialOutcome {
            task: TaskVariant::Simple,
            stimulus: StimulusKind::Circle,
            stop_trial: false,
            response_key: Some(ResponseKey::new("s")),
            response_time_ms: Some(412),
            correct: true,
            ssd_ms: 500,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["taskType"], "simple");
        assert_eq!(json["stimulusType"], "circle");
        assert_eq!(json["stopTrial"], false);
        assert_eq!(json["responseKey"], "s");
        assert_eq!(json["responseTime"], 412);
        assert_eq!(json["correct"], true);
        assert_eq!(json["ssd"], 500);
    }

    #[test]
    fn missed_response_serializes_as_null() {
        let outcome = TrialOutcome {
            task: TaskVariant::Complex,
            stimulus: StimulusKind::Star,
            stop_trial: true,
            response_key: None,
            response_time_ms: None,
            correct: true,
            ssd_ms: 650,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["responseTime"].is_null());
        assert_eq!(outcome.latency(), None);
        assert!(!outcome.responded());
    }

    #[test]
    fn practice_uses_simple_symbols_and_is_unscored() {
        assert_eq!(BlockKind::Practice.task_variant(), TaskVariant::Simple);
        assert!(!BlockKind::Practice.is_scored());
        assert!(BlockKind::Complex.is_scored());
    }
}
