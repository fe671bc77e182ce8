use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ssrt_core::{BlockKind, ControlBindings, KeyMap, ResponseKey, StimulusRegistry};

use crate::error::ConfigError;
use crate::instructions::Instructions;

/// Stop-signal delay staircase bounds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsdConfig {
    pub initial_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub step_ms: u64,
}

impl Default for SsdConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            min_ms: 100,
            max_ms: 1000,
            step_ms: 50,
        }
    }
}

/// Response window per block kind, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    pub simple: u64,
    pub complex: u64,
    pub practice: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            simple: 1500,
            complex: 1500,
            practice: 1500,
        }
    }
}

/// Inclusive millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub ssd: SsdConfig,
    pub go_deadline_ms: DeadlineConfig,
    /// How long the stop cue stays up after a stop trial resolves.
    pub stop_cue_hold_ms: u64,
    pub iti_ms: IntervalRange,
    pub trials_per_block: usize,
    pub stop_ratio: f64,
    pub practice_trials: usize,
    pub practice_stop_trials: usize,
    pub completion_pause_ms: u64,
    pub show_consent: bool,
    pub practice_feedback: bool,
    pub collect_demographics: bool,
    /// Single key accepted as a go response during practice.
    pub practice_key: ResponseKey,
    pub registry: StimulusRegistry,
    pub keymap: KeyMap,
    pub controls: ControlBindings,
    pub instructions: Instructions,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            ssd: SsdConfig::default(),
            go_deadline_ms: DeadlineConfig::default(),
            stop_cue_hold_ms: 200,
            iti_ms: IntervalRange {
                min: 1000,
                max: 2000,
            },
            trials_per_block: 100,
            stop_ratio: 0.25,
            practice_trials: 10,
            practice_stop_trials: 3,
            completion_pause_ms: 2000,
            show_consent: false,
            practice_feedback: true,
            collect_demographics: false,
            practice_key: ResponseKey::new("space"),
            registry: StimulusRegistry::default(),
            keymap: KeyMap::default(),
            controls: ControlBindings::default(),
            instructions: Instructions::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssd = &self.ssd;
        if ssd.min_ms > ssd.max_ms {
            return invalid(format!(
                "ssd.min_ms ({}) exceeds ssd.max_ms ({})",
                ssd.min_ms, ssd.max_ms
            ));
        }
        if !(ssd.min_ms..=ssd.max_ms).contains(&ssd.initial_ms) {
            return invalid(format!(
                "ssd.initial_ms ({}) outside [{}, {}]",
                ssd.initial_ms, ssd.min_ms, ssd.max_ms
            ));
        }
        if ssd.step_ms == 0 {
            return invalid("ssd.step_ms must be positive".into());
        }
        let deadlines = &self.go_deadline_ms;
        if deadlines.simple == 0 || deadlines.complex == 0 || deadlines.practice == 0 {
            return invalid("go deadlines must be positive".into());
        }
        if self.iti_ms.min > self.iti_ms.max {
            return invalid(format!(
                "iti_ms.min ({}) exceeds iti_ms.max ({})",
                self.iti_ms.min, self.iti_ms.max
            ));
        }
        if self.trials_per_block == 0 {
            return invalid("trials_per_block must be positive".into());
        }
        if !self.stop_ratio.is_finite() || !(0.0..=1.0).contains(&self.stop_ratio) {
            return invalid(format!("stop_ratio ({}) outside [0, 1]", self.stop_ratio));
        }
        if self.practice_stop_trials > self.practice_trials {
            return invalid(format!(
                "practice_stop_trials ({}) exceeds practice_trials ({})",
                self.practice_stop_trials, self.practice_trials
            ));
        }
        for key in std::iter::once(&self.practice_key).chain(self.controls.keys()) {
            if !self.keymap.contains(key) {
                return invalid(format!("key `{key}` has no key-map binding"));
            }
        }
        self.registry.validate(&self.keymap)?;
        Ok(())
    }

    pub fn go_deadline(&self, block: BlockKind) -> Duration {
        Duration::from_millis(match block {
            BlockKind::Practice => self.go_deadline_ms.practice,
            BlockKind::Simple => self.go_deadline_ms.simple,
            BlockKind::Complex => self.go_deadline_ms.complex,
        })
    }

    pub fn stop_cue_hold(&self) -> Duration {
        Duration::from_millis(self.stop_cue_hold_ms)
    }

    pub fn completion_pause(&self) -> Duration {
        Duration::from_millis(self.completion_pause_ms)
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}
