use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::{KeyMap, ResponseKey};

/// Task variants run as scored blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVariant {
    Simple,
    Complex,
}

impl std::fmt::Display for TaskVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Circle,
    Arrow,
    Triangle,
    Square,
    Hash,
    Star,
}

/// One stimulus of a task: what is shown and which key is the correct go response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusBinding {
    pub kind: StimulusKind,
    pub symbol: String,
    pub key: ResponseKey,
}

impl StimulusBinding {
    pub fn new(kind: StimulusKind, symbol: &str, key: &str) -> Self {
        Self {
            kind,
            symbol: symbol.to_string(),
            key: ResponseKey::new(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMapping {
    pub stimuli: Vec<StimulusBinding>,
    /// Legend shown while the task runs.
    pub reminder: String,
}

impl TaskMapping {
    pub fn binding(&self, kind: StimulusKind) -> Option<&StimulusBinding> {
        self.stimuli.iter().find(|s| s.kind == kind)
    }

    pub fn symbol(&self, kind: StimulusKind) -> Option<&str> {
        self.binding(kind).map(|s| s.symbol.as_str())
    }

    pub fn correct_key(&self, kind: StimulusKind) -> Option<&ResponseKey> {
        self.binding(kind).map(|s| &s.key)
    }

    /// Every key bound to some stimulus of this task, without duplicates.
    pub fn response_keys(&self) -> Vec<ResponseKey> {
        let mut keys: Vec<ResponseKey> = Vec::with_capacity(self.stimuli.len());
        for s in &self.stimuli {
            if !keys.contains(&s.key) {
                keys.push(s.key.clone());
            }
        }
        keys
    }

    /// Uniform draw over the task's stimulus set.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&StimulusBinding> {
        self.stimuli.choose(rng)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task `{0}` has no stimuli")]
    EmptyTask(TaskVariant),
    #[error("task `{task}` lists stimulus {kind:?} more than once")]
    DuplicateKind { task: TaskVariant, kind: StimulusKind },
    #[error("task `{task}` binds {kind:?} to key `{key}` which has no key-map entry")]
    UnboundKey {
        task: TaskVariant,
        kind: StimulusKind,
        key: ResponseKey,
    },
    #[error("stop symbol is empty")]
    EmptyStopSymbol,
}

/// Task variant lookup: symbols and correct-key bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusRegistry {
    pub simple: TaskMapping,
    pub complex: TaskMapping,
    /// Glyph that replaces the stimulus when the stop cue fires.
    pub stop_symbol: String,
}

impl Default for StimulusRegistry {
    fn default() -> Self {
        use StimulusKind::*;
        Self {
            simple: TaskMapping {
                stimuli: vec![
                    StimulusBinding::new(Circle, "⬤", "s"),
                    StimulusBinding::new(Arrow, "↑", "k"),
                ],
                reminder: " ⬤ - S |  ↑ - K".to_string(),
            },
            complex: TaskMapping {
                stimuli: vec![
                    StimulusBinding::new(Triangle, "▲", "s"),
                    StimulusBinding::new(Square, "■", "a"),
                    StimulusBinding::new(Hash, "#", "k"),
                    StimulusBinding::new(Star, "★", "l"),
                ],
                reminder: " ▲ - S |  ■ - A | # - K | ★ - L".to_string(),
            },
            stop_symbol: "X".to_string(),
        }
    }
}

impl StimulusRegistry {
    pub fn task(&self, variant: TaskVariant) -> &TaskMapping {
        match variant {
            TaskVariant::Simple => &self.simple,
            TaskVariant::Complex => &self.complex,
        }
    }

    /// Checks every task is non-empty, kinds are unique, and every bound key
    /// can be produced through `keymap`.
    pub fn validate(&self, keymap: &KeyMap) -> Result<(), RegistryError> {
        if self.stop_symbol.is_empty() {
            return Err(RegistryError::EmptyStopSymbol);
        }
        for task in [TaskVariant::Simple, TaskVariant::Complex] {
            let mapping = self.task(task);
            if mapping.stimuli.is_empty() {
                return Err(RegistryError::EmptyTask(task));
            }
            for (i, s) in mapping.stimuli.iter().enumerate() {
                if mapping.stimuli[..i].iter().any(|prev| prev.kind == s.kind) {
                    return Err(RegistryError::DuplicateKind { task, kind: s.kind });
                }
                if !keymap.contains(&s.key) {
                    return Err(RegistryError::UnboundKey {
                        task,
                        kind: s.kind,
                        key: s.key.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_registry_validates_against_default_keymap() {
        let registry = StimulusRegistry::default();
        assert_eq!(registry.validate(&KeyMap::default()), Ok(()));
    }

    #[test]
    fn default_bindings() {
        let registry = StimulusRegistry::default();
        let simple = registry.task(TaskVariant::Simple);
        assert_eq!(simple.correct_key(StimulusKind::Circle), Some(&ResponseKey::new("s")));
        assert_eq!(simple.correct_key(StimulusKind::Arrow), Some(&ResponseKey::new("k")));
        assert_eq!(simple.correct_key(StimulusKind::Star), None);

        let complex = registry.task(TaskVariant::Complex);
        assert_eq!(complex.symbol(StimulusKind::Hash), Some("#"));
        assert_eq!(complex.response_keys().len(), 4);
    }

    #[test]
    fn unbound_key_is_rejected() {
        let mut registry = StimulusRegistry::default();
        registry.complex.stimuli[0].key = ResponseKey::new("q");
        assert_eq!(
            registry.validate(&KeyMap::default()),
            Err(RegistryError::UnboundKey {
                task: TaskVariant::Complex,
                kind: StimulusKind::Triangle,
                key: ResponseKey::new("q"),
            })
        );
    }

    #[test]
    fn duplicate_and_empty_tasks_are_rejected() {
        let mut registry = StimulusRegistry::default();
        registry.simple.stimuli.push(StimulusBinding::new(StimulusKind::Circle, "o", "k"));
        assert!(matches!(
            registry.validate(&KeyMap::default()),
            Err(RegistryError::DuplicateKind { .. })
        ));

        registry.simple.stimuli.clear();
        assert_eq!(
            registry.validate(&KeyMap::default()),
            Err(RegistryError::EmptyTask(TaskVariant::Simple))
        );
    }

    #[test]
    fn choose_draws_every_kind() {
        let registry = StimulusRegistry::default();
        let complex = registry.task(TaskVariant::Complex);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(complex.choose(&mut rng).map(|s| s.kind));
        }
        assert_eq!(seen.len(), 4);
    }
}
