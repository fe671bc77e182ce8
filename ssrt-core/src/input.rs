//! Raw key events and their mapping onto canonical response and control keys.
//!
//! Key events carry both the logical key value and the physical key code
//! (DOM `key` / `code` naming). A binding matches when either channel
//! matches, so a participant on a non-Latin layout pressing the physical
//! `S` key still produces the canonical `s` response.

use serde::{Deserialize, Serialize};

/// A raw key press as forwarded by the page/window collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Logical key value, e.g. `"s"`, `"ד"`, `" "`, `"Escape"`.
    pub key: String,
    /// Physical key code, e.g. `"KeyS"`, `"Space"`, `"Escape"`.
    pub code: String,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
        }
    }
}

/// Canonical name of an input the experiment cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseKey(String);

impl ResponseKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResponseKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Accepted raw representations of one canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: ResponseKey,
    /// Logical values, compared case-insensitively.
    #[serde(default)]
    pub values: Vec<String>,
    /// Physical codes, compared ASCII case-insensitively.
    #[serde(default)]
    pub codes: Vec<String>,
}

impl KeyBinding {
    pub fn new(key: &str, values: &[&str], codes: &[&str]) -> Self {
        Self {
            key: ResponseKey::new(key),
            values: values.iter().map(|v| v.to_string()).collect(),
            codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let value = event.key.to_lowercase();
        self.values.iter().any(|v| v.to_lowercase() == value)
            || self.codes.iter().any(|c| c.eq_ignore_ascii_case(&event.code))
    }
}

/// Declarative table from canonical keys to accepted raw inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    bindings: Vec<KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        // Hebrew-layout letters sit on the same physical keys as a/s/k/l.
        Self::new(vec![
            KeyBinding::new("s", &["s", "ד"], &["KeyS"]),
            KeyBinding::new("a", &["a", "ש"], &["KeyA"]),
            KeyBinding::new("k", &["k", "ל"], &["KeyK"]),
            KeyBinding::new("l", &["l", "ך"], &["KeyL"]),
            KeyBinding::new("space", &[" ", "Spacebar"], &["Space"]),
            KeyBinding::new("escape", &["Escape", "Esc"], &["Escape"]),
            KeyBinding::new("f8", &["F8"], &["F8"]),
        ])
    }
}

impl KeyMap {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    pub fn binding(&self, key: &ResponseKey) -> Option<&KeyBinding> {
        self.bindings.iter().find(|b| &b.key == key)
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        self.binding(key).is_some()
    }

    /// Resolve `event` to the first of `candidates` whose binding matches.
    pub fn resolve(&self, event: &KeyEvent, candidates: &[ResponseKey]) -> Option<ResponseKey> {
        candidates
            .iter()
            .find(|candidate| self.binding(candidate).is_some_and(|b| b.matches(event)))
            .cloned()
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }
}

/// Session-level signals that are not trial responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlInput {
    Continue,
    Skip,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBindings {
    pub continue_key: ResponseKey,
    pub abort_key: ResponseKey,
    pub skip_key: ResponseKey,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self {
            continue_key: ResponseKey::new("space"),
            abort_key: ResponseKey::new("escape"),
            skip_key: ResponseKey::new("f8"),
        }
    }
}

impl ControlBindings {
    pub fn keys(&self) -> [&ResponseKey; 3] {
        [&self.continue_key, &self.abort_key, &self.skip_key]
    }

    /// Abort wins over skip, skip over continue.
    pub fn resolve(&self, keymap: &KeyMap, event: &KeyEvent) -> Option<ControlInput> {
        let matches = |key: &ResponseKey| keymap.binding(key).is_some_and(|b| b.matches(event));
        if matches(&self.abort_key) {
            Some(ControlInput::Abort)
        } else if matches(&self.skip_key) {
            Some(ControlInput::Skip)
        } else if matches(&self.continue_key) {
            Some(ControlInput::Continue)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<ResponseKey> {
        names.iter().map(|n| ResponseKey::new(*n)).collect()
    }

    #[test]
    fn logical_value_or_physical_code_resolves() {
        let map = KeyMap::default();
        let candidates = keys(&["s", "k"]);

        let latin = KeyEvent::new("s", "KeyS");
        let upper = KeyEvent::new("S", "KeyS");
        let hebrew_layout = KeyEvent::new("ד", "KeyS");
        let code_only = KeyEvent::new("Unidentified", "KeyK");
        let value_only = KeyEvent::new("k", "");

        assert_eq!(map.resolve(&latin, &candidates), Some(ResponseKey::new("s")));
        assert_eq!(map.resolve(&upper, &candidates), Some(ResponseKey::new("s")));
        assert_eq!(map.resolve(&hebrew_layout, &candidates), Some(ResponseKey::new("s")));
        assert_eq!(map.resolve(&code_only, &candidates), Some(ResponseKey::new("k")));
        assert_eq!(map.resolve(&value_only, &candidates), Some(ResponseKey::new("k")));
    }

    #[test]
    fn keys_outside_candidates_are_ignored() {
        let map = KeyMap::default();
        let simple = keys(&["s", "k"]);
        assert_eq!(map.resolve(&KeyEvent::new("a", "KeyA"), &simple), None);
        assert_eq!(map.resolve(&KeyEvent::new("q", "KeyQ"), &simple), None);
    }

    #[test]
    fn default_bindings_are_distinct_per_physical_key() {
        let map = KeyMap::default();
        let letters = keys(&["s", "a", "k", "l"]);
        for binding in map.bindings().iter().filter(|b| letters.contains(&b.key)) {
            for code in &binding.codes {
                let event = KeyEvent::new("", code.as_str());
                assert_eq!(map.resolve(&event, &letters).as_ref(), Some(&binding.key));
            }
            for value in &binding.values {
                let event = KeyEvent::new(value.as_str(), "");
                assert_eq!(map.resolve(&event, &letters).as_ref(), Some(&binding.key));
            }
        }
    }

    #[test]
    fn control_inputs_resolve_with_priority() {
        let map = KeyMap::default();
        let controls = ControlBindings::default();
        assert_eq!(
            controls.resolve(&map, &KeyEvent::new(" ", "Space")),
            Some(ControlInput::Continue)
        );
        assert_eq!(
            controls.resolve(&map, &KeyEvent::new("Escape", "Escape")),
            Some(ControlInput::Abort)
        );
        assert_eq!(
            controls.resolve(&map, &KeyEvent::new("F8", "F8")),
            Some(ControlInput::Skip)
        );
        assert_eq!(controls.resolve(&map, &KeyEvent::new("s", "KeyS")), None);
    }
}
