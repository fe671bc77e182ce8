use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
    Ambidextrous,
}

/// Attributes collected once by the demographic form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub age: u32,
    pub gender: Gender,
    pub handedness: Handedness,
    /// Milliseconds since the Unix epoch when the form was submitted.
    pub timestamp: u64,
}

impl DemographicRecord {
    pub fn new(age: u32, gender: Gender, handedness: Handedness) -> Self {
        Self {
            age,
            gender,
            handedness,
            timestamp: unix_millis(),
        }
    }
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
