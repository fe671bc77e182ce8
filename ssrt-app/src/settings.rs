use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use ssrt_core::DemographicRecord;
use ssrt_experiment::{ExperimentConfig, DEFAULT_COLLECTION};

pub const CONFIG_ENV: &str = "SSRT_CONFIG";

/// Everything the binary needs besides the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub experiment: ExperimentConfig,
    pub font_path: PathBuf,
    pub store_dir: PathBuf,
    pub collection: String,
    /// Defaults to the session start time in milliseconds.
    pub participant_id: Option<String>,
    /// JSON `DemographicRecord` written by the intake form.
    pub demographic_path: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            experiment: ExperimentConfig::default(),
            font_path: PathBuf::from("assets/DejaVuSans.ttf"),
            store_dir: PathBuf::from("data"),
            collection: DEFAULT_COLLECTION.to_string(),
            participant_id: None,
            demographic_path: None,
            seed: None,
        }
    }
}

impl AppSettings {
    /// Settings file from the first argument, else `$SSRT_CONFIG`, else defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from);
        match path {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::info!("no settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("loading settings {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.experiment.validate()?;
        Ok(settings)
    }

    pub fn load_demographic(&self) -> Result<Option<DemographicRecord>> {
        if !self.experiment.collect_demographics {
            return Ok(None);
        }
        let Some(path) = &self.demographic_path else {
            tracing::warn!("collect_demographics is set but no demographic_path was given");
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading demographic record {}", path.display()))?;
        let record = serde_json::from_str(&json)
            .with_context(|| format!("parsing demographic record {}", path.display()))?;
        Ok(Some(record))
    }
}
