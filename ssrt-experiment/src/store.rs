//! Append-only JSON-lines document store.
//!
//! One file per collection under a data directory; every inserted record is a
//! single line carrying a generated `_id` and an insertion `timestamp`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde_json::{Map, Value, json};
use ssrt_core::demographic::unix_millis;

use crate::error::SubmitError;
use crate::results::SessionResult;
use crate::submit::{RecordId, ResultSink};

pub const DEFAULT_COLLECTION: &str = "experiment_results";

#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Opens `<dir>/<collection>.jsonl`, creating the directory and the
    /// collection file when absent.
    pub fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, SubmitError> {
        let dir = dir.as_ref();
        if collection.is_empty() || collection.contains(['/', '\\']) {
            return Err(SubmitError::Malformed(format!(
                "invalid collection name `{collection}`"
            )));
        }
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{collection}.jsonl"));
        if !path.exists() {
            tracing::info!(path = %path.display(), "creating collection");
            File::create(&path)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates and appends a raw participant payload.
    ///
    /// `results` must be present; an empty or missing participant id is
    /// replaced by the current Unix time in milliseconds and a missing
    /// demographic by an empty object.
    pub fn insert_value(&mut self, payload: &Value) -> Result<RecordId, SubmitError> {
        let Some(object) = payload.as_object() else {
            return Err(SubmitError::Malformed("payload is not an object".into()));
        };
        let results = match object.get("results") {
            Some(results @ Value::Array(_)) => results.clone(),
            Some(_) => return Err(SubmitError::Malformed("`results` is not an array".into())),
            None => return Err(SubmitError::Malformed("missing `results`".into())),
        };
        let participant_id = match object.get("participantId") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => unix_millis().to_string(),
        };
        let demographic = match object.get("demographic") {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(other) => other.clone(),
        };

        let id = generate_id(&mut rand::rng());
        let record = json!({
            "_id": id.0,
            "participantId": participant_id,
            "timestamp": unix_millis(),
            "demographic": demographic,
            "results": results,
        });

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        tracing::debug!(record = %id, path = %self.path.display(), "record appended");
        Ok(id)
    }

    /// Every record in insertion order.
    pub fn records(&self) -> Result<Vec<Value>, SubmitError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl ResultSink for JsonlStore {
    fn store(&mut self, result: &SessionResult) -> Result<RecordId, SubmitError> {
        let payload = serde_json::to_value(result)?;
        self.insert_value(&payload)
    }
}

/// 12-byte id rendered as 24 hex digits: 4 bytes of Unix seconds, 8 random.
fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> RecordId {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default();
    RecordId(format!("{secs:08x}{:016x}", rng.random::<u64>()))
}
