//! Hand-off of the finished session to a result store.

use std::fmt;

use crate::error::SubmitError;
use crate::results::SessionResult;

/// Identifier assigned by the store to an inserted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External persistence collaborator.
pub trait ResultSink {
    fn store(&mut self, result: &SessionResult) -> Result<RecordId, SubmitError>;
}

impl<T: ResultSink + ?Sized> ResultSink for Box<T> {
    fn store(&mut self, result: &SessionResult) -> Result<RecordId, SubmitError> {
        (**self).store(result)
    }
}

/// Keeps submitted payloads in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub stored: Vec<SessionResult>,
    pub fail_with: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `store` call fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            stored: Vec::new(),
            fail_with: Some(reason.into()),
        }
    }
}

impl ResultSink for MemorySink {
    fn store(&mut self, result: &SessionResult) -> Result<RecordId, SubmitError> {
        if let Some(reason) = &self.fail_with {
            return Err(SubmitError::Unavailable(reason.clone()));
        }
        self.stored.push(result.clone());
        Ok(RecordId(format!("mem-{}", self.stored.len())))
    }
}

/// Deliver `result` once. Failures are logged and swallowed; there is no retry.
pub fn submit<K: ResultSink + ?Sized>(sink: &mut K, result: &SessionResult) -> Option<RecordId> {
    match sink.store(result) {
        Ok(id) => {
            tracing::info!(
                record = %id,
                participant = %result.participant_id,
                trials = result.results.len(),
                "results submitted"
            );
            Some(id)
        }
        Err(err) => {
            tracing::error!(
                error = %err,
                participant = %result.participant_id,
                trials = result.results.len(),
                "failed to submit results; data for this session is lost"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultLog;

    #[test]
    fn successful_submission_returns_id() {
        let mut sink = MemorySink::new();
        let result = SessionResult::new("p", None, ResultLog::new());
        assert_eq!(submit(&mut sink, &result), Some(RecordId("mem-1".into())));
        assert_eq!(sink.stored.len(), 1);
    }

    #[test]
    fn failure_is_contained_and_not_retried() {
        let mut sink = MemorySink::failing("connection refused");
        let result = SessionResult::new("p", None, ResultLog::new());
        assert_eq!(submit(&mut sink, &result), None);
        assert!(sink.stored.is_empty());
    }
}
