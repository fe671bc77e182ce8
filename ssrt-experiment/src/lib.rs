pub mod config;
pub mod error;
pub mod instructions;
pub mod plan;
pub mod practice;
pub mod results;
pub mod staircase;
pub mod state;
pub mod store;
pub mod submit;
pub mod summary;
pub mod trial;

pub use config::{DeadlineConfig, ExperimentConfig, IntervalRange, SsdConfig};
pub use error::{ConfigError, SubmitError};
pub use instructions::Instructions;
pub use plan::BlockPlan;
pub use practice::PracticeTally;
pub use results::{ResultLog, SessionResult};
pub use staircase::Staircase;
pub use state::{BlockExit, ExperimentSession, SessionEnd, SessionReport};
pub use store::{JsonlStore, DEFAULT_COLLECTION};
pub use submit::{submit, MemorySink, RecordId, ResultSink};
pub use summary::{SessionSummary, TaskSummary};
pub use trial::{score_trial, Interrupt, TrialExit};
