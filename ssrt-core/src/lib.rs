pub mod demographic;
pub mod display;
pub mod input;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use demographic::{DemographicRecord, Gender, Handedness};
pub use display::{Display, DisplayCommand, DisplayError, RecordingDisplay, StimulusStyle};
pub use input::{ControlBindings, ControlInput, KeyBinding, KeyEvent, KeyMap, ResponseKey};
pub use phase::{Phase, SessionPhase};
pub use stimulus::{RegistryError, StimulusBinding, StimulusKind, StimulusRegistry, TaskMapping, TaskVariant};
pub use trial::{BlockKind, TrialOutcome, TrialSpec, TrialState};
