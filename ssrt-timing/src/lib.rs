pub mod race;
pub mod source;
pub mod timer;

pub use race::{await_accepted, Race, RaceOutcome, RaceStep};
pub use source::{ChannelSource, EventSource, Listener, ScriptedSource, Wait};
pub use timer::{HighPrecisionTimer, ManualClock, Timer};
