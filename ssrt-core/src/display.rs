use thiserror::Error;

/// Visual state of the stimulus glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StimulusStyle {
    #[default]
    Normal,
    /// Drawn red to flag the stop signal.
    StopCue,
}

/// Commands understood by the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    ShowInstructions(String),
    HideInstructions,
    ShowKeyReminder(String),
    HideKeyReminder,
    SetStimulus { glyph: String, style: StimulusStyle },
    ClearStimulus,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display collaborator disconnected")]
    Disconnected,
    #[error("display region `{0}` is unavailable")]
    MissingRegion(&'static str),
}

/// Sink for display commands.
pub trait Display {
    fn apply(&mut self, command: DisplayCommand) -> Result<(), DisplayError>;

    /// Called once before the session starts; failure ends the session.
    fn ensure_ready(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Keeps every command it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingDisplay {
    pub commands: Vec<DisplayCommand>,
    pub missing_region: Option<&'static str>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_region(region: &'static str) -> Self {
        Self {
            commands: Vec::new(),
            missing_region: Some(region),
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DisplayCommand::ShowInstructions(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn stimuli(&self) -> impl Iterator<Item = (&str, StimulusStyle)> {
        self.commands.iter().filter_map(|c| match c {
            DisplayCommand::SetStimulus { glyph, style } => Some((glyph.as_str(), *style)),
            _ => None,
        })
    }
}

impl Display for RecordingDisplay {
    fn apply(&mut self, command: DisplayCommand) -> Result<(), DisplayError> {
        self.commands.push(command);
        Ok(())
    }

    fn ensure_ready(&mut self) -> Result<(), DisplayError> {
        match self.missing_region {
            Some(region) => Err(DisplayError::MissingRegion(region)),
            None => Ok(()),
        }
    }
}
