use ssrt_core::{DisplayCommand, StimulusStyle};

/// What the window currently shows, rebuilt from display commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    instructions: Option<String>,
    reminder: Option<String>,
    stimulus: Option<(String, StimulusStyle)>,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: DisplayCommand) {
        match command {
            DisplayCommand::ShowInstructions(text) => self.instructions = Some(text),
            DisplayCommand::HideInstructions => self.instructions = None,
            DisplayCommand::ShowKeyReminder(text) => self.reminder = Some(text),
            DisplayCommand::HideKeyReminder => self.reminder = None,
            DisplayCommand::SetStimulus { glyph, style } => self.stimulus = Some((glyph, style)),
            DisplayCommand::ClearStimulus => self.stimulus = None,
        }
        self.revision += 1;
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn reminder(&self) -> Option<&str> {
        self.reminder.as_deref()
    }

    pub fn stimulus(&self) -> Option<(&str, StimulusStyle)> {
        self.stimulus.as_ref().map(|(glyph, style)| (glyph.as_str(), *style))
    }

    /// Bumped on every applied command.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_blank(&self) -> bool {
        self.instructions.is_none() && self.reminder.is_none() && self.stimulus.is_none()
    }
}

/// Tracks which scene revision is already in the frame buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawGate {
    drawn: Option<u64>,
}

impl RedrawGate {
    /// True when `scene` changed since the last call that returned true.
    pub fn needs_draw(&mut self, scene: &Scene) -> bool {
        if self.drawn == Some(scene.revision) {
            return false;
        }
        self.drawn = Some(scene.revision);
        true
    }

    /// Forget the drawn revision, e.g. after the frame buffer was reallocated.
    pub fn invalidate(&mut self) {
        self.drawn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_set_and_clear_regions() {
        let mut scene = Scene::new();
        assert!(scene.is_blank());

        scene.apply(DisplayCommand::ShowInstructions("Press SPACE".into()));
        scene.apply(DisplayCommand::ShowKeyReminder("⬤ - S".into()));
        scene.apply(DisplayCommand::SetStimulus {
            glyph: "⬤".into(),
            style: StimulusStyle::Normal,
        });
        assert_eq!(scene.instructions(), Some("Press SPACE"));
        assert_eq!(scene.reminder(), Some("⬤ - S"));
        assert_eq!(scene.stimulus(), Some(("⬤", StimulusStyle::Normal)));

        scene.apply(DisplayCommand::SetStimulus {
            glyph: "X".into(),
            style: StimulusStyle::StopCue,
        });
        assert_eq!(scene.stimulus(), Some(("X", StimulusStyle::StopCue)));

        scene.apply(DisplayCommand::HideInstructions);
        scene.apply(DisplayCommand::HideKeyReminder);
        scene.apply(DisplayCommand::ClearStimulus);
        assert!(scene.is_blank());
        assert_eq!(scene.revision(), 7);
    }

    #[test]
    fn redraw_gate_skips_unchanged_scene() {
        let mut scene = Scene::new();
        let mut gate = RedrawGate::default();
        assert!(gate.needs_draw(&scene));
        assert!(!gate.needs_draw(&scene));

        scene.apply(DisplayCommand::ClearStimulus);
        assert!(gate.needs_draw(&scene));
        assert!(!gate.needs_draw(&scene));

        gate.invalidate();
        assert!(gate.needs_draw(&scene));
    }
}
