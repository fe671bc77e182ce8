use serde::{Deserialize, Serialize};

use crate::practice::PracticeTally;

/// Screen copy; every text can be replaced from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instructions {
    pub welcome: String,
    pub consent: String,
    pub practice: String,
    /// Template with `{go_correct}`, `{go_total}`, `{stop_success}`, `{stop_total}`.
    pub practice_feedback: String,
    pub practice_reminder: String,
    pub simple_task: String,
    #[serde(rename = "break")]
    pub break_screen: String,
    pub complex_task: String,
    pub completed: String,
    pub ended: String,
}

impl Default for Instructions {
    fn default() -> Self {
        Self {
            welcome: "In the upcoming experiment, you will be exposed to different shapes and will be \
instructed to respond using different keys.\n\
The experiment takes approximately 10-12 minutes. While you may exit the experiment at any time, \
you must complete the entire experiment to receive payment.\n\n\
Press SPACE to continue."
                .to_string(),
            consent: "Informed Consent Form\n\n\
Participation is voluntary and you may stop at any time by pressing ESC.\n\n\
Press SPACE to continue if you agree to participate."
                .to_string(),
            practice: "Practice round.\n\n\
Press SPACE as soon as a shape appears.\n\
If an X appears on the screen, do not press any key until the next shape appears.\n\n\
Press SPACE to begin."
                .to_string(),
            practice_feedback: "Practice complete.\n\n\
You responded in time on {go_correct} of {go_total} go trials\n\
and held back on {stop_success} of {stop_total} stop trials.\n\n\
Press SPACE to start the experiment."
                .to_string(),
            practice_reminder: "SPACE".to_string(),
            simple_task: "In the following task, different shapes will appear on the screen.\n\n\
When a circle (⬤) appears, press the S key\n\
When an up arrow (↑) appears, press the K key\n\n\
If an X appears on the screen, you must stop and not press any key until the next symbol appears.\n\n\
Try to respond as accurately and quickly as possible.\n\n\
Press SPACE to begin."
                .to_string(),
            break_screen: "You have completed the first part of the experiment.\n\
Continue to the second part when you feel ready.\n\n\
Press SPACE to continue."
                .to_string(),
            complex_task: "Now, you will be exposed to additional shapes.\n\n\
When a triangle (▲) appears, press the S key\n\
When a square (■) appears, press the A key\n\
When a hash (#) appears, press the K key\n\
When a star (★) appears, press the L key\n\n\
Again, if an X appears on the screen, you must stop and not press any key until the next symbol appears.\n\n\
Press SPACE to begin."
                .to_string(),
            completed: "The experiment is now complete. Thank you for your participation!".to_string(),
            ended: "Experiment ended. Thank you for your participation.".to_string(),
        }
    }
}

impl Instructions {
    pub fn practice_feedback_text(&self, tally: &PracticeTally) -> String {
        self.practice_feedback
            .replace("{go_correct}", &tally.go_correct.to_string())
            .replace("{go_total}", &tally.go_total.to_string())
            .replace("{stop_success}", &tally.stop_success.to_string())
            .replace("{stop_total}", &tally.stop_total.to_string())
    }
}
