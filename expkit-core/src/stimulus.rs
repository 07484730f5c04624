use serde::{Deserialize, Deserializer, Serialize};

/// Element ids the plugins render their stimuli under
pub const STOP_SIGNAL_STIMULUS_ID: &str = "jspsych-stop-signal-stimulus";
pub const STOP_SIGNAL_SS_ID: &str = "jspsych-stop-signal-SS";
pub const ATTENTION_CHECK_STIMULUS_ID: &str = "jspsych-attention-check-rdoc-stimulus";
pub const KEYBOARD_RESPONSE_STIMULUS_ID: &str = "jspsych-html-keyboard-response-stimulus";
pub const FEEDBACK_SUBMIT_ID: &str = "jspsych-my-plugin-submit-button";
pub const FEEDBACK_RESPONSE_ID: &str = "feedback_response";

/// Marker class applied to a stimulus once a valid key was pressed.
pub const RESPONDED_CLASS: &str = "responded";

/// Whether a stop-signal trial may show its secondary stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryTrialKind {
    Go,
    Stop,
}

impl SecondaryTrialKind {
    /// `"stop"` in any case is a stop trial; every other label is a go trial.
    pub fn parse(label: &str) -> Self {
        if label.eq_ignore_ascii_case("stop") {
            SecondaryTrialKind::Stop
        } else {
            SecondaryTrialKind::Go
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, SecondaryTrialKind::Stop)
    }
}

impl<'de> Deserialize<'de> for SecondaryTrialKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(SecondaryTrialKind::parse(&label))
    }
}

/// Wraps markup in a div carrying `id`, quoted the way the stop-signal plugin does.
pub fn wrap_div(id: &str, inner: &str) -> String {
    format!("<div id='{id}'>{inner}</div>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_kind_is_case_insensitive() {
        assert_eq!(SecondaryTrialKind::parse("STOP"), SecondaryTrialKind::Stop);
        assert_eq!(SecondaryTrialKind::parse("Stop"), SecondaryTrialKind::Stop);
        assert_eq!(SecondaryTrialKind::parse("go"), SecondaryTrialKind::Go);
        assert_eq!(SecondaryTrialKind::parse("stopp"), SecondaryTrialKind::Go);
    }
}
