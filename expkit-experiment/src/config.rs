use expkit_core::{ConfigError, KeyChoices, SecondaryTrialKind};
use serde::{Deserialize, Serialize};

/// Immutable configuration of one stop-signal trial
#[derive(Debug, Clone, PartialEq)]
pub struct StopSignalConfig {
    pub primary_stimulus: String,
    pub secondary_stimulus: Option<String>,
    pub secondary_kind: SecondaryTrialKind,
    pub prompt: String,
    pub primary_duration_ms: Option<u64>,
    /// Stop-signal delay.
    pub secondary_onset_ms: Option<u64>,
    pub secondary_visible_ms: Option<u64>,
    pub trial_duration_ms: Option<u64>,
    pub choices: KeyChoices,
    pub correct_choice: Option<String>,
    pub ends_on_first_response: bool,
}

impl StopSignalConfig {
    /// A go trial with nothing but a stimulus and its response keys.
    pub fn go(stimulus: impl Into<String>, choices: KeyChoices) -> Self {
        Self {
            primary_stimulus: stimulus.into(),
            secondary_stimulus: None,
            secondary_kind: SecondaryTrialKind::Go,
            prompt: String::new(),
            primary_duration_ms: None,
            secondary_onset_ms: None,
            secondary_visible_ms: None,
            trial_duration_ms: None,
            choices,
            correct_choice: None,
            ends_on_first_response: false,
        }
    }

    /// The secondary stimulus is shown only on stop trials with a delay.
    pub fn secondary_onset(&self) -> Option<u64> {
        match self.secondary_kind {
            SecondaryTrialKind::Stop => self.secondary_onset_ms,
            SecondaryTrialKind::Go => None,
        }
    }
}

fn unset() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

/// Host durations use -1 for "unset"; zero never schedules either.
fn positive(ms: i64) -> Option<u64> {
    (ms > 0).then_some(ms as u64)
}

/// Stop-signal parameters as the host passes them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSignalParams {
    pub stimulus: String,
    #[serde(rename = "SS_stimulus", default)]
    pub ss_stimulus: Option<String>,
    #[serde(rename = "SS_trial_type")]
    pub ss_trial_type: SecondaryTrialKind,
    #[serde(default = "unset")]
    pub stimulus_duration: i64,
    #[serde(rename = "SS_duration", default = "unset")]
    pub ss_duration: i64,
    #[serde(default = "unset")]
    pub trial_duration: i64,
    #[serde(rename = "SSD", default)]
    pub ssd: Option<i64>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub choices: KeyChoices,
    #[serde(default)]
    pub correct_choice: Option<String>,
    #[serde(default)]
    pub response_ends_trial: bool,
}

impl From<StopSignalParams> for StopSignalConfig {
    fn from(p: StopSignalParams) -> Self {
        Self {
            primary_stimulus: p.stimulus,
            secondary_stimulus: p.ss_stimulus,
            secondary_kind: p.ss_trial_type,
            prompt: p.prompt,
            primary_duration_ms: positive(p.stimulus_duration),
            secondary_onset_ms: p.ssd.filter(|ssd| *ssd >= 0).map(|ssd| ssd as u64),
            secondary_visible_ms: positive(p.ss_duration),
            trial_duration_ms: positive(p.trial_duration),
            choices: p.choices,
            correct_choice: p.correct_choice,
            ends_on_first_response: p.response_ends_trial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionCheckParams {
    #[serde(default)]
    pub question: String,
    /// Character code of the expected key.
    #[serde(default)]
    pub key_answer: Option<u32>,
    #[serde(default)]
    pub choices: KeyChoices,
    #[serde(default)]
    pub trial_duration: Option<u64>,
    #[serde(default)]
    pub stimulus_duration: Option<u64>,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttentionCheckConfig {
    pub question: String,
    /// Lowercase form of the expected key.
    pub correct_response: String,
    pub choices: KeyChoices,
    pub trial_duration_ms: Option<u64>,
    pub stimulus_duration_ms: Option<u64>,
    pub response_ends_trial: bool,
}

impl TryFrom<AttentionCheckParams> for AttentionCheckConfig {
    type Error = ConfigError;

    fn try_from(p: AttentionCheckParams) -> Result<Self, Self::Error> {
        let correct_response = match p.key_answer {
            Some(code) => char::from_u32(code)
                .ok_or(ConfigError::KeyCode(code))?
                .to_lowercase()
                .collect(),
            None => String::new(),
        };
        Ok(Self {
            question: p.question,
            correct_response,
            choices: p.choices,
            trial_duration_ms: p.trial_duration,
            stimulus_duration_ms: p.stimulus_duration,
            response_ends_trial: p.response_ends_trial,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackParams {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub trial_duration: Option<u64>,
    /// Accepted for compatibility; the form is submitted with its button.
    #[serde(default)]
    pub choices: KeyChoices,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardResponseParams {
    pub stimulus: String,
    #[serde(default)]
    pub choices: KeyChoices,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub stimulus_duration: Option<u64>,
    #[serde(default)]
    pub trial_duration: Option<u64>,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
}

impl KeyboardResponseParams {
    pub fn new(stimulus: impl Into<String>, choices: KeyChoices) -> Self {
        Self {
            stimulus: stimulus.into(),
            choices,
            prompt: None,
            stimulus_duration: None,
            trial_duration: None,
            response_ends_trial: true,
        }
    }
}
