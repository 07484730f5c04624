use serde::{Deserialize, Serialize};

/// Lifecycle of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Idle,
    Running,
    Finalizing,
    Done,
}

/// A key press accepted by a response listener
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMatch {
    pub key: String,
    pub rt_ms: f64,
}

/// First captured response of a trial
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseRecord {
    key: Option<String>,
    rt_ms: Option<f64>,
}

impl ResponseRecord {
    /// Stores the response unless one is already recorded. Returns whether it was stored.
    pub fn record_first(&mut self, response: &KeyMatch) -> bool {
        if self.key.is_some() {
            return false;
        }
        self.key = Some(response.key.clone());
        self.rt_ms = Some(response.rt_ms);
        true
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn rt_ms(&self) -> Option<f64> {
        self.rt_ms
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none()
    }
}

/// Stop-signal trial result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub rt: Option<f64>,
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl TrialOutcome {
    /// `correct` compares the raw recorded key against `correct_choice` verbatim.
    pub fn from_record(record: &ResponseRecord, correct_choice: Option<&str>) -> Self {
        Self {
            rt: record.rt_ms(),
            response: record.key().map(str::to_owned),
            correct: correct_choice.map(|choice| record.key() == Some(choice)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionCheckOutcome {
    pub attention_check_question: String,
    pub correct_response: String,
    pub correct_trial: u8,
    pub response: Option<String>,
    pub rt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub response: String,
    pub rt: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardResponseOutcome {
    pub stimulus: String,
    pub response: Option<String>,
    pub rt: Option<f64>,
}

/// Data handed to the sink when a trial finishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrialData {
    StopSignal(TrialOutcome),
    AttentionCheck(AttentionCheckOutcome),
    Feedback(FeedbackOutcome),
    KeyboardResponse(KeyboardResponseOutcome),
}

impl TrialData {
    pub fn response(&self) -> Option<&str> {
        match self {
            TrialData::StopSignal(o) => o.response.as_deref(),
            TrialData::AttentionCheck(o) => o.response.as_deref(),
            TrialData::Feedback(o) => Some(&o.response),
            TrialData::KeyboardResponse(o) => o.response.as_deref(),
        }
    }
}
