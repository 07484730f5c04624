use expkit_core::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attention_check::AttentionCheck;
use crate::config::{
    AttentionCheckConfig, AttentionCheckParams, FeedbackParams, KeyboardResponseParams,
    StopSignalParams,
};
use crate::feedback::PostBatteryFeedback;
use crate::keyboard_response::HtmlKeyboardResponse;
use crate::lifecycle::Plugin;
use crate::stop_signal::TrialController;

/// Post-trial gap of stop-signal trials that do not set one.
pub const STOP_SIGNAL_POST_TRIAL_GAP_MS: u64 = 1000;

/// Plugin parameters, tagged by the host's plugin name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PluginParams {
    #[serde(rename = "poldracklab-stop-signal")]
    StopSignal(StopSignalParams),
    #[serde(rename = "attention-check-rdoc")]
    AttentionCheck(AttentionCheckParams),
    #[serde(rename = "post-battery-feedback")]
    PostBatteryFeedback(FeedbackParams),
    #[serde(rename = "html-keyboard-response")]
    HtmlKeyboardResponse(KeyboardResponseParams),
}

impl PluginParams {
    pub fn trial_type(&self) -> &'static str {
        match self {
            PluginParams::StopSignal(_) => "poldracklab-stop-signal",
            PluginParams::AttentionCheck(_) => "attention-check-rdoc",
            PluginParams::PostBatteryFeedback(_) => "post-battery-feedback",
            PluginParams::HtmlKeyboardResponse(_) => "html-keyboard-response",
        }
    }

    /// The plugin's own `post_trial_gap` default, if it declares one.
    pub fn default_post_trial_gap(&self) -> Option<u64> {
        match self {
            PluginParams::StopSignal(_) => Some(STOP_SIGNAL_POST_TRIAL_GAP_MS),
            _ => None,
        }
    }

    pub fn build(&self) -> Result<Box<dyn Plugin>, ConfigError> {
        Ok(match self {
            PluginParams::StopSignal(p) => Box::new(TrialController::new(p.clone().into())),
            PluginParams::AttentionCheck(p) => Box::new(AttentionCheck::new(
                AttentionCheckConfig::try_from(p.clone())?,
            )),
            PluginParams::PostBatteryFeedback(p) => Box::new(PostBatteryFeedback::new(p.clone())),
            PluginParams::HtmlKeyboardResponse(p) => Box::new(HtmlKeyboardResponse::new(p.clone())),
        })
    }
}

/// A trial in a timeline: plugin parameters plus per-trial host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    #[serde(flatten)]
    pub plugin: PluginParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_trial_gap: Option<u64>,
    /// Extra fields copied into the trial's data record, e.g. `trial_id`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl TrialSpec {
    pub fn new(plugin: PluginParams) -> Self {
        Self {
            plugin,
            post_trial_gap: None,
            data: Map::new(),
        }
    }

    pub fn with_gap(mut self, ms: u64) -> Self {
        self.post_trial_gap = Some(ms);
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    /// Gap after this trial: its own setting, then the plugin default, then `fallback`.
    pub fn post_trial_gap_or(&self, fallback: u64) -> u64 {
        self.post_trial_gap
            .or_else(|| self.plugin.default_post_trial_gap())
            .unwrap_or(fallback)
    }

    pub fn trial_id(&self) -> Option<&str> {
        self.data.get("trial_id").and_then(Value::as_str)
    }
}

/// A trial or a nested group of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineNode {
    Group { timeline: Vec<TimelineNode> },
    Trial(Box<TrialSpec>),
}

impl TimelineNode {
    pub fn group(nodes: impl IntoIterator<Item = TimelineNode>) -> Self {
        TimelineNode::Group {
            timeline: nodes.into_iter().collect(),
        }
    }

    pub fn trial(spec: TrialSpec) -> Self {
        TimelineNode::Trial(Box::new(spec))
    }
}

/// Depth-first list of the trials under `nodes`, in presentation order.
pub fn flatten(nodes: &[TimelineNode]) -> Vec<&TrialSpec> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            TimelineNode::Trial(spec) => out.push(spec.as_ref()),
            TimelineNode::Group { timeline } => out.extend(flatten(timeline)),
        }
    }
    out
}

/// Parses a JSON timeline: either one node or an array of nodes.
pub fn parse_timeline(json: &str) -> Result<Vec<TimelineNode>, ConfigError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Doc {
        Many(Vec<TimelineNode>),
        One(TimelineNode),
    }
    Ok(match serde_json::from_str(json)? {
        Doc::Many(nodes) => nodes,
        Doc::One(node) => vec![node],
    })
}
