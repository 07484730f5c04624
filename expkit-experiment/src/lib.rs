pub mod attention_check;
pub mod collector;
pub mod config;
pub mod feedback;
pub mod fmri;
pub mod keyboard;
pub mod keyboard_response;
pub mod lifecycle;
pub mod runner;
pub mod simulate;
pub mod stop_signal;
pub mod surface;
pub mod survey;
pub mod timeline;

pub use attention_check::AttentionCheck;
pub use collector::{DataCollector, TrialRecord};
pub use config::{
    AttentionCheckConfig, AttentionCheckParams, FeedbackParams, KeyboardResponseParams,
    StopSignalConfig, StopSignalParams,
};
pub use feedback::PostBatteryFeedback;
pub use keyboard::KeyboardService;
pub use keyboard_response::HtmlKeyboardResponse;
pub use lifecycle::{Plugin, TimerSet, TrialEvent, TrialLifecycle, TrialServices, TrialTimer};
pub use runner::{InputAction, InputSource, NoInput, RunError, ScriptedInput, TrialRunner};
pub use simulate::{SimulatedParticipant, SimulationConfig};
pub use stop_signal::TrialController;
pub use surface::MarkupSurface;
pub use survey::{SurveyRow, SurveyTrial};
pub use timeline::{
    flatten, parse_timeline, PluginParams, TimelineNode, TrialSpec, STOP_SIGNAL_POST_TRIAL_GAP_MS,
};
