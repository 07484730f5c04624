pub mod error;
pub mod keys;
pub mod services;
pub mod stimulus;
pub mod trial;

pub use error::ConfigError;
pub use keys::KeyChoices;
pub use services::{ListenerHandle, PresentationSurface, ResponseService, TrialSink};
pub use stimulus::SecondaryTrialKind;
pub use trial::{
    AttentionCheckOutcome, FeedbackOutcome, KeyMatch, KeyboardResponseOutcome, ResponseRecord,
    TrialData, TrialOutcome, TrialState,
};
