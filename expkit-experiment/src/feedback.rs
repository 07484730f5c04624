use expkit_core::stimulus::{FEEDBACK_RESPONSE_ID, FEEDBACK_SUBMIT_ID};
use expkit_core::{FeedbackOutcome, TrialData, TrialState};
use tracing::{debug, warn};

use crate::config::FeedbackParams;
use crate::lifecycle::{Plugin, TrialEvent, TrialLifecycle, TrialServices, TrialTimer};

/// Free-text feedback form shown after a battery. Ends on submit or when
/// the time limit runs out, whichever comes first.
#[derive(Debug)]
pub struct PostBatteryFeedback {
    params: FeedbackParams,
    lifecycle: TrialLifecycle,
    value: String,
}

impl PostBatteryFeedback {
    pub fn new(params: FeedbackParams) -> Self {
        Self {
            params,
            lifecycle: TrialLifecycle::new(),
            value: String::new(),
        }
    }

    fn finalize(&mut self, services: &mut TrialServices<'_>) {
        let rt = self.lifecycle.elapsed_ms(services);
        let response = self.value.clone();
        self.lifecycle.finalize(services, || {
            TrialData::Feedback(FeedbackOutcome { response, rt })
        });
    }
}

impl Plugin for PostBatteryFeedback {
    fn name(&self) -> &'static str {
        "post-battery-feedback"
    }

    fn start(&mut self, services: &mut TrialServices<'_>) {
        if !self.lifecycle.begin(services) {
            return;
        }
        let mut html = String::new();
        if let Some(prompt) = &self.params.prompt {
            html.push_str(prompt);
        }
        if let Some(form) = &self.params.html {
            html.push_str(form);
        }
        if !html.contains(FEEDBACK_RESPONSE_ID) {
            warn!("feedback form has no `{FEEDBACK_RESPONSE_ID}` field");
        }
        html.push_str(&format!(
            "<button id=\"{FEEDBACK_SUBMIT_ID}\" class=\"jspsych-btn\">Submit</button>"
        ));
        services.surface.render(&html);

        if let Some(ms) = self.params.trial_duration {
            self.lifecycle.schedule(services, ms, TrialTimer::EndTrial);
        }
    }

    fn handle(&mut self, event: TrialEvent, services: &mut TrialServices<'_>) {
        let Some(event) = self.lifecycle.accept(event) else {
            return;
        };
        match event {
            TrialEvent::Input(value) => self.value = value,
            TrialEvent::Submit => {
                debug!(chars = self.value.chars().count(), "feedback submitted");
                self.finalize(services);
            }
            TrialEvent::Timer {
                timer: TrialTimer::EndTrial,
                ..
            }
            | TrialEvent::Cancel => self.finalize(services),
            _ => {}
        }
    }

    fn state(&self) -> TrialState {
        self.lifecycle.state()
    }
}
