use expkit_core::stimulus::{KEYBOARD_RESPONSE_STIMULUS_ID, RESPONDED_CLASS};
use expkit_core::{KeyboardResponseOutcome, ResponseRecord, TrialData, TrialState};

use crate::config::KeyboardResponseParams;
use crate::lifecycle::{Plugin, TrialEvent, TrialLifecycle, TrialServices, TrialTimer};

/// Plain HTML stimulus answered with a key press
#[derive(Debug)]
pub struct HtmlKeyboardResponse {
    params: KeyboardResponseParams,
    lifecycle: TrialLifecycle,
    record: ResponseRecord,
}

impl HtmlKeyboardResponse {
    pub fn new(params: KeyboardResponseParams) -> Self {
        Self {
            params,
            lifecycle: TrialLifecycle::new(),
            record: ResponseRecord::default(),
        }
    }

    fn finalize(&mut self, services: &mut TrialServices<'_>) {
        let stimulus = &self.params.stimulus;
        let record = &self.record;
        self.lifecycle.finalize(services, || {
            TrialData::KeyboardResponse(KeyboardResponseOutcome {
                stimulus: stimulus.clone(),
                response: record.key().map(str::to_owned),
                rt: record.rt_ms(),
            })
        });
    }
}

impl Plugin for HtmlKeyboardResponse {
    fn name(&self) -> &'static str {
        "html-keyboard-response"
    }

    fn start(&mut self, services: &mut TrialServices<'_>) {
        if !self.lifecycle.begin(services) {
            return;
        }
        let mut html = format!(
            "<div id=\"{KEYBOARD_RESPONSE_STIMULUS_ID}\">{}</div>",
            self.params.stimulus
        );
        if let Some(prompt) = &self.params.prompt {
            html.push_str(prompt);
        }
        services.surface.render(&html);
        self.lifecycle.listen(services, &self.params.choices);

        if let Some(ms) = self.params.stimulus_duration {
            self.lifecycle
                .schedule(services, ms, TrialTimer::HideStimulus);
        }
        if let Some(ms) = self.params.trial_duration {
            self.lifecycle.schedule(services, ms, TrialTimer::EndTrial);
        }
    }

    fn handle(&mut self, event: TrialEvent, services: &mut TrialServices<'_>) {
        let Some(event) = self.lifecycle.accept(event) else {
            return;
        };
        match event {
            TrialEvent::Key(response) => {
                services
                    .surface
                    .add_class(KEYBOARD_RESPONSE_STIMULUS_ID, RESPONDED_CLASS);
                self.record.record_first(&response);
                if self.params.response_ends_trial {
                    self.finalize(services);
                }
            }
            TrialEvent::Timer {
                timer: TrialTimer::HideStimulus,
                ..
            } => services.surface.set_hidden(KEYBOARD_RESPONSE_STIMULUS_ID),
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
