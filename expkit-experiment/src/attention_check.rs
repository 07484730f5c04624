//! Attention check shown between task blocks: a question, a single expected
//! key, and a 0/1 score.

use expkit_core::stimulus::{ATTENTION_CHECK_STIMULUS_ID, RESPONDED_CLASS};
use expkit_core::{AttentionCheckOutcome, ResponseRecord, TrialData, TrialState};

use crate::config::AttentionCheckConfig;
use crate::lifecycle::{Plugin, TrialEvent, TrialLifecycle, TrialServices, TrialTimer};

#[derive(Debug)]
pub struct AttentionCheck {
    config: AttentionCheckConfig,
    lifecycle: TrialLifecycle,
    record: ResponseRecord,
}

impl AttentionCheck {
    pub fn new(config: AttentionCheckConfig) -> Self {
        Self {
            config,
            lifecycle: TrialLifecycle::new(),
            record: ResponseRecord::default(),
        }
    }

    fn finalize(&mut self, services: &mut TrialServices<'_>) {
        let config = &self.config;
        let record = &self.record;
        self.lifecycle.finalize(services, || {
            let correct = record.key() == Some(config.correct_response.as_str());
            TrialData::AttentionCheck(AttentionCheckOutcome {
                attention_check_question: config.question.clone(),
                correct_response: config.correct_response.clone(),
                correct_trial: u8::from(correct),
                response: record.key().map(str::to_owned),
                rt: record.rt_ms(),
            })
        });
    }
}

impl Plugin for AttentionCheck {
    fn name(&self) -> &'static str {
        "attention-check-rdoc"
    }

    fn start(&mut self, services: &mut TrialServices<'_>) {
        if !self.lifecycle.begin(services) {
            return;
        }
        services.surface.render(&format!(
            "<div id=\"{ATTENTION_CHECK_STIMULUS_ID}\">{}</div>",
            self.config.question
        ));
        self.lifecycle.listen(services, &self.config.choices);

        if let Some(ms) = self.config.stimulus_duration_ms {
            self.lifecycle
                .schedule(services, ms, TrialTimer::HideStimulus);
        }
        if let Some(ms) = self.config.trial_duration_ms {
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
                    .add_class(ATTENTION_CHECK_STIMULUS_ID, RESPONDED_CLASS);
                self.record.record_first(&response);
                if self.config.response_ends_trial {
                    self.finalize(services);
                }
            }
            TrialEvent::Timer {
                timer: TrialTimer::HideStimulus,
                ..
            } => services.surface.set_hidden(ATTENTION_CHECK_STIMULUS_ID),
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
