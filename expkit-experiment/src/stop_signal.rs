use expkit_core::stimulus::{
    wrap_div, RESPONDED_CLASS, STOP_SIGNAL_SS_ID, STOP_SIGNAL_STIMULUS_ID,
};
use expkit_core::{KeyMatch, ResponseRecord, TrialData, TrialOutcome, TrialState};
use tracing::{debug, trace};

use crate::config::StopSignalConfig;
use crate::lifecycle::{Plugin, TrialEvent, TrialLifecycle, TrialServices, TrialTimer};

/// Stop-signal trial: a primary stimulus, an optional delayed stop signal,
/// at most one scored response, and a single finalization.
#[derive(Debug)]
pub struct TrialController {
    config: StopSignalConfig,
    lifecycle: TrialLifecycle,
    record: ResponseRecord,
}

impl TrialController {
    pub fn new(config: StopSignalConfig) -> Self {
        Self {
            config,
            lifecycle: TrialLifecycle::new(),
            record: ResponseRecord::default(),
        }
    }

    pub fn config(&self) -> &StopSignalConfig {
        &self.config
    }

    pub fn record(&self) -> &ResponseRecord {
        &self.record
    }

    pub fn lifecycle(&self) -> &TrialLifecycle {
        &self.lifecycle
    }

    fn on_response(&mut self, response: KeyMatch, services: &mut TrialServices<'_>) {
        services
            .surface
            .add_class(STOP_SIGNAL_STIMULUS_ID, RESPONDED_CLASS);

        if self.record.record_first(&response) {
            debug!(key = %response.key, rt_ms = response.rt_ms, "response recorded");
        } else {
            trace!(key = %response.key, "later response ignored");
        }

        if self.config.ends_on_first_response {
            self.finalize(services);
        }
    }

    fn on_timer(&mut self, timer: TrialTimer, services: &mut TrialServices<'_>) {
        match timer {
            TrialTimer::HideStimulus => services.surface.set_hidden(STOP_SIGNAL_STIMULUS_ID),
            TrialTimer::ShowSecondary => {
                let inner = self.config.secondary_stimulus.as_deref().unwrap_or_default();
                services
                    .surface
                    .append_render(&wrap_div(STOP_SIGNAL_SS_ID, inner));
            }
            TrialTimer::HideSecondary => services.surface.set_hidden(STOP_SIGNAL_SS_ID),
            TrialTimer::EndTrial => self.finalize(services),
        }
    }

    /// Ends the trial now. Safe to call any number of times.
    pub fn finalize(&mut self, services: &mut TrialServices<'_>) {
        let record = &self.record;
        let correct_choice = self.config.correct_choice.as_deref();
        self.lifecycle.finalize(services, || {
            debug!(response = ?record.key(), "stop-signal response");
            TrialData::StopSignal(TrialOutcome::from_record(record, correct_choice))
        });
    }
}

impl Plugin for TrialController {
    fn name(&self) -> &'static str {
        "poldracklab-stop-signal"
    }

    fn start(&mut self, services: &mut TrialServices<'_>) {
        if !self.lifecycle.begin(services) {
            return;
        }
        let markup = format!(
            "{}{}",
            wrap_div(STOP_SIGNAL_STIMULUS_ID, &self.config.primary_stimulus),
            self.config.prompt
        );
        services.surface.render(&markup);

        self.record = ResponseRecord::default();
        self.lifecycle.listen(services, &self.config.choices);

        if let Some(ms) = self.config.primary_duration_ms {
            self.lifecycle
                .schedule(services, ms, TrialTimer::HideStimulus);
        }
        if let Some(ms) = self.config.trial_duration_ms {
            self.lifecycle.schedule(services, ms, TrialTimer::EndTrial);
        }
        if let Some(ssd) = self.config.secondary_onset() {
            self.lifecycle
                .schedule(services, ssd, TrialTimer::ShowSecondary);
            // Visibility ends at an absolute trial time, not relative to the reveal.
            if let Some(visible) = self.config.secondary_visible_ms {
                self.lifecycle
                    .schedule(services, ssd.saturating_add(visible), TrialTimer::HideSecondary);
            }
        }
        debug!(
            kind = ?self.config.secondary_kind,
            ssd = ?self.config.secondary_onset(),
            pending = self.lifecycle.timers().len(),
            "stop-signal trial started"
        );
    }

    fn handle(&mut self, event: TrialEvent, services: &mut TrialServices<'_>) {
        let Some(event) = self.lifecycle.accept(event) else {
            return;
        };
        match event {
            TrialEvent::Timer { timer, .. } => self.on_timer(timer, services),
            TrialEvent::Key(response) => self.on_response(response, services),
            TrialEvent::Cancel => self.finalize(services),
            TrialEvent::Input(_) | TrialEvent::Submit => {}
        }
    }

    fn state(&self) -> TrialState {
        self.lifecycle.state()
    }
}
