use std::time::Duration;

use expkit_core::{ConfigError, TrialState};
use expkit_timing::{Clock, LatencySummary, Scheduler, TimerHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collector::{DataCollector, TrialRecord};
use crate::keyboard::KeyboardService;
use crate::lifecycle::{Plugin, TrialEvent, TrialServices, TrialTimer};
use crate::surface::MarkupSurface;
use crate::timeline::{flatten, TimelineNode, TrialSpec};

pub const DEFAULT_POST_TRIAL_GAP_MS: u64 = 0;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("trial {trial_index} ({trial_type}) stalled in {state:?}: nothing left to wait for")]
    TrialStalled {
        trial_type: &'static str,
        trial_index: usize,
        state: TrialState,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything the reactor can dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Trial(TrialTimer),
    KeyDown(String),
    Input(String),
    Submit,
    Cancel,
}

impl From<TrialTimer> for RuntimeEvent {
    fn from(timer: TrialTimer) -> Self {
        RuntimeEvent::Trial(timer)
    }
}

/// Participant or operator action, relative to trial start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InputAction {
    Key { key: String },
    Type { text: String },
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: InputAction,
}

impl ScriptedInput {
    pub fn key(at_ms: u64, key: impl Into<String>) -> Self {
        Self {
            at_ms,
            action: InputAction::Key { key: key.into() },
        }
    }

    pub fn typed(at_ms: u64, text: impl Into<String>) -> Self {
        Self {
            at_ms,
            action: InputAction::Type { text: text.into() },
        }
    }

    pub fn submit(at_ms: u64) -> Self {
        Self {
            at_ms,
            action: InputAction::Submit,
        }
    }

    pub fn cancel(at_ms: u64) -> Self {
        Self {
            at_ms,
            action: InputAction::Cancel,
        }
    }
}

impl From<InputAction> for RuntimeEvent {
    fn from(action: InputAction) -> Self {
        match action {
            InputAction::Key { key } => RuntimeEvent::KeyDown(key),
            InputAction::Type { text } => RuntimeEvent::Input(text),
            InputAction::Submit => RuntimeEvent::Submit,
            InputAction::Cancel => RuntimeEvent::Cancel,
        }
    }
}

/// Supplies the inputs a trial will receive
pub trait InputSource {
    fn script_for(&mut self, spec: &TrialSpec) -> Vec<ScriptedInput>;
}

/// No participant: trials only end through their own timers.
pub struct NoInput;

impl InputSource for NoInput {
    fn script_for(&mut self, _spec: &TrialSpec) -> Vec<ScriptedInput> {
        Vec::new()
    }
}

/// Single-threaded reactor that owns the collaborators shared by sequential trials
pub struct TrialRunner<C: Clock> {
    scheduler: Scheduler<RuntimeEvent, C>,
    keyboard: KeyboardService<C>,
    surface: MarkupSurface,
    collector: DataCollector<C>,
    trial_index: usize,
    default_post_trial_gap_ms: u64,
}

impl<C: Clock> TrialRunner<C> {
    pub fn new(clock: C) -> Self {
        Self {
            scheduler: Scheduler::new(clock.clone()),
            keyboard: KeyboardService::new(clock.clone()),
            surface: MarkupSurface::new(),
            collector: DataCollector::new(clock),
            trial_index: 0,
            default_post_trial_gap_ms: DEFAULT_POST_TRIAL_GAP_MS,
        }
    }

    pub fn case_sensitive_responses(mut self, case_sensitive: bool) -> Self {
        self.keyboard = self.keyboard.case_sensitive(case_sensitive);
        self
    }

    pub fn default_post_trial_gap(mut self, ms: u64) -> Self {
        self.default_post_trial_gap_ms = ms;
        self
    }

    pub fn surface(&self) -> &MarkupSurface {
        &self.surface
    }

    pub fn keyboard(&self) -> &KeyboardService<C> {
        &self.keyboard
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn records(&self) -> &[TrialRecord] {
        self.collector.records()
    }

    pub fn into_records(self) -> Vec<TrialRecord> {
        self.collector.into_records()
    }

    pub fn dispatch_latency(&self) -> LatencySummary {
        self.scheduler.stats().summary()
    }

    fn services(&mut self) -> TrialServices<'_> {
        TrialServices {
            surface: &mut self.surface,
            timers: &mut self.scheduler,
            responses: &mut self.keyboard,
            sink: &mut self.collector,
        }
    }

    /// Runs `plugin` until it finalizes, feeding it `script` along the way.
    pub fn run_trial(
        &mut self,
        plugin: &mut dyn Plugin,
        script: &[ScriptedInput],
    ) -> Result<(), RunError> {
        plugin.start(&mut self.services());
        let inputs: Vec<TimerHandle> = script
            .iter()
            .map(|input| self.scheduler.push(input.at_ms, input.action.clone().into()))
            .collect();

        while !plugin.is_done() {
            let Some(fired) = self.scheduler.wait_next() else {
                let state = plugin.state();
                warn!(trial = plugin.name(), ?state, "trial stalled, cancelling");
                plugin.handle(TrialEvent::Cancel, &mut self.services());
                return Err(RunError::TrialStalled {
                    trial_type: plugin.name(),
                    trial_index: self.trial_index,
                    state,
                });
            };
            let event = match fired.event {
                RuntimeEvent::Trial(timer) => Some(TrialEvent::Timer {
                    handle: fired.handle,
                    timer,
                }),
                RuntimeEvent::KeyDown(key) => self.keyboard.press(&key).map(TrialEvent::Key),
                RuntimeEvent::Input(text) => Some(TrialEvent::Input(text)),
                RuntimeEvent::Submit => Some(TrialEvent::Submit),
                RuntimeEvent::Cancel => Some(TrialEvent::Cancel),
            };
            if let Some(event) = event {
                plugin.handle(event, &mut self.services());
            }
        }

        let leftover = inputs
            .into_iter()
            .filter(|handle| self.scheduler.remove(*handle))
            .count();
        if leftover > 0 {
            debug!(leftover, "dropped inputs scheduled past trial end");
        }
        Ok(())
    }

    /// Builds the trial's plugin, runs it, then waits out the post-trial gap.
    pub fn run_spec(&mut self, spec: &TrialSpec, script: &[ScriptedInput]) -> Result<(), RunError> {
        let mut plugin = spec.plugin.build()?;
        self.collector
            .begin_trial(spec.plugin.trial_type(), self.trial_index, spec.data.clone());
        let result = self.run_trial(plugin.as_mut(), script);
        self.trial_index += 1;
        result?;

        let gap = spec.post_trial_gap_or(self.default_post_trial_gap_ms);
        if gap > 0 {
            self.scheduler.clock().sleep(Duration::from_millis(gap));
        }
        Ok(())
    }

    /// Runs every trial under `nodes` in order.
    pub fn run_timeline(
        &mut self,
        nodes: &[TimelineNode],
        input: &mut dyn InputSource,
    ) -> Result<&[TrialRecord], RunError> {
        let trials = flatten(nodes);
        info!(trials = trials.len(), "timeline started");
        for spec in trials {
            let script = input.script_for(spec);
            self.run_spec(spec, &script)?;
        }
        let latency = self.dispatch_latency();
        info!(
            trials = self.records().len(),
            dispatched = latency.samples,
            mean_lateness_ms = latency.mean_ns / 1_000_000.0,
            jitter_ms = latency.jitter_ns / 1_000_000.0,
            "timeline finished"
        );
        Ok(self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyboardResponseParams, StopSignalConfig};
    use crate::stop_signal::TrialController;
    use crate::timeline::{parse_timeline, PluginParams};
    use expkit_core::{KeyChoices, TrialData};
    use expkit_timing::ManualClock;

    #[test]
    fn trial_without_exit_stalls() {
        let mut runner = TrialRunner::new(ManualClock::new());
        let mut trial = TrialController::new(StopSignalConfig::go("X", KeyChoices::AllKeys));

        let err = runner.run_trial(&mut trial, &[]).unwrap_err();
        assert!(matches!(err, RunError::TrialStalled { .. }));
        assert!(trial.is_done());
        assert_eq!(runner.keyboard().active_listeners(), 0);
    }

    #[test]
    fn scripted_key_on_the_deadline_tick_arrives_after_the_end() {
        let clock = ManualClock::new();
        let mut runner = TrialRunner::new(clock.clone());
        let mut trial = TrialController::new(StopSignalConfig {
            trial_duration_ms: Some(1500),
            ..StopSignalConfig::go("X", KeyChoices::AllKeys)
        });

        runner
            .run_trial(&mut trial, &[ScriptedInput::key(1500, ",")])
            .unwrap();

        assert_eq!(clock.now_ms(), 1500);
        assert_eq!(runner.records().len(), 1);
        assert_eq!(runner.records()[0].outcome.response(), None);
        assert_eq!(runner.pending_events(), 0);
    }

    #[test]
    fn inputs_past_trial_end_are_dropped() {
        let clock = ManualClock::new();
        let mut runner = TrialRunner::new(clock.clone());
        let mut params = KeyboardResponseParams::new("wait", KeyChoices::keys(["t"]));
        params.trial_duration = Some(1000);
        let spec = TrialSpec::new(PluginParams::HtmlKeyboardResponse(params)).with_gap(500);

        runner
            .run_spec(&spec, &[ScriptedInput::key(300, "t"), ScriptedInput::key(2000, "t")])
            .unwrap();

        assert_eq!(runner.pending_events(), 0);
        assert_eq!(clock.now_ms(), 800);
        match &runner.records()[0].outcome {
            TrialData::KeyboardResponse(o) => {
                assert_eq!(o.response.as_deref(), Some("t"));
                assert_eq!(o.rt, Some(300.0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn stop_signal_trials_default_to_a_one_second_gap() {
        let clock = ManualClock::new();
        let mut runner = TrialRunner::new(clock.clone()).default_post_trial_gap(200);
        let timeline = parse_timeline(
            r#"[{"type": "poldracklab-stop-signal", "stimulus": "X", "SS_trial_type": "go",
                 "trial_duration": 1500},
                {"type": "poldracklab-stop-signal", "stimulus": "O", "SS_trial_type": "go",
                 "trial_duration": 500, "post_trial_gap": 0},
                {"type": "html-keyboard-response", "stimulus": "+", "trial_duration": 100}]"#,
        )
        .unwrap();

        let records = runner.run_timeline(&timeline, &mut NoInput).unwrap();
        let elapsed: Vec<_> = records.iter().map(|r| r.time_elapsed).collect();
        assert_eq!(elapsed, vec![1500, 3000, 3100]);
        assert_eq!(clock.now_ms(), 3300);
    }

    #[test]
    fn stalled_trial_keeps_earlier_records() {
        let mut runner = TrialRunner::new(ManualClock::new());
        let timeline = parse_timeline(
            r#"[{"type": "poldracklab-stop-signal", "stimulus": "X", "SS_trial_type": "go",
                 "trial_duration": 500},
                {"type": "poldracklab-stop-signal", "stimulus": "O", "SS_trial_type": "go"},
                {"type": "html-keyboard-response", "stimulus": "+", "trial_duration": 100}]"#,
        )
        .unwrap();

        let err = runner.run_timeline(&timeline, &mut NoInput).unwrap_err();
        assert!(matches!(err, RunError::TrialStalled { trial_index: 1, .. }));
        let records = runner.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].trial_index, 1);
        assert_eq!(records[1].outcome.response(), None);
        assert_eq!(runner.pending_events(), 0);
    }

    #[test]
    fn scripted_inputs_parse_from_json() {
        let inputs: Vec<ScriptedInput> = serde_json::from_str(
            r#"[{"at_ms": 10, "action": "key", "key": ","},
                {"at_ms": 20, "action": "type", "text": "ok"},
                {"at_ms": 30, "action": "submit"}]"#,
        )
        .unwrap();
        assert_eq!(
            inputs,
            vec![
                ScriptedInput::key(10, ","),
                ScriptedInput::typed(20, "ok"),
                ScriptedInput::submit(30)
            ]
        );
    }
}
