use expkit_core::{
    KeyChoices, KeyMatch, ListenerHandle, PresentationSurface, ResponseService, TrialData,
    TrialSink, TrialState,
};
use expkit_timing::{TimerHandle, TimerService};
use tracing::{debug, trace, warn};

/// Timers a plugin may schedule against itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialTimer {
    HideStimulus,
    ShowSecondary,
    HideSecondary,
    EndTrial,
}

/// Inbound message for a running plugin
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    Timer {
        handle: TimerHandle,
        timer: TrialTimer,
    },
    Key(KeyMatch),
    /// New value of the free-text response field.
    Input(String),
    Submit,
    Cancel,
}

/// Collaborators lent to a plugin for one call
pub struct TrialServices<'a> {
    pub surface: &'a mut dyn PresentationSurface,
    pub timers: &'a mut dyn TimerService<TrialTimer>,
    pub responses: &'a mut dyn ResponseService,
    pub sink: &'a mut dyn TrialSink,
}

/// A single-trial presentation plugin driven by discrete events
pub trait Plugin {
    fn name(&self) -> &'static str;
    fn start(&mut self, services: &mut TrialServices<'_>);
    fn handle(&mut self, event: TrialEvent, services: &mut TrialServices<'_>);
    fn state(&self) -> TrialState;

    fn is_done(&self) -> bool {
        self.state() == TrialState::Done
    }
}

/// Timers of one trial that have not fired yet
#[derive(Debug, Default)]
pub struct TimerSet {
    live: Vec<(TimerHandle, TrialTimer)>,
}

impl TimerSet {
    pub fn insert(&mut self, handle: TimerHandle, timer: TrialTimer) {
        self.live.push((handle, timer));
    }

    /// Forgets a timer that just fired. False if it was not ours.
    pub fn fired(&mut self, handle: TimerHandle) -> bool {
        match self.live.iter().position(|(h, _)| *h == handle) {
            Some(idx) => {
                self.live.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, timer: TrialTimer) -> bool {
        self.live.iter().any(|(_, t)| *t == timer)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn cancel_all<T>(&mut self, timers: &mut T)
    where
        T: TimerService<TrialTimer> + ?Sized,
    {
        for (handle, timer) in self.live.drain(..) {
            let cancelled = timers.cancel(handle);
            trace!(?timer, cancelled, "cancelled pending timer");
        }
    }
}

/// State, timers and listener shared by every plugin, plus the
/// exactly-once finalize procedure.
#[derive(Debug, Default)]
pub struct TrialLifecycle {
    state: TrialState,
    timers: TimerSet,
    listener: Option<ListenerHandle>,
    started_ns: u64,
}

impl TrialLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// IDLE -> RUNNING. A second start is ignored.
    pub fn begin(&mut self, services: &mut TrialServices<'_>) -> bool {
        if self.state != TrialState::Idle {
            warn!(state = ?self.state, "trial already started");
            return false;
        }
        self.state = TrialState::Running;
        self.started_ns = services.timers.now_ns();
        true
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TrialState::Running
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn listener(&self) -> Option<ListenerHandle> {
        self.listener
    }

    pub fn schedule(&mut self, services: &mut TrialServices<'_>, delay_ms: u64, timer: TrialTimer) {
        let handle = services.timers.schedule(delay_ms, timer);
        self.timers.insert(handle, timer);
    }

    /// Registers a response listener unless `choices` is `NoKeys`.
    pub fn listen(&mut self, services: &mut TrialServices<'_>, choices: &KeyChoices) {
        if choices.is_none() {
            return;
        }
        self.listener = Some(services.responses.register_listener(choices));
    }

    /// Passes `event` through only while running. Timer events are also
    /// removed from the pending set; unknown timers are dropped.
    pub fn accept(&mut self, event: TrialEvent) -> Option<TrialEvent> {
        if !self.is_running() {
            trace!(?event, state = ?self.state, "event ignored outside running trial");
            return None;
        }
        if let TrialEvent::Timer { handle, timer } = &event {
            if !self.timers.fired(*handle) {
                trace!(?timer, handle = handle.0, "unknown timer ignored");
                return None;
            }
        }
        Some(event)
    }

    /// Milliseconds since `begin`, rounded.
    pub fn elapsed_ms(&self, services: &TrialServices<'_>) -> u64 {
        let ns = services.timers.now_ns().saturating_sub(self.started_ns);
        (ns as f64 / 1_000_000.0).round() as u64
    }

    /// Cancels pending work, builds the trial data, clears the display and
    /// hands the data to the sink. Only the first call while running has any
    /// effect; returns whether this call finalized.
    pub fn finalize<F>(&mut self, services: &mut TrialServices<'_>, build: F) -> bool
    where
        F: FnOnce() -> TrialData,
    {
        if !self.is_running() {
            trace!(state = ?self.state, "finalize ignored");
            return false;
        }
        self.state = TrialState::Finalizing;

        self.timers.cancel_all(&mut *services.timers);
        if let Some(listener) = self.listener.take() {
            services.responses.cancel_listener(listener);
        }

        let data = build();
        debug!(response = ?data.response(), "trial finalized");

        services.surface.clear();
        services.sink.finish(data);
        self.state = TrialState::Done;
        true
    }
}
