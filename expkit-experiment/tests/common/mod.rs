#![allow(dead_code)]

use std::time::Duration;

use expkit_core::TrialData;
use expkit_experiment::{
    KeyboardService, MarkupSurface, Plugin, TrialEvent, TrialServices, TrialTimer,
};
use expkit_timing::{Clock, ManualClock, Scheduler};

/// Drives one plugin by hand against a virtual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub scheduler: Scheduler<TrialTimer, ManualClock>,
    pub keyboard: KeyboardService<ManualClock>,
    pub surface: MarkupSurface,
    pub sink: Vec<TrialData>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::new();
        Self {
            scheduler: Scheduler::new(clock.clone()),
            keyboard: KeyboardService::new(clock.clone()),
            surface: MarkupSurface::new(),
            sink: Vec::new(),
            clock,
        }
    }

    pub fn services(&mut self) -> TrialServices<'_> {
        TrialServices {
            surface: &mut self.surface,
            timers: &mut self.scheduler,
            responses: &mut self.keyboard,
            sink: &mut self.sink,
        }
    }

    pub fn start(&mut self, plugin: &mut dyn Plugin) {
        plugin.start(&mut self.services());
    }

    /// Fires every timer due up to `ms` after the start, then parks the clock there.
    pub fn advance_to(&mut self, plugin: &mut dyn Plugin, ms: u64) {
        let target_ns = ms * 1_000_000;
        while let Some(deadline) = self.scheduler.next_deadline_ns() {
            if deadline > target_ns {
                break;
            }
            if deadline > self.clock.now_ns() {
                self.clock.set_ns(deadline);
            }
            if let Some(fired) = self.scheduler.pop_due() {
                let event = TrialEvent::Timer {
                    handle: fired.handle,
                    timer: fired.event,
                };
                plugin.handle(event, &mut self.services());
            }
        }
        if target_ns > self.clock.now_ns() {
            self.clock.sleep(Duration::from_nanos(target_ns - self.clock.now_ns()));
        }
    }

    /// Presses `key` at `ms`. Returns whether a listener took it.
    pub fn press_at(&mut self, plugin: &mut dyn Plugin, ms: u64, key: &str) -> bool {
        self.advance_to(plugin, ms);
        match self.keyboard.press(key) {
            Some(hit) => {
                plugin.handle(TrialEvent::Key(hit), &mut self.services());
                true
            }
            None => false,
        }
    }

    pub fn send(&mut self, plugin: &mut dyn Plugin, event: TrialEvent) {
        plugin.handle(event, &mut self.services());
    }
}
