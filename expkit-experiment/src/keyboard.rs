use std::collections::BTreeMap;

use expkit_core::{KeyChoices, KeyMatch, ListenerHandle, ResponseService};
use expkit_timing::Clock;
use tracing::trace;

#[derive(Debug)]
struct Listener {
    choices: KeyChoices,
    onset_ns: u64,
}

/// Keyboard listener registry. Reaction times are measured from the moment
/// the listener was registered.
#[derive(Debug)]
pub struct KeyboardService<C: Clock> {
    clock: C,
    case_sensitive: bool,
    listeners: BTreeMap<ListenerHandle, Listener>,
    next_id: u64,
}

impl<C: Clock> KeyboardService<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            case_sensitive: false,
            listeners: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers a key press to the oldest listener that accepts it.
    /// Keys are lowercased unless matching is case-sensitive.
    pub fn press(&mut self, key: &str) -> Option<KeyMatch> {
        let now = self.clock.now_ns();
        let case_sensitive = self.case_sensitive;
        let (handle, listener) = self
            .listeners
            .iter()
            .find(|(_, l)| l.choices.allows(key, case_sensitive))?;

        let key = if case_sensitive {
            key.to_owned()
        } else {
            key.to_lowercase()
        };
        let rt_ms = now.saturating_sub(listener.onset_ns) as f64 / 1_000_000.0;
        trace!(listener = handle.0, %key, rt_ms, "key matched");
        Some(KeyMatch { key, rt_ms })
    }
}

impl<C: Clock> ResponseService for KeyboardService<C> {
    fn register_listener(&mut self, choices: &KeyChoices) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.listeners.insert(
            handle,
            Listener {
                choices: choices.clone(),
                onset_ns: self.clock.now_ns(),
            },
        );
        handle
    }

    fn cancel_listener(&mut self, handle: ListenerHandle) {
        self.listeners.remove(&handle);
    }
}
