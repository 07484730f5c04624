use crate::keys::KeyChoices;
use crate::trial::TrialData;

/// Display area a plugin draws into
pub trait PresentationSurface {
    /// Replaces everything on screen.
    fn render(&mut self, html: &str);
    /// Appends markup after the current content.
    fn append_render(&mut self, html: &str);
    fn clear(&mut self);
    fn set_hidden(&mut self, element_id: &str);
    /// Adding a class twice leaves the element unchanged.
    fn add_class(&mut self, element_id: &str, class: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(pub u64);

/// Keyboard listener registry
pub trait ResponseService {
    /// `choices` is never `NoKeys`; callers skip registration instead.
    fn register_listener(&mut self, choices: &KeyChoices) -> ListenerHandle;
    fn cancel_listener(&mut self, handle: ListenerHandle);
}

/// Receives the data of a finished trial
pub trait TrialSink {
    fn finish(&mut self, data: TrialData);
}

impl TrialSink for Vec<TrialData> {
    fn finish(&mut self, data: TrialData) {
        self.push(data);
    }
}
