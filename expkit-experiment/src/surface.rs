use std::collections::{BTreeMap, BTreeSet};

use expkit_core::PresentationSurface;
use tracing::debug;

/// In-memory display: the current markup plus per-element hidden and class state
#[derive(Debug, Default)]
pub struct MarkupSurface {
    markup: String,
    hidden: BTreeSet<String>,
    classes: BTreeMap<String, BTreeSet<String>>,
    mutations: u64,
}

impl MarkupSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw markup as rendered and appended, without hidden/class state.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    pub fn contains_element(&self, id: &str) -> bool {
        self.markup.contains(&format!("id='{id}'")) || self.markup.contains(&format!("id=\"{id}\""))
    }

    pub fn is_hidden(&self, id: &str) -> bool {
        self.hidden.contains(id)
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.classes.get(id).is_some_and(|c| c.contains(class))
    }

    /// Number of calls that changed the display.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Markup with `hidden` and `class` attributes applied to tagged elements.
    pub fn snapshot(&self) -> String {
        let mut html = self.markup.clone();
        let ids: BTreeSet<&String> = self.hidden.iter().chain(self.classes.keys()).collect();
        for id in ids {
            let mut attrs = String::new();
            if self.hidden.contains(id.as_str()) {
                attrs.push_str(" hidden");
            }
            if let Some(classes) = self.classes.get(id.as_str()) {
                let joined: Vec<&str> = classes.iter().map(String::as_str).collect();
                attrs.push_str(&format!(" class='{}'", joined.join(" ")));
            }
            for quoted in [format!("id='{id}'"), format!("id=\"{id}\"")] {
                if let Some(pos) = html.find(&quoted) {
                    html.insert_str(pos + quoted.len(), &attrs);
                    break;
                }
            }
        }
        html
    }
}

impl PresentationSurface for MarkupSurface {
    fn render(&mut self, html: &str) {
        self.markup = html.to_owned();
        self.hidden.clear();
        self.classes.clear();
        self.mutations += 1;
        debug!(bytes = html.len(), "render");
    }

    fn append_render(&mut self, html: &str) {
        self.markup.push_str(html);
        self.mutations += 1;
        debug!(bytes = html.len(), "append");
    }

    fn clear(&mut self) {
        self.markup.clear();
        self.hidden.clear();
        self.classes.clear();
        self.mutations += 1;
        debug!("clear");
    }

    fn set_hidden(&mut self, element_id: &str) {
        if self.hidden.insert(element_id.to_owned()) {
            self.mutations += 1;
            debug!(element_id, "hide");
        }
    }

    fn add_class(&mut self, element_id: &str, class: &str) {
        let inserted = self
            .classes
            .entry(element_id.to_owned())
            .or_default()
            .insert(class.to_owned());
        if inserted {
            self.mutations += 1;
        }
    }
}
