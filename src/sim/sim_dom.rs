use std::collections::{BTreeMap, HashMap};

use crate::message::command::StyleMap;
use crate::watchdog::dom::{ElementHandle, MutationRecord, OverlayDom};

#[derive(Debug, Clone, Default)]
struct SimElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    styles: StyleMap,
}

/// In-memory top-frame document body.
///
/// Changes made through `OverlayDom` are silent. Changes made through the
/// `page_*` methods play the hostile page and queue mutation records that the
/// host later hands to the watchdog.
#[derive(Debug, Default)]
pub struct SimDom {
    next_id: u64,
    elements: HashMap<ElementHandle, SimElement>,
    body: Vec<ElementHandle>,
    element_mutations: Vec<MutationRecord>,
    body_mutated: bool,
}

impl SimDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_children(&self) -> &[ElementHandle] {
        &self.body
    }

    pub fn tag(&self, element: ElementHandle) -> Option<&str> {
        self.elements.get(&element).map(|e| e.tag.as_str())
    }

    pub fn styles(&self, element: ElementHandle) -> StyleMap {
        self.elements
            .get(&element)
            .map(|e| e.styles.clone())
            .unwrap_or_default()
    }

    pub fn attribute(&self, element: ElementHandle, name: &str) -> Option<&str> {
        self.elements
            .get(&element)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    // ---- Page script ----

    /// The page appends its own element to `<body>`.
    pub fn page_append(&mut self, tag: &str) -> ElementHandle {
        let handle = self.create_element(tag);
        self.body.push(handle);
        self.body_mutated = true;
        handle
    }

    pub fn page_set_attribute(&mut self, element: ElementHandle, name: &str, value: &str) {
        let Some(target) = self.elements.get_mut(&element) else {
            return;
        };

        target.attributes.insert(name.to_string(), value.to_string());
        if name == "style" {
            target.styles.clear();
        }
        self.element_mutations
            .push(MutationRecord::attribute(element, name));
    }

    pub fn take_element_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.element_mutations)
    }

    pub fn take_body_mutated(&mut self) -> bool {
        std::mem::take(&mut self.body_mutated)
    }
}

fn render_styles(styles: &StyleMap) -> String {
    styles
        .iter()
        .map(|(name, value)| format!("{}: {} !important;", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

impl OverlayDom for SimDom {
    fn create_element(&mut self, tag: &str) -> ElementHandle {
        self.next_id += 1;
        let handle = ElementHandle(self.next_id);
        self.elements.insert(
            handle,
            SimElement {
                tag: tag.to_string(),
                ..SimElement::default()
            },
        );
        handle
    }

    fn append_to_body(&mut self, element: ElementHandle) {
        self.body.retain(|e| *e != element);
        self.body.push(element);
    }

    fn insert_before(&mut self, element: ElementHandle, reference: ElementHandle) {
        self.body.retain(|e| *e != element);
        match self.body.iter().position(|e| *e == reference) {
            Some(index) => self.body.insert(index, element),
            None => self.body.push(element),
        }
    }

    fn remove(&mut self, element: ElementHandle) {
        self.body.retain(|e| *e != element);
    }

    fn is_attached(&self, element: ElementHandle) -> bool {
        self.body.contains(&element)
    }

    fn set_styles(&mut self, element: ElementHandle, styles: &StyleMap) {
        if let Some(target) = self.elements.get_mut(&element) {
            target.styles = styles.clone();
            target
                .attributes
                .insert("style".to_string(), render_styles(styles));
        }
    }

    fn remove_attribute(&mut self, element: ElementHandle, name: &str) {
        if let Some(target) = self.elements.get_mut(&element) {
            target.attributes.remove(name);
            if name == "style" {
                target.styles.clear();
            }
        }
    }

    fn attribute_names(&self, element: ElementHandle) -> Vec<String> {
        self.elements
            .get(&element)
            .map(|e| e.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn last_body_children(&self) -> (Option<ElementHandle>, Option<ElementHandle>) {
        let last = self.body.last().copied();
        let second = self
            .body
            .len()
            .checked_sub(2)
            .and_then(|i| self.body.get(i))
            .copied();
        (second, last)
    }
}
