use tracing::{debug, warn};
use uuid::Uuid;

use crate::message::command::{ContentCommand, ContentReply, ExtensionMessage, StyleMap};
use crate::overlay::overlay_model::OverlayElement;
use crate::watchdog::breaker::{BreakerState, MutationBreaker};
use crate::watchdog::dom::{ElementHandle, MutationRecord, OverlayDom};

/// Baseline isolation styles for every overlay container.
pub fn default_container_styles() -> StyleMap {
    let mut styles = StyleMap::new();
    styles.insert("all".to_string(), "initial".to_string());
    styles.insert("position".to_string(), "fixed".to_string());
    styles.insert("display".to_string(), "block".to_string());
    styles.insert("z-index".to_string(), "2147483647".to_string());
    styles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Container {
    handle: ElementHandle,
    attached: bool,
}

/// Owns the overlay containers in the top frame and repairs page tampering.
///
/// The host feeds it content commands and observer callbacks; anything it
/// needs to tell the coordinator is queued in the outbox.
#[derive(Debug)]
pub struct InlineMenuWatchdog {
    button: Option<Container>,
    list: Option<Container>,
    is_button_visible: bool,
    is_list_visible: bool,
    observing_body: bool,
    breaker: MutationBreaker,
    outbox: Vec<ExtensionMessage>,
}

impl Default for InlineMenuWatchdog {
    fn default() -> Self {
        Self::new(MutationBreaker::default())
    }
}

impl InlineMenuWatchdog {
    pub fn new(breaker: MutationBreaker) -> Self {
        Self {
            button: None,
            list: None,
            is_button_visible: false,
            is_list_visible: false,
            observing_body: false,
            breaker,
            outbox: Vec::new(),
        }
    }

    pub fn button_handle(&self) -> Option<ElementHandle> {
        self.button.map(|c| c.handle)
    }

    pub fn list_handle(&self) -> Option<ElementHandle> {
        self.list.map(|c| c.handle)
    }

    pub fn is_button_visible(&self) -> bool {
        self.is_button_visible
    }

    pub fn is_list_visible(&self) -> bool {
        self.is_list_visible
    }

    pub fn is_observing_body(&self) -> bool {
        self.observing_body
    }

    pub fn breaker(&self) -> &MutationBreaker {
        &self.breaker
    }

    pub fn take_outbox(&mut self) -> Vec<ExtensionMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn is_overlay_element(&self, element: ElementHandle) -> bool {
        self.button_handle() == Some(element) || self.list_handle() == Some(element)
    }

    /// Handles the commands addressed to the top frame's overlay containers.
    /// Anything else is not ours and yields `None`.
    pub fn handle_command(
        &mut self,
        dom: &mut dyn OverlayDom,
        command: &ContentCommand,
    ) -> Option<ContentReply> {
        match command {
            ContentCommand::AppendInlineMenuElements { overlay_element } => {
                self.append_element(dom, *overlay_element);
                Some(ContentReply::Ack)
            }
            ContentCommand::CloseInlineMenu { overlay_element } => {
                self.remove_inline_menu(dom, *overlay_element);
                Some(ContentReply::Ack)
            }
            ContentCommand::ToggleInlineMenuHidden { is_hidden, .. } => {
                self.toggle_hidden(*is_hidden);
                Some(ContentReply::Ack)
            }
            ContentCommand::CheckIsInlineMenuButtonVisible => {
                Some(ContentReply::Visible(self.is_button_visible))
            }
            ContentCommand::CheckIsInlineMenuListVisible => {
                Some(ContentReply::Visible(self.is_list_visible))
            }
            _ => None,
        }
    }

    fn toggle_hidden(&mut self, is_hidden: bool) {
        self.is_button_visible = self.button.is_some_and(|c| c.attached) && !is_hidden;
        self.is_list_visible = self.list.is_some_and(|c| c.attached) && !is_hidden;
    }

    fn append_element(&mut self, dom: &mut dyn OverlayDom, element: OverlayElement) {
        let container = match element {
            OverlayElement::Button => &mut self.button,
            OverlayElement::List => &mut self.list,
        };

        let handle = match container {
            Some(existing) => existing.handle,
            None => {
                let handle = dom.create_element(&random_container_name());
                dom.set_styles(handle, &default_container_styles());
                *container = Some(Container {
                    handle,
                    attached: false,
                });
                handle
            }
        };

        let visible = match element {
            OverlayElement::Button => &mut self.is_button_visible,
            OverlayElement::List => &mut self.is_list_visible,
        };
        if *visible {
            return;
        }

        self.observing_body = true;
        dom.append_to_body(handle);
        *visible = true;
        if let Some(c) = container.as_mut() {
            c.attached = true;
        }
        debug!(element = %element, "overlay container appended");
    }

    /// Closes one container, or both when `element` is `None` (which also stops
    /// watching `<body>`).
    pub fn remove_inline_menu(&mut self, dom: &mut dyn OverlayDom, element: Option<OverlayElement>) {
        match element {
            Some(element) => self.remove_element(dom, element),
            None => {
                self.observing_body = false;
                self.remove_element(dom, OverlayElement::Button);
                self.remove_element(dom, OverlayElement::List);
            }
        }
    }

    fn remove_element(&mut self, dom: &mut dyn OverlayDom, element: OverlayElement) {
        let (container, visible) = match element {
            OverlayElement::Button => (&mut self.button, &mut self.is_button_visible),
            OverlayElement::List => (&mut self.list, &mut self.is_list_visible),
        };

        let Some(c) = container.as_mut().filter(|c| c.attached) else {
            return;
        };

        dom.remove(c.handle);
        c.attached = false;
        *visible = false;
        self.outbox.push(ExtensionMessage::AutofillOverlayElementClosed {
            overlay_element: element,
        });
    }

    // ========================================================================
    // Observer callbacks
    // ========================================================================

    /// Attribute changes on the overlay containers.
    pub fn on_element_mutations(
        &mut self,
        dom: &mut dyn OverlayDom,
        records: &[MutationRecord],
        now_ms: u64,
    ) {
        if self.button.is_none() && self.list.is_none() {
            return;
        }

        if self.trip_on_excessive_mutations(dom, now_ms) {
            return;
        }

        for record in records {
            let MutationRecord::Attributes {
                target,
                attribute_name,
            } = record
            else {
                continue;
            };
            if !self.is_overlay_element(*target) {
                continue;
            }

            if attribute_name != "style" {
                strip_foreign_attributes(dom, *target);
                continue;
            }

            dom.remove_attribute(*target, "style");
            dom.set_styles(*target, &default_container_styles());
        }
    }

    /// Child-list changes on `<body>`. Keeps the button directly before the
    /// list, with the list as the last child.
    pub fn on_body_mutations(&mut self, dom: &mut dyn OverlayDom, now_ms: u64) {
        if !self.observing_body || (self.button.is_none() && self.list.is_none()) {
            return;
        }

        if self.trip_on_excessive_mutations(dom, now_ms) {
            return;
        }

        let (second_to_last, last) = dom.last_body_children();
        let Some(last) = last else {
            return;
        };

        let button = self.button.filter(|c| c.attached).map(|c| c.handle);
        let list = self.list.filter(|c| c.attached).map(|c| c.handle);

        let in_order = match (button, list) {
            (Some(button), Some(list)) => {
                (last == list && second_to_last == Some(button))
                    || (last == button && !self.is_list_visible)
            }
            (Some(button), None) => last == button,
            (None, Some(list)) => last == list,
            (None, None) => true,
        };
        if in_order {
            return;
        }

        // Re-appending moves both containers past every page element in one pass,
        // however many were inserted after them.
        if let Some(button) = button {
            dom.append_to_body(button);
        }
        if let Some(list) = list {
            dom.append_to_body(list);
        }
    }

    fn trip_on_excessive_mutations(&mut self, dom: &mut dyn OverlayDom, now_ms: u64) -> bool {
        if self.breaker.record(now_ms) == BreakerState::Armed {
            return false;
        }

        warn!("excessive DOM mutations on overlay containers, closing inline menu");
        self.outbox.push(ExtensionMessage::BlurMostRecentOverlayField);
        self.remove_inline_menu(dom, None);
        true
    }

    pub fn destroy(&mut self, dom: &mut dyn OverlayDom) {
        self.remove_inline_menu(dom, None);
        self.breaker.reset();
    }
}

fn strip_foreign_attributes(dom: &mut dyn OverlayDom, element: ElementHandle) {
    for name in dom.attribute_names(element) {
        if name != "style" {
            dom.remove_attribute(element, &name);
        }
    }
}

/// Custom element names must contain a hyphen.
fn random_container_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("overlay-{}", &id[..12])
}
