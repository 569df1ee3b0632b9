use std::collections::BTreeSet;

use tracing::debug;

use crate::content::document::PageDocument;
use crate::field::field_model::PageDetails;
use crate::field::qualification::FieldQualifier;
use crate::frame::frame_model::{FrameId, FrameOffset, TabId};
use crate::frame::geometry::{RelayEnvelope, RelayStep, find_iframe_by_src, iframe_offset, relay_step};
use crate::frame::resolver::MAX_FRAME_DEPTH;
use crate::message::command::{ContentCommand, ContentReply, ExtensionMessage, ExtensionReply};
use crate::message::host::{ExtensionChannel, query_flag};
use crate::overlay::overlay_model::{
    AuthStatus, FocusDirection, FocusedFieldData, InlineMenuVisibility, OverlayElement,
};
use crate::overlay::policy::{
    FocusContext, OpenTarget, decide_focus_action, should_hide_list_on_filled_field,
};
use crate::schedule::DebounceTimer;

pub const COLLECT_PAGE_DETAILS_DELAY_MS: u64 = 250;
pub const SUB_FRAME_REBUILD_DELAY_MS: u64 = 150;
pub const REPOSITION_SETTLE_MS: u64 = 750;
pub const FADE_IN_MS: u64 = 50;
pub const DELAYED_CLOSE_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverTimings {
    pub collect_page_details_delay_ms: u64,
    pub sub_frame_rebuild_delay_ms: u64,
    pub reposition_settle_ms: u64,
    pub fade_in_ms: u64,
    pub delayed_close_ms: u64,
}

impl Default for ObserverTimings {
    fn default() -> Self {
        Self {
            collect_page_details_delay_ms: COLLECT_PAGE_DETAILS_DELAY_MS,
            sub_frame_rebuild_delay_ms: SUB_FRAME_REBUILD_DELAY_MS,
            reposition_settle_ms: REPOSITION_SETTLE_MS,
            fade_in_ms: FADE_IN_MS,
            delayed_close_ms: DELAYED_CLOSE_MS,
        }
    }
}

/// Answer to `getSubFrameOffsets`: where the iframe hosting `sub_frame_url`
/// sits in this document. Unknown or ambiguous iframes give `None`.
pub fn sub_frame_offset(doc: &dyn PageDocument, sub_frame_url: &str) -> Option<FrameOffset> {
    let iframes = doc.iframes();
    find_iframe_by_src(&iframes, sub_frame_url).map(|iframe| iframe_offset(iframe, sub_frame_url, None))
}

/// Page-side half of the protocol, one per frame.
///
/// Wires qualifying login fields, reports focus and geometry to the
/// coordinator, and answers the coordinator's frame-level commands.
#[derive(Debug)]
pub struct PageObserver {
    timings: ObserverTimings,
    qualifier: FieldQualifier,
    max_relay_hops: usize,

    page_details: Option<PageDetails>,
    watched_fields: BTreeSet<String>,
    most_recent_field: Option<String>,
    focused_field_data: Option<FocusedFieldData>,
    visibility: Option<InlineMenuVisibility>,

    collect_timer: DebounceTimer,
    rebuild_timer: DebounceTimer,
    settle_timer: DebounceTimer,
    fade_in_timer: DebounceTimer,
    delayed_close_timer: DebounceTimer,

    relay_requests: Vec<RelayEnvelope>,
    fill_requests: Vec<String>,
    unlock_popout_requested: bool,
}

impl Default for PageObserver {
    fn default() -> Self {
        Self::new(ObserverTimings::default())
    }
}

impl PageObserver {
    pub fn new(timings: ObserverTimings) -> Self {
        Self {
            timings,
            qualifier: FieldQualifier::new(),
            max_relay_hops: MAX_FRAME_DEPTH,
            page_details: None,
            watched_fields: BTreeSet::new(),
            most_recent_field: None,
            focused_field_data: None,
            visibility: None,
            collect_timer: DebounceTimer::new(),
            rebuild_timer: DebounceTimer::new(),
            settle_timer: DebounceTimer::new(),
            fade_in_timer: DebounceTimer::new(),
            delayed_close_timer: DebounceTimer::new(),
            relay_requests: Vec::new(),
            fill_requests: Vec::new(),
            unlock_popout_requested: false,
        }
    }

    pub fn with_max_relay_hops(mut self, max_relay_hops: usize) -> Self {
        self.max_relay_hops = max_relay_hops;
        self
    }

    pub fn watched_fields(&self) -> Vec<String> {
        self.watched_fields.iter().cloned().collect()
    }

    pub fn most_recent_field(&self) -> Option<&str> {
        self.most_recent_field.as_deref()
    }

    pub fn focused_field_data(&self) -> Option<&FocusedFieldData> {
        self.focused_field_data.as_ref()
    }

    pub fn visibility(&self) -> Option<InlineMenuVisibility> {
        self.visibility
    }

    pub fn page_details(&self) -> Option<&PageDetails> {
        self.page_details.as_ref()
    }

    pub fn fill_requests(&self) -> &[String] {
        &self.fill_requests
    }

    pub fn unlock_popout_requested(&self) -> bool {
        self.unlock_popout_requested
    }

    /// True while any timer is still pending.
    pub fn has_pending_timers(&self) -> bool {
        [
            &self.collect_timer,
            &self.rebuild_timer,
            &self.settle_timer,
            &self.fade_in_timer,
            &self.delayed_close_timer,
        ]
        .iter()
        .any(|timer| timer.is_armed())
    }

    /// Window relay messages this frame wants posted to its parent window.
    pub fn take_relay_requests(&mut self) -> Vec<RelayEnvelope> {
        std::mem::take(&mut self.relay_requests)
    }

    // ========================================================================
    // Lifecycle and timers
    // ========================================================================

    /// Schedules the delayed page scan that lets late-rendering content settle.
    pub fn page_loaded(&mut self, now_ms: u64) {
        self.collect_timer
            .arm(now_ms, self.timings.collect_page_details_delay_ms);
    }

    pub fn tick(&mut self, channel: &mut dyn ExtensionChannel, doc: &mut dyn PageDocument, now_ms: u64) {
        if self.collect_timer.fire_if_due(now_ms) {
            let details = doc.collect_page_details();
            channel.send_extension_message(ExtensionMessage::CollectPageDetailsResponse {
                details: details.clone(),
            });
            self.set_page_details(channel, doc, details);
        }

        if self.rebuild_timer.fire_if_due(now_ms) {
            channel.send_extension_message(ExtensionMessage::RebuildSubFrameOffsets);
        }

        if self.settle_timer.fire_if_due(now_ms) {
            self.trigger_reposition_updates(channel, doc, now_ms);
        }

        if self.fade_in_timer.fire_if_due(now_ms) {
            self.toggle_hidden(channel, false, false);
            if self.hide_list_on_filled_field(channel, doc) {
                close_list(channel);
            }
        }

        if self.delayed_close_timer.fire_if_due(now_ms) {
            close_all(channel);
        }
    }

    pub fn teardown(&mut self) {
        self.collect_timer.cancel();
        self.rebuild_timer.cancel();
        self.settle_timer.cancel();
        self.fade_in_timer.cancel();
        self.delayed_close_timer.cancel();
        self.watched_fields.clear();
        self.most_recent_field = None;
        self.relay_requests.clear();
    }

    /// Installs a new snapshot and wires every field that belongs to a login form.
    pub fn set_page_details(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        details: PageDetails,
    ) {
        self.watched_fields.clear();
        let qualifying: Vec<String> = details
            .fields
            .iter()
            .filter(|field| field.viewable && !self.qualifier.is_ignored_field(field))
            .filter(|field| self.qualifier.is_field_for_login_form(field, &details))
            .map(|field| field.opid.clone())
            .collect();
        self.page_details = Some(details);

        if qualifying.is_empty() {
            return;
        }

        if self.visibility.is_none() {
            let reply = channel.send_extension_message(ExtensionMessage::GetAutofillInlineMenuVisibility);
            self.visibility = Some(match reply {
                Some(ExtensionReply::Visibility(visibility)) => visibility,
                _ => InlineMenuVisibility::OnFieldFocus,
            });
        }

        let active = doc.active_field();
        for opid in qualifying {
            self.watched_fields.insert(opid.clone());
            if self.most_recent_field.is_none() {
                self.update_most_recent_field(channel, doc, &opid);
            }
            if active.as_deref() == Some(opid.as_str()) {
                self.field_focused(channel, doc, &opid);
            }
        }
        debug!(fields = self.watched_fields.len(), "login fields wired");
    }

    // ========================================================================
    // Field events
    // ========================================================================

    pub fn field_focused(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        opid: &str,
    ) {
        if !self.watched_fields.contains(opid) {
            return;
        }

        if query_flag(channel, ExtensionMessage::CheckIsFieldCurrentlyFilling) {
            return;
        }

        channel.send_extension_message(ExtensionMessage::UpdateIsFieldCurrentlyFocused {
            is_field_currently_focused: true,
        });
        self.settle_timer.cancel();

        let previous = self.most_recent_field.clone();
        self.update_most_recent_field(channel, doc, opid);

        let field_has_value = !doc.field_value(opid).is_empty();
        let ciphers_populated =
            field_has_value && query_flag(channel, ExtensionMessage::CheckIsInlineMenuCiphersPopulated);
        let context = FocusContext {
            auth_status: self.auth_status(channel),
            visibility: self.visibility.unwrap_or_default(),
            field_has_value,
            focus_moved: previous.as_deref() != Some(opid),
            ciphers_populated,
        };

        let decision = decide_focus_action(&context);
        if decision.close_list {
            close_list(channel);
        }

        match decision.open {
            OpenTarget::Nothing => {}
            OpenTarget::Button => update_position(channel, OverlayElement::Button),
            OpenTarget::ButtonAndList => {
                channel.send_extension_message(ExtensionMessage::OpenAutofillInlineMenu {
                    is_opening_full_inline_menu: false,
                });
            }
        }
    }

    pub fn field_input(&mut self, channel: &mut dyn ExtensionChannel, doc: &mut dyn PageDocument, opid: &str) {
        if !self.watched_fields.contains(opid) {
            return;
        }

        if self.most_recent_field.as_deref() != Some(opid) {
            self.update_most_recent_field(channel, doc, opid);
        }

        if self.hide_list_on_filled_field(channel, doc) {
            close_list(channel);
            return;
        }

        self.open_inline_menu(channel, false);
    }

    pub fn field_blurred(&mut self, channel: &mut dyn ExtensionChannel) {
        channel.send_extension_message(ExtensionMessage::UpdateIsFieldCurrentlyFocused {
            is_field_currently_focused: false,
        });
    }

    pub fn field_keyup(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        key: &str,
        now_ms: u64,
    ) {
        match key {
            "Escape" => close_all(channel),
            "Enter" => {
                if !query_flag(channel, ExtensionMessage::CheckIsFieldCurrentlyFilling) {
                    self.scroll_or_resize(channel, now_ms);
                }
            }
            "ArrowDown" => self.focus_inline_menu_list(channel, doc),
            _ => {}
        }
    }

    fn focus_inline_menu_list(&mut self, channel: &mut dyn ExtensionChannel, doc: &mut dyn PageDocument) {
        if let Some(opid) = self.most_recent_field.clone() {
            if !query_flag(channel, ExtensionMessage::CheckIsInlineMenuListVisible) {
                self.update_most_recent_field(channel, doc, &opid);
                self.open_inline_menu(channel, true);
            }
        }

        channel.send_extension_message(ExtensionMessage::FocusAutofillInlineMenuList);
    }

    /// Scroll or resize: offsets of nested frames are stale, and visible
    /// overlays are hidden until the page settles.
    pub fn scroll_or_resize(&mut self, channel: &mut dyn ExtensionChannel, now_ms: u64) {
        self.rebuild_timer
            .arm(now_ms, self.timings.sub_frame_rebuild_delay_ms);

        let button_visible = query_flag(channel, ExtensionMessage::CheckIsInlineMenuButtonVisible);
        if !button_visible && !query_flag(channel, ExtensionMessage::CheckIsInlineMenuListVisible) {
            return;
        }

        self.toggle_hidden(channel, true, false);
        self.settle_timer
            .arm(now_ms, self.timings.reposition_settle_ms);
    }

    /// The document became hidden; a backgrounded page keeps no overlay.
    pub fn visibility_changed(&mut self, channel: &mut dyn ExtensionChannel, document_visible: bool) {
        if document_visible || self.most_recent_field.is_none() {
            return;
        }

        self.most_recent_field = None;
        close_all(channel);
    }

    fn trigger_reposition_updates(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        now_ms: u64,
    ) {
        let Some(opid) = self.most_recent_field.clone() else {
            return;
        };

        if doc.active_field().as_deref() != Some(opid.as_str()) {
            self.toggle_hidden(channel, false, true);
            close_all(channel);
            return;
        }

        self.update_most_recent_field(channel, doc, &opid);
        update_position(channel, OverlayElement::Button);
        update_position(channel, OverlayElement::List);
        self.fade_in_timer.arm(now_ms, self.timings.fade_in_ms);

        if !self.is_focused_field_within_viewport(doc) {
            close_all(channel);
        }
    }

    fn is_focused_field_within_viewport(&self, doc: &dyn PageDocument) -> bool {
        self.focused_field_data
            .as_ref()
            .map(|data| data.focused_field_rects.top)
            .is_some_and(|top| top > 0.0 && top < doc.viewport_bottom())
    }

    // ========================================================================
    // Coordinator commands
    // ========================================================================

    /// Handles a command the coordinator addressed to this frame. Overlay
    /// container commands belong to the watchdog and yield `None`.
    pub fn handle_content_command(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        command: ContentCommand,
        now_ms: u64,
    ) -> Option<ContentReply> {
        match command {
            ContentCommand::CollectPageDetailsImmediately => {
                let details = doc.collect_page_details();
                self.set_page_details(channel, doc, details.clone());
                Some(ContentReply::PageDetails(details))
            }
            ContentCommand::GetSubFrameOffsets { sub_frame_url } => {
                Some(ContentReply::SubFrameOffset(sub_frame_offset(doc, &sub_frame_url)))
            }
            ContentCommand::GetSubFrameOffsetsFromWindowMessage { sub_frame_id } => {
                self.relay_requests
                    .push(RelayEnvelope::start(doc.url(), sub_frame_id));
                Some(ContentReply::Ack)
            }
            ContentCommand::BlurMostRecentOverlayField {
                is_removing_inline_menu,
            } => {
                if let Some(opid) = self.most_recent_field.clone() {
                    doc.blur_field(&opid);
                }
                if is_removing_inline_menu {
                    close_all(channel);
                }
                Some(ContentReply::Ack)
            }
            ContentCommand::RedirectInlineMenuFocusOut { direction } => {
                self.redirect_focus_out(channel, doc, direction, now_ms);
                Some(ContentReply::Ack)
            }
            ContentCommand::FillForm { cipher_id } => {
                self.fill_requests.push(cipher_id);
                Some(ContentReply::Ack)
            }
            ContentCommand::OpenUnlockPopout => {
                self.unlock_popout_requested = true;
                Some(ContentReply::Ack)
            }
            ContentCommand::UpdateInlineMenuVisibility { visibility } => {
                self.visibility = Some(visibility);
                Some(ContentReply::Ack)
            }
            ContentCommand::AppendInlineMenuElements { .. }
            | ContentCommand::CloseInlineMenu { .. }
            | ContentCommand::ToggleInlineMenuHidden { .. }
            | ContentCommand::CheckIsInlineMenuButtonVisible
            | ContentCommand::CheckIsInlineMenuListVisible => None,
        }
    }

    /// A relay message posted by the child window `source_frame`. Returns the
    /// envelope to post further up, if this is not the top frame.
    pub fn receive_relay(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &dyn PageDocument,
        envelope: RelayEnvelope,
        source_frame: FrameId,
    ) -> Option<RelayEnvelope> {
        let iframes = doc.iframes();
        match relay_step(envelope, &iframes, source_frame, doc.is_top_frame(), self.max_relay_hops) {
            RelayStep::Forward(envelope) => Some(envelope),
            RelayStep::Deliver(envelope) => {
                channel.send_extension_message(ExtensionMessage::UpdateSubFrameData {
                    sub_frame_data: envelope.into_offset(),
                });
                None
            }
            RelayStep::Stalled => {
                debug!(source = %source_frame, "window relay stalled");
                None
            }
        }
    }

    fn redirect_focus_out(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &mut dyn PageDocument,
        direction: FocusDirection,
        now_ms: u64,
    ) {
        let Some(current) = self.most_recent_field.clone() else {
            return;
        };
        if !query_flag(channel, ExtensionMessage::CheckIsInlineMenuButtonVisible) {
            return;
        }

        if direction == FocusDirection::Current {
            doc.focus_field(&current);
            self.delayed_close_timer
                .arm(now_ms, self.timings.delayed_close_ms);
            return;
        }

        let Some(target) = self.adjacent_field(&current, direction) else {
            return;
        };
        doc.focus_field(&target);
    }

    /// The focusable field before or after `opid` in document order.
    fn adjacent_field(&self, opid: &str, direction: FocusDirection) -> Option<String> {
        let details = self.page_details.as_ref()?;
        let mut focusable: Vec<_> = details
            .fields
            .iter()
            .filter(|f| f.viewable && !f.disabled)
            .collect();
        focusable.sort_by_key(|f| f.element_number);

        let index = focusable.iter().position(|f| f.opid == opid)?;
        let target = match direction {
            FocusDirection::Previous => index.checked_sub(1)?,
            FocusDirection::Next => index + 1,
            FocusDirection::Current => index,
        };
        focusable.get(target).map(|f| f.opid.clone())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn update_most_recent_field(
        &mut self,
        channel: &mut dyn ExtensionChannel,
        doc: &dyn PageDocument,
        opid: &str,
    ) {
        let Some(rect) = doc.field_rect(opid) else {
            return;
        };

        self.most_recent_field = Some(opid.to_string());
        // tab and frame are stamped by the coordinator from the sender identity
        let data = FocusedFieldData {
            tab_id: TabId(0),
            frame_id: FrameId::TOP,
            focused_field_rects: rect,
            focused_field_styles: doc.field_styles(opid),
            frame_url: doc.url().to_string(),
        };
        self.focused_field_data = Some(data.clone());
        channel.send_extension_message(ExtensionMessage::UpdateFocusedFieldData {
            focused_field_data: data,
        });
    }

    fn open_inline_menu(&mut self, channel: &mut dyn ExtensionChannel, full: bool) {
        if self.most_recent_field.is_none() {
            return;
        }

        if self.visibility == Some(InlineMenuVisibility::OnButtonClick) && !full {
            update_position(channel, OverlayElement::Button);
            return;
        }

        update_position(channel, OverlayElement::Button);
        update_position(channel, OverlayElement::List);
    }

    fn hide_list_on_filled_field(&self, channel: &mut dyn ExtensionChannel, doc: &dyn PageDocument) -> bool {
        let Some(opid) = self.most_recent_field.as_deref() else {
            return false;
        };
        let has_value = !doc.field_value(opid).is_empty();
        if !has_value {
            return false;
        }

        let populated = query_flag(channel, ExtensionMessage::CheckIsInlineMenuCiphersPopulated);
        should_hide_list_on_filled_field(has_value, populated, self.auth_status(channel))
    }

    fn auth_status(&self, channel: &mut dyn ExtensionChannel) -> AuthStatus {
        match channel.send_extension_message(ExtensionMessage::GetAuthStatus) {
            Some(ExtensionReply::AuthStatus(status)) => status,
            _ => AuthStatus::LoggedOut,
        }
    }

    fn toggle_hidden(&self, channel: &mut dyn ExtensionChannel, is_hidden: bool, set_transparent: bool) {
        channel.send_extension_message(ExtensionMessage::UpdateAutofillOverlayHidden {
            is_hidden,
            set_transparent,
        });
    }
}

fn update_position(channel: &mut dyn ExtensionChannel, element: OverlayElement) {
    channel.send_extension_message(ExtensionMessage::UpdateAutofillOverlayPosition {
        overlay_element: element,
    });
}

fn close_list(channel: &mut dyn ExtensionChannel) {
    channel.send_extension_message(ExtensionMessage::CloseAutofillOverlay {
        overlay_element: Some(OverlayElement::List),
        force: true,
    });
}

fn close_all(channel: &mut dyn ExtensionChannel) {
    channel.send_extension_message(ExtensionMessage::CloseAutofillOverlay {
        overlay_element: None,
        force: true,
    });
}
