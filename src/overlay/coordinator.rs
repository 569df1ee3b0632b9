use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info};

use crate::field::field_model::PageDetails;
use crate::frame::frame_model::{FrameId, FrameOffset, TabId};
use crate::frame::resolver::{MAX_FRAME_DEPTH, OffsetResolver};
use crate::message::command::{
    ContentCommand, ContentReply, ExtensionMessage, ExtensionReply, PortCommand, PortEnvelope,
    PortMessage, StyleMap,
};
use crate::message::host::{HostMessenger, MessageSender};
use crate::overlay::overlay_model::{
    AuthStatus, ElementState, FocusedFieldData, InlineMenuCipher, InlineMenuVisibility,
    OverlayElement,
};
use crate::overlay::policy::{OpenTarget, decide_open_target};
use crate::overlay::port_key::PortKey;
use crate::overlay::position::{button_position, list_position};
use crate::overlay::vault::VaultProvider;
use crate::schedule::{Clock, DebounceTimer};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

pub const OFFSET_RECOMPUTE_DEBOUNCE_MS: u64 = 650;

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub offset_recompute_debounce_ms: u64,
    pub max_frame_depth: usize,
    pub visibility: InlineMenuVisibility,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            offset_recompute_debounce_ms: OFFSET_RECOMPUTE_DEBOUNCE_MS,
            max_frame_depth: MAX_FRAME_DEPTH,
            visibility: InlineMenuVisibility::OnFieldFocus,
        }
    }
}

#[derive(Debug, Default)]
struct TabState {
    page_details: HashMap<FrameId, PageDetails>,
    port_key: Option<PortKey>,
    button: ElementState,
    list: ElementState,
    list_height: Option<f64>,
}

impl TabState {
    fn element(&self, element: OverlayElement) -> ElementState {
        match element {
            OverlayElement::Button => self.button,
            OverlayElement::List => self.list,
        }
    }

    fn element_mut(&mut self, element: OverlayElement) -> &mut ElementState {
        match element {
            OverlayElement::Button => &mut self.button,
            OverlayElement::List => &mut self.list,
        }
    }

    fn any_open(&self) -> bool {
        self.button.is_open() || self.list.is_open()
    }
}

/// Privileged owner of all per-tab overlay state.
///
/// Every inbound message goes through `handle_extension_message` (content
/// scripts) or `handle_port_message` (overlay UI fragments); nothing else
/// mutates the per-tab maps.
pub struct OverlayCoordinator {
    settings: CoordinatorSettings,
    clock: Rc<dyn Clock>,
    vault: Box<dyn VaultProvider>,
    tracer: TraceLogger,
    resolver: OffsetResolver,
    tabs: HashMap<TabId, TabState>,

    focused_field: Option<FocusedFieldData>,
    is_field_currently_focused: bool,
    is_field_currently_filling: bool,
    auth_status: AuthStatus,
    ciphers: HashMap<TabId, Vec<InlineMenuCipher>>,

    reposition_timer: DebounceTimer,
}

impl OverlayCoordinator {
    pub fn new(
        settings: CoordinatorSettings,
        clock: Rc<dyn Clock>,
        vault: Box<dyn VaultProvider>,
    ) -> Self {
        let auth_status = vault.auth_status();
        Self {
            resolver: OffsetResolver::new(settings.max_frame_depth),
            settings,
            clock,
            vault,
            tracer: TraceLogger::disabled(),
            tabs: HashMap::new(),
            focused_field: None,
            is_field_currently_focused: false,
            is_field_currently_filling: false,
            auth_status,
            ciphers: HashMap::new(),
            reposition_timer: DebounceTimer::new(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    // ---- Read-only views ----

    pub fn tracer(&self) -> &TraceLogger {
        &self.tracer
    }

    pub fn focused_field(&self) -> Option<&FocusedFieldData> {
        self.focused_field.as_ref()
    }

    pub fn is_field_currently_focused(&self) -> bool {
        self.is_field_currently_focused
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.auth_status
    }

    pub fn visibility(&self) -> InlineMenuVisibility {
        self.settings.visibility
    }

    pub fn element_state(&self, tab: TabId, element: OverlayElement) -> ElementState {
        self.tabs
            .get(&tab)
            .map(|state| state.element(element))
            .unwrap_or_default()
    }

    pub fn port_key(&self, tab: TabId) -> Option<&PortKey> {
        self.tabs.get(&tab).and_then(|state| state.port_key.as_ref())
    }

    pub fn page_details(&self, tab: TabId, frame: FrameId) -> Option<&PageDetails> {
        self.tabs.get(&tab).and_then(|state| state.page_details.get(&frame))
    }

    pub fn cached_offset(&self, tab: TabId, frame: FrameId) -> Option<&Option<FrameOffset>> {
        self.resolver.cached_offset(tab, frame)
    }

    pub fn ciphers(&self, tab: TabId) -> &[InlineMenuCipher] {
        self.ciphers.get(&tab).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_reposition_pending(&self) -> bool {
        self.reposition_timer.is_armed()
    }

    pub fn has_tab(&self, tab: TabId) -> bool {
        self.tabs.contains_key(&tab)
    }

    /// Offset of a frame, resolved through the host on a cache miss.
    pub fn resolve_offset(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        frame: FrameId,
        url: &str,
    ) -> Option<FrameOffset> {
        self.resolver.resolve_offset(host, tab, frame, url)
    }

    // ========================================================================
    // Content script messages
    // ========================================================================

    pub fn handle_extension_message(
        &mut self,
        host: &mut dyn HostMessenger,
        message: ExtensionMessage,
        sender: &MessageSender,
    ) -> Option<ExtensionReply> {
        let tab = sender.tab_id;
        debug!(tab = %tab, frame = %sender.frame_id, command = message.command_name(), "extension message");

        match message {
            ExtensionMessage::CollectPageDetails => self.collect_page_details(host, sender),
            ExtensionMessage::CollectPageDetailsResponse { details } => {
                self.store_page_details(host, sender, details);
                None
            }
            ExtensionMessage::UpdateFocusedFieldData { focused_field_data } => {
                self.set_focused_field_data(focused_field_data, sender);
                None
            }
            ExtensionMessage::UpdateIsFieldCurrentlyFocused {
                is_field_currently_focused,
            } => {
                self.is_field_currently_focused = is_field_currently_focused;
                None
            }
            ExtensionMessage::UpdateIsFieldCurrentlyFilling {
                is_field_currently_filling,
            } => {
                self.is_field_currently_filling = is_field_currently_filling;
                None
            }
            ExtensionMessage::UpdateSubFrameData { sub_frame_data } => {
                self.update_sub_frame_data(host, tab, sub_frame_data);
                None
            }
            ExtensionMessage::RebuildSubFrameOffsets => {
                self.rebuild_sub_frame_offsets(sender);
                None
            }
            ExtensionMessage::OpenAutofillInlineMenu {
                is_opening_full_inline_menu,
            } => {
                self.open_inline_menu(host, tab, is_opening_full_inline_menu);
                None
            }
            ExtensionMessage::UpdateAutofillOverlayPosition { overlay_element } => {
                if self.is_stale_focus(tab) {
                    self.trace_drop("updateAutofillOverlayPosition", tab, "stale focus");
                    return None;
                }
                self.update_overlay_position(host, tab, overlay_element);
                None
            }
            ExtensionMessage::UpdateAutofillOverlayHidden {
                is_hidden,
                set_transparent,
            } => {
                self.update_overlay_hidden(host, tab, is_hidden, set_transparent);
                None
            }
            ExtensionMessage::CloseAutofillOverlay {
                overlay_element,
                force,
            } => {
                self.close_overlay(host, tab, overlay_element, force);
                None
            }
            ExtensionMessage::AutofillOverlayElementClosed { overlay_element } => {
                self.overlay_element_closed(tab, overlay_element);
                None
            }
            ExtensionMessage::CheckIsInlineMenuButtonVisible => Some(ExtensionReply::Bool(
                self.probe_visibility(host, tab, ContentCommand::CheckIsInlineMenuButtonVisible),
            )),
            ExtensionMessage::CheckIsInlineMenuListVisible => Some(ExtensionReply::Bool(
                self.probe_visibility(host, tab, ContentCommand::CheckIsInlineMenuListVisible),
            )),
            ExtensionMessage::CheckIsFieldCurrentlyFilling => {
                Some(ExtensionReply::Bool(self.is_field_currently_filling))
            }
            ExtensionMessage::CheckIsInlineMenuCiphersPopulated => {
                Some(ExtensionReply::Bool(!self.ciphers(tab).is_empty()))
            }
            ExtensionMessage::GetAutofillInlineMenuVisibility => {
                Some(ExtensionReply::Visibility(self.settings.visibility))
            }
            ExtensionMessage::GetAuthStatus => {
                self.refresh_auth_status(host);
                Some(ExtensionReply::AuthStatus(self.auth_status))
            }
            ExtensionMessage::BlurMostRecentOverlayField => {
                self.blur_most_recent_field(host, tab, false);
                None
            }
            ExtensionMessage::FocusAutofillInlineMenuList => {
                if self.element_state(tab, OverlayElement::List).is_open() {
                    host.post_to_port(tab, OverlayElement::List, PortCommand::FocusInlineMenuList);
                }
                None
            }
            ExtensionMessage::UnlockCompleted => {
                self.refresh_auth_status(host);
                if self.auth_status == AuthStatus::Unlocked && !self.is_stale_focus(tab) {
                    self.open_inline_menu(host, tab, true);
                }
                None
            }
            ExtensionMessage::AuthStatusChanged => {
                self.refresh_auth_status(host);
                None
            }
        }
    }

    fn collect_page_details(
        &mut self,
        host: &mut dyn HostMessenger,
        sender: &MessageSender,
    ) -> Option<ExtensionReply> {
        let reply = host.send_to_frame(
            sender.tab_id,
            sender.frame_id,
            ContentCommand::CollectPageDetailsImmediately,
        );
        let Some(ContentReply::PageDetails(details)) = reply else {
            return None;
        };

        self.store_page_details(host, sender, details.clone());
        Some(ExtensionReply::PageDetails(details))
    }

    fn store_page_details(
        &mut self,
        host: &mut dyn HostMessenger,
        sender: &MessageSender,
        details: PageDetails,
    ) {
        let tab = sender.tab_id;
        let frame = sender.frame_id;
        let url = if details.url.is_empty() {
            sender.url.clone()
        } else {
            details.url.clone()
        };

        self.tabs
            .entry(tab)
            .or_default()
            .page_details
            .insert(frame, details);

        // Sub-frames get their offset built while the page is being scanned
        if !frame.is_top() {
            self.resolver.resolve_offset(host, tab, frame, &url);
        }
    }

    fn set_focused_field_data(&mut self, mut data: FocusedFieldData, sender: &MessageSender) {
        data.tab_id = sender.tab_id;
        data.frame_id = sender.frame_id;
        if data.frame_url.is_empty() {
            data.frame_url = sender.url.clone();
        }
        self.tabs.entry(sender.tab_id).or_default();
        self.focused_field = Some(data);
    }

    fn update_sub_frame_data(&mut self, host: &mut dyn HostMessenger, tab: TabId, offset: FrameOffset) {
        let frame = offset.frame_id;
        if !self.resolver.store_offset(tab, offset) {
            self.trace_drop("updateSubFrameData", tab, "missing frame id");
            return;
        }

        let refreshes_focused_frame = self
            .focused_field
            .as_ref()
            .is_some_and(|f| f.tab_id == tab && Some(f.frame_id) == frame);
        if refreshes_focused_frame && self.is_field_currently_focused {
            self.reposition_open_elements(host, tab);
        }
    }

    fn rebuild_sub_frame_offsets(&mut self, sender: &MessageSender) {
        let tab = sender.tab_id;
        let focused_frame = self
            .focused_field
            .as_ref()
            .filter(|f| f.tab_id == tab)
            .map(|f| f.frame_id);

        if focused_frame == Some(sender.frame_id) {
            return;
        }

        let dropped = self.resolver.invalidate_except(tab, sender.frame_id);
        self.tracer.log(
            TraceEvent::now("rebuildSubFrameOffsets", "invalidated")
                .with_tab(tab)
                .with_frame(sender.frame_id)
                .with_detail(format!("{} cached offsets dropped", dropped.len())),
        );

        if focused_frame.is_some() {
            self.reposition_timer.arm(
                self.clock.now_ms(),
                self.settings.offset_recompute_debounce_ms,
            );
        }
    }

    fn open_inline_menu(&mut self, host: &mut dyn HostMessenger, tab: TabId, full: bool) {
        if self.is_stale_focus(tab) {
            self.trace_drop("openAutofillInlineMenu", tab, "stale focus");
            return;
        }

        self.refresh_auth_status(host);
        match decide_open_target(self.settings.visibility, full) {
            OpenTarget::Nothing => {}
            OpenTarget::Button => {
                self.update_overlay_position(host, tab, OverlayElement::Button);
            }
            OpenTarget::ButtonAndList => {
                self.update_overlay_position(host, tab, OverlayElement::Button);
                self.update_overlay_position(host, tab, OverlayElement::List);
            }
        }
    }

    /// Makes sure the element exists in the top frame, then sends it fresh geometry.
    fn update_overlay_position(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        element: OverlayElement,
    ) {
        let Some(focused) = self.focused_field.clone().filter(|f| f.tab_id == tab) else {
            return;
        };

        host.send_to_frame(
            tab,
            FrameId::TOP,
            ContentCommand::AppendInlineMenuElements {
                overlay_element: element,
            },
        );
        let state = self.tabs.entry(tab).or_default().element_mut(element);
        if !state.is_open() {
            *state = ElementState::Visible { hidden: false };
            info!(tab = %tab, element = %element, "overlay element opened");
        }

        if element == OverlayElement::List && self.ciphers(tab).is_empty() {
            self.update_inline_menu_ciphers(host, tab);
        }

        let offset =
            self.resolver
                .resolve_offset(host, tab, focused.frame_id, &focused.frame_url);
        let position = match element {
            OverlayElement::Button => button_position(&focused, offset.as_ref()),
            OverlayElement::List => list_position(&focused, offset.as_ref()),
        };

        let mut styles = position.to_styles();
        if element == OverlayElement::List {
            if let Some(height) = self.tabs.get(&tab).and_then(|s| s.list_height) {
                styles.insert("height".to_string(), format!("{}px", height.round() as i64));
            }
        }

        host.post_to_port(tab, element, PortCommand::UpdateIframePosition { styles });
    }

    fn reposition_open_elements(&mut self, host: &mut dyn HostMessenger, tab: TabId) {
        for element in OverlayElement::ALL {
            if self.element_state(tab, element).is_open() {
                self.update_overlay_position(host, tab, element);
            }
        }
    }

    fn update_overlay_hidden(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        is_hidden: bool,
        set_transparent: bool,
    ) {
        let Some(state) = self.tabs.get_mut(&tab) else {
            return;
        };
        if !state.any_open() {
            return;
        }

        let mut open = Vec::new();
        for element in OverlayElement::ALL {
            let slot = state.element_mut(element);
            if slot.is_open() {
                *slot = ElementState::Visible { hidden: is_hidden };
                open.push(element);
            }
        }

        host.send_to_frame(
            tab,
            FrameId::TOP,
            ContentCommand::ToggleInlineMenuHidden {
                is_hidden,
                set_transparent,
            },
        );

        let mut styles = StyleMap::new();
        styles.insert(
            "display".to_string(),
            if is_hidden { "none" } else { "block" }.to_string(),
        );
        if set_transparent {
            styles.insert("opacity".to_string(), "0".to_string());
        }
        for element in open {
            host.post_to_port(
                tab,
                element,
                PortCommand::UpdateInlineMenuHidden {
                    styles: styles.clone(),
                },
            );
        }
    }

    fn close_overlay(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        element: Option<OverlayElement>,
        force: bool,
    ) {
        if !force {
            if self.is_field_currently_focused {
                return;
            }

            if self.is_field_currently_filling {
                self.close_elements(host, tab, Some(OverlayElement::List));
                return;
            }
        }

        self.close_elements(host, tab, element);
    }

    /// Closes one element, or both when `element` is `None`. Closed elements are left alone.
    fn close_elements(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        element: Option<OverlayElement>,
    ) {
        let Some(state) = self.tabs.get_mut(&tab) else {
            return;
        };

        let targets: Vec<OverlayElement> = match element {
            Some(element) => vec![element],
            None => OverlayElement::ALL.to_vec(),
        };
        let open: Vec<OverlayElement> = targets
            .into_iter()
            .filter(|e| state.element(*e).is_open())
            .collect();
        if open.is_empty() {
            return;
        }

        for closed in &open {
            *state.element_mut(*closed) = ElementState::Closed;
        }

        let command_target = if element.is_none() { None } else { open.first().copied() };
        host.send_to_frame(
            tab,
            FrameId::TOP,
            ContentCommand::CloseInlineMenu {
                overlay_element: command_target,
            },
        );
        self.tracer.log(
            TraceEvent::now("closeAutofillOverlay", "closed")
                .with_tab(tab)
                .with_detail(format!("{:?}", open)),
        );
        self.revoke_key_if_torn_down(tab);
    }

    fn overlay_element_closed(&mut self, tab: TabId, element: OverlayElement) {
        let Some(state) = self.tabs.get_mut(&tab) else {
            return;
        };

        *state.element_mut(element) = ElementState::Closed;
        self.revoke_key_if_torn_down(tab);
    }

    fn revoke_key_if_torn_down(&mut self, tab: TabId) {
        let Some(state) = self.tabs.get_mut(&tab) else {
            return;
        };

        if !state.any_open() && state.port_key.take().is_some() {
            state.list_height = None;
            self.tracer
                .log(TraceEvent::now("portKey", "revoked").with_tab(tab));
        }
    }

    fn probe_visibility(&mut self, host: &mut dyn HostMessenger, tab: TabId, probe: ContentCommand) -> bool {
        matches!(
            host.send_to_frame(tab, FrameId::TOP, probe),
            Some(ContentReply::Visible(true))
        )
    }

    fn blur_most_recent_field(&mut self, host: &mut dyn HostMessenger, tab: TabId, removing: bool) {
        let Some(frame) = self
            .focused_field
            .as_ref()
            .filter(|f| f.tab_id == tab)
            .map(|f| f.frame_id)
        else {
            return;
        };

        self.is_field_currently_focused = false;
        host.send_to_frame(
            tab,
            frame,
            ContentCommand::BlurMostRecentOverlayField {
                is_removing_inline_menu: removing,
            },
        );
    }

    fn refresh_auth_status(&mut self, host: &mut dyn HostMessenger) {
        let former = self.auth_status;
        self.auth_status = self.vault.auth_status();
        if former == self.auth_status {
            return;
        }

        info!(from = ?former, to = ?self.auth_status, "auth status changed");
        let tabs: Vec<TabId> = self.tabs.keys().copied().collect();

        if self.auth_status != AuthStatus::Unlocked {
            self.ciphers.clear();
        }

        for tab in tabs {
            if self.auth_status == AuthStatus::Unlocked {
                self.update_inline_menu_ciphers(host, tab);
            }

            if self.element_state(tab, OverlayElement::Button).is_open() {
                host.post_to_port(
                    tab,
                    OverlayElement::Button,
                    PortCommand::UpdateInlineMenuButtonAuthStatus {
                        auth_status: self.auth_status,
                    },
                );
            }
        }
    }

    /// Reloads the cipher list for a tab. Only runs while the vault is unlocked.
    fn update_inline_menu_ciphers(&mut self, host: &mut dyn HostMessenger, tab: TabId) {
        if self.auth_status != AuthStatus::Unlocked {
            return;
        }

        let url = self.tab_url(tab);
        let ciphers = self.vault.ciphers_for_url(&url);
        self.ciphers.insert(tab, ciphers.clone());

        if self.element_state(tab, OverlayElement::List).is_open() {
            host.post_to_port(
                tab,
                OverlayElement::List,
                PortCommand::UpdateInlineMenuListCiphers { ciphers },
            );
        }
    }

    fn tab_url(&self, tab: TabId) -> String {
        self.tabs
            .get(&tab)
            .and_then(|state| state.page_details.get(&FrameId::TOP))
            .map(|details| details.url.clone())
            .or_else(|| {
                self.focused_field
                    .as_ref()
                    .filter(|f| f.tab_id == tab)
                    .map(|f| f.frame_url.clone())
            })
            .unwrap_or_default()
    }

    fn is_stale_focus(&self, tab: TabId) -> bool {
        !self
            .focused_field
            .as_ref()
            .is_some_and(|f| f.tab_id == tab)
    }

    fn trace_drop(&self, command: &str, tab: TabId, reason: &str) {
        debug!(tab = %tab, command, reason, "message dropped");
        self.tracer
            .log(TraceEvent::now(command, "dropped").with_tab(tab).with_detail(reason));
    }

    // ========================================================================
    // Overlay UI ports
    // ========================================================================

    /// Handshake for a newly connected overlay UI fragment. Mints the tab's key
    /// on first connection and embeds it in the init payload.
    pub fn connect_port(&mut self, host: &mut dyn HostMessenger, tab: TabId, element: OverlayElement) {
        self.refresh_auth_status(host);

        let state = self.tabs.entry(tab).or_default();
        if state.port_key.is_none() {
            state.port_key = Some(PortKey::mint());
            self.tracer
                .log(TraceEvent::now("portKey", "minted").with_tab(tab));
        }
        let port_key = state
            .port_key
            .as_ref()
            .map(|k| k.as_str().to_string())
            .unwrap_or_default();

        let init = match element {
            OverlayElement::Button => PortCommand::InitAutofillInlineMenuButton {
                auth_status: self.auth_status,
                port_key,
            },
            OverlayElement::List => PortCommand::InitAutofillInlineMenuList {
                auth_status: self.auth_status,
                port_key,
                ciphers: self.ciphers(tab).to_vec(),
            },
        };
        host.post_to_port(tab, element, init);

        if !self.is_stale_focus(tab) {
            self.update_overlay_position(host, tab, element);
        }
    }

    /// Host notification that an overlay port closed.
    pub fn port_disconnected(&mut self, tab: TabId, element: OverlayElement) {
        self.overlay_element_closed(tab, element);
    }

    /// Handles a message from an overlay fragment. `tab` is the tab whose port
    /// delivered it, as vouched for by the host; the envelope's own tab id is
    /// never trusted.
    pub fn handle_port_message(&mut self, host: &mut dyn HostMessenger, tab: TabId, envelope: PortEnvelope) {
        if envelope.tab_id != tab {
            debug!(tab = %tab, claimed = %envelope.tab_id, "port message claims another tab");
        }
        let authorized = self
            .port_key(tab)
            .is_some_and(|key| key.matches(envelope.port_key.as_deref()));
        if !authorized {
            self.trace_drop("portMessage", tab, "port key mismatch");
            return;
        }

        match envelope.message {
            PortMessage::AutofillInlineMenuButtonClicked => {
                if self.auth_status != AuthStatus::Unlocked {
                    self.unlock_vault(host, tab);
                    return;
                }
                self.open_inline_menu(host, tab, true);
            }
            PortMessage::AutofillInlineMenuBlurred => {
                self.close_overlay(host, tab, None, false);
            }
            PortMessage::RedirectInlineMenuFocusOut { direction } => {
                let Some(frame) = self
                    .focused_field
                    .as_ref()
                    .filter(|f| f.tab_id == tab)
                    .map(|f| f.frame_id)
                else {
                    return;
                };
                host.send_to_frame(tab, frame, ContentCommand::RedirectInlineMenuFocusOut { direction });
            }
            PortMessage::CloseAutofillInlineMenu => {
                self.close_overlay(host, tab, None, true);
            }
            PortMessage::UnlockVault => {
                self.unlock_vault(host, tab);
            }
            PortMessage::FillSelectedListItem { cipher_id } => {
                self.fill_selected_item(host, tab, cipher_id);
            }
            PortMessage::UpdateInlineMenuListHeight { height } => {
                self.tabs.entry(tab).or_default().list_height = Some(height);
                let mut styles = StyleMap::new();
                styles.insert("height".to_string(), format!("{}px", height.round() as i64));
                host.post_to_port(tab, OverlayElement::List, PortCommand::UpdateIframePosition { styles });
            }
        }
    }

    fn unlock_vault(&mut self, host: &mut dyn HostMessenger, tab: TabId) {
        self.close_overlay(host, tab, None, true);
        host.send_to_frame(tab, FrameId::TOP, ContentCommand::OpenUnlockPopout);
    }

    fn fill_selected_item(&mut self, host: &mut dyn HostMessenger, tab: TabId, cipher_id: String) {
        if self.auth_status != AuthStatus::Unlocked {
            return;
        }

        let Some(frame) = self
            .focused_field
            .as_ref()
            .filter(|f| f.tab_id == tab)
            .map(|f| f.frame_id)
        else {
            self.trace_drop("fillSelectedListItem", tab, "stale focus");
            return;
        };

        if !self.ciphers(tab).iter().any(|c| c.id == cipher_id) {
            self.trace_drop("fillSelectedListItem", tab, "unknown cipher");
            return;
        }

        host.send_to_frame(tab, frame, ContentCommand::FillForm { cipher_id });
    }

    /// Applies a new visibility preference and pushes it to every known tab.
    pub fn set_visibility(&mut self, host: &mut dyn HostMessenger, visibility: InlineMenuVisibility) {
        if self.settings.visibility == visibility {
            return;
        }

        self.settings.visibility = visibility;
        let mut tabs: Vec<TabId> = self.tabs.keys().copied().collect();
        tabs.sort();
        for tab in tabs {
            host.send_to_frame(tab, FrameId::TOP, ContentCommand::UpdateInlineMenuVisibility { visibility });
            if visibility == InlineMenuVisibility::Off {
                self.close_elements(host, tab, None);
            }
        }
    }

    // ========================================================================
    // Timers and lifecycle
    // ========================================================================

    /// Fires the offset-recompute debounce once it is due.
    pub fn tick(&mut self, host: &mut dyn HostMessenger) {
        if !self.reposition_timer.fire_if_due(self.clock.now_ms()) {
            return;
        }

        if !self.is_field_currently_focused {
            return;
        }

        let Some(tab) = self.focused_field.as_ref().map(|f| f.tab_id) else {
            return;
        };
        self.reposition_open_elements(host, tab);
    }

    /// Drops everything known about a tab that closed or navigated away.
    pub fn remove_tab(&mut self, tab: TabId) {
        self.tabs.remove(&tab);
        self.ciphers.remove(&tab);
        self.resolver.remove_tab(tab);

        if self.focused_field.as_ref().is_some_and(|f| f.tab_id == tab) {
            self.focused_field = None;
            self.is_field_currently_focused = false;
            self.reposition_timer.cancel();
        }

        info!(tab = %tab, "tab state removed");
    }
}
