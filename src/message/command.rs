use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::field_model::PageDetails;
use crate::frame::frame_model::{FrameId, FrameOffset, TabId};
use crate::overlay::overlay_model::{
    AuthStatus, FocusDirection, FocusedFieldData, InlineMenuCipher, InlineMenuVisibility,
    OverlayElement,
};

pub type StyleMap = BTreeMap<String, String>;

// ============================================================================
// Page / content script -> coordinator
// ============================================================================

/// Messages any content script may send to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExtensionMessage {
    CollectPageDetails,
    CollectPageDetailsResponse {
        details: PageDetails,
    },
    UpdateFocusedFieldData {
        focused_field_data: FocusedFieldData,
    },
    UpdateIsFieldCurrentlyFocused {
        is_field_currently_focused: bool,
    },
    UpdateIsFieldCurrentlyFilling {
        is_field_currently_filling: bool,
    },
    UpdateSubFrameData {
        sub_frame_data: FrameOffset,
    },
    RebuildSubFrameOffsets,
    OpenAutofillInlineMenu {
        #[serde(default)]
        is_opening_full_inline_menu: bool,
    },
    UpdateAutofillOverlayPosition {
        overlay_element: OverlayElement,
    },
    UpdateAutofillOverlayHidden {
        is_hidden: bool,
        #[serde(default)]
        set_transparent: bool,
    },
    CloseAutofillOverlay {
        #[serde(default)]
        overlay_element: Option<OverlayElement>,
        #[serde(default)]
        force: bool,
    },
    AutofillOverlayElementClosed {
        overlay_element: OverlayElement,
    },
    CheckIsInlineMenuButtonVisible,
    CheckIsInlineMenuListVisible,
    CheckIsFieldCurrentlyFilling,
    CheckIsInlineMenuCiphersPopulated,
    GetAutofillInlineMenuVisibility,
    GetAuthStatus,
    BlurMostRecentOverlayField,
    FocusAutofillInlineMenuList,
    UnlockCompleted,
    AuthStatusChanged,
}

impl ExtensionMessage {
    /// Wire name of the command.
    pub fn command_name(&self) -> &'static str {
        match self {
            ExtensionMessage::CollectPageDetails => "collectPageDetails",
            ExtensionMessage::CollectPageDetailsResponse { .. } => "collectPageDetailsResponse",
            ExtensionMessage::UpdateFocusedFieldData { .. } => "updateFocusedFieldData",
            ExtensionMessage::UpdateIsFieldCurrentlyFocused { .. } => "updateIsFieldCurrentlyFocused",
            ExtensionMessage::UpdateIsFieldCurrentlyFilling { .. } => "updateIsFieldCurrentlyFilling",
            ExtensionMessage::UpdateSubFrameData { .. } => "updateSubFrameData",
            ExtensionMessage::RebuildSubFrameOffsets => "rebuildSubFrameOffsets",
            ExtensionMessage::OpenAutofillInlineMenu { .. } => "openAutofillInlineMenu",
            ExtensionMessage::UpdateAutofillOverlayPosition { .. } => "updateAutofillOverlayPosition",
            ExtensionMessage::UpdateAutofillOverlayHidden { .. } => "updateAutofillOverlayHidden",
            ExtensionMessage::CloseAutofillOverlay { .. } => "closeAutofillOverlay",
            ExtensionMessage::AutofillOverlayElementClosed { .. } => "autofillOverlayElementClosed",
            ExtensionMessage::CheckIsInlineMenuButtonVisible => "checkIsInlineMenuButtonVisible",
            ExtensionMessage::CheckIsInlineMenuListVisible => "checkIsInlineMenuListVisible",
            ExtensionMessage::CheckIsFieldCurrentlyFilling => "checkIsFieldCurrentlyFilling",
            ExtensionMessage::CheckIsInlineMenuCiphersPopulated => "checkIsInlineMenuCiphersPopulated",
            ExtensionMessage::GetAutofillInlineMenuVisibility => "getAutofillInlineMenuVisibility",
            ExtensionMessage::GetAuthStatus => "getAuthStatus",
            ExtensionMessage::BlurMostRecentOverlayField => "blurMostRecentOverlayField",
            ExtensionMessage::FocusAutofillInlineMenuList => "focusAutofillInlineMenuList",
            ExtensionMessage::UnlockCompleted => "unlockCompleted",
            ExtensionMessage::AuthStatusChanged => "authStatusChanged",
        }
    }
}

/// Response returned to the sender of an `ExtensionMessage`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExtensionReply {
    Bool(bool),
    Visibility(InlineMenuVisibility),
    AuthStatus(AuthStatus),
    PageDetails(PageDetails),
}

impl ExtensionReply {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExtensionReply::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

// ============================================================================
// Overlay UI fragment -> coordinator (requires the tab's port key)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PortMessage {
    AutofillInlineMenuButtonClicked,
    AutofillInlineMenuBlurred,
    RedirectInlineMenuFocusOut { direction: FocusDirection },
    CloseAutofillInlineMenu,
    UnlockVault,
    FillSelectedListItem { cipher_id: String },
    UpdateInlineMenuListHeight { height: f64 },
}

/// A port message as posted by an overlay fragment, with the key it presented.
/// `tab_id` is only what the fragment claims; the owning tab comes from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortEnvelope {
    pub tab_id: TabId,
    pub element: OverlayElement,
    #[serde(default)]
    pub port_key: Option<String>,
    pub message: PortMessage,
}

// ============================================================================
// Coordinator -> overlay UI fragment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PortCommand {
    InitAutofillInlineMenuButton {
        auth_status: AuthStatus,
        port_key: String,
    },
    InitAutofillInlineMenuList {
        auth_status: AuthStatus,
        port_key: String,
        ciphers: Vec<InlineMenuCipher>,
    },
    UpdateIframePosition {
        styles: StyleMap,
    },
    UpdateInlineMenuHidden {
        styles: StyleMap,
    },
    UpdateInlineMenuButtonAuthStatus {
        auth_status: AuthStatus,
    },
    UpdateInlineMenuListCiphers {
        ciphers: Vec<InlineMenuCipher>,
    },
    FocusInlineMenuList,
}

// ============================================================================
// Coordinator -> page frame
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ContentCommand {
    CollectPageDetailsImmediately,
    GetSubFrameOffsets {
        sub_frame_url: String,
    },
    GetSubFrameOffsetsFromWindowMessage {
        sub_frame_id: FrameId,
    },
    AppendInlineMenuElements {
        overlay_element: OverlayElement,
    },
    CloseInlineMenu {
        #[serde(default)]
        overlay_element: Option<OverlayElement>,
    },
    ToggleInlineMenuHidden {
        is_hidden: bool,
        #[serde(default)]
        set_transparent: bool,
    },
    CheckIsInlineMenuButtonVisible,
    CheckIsInlineMenuListVisible,
    BlurMostRecentOverlayField {
        #[serde(default)]
        is_removing_inline_menu: bool,
    },
    RedirectInlineMenuFocusOut {
        direction: FocusDirection,
    },
    FillForm {
        cipher_id: String,
    },
    OpenUnlockPopout,
    UpdateInlineMenuVisibility {
        visibility: InlineMenuVisibility,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentReply {
    Ack,
    PageDetails(PageDetails),
    SubFrameOffset(Option<FrameOffset>),
    Visible(bool),
}
