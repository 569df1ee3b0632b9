use serde::Serialize;

use crate::overlay::overlay_model::{AuthStatus, InlineMenuVisibility};

/// Which overlay elements should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpenTarget {
    Nothing,
    Button,
    ButtonAndList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusContext {
    pub auth_status: AuthStatus,
    pub visibility: InlineMenuVisibility,
    pub field_has_value: bool,
    /// Focus arrived from a different field than the previously focused one.
    pub focus_moved: bool,
    pub ciphers_populated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusDecision {
    pub close_list: bool,
    pub open: OpenTarget,
}

/// Decides what a newly focused login field should show. No side effects.
pub fn decide_focus_action(ctx: &FocusContext) -> FocusDecision {
    if ctx.visibility == InlineMenuVisibility::Off {
        return FocusDecision {
            close_list: false,
            open: OpenTarget::Nothing,
        };
    }

    let close_list = ctx.visibility == InlineMenuVisibility::OnButtonClick
        || (ctx.field_has_value && ctx.focus_moved);

    if should_hide_list_on_filled_field(ctx.field_has_value, ctx.ciphers_populated, ctx.auth_status) {
        return FocusDecision {
            close_list,
            open: OpenTarget::Button,
        };
    }

    FocusDecision {
        close_list,
        open: decide_open_target(ctx.visibility, false),
    }
}

/// A filled field keeps only the button once there is something to offer or the vault is locked.
pub fn should_hide_list_on_filled_field(
    field_has_value: bool,
    ciphers_populated: bool,
    auth_status: AuthStatus,
) -> bool {
    field_has_value && (ciphers_populated || auth_status != AuthStatus::Unlocked)
}

pub fn decide_open_target(visibility: InlineMenuVisibility, is_opening_full_menu: bool) -> OpenTarget {
    match visibility {
        InlineMenuVisibility::Off if !is_opening_full_menu => OpenTarget::Nothing,
        InlineMenuVisibility::OnButtonClick if !is_opening_full_menu => OpenTarget::Button,
        _ => OpenTarget::ButtonAndList,
    }
}
