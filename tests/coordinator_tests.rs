use frame_overlay::frame::frame_model::{FrameId, Rect, TabId};
use frame_overlay::frame::geometry::IframeElement;
use frame_overlay::message::command::{
    ContentCommand, ExtensionMessage, ExtensionReply, PortCommand, PortMessage,
};
use frame_overlay::message::host::MessageSender;
use frame_overlay::overlay::coordinator::{
    CoordinatorSettings, OFFSET_RECOMPUTE_DEBOUNCE_MS, OverlayCoordinator,
};
use frame_overlay::overlay::overlay_model::{
    AuthStatus, ElementState, FieldStyles, FocusedFieldData, InlineMenuVisibility, OverlayElement,
};
use frame_overlay::schedule::ManualClock;
use frame_overlay::sim::sim_host::SimHost;

use crate::common::builders::{
    LOGIN_URL, TAB, USERNAME, coordinator, focused_login_world, locked_vault, test_cipher,
    unlocked_vault,
};
use crate::common::utils::{count_commands, last_position, port_key, styles};

mod common;

const FRAME_URL: &str = "https://auth.example.net/embed";

fn is_close(command: &ContentCommand) -> bool {
    matches!(command, ContentCommand::CloseInlineMenu { .. })
}

fn is_append(command: &ContentCommand) -> bool {
    matches!(command, ContentCommand::AppendInlineMenuElements { .. })
}

fn field_in(frame: FrameId, rect: Rect) -> FocusedFieldData {
    FocusedFieldData {
        tab_id: TAB,
        frame_id: frame,
        focused_field_rects: rect,
        focused_field_styles: FieldStyles::default(),
        frame_url: String::new(),
    }
}

/// Top frame plus one sub-frame at `(200, 100)` and an unrelated sibling.
fn nested_host() -> SimHost {
    let mut host = SimHost::new();
    host.add_frame(TAB, FrameId::TOP, LOGIN_URL, None);
    host.add_frame(TAB, FrameId(1), FRAME_URL, Some(FrameId::TOP));
    host.add_frame(TAB, FrameId(2), "https://ads.example.org/", Some(FrameId::TOP));
    host.add_iframe(
        TAB,
        FrameId::TOP,
        IframeElement {
            src: FRAME_URL.to_string(),
            content_frame: Some(FrameId(1)),
            rect: Rect::new(200.0, 100.0, 400.0, 300.0),
            ..IframeElement::default()
        },
    );
    host
}

fn focus_in_sub_frame(
    coordinator: &mut OverlayCoordinator,
    host: &mut SimHost,
) -> MessageSender {
    let sender = MessageSender::new(TAB, FrameId(1), FRAME_URL);
    for message in [
        ExtensionMessage::UpdateFocusedFieldData {
            focused_field_data: field_in(FrameId(1), Rect::new(10.0, 20.0, 200.0, 30.0)),
        },
        ExtensionMessage::UpdateIsFieldCurrentlyFocused {
            is_field_currently_focused: true,
        },
        ExtensionMessage::OpenAutofillInlineMenu {
            is_opening_full_inline_menu: true,
        },
    ] {
        coordinator.handle_extension_message(host, message, &sender);
    }
    sender
}

// ============================================================================
// Positioning
// ============================================================================

#[test]
fn sub_frame_field_is_positioned_in_top_level_coordinates() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();
    focus_in_sub_frame(&mut coordinator, &mut host);

    let button = last_position(&host, TAB, OverlayElement::Button).unwrap();
    assert_eq!(
        button,
        styles(&[("top", "216px"), ("left", "296px"), ("width", "19px"), ("height", "19px")])
    );
    let list = last_position(&host, TAB, OverlayElement::List).unwrap();
    assert_eq!(list, styles(&[("top", "240px"), ("left", "120px"), ("width", "200px")]));

    assert_eq!(
        coordinator.element_state(TAB, OverlayElement::Button),
        ElementState::Visible { hidden: false }
    );
    assert_eq!(count_commands(&host, TAB, FrameId::TOP, is_append), 2, "overlay lives in the top frame");
}

#[test]
fn focused_field_identity_comes_from_the_sender() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();

    let mut forged = field_in(FrameId(2), Rect::new(0.0, 0.0, 10.0, 10.0));
    forged.tab_id = TabId(99);
    let sender = MessageSender::new(TAB, FrameId(1), FRAME_URL);
    coordinator.handle_extension_message(
        &mut host,
        ExtensionMessage::UpdateFocusedFieldData {
            focused_field_data: forged,
        },
        &sender,
    );

    let focused = coordinator.focused_field().unwrap();
    assert_eq!(focused.tab_id, TAB);
    assert_eq!(focused.frame_id, FrameId(1));
    assert_eq!(focused.frame_url, FRAME_URL);
}

#[test]
fn newer_focus_replaces_the_stored_field() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();

    focus_in_sub_frame(&mut coordinator, &mut host);
    let top = MessageSender::top(TAB, LOGIN_URL);
    coordinator.handle_extension_message(
        &mut host,
        ExtensionMessage::UpdateFocusedFieldData {
            focused_field_data: field_in(FrameId::TOP, Rect::new(5.0, 6.0, 70.0, 20.0)),
        },
        &top,
    );

    let focused = coordinator.focused_field().unwrap();
    assert_eq!(focused.frame_id, FrameId::TOP);
    assert_eq!(focused.frame_url, LOGIN_URL);
    assert_eq!(focused.focused_field_rects, Rect::new(5.0, 6.0, 70.0, 20.0));
    assert!(
        coordinator.tracer().events().iter().all(|e| e.detail.as_deref() != Some("stale focus")),
        "replacing focus is not a drop"
    );
}

#[test]
fn stale_focus_drops_position_updates() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();

    let other_tab = MessageSender::new(TabId(2), FrameId::TOP, "https://other.example/");
    coordinator.handle_extension_message(
        &mut host,
        ExtensionMessage::UpdateAutofillOverlayPosition {
            overlay_element: OverlayElement::Button,
        },
        &other_tab,
    );
    assert!(host.content_log().is_empty(), "no focused field at all");

    focus_in_sub_frame(&mut coordinator, &mut host);
    host.clear_logs();
    coordinator.handle_extension_message(
        &mut host,
        ExtensionMessage::OpenAutofillInlineMenu {
            is_opening_full_inline_menu: true,
        },
        &other_tab,
    );
    assert!(host.content_log().is_empty(), "focus belongs to another tab");
    assert_eq!(coordinator.element_state(TabId(2), OverlayElement::Button), ElementState::Closed);

    let dropped = coordinator
        .tracer()
        .events()
        .iter()
        .filter(|e| e.decision == "dropped" && e.detail.as_deref() == Some("stale focus"))
        .count();
    assert_eq!(dropped, 2);
}

// ============================================================================
// Offset invalidation and debounce
// ============================================================================

#[test]
fn rebuild_from_another_frame_recomputes_after_debounce() {
    let clock = ManualClock::new(1_000);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();
    focus_in_sub_frame(&mut coordinator, &mut host);

    let sibling = MessageSender::new(TAB, FrameId(2), "https://ads.example.org/");
    coordinator.handle_extension_message(&mut host, ExtensionMessage::RebuildSubFrameOffsets, &sibling);
    assert_eq!(coordinator.cached_offset(TAB, FrameId(1)), None, "sub-frame offset invalidated");
    assert!(coordinator.is_reposition_pending());

    host.frame_mut(TAB, FrameId::TOP).unwrap().iframes[0].rect.top = 300.0;
    host.clear_logs();

    clock.advance(OFFSET_RECOMPUTE_DEBOUNCE_MS - 1);
    coordinator.tick(&mut host);
    assert!(host.port_log().is_empty(), "debounce has not elapsed");

    clock.advance(1);
    coordinator.tick(&mut host);
    assert!(!coordinator.is_reposition_pending());
    let button = last_position(&host, TAB, OverlayElement::Button).unwrap();
    assert_eq!(button.get("top").map(String::as_str), Some("316px"));
}

#[test]
fn repeated_rebuilds_coalesce_into_one_recompute() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();
    focus_in_sub_frame(&mut coordinator, &mut host);
    let sibling = MessageSender::new(TAB, FrameId(2), "https://ads.example.org/");

    coordinator.handle_extension_message(&mut host, ExtensionMessage::RebuildSubFrameOffsets, &sibling);
    clock.advance(400);
    coordinator.handle_extension_message(&mut host, ExtensionMessage::RebuildSubFrameOffsets, &sibling);
    host.clear_logs();

    clock.advance(OFFSET_RECOMPUTE_DEBOUNCE_MS - 400);
    coordinator.tick(&mut host);
    assert!(host.port_log().is_empty(), "second rebuild re-armed the timer");

    clock.advance(400);
    coordinator.tick(&mut host);
    let updates = host
        .port_commands(TAB, OverlayElement::Button)
        .into_iter()
        .filter(|c| matches!(c, PortCommand::UpdateIframePosition { .. }))
        .count();
    assert_eq!(updates, 1);
}

#[test]
fn rebuild_from_the_focused_frame_is_ignored() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();
    let sender = focus_in_sub_frame(&mut coordinator, &mut host);

    coordinator.handle_extension_message(&mut host, ExtensionMessage::RebuildSubFrameOffsets, &sender);
    assert!(coordinator.cached_offset(TAB, FrameId(1)).is_some());
    assert!(!coordinator.is_reposition_pending());
}

#[test]
fn rebuild_without_focus_does_not_arm_the_timer() {
    let clock = ManualClock::new(0);
    let mut coordinator = coordinator(CoordinatorSettings::default(), &clock, unlocked_vault());
    let mut host = nested_host();

    let sibling = MessageSender::new(TAB, FrameId(2), "https://ads.example.org/");
    coordinator.handle_extension_message(&mut host, ExtensionMessage::RebuildSubFrameOffsets, &sibling);
    assert!(!coordinator.is_reposition_pending());
}

// ============================================================================
// Port key handshake
// ============================================================================

#[test]
fn port_key_is_minted_once_and_shared_by_both_fragments() {
    let world = focused_login_world(unlocked_vault());

    let button_key = port_key(&world.host, TAB, OverlayElement::Button).unwrap();
    let list_key = port_key(&world.host, TAB, OverlayElement::List).unwrap();
    assert_eq!(button_key, list_key);
    assert!(world.coordinator().port_key(TAB).unwrap().matches(Some(button_key.as_str())));
    assert!(world.host.is_port_connected(TAB, OverlayElement::Button));
    assert!(world.host.is_port_connected(TAB, OverlayElement::List));
}

#[test]
fn port_messages_without_the_key_are_dropped() {
    let mut world = focused_login_world(unlocked_vault());

    world.port_message(
        OverlayElement::List,
        PortMessage::FillSelectedListItem {
            cipher_id: test_cipher().id,
        },
        None,
    );
    world.port_message(
        OverlayElement::List,
        PortMessage::FillSelectedListItem {
            cipher_id: test_cipher().id,
        },
        Some("forged".to_string()),
    );

    assert!(world.observer(FrameId::TOP).unwrap().fill_requests().is_empty());
    let mismatches = world
        .coordinator()
        .tracer()
        .events()
        .iter()
        .filter(|e| e.detail.as_deref() == Some("port key mismatch"))
        .count();
    assert_eq!(mismatches, 2);
}

#[test]
fn keys_from_a_previous_handshake_are_rejected() {
    let mut world = focused_login_world(unlocked_vault());
    let old_key = port_key(&world.host, TAB, OverlayElement::Button).unwrap();

    world.port_message(OverlayElement::Button, PortMessage::CloseAutofillInlineMenu, Some(old_key.clone()));
    assert!(world.coordinator().port_key(TAB).is_none(), "closing both elements revokes the key");

    world.send(
        FrameId::TOP,
        ExtensionMessage::OpenAutofillInlineMenu {
            is_opening_full_inline_menu: true,
        },
    );
    let new_key = port_key(&world.host, TAB, OverlayElement::List).unwrap();
    assert_ne!(new_key, old_key);

    let fill = PortMessage::FillSelectedListItem {
        cipher_id: test_cipher().id,
    };
    world.port_message(OverlayElement::List, fill.clone(), Some(old_key));
    assert!(world.observer(FrameId::TOP).unwrap().fill_requests().is_empty());

    world.port_message(OverlayElement::List, fill, Some(new_key));
    assert_eq!(world.observer(FrameId::TOP).unwrap().fill_requests(), ["cipher-1".to_string()]);
}

#[test]
fn unknown_cipher_is_not_filled() {
    let mut world = focused_login_world(unlocked_vault());
    let key = port_key(&world.host, TAB, OverlayElement::List);

    world.port_message(
        OverlayElement::List,
        PortMessage::FillSelectedListItem {
            cipher_id: "not-offered".to_string(),
        },
        key,
    );
    assert!(world.observer(FrameId::TOP).unwrap().fill_requests().is_empty());
}

#[test]
fn list_height_is_applied_and_remembered() {
    let mut world = focused_login_world(unlocked_vault());
    let key = port_key(&world.host, TAB, OverlayElement::List);

    world.port_message(OverlayElement::List, PortMessage::UpdateInlineMenuListHeight { height: 120.4 }, key);
    let height_update = world.host.port_commands(TAB, OverlayElement::List).into_iter().last().cloned();
    assert_eq!(
        height_update,
        Some(PortCommand::UpdateIframePosition {
            styles: styles(&[("height", "120px")])
        })
    );

    world.send(
        FrameId::TOP,
        ExtensionMessage::UpdateAutofillOverlayPosition {
            overlay_element: OverlayElement::List,
        },
    );
    let list = last_position(&world.host, TAB, OverlayElement::List).unwrap();
    assert_eq!(list.get("height").map(String::as_str), Some("120px"));
}

// ============================================================================
// Closing
// ============================================================================

#[test]
fn forced_close_is_idempotent() {
    let mut world = focused_login_world(unlocked_vault());
    let close = ExtensionMessage::CloseAutofillOverlay {
        overlay_element: None,
        force: true,
    };

    world.send(FrameId::TOP, close.clone());
    world.send(FrameId::TOP, close);

    assert_eq!(count_commands(&world.host, TAB, FrameId::TOP, is_close), 1);
    assert_eq!(world.coordinator().element_state(TAB, OverlayElement::Button), ElementState::Closed);
    assert_eq!(world.coordinator().element_state(TAB, OverlayElement::List), ElementState::Closed);

    let dom = world.host.dom(TAB).unwrap();
    assert!(dom.body_children().is_empty());
}

#[test]
fn unforced_close_waits_for_blur() {
    let mut world = focused_login_world(unlocked_vault());
    let close = ExtensionMessage::CloseAutofillOverlay {
        overlay_element: None,
        force: false,
    };

    world.send(FrameId::TOP, close.clone());
    assert!(world.coordinator().element_state(TAB, OverlayElement::Button).is_open());

    world.blur(FrameId::TOP, USERNAME);
    world.send(FrameId::TOP, close);
    assert!(!world.coordinator().element_state(TAB, OverlayElement::Button).is_open());
}

#[test]
fn unforced_close_while_filling_closes_only_the_list() {
    let mut world = focused_login_world(unlocked_vault());
    world.blur(FrameId::TOP, USERNAME);
    world.send(
        FrameId::TOP,
        ExtensionMessage::UpdateIsFieldCurrentlyFilling {
            is_field_currently_filling: true,
        },
    );

    world.send(
        FrameId::TOP,
        ExtensionMessage::CloseAutofillOverlay {
            overlay_element: None,
            force: false,
        },
    );
    assert!(world.coordinator().element_state(TAB, OverlayElement::Button).is_open());
    assert!(!world.coordinator().element_state(TAB, OverlayElement::List).is_open());
    assert!(world.coordinator().port_key(TAB).is_some(), "button still holds the key");
}

#[test]
fn visibility_probes_ask_the_top_frame() {
    let mut world = focused_login_world(unlocked_vault());

    let reply = world.send(FrameId::TOP, ExtensionMessage::CheckIsInlineMenuListVisible);
    assert!(matches!(reply, Some(ExtensionReply::Bool(true))));

    world.send(
        FrameId::TOP,
        ExtensionMessage::UpdateAutofillOverlayHidden {
            is_hidden: true,
            set_transparent: false,
        },
    );
    let reply = world.send(FrameId::TOP, ExtensionMessage::CheckIsInlineMenuButtonVisible);
    assert!(matches!(reply, Some(ExtensionReply::Bool(false))));
    assert_eq!(
        world.coordinator().element_state(TAB, OverlayElement::Button),
        ElementState::Visible { hidden: true }
    );
}

#[test]
fn hidden_styles_are_pushed_to_open_fragments() {
    let mut world = focused_login_world(unlocked_vault());
    world.send(
        FrameId::TOP,
        ExtensionMessage::UpdateAutofillOverlayHidden {
            is_hidden: true,
            set_transparent: true,
        },
    );

    let expected = PortCommand::UpdateInlineMenuHidden {
        styles: styles(&[("display", "none"), ("opacity", "0")]),
    };
    for element in OverlayElement::ALL {
        let last = world.host.port_commands(TAB, element).into_iter().last().cloned();
        assert_eq!(last, Some(expected.clone()), "{} fragment", element);
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[test]
fn unlocking_pushes_status_and_ciphers() {
    let vault = locked_vault();
    let mut world = focused_login_world(vault.clone());
    assert!(world.coordinator().ciphers(TAB).is_empty(), "locked vault offers nothing");

    vault.set_status(AuthStatus::Unlocked);
    world.send(FrameId::TOP, ExtensionMessage::AuthStatusChanged);

    assert_eq!(world.coordinator().auth_status(), AuthStatus::Unlocked);
    assert_eq!(world.coordinator().ciphers(TAB), [test_cipher()]);

    let button = world.host.port_commands(TAB, OverlayElement::Button);
    assert!(button.contains(&&PortCommand::UpdateInlineMenuButtonAuthStatus {
        auth_status: AuthStatus::Unlocked
    }));
    let list = world.host.port_commands(TAB, OverlayElement::List);
    assert!(list.contains(&&PortCommand::UpdateInlineMenuListCiphers {
        ciphers: vec![test_cipher()]
    }));
}

#[test]
fn locking_clears_ciphers() {
    let vault = unlocked_vault();
    let mut world = focused_login_world(vault.clone());
    assert!(!world.coordinator().ciphers(TAB).is_empty());

    vault.set_status(AuthStatus::Locked);
    let reply = world.send(FrameId::TOP, ExtensionMessage::GetAuthStatus);
    assert!(matches!(reply, Some(ExtensionReply::AuthStatus(AuthStatus::Locked))));
    assert!(world.coordinator().ciphers(TAB).is_empty());

    let populated = world.send(FrameId::TOP, ExtensionMessage::CheckIsInlineMenuCiphersPopulated);
    assert!(matches!(populated, Some(ExtensionReply::Bool(false))));
}

#[test]
fn button_click_while_locked_requests_unlock() {
    let mut world = focused_login_world(locked_vault());
    let key = port_key(&world.host, TAB, OverlayElement::Button);

    world.port_message(OverlayElement::Button, PortMessage::AutofillInlineMenuButtonClicked, key);

    assert!(world.observer(FrameId::TOP).unwrap().unlock_popout_requested());
    assert!(!world.coordinator().element_state(TAB, OverlayElement::Button).is_open());
}

#[test]
fn unlock_completed_reopens_the_full_menu() {
    let vault = locked_vault();
    let mut world = focused_login_world(vault.clone());
    let key = port_key(&world.host, TAB, OverlayElement::Button);
    world.port_message(OverlayElement::Button, PortMessage::UnlockVault, key);
    assert!(!world.coordinator().element_state(TAB, OverlayElement::List).is_open());

    vault.set_status(AuthStatus::Unlocked);
    world.send(FrameId::TOP, ExtensionMessage::UnlockCompleted);

    assert!(world.coordinator().element_state(TAB, OverlayElement::Button).is_open());
    assert!(world.coordinator().element_state(TAB, OverlayElement::List).is_open());
    let init = world
        .host
        .port_commands(TAB, OverlayElement::List)
        .into_iter()
        .rev()
        .find(|c| matches!(c, PortCommand::InitAutofillInlineMenuList { .. }))
        .cloned();
    assert!(matches!(
        init,
        Some(PortCommand::InitAutofillInlineMenuList { auth_status: AuthStatus::Unlocked, ref ciphers, .. })
            if ciphers.len() == 1
    ));
}

// ============================================================================
// Settings and lifecycle
// ============================================================================

#[test]
fn turning_visibility_off_closes_and_broadcasts() {
    let mut world = focused_login_world(unlocked_vault());
    world
        .router
        .coordinator_mut()
        .set_visibility(&mut world.host, InlineMenuVisibility::Off);
    world.pump();

    assert_eq!(world.coordinator().visibility(), InlineMenuVisibility::Off);
    assert!(!world.coordinator().element_state(TAB, OverlayElement::Button).is_open());
    assert_eq!(
        world.observer(FrameId::TOP).unwrap().visibility(),
        Some(InlineMenuVisibility::Off)
    );

    let reply = world.send(FrameId::TOP, ExtensionMessage::GetAutofillInlineMenuVisibility);
    assert!(matches!(reply, Some(ExtensionReply::Visibility(InlineMenuVisibility::Off))));
}

#[test]
fn removing_a_tab_clears_its_state_and_focus() {
    let mut world = focused_login_world(unlocked_vault());
    assert!(world.coordinator().has_tab(TAB));

    world.router.tab_removed(TAB);

    let coordinator = world.coordinator();
    assert!(!coordinator.has_tab(TAB));
    assert!(coordinator.focused_field().is_none());
    assert!(!coordinator.is_field_currently_focused());
    assert!(coordinator.port_key(TAB).is_none());
    assert!(coordinator.ciphers(TAB).is_empty());
}

#[test]
fn port_disconnect_marks_element_closed() {
    let mut world = focused_login_world(unlocked_vault());
    world.router.port_disconnected(TAB, OverlayElement::List);

    assert_eq!(world.coordinator().element_state(TAB, OverlayElement::List), ElementState::Closed);
    assert!(world.coordinator().port_key(TAB).is_some());

    world.router.port_disconnected(TAB, OverlayElement::Button);
    assert!(world.coordinator().port_key(TAB).is_none());
}

#[test]
fn blur_most_recent_field_reaches_the_focused_frame() {
    let mut world = focused_login_world(unlocked_vault());
    world.send(FrameId::TOP, ExtensionMessage::BlurMostRecentOverlayField);

    assert!(!world.coordinator().is_field_currently_focused());
    let blurs = count_commands(&world.host, TAB, FrameId::TOP, |c| {
        matches!(c, ContentCommand::BlurMostRecentOverlayField { is_removing_inline_menu: false })
    });
    assert_eq!(blurs, 1);
}
