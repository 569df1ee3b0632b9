use std::rc::Rc;

use frame_overlay::content::page_observer::{COLLECT_PAGE_DETAILS_DELAY_MS, PageObserver};
use frame_overlay::field::field_model::{FieldDescriptor, FormDescriptor, PageDetails};
use frame_overlay::frame::frame_model::{FrameId, Rect, TabId};
use frame_overlay::message::router::MessageRouter;
use frame_overlay::overlay::coordinator::{CoordinatorSettings, OverlayCoordinator};
use frame_overlay::overlay::overlay_model::{AuthStatus, InlineMenuCipher};
use frame_overlay::overlay::vault::StaticVault;
use frame_overlay::schedule::ManualClock;
use frame_overlay::sim::sim_document::SimDocument;
use frame_overlay::sim::sim_host::SimHost;
use frame_overlay::sim::world::SimWorld;
use frame_overlay::trace::logger::TraceLogger;

pub const TAB: TabId = TabId(1);
pub const LOGIN_URL: &str = "https://example.com/login";
pub const FORM_ID: &str = "__form0";
pub const USERNAME: &str = "__0";
pub const PASSWORD: &str = "__1";

pub fn username_rect() -> Rect {
    Rect::new(100.0, 50.0, 300.0, 40.0)
}

pub fn password_rect() -> Rect {
    Rect::new(160.0, 50.0, 300.0, 40.0)
}

// ============================================================================
// Page snapshots
// ============================================================================

pub fn username_field() -> FieldDescriptor {
    FieldDescriptor::new(USERNAME, 0)
        .with_type("text")
        .with_name("username")
        .with_form(FORM_ID)
}

pub fn password_field() -> FieldDescriptor {
    FieldDescriptor::new(PASSWORD, 1)
        .with_type("password")
        .with_name("password")
        .with_form(FORM_ID)
}

pub fn login_page() -> PageDetails {
    PageDetails::new(LOGIN_URL)
        .with_form(FormDescriptor::new(FORM_ID))
        .with_field(username_field())
        .with_field(password_field())
}

pub fn login_document(url: &str, is_top: bool) -> SimDocument {
    SimDocument::new(url, is_top)
        .with_form(FormDescriptor::new(FORM_ID))
        .with_field(username_field(), username_rect())
        .with_field(password_field(), password_rect())
}

// ============================================================================
// Coordinator and world
// ============================================================================

pub fn test_cipher() -> InlineMenuCipher {
    InlineMenuCipher {
        id: "cipher-1".to_string(),
        name: "Example".to_string(),
        username: Some("alice".to_string()),
        favorite: false,
    }
}

pub fn unlocked_vault() -> StaticVault {
    StaticVault::new(AuthStatus::Unlocked).with_cipher(LOGIN_URL, test_cipher())
}

pub fn locked_vault() -> StaticVault {
    StaticVault::new(AuthStatus::Locked).with_cipher(LOGIN_URL, test_cipher())
}

pub fn coordinator(settings: CoordinatorSettings, clock: &ManualClock, vault: StaticVault) -> OverlayCoordinator {
    OverlayCoordinator::new(settings, Rc::new(clock.clone()), Box::new(vault))
        .with_tracer(TraceLogger::in_memory())
}

/// One tab with a single top frame hosting a username/password form.
pub fn login_world(settings: CoordinatorSettings, vault: StaticVault) -> SimWorld {
    let clock = ManualClock::new(0);
    let router = MessageRouter::new(coordinator(settings, &clock, vault));

    let mut host = SimHost::new();
    host.add_frame(TAB, FrameId::TOP, LOGIN_URL, None);

    let mut world = SimWorld::new(router, host, clock, TAB);
    world.add_frame(FrameId::TOP, login_document(LOGIN_URL, true), PageObserver::default());
    world
}

/// Login world after the delayed page scan has wired the form.
pub fn loaded_login_world(settings: CoordinatorSettings, vault: StaticVault) -> SimWorld {
    let mut world = login_world(settings, vault);
    world.load_all();
    world.advance(COLLECT_PAGE_DETAILS_DELAY_MS);
    world
}

/// Loaded login world with the username field focused and the inline menu open.
pub fn focused_login_world(vault: StaticVault) -> SimWorld {
    let mut world = loaded_login_world(CoordinatorSettings::default(), vault);
    world.focus(FrameId::TOP, USERNAME);
    world
}
