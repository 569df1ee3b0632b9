//! Cross-frame field qualification and inline-menu overlay coordination.
//!
//! Page frames report login fields and focus through a `PageObserver`; the
//! privileged `OverlayCoordinator` resolves where each frame sits in the
//! top-level page and positions the button and list overlays, which live in
//! the top frame under an `InlineMenuWatchdog`. All messages pass through the
//! `MessageRouter`.

pub mod cli;
pub mod content;
pub mod error;
pub mod field;
pub mod frame;
pub mod message;
pub mod overlay;
pub mod schedule;
pub mod sim;
pub mod trace;
pub mod watchdog;

pub use error::{OverlayError, Result};
