use std::rc::Rc;

use serde::Serialize;

use crate::cli::config::AppConfig;
use crate::error::{OverlayError, Result};
use crate::field::field_model::PageDetails;
use crate::field::qualification::{FieldClassification, FieldQualifier, classify_page};
use crate::frame::frame_model::FrameOffset;
use crate::message::command::{ExtensionMessage, PortCommand, StyleMap};
use crate::message::router::MessageRouter;
use crate::overlay::coordinator::OverlayCoordinator;
use crate::overlay::overlay_model::{AuthStatus, OverlayElement};
use crate::overlay::vault::StaticVault;
use crate::schedule::ManualClock;
use crate::sim::scenario::Scenario;
use crate::sim::world::SimWorld;
use crate::trace::logger::TraceLogger;

// ============================================================================
// qualify subcommand
// ============================================================================

pub fn load_page_details(path: &str) -> Result<PageDetails> {
    let content = std::fs::read_to_string(path).map_err(|e| OverlayError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn cmd_qualify(page_path: &str, verbose: u8) -> Result<Vec<FieldClassification>> {
    let page = load_page_details(page_path)?;
    if verbose > 0 {
        eprintln!("Classifying {} fields from {}...", page.fields.len(), page.url);
    }

    let classifications = classify_page(&FieldQualifier::new(), &page);

    println!("{} ({} fields)", page.url, classifications.len());
    for c in &classifications {
        println!(
            "  {:<24} username={:<5} password={:<5} current_password={:<5} login_form={}",
            c.opid, c.is_username, c.is_password, c.is_current_password, c.is_login_field
        );
    }

    Ok(classifications)
}

// ============================================================================
// position subcommand
// ============================================================================

/// Where the overlay ends up for a scenario's focused field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub frame_offset: Option<FrameOffset>,
    pub button: Option<StyleMap>,
    pub list: Option<StyleMap>,
}

/// Drives a simulated tab through focus and a full inline-menu open, then
/// reads back the geometry the overlay fragments were sent.
pub fn simulate_positions(scenario: &Scenario, config: &AppConfig, tracer: TraceLogger) -> PositionReport {
    let clock = ManualClock::new(0);
    let coordinator = OverlayCoordinator::new(
        config.coordinator_settings(),
        Rc::new(clock.clone()),
        Box::new(StaticVault::new(AuthStatus::Unlocked)),
    )
    .with_tracer(tracer);

    let mut world = scenario.build_world(
        MessageRouter::new(coordinator),
        clock,
        &config.observer_timings(),
        config.resolver.max_frame_depth,
    );
    world.host = scenario.build_host().with_breaker(config.mutation_breaker());

    let frame = scenario.focused_frame();
    world.send(
        frame,
        ExtensionMessage::UpdateFocusedFieldData {
            focused_field_data: scenario.focused_field_data(),
        },
    );
    world.send(
        frame,
        ExtensionMessage::UpdateIsFieldCurrentlyFocused {
            is_field_currently_focused: true,
        },
    );
    world.send(
        frame,
        ExtensionMessage::OpenAutofillInlineMenu {
            is_opening_full_inline_menu: true,
        },
    );

    let tab = world.tab();
    let frame_offset = world.router.coordinator_mut().resolve_offset(
        &mut world.host,
        tab,
        frame,
        scenario.frame_url(frame),
    );

    PositionReport {
        frame_offset,
        button: last_iframe_position(&world, OverlayElement::Button),
        list: last_iframe_position(&world, OverlayElement::List),
    }
}

fn last_iframe_position(world: &SimWorld, element: OverlayElement) -> Option<StyleMap> {
    world
        .host
        .port_commands(world.tab(), element)
        .into_iter()
        .rev()
        .find_map(|command| match command {
            PortCommand::UpdateIframePosition { styles } if styles.contains_key("top") => {
                Some(styles.clone())
            }
            _ => None,
        })
}

pub fn cmd_position(
    scenario_path: &str,
    config: &AppConfig,
    trace_file: Option<&str>,
    verbose: u8,
) -> Result<PositionReport> {
    let scenario = Scenario::load(scenario_path)?;
    if verbose > 0 {
        eprintln!(
            "Simulating {} frames, focused field in frame {}...",
            scenario.frames.len(),
            scenario.focused_frame()
        );
    }

    let tracer = match trace_file {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    let report = simulate_positions(&scenario, config, tracer);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
