use clap::Parser;
use frame_overlay::OverlayError;
use frame_overlay::cli::commands::{cmd_position, cmd_qualify, load_page_details};
use frame_overlay::cli::config::{AppConfig, Cli, Commands, load_config};
use frame_overlay::content::page_observer::ObserverTimings;
use frame_overlay::overlay::overlay_model::InlineMenuVisibility;
use frame_overlay::sim::scenario::Scenario;
use frame_overlay::watchdog::breaker::BreakerState;

mod common;
use crate::common::utils::fixture;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_qualify() {
    let cli = Cli::parse_from(["frame-overlay", "qualify", "--page", "page.json"]);
    match cli.command {
        Commands::Qualify { page } => assert_eq!(page, "page.json"),
        _ => panic!("Expected Qualify command"),
    }
    assert_eq!(cli.verbose, 0);
    assert!(cli.config.is_none());
    assert!(cli.trace_file.is_none());
}

#[test]
fn cli_parse_position() {
    let cli = Cli::parse_from(["frame-overlay", "position", "--scenario", "frames.yaml"]);
    match cli.command {
        Commands::Position { scenario } => assert_eq!(scenario, "frames.yaml"),
        _ => panic!("Expected Position command"),
    }
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from(["frame-overlay", "-vv", "qualify", "--page", "p.json"]);
    assert_eq!(cli.verbose, 2);

    let cli = Cli::parse_from([
        "frame-overlay",
        "position",
        "--scenario",
        "s.yaml",
        "--config",
        "custom.yaml",
        "--trace-file",
        "decisions.jsonl",
    ]);
    assert_eq!(cli.config, Some("custom.yaml".to_string()));
    assert_eq!(cli.trace_file, Some("decisions.jsonl".to_string()));
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    // Should return defaults without error
    assert_eq!(config, AppConfig::default());
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert_eq!(config.timings.collect_page_details_delay_ms, 250);
    assert_eq!(config.timings.sub_frame_rebuild_delay_ms, 150);
    assert_eq!(config.timings.offset_recompute_debounce_ms, 650);
    assert_eq!(config.timings.reposition_settle_ms, 750);
    assert_eq!(config.timings.fade_in_ms, 50);
    assert_eq!(config.timings.delayed_close_ms, 100);
    assert_eq!(config.watchdog.mutation_threshold, 100);
    assert_eq!(config.watchdog.mutation_window_ms, 2000);
    assert_eq!(config.resolver.max_frame_depth, 32);
    assert_eq!(config.inline_menu.visibility, InlineMenuVisibility::OnFieldFocus);
    assert!(config.trace_file.is_none());
}

#[test]
fn config_yaml_roundtrip() {
    let config = AppConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
timings:
  fade_in_ms: 0
inline_menu:
  visibility: on_button_click
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.timings.fade_in_ms, 0);
    // Other timings get defaults
    assert_eq!(config.timings.reposition_settle_ms, 750);
    assert_eq!(config.watchdog.mutation_threshold, 100);
    assert_eq!(config.inline_menu.visibility, InlineMenuVisibility::OnButtonClick);
}

#[test]
fn config_malformed_file_falls_back_to_defaults() {
    let dir = std::env::temp_dir().join("frame_overlay_cli_test_malformed");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("frame-overlay.yaml");
    std::fs::write(&path, "timings: [not, a, map").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config, AppConfig::default());

    std::fs::remove_file(&path).ok();
    std::fs::remove_dir(&dir).ok();
}

// ============================================================================
// Config Builders
// ============================================================================

#[test]
fn config_builds_component_settings() {
    let yaml = r#"
timings:
  offset_recompute_debounce_ms: 300
  delayed_close_ms: 40
watchdog:
  mutation_threshold: 2
resolver:
  max_frame_depth: 4
inline_menu:
  visibility: "off"
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

    let settings = config.coordinator_settings();
    assert_eq!(settings.offset_recompute_debounce_ms, 300);
    assert_eq!(settings.max_frame_depth, 4);
    assert_eq!(settings.visibility, InlineMenuVisibility::Off);

    let timings = config.observer_timings();
    assert_eq!(
        timings,
        ObserverTimings {
            delayed_close_ms: 40,
            ..ObserverTimings::default()
        }
    );

    let mut breaker = config.mutation_breaker();
    assert_eq!(breaker.record(0), BreakerState::Armed);
    assert_eq!(breaker.record(1), BreakerState::Armed);
    assert_eq!(breaker.record(2), BreakerState::Tripped);
}

#[test]
fn cli_trace_file_wins_over_config() {
    let config = AppConfig {
        trace_file: Some("from-config.jsonl".to_string()),
        ..AppConfig::default()
    };
    assert_eq!(config.resolve_trace_file(Some("from-cli.jsonl")), Some("from-cli.jsonl"));
    assert_eq!(config.resolve_trace_file(None), Some("from-config.jsonl"));
    assert_eq!(AppConfig::default().resolve_trace_file(None), None);
}

// ============================================================================
// Scenario Validation
// ============================================================================

fn scenario_error(yaml: &str) -> String {
    match Scenario::from_yaml(yaml) {
        Err(OverlayError::InvalidFixture(message)) => message,
        other => panic!("expected an invalid fixture, got {other:?}"),
    }
}

#[test]
fn scenario_rejects_duplicate_frames() {
    let message = scenario_error(
        r#"
frames:
  - { id: 0, url: "https://a.example/" }
  - { id: 0, url: "https://b.example/" }
focused_field: { frame: 0, rect: { top: 0, left: 0, width: 10, height: 10 } }
"#,
    );
    assert!(message.contains("duplicate"));
}

#[test]
fn scenario_requires_a_single_top_frame() {
    let message = scenario_error(
        r#"
frames:
  - { id: 3, url: "https://a.example/" }
focused_field: { frame: 3, rect: { top: 0, left: 0, width: 10, height: 10 } }
"#,
    );
    assert!(message.contains("top frame"));
}

#[test]
fn scenario_rejects_unknown_parent_and_focus_frame() {
    let message = scenario_error(
        r#"
frames:
  - { id: 0, url: "https://a.example/" }
  - { id: 1, url: "https://b.example/", parent: 9 }
focused_field: { frame: 1, rect: { top: 0, left: 0, width: 10, height: 10 } }
"#,
    );
    assert!(message.contains("unknown parent"));

    let message = scenario_error(
        r#"
frames:
  - { id: 0, url: "https://a.example/" }
focused_field: { frame: 5, rect: { top: 0, left: 0, width: 10, height: 10 } }
"#,
    );
    assert!(message.contains("unknown frame"));
}

#[test]
fn scenario_fixture_loads() {
    let scenario = Scenario::load(&fixture("nested_frames.yaml")).unwrap();
    assert_eq!(scenario.tab, 7);
    assert_eq!(scenario.frames.len(), 3);
    assert_eq!(scenario.frame_url(scenario.focused_frame()), "https://auth.example.net/form");
    assert!(scenario.frames.iter().all(|f| f.responsive));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn qualify_classifies_fixture_page() {
    let classifications = cmd_qualify(&fixture("login_page.json"), 0).unwrap();
    assert_eq!(classifications.len(), 4);

    let email = &classifications[0];
    assert!(email.is_username && email.is_login_field && !email.is_password);

    let password = &classifications[1];
    assert!(password.is_password && password.is_current_password && password.is_login_field);

    let search = &classifications[2];
    assert_eq!(search.opid, "__2");
    assert!(!search.is_username && !search.is_login_field);

    assert!(!classifications[3].is_login_field);
}

#[test]
fn missing_page_file_is_an_io_error() {
    let err = load_page_details("no/such/page.json").unwrap_err();
    assert!(matches!(err, OverlayError::Io { ref path, .. } if path == "no/such/page.json"));
    assert!(err.to_string().contains("no/such/page.json"));
}

#[test]
fn malformed_page_file_is_a_json_error() {
    let dir = std::env::temp_dir().join("frame_overlay_cli_test_page");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.json");
    std::fs::write(&path, "{ \"fields\": [ }").unwrap();

    let err = load_page_details(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, OverlayError::Json(_)));

    std::fs::remove_file(&path).ok();
    std::fs::remove_dir(&dir).ok();
}

#[test]
fn position_writes_trace_file() {
    let dir = std::env::temp_dir().join("frame_overlay_cli_test_trace");
    std::fs::create_dir_all(&dir).unwrap();
    let trace_path = dir.join("decisions.jsonl");
    std::fs::remove_file(&trace_path).ok();

    let report = cmd_position(
        &fixture("nested_frames.yaml"),
        &AppConfig::default(),
        trace_path.to_str(),
        0,
    )
    .unwrap();
    assert_eq!(
        report.button.as_ref().and_then(|s| s.get("top")).map(String::as_str),
        Some("139px")
    );

    let trace = std::fs::read_to_string(&trace_path).unwrap();
    assert!(!trace.is_empty());
    for line in trace.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(event.get("command").is_some());
    }

    std::fs::remove_file(&trace_path).ok();
    std::fs::remove_dir(&dir).ok();
}

#[test]
fn position_reports_missing_scenario() {
    let err = cmd_position("missing.yaml", &AppConfig::default(), None, 0).unwrap_err();
    assert!(matches!(err, OverlayError::Io { .. }));
}
