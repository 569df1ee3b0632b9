use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::content::page_observer::{
    COLLECT_PAGE_DETAILS_DELAY_MS, DELAYED_CLOSE_MS, FADE_IN_MS, ObserverTimings,
    REPOSITION_SETTLE_MS, SUB_FRAME_REBUILD_DELAY_MS,
};
use crate::frame::resolver::MAX_FRAME_DEPTH;
use crate::overlay::coordinator::{CoordinatorSettings, OFFSET_RECOMPUTE_DEBOUNCE_MS};
use crate::overlay::overlay_model::InlineMenuVisibility;
use crate::watchdog::breaker::{MUTATION_THRESHOLD, MUTATION_WINDOW_MS, MutationBreaker};

pub const DEFAULT_CONFIG_PATH: &str = "frame-overlay.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "frame-overlay",
    version,
    about = "Inspect field qualification and cross-frame overlay positioning"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: frame-overlay.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append coordinator decisions to this JSONL file
    #[arg(long, global = true)]
    pub trace_file: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every field of a collected page snapshot
    Qualify {
        /// Path to a page details JSON file
        #[arg(long)]
        page: String,
    },

    /// Resolve a focused field's frame offset and print overlay positions
    Position {
        /// Path to a frame tree scenario YAML file
        #[arg(long)]
        scenario: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `frame-overlay.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timings: TimingsConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub inline_menu: InlineMenuConfig,
    #[serde(default)]
    pub trace_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_collect_delay")]
    pub collect_page_details_delay_ms: u64,

    #[serde(default = "default_rebuild_delay")]
    pub sub_frame_rebuild_delay_ms: u64,

    #[serde(default = "default_recompute_debounce")]
    pub offset_recompute_debounce_ms: u64,

    #[serde(default = "default_settle")]
    pub reposition_settle_ms: u64,

    #[serde(default = "default_fade_in")]
    pub fade_in_ms: u64,

    #[serde(default = "default_delayed_close")]
    pub delayed_close_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            collect_page_details_delay_ms: COLLECT_PAGE_DETAILS_DELAY_MS,
            sub_frame_rebuild_delay_ms: SUB_FRAME_REBUILD_DELAY_MS,
            offset_recompute_debounce_ms: OFFSET_RECOMPUTE_DEBOUNCE_MS,
            reposition_settle_ms: REPOSITION_SETTLE_MS,
            fade_in_ms: FADE_IN_MS,
            delayed_close_ms: DELAYED_CLOSE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_mutation_threshold")]
    pub mutation_threshold: u32,

    #[serde(default = "default_mutation_window")]
    pub mutation_window_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            mutation_threshold: MUTATION_THRESHOLD,
            mutation_window_ms: MUTATION_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_max_frame_depth")]
    pub max_frame_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_frame_depth: MAX_FRAME_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineMenuConfig {
    #[serde(default)]
    pub visibility: InlineMenuVisibility,
}

// Serde default helpers
fn default_collect_delay() -> u64 { COLLECT_PAGE_DETAILS_DELAY_MS }
fn default_rebuild_delay() -> u64 { SUB_FRAME_REBUILD_DELAY_MS }
fn default_recompute_debounce() -> u64 { OFFSET_RECOMPUTE_DEBOUNCE_MS }
fn default_settle() -> u64 { REPOSITION_SETTLE_MS }
fn default_fade_in() -> u64 { FADE_IN_MS }
fn default_delayed_close() -> u64 { DELAYED_CLOSE_MS }
fn default_mutation_threshold() -> u32 { MUTATION_THRESHOLD }
fn default_mutation_window() -> u64 { MUTATION_WINDOW_MS }
fn default_max_frame_depth() -> usize { MAX_FRAME_DEPTH }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (config file -> component settings)
// ============================================================================

impl AppConfig {
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            offset_recompute_debounce_ms: self.timings.offset_recompute_debounce_ms,
            max_frame_depth: self.resolver.max_frame_depth,
            visibility: self.inline_menu.visibility,
        }
    }

    pub fn observer_timings(&self) -> ObserverTimings {
        ObserverTimings {
            collect_page_details_delay_ms: self.timings.collect_page_details_delay_ms,
            sub_frame_rebuild_delay_ms: self.timings.sub_frame_rebuild_delay_ms,
            reposition_settle_ms: self.timings.reposition_settle_ms,
            fade_in_ms: self.timings.fade_in_ms,
            delayed_close_ms: self.timings.delayed_close_ms,
        }
    }

    pub fn mutation_breaker(&self) -> MutationBreaker {
        MutationBreaker::new(self.watchdog.mutation_threshold, self.watchdog.mutation_window_ms)
    }

    /// `--trace-file` wins over the config file.
    pub fn resolve_trace_file<'a>(&'a self, cli_value: Option<&'a str>) -> Option<&'a str> {
        cli_value.or(self.trace_file.as_deref())
    }
}
