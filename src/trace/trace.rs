use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::frame::frame_model::{FrameId, TabId};

/// One coordinator decision, written as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub command: String,
    pub decision: String,

    pub tab: Option<u32>,
    pub frame: Option<u32>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(command: &str, decision: impl ToString) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            command: command.to_string(),
            decision: decision.to_string(),
            tab: None,
            frame: None,
            detail: None,
        }
    }

    pub fn with_tab(mut self, tab: TabId) -> Self {
        self.tab = Some(tab.0);
        self
    }

    pub fn with_frame(mut self, frame: FrameId) -> Self {
        self.frame = Some(frame.0);
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
