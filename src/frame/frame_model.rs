use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u32);

impl FrameId {
    pub const TOP: FrameId = FrameId(0);

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cumulative offset of a frame's origin from the top-level document.
///
/// `Option<FrameOffset>` is used everywhere a position may be unknown; `None` is
/// the "currently unresolvable" sentinel and is never mixed with partial sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOffset {
    pub url: String,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    pub top: f64,
    pub left: f64,
}

impl FrameOffset {
    pub fn top_level(url: &str) -> Self {
        Self {
            url: url.to_string(),
            frame_id: Some(FrameId::TOP),
            top: 0.0,
            left: 0.0,
        }
    }
}

/// What the host knows about a frame: its url and who embeds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDetails {
    pub frame_id: FrameId,
    pub url: String,
    pub parent_frame_id: Option<FrameId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}
