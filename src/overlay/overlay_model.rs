use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::frame_model::{FrameId, Rect, TabId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayElement {
    Button,
    List,
}

impl OverlayElement {
    pub const ALL: [OverlayElement; 2] = [OverlayElement::Button, OverlayElement::List];
}

impl fmt::Display for OverlayElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayElement::Button => write!(f, "button"),
            OverlayElement::List => write!(f, "list"),
        }
    }
}

/// Lifecycle of one overlay element: `Closed -> Visible -> Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ElementState {
    #[default]
    Closed,
    Visible { hidden: bool },
}

impl ElementState {
    pub fn is_open(self) -> bool {
        matches!(self, ElementState::Visible { .. })
    }

    /// Open and not temporarily hidden.
    pub fn is_shown(self) -> bool {
        matches!(self, ElementState::Visible { hidden: false })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    #[default]
    LoggedOut,
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineMenuVisibility {
    Off,
    #[default]
    OnFieldFocus,
    OnButtonClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusDirection {
    Previous,
    Next,
    Current,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStyles {
    #[serde(default)]
    pub padding_left: f64,
    #[serde(default)]
    pub padding_right: f64,
}

/// Geometry of the focused field in its own frame's coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedFieldData {
    pub tab_id: TabId,
    pub frame_id: FrameId,
    pub focused_field_rects: Rect,
    #[serde(default)]
    pub focused_field_styles: FieldStyles,
    /// Url of the frame hosting the field; used for sub-frame offset lookups.
    #[serde(default)]
    pub frame_url: String,
}

/// Minimal cipher view rendered by the list overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineMenuCipher {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// Pixel styles for an overlay iframe, already rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPosition {
    pub top: i64,
    pub left: i64,
    pub width: i64,
    #[serde(default)]
    pub height: Option<i64>,
}

impl OverlayPosition {
    /// CSS declarations in `"Npx"` form.
    pub fn to_styles(&self) -> BTreeMap<String, String> {
        let mut styles = BTreeMap::new();
        styles.insert("top".to_string(), format!("{}px", self.top));
        styles.insert("left".to_string(), format!("{}px", self.left));
        styles.insert("width".to_string(), format!("{}px", self.width));
        if let Some(height) = self.height {
            styles.insert("height".to_string(), format!("{}px", height));
        }
        styles
    }
}
