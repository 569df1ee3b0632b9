use serde::{Deserialize, Serialize};

use crate::frame::frame_model::{FrameId, FrameOffset, Rect};

/// An `<iframe>` element as seen from the document that embeds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeElement {
    pub src: String,
    /// The frame whose window is this element's content window, when known.
    #[serde(default)]
    pub content_frame: Option<FrameId>,
    pub rect: Rect,
    #[serde(default)]
    pub padding_top: f64,
    #[serde(default)]
    pub padding_left: f64,
    #[serde(default)]
    pub border_top_width: f64,
    #[serde(default)]
    pub border_left_width: f64,
}

/// Offset of the iframe's content box within the embedding document.
pub fn iframe_offset(iframe: &IframeElement, sub_frame_url: &str, frame_id: Option<FrameId>) -> FrameOffset {
    FrameOffset {
        url: sub_frame_url.to_string(),
        frame_id,
        top: iframe.rect.top + iframe.padding_top + iframe.border_top_width,
        left: iframe.rect.left + iframe.padding_left + iframe.border_left_width,
    }
}

/// Finds the single iframe whose `src` is `url` (with or without a trailing slash).
/// Ambiguous matches resolve to nothing.
pub fn find_iframe_by_src<'a>(iframes: &'a [IframeElement], url: &str) -> Option<&'a IframeElement> {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let mut matches = iframes
        .iter()
        .filter(|iframe| iframe.src == url || iframe.src == trimmed);

    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }

    Some(first)
}

pub fn find_iframe_by_content_frame(
    iframes: &[IframeElement],
    frame: FrameId,
) -> Option<&IframeElement> {
    iframes.iter().find(|iframe| iframe.content_frame == Some(frame))
}

// ============================================================================
// Window-level relay
// ============================================================================

/// Message posted from a frame to its parent window asking each ancestor to
/// add the position of its own iframe element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEnvelope {
    pub url: String,
    pub frame_id: FrameId,
    pub top: f64,
    pub left: f64,
    #[serde(default)]
    pub hops: usize,
}

impl RelayEnvelope {
    pub fn start(url: &str, frame_id: FrameId) -> Self {
        Self {
            url: url.to_string(),
            frame_id,
            top: 0.0,
            left: 0.0,
            hops: 0,
        }
    }

    pub fn into_offset(self) -> FrameOffset {
        FrameOffset {
            url: self.url,
            frame_id: Some(self.frame_id),
            top: self.top,
            left: self.left,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayStep {
    /// Post the envelope to this window's parent.
    Forward(RelayEnvelope),
    /// This window is the top frame; report the total to the coordinator.
    Deliver(RelayEnvelope),
    /// The chain cannot be completed; nothing is reported.
    Stalled,
}

/// Handles one relay message received by a window.
///
/// `source_frame` identifies the child window that posted the message and
/// `iframes` are the iframe elements of the receiving document.
pub fn relay_step(
    mut envelope: RelayEnvelope,
    iframes: &[IframeElement],
    source_frame: FrameId,
    receiver_is_top: bool,
    max_hops: usize,
) -> RelayStep {
    let Some(iframe) = find_iframe_by_content_frame(iframes, source_frame) else {
        return RelayStep::Stalled;
    };

    let offset = iframe_offset(iframe, &envelope.url, Some(envelope.frame_id));
    envelope.top += offset.top;
    envelope.left += offset.left;
    envelope.hops += 1;

    if envelope.hops > max_hops {
        return RelayStep::Stalled;
    }

    if receiver_is_top {
        RelayStep::Deliver(envelope)
    } else {
        RelayStep::Forward(envelope)
    }
}
