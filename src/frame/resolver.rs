use std::collections::HashMap;

use tracing::{debug, warn};

use crate::frame::frame_model::{FrameId, FrameOffset, TabId};
use crate::message::command::{ContentCommand, ContentReply};
use crate::message::host::HostMessenger;

/// Deepest frame nesting the resolver will walk before giving up.
pub const MAX_FRAME_DEPTH: usize = 32;

/// Per-tab cache of frame offsets, filled by walking each frame's ancestor chain.
///
/// A cached `None` is a settled "unknown": it is returned as-is until the tab's
/// offsets are invalidated or a relayed offset overwrites it.
#[derive(Debug, Clone)]
pub struct OffsetResolver {
    max_frame_depth: usize,
    offsets: HashMap<TabId, HashMap<FrameId, Option<FrameOffset>>>,
}

impl Default for OffsetResolver {
    fn default() -> Self {
        Self::new(MAX_FRAME_DEPTH)
    }
}

impl OffsetResolver {
    pub fn new(max_frame_depth: usize) -> Self {
        Self {
            max_frame_depth,
            offsets: HashMap::new(),
        }
    }

    pub fn cached_offset(&self, tab: TabId, frame: FrameId) -> Option<&Option<FrameOffset>> {
        self.offsets.get(&tab).and_then(|frames| frames.get(&frame))
    }

    pub fn cached_frames(&self, tab: TabId) -> Vec<FrameId> {
        let mut frames: Vec<FrameId> = self
            .offsets
            .get(&tab)
            .map(|f| f.keys().copied().collect())
            .unwrap_or_default();
        frames.sort();
        frames
    }

    /// Offset of `frame` relative to the top-level document of `tab`.
    ///
    /// Cache hits never touch the host. On a miss the ancestor chain is walked
    /// one parent at a time; if any link cannot be resolved the whole result is
    /// `None` and the frame is asked to start the window-level relay instead.
    pub fn resolve_offset(
        &mut self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        frame: FrameId,
        url: &str,
    ) -> Option<FrameOffset> {
        if frame.is_top() {
            return Some(FrameOffset::top_level(url));
        }

        if let Some(cached) = self.cached_offset(tab, frame) {
            return cached.clone();
        }

        let resolved = self.walk_ancestors(host, tab, frame, url);
        if resolved.is_none() {
            debug!(tab = %tab, frame = %frame, "sub-frame offset unresolved, starting window relay");
            host.send_to_frame(
                tab,
                frame,
                ContentCommand::GetSubFrameOffsetsFromWindowMessage { sub_frame_id: frame },
            );
        }

        self.offsets
            .entry(tab)
            .or_default()
            .insert(frame, resolved.clone());
        resolved
    }

    fn walk_ancestors(
        &self,
        host: &mut dyn HostMessenger,
        tab: TabId,
        frame: FrameId,
        url: &str,
    ) -> Option<FrameOffset> {
        let mut offset = FrameOffset {
            url: url.to_string(),
            frame_id: Some(frame),
            top: 0.0,
            left: 0.0,
        };
        let mut details = host.frame_details(tab, frame)?;
        let mut depth = 0;

        while let Some(parent) = details.parent_frame_id {
            depth += 1;
            if depth > self.max_frame_depth {
                warn!(tab = %tab, frame = %frame, depth, "frame chain exceeds maximum depth");
                return None;
            }

            let reply = host.send_to_frame(
                tab,
                parent,
                ContentCommand::GetSubFrameOffsets {
                    sub_frame_url: details.url.clone(),
                },
            );
            let Some(ContentReply::SubFrameOffset(Some(link))) = reply else {
                return None;
            };

            offset.top += link.top;
            offset.left += link.left;

            // An ancestor that already knows its own offset ends the walk
            if let Some(Some(parent_offset)) = self.cached_offset(tab, parent) {
                offset.top += parent_offset.top;
                offset.left += parent_offset.left;
                return Some(offset);
            }

            details = host.frame_details(tab, parent)?;
        }

        Some(offset)
    }

    /// Stores an offset reported by the window relay, replacing any cached value.
    pub fn store_offset(&mut self, tab: TabId, offset: FrameOffset) -> bool {
        let Some(frame) = offset.frame_id else {
            return false;
        };

        self.offsets.entry(tab).or_default().insert(frame, Some(offset));
        true
    }

    /// Drops every cached offset of `tab` except `keep`'s. Returns the dropped frames.
    pub fn invalidate_except(&mut self, tab: TabId, keep: FrameId) -> Vec<FrameId> {
        let Some(frames) = self.offsets.get_mut(&tab) else {
            return Vec::new();
        };

        let mut dropped: Vec<FrameId> = frames.keys().copied().filter(|f| *f != keep).collect();
        dropped.sort();
        for frame in &dropped {
            frames.remove(frame);
        }
        dropped
    }

    pub fn remove_tab(&mut self, tab: TabId) {
        self.offsets.remove(&tab);
    }
}
