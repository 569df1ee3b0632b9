use serde::{Deserialize, Serialize};

use crate::frame::frame_model::{FrameDetails, FrameId, TabId};
use crate::message::command::{
    ContentCommand, ContentReply, ExtensionMessage, ExtensionReply, PortCommand,
};
use crate::overlay::overlay_model::OverlayElement;

/// Identity of the frame that sent an extension message, as vouched for by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub tab_id: TabId,
    pub frame_id: FrameId,
    #[serde(default)]
    pub url: String,
}

impl MessageSender {
    pub fn new(tab_id: TabId, frame_id: FrameId, url: &str) -> Self {
        Self {
            tab_id,
            frame_id,
            url: url.to_string(),
        }
    }

    pub fn top(tab_id: TabId, url: &str) -> Self {
        Self::new(tab_id, FrameId::TOP, url)
    }
}

/// The privileged side of the host messaging platform.
///
/// Addresses individual frames of a tab and the two overlay UI ports. A `None`
/// reply means the frame did not answer; callers treat that as "unknown".
pub trait HostMessenger {
    fn frame_details(&self, tab: TabId, frame: FrameId) -> Option<FrameDetails>;

    fn send_to_frame(
        &mut self,
        tab: TabId,
        frame: FrameId,
        command: ContentCommand,
    ) -> Option<ContentReply>;

    fn post_to_port(&mut self, tab: TabId, element: OverlayElement, command: PortCommand);
}

/// How a content script reaches the coordinator.
pub trait ExtensionChannel {
    fn send_extension_message(&mut self, message: ExtensionMessage) -> Option<ExtensionReply>;
}

/// Asks through `channel` and reads a boolean answer; no answer counts as `false`.
pub fn query_flag(channel: &mut dyn ExtensionChannel, message: ExtensionMessage) -> bool {
    channel
        .send_extension_message(message)
        .and_then(|reply| reply.as_bool())
        .unwrap_or(false)
}
