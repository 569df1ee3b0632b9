use serde_json::Value;
use tracing::debug;

use crate::content::document::PageDocument;
use crate::content::page_observer::PageObserver;
use crate::frame::frame_model::TabId;
use crate::message::command::{
    ContentCommand, ContentReply, ExtensionMessage, ExtensionReply, PortEnvelope,
};
use crate::message::host::{ExtensionChannel, HostMessenger, MessageSender};
use crate::overlay::coordinator::OverlayCoordinator;
use crate::overlay::overlay_model::OverlayElement;
use crate::trace::trace::TraceEvent;
use crate::watchdog::dom::OverlayDom;
use crate::watchdog::watchdog::InlineMenuWatchdog;

/// Decodes a raw extension message. Unknown or malformed commands are not an
/// error, they are simply not handled here.
pub fn decode_extension_message(raw: &Value) -> Option<ExtensionMessage> {
    match serde_json::from_value::<ExtensionMessage>(raw.clone()) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(command = ?raw.get("command"), error = %e, "extension message not handled");
            None
        }
    }
}

pub fn decode_port_envelope(raw: &Value) -> Option<PortEnvelope> {
    match serde_json::from_value::<PortEnvelope>(raw.clone()) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            debug!(error = %e, "port message not handled");
            None
        }
    }
}

/// Privileged entry point: every message bound for the coordinator passes through here.
pub struct MessageRouter {
    coordinator: OverlayCoordinator,
}

impl MessageRouter {
    pub fn new(coordinator: OverlayCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &OverlayCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut OverlayCoordinator {
        &mut self.coordinator
    }

    pub fn route_extension_message(
        &mut self,
        host: &mut dyn HostMessenger,
        message: ExtensionMessage,
        sender: &MessageSender,
    ) -> Option<ExtensionReply> {
        self.coordinator.handle_extension_message(host, message, sender)
    }

    /// Routes an undecoded message and returns the encoded reply, if any.
    pub fn route_raw(
        &mut self,
        host: &mut dyn HostMessenger,
        raw: &Value,
        sender: &MessageSender,
    ) -> Option<Value> {
        let Some(message) = decode_extension_message(raw) else {
            let command = raw
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or("<missing>");
            self.coordinator.tracer().log(
                TraceEvent::now(command, "unhandled")
                    .with_tab(sender.tab_id)
                    .with_frame(sender.frame_id),
            );
            return None;
        };

        let reply = self.route_extension_message(host, message, sender)?;
        serde_json::to_value(reply).ok()
    }

    /// `tab` is the tab owning the port the message arrived on.
    pub fn route_port_message(&mut self, host: &mut dyn HostMessenger, tab: TabId, envelope: PortEnvelope) {
        self.coordinator.handle_port_message(host, tab, envelope);
    }

    pub fn route_port_raw(&mut self, host: &mut dyn HostMessenger, tab: TabId, raw: &Value) {
        if let Some(envelope) = decode_port_envelope(raw) {
            self.route_port_message(host, tab, envelope);
        }
    }

    pub fn port_connected(&mut self, host: &mut dyn HostMessenger, tab: TabId, element: OverlayElement) {
        self.coordinator.connect_port(host, tab, element);
    }

    pub fn port_disconnected(&mut self, tab: TabId, element: OverlayElement) {
        self.coordinator.port_disconnected(tab, element);
    }

    pub fn tab_removed(&mut self, tab: TabId) {
        self.coordinator.remove_tab(tab);
    }

    pub fn tick(&mut self, host: &mut dyn HostMessenger) {
        self.coordinator.tick(host);
    }
}

/// Content-side channel that hands messages straight to a router.
pub struct RouterChannel<'a> {
    pub router: &'a mut MessageRouter,
    pub host: &'a mut dyn HostMessenger,
    pub sender: MessageSender,
}

impl ExtensionChannel for RouterChannel<'_> {
    fn send_extension_message(&mut self, message: ExtensionMessage) -> Option<ExtensionReply> {
        self.router
            .route_extension_message(&mut *self.host, message, &self.sender)
    }
}

/// Delivers a coordinator command inside one frame. The top frame's watchdog
/// gets first refusal; everything else goes to the page observer.
pub fn route_content_command(
    top_frame: Option<(&mut InlineMenuWatchdog, &mut dyn OverlayDom)>,
    observer: &mut PageObserver,
    channel: &mut dyn ExtensionChannel,
    doc: &mut dyn PageDocument,
    command: ContentCommand,
    now_ms: u64,
) -> Option<ContentReply> {
    if let Some((watchdog, dom)) = top_frame {
        if let Some(reply) = watchdog.handle_command(dom, &command) {
            return Some(reply);
        }
    }

    observer.handle_content_command(channel, doc, command, now_ms)
}
