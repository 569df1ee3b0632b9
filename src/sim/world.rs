use std::collections::BTreeMap;

use crate::content::document::PageDocument;
use crate::content::page_observer::PageObserver;
use crate::frame::frame_model::{FrameId, TabId};
use crate::frame::geometry::RelayEnvelope;
use crate::message::command::{
    ContentReply, ExtensionMessage, ExtensionReply, PortEnvelope, PortMessage,
};
use crate::message::host::{ExtensionChannel, HostMessenger, MessageSender};
use crate::message::router::{MessageRouter, RouterChannel, route_content_command};
use crate::overlay::coordinator::OverlayCoordinator;
use crate::overlay::overlay_model::OverlayElement;
use crate::schedule::{Clock, ManualClock};
use crate::sim::sim_document::SimDocument;
use crate::sim::sim_host::SimHost;

/// Upper bound on event-loop turns per pump; a page that keeps generating
/// work past this is left for the next pump.
const MAX_PUMP_ROUNDS: usize = 64;

#[derive(Debug)]
struct FrameContent {
    observer: PageObserver,
    document: SimDocument,
}

/// One simulated tab: the coordinator behind its router, the host platform,
/// and a page observer plus document per frame.
pub struct SimWorld {
    pub router: MessageRouter,
    pub host: SimHost,
    clock: ManualClock,
    tab: TabId,
    frames: BTreeMap<FrameId, FrameContent>,
}

impl SimWorld {
    pub fn new(router: MessageRouter, host: SimHost, clock: ManualClock, tab: TabId) -> Self {
        Self {
            router,
            host,
            clock,
            tab,
            frames: BTreeMap::new(),
        }
    }

    pub fn add_frame(&mut self, frame: FrameId, document: SimDocument, observer: PageObserver) {
        self.frames
            .insert(frame, FrameContent { observer, document });
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn coordinator(&self) -> &OverlayCoordinator {
        self.router.coordinator()
    }

    pub fn document(&self, frame: FrameId) -> Option<&SimDocument> {
        self.frames.get(&frame).map(|c| &c.document)
    }

    pub fn document_mut(&mut self, frame: FrameId) -> Option<&mut SimDocument> {
        self.frames.get_mut(&frame).map(|c| &mut c.document)
    }

    pub fn observer(&self, frame: FrameId) -> Option<&PageObserver> {
        self.frames.get(&frame).map(|c| &c.observer)
    }

    // ========================================================================
    // Page-side events
    // ========================================================================

    pub fn load_all(&mut self) {
        let now = self.now();
        for content in self.frames.values_mut() {
            content.observer.page_loaded(now);
        }
    }

    pub fn focus(&mut self, frame: FrameId, opid: &str) {
        self.with_frame(frame, |observer, channel, doc, _| {
            doc.focus_field(opid);
            observer.field_focused(channel, doc, opid);
        });
        self.pump();
    }

    pub fn blur(&mut self, frame: FrameId, opid: &str) {
        self.with_frame(frame, |observer, channel, doc, _| {
            doc.blur_field(opid);
            observer.field_blurred(channel);
        });
        self.pump();
    }

    pub fn input(&mut self, frame: FrameId, opid: &str, value: &str) {
        self.with_frame(frame, |observer, channel, doc, _| {
            doc.set_value(opid, value);
            observer.field_input(channel, doc, opid);
        });
        self.pump();
    }

    pub fn keyup(&mut self, frame: FrameId, key: &str) {
        self.with_frame(frame, |observer, channel, doc, now| {
            observer.field_keyup(channel, doc, key, now);
        });
        self.pump();
    }

    pub fn scroll(&mut self, frame: FrameId) {
        self.with_frame(frame, |observer, channel, _, now| {
            observer.scroll_or_resize(channel, now);
        });
        self.pump();
    }

    /// The frame's document switched between visible and hidden.
    pub fn set_document_visible(&mut self, frame: FrameId, visible: bool) {
        self.with_frame(frame, |observer, channel, _, _| {
            observer.visibility_changed(channel, visible);
        });
        self.pump();
    }

    /// Sends a message to the coordinator on behalf of a frame.
    pub fn send(&mut self, frame: FrameId, message: ExtensionMessage) -> Option<ExtensionReply> {
        let url = self
            .host
            .frame_details(self.tab, frame)
            .map(|d| d.url)
            .unwrap_or_default();
        let sender = MessageSender::new(self.tab, frame, &url);
        let reply = self
            .router
            .route_extension_message(&mut self.host, message, &sender);
        self.pump();
        reply
    }

    /// A message from an overlay UI fragment, presenting `port_key`.
    pub fn port_message(&mut self, element: OverlayElement, message: PortMessage, port_key: Option<String>) {
        let envelope = PortEnvelope {
            tab_id: self.tab,
            element,
            port_key,
            message,
        };
        self.router.route_port_message(&mut self.host, self.tab, envelope);
        self.pump();
    }

    /// Lets the watchdog observe whatever the page did to the top-frame DOM.
    pub fn flush_page_mutations(&mut self) {
        let now = self.now();
        self.host.deliver_dom_mutations(self.tab, now);
        self.pump();
    }

    /// Moves time forward and fires every timer that came due.
    pub fn advance(&mut self, ms: u64) {
        self.clock.advance(ms);
        let frames: Vec<FrameId> = self.frames.keys().copied().collect();
        for frame in frames {
            self.with_frame(frame, |observer, channel, doc, now| {
                observer.tick(channel, doc, now);
            });
        }
        self.router.tick(&mut self.host);
        self.pump();
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Delivers queued work until nothing is left.
    pub fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let mut progressed = false;

            while let Some((sender, message)) = self.host.pop_inbound() {
                progressed = true;
                self.router
                    .route_extension_message(&mut self.host, message, &sender);
            }

            while let Some((tab, element)) = self.host.pop_port_connection() {
                progressed = true;
                self.router.port_connected(&mut self.host, tab, element);
            }

            while let Some((tab, frame, command)) = self.host.pop_pending_content() {
                progressed = true;
                if tab != self.tab {
                    continue;
                }

                let reply = self
                    .with_frame(frame, |observer, channel, doc, now| {
                        route_content_command(None, observer, channel, doc, command, now)
                    })
                    .flatten();
                if let Some(ContentReply::PageDetails(details)) = reply {
                    self.send_unpumped(frame, ExtensionMessage::CollectPageDetailsResponse { details });
                }
            }

            let frames: Vec<FrameId> = self.frames.keys().copied().collect();
            for frame in frames {
                let requests = self
                    .frames
                    .get_mut(&frame)
                    .map(|c| c.observer.take_relay_requests())
                    .unwrap_or_default();
                for envelope in requests {
                    progressed = true;
                    self.post_relay(frame, envelope);
                }
            }

            if !progressed {
                return;
            }
        }
    }

    /// Walks a window relay message up the frame tree, one parent per hop.
    fn post_relay(&mut self, mut source: FrameId, mut envelope: RelayEnvelope) {
        loop {
            let Some(parent) = self
                .host
                .frame_details(self.tab, source)
                .and_then(|d| d.parent_frame_id)
            else {
                return;
            };

            let next = self
                .with_frame(parent, |observer, channel, doc, _| {
                    observer.receive_relay(channel, doc, envelope, source)
                })
                .flatten();
            let Some(next) = next else {
                return;
            };

            envelope = next;
            source = parent;
        }
    }

    fn send_unpumped(&mut self, frame: FrameId, message: ExtensionMessage) {
        let url = self
            .frames
            .get(&frame)
            .map(|c| c.document.url().to_string())
            .unwrap_or_default();
        let sender = MessageSender::new(self.tab, frame, &url);
        self.router
            .route_extension_message(&mut self.host, message, &sender);
    }

    fn with_frame<R>(
        &mut self,
        frame: FrameId,
        f: impl FnOnce(&mut PageObserver, &mut dyn ExtensionChannel, &mut SimDocument, u64) -> R,
    ) -> Option<R> {
        let now = self.clock.now_ms();
        let content = self.frames.get_mut(&frame)?;
        let sender = MessageSender::new(self.tab, frame, content.document.url());
        let mut channel = RouterChannel {
            router: &mut self.router,
            host: &mut self.host,
            sender,
        };

        Some(f(&mut content.observer, &mut channel, &mut content.document, now))
    }
}
