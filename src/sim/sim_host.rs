use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::frame::frame_model::{FrameDetails, FrameId, TabId};
use crate::frame::geometry::{IframeElement, find_iframe_by_src, iframe_offset};
use crate::message::command::{ContentCommand, ContentReply, ExtensionMessage, PortCommand};
use crate::message::host::{HostMessenger, MessageSender};
use crate::overlay::overlay_model::OverlayElement;
use crate::sim::sim_dom::SimDom;
use crate::watchdog::breaker::MutationBreaker;
use crate::watchdog::dom::OverlayDom;
use crate::watchdog::watchdog::InlineMenuWatchdog;

/// One frame as the host platform sees it.
#[derive(Debug, Clone)]
pub struct SimFrame {
    pub details: FrameDetails,
    /// Iframe elements in this frame's document.
    pub iframes: Vec<IframeElement>,
    /// Whether the frame's content script answers extension messages.
    pub responsive: bool,
}

#[derive(Debug)]
struct TopFrame {
    dom: SimDom,
    watchdog: InlineMenuWatchdog,
}

impl TopFrame {
    fn is_attached(&self, element: OverlayElement) -> bool {
        let handle = match element {
            OverlayElement::Button => self.watchdog.button_handle(),
            OverlayElement::List => self.watchdog.list_handle(),
        };
        handle.is_some_and(|h| self.dom.is_attached(h))
    }

    fn attached(&self) -> [bool; 2] {
        OverlayElement::ALL.map(|element| self.is_attached(element))
    }
}

/// Deterministic in-process Host Messaging Platform.
///
/// Answers frame-tree and geometry queries synchronously, runs the top
/// frame's watchdog against a `SimDom`, and queues everything that a real
/// browser would deliver on a later turn of the event loop.
#[derive(Debug)]
pub struct SimHost {
    frames: HashMap<(TabId, FrameId), SimFrame>,
    top_frames: HashMap<TabId, TopFrame>,
    breaker_template: MutationBreaker,

    content_log: Vec<(TabId, FrameId, ContentCommand)>,
    port_log: Vec<(TabId, OverlayElement, PortCommand)>,
    connected_ports: HashSet<(TabId, OverlayElement)>,

    pending_content: VecDeque<(TabId, FrameId, ContentCommand)>,
    inbound: VecDeque<(MessageSender, ExtensionMessage)>,
    port_connections: VecDeque<(TabId, OverlayElement)>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            frames: HashMap::new(),
            top_frames: HashMap::new(),
            breaker_template: MutationBreaker::default(),
            content_log: Vec::new(),
            port_log: Vec::new(),
            connected_ports: HashSet::new(),
            pending_content: VecDeque::new(),
            inbound: VecDeque::new(),
            port_connections: VecDeque::new(),
        }
    }

    pub fn with_breaker(mut self, breaker: MutationBreaker) -> Self {
        self.breaker_template = breaker;
        self
    }

    // ---- Frame tree ----

    pub fn add_frame(&mut self, tab: TabId, frame: FrameId, url: &str, parent: Option<FrameId>) {
        self.frames.insert(
            (tab, frame),
            SimFrame {
                details: FrameDetails {
                    frame_id: frame,
                    url: url.to_string(),
                    parent_frame_id: parent,
                },
                iframes: Vec::new(),
                responsive: true,
            },
        );
    }

    pub fn add_iframe(&mut self, tab: TabId, frame: FrameId, iframe: IframeElement) {
        if let Some(target) = self.frames.get_mut(&(tab, frame)) {
            target.iframes.push(iframe);
        }
    }

    pub fn set_responsive(&mut self, tab: TabId, frame: FrameId, responsive: bool) {
        if let Some(target) = self.frames.get_mut(&(tab, frame)) {
            target.responsive = responsive;
        }
    }

    pub fn frame(&self, tab: TabId, frame: FrameId) -> Option<&SimFrame> {
        self.frames.get(&(tab, frame))
    }

    pub fn frame_mut(&mut self, tab: TabId, frame: FrameId) -> Option<&mut SimFrame> {
        self.frames.get_mut(&(tab, frame))
    }

    /// Navigation or tab close: the tab's frames and overlay DOM are gone.
    pub fn remove_tab(&mut self, tab: TabId) {
        self.frames.retain(|(t, _), _| *t != tab);
        self.top_frames.remove(&tab);
        self.connected_ports.retain(|(t, _)| *t != tab);
    }

    // ---- Inspection ----

    pub fn content_log(&self) -> &[(TabId, FrameId, ContentCommand)] {
        &self.content_log
    }

    pub fn port_log(&self) -> &[(TabId, OverlayElement, PortCommand)] {
        &self.port_log
    }

    pub fn port_commands(&self, tab: TabId, element: OverlayElement) -> Vec<&PortCommand> {
        self.port_log
            .iter()
            .filter(|(t, e, _)| *t == tab && *e == element)
            .map(|(_, _, command)| command)
            .collect()
    }

    pub fn commands_to_frame(&self, tab: TabId, frame: FrameId) -> Vec<&ContentCommand> {
        self.content_log
            .iter()
            .filter(|(t, f, _)| *t == tab && *f == frame)
            .map(|(_, _, command)| command)
            .collect()
    }

    pub fn clear_logs(&mut self) {
        self.content_log.clear();
        self.port_log.clear();
    }

    pub fn is_port_connected(&self, tab: TabId, element: OverlayElement) -> bool {
        self.connected_ports.contains(&(tab, element))
    }

    pub fn dom(&self, tab: TabId) -> Option<&SimDom> {
        self.top_frames.get(&tab).map(|top| &top.dom)
    }

    pub fn dom_mut(&mut self, tab: TabId) -> &mut SimDom {
        &mut self.top_frame(tab).dom
    }

    pub fn watchdog(&self, tab: TabId) -> Option<&InlineMenuWatchdog> {
        self.top_frames.get(&tab).map(|top| &top.watchdog)
    }

    // ---- Event loop queues ----

    pub fn pop_pending_content(&mut self) -> Option<(TabId, FrameId, ContentCommand)> {
        self.pending_content.pop_front()
    }

    pub fn pop_inbound(&mut self) -> Option<(MessageSender, ExtensionMessage)> {
        self.inbound.pop_front()
    }

    pub fn pop_port_connection(&mut self) -> Option<(TabId, OverlayElement)> {
        let connection = self.port_connections.pop_front()?;
        self.connected_ports.insert(connection);
        Some(connection)
    }

    /// Queues a message as if a frame of `tab` had sent it.
    pub fn push_inbound(&mut self, sender: MessageSender, message: ExtensionMessage) {
        self.inbound.push_back((sender, message));
    }

    /// Hands the page's queued DOM mutations to the top frame's watchdog.
    pub fn deliver_dom_mutations(&mut self, tab: TabId, now_ms: u64) {
        let sender = self.top_sender(tab);
        let Some(top) = self.top_frames.get_mut(&tab) else {
            return;
        };

        let before = top.attached();
        let records = top.dom.take_element_mutations();
        if !records.is_empty() {
            top.watchdog.on_element_mutations(&mut top.dom, &records, now_ms);
        }
        if top.dom.take_body_mutated() {
            top.watchdog.on_body_mutations(&mut top.dom, now_ms);
        }

        self.settle_top_frame(tab, before, sender);
    }

    fn top_frame(&mut self, tab: TabId) -> &mut TopFrame {
        let breaker = self.breaker_template.clone();
        self.top_frames.entry(tab).or_insert_with(|| TopFrame {
            dom: SimDom::new(),
            watchdog: InlineMenuWatchdog::new(breaker),
        })
    }

    fn top_sender(&self, tab: TabId) -> MessageSender {
        let url = self
            .frames
            .get(&(tab, FrameId::TOP))
            .map(|f| f.details.url.as_str())
            .unwrap_or("");
        MessageSender::top(tab, url)
    }

    fn watchdog_command(&mut self, tab: TabId, command: &ContentCommand) -> Option<ContentReply> {
        let sender = self.top_sender(tab);
        let top = self.top_frame(tab);
        let before = top.attached();
        let reply = top.watchdog.handle_command(&mut top.dom, command);
        self.settle_top_frame(tab, before, sender);
        reply
    }

    /// Connects ports for newly attached containers, drops ports of removed
    /// ones and forwards the watchdog's notifications.
    fn settle_top_frame(&mut self, tab: TabId, before: [bool; 2], sender: MessageSender) {
        let Some(top) = self.top_frames.get_mut(&tab) else {
            return;
        };

        let after = top.attached();
        let outbox = top.watchdog.take_outbox();

        for (index, element) in OverlayElement::ALL.into_iter().enumerate() {
            if !before[index] && after[index] {
                self.port_connections.push_back((tab, element));
            }
            if before[index] && !after[index] {
                self.connected_ports.remove(&(tab, element));
            }
        }

        for message in outbox {
            self.inbound.push_back((sender.clone(), message));
        }
    }
}

impl HostMessenger for SimHost {
    fn frame_details(&self, tab: TabId, frame: FrameId) -> Option<FrameDetails> {
        self.frames.get(&(tab, frame)).map(|f| f.details.clone())
    }

    fn send_to_frame(
        &mut self,
        tab: TabId,
        frame: FrameId,
        command: ContentCommand,
    ) -> Option<ContentReply> {
        self.content_log.push((tab, frame, command.clone()));

        let target = self.frames.get(&(tab, frame))?;
        if !target.responsive {
            debug!(tab = %tab, frame = %frame, "frame did not answer");
            return None;
        }

        match command {
            ContentCommand::GetSubFrameOffsets { sub_frame_url } => {
                let offset = find_iframe_by_src(&target.iframes, &sub_frame_url)
                    .map(|iframe| iframe_offset(iframe, &sub_frame_url, None));
                Some(ContentReply::SubFrameOffset(offset))
            }
            ContentCommand::AppendInlineMenuElements { .. }
            | ContentCommand::CloseInlineMenu { .. }
            | ContentCommand::ToggleInlineMenuHidden { .. }
            | ContentCommand::CheckIsInlineMenuButtonVisible
            | ContentCommand::CheckIsInlineMenuListVisible
                if frame.is_top() =>
            {
                self.watchdog_command(tab, &command)
            }
            other => {
                self.pending_content.push_back((tab, frame, other));
                None
            }
        }
    }

    fn post_to_port(&mut self, tab: TabId, element: OverlayElement, command: PortCommand) {
        self.port_log.push((tab, element, command));
    }
}
