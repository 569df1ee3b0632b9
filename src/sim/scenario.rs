use std::collections::HashSet;
use std::fs;

use serde::Deserialize;

use crate::content::page_observer::{ObserverTimings, PageObserver};
use crate::error::{OverlayError, Result};
use crate::frame::frame_model::{FrameId, Rect, TabId};
use crate::frame::geometry::IframeElement;
use crate::message::router::MessageRouter;
use crate::overlay::overlay_model::{FieldStyles, FocusedFieldData};
use crate::schedule::ManualClock;
use crate::sim::sim_document::SimDocument;
use crate::sim::sim_host::SimHost;
use crate::sim::world::SimWorld;

/// The `<iframe>` element that embeds a frame, as placed in its parent document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioIframe {
    /// Defaults to the embedded frame's url.
    #[serde(default)]
    pub src: Option<String>,
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

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFrame {
    pub id: u32,
    pub url: String,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default = "default_responsive")]
    pub responsive: bool,
    #[serde(default)]
    pub iframe: Option<ScenarioIframe>,
}

fn default_responsive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioField {
    pub frame: u32,
    pub rect: Rect,
    #[serde(default)]
    pub padding_left: f64,
    #[serde(default)]
    pub padding_right: f64,
}

/// A frame tree plus one focused field, loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_tab")]
    pub tab: u32,
    pub frames: Vec<ScenarioFrame>,
    pub focused_field: ScenarioField,
}

fn default_tab() -> u32 {
    1
}

impl Scenario {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| OverlayError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for frame in &self.frames {
            if !ids.insert(frame.id) {
                return Err(OverlayError::InvalidFixture(format!(
                    "duplicate frame id {}",
                    frame.id
                )));
            }
        }

        let top = self.frames.iter().filter(|f| f.parent.is_none()).count();
        if top != 1 || !self.frames.iter().any(|f| f.id == 0 && f.parent.is_none()) {
            return Err(OverlayError::InvalidFixture(
                "exactly one top frame with id 0 is required".to_string(),
            ));
        }

        for frame in &self.frames {
            if let Some(parent) = frame.parent {
                if !ids.contains(&parent) {
                    return Err(OverlayError::InvalidFixture(format!(
                        "frame {} names unknown parent {}",
                        frame.id, parent
                    )));
                }
            }
        }

        if !ids.contains(&self.focused_field.frame) {
            return Err(OverlayError::InvalidFixture(format!(
                "focused field is in unknown frame {}",
                self.focused_field.frame
            )));
        }

        Ok(())
    }

    pub fn tab_id(&self) -> TabId {
        TabId(self.tab)
    }

    pub fn focused_frame(&self) -> FrameId {
        FrameId(self.focused_field.frame)
    }

    pub fn frame_url(&self, frame: FrameId) -> &str {
        self.frames
            .iter()
            .find(|f| f.id == frame.0)
            .map(|f| f.url.as_str())
            .unwrap_or("")
    }

    /// Iframe elements in `parent`'s document, one per embedded child frame.
    fn iframes_of(&self, parent: u32) -> Vec<IframeElement> {
        self.frames
            .iter()
            .filter(|f| f.parent == Some(parent))
            .map(|child| {
                let iframe = child.iframe.clone().unwrap_or_default();
                IframeElement {
                    src: iframe.src.unwrap_or_else(|| child.url.clone()),
                    content_frame: Some(FrameId(child.id)),
                    rect: iframe.rect,
                    padding_top: iframe.padding_top,
                    padding_left: iframe.padding_left,
                    border_top_width: iframe.border_top_width,
                    border_left_width: iframe.border_left_width,
                }
            })
            .collect()
    }

    pub fn focused_field_data(&self) -> FocusedFieldData {
        FocusedFieldData {
            tab_id: self.tab_id(),
            frame_id: self.focused_frame(),
            focused_field_rects: self.focused_field.rect,
            focused_field_styles: FieldStyles {
                padding_left: self.focused_field.padding_left,
                padding_right: self.focused_field.padding_right,
            },
            frame_url: self.frame_url(self.focused_frame()).to_string(),
        }
    }

    pub fn build_host(&self) -> SimHost {
        let tab = self.tab_id();
        let mut host = SimHost::new();
        for frame in &self.frames {
            let id = FrameId(frame.id);
            host.add_frame(tab, id, &frame.url, frame.parent.map(FrameId));
            host.set_responsive(tab, id, frame.responsive);
            for iframe in self.iframes_of(frame.id) {
                host.add_iframe(tab, id, iframe);
            }
        }
        host
    }

    /// One observer per frame, each bounding the window relay at `max_relay_hops`.
    pub fn build_world(
        &self,
        router: MessageRouter,
        clock: ManualClock,
        timings: &ObserverTimings,
        max_relay_hops: usize,
    ) -> SimWorld {
        let mut world = SimWorld::new(router, self.build_host(), clock, self.tab_id());
        for frame in &self.frames {
            let mut document = SimDocument::new(&frame.url, frame.parent.is_none());
            for iframe in self.iframes_of(frame.id) {
                document = document.with_iframe(iframe);
            }
            let observer = PageObserver::new(timings.clone()).with_max_relay_hops(max_relay_hops);
            world.add_frame(FrameId(frame.id), document, observer);
        }
        world
    }
}
