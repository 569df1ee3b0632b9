use std::collections::HashMap;

use crate::content::document::PageDocument;
use crate::field::field_model::{FieldDescriptor, FormDescriptor, PageDetails};
use crate::frame::frame_model::Rect;
use crate::frame::geometry::IframeElement;
use crate::overlay::overlay_model::FieldStyles;

/// In-memory frame document: a page snapshot plus the live geometry, values
/// and focus state the observer reads.
#[derive(Debug, Clone, Default)]
pub struct SimDocument {
    url: String,
    is_top: bool,
    page: PageDetails,
    rects: HashMap<String, Rect>,
    styles: HashMap<String, FieldStyles>,
    values: HashMap<String, String>,
    active: Option<String>,
    iframes: Vec<IframeElement>,
    viewport_bottom: f64,
}

impl SimDocument {
    pub fn new(url: &str, is_top: bool) -> Self {
        Self {
            url: url.to_string(),
            is_top,
            page: PageDetails::new(url),
            viewport_bottom: 800.0,
            ..Self::default()
        }
    }

    pub fn with_form(mut self, form: FormDescriptor) -> Self {
        self.page = self.page.with_form(form);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor, rect: Rect) -> Self {
        self.rects.insert(field.opid.clone(), rect);
        self.page = self.page.with_field(field);
        self
    }

    pub fn with_iframe(mut self, iframe: IframeElement) -> Self {
        self.iframes.push(iframe);
        self
    }

    pub fn with_viewport_bottom(mut self, bottom: f64) -> Self {
        self.viewport_bottom = bottom;
        self
    }

    pub fn set_value(&mut self, opid: &str, value: &str) {
        self.values.insert(opid.to_string(), value.to_string());
    }

    pub fn set_styles(&mut self, opid: &str, styles: FieldStyles) {
        self.styles.insert(opid.to_string(), styles);
    }

    /// Moves a field, as a page layout change or scroll would.
    pub fn set_rect(&mut self, opid: &str, rect: Rect) {
        self.rects.insert(opid.to_string(), rect);
    }
}

impl PageDocument for SimDocument {
    fn url(&self) -> &str {
        &self.url
    }

    fn is_top_frame(&self) -> bool {
        self.is_top
    }

    fn collect_page_details(&self) -> PageDetails {
        self.page.clone()
    }

    fn field_rect(&self, opid: &str) -> Option<Rect> {
        self.rects.get(opid).copied()
    }

    fn field_styles(&self, opid: &str) -> FieldStyles {
        self.styles.get(opid).copied().unwrap_or_default()
    }

    fn field_value(&self, opid: &str) -> String {
        self.values.get(opid).cloned().unwrap_or_default()
    }

    fn active_field(&self) -> Option<String> {
        self.active.clone()
    }

    fn focus_field(&mut self, opid: &str) {
        self.active = Some(opid.to_string());
    }

    fn blur_field(&mut self, opid: &str) {
        if self.active.as_deref() == Some(opid) {
            self.active = None;
        }
    }

    fn iframes(&self) -> Vec<IframeElement> {
        self.iframes.clone()
    }

    fn viewport_bottom(&self) -> f64 {
        self.viewport_bottom
    }
}
