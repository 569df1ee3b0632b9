use crate::field::field_model::PageDetails;
use crate::frame::frame_model::Rect;
use crate::frame::geometry::IframeElement;
use crate::overlay::overlay_model::FieldStyles;

/// The page-side view of one frame's document, as needed by the page observer.
/// Fields are addressed by their collection `opid`.
pub trait PageDocument {
    fn url(&self) -> &str;

    fn is_top_frame(&self) -> bool;

    /// Scans the document and produces a fresh snapshot.
    fn collect_page_details(&self) -> PageDetails;

    fn field_rect(&self, opid: &str) -> Option<Rect>;

    fn field_styles(&self, opid: &str) -> FieldStyles;

    fn field_value(&self, opid: &str) -> String;

    /// The field that currently holds focus in this document, if any.
    fn active_field(&self) -> Option<String>;

    fn focus_field(&mut self, opid: &str);

    fn blur_field(&mut self, opid: &str);

    fn iframes(&self) -> Vec<IframeElement>;

    /// Bottom edge of the visible area in document coordinates.
    fn viewport_bottom(&self) -> f64;
}
