use crate::message::command::StyleMap;

/// Opaque handle to an element owned by an `OverlayDom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub u64);

/// One observed change to the page's DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    Attributes {
        target: ElementHandle,
        attribute_name: String,
    },
    ChildList,
}

impl MutationRecord {
    pub fn attribute(target: ElementHandle, attribute_name: &str) -> Self {
        MutationRecord::Attributes {
            target,
            attribute_name: attribute_name.to_string(),
        }
    }
}

/// The slice of the top-frame document the watchdog manipulates.
///
/// Changes made through this trait are the watchdog's own and must not be
/// reported back to it as mutations.
pub trait OverlayDom {
    fn create_element(&mut self, tag: &str) -> ElementHandle;

    /// Appends to the end of `<body>`, moving the element if it is already there.
    fn append_to_body(&mut self, element: ElementHandle);

    fn insert_before(&mut self, element: ElementHandle, reference: ElementHandle);

    fn remove(&mut self, element: ElementHandle);

    fn is_attached(&self, element: ElementHandle) -> bool;

    /// Replaces the element's inline style with `styles`, all marked important.
    fn set_styles(&mut self, element: ElementHandle, styles: &StyleMap);

    fn remove_attribute(&mut self, element: ElementHandle, name: &str);

    fn attribute_names(&self, element: ElementHandle) -> Vec<String>;

    /// `(second_to_last, last)` element children of `<body>`.
    fn last_body_children(&self) -> (Option<ElementHandle>, Option<ElementHandle>);
}
