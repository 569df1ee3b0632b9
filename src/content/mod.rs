pub mod document;
pub mod page_observer;
