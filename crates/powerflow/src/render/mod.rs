//! Render surface abstraction and the headless document that implements it.

mod document;
mod published;
mod selector;

pub use document::Document;
pub use document::ElementSnapshot;
pub use document::Node;
pub use document::NodeId;
pub use published::PublishedDocument;
pub use selector::Compound;
pub use selector::Selector;
pub use selector::SelectorError;

/// A mutable element of a render surface.
pub trait Element {
    fn set_attribute(&mut self, name: &str, value: &str);

    fn set_text_content(&mut self, text: &str);

    /// Add a class; adding a class that is already present is a no-op.
    fn add_class(&mut self, name: &str);

    /// Remove a class; removing an absent class is a no-op.
    fn remove_class(&mut self, name: &str);
}

/// A DOM-like tree the synchronizer renders into.
pub trait Surface: Send {
    /// First element matching `selector`, or `None` if nothing matches.
    fn query_selector(&mut self, selector: &str) -> Option<&mut dyn Element>;

    /// Called once after all updates for a reading have been applied.
    fn present(&mut self) {}
}
