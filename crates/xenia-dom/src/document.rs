use xenia_core::{ClassSelector, Fragment, XeniaResult};

pub type ElementId = u64;

/// Query and mutation capability over a document. The poll task only ever
/// talks to this trait; lookups are performed fresh on every call, never
/// cached across ticks.
pub trait Document: Send + Sync {
    /// First element in document order carrying the class, if any.
    fn find_by_class(&self, class: &ClassSelector) -> Option<ElementId>;

    /// First descendant of `parent` carrying the class, if any. `parent`
    /// itself is not considered.
    fn find_child_by_class(&self, parent: ElementId, class: &ClassSelector) -> Option<ElementId>;

    /// Remove every existing child of `target` and install a single element
    /// rendered from `fragment`. Returns the new child's id. Errors if
    /// `target` no longer resolves.
    fn replace_content(&self, target: ElementId, fragment: &Fragment) -> XeniaResult<ElementId>;
}
