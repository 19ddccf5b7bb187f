pub mod document;
pub mod tree;

pub use document::{Document, ElementId};
pub use tree::{Element, TreeDocument};
