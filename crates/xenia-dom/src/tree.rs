use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;
use xenia_core::{ClassSelector, Fragment, XeniaError, XeniaResult};

use crate::document::{Document, ElementId};

#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub id: ElementId,
    pub tag: String,
    pub classes: Vec<String>,
    pub text: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Element {
    pub fn has_class(&self, class: &ClassSelector) -> bool {
        self.classes.iter().any(|c| c == class.as_str())
    }
}

/// Shared in-memory element tree. The embedding side mutates it while a
/// poll task queries it; entry locks are held only for short, non-nested
/// sections.
pub struct TreeDocument {
    nodes: DashMap<ElementId, Element>,
    next_id: AtomicU64,
    root: ElementId,
}

impl TreeDocument {
    /// An empty document with a `body` root element.
    pub fn new() -> Self {
        let nodes = DashMap::new();
        nodes.insert(
            1,
            Element {
                id: 1,
                tag: "body".to_string(),
                classes: Vec::new(),
                text: String::new(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            next_id: AtomicU64::new(2),
            root: 1,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Detached element; attach it with [`append_child`](Self::append_child).
    pub fn create_element(&self, tag: &str, classes: &[&str], text: &str) -> ElementId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.nodes.insert(
            id,
            Element {
                id,
                tag: tag.to_string(),
                classes: classes.iter().map(|c| c.to_string()).collect(),
                text: text.to_string(),
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn append_child(&self, parent: ElementId, child: ElementId) -> XeniaResult<()> {
        {
            let mut node = self
                .nodes
                .get_mut(&child)
                .ok_or_else(|| XeniaError::Document(format!("element {child} not in document")))?;
            node.parent = Some(parent);
        }
        let mut node = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| XeniaError::Document(format!("element {parent} not in document")))?;
        node.children.push(child);
        Ok(())
    }

    pub fn set_text(&self, id: ElementId, text: &str) -> XeniaResult<()> {
        let mut node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| XeniaError::Document(format!("element {id} not in document")))?;
        node.text = text.to_string();
        Ok(())
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.nodes.get(&id).map(|e| e.value().clone())
    }

    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(&id)
            .map(|e| e.value().children.clone())
            .unwrap_or_default()
    }

    pub fn remove_subtree(&self, id: ElementId) {
        for descendant in self.collect_subtree(id) {
            self.nodes.remove(&descendant);
        }
    }

    /// Every element anywhere in the document carrying the class.
    pub fn count_by_class(&self, class: &ClassSelector) -> usize {
        self.collect_subtree(self.root)
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .map(|e| e.has_class(class))
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn to_html(&self) -> String {
        self.html_of(self.root)
    }

    pub fn html_of(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.element(id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        if !node.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&node.classes.join(" "));
            out.push('"');
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            self.render_into(*child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    fn collect_subtree(&self, start: ElementId) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                found.push(id);
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        found
    }

    /// Depth-first walk from `start`, document order.
    fn find_in(
        &self,
        start: ElementId,
        class: &ClassSelector,
        include_self: bool,
    ) -> Option<ElementId> {
        let mut stack = if include_self {
            vec![start]
        } else {
            let mut children = self.children_of(start);
            children.reverse();
            children
        };
        while let Some(id) = stack.pop() {
            let Some(node) = self.element(id) else {
                continue;
            };
            if node.has_class(class) {
                return Some(id);
            }
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        None
    }
}

impl Default for TreeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for TreeDocument {
    fn find_by_class(&self, class: &ClassSelector) -> Option<ElementId> {
        self.find_in(self.root, class, true)
    }

    fn find_child_by_class(&self, parent: ElementId, class: &ClassSelector) -> Option<ElementId> {
        self.find_in(parent, class, false)
    }

    fn replace_content(&self, target: ElementId, fragment: &Fragment) -> XeniaResult<ElementId> {
        let old_children = {
            let mut node = self.nodes.get_mut(&target).ok_or_else(|| {
                XeniaError::Document(format!("element {target} not in document"))
            })?;
            std::mem::take(&mut node.children)
        };
        for child in &old_children {
            self.remove_subtree(*child);
        }

        let installed = self.create_element(&fragment.tag, &[&fragment.class], &fragment.text);
        {
            let mut node = self
                .nodes
                .get_mut(&installed)
                .expect("freshly created element is present");
            node.parent = Some(target);
        }
        let mut node = self.nodes.get_mut(&target).ok_or_else(|| {
            self.nodes.remove(&installed);
            XeniaError::Document(format!("element {target} removed during replacement"))
        })?;
        node.children.push(installed);
        debug!(
            target,
            removed = old_children.len(),
            installed,
            "content replaced"
        );
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watermark_doc() -> (TreeDocument, ElementId) {
        let doc = TreeDocument::new();
        let header = doc.create_element("header", &[], "");
        doc.append_child(doc.root(), header).unwrap();
        let watermark = doc.create_element("div", &["card", "watermark"], "");
        doc.append_child(doc.root(), watermark).unwrap();
        (doc, watermark)
    }

    #[test]
    fn find_by_class_returns_first_in_document_order() {
        let doc = TreeDocument::new();
        let outer = doc.create_element("div", &["watermark"], "first");
        doc.append_child(doc.root(), outer).unwrap();
        let later = doc.create_element("div", &["watermark"], "second");
        doc.append_child(doc.root(), later).unwrap();

        let sel = ClassSelector::watermark();
        assert_eq!(doc.find_by_class(&sel), Some(outer));
    }

    #[test]
    fn find_by_class_matches_multi_class_attributes() {
        let (doc, watermark) = watermark_doc();
        assert_eq!(doc.find_by_class(&ClassSelector::watermark()), Some(watermark));
        assert_eq!(doc.find_by_class(&ClassSelector::parse("missing").unwrap()), None);
    }

    #[test]
    fn find_child_searches_descendants_only() {
        let (doc, watermark) = watermark_doc();
        let sel = ClassSelector::watermark();
        // the watermark element itself does not count as its own child
        assert_eq!(doc.find_child_by_class(watermark, &sel), None);

        let wrapper = doc.create_element("div", &[], "");
        doc.append_child(watermark, wrapper).unwrap();
        let badge = doc.create_element("span", &["powered-by-xenia"], "x");
        doc.append_child(wrapper, badge).unwrap();
        assert_eq!(
            doc.find_child_by_class(watermark, &ClassSelector::badge()),
            Some(badge)
        );
    }

    #[test]
    fn replace_content_drops_prior_children() {
        let (doc, watermark) = watermark_doc();
        let spinner = doc.create_element("div", &["spinner"], "loading...");
        doc.append_child(watermark, spinner).unwrap();

        let installed = doc
            .replace_content(watermark, &Fragment::badge())
            .unwrap();

        assert_eq!(doc.children_of(watermark), vec![installed]);
        assert!(doc.element(spinner).is_none());
        let badge = doc.element(installed).unwrap();
        assert_eq!(badge.tag, "span");
        assert_eq!(badge.text, "Powered by DMI");
        assert_eq!(badge.parent, Some(watermark));
    }

    #[test]
    fn replace_content_fails_for_unknown_element() {
        let doc = TreeDocument::new();
        assert!(doc.replace_content(999, &Fragment::badge()).is_err());
    }

    #[test]
    fn to_html_renders_nested_tree() {
        let (doc, watermark) = watermark_doc();
        doc.replace_content(watermark, &Fragment::badge()).unwrap();
        assert_eq!(
            doc.to_html(),
            "<body><header></header><div class=\"card watermark\">\
             <span class=\"powered-by-xenia\">Powered by DMI</span></div></body>"
        );
    }

    #[test]
    fn count_by_class_covers_whole_document() {
        let (doc, watermark) = watermark_doc();
        let sel = ClassSelector::badge();
        assert_eq!(doc.count_by_class(&sel), 0);
        doc.replace_content(watermark, &Fragment::badge()).unwrap();
        assert_eq!(doc.count_by_class(&sel), 1);
    }
}
