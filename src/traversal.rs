//! C2: traversal and per-element context (§4.2).
//!
//! Built on `ego_tree`'s own `traverse()` (an `Edge::Open`/`Edge::Close`
//! walk), the same primitive `heading.rs` in the teacher uses to print an
//! indented tree — here it additionally threads an ancestor-path stack so
//! every yielded element knows its full lineage.

use ego_tree::iter::Edge;
use ego_tree::NodeId;

use crate::tree::Document;

/// Everything the matcher and variable engine need about one element in
/// its traversal position (§4.2).
#[derive(Debug, Clone)]
pub struct Context {
    pub id: NodeId,
    /// Root-to-parent, excluding `id` itself.
    pub ancestors: Vec<NodeId>,
    /// `(row, col)` within the enclosing `Table`, if any.
    pub table_position: Option<(usize, usize)>,
    pub sibling_index: usize,
    pub sibling_count: usize,
}

impl Context {
    pub fn is_first(&self) -> bool {
        self.sibling_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.sibling_index + 1 == self.sibling_count
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.ancestors.last().copied()
    }
}

/// A lazy, restartable preorder depth-first traversal over a document (or
/// any of its subtrees).
pub struct Traversal<'a> {
    doc: &'a Document,
    inner: ego_tree::iter::Traverse<'a, crate::tree::ElementData>,
    ancestors: Vec<NodeId>,
}

impl<'a> Traversal<'a> {
    pub fn from_root(doc: &'a Document) -> Self {
        Self::from_node(doc, doc.root_id())
    }

    /// Resume traversal at `start`, a descendant (or the root) of `doc`.
    /// Ancestors reported for elements of the subtree are the element's
    /// *real* ancestors in `doc`, not relative to `start` — so ancestor
    /// matching still works for nested queries evaluated on a sub-item
    /// (§4.2 "resuming traversal at a sub-tree for nested queries").
    pub fn from_node(doc: &'a Document, start: NodeId) -> Self {
        let node = doc.get(start).expect("valid node id");
        let ancestors: Vec<NodeId> = node.ancestors().map(|a| a.id()).collect::<Vec<_>>();
        let ancestors: Vec<NodeId> = ancestors.into_iter().rev().collect();
        Self {
            doc,
            inner: node.traverse(),
            ancestors,
        }
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Context;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Edge::Open(node) => {
                    let sibling_index = node.prev_siblings().count();
                    let sibling_count =
                        sibling_index + 1 + node.next_siblings().count();
                    let ctx = Context {
                        id: node.id(),
                        ancestors: self.ancestors.clone(),
                        table_position: self.doc.table_position(node.id()),
                        sibling_index,
                        sibling_count,
                    };
                    self.ancestors.push(node.id());
                    return Some(ctx);
                }
                Edge::Close(_) => {
                    self.ancestors.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{doc_content_cell, ElementData, ElementKind};

    #[test]
    fn preorder_visits_parent_before_children() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(root, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        doc.append_child(para, ElementData::text_run("hi")).unwrap();

        let order: Vec<_> = Traversal::from_root(&doc).map(|c| c.id).collect();
        assert_eq!(order, vec![root, para, order[2]]);
    }

    #[test]
    fn ancestors_are_root_to_parent() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(root, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        let run = doc.append_child(para, ElementData::text_run("hi")).unwrap();

        let ctx = Traversal::from_root(&doc).find(|c| c.id == run).unwrap();
        assert_eq!(ctx.ancestors, vec![root, para]);
    }

    #[test]
    fn table_position_is_reported_for_cells() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let cells = vec![
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
        ];
        let table = doc.build_table(root, 2, 2, cells).unwrap();
        let cell_1_1 = doc.get(table).unwrap().children().nth(3).unwrap().id();
        let ctx = Traversal::from_root(&doc).find(|c| c.id == cell_1_1).unwrap();
        assert_eq!(ctx.table_position, Some((1, 1)));
    }

    #[test]
    fn resuming_at_a_subtree_keeps_real_ancestors() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(root, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        let run = doc.append_child(para, ElementData::text_run("hi")).unwrap();

        let ctx = Traversal::from_node(&doc, para)
            .find(|c| c.id == run)
            .unwrap();
        assert_eq!(ctx.ancestors, vec![root, para]);
    }
}
