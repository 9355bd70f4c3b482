//! The document tree itself (C1): an arena-backed rose tree with
//! construction-time structural validation (§4.1).

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};

use crate::error::StructuralError;

use super::element::{DocContentData, ElementData, ElementKind, SharedData, TableData};

/// The document tree. Backed by `ego_tree` rather than hand-rolled parent
/// pointers (§9 design notes): `NodeId` is the element's identity for the
/// lifetime of the tree, and passes rewrite the tree in place through the
/// arena's own mutation API instead of juggling raw pointers.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<ElementData>,
}

impl Document {
    /// Build an empty document (no content, no shared style rules).
    pub fn empty() -> Self {
        let tree = Tree::new(ElementData::new(ElementKind::Document(Default::default())));
        Self { tree }
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn tree(&self) -> &Tree<ElementData> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree<ElementData> {
        &mut self.tree
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, ElementData>> {
        self.tree.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<NodeMut<'_, ElementData>> {
        self.tree.get_mut(id)
    }

    pub fn root(&self) -> NodeRef<'_, ElementData> {
        self.tree.root()
    }

    /// Append a freshly constructed subtree under `parent`, validating the
    /// structural invariants of §3.2/§4.1 that apply to `parent`'s kind.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: ElementData,
    ) -> Result<NodeId, StructuralError> {
        validate_child(self.tree.get(parent).expect("valid parent id").value(), &child)?;
        let mut parent_mut = self.tree.get_mut(parent).expect("valid parent id");
        Ok(parent_mut.append(child).id())
    }

    /// Construct a `Table` element with `rows*cols` `DocContent` cells in
    /// row-major order, assigning `(row, col)` coordinates to each cell and
    /// rejecting a cell count that doesn't match the declared geometry
    /// (§3.2, §4.1 "Failure").
    pub fn build_table(
        &mut self,
        parent: NodeId,
        rows: usize,
        cols: usize,
        cells: Vec<ElementData>,
    ) -> Result<NodeId, StructuralError> {
        if cells.len() != rows * cols {
            return Err(StructuralError::TableCellCountMismatch {
                rows,
                cols,
                actual: cells.len(),
            });
        }
        let table_id = self.append_child(
            parent,
            ElementData::new(ElementKind::Table(TableData { rows, cols })),
        )?;
        let mut table_mut = self.tree.get_mut(table_id).expect("just inserted");
        for (index, mut cell) in cells.into_iter().enumerate() {
            let row = index / cols;
            let col = index % cols;
            match &mut cell.kind {
                ElementKind::DocContent(data) => {
                    data.row = Some(row);
                    data.col = Some(col);
                }
                other => {
                    return Err(StructuralError::InvalidChild {
                        kind: "Table",
                        child_kind: other.type_name(),
                    });
                }
            }
            table_mut.append(cell);
        }
        Ok(table_id)
    }

    /// Depth-first concatenation of descendant `TextRun`/`Chips` text, no
    /// separator (§4.1). Leaves define their own aggregated text as
    /// themselves.
    pub fn aggregated_text(&self, id: NodeId) -> String {
        let node = self.tree.get(id).expect("valid node id");
        aggregate(node)
    }

    /// `Section`'s heading-only aggregation (§4.1): restricts to the
    /// heading child (by convention, child 0 once `nest_sections` has run).
    pub fn section_heading_text(&self, section_id: NodeId) -> Option<String> {
        let node = self.tree.get(section_id)?;
        if node.value().kind.as_section().is_none() {
            return None;
        }
        node.first_child().map(aggregate)
    }

    /// `BulletItem`'s "paragraph prefix" aggregation (§4.1): restricts to
    /// the item's own paragraph-element children, excluding any nested
    /// `BulletItem`s.
    pub fn bullet_item_heading_text(&self, item_id: NodeId) -> Option<String> {
        let node = self.tree.get(item_id)?;
        if node.value().kind.as_bullet_item().is_none() {
            return None;
        }
        let mut buf = String::new();
        for child in node.children() {
            if !child.value().kind.is_paragraph_element() {
                break;
            }
            buf.push_str(&aggregate(child));
        }
        Some(buf)
    }

    /// The `(row, col)` of `id` within its nearest enclosing `Table`, if
    /// any (§4.2).
    pub fn table_position(&self, id: NodeId) -> Option<(usize, usize)> {
        let node = self.tree.get(id)?;
        let data = node.value().kind.as_doc_content()?;
        match (data.row, data.col) {
            (Some(r), Some(c)) => Some((r, c)),
            _ => None,
        }
    }

    /// The `DocContent` cell at `(row, col)` within `table_id`, if any
    /// (§4.4 `element_at`).
    pub fn cell_at(&self, table_id: NodeId, row: usize, col: usize) -> Option<NodeId> {
        let table = self.tree.get(table_id)?;
        table
            .children()
            .find(|c| c.value().kind.as_doc_content().map(|d| (d.row, d.col)) == Some((Some(row), Some(col))))
            .map(|c| c.id())
    }

    /// Mutable access to the root's shared style rules (§3.2: shared,
    /// read-only during a pass except `strip_elements`, which has
    /// exclusive access — §5).
    pub fn shared_data_mut(&mut self) -> &mut SharedData {
        &mut self
            .tree
            .root_mut()
            .value()
            .kind
            .as_document_mut()
            .expect("root is always Document")
            .shared_data
    }

    /// The table containing `id`, if `id` is (or is a descendant of) a
    /// `DocContent` cell with coordinates assigned.
    pub fn enclosing_table(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.tree.get(id)?;
        loop {
            if current.value().kind.as_table().is_some() {
                return Some(current.id());
            }
            current = current.parent()?;
        }
    }
}

fn aggregate(node: NodeRef<'_, ElementData>) -> String {
    if let Some(text) = node.value().kind.text() {
        return text.to_string();
    }
    let mut buf = String::new();
    for child in node.children() {
        buf.push_str(&aggregate(child));
    }
    buf
}

fn validate_child(parent: &ElementData, child: &ElementData) -> Result<(), StructuralError> {
    let ok = match &parent.kind {
        ElementKind::Table(_) => child.kind.as_doc_content().is_some(),
        ElementKind::DocContent(_) => matches!(
            child.kind,
            ElementKind::Paragraph | ElementKind::BulletList | ElementKind::Table(_)
        ),
        ElementKind::Paragraph => child.kind.is_paragraph_element(),
        ElementKind::BulletItem(_) => {
            child.kind.is_paragraph_element() || child.kind.as_bullet_item().is_some()
        }
        ElementKind::BulletList => child.kind.as_bullet_item().is_some(),
        ElementKind::Section(_) => matches!(
            child.kind,
            ElementKind::Paragraph
                | ElementKind::BulletList
                | ElementKind::Table(_)
                | ElementKind::Section(_)
        ),
        ElementKind::Document(_) => matches!(
            child.kind,
            ElementKind::Paragraph
                | ElementKind::BulletList
                | ElementKind::Table(_)
                | ElementKind::Section(_)
        ),
        ElementKind::TextRun(_) | ElementKind::Chips(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(StructuralError::InvalidChild {
            kind: parent.kind.type_name(),
            child_kind: child.kind.type_name(),
        })
    }
}

/// A freestanding `DocContent` cell meant to be handed to
/// [`Document::build_table`].
pub fn doc_content_cell() -> ElementData {
    ElementData::new(ElementKind::DocContent(DocContentData::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::element::LeafData;

    fn text_run(text: &str) -> ElementData {
        ElementData::new(ElementKind::TextRun(LeafData {
            text: text.to_string(),
            url: None,
        }))
    }

    fn paragraph() -> ElementData {
        ElementData::new(ElementKind::Paragraph)
    }

    #[test]
    fn aggregated_text_concatenates_leaves_with_no_separator() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc.append_child(root, paragraph()).unwrap();
        doc.append_child(para, text_run("Hello, ")).unwrap();
        doc.append_child(para, text_run("world!")).unwrap();
        assert_eq!(doc.aggregated_text(para), "Hello, world!");
    }

    #[test]
    fn table_with_wrong_cell_count_is_rejected() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let cells = vec![doc_content_cell(), doc_content_cell()];
        let err = doc.build_table(root, 2, 2, cells).unwrap_err();
        assert!(matches!(
            err,
            StructuralError::TableCellCountMismatch {
                rows: 2,
                cols: 2,
                actual: 2
            }
        ));
    }

    #[test]
    fn table_cells_get_row_major_coordinates() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let cells = vec![
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
        ];
        let table = doc.build_table(root, 2, 2, cells).unwrap();
        let coords: Vec<_> = doc
            .get(table)
            .unwrap()
            .children()
            .map(|c| doc.table_position(c.id()).unwrap())
            .collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn rejects_invalid_child_kind() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc.append_child(root, paragraph()).unwrap();
        let err = doc.append_child(para, paragraph()).unwrap_err();
        assert!(matches!(err, StructuralError::InvalidChild { .. }));
    }
}
