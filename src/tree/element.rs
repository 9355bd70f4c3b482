//! Element variants for the document tree (§3.1).
//!
//! Children are held by the arena (`ego_tree`), not by these structs; a
//! handful of variants (`Section`, `BulletItem`) give their children a
//! positional meaning documented on the variant itself, since the arena
//! only offers an ordered list of children, not named slots.

use std::collections::BTreeMap;

pub type StrMap = BTreeMap<String, String>;

/// Tags, style and source `attribs`, carried by every element (§3.1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attrs {
    pub tags: StrMap,
    pub style: StrMap,
    pub attribs: StrMap,
}

impl Attrs {
    pub fn with_attribs(attribs: StrMap) -> Self {
        Self {
            attribs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListType {
    #[default]
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeafData {
    pub text: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableData {
    pub rows: usize,
    pub cols: usize,
}

/// A table cell. `row`/`col` are `None` until the element is placed inside
/// a `Table` (§4.2: row/col are only defined within an enclosing table).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocContentData {
    pub row: Option<usize>,
    pub col: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionData {
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulletItemData {
    pub level: u32,
    pub list_type: ListType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SharedData {
    pub style_rules: BTreeMap<String, StrMap>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentData {
    pub attrs: StrMap,
    pub shared_data: SharedData,
}

/// The discriminated union of §3.1. Every variant additionally carries the
/// shared `Attrs` record through `Element::attrs`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Document(DocumentData),
    /// Children: `[heading]` followed by `content`. Before `nest_sections`
    /// runs, bare `Paragraph` headings live as ordinary siblings instead.
    Section(SectionData),
    Table(TableData),
    DocContent(DocContentData),
    Paragraph,
    BulletList,
    /// Children: paragraph elements (`TextRun`/`Chips`) first, then nested
    /// `BulletItem`s once `nest_bullets` has run.
    BulletItem(BulletItemData),
    TextRun(LeafData),
    Chips(LeafData),
}

impl ElementKind {
    /// The concrete type name used by `element_types` matching (§4.3).
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Document(_) => "Document",
            ElementKind::Section(_) => "Section",
            ElementKind::Table(_) => "Table",
            ElementKind::DocContent(_) => "DocContent",
            ElementKind::Paragraph => "Paragraph",
            ElementKind::BulletList => "BulletList",
            ElementKind::BulletItem(_) => "BulletItem",
            ElementKind::TextRun(_) => "TextRun",
            ElementKind::Chips(_) => "Chips",
        }
    }

    /// Whether this element matches an abstract/polymorphic type name.
    /// Only `ParagraphElement` is abstract today (§4.3): it matches any
    /// inline leaf that can appear directly in a paragraph.
    pub fn matches_type_name(&self, name: &str) -> bool {
        if name == self.type_name() {
            return true;
        }
        if name == "ParagraphElement" {
            return matches!(self, ElementKind::TextRun(_) | ElementKind::Chips(_));
        }
        false
    }

    pub fn is_paragraph_element(&self) -> bool {
        matches!(self, ElementKind::TextRun(_) | ElementKind::Chips(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ElementKind::TextRun(leaf) | ElementKind::Chips(leaf) => Some(leaf.text.as_str()),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            ElementKind::TextRun(leaf) | ElementKind::Chips(leaf) => Some(&mut leaf.text),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentData> {
        match self {
            ElementKind::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut DocumentData> {
        match self {
            ElementKind::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableData> {
        match self {
            ElementKind::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_doc_content(&self) -> Option<&DocContentData> {
        match self {
            ElementKind::DocContent(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_doc_content_mut(&mut self) -> Option<&mut DocContentData> {
        match self {
            ElementKind::DocContent(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_bullet_item(&self) -> Option<&BulletItemData> {
        match self {
            ElementKind::BulletItem(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&SectionData> {
        match self {
            ElementKind::Section(s) => Some(s),
            _ => None,
        }
    }
}

/// A single arena node's payload: its kind plus the shared attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub kind: ElementKind,
    pub attrs: Attrs,
}

impl ElementData {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attrs: Attrs::default(),
        }
    }

    pub fn text_run(text: impl Into<String>) -> Self {
        Self::new(ElementKind::TextRun(LeafData {
            text: text.into(),
            url: None,
        }))
    }
}
