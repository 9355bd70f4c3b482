//! C1: the typed document tree model (§3.1, §4.1).

pub mod document;
pub mod element;

pub use document::{doc_content_cell, Document};
pub use element::{
    Attrs, BulletItemData, DocContentData, DocumentData, ElementData, ElementKind, LeafData,
    ListType, SectionData, SharedData, StrMap, TableData,
};
