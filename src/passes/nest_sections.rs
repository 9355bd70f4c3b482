//! `nest_sections` (§4.5): builds the `Section` hierarchy from flat heading
//! paragraphs, via the same level-stack algorithm `nest_bullets` uses
//! (itself grounded in `HasLevel::build_tree`). A heading is a `Paragraph`
//! whose `attribs[heading_attrib]` reads `h1`..`h6` (§6.2: the parser is
//! expected to carry the source tag name through verbatim).

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::{Document, ElementData, ElementKind};

use super::Pass;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^h([1-6])$").expect("static pattern is valid"));

fn default_heading_attrib() -> String {
    "tag".to_string()
}

pub struct NestSections {
    heading_attrib: String,
}

impl NestSections {
    pub fn new(heading_attrib: String) -> Self {
        Self { heading_attrib }
    }

    fn heading_level(&self, doc: &Document, id: NodeId) -> Option<u8> {
        let node = doc.get(id).expect("valid node id").value();
        if !matches!(node.kind, ElementKind::Paragraph) {
            return None;
        }
        let tag = node.attrs.attribs.get(&self.heading_attrib)?;
        let caps = HEADING_RE.captures(tag)?;
        caps[1].parse().ok()
    }
}

/// Reparent headings (and everything that follows them at a deeper scope)
/// out of `children` into a freshly built `Section` hierarchy, leaving any
/// leading non-heading content at the original parent.
fn nest_children(pass: &NestSections, doc: &mut Document, children: &[NodeId]) {
    let mut stack: Vec<(u8, NodeId)> = Vec::new();

    for &child in children {
        if let Some(level) = pass.heading_level(doc, child) {
            while let Some(&(top_level, _)) = stack.last() {
                if top_level >= level {
                    stack.pop();
                } else {
                    break;
                }
            }
            let section_id = doc
                .tree_mut()
                .get_mut(child)
                .expect("valid node id")
                .insert_before(ElementData::new(ElementKind::Section(crate::tree::SectionData { level })))
                .id();
            if let Some(&(_, parent_section)) = stack.last() {
                doc.tree_mut().get_mut(parent_section).expect("valid node id").append_id(section_id);
            }
            doc.tree_mut().get_mut(section_id).expect("valid node id").append_id(child);
            stack.push((level, section_id));
        } else if let Some(&(_, parent_section)) = stack.last() {
            doc.tree_mut().get_mut(parent_section).expect("valid node id").append_id(child);
        }
    }
}

impl Pass for NestSections {
    fn name(&self) -> &'static str {
        "nest_sections"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut parents_children = Vec::new();
        for ctx in Traversal::from_root(doc) {
            let children: Vec<NodeId> = doc.get(ctx.id).expect("valid node id").children().map(|c| c.id()).collect();
            parents_children.push(children);
        }
        for children in parents_children {
            nest_children(self, doc, &children);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestSectionsConfig {
    #[serde(default = "default_heading_attrib")]
    pub heading_attrib: String,
}

impl Default for NestSectionsConfig {
    fn default() -> Self {
        Self {
            heading_attrib: default_heading_attrib(),
        }
    }
}

impl NestSectionsConfig {
    pub fn compile(&self) -> Result<NestSections, DocScraperError> {
        Ok(NestSections::new(self.heading_attrib.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::HandWrittenQueryEngine;
    use crate::tree::{Attrs, ElementData, ElementKind, StrMap};

    fn heading(tag: &str, text: &str) -> (ElementData, ElementData) {
        let mut attribs = StrMap::new();
        attribs.insert("tag".to_string(), tag.to_string());
        let mut para = ElementData::new(ElementKind::Paragraph);
        para.attrs = Attrs::with_attribs(attribs);
        (para, ElementData::text_run(text))
    }

    #[test]
    fn nests_deeper_heading_under_shallower_one() {
        let mut doc = Document::empty();
        let root = doc.root_id();

        let (h1, h1_text) = heading("h1", "Top");
        let h1_id = doc.append_child(root, h1).unwrap();
        doc.append_child(h1_id, h1_text).unwrap();

        let (h2, h2_text) = heading("h2", "Sub");
        let h2_id = doc.append_child(root, h2).unwrap();
        doc.append_child(h2_id, h2_text).unwrap();

        let body = doc.append_child(root, ElementData::new(ElementKind::Paragraph)).unwrap();
        doc.append_child(body, ElementData::text_run("body text")).unwrap();

        let pass = NestSections::new("tag".to_string());
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let top_sections: Vec<_> = doc.root().children().collect();
        assert_eq!(top_sections.len(), 1);
        assert_eq!(top_sections[0].value().kind.as_section().unwrap().level, 1);
        let top_section_children: Vec<_> = top_sections[0].children().collect();
        assert_eq!(top_section_children.len(), 2);
        assert_eq!(top_section_children[1].value().kind.as_section().unwrap().level, 2);
        let nested_children: Vec<_> = top_section_children[1].children().collect();
        assert_eq!(nested_children.len(), 2);
        assert_eq!(doc.aggregated_text(nested_children[1].id()), "body text");
    }

    #[test]
    fn is_idempotent() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let (h1, h1_text) = heading("h1", "Top");
        let h1_id = doc.append_child(root, h1).unwrap();
        doc.append_child(h1_id, h1_text).unwrap();
        doc.append_child(root, ElementData::text_run("body")).unwrap();

        let pass = NestSections::new("tag".to_string());
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();
        let once = crate::query::project_document(&doc);
        pass.apply(&mut doc, &engine).unwrap();
        let twice = crate::query::project_document(&doc);
        assert_eq!(once, twice);
    }
}
