//! `drop_elements` (§4.5): removes matched elements (and, implicitly,
//! their descendants) while preserving sibling order among survivors.

use std::collections::HashSet;

use ego_tree::NodeId;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::{MatchCriteria, MatchCriteriaConfig};
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::Document;

use super::{matcher_err, Pass};

pub struct DropElements {
    criteria: MatchCriteria,
}

impl DropElements {
    pub fn new(criteria: MatchCriteria) -> Self {
        Self { criteria }
    }
}

impl Pass for DropElements {
    fn name(&self) -> &'static str {
        "drop_elements"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut matched = Vec::new();
        for ctx in Traversal::from_root(doc) {
            if self
                .criteria
                .matches(doc, &ctx, &[ctx.id])
                .map_err(|e| matcher_err(self.name(), e))?
            {
                matched.push(ctx.id);
            }
        }
        let matched_set: HashSet<NodeId> = matched.iter().copied().collect();
        let root = doc.root_id();
        for id in matched {
            if id == root || has_matched_ancestor(doc, id, &matched_set) {
                continue;
            }
            doc.tree_mut().get_mut(id).expect("valid node id").detach();
        }
        Ok(())
    }
}

fn has_matched_ancestor(doc: &Document, id: NodeId, matched: &HashSet<NodeId>) -> bool {
    doc.get(id)
        .expect("valid node id")
        .ancestors()
        .any(|a| matched.contains(&a.id()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropElementsConfig {
    #[serde(rename = "match")]
    pub match_: MatchCriteriaConfig,
}

impl DropElementsConfig {
    pub fn compile(&self) -> Result<DropElements, DocScraperError> {
        Ok(DropElements::new(self.match_.compile()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchElement;
    use crate::query::HandWrittenQueryEngine;
    use crate::tree::{ElementData, ElementKind};

    #[test]
    fn drops_matched_elements_and_their_descendants() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc.append_child(root, ElementData::new(ElementKind::Paragraph)).unwrap();
        doc.append_child(para, ElementData::text_run("drop me")).unwrap();
        let survivor = doc.append_child(root, ElementData::new(ElementKind::Paragraph)).unwrap();
        doc.append_child(survivor, ElementData::text_run("keep")).unwrap();

        let criteria = MatchCriteria {
            match_element: MatchElement {
                aggregated_text_regex: Some(regex::Regex::new(r"^(?:drop me)$").unwrap()),
                ..Default::default()
            },
            ..Default::default()
        };
        let pass = DropElements::new(criteria);
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        assert!(doc.get(para).is_none() || doc.root().children().all(|c| c.id() != para));
        assert!(doc.root().children().any(|c| c.id() == survivor));
    }
}
