//! `merge_by_tag` (§4.5, resolved Open Question in §9): coalesces maximal
//! runs of *adjacent* matching siblings within each parent. Non-adjacent
//! matches are never merged together, even if both match the criteria.

use std::collections::HashMap;

use ego_tree::NodeId;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::{MatchCriteria, MatchCriteriaConfig};
use crate::query::QueryEngine;
use crate::traversal::{Context, Traversal};
use crate::tree::{Document, ElementData};

use super::{matcher_err, Pass};

pub struct MergeByTag {
    criteria: MatchCriteria,
    merge_as_text_run: bool,
}

impl MergeByTag {
    pub fn new(criteria: MatchCriteria, merge_as_text_run: bool) -> Self {
        Self {
            criteria,
            merge_as_text_run,
        }
    }

    fn pair_matches(
        &self,
        doc: &Document,
        contexts: &HashMap<NodeId, Context>,
        last: NodeId,
        next: NodeId,
    ) -> Result<bool, DocScraperError> {
        let ctx = contexts.get(&last).expect("every node has a context");
        self.criteria
            .matches(doc, ctx, &[last, next])
            .map_err(|e| matcher_err(self.name(), e))
    }
}

impl Pass for MergeByTag {
    fn name(&self) -> &'static str {
        "merge_by_tag"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let contexts: HashMap<NodeId, Context> =
            Traversal::from_root(doc).map(|ctx| (ctx.id, ctx)).collect();

        let mut parents = Vec::new();
        for ctx in Traversal::from_root(doc) {
            let children: Vec<NodeId> = doc.get(ctx.id).unwrap().children().map(|c| c.id()).collect();
            if children.len() >= 2 {
                parents.push(children);
            }
        }

        for children in parents {
            let mut runs: Vec<Vec<NodeId>> = Vec::new();
            let mut current = vec![children[0]];
            for &next in &children[1..] {
                let last = *current.last().unwrap();
                if self.pair_matches(doc, &contexts, last, next)? {
                    current.push(next);
                } else {
                    runs.push(std::mem::take(&mut current));
                    current = vec![next];
                }
            }
            runs.push(current);

            for run in runs {
                if run.len() < 2 {
                    continue;
                }
                if self.merge_as_text_run {
                    merge_as_text_run(doc, &run);
                } else {
                    merge_by_absorption(doc, &run);
                }
            }
        }
        Ok(())
    }
}

fn merge_as_text_run(doc: &mut Document, run: &[NodeId]) {
    let text: String = run.iter().map(|&id| doc.aggregated_text(id)).collect();
    let new_id = {
        let mut first_mut = doc.tree_mut().get_mut(run[0]).expect("valid node id");
        first_mut.insert_before(ElementData::text_run(text)).id()
    };
    let _ = new_id;
    for &id in run {
        doc.tree_mut().get_mut(id).expect("valid node id").detach();
    }
}

fn merge_by_absorption(doc: &mut Document, run: &[NodeId]) {
    let anchor = run[0];
    for &id in &run[1..] {
        let grandchildren: Vec<NodeId> = doc.get(id).expect("valid node id").children().map(|c| c.id()).collect();
        for gc in grandchildren {
            doc.tree_mut().get_mut(anchor).expect("valid node id").append_id(gc);
        }
        doc.tree_mut().get_mut(id).expect("valid node id").detach();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeByTagConfig {
    #[serde(rename = "match")]
    pub match_: MatchCriteriaConfig,
    #[serde(default)]
    pub merge_as_text_run: bool,
}

impl MergeByTagConfig {
    pub fn compile(&self) -> Result<MergeByTag, DocScraperError> {
        Ok(MergeByTag::new(self.match_.compile()?, self.merge_as_text_run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{ElementExpression, MatchElement};
    use crate::query::HandWrittenQueryEngine;
    use crate::tree::{ElementData, ElementKind};

    #[test]
    fn merges_adjacent_runs_only() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        doc.append_child(root, ElementData::text_run("a")).unwrap();
        doc.append_child(root, ElementData::text_run("b")).unwrap();
        let middle = doc.append_child(root, ElementData::new(ElementKind::Paragraph)).unwrap();
        let _ = middle;
        doc.append_child(root, ElementData::text_run("c")).unwrap();

        // "merge every adjacent pair of TextRuns": `element_types` checks the
        // anchor (`{0}`, i.e. `last`); the expression checks `{1}` (`next`) is
        // also a TextRun. `regex` has no backreferences, so this checks both
        // sides against the same literal rather than comparing them to each
        // other dynamically.
        let criteria = MatchCriteria {
            match_element: MatchElement {
                element_types: Some(vec!["TextRun".to_string()]),
                element_expressions: vec![ElementExpression {
                    expr: "{1.type}".to_string(),
                    regex_match: Some(regex::Regex::new(r"^TextRun$").unwrap()),
                    ignore_key_errors: false,
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let pass = MergeByTag::new(criteria, true);
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let texts: Vec<String> = doc.root().children().map(|c| doc.aggregated_text(c.id())).collect();
        assert_eq!(texts, vec!["ab".to_string(), "".to_string(), "c".to_string()]);
    }
}
