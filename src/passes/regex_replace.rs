//! `regex_replace` (§4.5): applies an ordered substitution chain to the
//! text of every matched `TextRun`/`Chips` leaf, reusing the same step
//! shape the variable engine's `substitutions` kind evaluates.

use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::{MatchCriteria, MatchCriteriaConfig};
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::Document;
use crate::variables::{apply_substitutions, SubstitutionStep, SubstitutionStepConfig};

use super::{matcher_err, Pass};

pub struct RegexReplace {
    match_: MatchCriteria,
    steps: Vec<SubstitutionStep>,
}

impl RegexReplace {
    pub fn new(match_: MatchCriteria, steps: Vec<SubstitutionStep>) -> Self {
        Self { match_, steps }
    }
}

impl Pass for RegexReplace {
    fn name(&self) -> &'static str {
        "regex_replace"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut matched = Vec::new();
        for ctx in Traversal::from_root(doc) {
            if doc.get(ctx.id).expect("valid node id").value().kind.text().is_none() {
                continue;
            }
            if self
                .match_
                .matches(doc, &ctx, &[ctx.id])
                .map_err(|e| matcher_err(self.name(), e))?
            {
                matched.push(ctx.id);
            }
        }

        for id in matched {
            let mut node = doc.tree_mut().get_mut(id).expect("valid node id");
            let text = node.value().kind.text_mut().expect("filtered to text-bearing elements above");
            *text = apply_substitutions(text, &self.steps);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexReplaceConfig {
    #[serde(rename = "match")]
    pub match_: MatchCriteriaConfig,
    pub substitutions: Vec<SubstitutionStepConfig>,
}

impl RegexReplaceConfig {
    pub fn compile(&self) -> Result<RegexReplace, DocScraperError> {
        let match_ = self.match_.compile().map_err(|e| matcher_err("regex_replace", e))?;
        let steps = self
            .substitutions
            .iter()
            .map(SubstitutionStepConfig::compile)
            .collect::<Result<_, _>>()
            .map_err(|e| matcher_err("regex_replace", e))?;
        Ok(RegexReplace::new(match_, steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchElement;
    use crate::query::HandWrittenQueryEngine;
    use crate::variables::Operation;

    #[test]
    fn replaces_text_in_matched_leaves_only() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, crate::tree::ElementData::text_run("hello world")).unwrap();
        let para = doc.append_child(root, crate::tree::ElementData::new(crate::tree::ElementKind::Paragraph)).unwrap();
        let _ = para;

        let match_ = MatchCriteria {
            match_element: MatchElement {
                element_types: Some(vec!["TextRun".to_string()]),
                ..Default::default()
            },
            ..Default::default()
        };
        let steps = vec![SubstitutionStep {
            regex: regex::Regex::new(r"world").unwrap(),
            substitute: "rust".to_string(),
            operation: Operation::Upper,
        }];
        let pass = RegexReplace::new(match_, steps);
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        assert_eq!(doc.aggregated_text(run), "hello RUST");
    }
}
