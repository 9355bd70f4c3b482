//! `tag_matching` (§4.5, §8.1 "tree is unchanged on variable failure"): the
//! one pass that drives the variable engine (C4). `ignore_errors` gates
//! both variable resolution and `tags.add` template rendering — either
//! failure leaves the matched element untouched rather than partially
//! updated.

use std::collections::BTreeMap;

use ego_tree::NodeId;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::{MatchCriteria, MatchCriteriaConfig};
use crate::query::QueryEngine;
use crate::template::{self, Bound};
use crate::traversal::Traversal;
use crate::tree::Document;
use crate::variables::{compute_variables, VariableSpec, VariableSpecConfig};

use super::{matcher_err, tag_update::apply_remove, Pass, TagUpdateConfig};

pub struct TagMatching {
    match_: MatchCriteria,
    variables: BTreeMap<String, VariableSpec>,
    tags_add: BTreeMap<String, String>,
    tags_remove: Vec<String>,
    ignore_errors: bool,
}

impl TagMatching {
    pub fn new(
        match_: MatchCriteria,
        variables: BTreeMap<String, VariableSpec>,
        tags_add: BTreeMap<String, String>,
        tags_remove: Vec<String>,
        ignore_errors: bool,
    ) -> Self {
        Self {
            match_,
            variables,
            tags_add,
            tags_remove,
            ignore_errors,
        }
    }

    /// Resolve `variables` and render every `tags.add` template for one
    /// matched element, returning `None` (leave it untouched) on a
    /// suppressed failure.
    fn resolve(&self, doc: &Document, id: NodeId, engine: &dyn QueryEngine) -> Result<Option<BTreeMap<String, String>>, DocScraperError> {
        let ctx = Traversal::from_node(doc, id).next().expect("id is itself the first yielded node");
        let bindings: BTreeMap<String, Bound> = match compute_variables(&self.variables, doc, &ctx, engine) {
            Ok(b) => b,
            Err(e) if self.ignore_errors => {
                log::warn!("tag_matching: skipping element, variable resolution failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(matcher_err(self.name(), e)),
        };

        let mut rendered = BTreeMap::new();
        for (key, template_str) in &self.tags_add {
            let label = format!("tag_matching.tags.add[{key}]");
            match template::render(&label, template_str, &bindings) {
                Ok(v) => {
                    rendered.insert(key.clone(), v);
                }
                Err(e) if self.ignore_errors => {
                    log::warn!("tag_matching: skipping element, tags.add rendering failed: {e}");
                    return Ok(None);
                }
                Err(e) => return Err(matcher_err(self.name(), e)),
            }
        }
        Ok(Some(rendered))
    }
}

impl Pass for TagMatching {
    fn name(&self) -> &'static str {
        "tag_matching"
    }

    fn apply(&self, doc: &mut Document, engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut matched = Vec::new();
        for ctx in Traversal::from_root(doc) {
            if self
                .match_
                .matches(doc, &ctx, &[ctx.id])
                .map_err(|e| matcher_err(self.name(), e))?
            {
                matched.push(ctx.id);
            }
        }

        let mut updates = Vec::new();
        for id in matched {
            if let Some(rendered) = self.resolve(doc, id, engine)? {
                updates.push((id, rendered));
            }
        }

        for (id, rendered) in updates {
            let mut node = doc.tree_mut().get_mut(id).expect("valid node id");
            let tags = &mut node.value().attrs.tags;
            apply_remove(&self.tags_remove, tags);
            for (k, v) in rendered {
                tags.insert(k, v);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagMatchingConfig {
    #[serde(rename = "match")]
    pub match_: MatchCriteriaConfig,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpecConfig>,
    #[serde(default)]
    pub tags: TagUpdateConfig,
    #[serde(default)]
    pub ignore_errors: bool,
}

impl TagMatchingConfig {
    pub fn compile(&self) -> Result<TagMatching, DocScraperError> {
        let match_ = self.match_.compile().map_err(|e| matcher_err("tag_matching", e))?;
        let variables = self
            .variables
            .iter()
            .map(|(name, cfg)| Ok((name.clone(), cfg.compile().map_err(|e| matcher_err("tag_matching", e))?)))
            .collect::<Result<_, DocScraperError>>()?;
        Ok(TagMatching::new(
            match_,
            variables,
            self.tags.add.clone(),
            self.tags.remove.clone(),
            self.ignore_errors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::HandWrittenQueryEngine;
    use crate::tree::ElementData;
    use crate::variables::{ElementAtSpec, VariableSpec};

    #[test]
    fn renders_add_template_with_a_fixed_value() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, ElementData::text_run("hi")).unwrap();

        let pass = TagMatching::new(
            MatchCriteria::default(),
            BTreeMap::new(),
            BTreeMap::from([("label".to_string(), "fixed".to_string())]),
            Vec::new(),
            false,
        );
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();
        assert_eq!(doc.get(run).unwrap().value().attrs.tags.get("label"), Some(&"fixed".to_string()));
    }

    #[test]
    fn ignore_errors_leaves_element_untouched_on_resolution_failure() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, ElementData::text_run("hi")).unwrap();

        let mut variables = BTreeMap::new();
        variables.insert(
            "cell".to_string(),
            VariableSpec::ElementAt(ElementAtSpec { row: None, col: None }),
        );
        let pass = TagMatching::new(
            MatchCriteria::default(),
            variables,
            BTreeMap::from([("label".to_string(), "{cell.text}".to_string())]),
            Vec::new(),
            true,
        );
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();
        assert_eq!(doc.get(run).unwrap().value().attrs.tags.get("label"), None);
    }
}
