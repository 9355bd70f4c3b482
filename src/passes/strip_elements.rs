//! `strip_elements` (§4.5, §8.1 "preserves tree structure"): the one pass
//! with exclusive access to `Document.shared_data.style_rules` — every
//! other pass only reads it through `effective_style` (§4.3). Never moves
//! or drops a node, only attribute/style/style-rule keys.

use regex::Regex;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::compile_full_match;
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::Document;

use super::{matcher_err, Pass};

pub struct StripElements {
    remove_attrs_re: Vec<Regex>,
    remove_styles_re: Vec<Regex>,
    remove_style_rules_re: Vec<Regex>,
}

impl StripElements {
    pub fn new(remove_attrs_re: Vec<Regex>, remove_styles_re: Vec<Regex>, remove_style_rules_re: Vec<Regex>) -> Self {
        Self {
            remove_attrs_re,
            remove_styles_re,
            remove_style_rules_re,
        }
    }
}

fn any_matches(patterns: &[Regex], key: &str) -> bool {
    patterns.iter().any(|re| re.is_match(key))
}

impl Pass for StripElements {
    fn name(&self) -> &'static str {
        "strip_elements"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let ids: Vec<_> = Traversal::from_root(doc).map(|ctx| ctx.id).collect();
        for id in ids {
            let mut node = doc.tree_mut().get_mut(id).expect("valid node id");
            let attrs = &mut node.value().attrs;
            attrs.attribs.retain(|k, _| !any_matches(&self.remove_attrs_re, k));
            attrs.style.retain(|k, _| !any_matches(&self.remove_styles_re, k));
        }

        doc.shared_data_mut()
            .style_rules
            .retain(|k, _| !any_matches(&self.remove_style_rules_re, k));
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripElementsConfig {
    #[serde(default)]
    pub remove_attrs_re: Vec<String>,
    #[serde(default)]
    pub remove_styles_re: Vec<String>,
    #[serde(default)]
    pub remove_style_rules_re: Vec<String>,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, DocScraperError> {
    patterns
        .iter()
        .map(|p| compile_full_match(p).map_err(|e| matcher_err("strip_elements", e)))
        .collect()
}

impl StripElementsConfig {
    pub fn compile(&self) -> Result<StripElements, DocScraperError> {
        Ok(StripElements::new(
            compile_all(&self.remove_attrs_re)?,
            compile_all(&self.remove_styles_re)?,
            compile_all(&self.remove_style_rules_re)?,
        ))
    }
}
