//! Deserializable, uncompiled mirror of the matcher types (§4.3, §4.10):
//! config documents carry regex patterns as plain strings; [`compile`]
//! turns one into the compiled predicate the pipeline actually evaluates.
//! Patterns are compiled once per config load, not per element (§5).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::MatcherError;

use super::{
    compile_full_match, AncestorStep, ElementExpression, KeyPattern, MatchCriteria, MatchElement,
    SkipKind,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementExpressionConfig {
    pub expr: String,
    #[serde(default)]
    pub regex_match: Option<String>,
    #[serde(default)]
    pub ignore_key_errors: bool,
}

impl ElementExpressionConfig {
    fn compile(&self) -> Result<ElementExpression, MatcherError> {
        Ok(ElementExpression {
            expr: self.expr.clone(),
            regex_match: self
                .regex_match
                .as_deref()
                .map(compile_full_match)
                .transpose()?,
            ignore_key_errors: self.ignore_key_errors,
        })
    }
}

fn compile_key_patterns(map: &BTreeMap<String, String>) -> Result<Vec<KeyPattern>, MatcherError> {
    map.iter()
        .map(|(key, pattern)| {
            let pattern = if pattern.is_empty() {
                None
            } else {
                Some(compile_full_match(pattern)?)
            };
            Ok(KeyPattern {
                key: key.clone(),
                pattern,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchElementConfig {
    #[serde(default)]
    pub element_types: Option<Vec<String>>,
    #[serde(default)]
    pub required_tag_sets: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub rejected_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub required_style_sets: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub rejected_styles: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub skip_style_quotes: bool,
    #[serde(default)]
    pub aggregated_text_regex: Option<String>,
    #[serde(default)]
    pub element_expressions: Vec<ElementExpressionConfig>,
    #[serde(default)]
    pub start_row: Option<i64>,
    #[serde(default)]
    pub end_row: Option<i64>,
    #[serde(default)]
    pub start_col: Option<i64>,
    #[serde(default)]
    pub end_col: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl Default for MatchElementConfig {
    fn default() -> Self {
        Self {
            element_types: None,
            required_tag_sets: Vec::new(),
            rejected_tags: BTreeMap::new(),
            required_style_sets: Vec::new(),
            rejected_styles: BTreeMap::new(),
            skip_style_quotes: true,
            aggregated_text_regex: None,
            element_expressions: Vec::new(),
            start_row: None,
            end_row: None,
            start_col: None,
            end_col: None,
        }
    }
}

impl MatchElementConfig {
    pub fn compile(&self) -> Result<MatchElement, MatcherError> {
        Ok(MatchElement {
            element_types: self.element_types.clone(),
            required_tag_sets: self
                .required_tag_sets
                .iter()
                .map(compile_key_patterns)
                .collect::<Result<_, _>>()?,
            rejected_tags: compile_key_patterns(&self.rejected_tags)?,
            required_style_sets: self
                .required_style_sets
                .iter()
                .map(compile_key_patterns)
                .collect::<Result<_, _>>()?,
            rejected_styles: compile_key_patterns(&self.rejected_styles)?,
            skip_style_quotes: self.skip_style_quotes,
            aggregated_text_regex: self
                .aggregated_text_regex
                .as_deref()
                .map(compile_full_match)
                .transpose()?,
            element_expressions: self
                .element_expressions
                .iter()
                .map(ElementExpressionConfig::compile)
                .collect::<Result<_, _>>()?,
            start_row: self.start_row,
            end_row: self.end_row,
            start_col: self.start_col,
            end_col: self.end_col,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKindConfig {
    Exactly,
    AtLeast,
    Any,
}

impl From<SkipKindConfig> for SkipKind {
    fn from(v: SkipKindConfig) -> Self {
        match v {
            SkipKindConfig::Exactly => SkipKind::Exactly,
            SkipKindConfig::AtLeast => SkipKind::AtLeast,
            SkipKindConfig::Any => SkipKind::Any,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AncestorStepConfig {
    Skip {
        skip: SkipKindConfig,
        #[serde(default)]
        count: usize,
    },
    Match(MatchElementConfig),
}

impl AncestorStepConfig {
    fn compile(&self) -> Result<AncestorStep, MatcherError> {
        match self {
            AncestorStepConfig::Skip { skip, count } => Ok(AncestorStep::Skip {
                kind: (*skip).into(),
                count: *count,
            }),
            AncestorStepConfig::Match(me) => Ok(AncestorStep::Match(me.compile()?)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchCriteriaConfig {
    #[serde(default)]
    pub match_element: MatchElementConfig,
    #[serde(default)]
    pub match_ancestors: Vec<AncestorStepConfig>,
    #[serde(default)]
    pub match_descendant: Option<MatchElementConfig>,
}

impl MatchCriteriaConfig {
    pub fn compile(&self) -> Result<MatchCriteria, MatcherError> {
        Ok(MatchCriteria {
            match_element: self.match_element.compile()?,
            match_ancestors: self
                .match_ancestors
                .iter()
                .map(AncestorStepConfig::compile)
                .collect::<Result<_, _>>()?,
            match_descendant: self
                .match_descendant
                .as_ref()
                .map(MatchElementConfig::compile)
                .transpose()?,
        })
    }
}
