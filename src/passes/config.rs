//! Deserializable mirror of the transformation list (§6.1): a `kind`-tagged
//! union compiling either to a mutating [`super::Pass`] or to the terminal
//! extraction step, so a pipeline's `transformations` list is one
//! homogeneous `Vec` in configuration even though the two compiled shapes
//! differ.

use serde::Deserialize;

use crate::error::DocScraperError;
use crate::query::ExtractSpec;

use super::{
    DropElements, DropElementsConfig, MergeByTag, MergeByTagConfig, NestBullets, NestBulletsConfig,
    NestSections, NestSectionsConfig, Pass, RegexReplace, RegexReplaceConfig, SplitText,
    SplitTextConfig, StripElements, StripElementsConfig, TagMatching, TagMatchingConfig,
};

/// A compiled transformation list entry (§4.6, §6.1): either a rewrite
/// pass applied in place, or the terminal query-based extraction that
/// produces the document's rendered output.
pub enum Transformation {
    Pass(Box<dyn Pass>),
    Extract(ExtractSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum TransformationConfig {
    DropElements(DropElementsConfig),
    MergeByTag(MergeByTagConfig),
    NestBullets(NestBulletsConfig),
    NestSections(NestSectionsConfig),
    RegexReplace(RegexReplaceConfig),
    SplitText(SplitTextConfig),
    StripElements(StripElementsConfig),
    TagMatching(TagMatchingConfig),
    ExtractJson(ExtractSpec),
}

impl TransformationConfig {
    pub fn compile(&self) -> Result<Transformation, DocScraperError> {
        Ok(match self {
            TransformationConfig::DropElements(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::MergeByTag(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::NestBullets(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::NestSections(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::RegexReplace(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::SplitText(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::StripElements(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::TagMatching(c) => Transformation::Pass(Box::new(c.compile()?) as Box<dyn Pass>),
            TransformationConfig::ExtractJson(spec) => Transformation::Extract(spec.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_a_deserialization_error() {
        let yaml = "kind: not_a_real_pass\nconfig: {}\n";
        let result: Result<TransformationConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn drop_elements_round_trips_through_compile() {
        let yaml = "kind: drop_elements\nconfig:\n  match:\n    match_element: {}\n";
        let cfg: TransformationConfig = serde_yaml::from_str(yaml).unwrap();
        let compiled = cfg.compile().unwrap();
        assert!(matches!(compiled, Transformation::Pass(_)));
    }

    #[test]
    fn extract_json_compiles_to_the_extraction_variant() {
        let yaml = "kind: extract_json\nconfig:\n  extract_all: \".\"\n  render: \".\"\n";
        let cfg: TransformationConfig = serde_yaml::from_str(yaml).unwrap();
        let compiled = cfg.compile().unwrap();
        assert!(matches!(compiled, Transformation::Extract(_)));
    }
}
