//! C8: top-level configuration binding (§4.10, §6.1). A configuration
//! document is three ordered `{kind, config}` lists; `kind` dispatches
//! through `#[serde(tag = "kind", content = "config")]`, so an unknown
//! kind is a `serde` deserialization error surfaced as a [`ConfigError`].

use serde::Deserialize;

use crate::error::{ConfigError, DocScraperError};
use crate::output::OutputConfig;
use crate::passes::TransformationConfig;
use crate::pipeline::Pipeline;

/// No source kind is in scope for this crate (§1 Non-goals: HTML parsing,
/// network/Drive-API acquisition are out of bounds) — the host hands
/// parsed `Document`s to [`Pipeline::run_documents`] directly. This enum
/// exists so `sources:` entries still round-trip through the same
/// `{kind, config}` shape as `transformations`/`outputs`, and an entry
/// naming any `kind` is correctly rejected as a configuration error.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum SourceConfig {}

fn default_false() -> bool {
    false
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub transformations: Vec<TransformationConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    /// §4.7: by default a per-document failure is reported and the driver
    /// continues with the next document; set this to stop the stream.
    #[serde(default = "default_false")]
    pub fatal_on_error: bool,
}

impl PipelineConfig {
    pub fn parse(yaml: &str) -> Result<Self, DocScraperError> {
        serde_yaml::from_str(yaml).map_err(|e| DocScraperError::Config(ConfigError::Parse(e)))
    }

    /// Bind every `transformations`/`outputs` entry to its runtime type,
    /// producing a driver ready to run documents (§4.7). `sources` has no
    /// registered kind, so a non-empty list here can only have come from
    /// the empty-enum deserialization failing first — `compile` never
    /// sees one.
    pub fn compile(&self) -> Result<Pipeline, DocScraperError> {
        Pipeline::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_parses() {
        let cfg = PipelineConfig::parse("sources: []\ntransformations: []\noutputs: []\n").unwrap();
        assert!(cfg.transformations.is_empty());
        assert!(cfg.outputs.is_empty());
    }

    #[test]
    fn a_source_entry_is_a_configuration_error() {
        let err = PipelineConfig::parse("sources:\n  - kind: google_docs\n    config: {}\n").unwrap_err();
        assert!(matches!(err, DocScraperError::Config(_)));
    }

    #[test]
    fn unknown_transformation_kind_is_a_configuration_error() {
        let yaml = "transformations:\n  - kind: not_a_real_pass\n    config: {}\n";
        let err = PipelineConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, DocScraperError::Config(_)));
    }
}
