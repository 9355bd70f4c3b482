//! Deserializable mirror of [`super::VariableSpec`] (§4.4, §4.10).

use regex::Regex;
use serde::Deserialize;

use crate::error::MatcherError;

use super::{
    AncestorPathSpec, Axis, ElementAtSpec, JsonQuerySpec, Operation, SubstitutionStep,
    SubstitutionsSpec, VariableSpec,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConfig {
    First,
    Last,
    Prev,
    Next,
}

impl From<AxisConfig> for Axis {
    fn from(v: AxisConfig) -> Self {
        match v {
            AxisConfig::First => Axis::First,
            AxisConfig::Last => Axis::Last,
            AxisConfig::Prev => Axis::Prev,
            AxisConfig::Next => Axis::Next,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementAtConfig {
    #[serde(default)]
    pub row: Option<AxisConfig>,
    #[serde(default)]
    pub col: Option<AxisConfig>,
}

impl ElementAtConfig {
    fn compile(&self) -> ElementAtSpec {
        ElementAtSpec {
            row: self.row.map(Into::into),
            col: self.col.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationConfig {
    Lower,
    Upper,
    #[default]
    Unchanged,
}

impl From<OperationConfig> for Operation {
    fn from(v: OperationConfig) -> Self {
        match v {
            OperationConfig::Lower => Operation::Lower,
            OperationConfig::Upper => Operation::Upper,
            OperationConfig::Unchanged => Operation::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionStepConfig {
    pub regex: String,
    pub substitute: String,
    #[serde(default)]
    pub operation: OperationConfig,
}

impl SubstitutionStepConfig {
    pub(crate) fn compile(&self) -> Result<SubstitutionStep, MatcherError> {
        Ok(SubstitutionStep {
            regex: Regex::new(&self.regex).map_err(|source| MatcherError::InvalidRegex {
                pattern: self.regex.clone(),
                source,
            })?,
            substitute: self.substitute.clone(),
            operation: self.operation.into(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionsConfig {
    pub steps: Vec<SubstitutionStepConfig>,
    #[serde(default)]
    pub section_heading_only: bool,
}

impl SubstitutionsConfig {
    fn compile(&self) -> Result<SubstitutionsSpec, MatcherError> {
        Ok(SubstitutionsSpec {
            steps: self
                .steps
                .iter()
                .map(SubstitutionStepConfig::compile)
                .collect::<Result<_, _>>()?,
            section_heading_only: self.section_heading_only,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonQueryConfig {
    pub query: String,
    #[serde(default)]
    pub preamble: Option<String>,
}

impl JsonQueryConfig {
    fn compile(&self) -> JsonQuerySpec {
        JsonQuerySpec {
            query: self.query.clone(),
            preamble: self.preamble.clone(),
        }
    }
}

fn default_level_start() -> usize {
    0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AncestorPathConfig {
    pub level_value: String,
    pub separator: String,
    #[serde(default = "default_level_start")]
    pub level_start: usize,
    #[serde(default)]
    pub level_end: Option<usize>,
}

impl AncestorPathConfig {
    fn compile(&self) -> AncestorPathSpec {
        AncestorPathSpec {
            level_value: self.level_value.clone(),
            separator: self.separator.clone(),
            level_start: self.level_start,
            level_end: self.level_end,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum VariableSpecConfig {
    ElementAt(ElementAtConfig),
    Substitutions(SubstitutionsConfig),
    JsonQuery(JsonQueryConfig),
    AncestorPath(AncestorPathConfig),
}

impl VariableSpecConfig {
    pub fn compile(&self) -> Result<VariableSpec, MatcherError> {
        Ok(match self {
            VariableSpecConfig::ElementAt(c) => VariableSpec::ElementAt(c.compile()),
            VariableSpecConfig::Substitutions(c) => VariableSpec::Substitutions(c.compile()?),
            VariableSpecConfig::JsonQuery(c) => VariableSpec::JsonQuery(c.compile()),
            VariableSpecConfig::AncestorPath(c) => VariableSpec::AncestorPath(c.compile()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_element_at() {
        let yaml = "kind: element_at\nconfig:\n  col: last\n";
        let cfg: VariableSpecConfig = serde_yaml::from_str(yaml).unwrap();
        let spec = cfg.compile().unwrap();
        assert!(matches!(spec, VariableSpec::ElementAt(_)));
    }

    #[test]
    fn deserializes_substitutions_with_backreference() {
        let yaml = "kind: substitutions\nconfig:\n  steps:\n    - regex: '(\\w+)'\n      substitute: '[\\1]'\n";
        let cfg: VariableSpecConfig = serde_yaml::from_str(yaml).unwrap();
        let spec = cfg.compile().unwrap();
        assert!(matches!(spec, VariableSpec::Substitutions(_)));
    }
}
