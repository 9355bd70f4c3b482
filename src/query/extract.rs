//! C6: the extraction stage (§4.6). An `ExtractSpec` is a nested JQ-like
//! extract/filter/validate/render pipeline; no regex compilation happens
//! here; everything is delegated to a [`QueryEngine`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

use super::QueryEngine;

fn truthy(v: &Value) -> bool {
    !matches!(v, Value::Bool(false) | Value::Null)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractSpec {
    #[serde(default)]
    pub preamble: Option<String>,
    pub extract_all: String,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub first_item_only: bool,
    pub render: String,
    #[serde(default)]
    pub nested: BTreeMap<String, ExtractSpec>,
}

impl ExtractSpec {
    /// Evaluate this spec against `item`, per the order in §4.6. Returns
    /// one rendered value per surviving candidate, or — when
    /// `first_item_only` is set and nothing survives — a single
    /// `Value::Null` standing in for "the empty value".
    pub fn evaluate(&self, engine: &dyn QueryEngine, item: &Value) -> Result<Vec<Value>> {
        let candidates =
            engine.eval_many(&self.extract_all, self.preamble.as_deref(), item, &BTreeMap::new())?;

        let mut results = Vec::new();
        'candidate: for candidate in candidates {
            for filter in &self.filters {
                let ok = engine.eval(filter, self.preamble.as_deref(), &candidate, &BTreeMap::new())?;
                if !truthy(&ok) {
                    continue 'candidate;
                }
            }
            for validator in &self.validators {
                let ok = engine.eval(validator, self.preamble.as_deref(), &candidate, &BTreeMap::new())?;
                if !truthy(&ok) {
                    log::warn!("extraction validator {validator:?} dropped a candidate");
                    continue 'candidate;
                }
            }

            let mut bindings = BTreeMap::new();
            for (name, nested_spec) in &self.nested {
                let nested_results = nested_spec.evaluate(engine, &candidate)?;
                let bound = if nested_spec.first_item_only {
                    nested_results.into_iter().next().unwrap_or(Value::Null)
                } else {
                    Value::Array(nested_results)
                };
                bindings.insert(name.clone(), bound);
            }

            let rendered = engine.eval(&self.render, self.preamble.as_deref(), &candidate, &bindings)?;
            results.push(rendered);
            if self.first_item_only {
                break;
            }
        }

        if self.first_item_only && results.is_empty() {
            results.push(Value::Null);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::HandWrittenQueryEngine;
    use serde_json::json;

    #[test]
    fn extracts_filters_and_renders() {
        let spec = ExtractSpec {
            preamble: None,
            extract_all: ".items[]".to_string(),
            filters: vec![".active == true".to_string()],
            validators: Vec::new(),
            first_item_only: false,
            render: ".name".to_string(),
            nested: BTreeMap::new(),
        };
        let item = json!({
            "items": [
                {"name": "a", "active": true},
                {"name": "b", "active": false},
                {"name": "c", "active": true},
            ]
        });
        let engine = HandWrittenQueryEngine::new();
        let out = spec.evaluate(&engine, &item).unwrap();
        assert_eq!(out, vec![json!("a"), json!("c")]);
    }

    #[test]
    fn first_item_only_emits_null_when_nothing_survives() {
        let spec = ExtractSpec {
            preamble: None,
            extract_all: ".items[]".to_string(),
            filters: vec![".active == true".to_string()],
            validators: Vec::new(),
            first_item_only: true,
            render: ".name".to_string(),
            nested: BTreeMap::new(),
        };
        let item = json!({"items": [{"name": "a", "active": false}]});
        let engine = HandWrittenQueryEngine::new();
        let out = spec.evaluate(&engine, &item).unwrap();
        assert_eq!(out, vec![Value::Null]);
    }

    #[test]
    fn nested_specs_bind_as_named_values_in_render() {
        let nested = ExtractSpec {
            preamble: None,
            extract_all: ".fields[]".to_string(),
            filters: Vec::new(),
            validators: Vec::new(),
            first_item_only: false,
            render: ".".to_string(),
            nested: BTreeMap::new(),
        };
        let mut nested_map = BTreeMap::new();
        nested_map.insert("details".to_string(), nested);
        let spec = ExtractSpec {
            preamble: None,
            extract_all: ".records[]".to_string(),
            filters: Vec::new(),
            validators: Vec::new(),
            first_item_only: false,
            render: "{name: .name, details: $details}".to_string(),
            nested: nested_map,
        };
        let item = json!({
            "records": [
                {"name": "rec1", "fields": ["x", "y"]}
            ]
        });
        let engine = HandWrittenQueryEngine::new();
        let out = spec.evaluate(&engine, &item).unwrap();
        assert_eq!(out, vec![json!({"name": "rec1", "details": ["x", "y"]})]);
    }
}
