//! The `QueryEngine` contract (§6.3) and the reference hand-written
//! implementation: a small JQ-compatible lexer/parser/evaluator over
//! `serde_json::Value`, kept behind a trait so a host can swap in a fuller
//! implementation without touching C4/C6.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::QueryError;

use super::{eval, lexer, parser};

pub trait QueryEngine {
    /// Evaluate `query` (optionally preceded by `preamble` function defs)
    /// against `input`, returning the first value of the result stream
    /// (`Value::Null` if the stream is empty).
    fn eval(
        &self,
        query: &str,
        preamble: Option<&str>,
        input: &Value,
        bindings: &BTreeMap<String, Value>,
    ) -> Result<Value, QueryError> {
        Ok(self
            .eval_many(query, preamble, input, bindings)?
            .into_iter()
            .next()
            .unwrap_or(Value::Null))
    }

    /// Evaluate `query` and return its full result stream (used by
    /// `ExtractSpec::extract_all`, where a query may yield many items).
    fn eval_many(
        &self,
        query: &str,
        preamble: Option<&str>,
        input: &Value,
        bindings: &BTreeMap<String, Value>,
    ) -> Result<Vec<Value>, QueryError>;
}

/// The reference §6.3 subset: parses fresh on every call rather than
/// caching compiled programs, since extraction evaluates each query once
/// per item rather than once per element the way matcher regexes do (§5
/// only mandates caching for those).
#[derive(Debug, Default, Clone, Copy)]
pub struct HandWrittenQueryEngine;

impl HandWrittenQueryEngine {
    pub fn new() -> Self {
        Self
    }
}

impl QueryEngine for HandWrittenQueryEngine {
    fn eval_many(
        &self,
        query: &str,
        preamble: Option<&str>,
        input: &Value,
        bindings: &BTreeMap<String, Value>,
    ) -> Result<Vec<Value>, QueryError> {
        let source = match preamble {
            Some(p) => format!("{p}\n{query}"),
            None => query.to_string(),
        };
        let tokens = lexer::tokenize(&source)?;
        let program = parser::parse(&tokens)?;
        eval::run(&program, input, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_access_and_pipe() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!({"a": {"b": 1}});
        let out = engine.eval(".a.b", None, &input, &BTreeMap::new()).unwrap();
        assert_eq!(out, json!(1));
    }

    #[test]
    fn iterate_and_select() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!([{"v": 1}, {"v": 2}, {"v": 3}]);
        let out = engine
            .eval_many(".[] | select(.v == 2)", None, &input, &BTreeMap::new())
            .unwrap();
        assert_eq!(out, vec![json!({"v": 2})]);
    }

    #[test]
    fn recursive_descent_collects_every_value() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!({"a": [1, {"b": 2}]});
        let out = engine.eval_many("..", None, &input, &BTreeMap::new()).unwrap();
        assert!(out.contains(&json!(2)));
        assert!(out.contains(&input));
    }

    #[test]
    fn from_entries_builds_an_object() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!([{"key": "a", "value": 1}, {"key": "b", "value": 2}]);
        let out = engine.eval("from_entries", None, &input, &BTreeMap::new()).unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_function_matches_substring() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!("hello world");
        let out = engine.eval(r#"test("wor")"#, None, &input, &BTreeMap::new()).unwrap();
        assert_eq!(out, json!(true));
    }

    #[test]
    fn variable_binding_resolves() {
        let engine = HandWrittenQueryEngine::new();
        let mut bindings = BTreeMap::new();
        bindings.insert("x".to_string(), json!(42));
        let out = engine.eval("$x", None, &Value::Null, &bindings).unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn preamble_function_definition_is_usable() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!("Ada");
        let out = engine
            .eval(
                "is_ada",
                Some(r#"def is_ada: select(. == "Ada");"#),
                &input,
                &BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(out, json!("Ada"));
    }

    #[test]
    fn preamble_function_with_parameter() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!({"v": 2});
        let out = engine
            .eval(
                "matching(.v == 2)",
                Some("def matching(cond): select(cond);"),
                &input,
                &BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(out, json!({"v": 2}));
    }

    #[test]
    fn object_construction() {
        let engine = HandWrittenQueryEngine::new();
        let input = json!({"name": "Ada", "age": 30});
        let out = engine
            .eval("{n: .name, a: .age}", None, &input, &BTreeMap::new())
            .unwrap();
        assert_eq!(out, json!({"n": "Ada", "a": 30}));
    }
}
