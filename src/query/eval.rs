//! Evaluator for the [`Expr`] AST (§6.3). Every expression evaluates to a
//! *stream* of values (`Vec<Value>`), matching JQ's own semantics for
//! `.[]`/recursive descent/pipes; callers that want a single value take
//! the stream's first element.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::QueryError;

use super::parser::{Expr, FuncDef, ObjKey, Program};

#[derive(Clone)]
struct Param {
    expr: Expr,
    env: Box<Env>,
}

#[derive(Clone, Default)]
pub struct Env {
    vars: HashMap<String, Value>,
    params: HashMap<String, Param>,
    defs: HashMap<(String, usize), FuncDef>,
}

impl Env {
    fn with_defs(defs: &[FuncDef], vars: HashMap<String, Value>) -> Self {
        let mut map = HashMap::new();
        for def in defs {
            map.insert((def.name.clone(), def.params.len()), def.clone());
        }
        Env {
            vars,
            params: HashMap::new(),
            defs: map,
        }
    }
}

pub fn run(
    program: &Program,
    input: &Value,
    bindings: &std::collections::BTreeMap<String, Value>,
) -> Result<Vec<Value>, QueryError> {
    let vars = bindings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let env = Env::with_defs(&program.defs, vars);
    eval(&program.body, input, &env)
}

fn truthy(v: &Value) -> bool {
    !matches!(v, Value::Bool(false) | Value::Null)
}

fn eval(expr: &Expr, input: &Value, env: &Env) -> Result<Vec<Value>, QueryError> {
    match expr {
        Expr::Identity => Ok(vec![input.clone()]),
        Expr::RecurseDescent => {
            let mut out = Vec::new();
            collect_descendants(input, &mut out);
            Ok(out)
        }
        Expr::Field(inner, name) => {
            let mut out = Vec::new();
            for v in eval(inner, input, env)? {
                out.push(match &v {
                    Value::Null => Value::Null,
                    Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
                    other => {
                        return Err(QueryError::Eval {
                            message: format!("cannot index {other} with field {name:?}"),
                        })
                    }
                });
            }
            Ok(out)
        }
        Expr::Index(inner, idx) => {
            let mut out = Vec::new();
            let idx_values = eval(idx, input, env)?;
            for v in eval(inner, input, env)? {
                for idx_v in &idx_values {
                    out.push(index_value(&v, idx_v)?);
                }
            }
            Ok(out)
        }
        Expr::Iterate(inner) => {
            let mut out = Vec::new();
            for v in eval(inner, input, env)? {
                match v {
                    Value::Array(items) => out.extend(items),
                    Value::Object(map) => out.extend(map.into_values()),
                    other => {
                        return Err(QueryError::Eval {
                            message: format!("cannot iterate over {other}"),
                        })
                    }
                }
            }
            Ok(out)
        }
        Expr::Pipe(a, b) => {
            let mut out = Vec::new();
            for v in eval(a, input, env)? {
                out.extend(eval(b, &v, env)?);
            }
            Ok(out)
        }
        Expr::Eq(a, b) => {
            let lhs = eval(a, input, env)?.into_iter().next().unwrap_or(Value::Null);
            let rhs = eval(b, input, env)?.into_iter().next().unwrap_or(Value::Null);
            Ok(vec![Value::Bool(lhs == rhs)])
        }
        Expr::Ne(a, b) => {
            let lhs = eval(a, input, env)?.into_iter().next().unwrap_or(Value::Null);
            let rhs = eval(b, input, env)?.into_iter().next().unwrap_or(Value::Null);
            Ok(vec![Value::Bool(lhs != rhs)])
        }
        Expr::Var(name) => env.vars.get(name).cloned().map(|v| vec![v]).ok_or_else(|| {
            QueryError::UndefinedVariable {
                name: name.clone(),
            }
        }),
        Expr::Str(s) => Ok(vec![Value::String(s.clone())]),
        Expr::Num(n) => Ok(vec![serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null)]),
        Expr::Bool(b) => Ok(vec![Value::Bool(*b)]),
        Expr::Null => Ok(vec![Value::Null]),
        Expr::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, value_expr) in entries {
                let key_str = match key {
                    ObjKey::Literal(s) => s.clone(),
                    ObjKey::Computed(e) => match eval(e, input, env)?.into_iter().next() {
                        Some(Value::String(s)) => s,
                        other => {
                            return Err(QueryError::Eval {
                                message: format!("object key must be a string, got {other:?}"),
                            })
                        }
                    },
                };
                let value = eval(value_expr, input, env)?.into_iter().next().unwrap_or(Value::Null);
                map.insert(key_str, value);
            }
            Ok(vec![Value::Object(map)])
        }
        Expr::Array(None) => Ok(vec![Value::Array(Vec::new())]),
        Expr::Array(Some(inner)) => Ok(vec![Value::Array(eval(inner, input, env)?)]),
        Expr::Call(name, args) => eval_call(name, args, input, env),
    }
}

fn eval_call(name: &str, args: &[Expr], input: &Value, env: &Env) -> Result<Vec<Value>, QueryError> {
    if args.is_empty() {
        if let Some(param) = env.params.get(name) {
            return eval(&param.expr, input, &param.env);
        }
    }
    if let Some(def) = env.defs.get(&(name.to_string(), args.len())).cloned() {
        let mut new_env = env.clone();
        new_env.defs = env.defs.clone();
        for (param_name, arg_expr) in def.params.iter().zip(args.iter()) {
            new_env.params.insert(
                param_name.clone(),
                Param {
                    expr: arg_expr.clone(),
                    env: Box::new(env.clone()),
                },
            );
        }
        return eval(&def.body, input, &new_env);
    }
    match (name, args.len()) {
        ("select", 1) => {
            let cond = eval(&args[0], input, env)?.into_iter().next().unwrap_or(Value::Null);
            if truthy(&cond) {
                Ok(vec![input.clone()])
            } else {
                Ok(Vec::new())
            }
        }
        ("test", 1) => {
            let pattern = match eval(&args[0], input, env)?.into_iter().next() {
                Some(Value::String(s)) => s,
                other => {
                    return Err(QueryError::Eval {
                        message: format!("test() pattern must be a string, got {other:?}"),
                    })
                }
            };
            let haystack = match input {
                Value::String(s) => s.clone(),
                other => {
                    return Err(QueryError::Eval {
                        message: format!("test() input must be a string, got {other}"),
                    })
                }
            };
            let re = Regex::new(&pattern).map_err(|e| QueryError::Eval {
                message: format!("invalid regex {pattern:?}: {e}"),
            })?;
            Ok(vec![Value::Bool(re.is_match(&haystack))])
        }
        ("from_entries", 0) => {
            let entries = match input {
                Value::Array(items) => items,
                other => {
                    return Err(QueryError::Eval {
                        message: format!("from_entries() input must be an array, got {other}"),
                    })
                }
            };
            let mut map = serde_json::Map::new();
            for entry in entries {
                let obj = entry.as_object().ok_or_else(|| QueryError::Eval {
                    message: "from_entries() entries must be objects".to_string(),
                })?;
                let key = ["key", "k", "name"]
                    .iter()
                    .find_map(|f| obj.get(*f))
                    .ok_or_else(|| QueryError::Eval {
                        message: "from_entries() entry missing a key/k/name field".to_string(),
                    })?;
                let key = match key {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let value = ["value", "v"]
                    .iter()
                    .find_map(|f| obj.get(*f))
                    .cloned()
                    .unwrap_or(Value::Null);
                map.insert(key, value);
            }
            Ok(vec![Value::Object(map)])
        }
        ("length", 0) => Ok(vec![match input {
            Value::String(s) => serde_json::json!(s.chars().count()),
            Value::Array(a) => serde_json::json!(a.len()),
            Value::Object(o) => serde_json::json!(o.len()),
            Value::Null => serde_json::json!(0),
            other => {
                return Err(QueryError::Eval {
                    message: format!("length() is undefined for {other}"),
                })
            }
        }]),
        ("not", 0) => Ok(vec![Value::Bool(!truthy(input))]),
        _ => Err(QueryError::UndefinedFunction {
            name: name.to_string(),
            arity: args.len(),
        }),
    }
}

fn index_value(v: &Value, idx: &Value) -> Result<Value, QueryError> {
    match (v, idx) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => {
            let i = n.as_i64().unwrap_or(0);
            let i = if i < 0 { items.len() as i64 + i } else { i };
            Ok(usize::try_from(i).ok().and_then(|i| items.get(i)).cloned().unwrap_or(Value::Null))
        }
        (other, idx) => Err(QueryError::Eval {
            message: format!("cannot index {other} with {idx}"),
        }),
    }
}

fn collect_descendants(v: &Value, out: &mut Vec<Value>) {
    out.push(v.clone());
    match v {
        Value::Array(items) => {
            for item in items {
                collect_descendants(item, out);
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                collect_descendants(value, out);
            }
        }
        _ => {}
    }
}
