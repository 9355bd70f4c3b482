//! C4: the variable engine (§4.4). Computes named values against a match
//! context, for interpolation into `tags.add` templates by passes that
//! declare `variables: map<name, VariableSpec>` (principally `tag_matching`).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::MatcherError;
use crate::matcher::element_bound;
use crate::query::{project_element, QueryEngine};
use crate::template::{self, Bound};
use crate::traversal::Context;
use crate::tree::Document;

mod config;
pub use config::{
    AncestorPathConfig, ElementAtConfig, JsonQueryConfig, SubstitutionStepConfig,
    SubstitutionsConfig, VariableSpecConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    First,
    Last,
    Prev,
    Next,
}

#[derive(Debug, Clone, Default)]
pub struct ElementAtSpec {
    pub row: Option<Axis>,
    pub col: Option<Axis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Lower,
    Upper,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct SubstitutionStep {
    pub regex: Regex,
    pub substitute: String,
    pub operation: Operation,
}

#[derive(Debug, Clone)]
pub struct SubstitutionsSpec {
    pub steps: Vec<SubstitutionStep>,
    pub section_heading_only: bool,
}

#[derive(Debug, Clone)]
pub struct JsonQuerySpec {
    pub query: String,
    pub preamble: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AncestorPathSpec {
    pub level_value: String,
    pub separator: String,
    pub level_start: usize,
    pub level_end: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum VariableSpec {
    ElementAt(ElementAtSpec),
    Substitutions(SubstitutionsSpec),
    JsonQuery(JsonQuerySpec),
    AncestorPath(AncestorPathSpec),
}

/// Backreferences in `substitutions.substitute` are written `\1`..`\9`
/// (§4.4); the `regex` crate's replacement syntax wants `${1}`..`${9}`.
static BACKREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([1-9])").unwrap());

fn to_regex_replacement(substitute: &str) -> String {
    BACKREF_RE
        .replace_all(substitute, |caps: &regex::Captures| format!("${{{}}}", &caps[1]))
        .into_owned()
}

impl VariableSpec {
    pub fn evaluate(
        &self,
        name: &str,
        doc: &Document,
        ctx: &Context,
        engine: &dyn QueryEngine,
    ) -> Result<Bound, MatcherError> {
        match self {
            VariableSpec::ElementAt(spec) => eval_element_at(name, spec, doc, ctx),
            VariableSpec::Substitutions(spec) => eval_substitutions(name, spec, doc, ctx),
            VariableSpec::JsonQuery(spec) => eval_json_query(name, spec, doc, ctx, engine),
            VariableSpec::AncestorPath(spec) => eval_ancestor_path(name, spec, doc, ctx),
        }
    }
}

fn resolution_error(name: &str, reason: impl Into<String>) -> MatcherError {
    MatcherError::VariableResolution {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn apply_axis(current: usize, len: usize, axis: Option<Axis>, label: &str) -> Result<usize, String> {
    match axis {
        None => Ok(current),
        Some(Axis::First) => Ok(0),
        Some(Axis::Last) => Ok(len.saturating_sub(1)),
        Some(Axis::Prev) => current
            .checked_sub(1)
            .ok_or_else(|| format!("no previous {label}: already at the first")),
        Some(Axis::Next) => {
            if current + 1 < len {
                Ok(current + 1)
            } else {
                Err(format!("no next {label}: already at the last"))
            }
        }
    }
}

fn eval_element_at(
    name: &str,
    spec: &ElementAtSpec,
    doc: &Document,
    ctx: &Context,
) -> Result<Bound, MatcherError> {
    let Some((row, col)) = ctx.table_position else {
        return Err(resolution_error(
            name,
            "element_at requires the element to lie within a Table",
        ));
    };
    let table_id = doc
        .enclosing_table(ctx.id)
        .ok_or_else(|| resolution_error(name, "no enclosing Table found"))?;
    let table = doc
        .get(table_id)
        .and_then(|n| n.value().kind.as_table().cloned())
        .expect("enclosing_table always returns a Table node");

    let target_row =
        apply_axis(row, table.rows, spec.row, "row").map_err(|e| resolution_error(name, e))?;
    let target_col =
        apply_axis(col, table.cols, spec.col, "column").map_err(|e| resolution_error(name, e))?;

    let cell_id = doc.cell_at(table_id, target_row, target_col).ok_or_else(|| {
        resolution_error(
            name,
            format!("no cell at (row={target_row}, col={target_col})"),
        )
    })?;
    Ok(element_bound(doc, cell_id))
}

fn nearest_enclosing_section(doc: &Document, ctx: &Context) -> Option<ego_tree::NodeId> {
    ctx.ancestors
        .iter()
        .rev()
        .copied()
        .find(|&id| doc.get(id).is_some_and(|n| n.value().kind.as_section().is_some()))
}

/// Apply an ordered sequence of regex substitutions (with `\N` backreferences
/// and a trailing case operation) to `base` — shared by the variable
/// engine's `substitutions` variable kind and the `regex_replace` pass,
/// which apply the identical step shape to different base strings (§4.4,
/// §4.5).
pub fn apply_substitutions(base: &str, steps: &[SubstitutionStep]) -> String {
    let mut base = base.to_string();
    for step in steps {
        let replacement = to_regex_replacement(&step.substitute);
        base = step.regex.replace_all(&base, replacement.as_str()).into_owned();
        base = match step.operation {
            Operation::Lower => base.to_lowercase(),
            Operation::Upper => base.to_uppercase(),
            Operation::Unchanged => base,
        };
    }
    base
}

fn eval_substitutions(
    name: &str,
    spec: &SubstitutionsSpec,
    doc: &Document,
    ctx: &Context,
) -> Result<Bound, MatcherError> {
    let base = if spec.section_heading_only {
        let section_id = nearest_enclosing_section(doc, ctx)
            .ok_or_else(|| resolution_error(name, "no enclosing Section found"))?;
        doc.section_heading_text(section_id).unwrap_or_default()
    } else {
        doc.aggregated_text(ctx.id)
    };
    Ok(Bound::text(apply_substitutions(&base, &spec.steps)))
}

fn eval_json_query(
    name: &str,
    spec: &JsonQuerySpec,
    doc: &Document,
    ctx: &Context,
    engine: &dyn QueryEngine,
) -> Result<Bound, MatcherError> {
    let projection = project_element(doc, ctx.id);
    let result = engine
        .eval(&spec.query, spec.preamble.as_deref(), &projection, &BTreeMap::new())
        .map_err(|e| resolution_error(name, e.to_string()))?;
    let text = match result {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(Bound::text(text))
}

fn eval_ancestor_path(
    name: &str,
    spec: &AncestorPathSpec,
    doc: &Document,
    ctx: &Context,
) -> Result<Bound, MatcherError> {
    let end = spec.level_end.unwrap_or(ctx.ancestors.len()).min(ctx.ancestors.len());
    let start = spec.level_start.min(end);
    let mut rendered = Vec::new();
    for &ancestor_id in &ctx.ancestors[start..end] {
        let mut bindings = BTreeMap::new();
        bindings.insert("0".to_string(), element_bound(doc, ancestor_id));
        let piece = template::render(name, &spec.level_value, &bindings)?;
        rendered.push(piece);
    }
    Ok(Bound::text(rendered.join(&spec.separator)))
}

/// Compute every declared variable against `ctx`, in declaration order
/// (so `json_query` specs may rely on earlier passes having already run,
/// though variables never reference each other directly — §4.4).
pub fn compute_variables(
    specs: &BTreeMap<String, VariableSpec>,
    doc: &Document,
    ctx: &Context,
    engine: &dyn QueryEngine,
) -> Result<BTreeMap<String, Bound>, MatcherError> {
    specs
        .iter()
        .map(|(name, spec)| Ok((name.clone(), spec.evaluate(name, doc, ctx, engine)?)))
        .collect()
}
