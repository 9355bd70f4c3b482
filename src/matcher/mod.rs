//! C3: the matcher (§4.3). A `MatchCriteria` is a predicate over one
//! element plus its ancestor path (and, for some passes, a short list of
//! sibling elements used by `element_expressions`), evaluated without
//! mutating the tree.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::MatcherError;
use crate::template::{self, Bound};
use crate::traversal::Context;
use crate::tree::{Attrs, Document, ElementData, StrMap};

mod config;
pub use config::{AncestorStepConfig, ElementExpressionConfig, MatchCriteriaConfig, MatchElementConfig, SkipKindConfig};

/// A regex predicate bound to full-match semantics: every matcher field
/// that takes a pattern wraps it as `^(?:pattern)$` at compile time so
/// callers never have to anchor it themselves (§4.3).
pub(crate) fn compile_full_match(pattern: &str) -> Result<Regex, MatcherError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| MatcherError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

fn full_match(re: &Regex, s: &str) -> bool {
    re.is_match(s)
}

/// Strip one layer of matching quotes a CSS-style value might carry
/// (`"Arial"` -> `Arial`), applied before style predicates run unless the
/// config disables it (§4.3 `skip_style_quotes`).
fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// A single required-or-rejected key/pattern predicate. `None` means "key
/// must be present", independent of its value.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    pub key: String,
    pub pattern: Option<Regex>,
}

/// One `{N.field}` expression evaluated against the elements list passed
/// to [`MatchElement::matches`].
#[derive(Debug, Clone)]
pub struct ElementExpression {
    pub expr: String,
    pub regex_match: Option<Regex>,
    pub ignore_key_errors: bool,
}

/// A single-element predicate (§4.3). Tag/style sets are a disjunction of
/// conjunctions: an element matches `required_tag_sets` if it satisfies
/// *any one* inner set in full.
#[derive(Debug, Clone, Default)]
pub struct MatchElement {
    pub element_types: Option<Vec<String>>,
    pub required_tag_sets: Vec<Vec<KeyPattern>>,
    pub rejected_tags: Vec<KeyPattern>,
    pub required_style_sets: Vec<Vec<KeyPattern>>,
    pub rejected_styles: Vec<KeyPattern>,
    pub skip_style_quotes: bool,
    pub aggregated_text_regex: Option<Regex>,
    pub element_expressions: Vec<ElementExpression>,
    pub start_row: Option<i64>,
    pub end_row: Option<i64>,
    pub start_col: Option<i64>,
    pub end_col: Option<i64>,
}

impl MatchElement {
    /// Evaluate this predicate against `ctx.id`. `elements` is the list
    /// `{N.field}` placeholders index into; by convention `elements[0]` is
    /// `ctx.id` itself, with any further elements supplied by the caller
    /// (e.g. `merge_by_tag` compares a pair).
    pub fn matches(
        &self,
        doc: &Document,
        ctx: &Context,
        elements: &[ego_tree::NodeId],
    ) -> Result<bool, MatcherError> {
        let node = doc.get(ctx.id).expect("valid node id");
        let data = node.value();

        if let Some(types) = &self.element_types {
            if !types.iter().any(|t| data.kind.matches_type_name(t)) {
                return Ok(false);
            }
        }

        if !self.required_tag_sets.is_empty()
            && !self
                .required_tag_sets
                .iter()
                .any(|set| set_matches(set, &data.attrs.tags))
        {
            return Ok(false);
        }
        if self
            .rejected_tags
            .iter()
            .any(|kp| key_pattern_matches(kp, &data.attrs.tags))
        {
            return Ok(false);
        }

        let style = effective_style(doc, ctx.id, &data.attrs);
        if !self.required_style_sets.is_empty()
            && !self
                .required_style_sets
                .iter()
                .any(|set| set_matches_quoted(set, &style, self.skip_style_quotes))
        {
            return Ok(false);
        }
        if self
            .rejected_styles
            .iter()
            .any(|kp| key_pattern_matches_quoted(kp, &style, self.skip_style_quotes))
        {
            return Ok(false);
        }

        if let Some(re) = &self.aggregated_text_regex {
            let text = doc.aggregated_text(ctx.id);
            if !full_match(re, &text) {
                return Ok(false);
            }
        }

        if !self.position_matches(doc, ctx)? {
            return Ok(false);
        }

        for (i, expr) in self.element_expressions.iter().enumerate() {
            if !expr.matches(doc, elements, i)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn position_matches(&self, doc: &Document, ctx: &Context) -> Result<bool, MatcherError> {
        if self.start_row.is_none()
            && self.end_row.is_none()
            && self.start_col.is_none()
            && self.end_col.is_none()
        {
            return Ok(true);
        }
        let Some((row, col)) = ctx.table_position else {
            return Ok(false);
        };
        let Some(table_id) = doc.enclosing_table(ctx.id) else {
            return Ok(false);
        };
        let table = doc
            .get(table_id)
            .and_then(|n| n.value().kind.as_table().cloned())
            .expect("enclosing_table always returns a Table node");

        let row_ok = in_bounds(row, table.rows, self.start_row, self.end_row);
        let col_ok = in_bounds(col, table.cols, self.start_col, self.end_col);
        Ok(row_ok && col_ok)
    }
}

fn resolve_index(v: i64, len: usize) -> i64 {
    if v >= 0 {
        v
    } else {
        len as i64 + v
    }
}

fn in_bounds(index: usize, len: usize, start: Option<i64>, end: Option<i64>) -> bool {
    let start = start.map(|v| resolve_index(v, len)).unwrap_or(0);
    let end = end.map(|v| resolve_index(v, len)).unwrap_or(len as i64);
    let index = index as i64;
    index >= start && index < end
}

fn key_pattern_matches(kp: &KeyPattern, map: &StrMap) -> bool {
    match map.get(&kp.key) {
        None => false,
        Some(v) => match &kp.pattern {
            None => true,
            Some(re) => full_match(re, v),
        },
    }
}

fn key_pattern_matches_quoted(kp: &KeyPattern, map: &StrMap, skip_quotes: bool) -> bool {
    match map.get(&kp.key) {
        None => false,
        Some(v) => {
            let v = if skip_quotes { unquote(v) } else { v.as_str() };
            match &kp.pattern {
                None => true,
                Some(re) => full_match(re, v),
            }
        }
    }
}

fn set_matches(set: &[KeyPattern], map: &StrMap) -> bool {
    set.iter().all(|kp| key_pattern_matches(kp, map))
}

fn set_matches_quoted(set: &[KeyPattern], map: &StrMap, skip_quotes: bool) -> bool {
    set.iter()
        .all(|kp| key_pattern_matches_quoted(kp, map, skip_quotes))
}

/// Merge an element's own `style` over every `shared_data.style_rules`
/// class its `attribs["class"]` names (§4.1, §4.3): classes are looked up
/// in listed order, element-level declarations win.
fn effective_style(doc: &Document, id: ego_tree::NodeId, attrs: &Attrs) -> StrMap {
    let mut style = StrMap::new();
    if let Some(classes) = attrs.attribs.get("class") {
        let rules = &doc
            .root()
            .value()
            .kind
            .as_document()
            .expect("root is always Document")
            .shared_data
            .style_rules;
        for class in classes.split_whitespace() {
            if let Some(rule) = rules.get(class) {
                for (k, v) in rule {
                    style.insert(k.clone(), v.clone());
                }
            }
        }
    }
    let _ = id;
    for (k, v) in &attrs.style {
        style.insert(k.clone(), v.clone());
    }
    style
}

impl ElementExpression {
    fn matches(
        &self,
        doc: &Document,
        elements: &[ego_tree::NodeId],
        index: usize,
    ) -> Result<bool, MatcherError> {
        let bindings = positional_bindings(doc, elements);
        let label = format!("element_expressions[{index}]");
        match template::render(&label, &self.expr, &bindings) {
            Ok(rendered) => match &self.regex_match {
                Some(re) => Ok(full_match(re, &rendered)),
                None => Ok(true),
            },
            Err(_) if self.ignore_key_errors => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Build `{0, 1, ...}` bindings for `element_expressions` from a list of
/// node ids (§4.3: `{N.field}` refers to `elements[N]`).
fn positional_bindings(doc: &Document, elements: &[ego_tree::NodeId]) -> BTreeMap<String, Bound> {
    let mut bindings = BTreeMap::new();
    for (i, &id) in elements.iter().enumerate() {
        bindings.insert(i.to_string(), element_bound(doc, id));
    }
    bindings
}

pub fn element_bound(doc: &Document, id: ego_tree::NodeId) -> Bound {
    let node = doc.get(id).expect("valid node id");
    let data: &ElementData = node.value();
    let url = match &data.kind {
        crate::tree::ElementKind::TextRun(leaf) | crate::tree::ElementKind::Chips(leaf) => {
            leaf.url.clone()
        }
        _ => None,
    };
    Bound::Element {
        text: doc.aggregated_text(id),
        url,
        type_name: data.kind.type_name().to_string(),
        tags: data.attrs.tags.clone(),
        style: effective_style(doc, id, &data.attrs),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    Exactly,
    AtLeast,
    Any,
}

/// One step of an ancestor-path match (§4.3): either a concrete `MatchElement`
/// that must align with one ancestor, or a skip directive consuming zero or
/// more ancestors before the next step (or the element itself) is tried.
#[derive(Debug, Clone)]
pub enum AncestorStep {
    Match(MatchElement),
    Skip { kind: SkipKind, count: usize },
}

/// The full predicate for one match site (§4.3): the element itself, its
/// aligned ancestor path, and an optional "some descendant matches" check.
#[derive(Debug, Clone, Default)]
pub struct MatchCriteria {
    pub match_element: MatchElement,
    pub match_ancestors: Vec<AncestorStep>,
    pub match_descendant: Option<MatchElement>,
}

impl MatchCriteria {
    pub fn matches(
        &self,
        doc: &Document,
        ctx: &Context,
        elements: &[ego_tree::NodeId],
    ) -> Result<bool, MatcherError> {
        if !self.match_element.matches(doc, ctx, elements)? {
            return Ok(false);
        }
        if !self.ancestors_match(doc, ctx)? {
            return Ok(false);
        }
        if let Some(descendant) = &self.match_descendant {
            if !self.any_descendant_matches(doc, ctx, descendant)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Walk `match_ancestors` top-down (root first) against `ctx.ancestors`,
    /// which is already in root-to-parent order. `Skip { Exactly, n }` must
    /// consume exactly `n` ancestors before the next step; `AtLeast`
    /// consumes `n` or more; `Any` consumes any number (including zero) and
    /// is satisfied greedily but backtracks if a following `Match` step
    /// needs the ancestor it skipped over.
    fn ancestors_match(&self, doc: &Document, ctx: &Context) -> Result<bool, MatcherError> {
        match_ancestor_steps(doc, &self.match_ancestors, &ctx.ancestors, ctx)
    }

    fn any_descendant_matches(
        &self,
        doc: &Document,
        ctx: &Context,
        descendant: &MatchElement,
    ) -> Result<bool, MatcherError> {
        for sub_ctx in crate::traversal::Traversal::from_node(doc, ctx.id) {
            if sub_ctx.id == ctx.id {
                continue;
            }
            if descendant.matches(doc, &sub_ctx, &[sub_ctx.id])? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn match_ancestor_steps(
    doc: &Document,
    steps: &[AncestorStep],
    ancestors: &[ego_tree::NodeId],
    ctx: &Context,
) -> Result<bool, MatcherError> {
    let Some((step, rest_steps)) = steps.split_first() else {
        return Ok(true);
    };
    match step {
        AncestorStep::Match(me) => {
            let Some((&first, rest_ancestors)) = ancestors.split_first() else {
                return Ok(false);
            };
            let sub_ctx = context_for(doc, first, ctx);
            if !me.matches(doc, &sub_ctx, &[first])? {
                return Ok(false);
            }
            match_ancestor_steps(doc, rest_steps, rest_ancestors, ctx)
        }
        AncestorStep::Skip {
            kind: SkipKind::Exactly,
            count,
        } => {
            if ancestors.len() < *count {
                return Ok(false);
            }
            match_ancestor_steps(doc, rest_steps, &ancestors[*count..], ctx)
        }
        AncestorStep::Skip {
            kind: SkipKind::AtLeast,
            count,
        } => {
            if ancestors.len() < *count {
                return Ok(false);
            }
            for extra in *count..=ancestors.len() {
                if match_ancestor_steps(doc, rest_steps, &ancestors[extra..], ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        AncestorStep::Skip {
            kind: SkipKind::Any,
            ..
        } => {
            for extra in 0..=ancestors.len() {
                if match_ancestor_steps(doc, rest_steps, &ancestors[extra..], ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// A synthetic context for an ancestor node, reusing its real table
/// position but not its sibling/ancestor bookkeeping (ancestor `MatchElement`s
/// never reference sibling or further-ancestor state, only §4.3 element
/// fields and `aggregated_text_regex`/table position).
fn context_for(doc: &Document, id: ego_tree::NodeId, _leaf_ctx: &Context) -> Context {
    Context {
        id,
        ancestors: Vec::new(),
        table_position: doc.table_position(id),
        sibling_index: 0,
        sibling_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{doc_content_cell, ElementData, ElementKind};

    fn tagged(kind: ElementKind, tags: &[(&str, &str)]) -> ElementData {
        let mut data = ElementData::new(kind);
        for (k, v) in tags {
            data.attrs.tags.insert(k.to_string(), v.to_string());
        }
        data
    }

    fn ctx_for(doc: &Document, id: ego_tree::NodeId) -> Context {
        crate::traversal::Traversal::from_root(doc)
            .find(|c| c.id == id)
            .unwrap()
    }

    #[test]
    fn element_types_rejects_non_matching_kind() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(root, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        let me = MatchElement {
            element_types: Some(vec!["Table".to_string()]),
            ..Default::default()
        };
        let ctx = ctx_for(&doc, para);
        assert!(!me.matches(&doc, &ctx, &[para]).unwrap());
    }

    #[test]
    fn required_tag_sets_is_a_disjunction_of_conjunctions() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(
                root,
                tagged(ElementKind::Paragraph, &[("role", "caption")]),
            )
            .unwrap();
        let me = MatchElement {
            required_tag_sets: vec![
                vec![KeyPattern {
                    key: "role".to_string(),
                    pattern: Some(compile_full_match("heading").unwrap()),
                }],
                vec![KeyPattern {
                    key: "role".to_string(),
                    pattern: Some(compile_full_match("caption").unwrap()),
                }],
            ],
            ..Default::default()
        };
        let ctx = ctx_for(&doc, para);
        assert!(me.matches(&doc, &ctx, &[para]).unwrap());
    }

    #[test]
    fn rejected_tags_rejects_on_bare_key_presence() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let para = doc
            .append_child(root, tagged(ElementKind::Paragraph, &[("draft", "true")]))
            .unwrap();
        let me = MatchElement {
            rejected_tags: vec![KeyPattern {
                key: "draft".to_string(),
                pattern: None,
            }],
            ..Default::default()
        };
        let ctx = ctx_for(&doc, para);
        assert!(!me.matches(&doc, &ctx, &[para]).unwrap());
    }

    #[test]
    fn column_position_resolves_negative_index_from_the_end() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let cells = vec![
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
            doc_content_cell(),
        ];
        let table = doc.build_table(root, 2, 2, cells).unwrap();
        let cells: Vec<_> = doc.get(table).unwrap().children().map(|c| c.id()).collect();
        let me = MatchElement {
            start_col: Some(-1),
            ..Default::default()
        };
        let ctx_last = ctx_for(&doc, cells[1]);
        let ctx_first = ctx_for(&doc, cells[0]);
        assert!(me.matches(&doc, &ctx_last, &[cells[1]]).unwrap());
        assert!(!me.matches(&doc, &ctx_first, &[cells[0]]).unwrap());
    }

    #[test]
    fn ancestor_skip_any_allows_matching_a_distant_ancestor() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let section = doc
            .append_child(
                root,
                tagged(ElementKind::Section(Default::default()), &[("kind", "faq")]),
            )
            .unwrap();
        let para = doc
            .append_child(section, ElementData::new(ElementKind::Paragraph))
            .unwrap();
        let run = doc.append_child(para, ElementData::text_run("hi")).unwrap();

        let criteria = MatchCriteria {
            match_element: MatchElement {
                element_types: Some(vec!["TextRun".to_string()]),
                ..Default::default()
            },
            match_ancestors: vec![
                AncestorStep::Skip {
                    kind: SkipKind::Any,
                    count: 0,
                },
                AncestorStep::Match(MatchElement {
                    required_tag_sets: vec![vec![KeyPattern {
                        key: "kind".to_string(),
                        pattern: Some(compile_full_match("faq").unwrap()),
                    }]],
                    ..Default::default()
                }),
            ],
            match_descendant: None,
        };
        let ctx = ctx_for(&doc, run);
        assert!(criteria.matches(&doc, &ctx, &[run]).unwrap());
    }

    #[test]
    fn element_expression_with_regex_match_checks_rendered_text() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, ElementData::text_run("ID-42")).unwrap();
        let me = MatchElement {
            element_expressions: vec![ElementExpression {
                expr: "{0.text}".to_string(),
                regex_match: Some(compile_full_match(r"ID-\d+").unwrap()),
                ignore_key_errors: false,
            }],
            ..Default::default()
        };
        let ctx = ctx_for(&doc, run);
        assert!(me.matches(&doc, &ctx, &[run]).unwrap());
    }
}
