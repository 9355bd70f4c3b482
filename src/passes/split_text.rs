//! `split_text` (§4.5, §8.2 round-trip): replaces a matched text-bearing
//! leaf with one element per capture group per regex match (or one per
//! whole match, for a groupless pattern), tagging the pieces positionally
//! and/or uniformly.

use regex::Regex;
use serde::Deserialize;

use crate::error::DocScraperError;
use crate::matcher::{MatchCriteria, MatchCriteriaConfig};
use crate::query::QueryEngine;
use crate::traversal::Traversal;
use crate::tree::{Document, ElementData, ElementKind, LeafData};

use super::{matcher_err, no_matches_err, Pass, TagUpdateConfig};

pub struct SplitText {
    match_: MatchCriteria,
    text_regex: Regex,
    element_tags: Vec<TagUpdateConfig>,
    all_tags: TagUpdateConfig,
    allow_no_matches: bool,
}

impl SplitText {
    pub fn new(
        match_: MatchCriteria,
        text_regex: Regex,
        element_tags: Vec<TagUpdateConfig>,
        all_tags: TagUpdateConfig,
        allow_no_matches: bool,
    ) -> Self {
        Self {
            match_,
            text_regex,
            element_tags,
            all_tags,
            allow_no_matches,
        }
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for caps in self.text_regex.captures_iter(text) {
            if caps.len() > 1 {
                for i in 1..caps.len() {
                    if let Some(m) = caps.get(i) {
                        pieces.push(m.as_str().to_string());
                    }
                }
            } else if let Some(m) = caps.get(0) {
                pieces.push(m.as_str().to_string());
            }
        }
        pieces
    }
}

impl Pass for SplitText {
    fn name(&self) -> &'static str {
        "split_text"
    }

    fn apply(&self, doc: &mut Document, _engine: &dyn QueryEngine) -> Result<(), DocScraperError> {
        let mut matched = Vec::new();
        for ctx in Traversal::from_root(doc) {
            if doc.get(ctx.id).expect("valid node id").value().kind.text().is_none() {
                continue;
            }
            if self
                .match_
                .matches(doc, &ctx, &[ctx.id])
                .map_err(|e| matcher_err(self.name(), e))?
            {
                matched.push(ctx.id);
            }
        }

        for id in matched {
            let (text, kind_is_chips, url) = {
                let node = doc.get(id).expect("valid node id");
                let leaf = match &node.value().kind {
                    ElementKind::TextRun(l) => (l.text.clone(), false, l.url.clone()),
                    ElementKind::Chips(l) => (l.text.clone(), true, l.url.clone()),
                    _ => unreachable!("filtered to text-bearing elements above"),
                };
                leaf
            };

            let pieces = self.pieces(&text);
            if pieces.is_empty() {
                if self.allow_no_matches {
                    continue;
                }
                return Err(no_matches_err(self.text_regex.as_str()));
            }

            let new_ids: Vec<_> = pieces
                .into_iter()
                .enumerate()
                .map(|(i, piece)| {
                    let leaf = LeafData {
                        text: piece,
                        url: url.clone(),
                    };
                    let mut element = ElementData::new(if kind_is_chips {
                        ElementKind::Chips(leaf)
                    } else {
                        ElementKind::TextRun(leaf)
                    });
                    if let Some(cfg) = self.element_tags.get(i) {
                        cfg.apply_literal(&mut element.attrs.tags);
                    }
                    self.all_tags.apply_literal(&mut element.attrs.tags);
                    element
                })
                .collect();

            for element in new_ids {
                doc.tree_mut().get_mut(id).expect("valid node id").insert_before(element);
            }
            doc.tree_mut().get_mut(id).expect("valid node id").detach();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitTextConfig {
    #[serde(rename = "match")]
    pub match_: MatchCriteriaConfig,
    pub text_regex: String,
    #[serde(default)]
    pub element_tags: Vec<TagUpdateConfig>,
    #[serde(default)]
    pub all_tags: TagUpdateConfig,
    #[serde(default)]
    pub allow_no_matches: bool,
}

impl SplitTextConfig {
    pub fn compile(&self) -> Result<SplitText, DocScraperError> {
        let match_ = self.match_.compile().map_err(|e| matcher_err("split_text", e))?;
        let text_regex = Regex::new(&self.text_regex).map_err(|source| {
            matcher_err(
                "split_text",
                crate::error::MatcherError::InvalidRegex {
                    pattern: self.text_regex.clone(),
                    source,
                },
            )
        })?;
        Ok(SplitText::new(
            match_,
            text_regex,
            self.element_tags.clone(),
            self.all_tags.clone(),
            self.allow_no_matches,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::HandWrittenQueryEngine;

    #[test]
    fn splits_on_each_capture_group_per_match() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        let run = doc.append_child(root, ElementData::text_run("a/b/c")).unwrap();

        let pass = SplitText::new(
            MatchCriteria::default(),
            Regex::new(r"([^/])(?:/|$)").unwrap(),
            Vec::new(),
            TagUpdateConfig::default(),
            false,
        );
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let texts: Vec<String> = doc.root().children().map(|c| doc.aggregated_text(c.id())).collect();
        assert_eq!(texts, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert!(doc.get(run).is_none() || doc.root().children().all(|c| c.id() != run));
    }

    /// §8.3 S6: positional `element_tags` land on the matching piece only,
    /// `all_tags` lands on every piece.
    #[test]
    fn element_tags_are_positional_and_all_tags_are_universal() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        doc.append_child(root, ElementData::text_run("a/b/c")).unwrap();

        let mut first = TagUpdateConfig::default();
        first.add.insert("first".to_string(), "x".to_string());
        let mut second = TagUpdateConfig::default();
        second.add.insert("second".to_string(), "x".to_string());
        let mut all_tags = TagUpdateConfig::default();
        all_tags.add.insert("split_element".to_string(), "x".to_string());

        let pass = SplitText::new(
            MatchCriteria::default(),
            Regex::new(r"([^/])(?:/|$)").unwrap(),
            vec![first, second],
            all_tags,
            false,
        );
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let pieces: Vec<_> = doc.root().children().collect();
        assert_eq!(pieces.len(), 3);
        for piece in &pieces {
            assert_eq!(piece.value().attrs.tags.get("split_element"), Some(&"x".to_string()));
        }
        assert_eq!(pieces[0].value().attrs.tags.get("first"), Some(&"x".to_string()));
        assert_eq!(pieces[0].value().attrs.tags.get("second"), None);
        assert_eq!(pieces[1].value().attrs.tags.get("second"), Some(&"x".to_string()));
        assert_eq!(pieces[1].value().attrs.tags.get("first"), None);
        assert_eq!(pieces[2].value().attrs.tags.get("first"), None);
        assert_eq!(pieces[2].value().attrs.tags.get("second"), None);
    }

    #[test]
    fn whole_string_match_with_no_groups_is_a_no_op() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        doc.append_child(root, ElementData::text_run("hello")).unwrap();

        let pass = SplitText::new(
            MatchCriteria::default(),
            Regex::new(r"^.*$").unwrap(),
            Vec::new(),
            TagUpdateConfig::default(),
            false,
        );
        let engine = HandWrittenQueryEngine::new();
        pass.apply(&mut doc, &engine).unwrap();

        let texts: Vec<String> = doc.root().children().map(|c| doc.aggregated_text(c.id())).collect();
        assert_eq!(texts, vec!["hello".to_string()]);
    }

    #[test]
    fn fails_on_no_match_unless_allowed() {
        let mut doc = Document::empty();
        let root = doc.root_id();
        doc.append_child(root, ElementData::text_run("hello")).unwrap();

        let pass = SplitText::new(
            MatchCriteria::default(),
            Regex::new(r"xyz").unwrap(),
            Vec::new(),
            TagUpdateConfig::default(),
            false,
        );
        let engine = HandWrittenQueryEngine::new();
        assert!(pass.apply(&mut doc, &engine).is_err());
    }
}
