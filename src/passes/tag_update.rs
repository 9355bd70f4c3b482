//! Shared `{add, remove}` tag-update shape (§4.5), used verbatim by
//! `split_text`'s `element_tags`/`all_tags` (literal values, no
//! interpolation) and mirrored by `tag_matching`'s `tags` (template
//! values, rendered through the variable engine before being applied).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::tree::StrMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagUpdateConfig {
    #[serde(default)]
    pub add: BTreeMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl TagUpdateConfig {
    /// Apply `remove` (a bare `"*"` clears every tag first, §4.5) then
    /// `add`, with `add`'s values used as-is — for passes with no
    /// `variables` to interpolate against.
    pub fn apply_literal(&self, tags: &mut StrMap) {
        apply_remove(&self.remove, tags);
        for (k, v) in &self.add {
            tags.insert(k.clone(), v.clone());
        }
    }
}

/// The `remove` half alone, reused by `tag_matching` which renders `add`
/// through the template engine instead of applying it literally.
pub fn apply_remove(remove: &[String], tags: &mut StrMap) {
    if remove.iter().any(|k| k == "*") {
        tags.clear();
    } else {
        for k in remove {
            tags.remove(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_clears_before_add() {
        let mut tags = StrMap::new();
        tags.insert("old".to_string(), "x".to_string());
        let cfg = TagUpdateConfig {
            add: BTreeMap::from([("new".to_string(), "y".to_string())]),
            remove: vec!["*".to_string()],
        };
        cfg.apply_literal(&mut tags);
        assert_eq!(tags.get("old"), None);
        assert_eq!(tags.get("new"), Some(&"y".to_string()));
    }
}
