//! Placeholder interpolation shared by the matcher's `element_expressions`
//! (`{0.field}`, positional) and the variable engine's `tags.add` templates
//! (`{name}`, `{name.tags[key]}`, `{name.text}`) — §4.3 and §4.4 use the
//! same `{ref[.field[\[key\]]]}` grammar, just with different namesets for
//! `ref`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::MatcherError;
use crate::tree::StrMap;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*)(?:\[([^\]]*)\])?)?\}")
        .expect("static pattern is valid")
});

/// A bindable value a placeholder `ref` resolves to: either a bare string
/// (e.g. a `substitutions`-computed variable) or a full element snapshot
/// (tags/style/text/url/type), giving `.field`/`.field[key]` access.
#[derive(Debug, Clone)]
pub enum Bound {
    Text(String),
    Element {
        text: String,
        url: Option<String>,
        type_name: String,
        tags: StrMap,
        style: StrMap,
    },
}

impl Bound {
    pub fn text(text: impl Into<String>) -> Self {
        Bound::Text(text.into())
    }

    fn as_plain(&self) -> &str {
        match self {
            Bound::Text(s) => s,
            Bound::Element { text, .. } => text,
        }
    }

    fn field(&self, field: &str, key: Option<&str>) -> Option<String> {
        match self {
            Bound::Text(s) => match field {
                "text" => Some(s.clone()),
                _ => None,
            },
            Bound::Element {
                text,
                url,
                type_name,
                tags,
                style,
            } => match field {
                "text" => Some(text.clone()),
                "url" => url.clone(),
                "type" => Some(type_name.clone()),
                "tags" => key.and_then(|k| tags.get(k).cloned()),
                "style" => key.and_then(|k| style.get(k).cloned()),
                _ => None,
            },
        }
    }
}

/// Render `template` by substituting every `{ref[.field[\[key\]]]}`
/// placeholder using `bindings`. `label` identifies the surrounding
/// construct (an `element_expressions[i].expr` or a `tags.add[k]` value)
/// purely for error messages.
pub fn render(
    label: &str,
    template: &str,
    bindings: &BTreeMap<String, Bound>,
) -> Result<String, MatcherError> {
    let mut error = None;
    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures| {
        if error.is_some() {
            return String::new();
        }
        let name = &caps[1];
        let Some(bound) = bindings.get(name) else {
            error = Some(MatcherError::UndefinedVariable {
                template: label.to_string(),
                name: name.to_string(),
            });
            return String::new();
        };
        let Some(field) = caps.get(2) else {
            return bound.as_plain().to_string();
        };
        let key = caps.get(3).map(|m| m.as_str());
        match bound.field(field.as_str(), key) {
            Some(v) => v,
            None => {
                error = Some(MatcherError::UndefinedKey {
                    template: label.to_string(),
                    name: name.to_string(),
                    key: key.unwrap_or(field.as_str()).to_string(),
                });
                String::new()
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_text_binding() {
        let mut bindings = BTreeMap::new();
        bindings.insert("x".to_string(), Bound::text("hello"));
        assert_eq!(render("t", "say {x}!", &bindings).unwrap(), "say hello!");
    }

    #[test]
    fn renders_tag_lookup() {
        let mut tags = StrMap::new();
        tags.insert("label".to_string(), "Name".to_string());
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "first".to_string(),
            Bound::Element {
                text: "ignored".to_string(),
                url: None,
                type_name: "TextRun".to_string(),
                tags,
                style: StrMap::new(),
            },
        );
        assert_eq!(
            render("t", "{first.tags[label]}", &bindings).unwrap(),
            "Name"
        );
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let bindings = BTreeMap::new();
        let err = render("t", "{missing}", &bindings).unwrap_err();
        assert!(matches!(err, MatcherError::UndefinedVariable { .. }));
    }

    #[test]
    fn undefined_key_is_an_error() {
        let mut bindings = BTreeMap::new();
        bindings.insert("x".to_string(), Bound::text("hello"));
        let err = render("t", "{x.tags[nope]}", &bindings).unwrap_err();
        assert!(matches!(err, MatcherError::UndefinedKey { .. }));
    }
}
