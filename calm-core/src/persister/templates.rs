//! Per-axis text templates with bracketed-optional-section elision
//! (spec.md §4.2).
//!
//! A template is plain text with two kinds of slots:
//! - `{field}` — required; rendering fails if the field is absent.
//! - `[... {field} ...]` — optional section; the whole bracketed span is
//!   dropped if any field referenced inside it is absent or empty.
//!   Brackets do not nest.

use std::collections::HashMap;

use regex::Regex;

/// Field values available to a single render pass. Absent keys and `Some("")`
/// are both treated as "absent" for the purpose of optional-section elision.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    fields: HashMap<String, String>,
}

impl TemplateContext {
    /// Builds an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field; an empty string is equivalent to never setting it.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(key.to_string(), value);
        }
        self
    }

    /// Sets a field only if `value` is `Some` and non-empty.
    #[must_use]
    pub fn with_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.with(key, v.to_string()),
            _ => self,
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Error rendering a template: a required `{field}` was absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template field '{0}' is required but was not supplied")]
pub struct MissingFieldError(pub String);

fn field_names(segment: &str) -> Vec<String> {
    static FIELD_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = FIELD_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));
    re.captures_iter(segment)
        .map(|c| c[1].to_string())
        .collect()
}

fn substitute_required(segment: &str, ctx: &TemplateContext) -> Result<String, MissingFieldError> {
    static FIELD_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = FIELD_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));
    let mut err = None;
    let rendered = re.replace_all(segment, |caps: &regex::Captures| {
        let name = &caps[1];
        match ctx.get(name) {
            Some(value) => value.to_string(),
            None => {
                err = Some(MissingFieldError(name.to_string()));
                String::new()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

/// Renders `template`, eliding `[...]` sections whose referenced fields are
/// absent, then collapsing whitespace artefacts left behind by elision
/// (spec.md §8 boundary: no stray whitespace or trailing-punctuation
/// artefact).
///
/// # Errors
/// Returns [`MissingFieldError`] if a required (non-bracketed) `{field}` is
/// absent from `ctx`.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String, MissingFieldError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('[') {
        output.push_str(&substitute_required(&rest[..open], ctx)?);
        let Some(close_rel) = rest[open..].find(']') else {
            // unmatched bracket: treat the rest of the template literally
            output.push_str(&substitute_required(&rest[open..], ctx)?);
            rest = "";
            break;
        };
        let close = open + close_rel;
        let section = &rest[open + 1..close];
        let names = field_names(section);
        let all_present = names.iter().all(|n| ctx.get(n).is_some());
        if all_present {
            output.push_str(&substitute_required(section, ctx)?);
        }
        rest = &rest[close + 1..];
    }
    output.push_str(&substitute_required(rest, ctx)?);

    Ok(collapse_whitespace(&output))
}

/// Collapses runs of whitespace into a single space, trims each line, and
/// removes a stray space immediately before sentence punctuation left
/// behind when an optional section was elided.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    static PUNCT_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let ws = WS_RE.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"));
    let punct = PUNCT_RE.get_or_init(|| Regex::new(r" +([.,;:])").expect("valid regex"));

    text.lines()
        .map(|line| {
            let collapsed = ws.replace_all(line.trim(), " ");
            punct.replace_all(&collapsed, "$1").trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
