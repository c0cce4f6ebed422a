//! Placeholder substitution for prompt templates.
//!
//! Templates carry `{identifier}` tokens. Each token's inner text is normalized the same way
//! variable names are, looked up in the [`VariableStore`], and replaced when the store holds a
//! non-empty value. Unresolved tokens stay in the output verbatim, braces included, so an unset
//! variable remains visible as an instruction to the reader.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use pf_types::{PREVIOUS_OUTPUT_PLACEHOLDER, normalize_variable_name};
use regex::{Captures, Regex};

use crate::store::VariableStore;

/// `{...}` tokens without nesting.
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern compiles"));

/// Substitutes every resolvable placeholder in `template`.
///
/// The result always starts from the given template; callers re-rendering a surface must pass
/// the pristine template rather than previously substituted text.
pub fn render_template(template: &str, store: &VariableStore) -> String {
    if template.is_empty() {
        return String::new();
    }
    PLACEHOLDER_PATTERN
        .replace_all(template, |captures: &Captures<'_>| {
            let key = normalize_variable_name(&captures[1]);
            match store.get(&key) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// Distinct normalized placeholder names in order of first appearance.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names = IndexSet::new();
    for captures in PLACEHOLDER_PATTERN.captures_iter(template) {
        let name = normalize_variable_name(&captures[1]);
        if !name.is_empty() {
            names.insert(name);
        }
    }
    names.into_iter().collect()
}

/// Placeholders in `template` that `store` cannot resolve.
pub fn unresolved_placeholders(template: &str, store: &VariableStore) -> Vec<String> {
    extract_placeholders(template)
        .into_iter()
        .filter(|name| store.get(name).is_none_or(str::is_empty))
        .collect()
}

/// Whether the template asks the reader to paste the previous step's output.
pub fn references_previous_output(template: &str) -> bool {
    template.to_lowercase().contains(PREVIOUS_OUTPUT_PLACEHOLDER)
}
