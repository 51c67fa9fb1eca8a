//! `{{placeholder}}` extraction for message templates.
//!
//! A placeholder is one or more ASCII word characters (letters, digits,
//! underscore) wrapped in double braces. Anything else between the braces, or
//! unbalanced braces, is plain text.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern"))
}

/// Distinct placeholder names in `text`, in order of first appearance.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholder_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
