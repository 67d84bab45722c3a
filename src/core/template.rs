// src/core/template.rs

use crate::models::ResolvedValues;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"\{(\w+)\}").expect("token pattern is valid");
}

/// Replaces every `{name}` token with `values[name]`.
///
/// Tokens without a mapped value are kept literally. Substitution is a single
/// pass: a substituted value is never scanned for tokens again.
pub fn render(template: &str, values: &ResolvedValues) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let full_match = caps.get(0).map_or("", |m| m.as_str());
            let name = caps.get(1).map_or("", |m| m.as_str());
            match values.get(name) {
                Some(value) => value.clone(),
                None => {
                    log::debug!("Token '{}' has no value, leaving it unsubstituted.", full_match);
                    full_match.to_string()
                }
            }
        })
        .into_owned()
}

/// Names of the `{name}` tokens still present in `text`, in order of appearance.
pub fn unresolved_tokens(text: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> ResolvedValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_all_tokens() {
        let v = values(&[("mode", "release"), ("target", "arm")]);
        assert_eq!(
            render("build --mode={mode} --target={target}", &v),
            "build --mode=release --target=arm"
        );
    }

    #[test]
    fn test_render_leaves_unknown_tokens() {
        let v = values(&[("mode", "release")]);
        let out = render("build --mode={mode} --target={target}", &v);
        assert_eq!(out, "build --mode=release --target={target}");
        assert_eq!(unresolved_tokens(&out), vec!["target"]);
    }

    #[test]
    fn test_render_repeated_token() {
        let v = values(&[("arch", "arm")]);
        assert_eq!(render("{arch}/{arch}", &v), "arm/arm");
    }

    #[test]
    fn test_render_is_not_recursive() {
        let v = values(&[("a", "{b}"), ("b", "oops")]);
        let out = render("x {a}", &v);
        assert_eq!(out, "x {b}");
    }

    #[test]
    fn test_render_ignores_non_word_braces() {
        let v = values(&[("a", "1")]);
        assert_eq!(render("${HOME} { a } {a}", &v), "${HOME} { a } 1");
        assert!(unresolved_tokens("${HOME} { a }").contains(&"HOME".to_string()));
    }

    #[test]
    fn test_render_without_tokens() {
        assert_eq!(render("make clean", &ResolvedValues::new()), "make clean");
        assert!(unresolved_tokens("make clean").is_empty());
    }
}
