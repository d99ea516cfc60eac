//! Alert block normalization.
//!
//! Notebook conversion renders callouts as `<div class="alert alert-block alert-warning">`.
//! The course book repurposes those callouts as exercises, so matching elements get their
//! alert classes swapped for a single `exercise-block` class. Everything else on the page
//! is streamed through untouched.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::LazyLock;

use lol_html::{element, rewrite_str, RewriteStrSettings};
use regex::Regex;
use serde::Deserialize;

use crate::traits::{PageContext, PageTransform, TransformError, Transformed};

/// Name under which the alert rewriter is registered.
pub const REPLACE_ALERTS: &str = "replace_alerts";

static CLASS_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("Invalid class token regex")
});

static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*|[a-zA-Z][a-zA-Z0-9-]*)$").expect("Invalid element regex"));

/// A class rewrite rule.
///
/// An element matches when its tag is `element` (or `element` is `*`) and its
/// class tokens include every token in `require`. On match the `require` and
/// `remove` tokens are dropped, the remaining tokens keep their order, and
/// `replacement` is appended.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewriteRule {
    /// Tag name to match, or `*` for any element
    #[serde(default = "default_element")]
    pub element: String,

    /// Class tokens that must all be present
    pub require: Vec<String>,

    /// Extra tokens stripped on match when present
    #[serde(default)]
    pub remove: Vec<String>,

    /// Token added on match
    pub replacement: String,
}

fn default_element() -> String {
    "div".to_string()
}

impl RewriteRule {
    /// The warning-alert to exercise-block rule used by the course book.
    pub fn exercise_block() -> Self {
        Self {
            element: default_element(),
            require: vec!["alert".to_string(), "alert-warning".to_string()],
            remove: vec!["alert-block".to_string()],
            replacement: "exercise-block".to_string(),
        }
    }

    /// Whether an element with this tag and these class tokens qualifies.
    pub fn matches(&self, tag: &str, tokens: &[&str]) -> bool {
        let tag_ok = self.element == "*" || self.element.eq_ignore_ascii_case(tag);
        tag_ok && self.require.iter().all(|r| tokens.contains(&r.as_str()))
    }

    /// Apply the rule to a token list. The caller checks `matches` first.
    fn rewrite<'a>(&'a self, tokens: &mut Vec<&'a str>) {
        tokens.retain(|t| {
            !self.require.iter().any(|r| r == t) && !self.remove.iter().any(|r| r == t)
        });
        if !tokens.contains(&self.replacement.as_str()) {
            tokens.push(&self.replacement);
        }
    }

    fn validate(&self) -> Result<(), RuleError> {
        if !ELEMENT_RE.is_match(&self.element) {
            return Err(RuleError::InvalidElement(self.element.clone()));
        }
        if self.require.is_empty() {
            return Err(RuleError::EmptyRequire(self.replacement.clone()));
        }
        for token in self
            .require
            .iter()
            .chain(&self.remove)
            .chain(std::iter::once(&self.replacement))
        {
            if !CLASS_TOKEN_RE.is_match(token) {
                return Err(RuleError::InvalidToken(token.clone()));
            }
        }
        Ok(())
    }
}

impl Default for RewriteRule {
    fn default() -> Self {
        Self::exercise_block()
    }
}

/// Errors in a rewrite rule set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid element name in rewrite rule: {0:?}")]
    InvalidElement(String),

    #[error("Rewrite rule for {0:?} has no required classes")]
    EmptyRequire(String),

    #[error("Invalid class token in rewrite rule: {0:?}")]
    InvalidToken(String),

    #[error("Replacement class {0:?} is required by a rule, rewriting would not settle")]
    ReplacementRequired(String),

    #[error("At least one rewrite rule is needed")]
    NoRules,
}

/// Rewrites alert blocks according to a validated rule set.
#[derive(Debug, Clone)]
pub struct AlertRewriter {
    rules: Vec<RewriteRule>,
}

impl AlertRewriter {
    /// Create a rewriter, validating the rules.
    ///
    /// No rule may add a token that any rule requires. With that holding, one pass
    /// over the rules in order reaches a fixed point, so rewriting is idempotent.
    pub fn new(rules: Vec<RewriteRule>) -> Result<Self, RuleError> {
        if rules.is_empty() {
            return Err(RuleError::NoRules);
        }

        for rule in &rules {
            rule.validate()?;
        }

        let required: HashSet<&str> = rules
            .iter()
            .flat_map(|r| r.require.iter().map(String::as_str))
            .collect();

        if let Some(rule) = rules
            .iter()
            .find(|r| required.contains(r.replacement.as_str()))
        {
            return Err(RuleError::ReplacementRequired(rule.replacement.clone()));
        }

        Ok(Self { rules })
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Compute the new class value for an element, or `None` if no rule applies.
    pub fn rewrite_class(&self, tag: &str, class: &str) -> Option<String> {
        let mut tokens: Vec<&str> = class.split_ascii_whitespace().collect();
        let mut changed = false;

        for rule in &self.rules {
            if rule.matches(tag, &tokens) {
                rule.rewrite(&mut tokens);
                changed = true;
            }
        }

        changed.then(|| tokens.join(" "))
    }

    /// Rewrite every matching element in a page.
    pub fn rewrite(&self, html: &str) -> Result<Transformed, TransformError> {
        let count = Cell::new(0usize);

        let output = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("[class]", |el| {
                    let Some(class) = el.get_attribute("class") else {
                        return Ok(());
                    };

                    if let Some(new_class) = self.rewrite_class(&el.tag_name(), &class) {
                        el.set_attribute("class", &new_class)?;
                        count.set(count.get() + 1);
                    }

                    Ok(())
                })],
                strict: true,
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| TransformError::ParseError(e.to_string()))?;

        if count.get() == 0 {
            // Keep the input verbatim rather than the re-serialized stream.
            return Ok(Transformed::unchanged(html));
        }

        Ok(Transformed {
            html: output,
            changes: count.get(),
        })
    }
}

impl Default for AlertRewriter {
    fn default() -> Self {
        Self {
            rules: vec![RewriteRule::exercise_block()],
        }
    }
}

impl PageTransform for AlertRewriter {
    fn name(&self) -> &'static str {
        REPLACE_ALERTS
    }

    fn apply(&self, html: &str, page: &PageContext) -> Result<Transformed, TransformError> {
        let result = self.rewrite(html)?;
        if result.changes > 0 {
            tracing::debug!(
                "Rewrote {} alert blocks in {}",
                result.changes,
                page.path().display()
            );
        }
        Ok(result)
    }
}

/// Rewrite warning alert blocks to exercise blocks using the default rule.
pub fn rewrite_alerts(html: &str) -> Result<String, TransformError> {
    AlertRewriter::default().rewrite(html).map(|t| t.html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rewrites_warning_alert() {
        let html = r#"<div class="alert alert-block alert-warning">Note</div>"#;

        assert_eq!(
            rewrite_alerts(html).unwrap(),
            r#"<div class="exercise-block">Note</div>"#
        );
    }

    #[test]
    fn leaves_info_alert_alone() {
        let html = r#"<div class="alert alert-info">Tip</div>"#;

        assert_eq!(rewrite_alerts(html).unwrap(), html);
    }

    #[test]
    fn page_without_alerts_is_identical() {
        let html = "<!DOCTYPE html>\n<html>\n<head><title>Intro</title></head>\n<body>\n  <p class='lead'>Hello</p>\n  <img src=x.png alt=\"\">\n</body>\n</html>\n";

        let result = AlertRewriter::default().rewrite(html).unwrap();

        assert_eq!(result.changes, 0);
        assert_eq!(result.html, html);
    }

    #[test]
    fn rewrites_every_match_in_order() {
        let html = concat!(
            r#"<div class="alert alert-block alert-warning">First</div>"#,
            r#"<p>between</p>"#,
            r#"<div class="alert alert-block alert-warning">Second</div>"#,
        );

        let result = AlertRewriter::default().rewrite(html).unwrap();

        assert_eq!(result.changes, 2);
        assert_eq!(
            result.html,
            concat!(
                r#"<div class="exercise-block">First</div>"#,
                r#"<p>between</p>"#,
                r#"<div class="exercise-block">Second</div>"#,
            )
        );
    }

    #[test]
    fn preserves_attributes_and_children() {
        let html = r#"<section><div id="ex-1" class="alert alert-block alert-warning" data-cell="4"><b>Exercise:</b> fit a <code>LinearRegression</code></div></section>"#;

        let result = rewrite_alerts(html).unwrap();

        assert_eq!(
            result,
            r#"<section><div id="ex-1" class="exercise-block" data-cell="4"><b>Exercise:</b> fit a <code>LinearRegression</code></div></section>"#
        );
    }

    #[test]
    fn keeps_unrelated_tokens() {
        let html = r#"<div class="mt-2 alert alert-warning rounded">Do it</div>"#;

        assert_eq!(
            rewrite_alerts(html).unwrap(),
            r#"<div class="mt-2 rounded exercise-block">Do it</div>"#
        );
    }

    #[test]
    fn token_order_and_spacing_do_not_matter() {
        let html = "<div class=\"alert-warning\n  alert\">x</div>";

        assert_eq!(
            rewrite_alerts(html).unwrap(),
            r#"<div class="exercise-block">x</div>"#
        );
    }

    #[test]
    fn substrings_are_not_tokens() {
        let html = r#"<div class="alerts alert-warnings">x</div>"#;

        assert_eq!(rewrite_alerts(html).unwrap(), html);
    }

    #[test]
    fn only_divs_match_by_default() {
        let html = r#"<span class="alert alert-warning">x</span>"#;

        assert_eq!(rewrite_alerts(html).unwrap(), html);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let html = r#"<div class="alert alert-block alert-warning">A</div><div class="alert alert-warning exercise-block">B</div>"#;

        let once = rewrite_alerts(html).unwrap();
        let twice = rewrite_alerts(&once).unwrap();

        assert_eq!(once, twice);
        assert_eq!(
            once,
            r#"<div class="exercise-block">A</div><div class="exercise-block">B</div>"#
        );
    }

    #[test]
    fn ignores_markup_inside_scripts() {
        let html = r#"<script>const s = '<div class="alert alert-warning">';</script>"#;

        assert_eq!(rewrite_alerts(html).unwrap(), html);
    }

    #[test]
    fn ambiguous_markup_is_a_parse_error() {
        let result = rewrite_alerts("<select><style>");

        assert!(matches!(result, Err(TransformError::ParseError(_))));
    }

    #[test]
    fn applies_every_matching_rule() {
        let rewriter = AlertRewriter::new(vec![
            RewriteRule::exercise_block(),
            RewriteRule {
                element: "*".to_string(),
                require: vec!["alert-info".to_string()],
                remove: vec![],
                replacement: "tip-block".to_string(),
            },
        ])
        .unwrap();

        let html = r#"<div class="alert alert-warning alert-info">x</div><p class="alert-info">y</p>"#;
        let once = rewriter.rewrite(html).unwrap();
        let twice = rewriter.rewrite(&once.html).unwrap();

        assert_eq!(
            once.html,
            r#"<div class="exercise-block tip-block">x</div><p class="tip-block">y</p>"#
        );
        assert_eq!(twice.changes, 0);
    }

    #[test]
    fn rejects_rules_that_would_not_settle() {
        let result = AlertRewriter::new(vec![
            RewriteRule::exercise_block(),
            RewriteRule {
                element: "div".to_string(),
                require: vec!["exercise-block".to_string()],
                remove: vec![],
                replacement: "other".to_string(),
            },
        ]);

        assert_eq!(
            result.unwrap_err(),
            RuleError::ReplacementRequired("exercise-block".to_string())
        );
    }

    #[test]
    fn rejects_invalid_rules() {
        let bad_token = RewriteRule {
            replacement: "two words".to_string(),
            ..RewriteRule::exercise_block()
        };
        let bad_element = RewriteRule {
            element: "div.alert".to_string(),
            ..RewriteRule::exercise_block()
        };
        let empty = RewriteRule {
            require: vec![],
            ..RewriteRule::exercise_block()
        };

        assert!(matches!(
            AlertRewriter::new(vec![bad_token]),
            Err(RuleError::InvalidToken(_))
        ));
        assert!(matches!(
            AlertRewriter::new(vec![bad_element]),
            Err(RuleError::InvalidElement(_))
        ));
        assert!(matches!(
            AlertRewriter::new(vec![empty]),
            Err(RuleError::EmptyRequire(_))
        ));
        assert_eq!(AlertRewriter::new(vec![]).unwrap_err(), RuleError::NoRules);
    }
}
