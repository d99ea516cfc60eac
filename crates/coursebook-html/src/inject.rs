//! Stylesheet and script reference injection.
//!
//! Every page gets a `<link>` for each configured stylesheet at the end of `<head>`
//! and a `<script>` for each configured script at the end of `<body>`. URLs are made
//! relative to the page so the site works from any mount point.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::templates::{
    AssetContext, BookMeta, TemplateEngine, BODY_TEMPLATE_NAME, HEAD_TEMPLATE_NAME,
};
use crate::traits::{PageContext, PageTransform, TransformError, Transformed};

/// Name under which the asset injector is registered.
pub const INJECT_ASSETS: &str = "inject_assets";

/// Directory inside the output root that holds static assets.
pub const STATIC_DIR: &str = "_static";

/// Errors in the asset configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("Invalid asset name: {0:?}")]
    InvalidName(String),
}

/// Adds stylesheet and script references to pages.
#[derive(Debug)]
pub struct AssetInjector {
    book: BookMeta,
    css_files: Vec<String>,
    js_files: Vec<String>,
    templates: TemplateEngine,
}

impl AssetInjector {
    /// Create an injector for the given stylesheets and scripts.
    ///
    /// Names are relative to the static directory unless they are absolute URLs.
    pub fn new(
        book: BookMeta,
        css_files: Vec<String>,
        js_files: Vec<String>,
        templates: TemplateEngine,
    ) -> Result<Self, AssetError> {
        for name in css_files.iter().chain(&js_files) {
            validate_name(name)?;
        }

        Ok(Self {
            book,
            css_files,
            js_files,
            templates,
        })
    }

    /// True when there is nothing to inject.
    pub fn is_empty(&self) -> bool {
        self.css_files.is_empty() && self.js_files.is_empty()
    }

    /// URL of an asset as seen from a page.
    pub fn asset_url(name: &str, page: &PageContext) -> String {
        if name.contains("://") || name.starts_with("//") {
            name.to_string()
        } else {
            format!("{}{}/{}", page.root_prefix(), STATIC_DIR, name)
        }
    }

    /// Inject missing references into one page.
    pub fn inject(&self, html: &str, page: &PageContext) -> Result<Transformed, TransformError> {
        let existing = existing_refs(html)?;

        let styles: Vec<String> = self
            .css_files
            .iter()
            .map(|name| Self::asset_url(name, page))
            .filter(|url| !existing.contains(strip_query(url)))
            .collect();

        let scripts: Vec<String> = self
            .js_files
            .iter()
            .map(|name| Self::asset_url(name, page))
            .filter(|url| !existing.contains(strip_query(url)))
            .collect();

        if styles.is_empty() && scripts.is_empty() {
            return Ok(Transformed::unchanged(html));
        }

        let ctx = AssetContext {
            book: self.book.clone(),
            styles,
            scripts,
        };

        let head_snippet = self.render_snippet(HEAD_TEMPLATE_NAME, !ctx.styles.is_empty(), &ctx)?;
        let body_snippet = self.render_snippet(BODY_TEMPLATE_NAME, !ctx.scripts.is_empty(), &ctx)?;

        let head_done = Cell::new(false);
        let body_done = Cell::new(false);

        let output = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("head", |el| {
                        if let Some(snippet) = &head_snippet {
                            if !head_done.get() {
                                el.append(snippet, ContentType::Html);
                                head_done.set(true);
                            }
                        }
                        Ok(())
                    }),
                    element!("body", |el| {
                        if let Some(snippet) = &body_snippet {
                            if !body_done.get() {
                                el.append(snippet, ContentType::Html);
                                body_done.set(true);
                            }
                        }
                        Ok(())
                    }),
                ],
                strict: true,
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| TransformError::ParseError(e.to_string()))?;

        let mut changes = 0;
        if head_done.get() {
            changes += ctx.styles.len();
        } else if head_snippet.is_some() {
            tracing::warn!(
                "No <head> to add {} stylesheets to: {}",
                ctx.styles.len(),
                page.path().display()
            );
        }
        if body_done.get() {
            changes += ctx.scripts.len();
        } else if body_snippet.is_some() {
            tracing::warn!(
                "No <body> to add {} scripts to: {}",
                ctx.scripts.len(),
                page.path().display()
            );
        }

        if changes == 0 {
            return Ok(Transformed::unchanged(html));
        }

        Ok(Transformed {
            html: output,
            changes,
        })
    }

    fn render_snippet(
        &self,
        template: &str,
        needed: bool,
        ctx: &AssetContext,
    ) -> Result<Option<String>, TransformError> {
        if !needed {
            return Ok(None);
        }

        self.templates
            .render(template, ctx)
            .map(Some)
            .map_err(|e| TransformError::TemplateError(e.to_string()))
    }
}

impl PageTransform for AssetInjector {
    fn name(&self) -> &'static str {
        INJECT_ASSETS
    }

    fn apply(&self, html: &str, page: &PageContext) -> Result<Transformed, TransformError> {
        self.inject(html, page)
    }
}

/// URL without its `?query` or `#fragment`.
///
/// The generator links assets as `_static/custom.css?v=<hash>`, which must count
/// as the same reference as `_static/custom.css`.
fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Collect stylesheet and script paths a page already references.
fn existing_refs(html: &str) -> Result<HashSet<String>, TransformError> {
    let refs = RefCell::new(HashSet::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("link[href]", |el| {
                    if let Some(href) = el.get_attribute("href") {
                        refs.borrow_mut().insert(strip_query(&href).to_string());
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        refs.borrow_mut().insert(strip_query(&src).to_string());
                    }
                    Ok(())
                }),
            ],
            strict: true,
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| TransformError::ParseError(e.to_string()))?;

    Ok(refs.into_inner())
}

fn validate_name(name: &str) -> Result<(), AssetError> {
    let bad = name.is_empty()
        || (name.starts_with('/') && !name.starts_with("//"))
        || name.split('/').any(|part| part == "..")
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '\\'));

    if bad {
        return Err(AssetError::InvalidName(name.to_string()));
    }
    Ok(())
}
