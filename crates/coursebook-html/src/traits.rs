//! Trait definitions for page transforms.

use std::path::{Path, PathBuf};

/// Where a page lives in the output tree.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Page path relative to the output root (e.g. "chapters/intro.html")
    pub relative_path: PathBuf,
}

impl PageContext {
    /// Create a context for a page at the given relative path.
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }

    /// Prefix that leads from this page back to the output root.
    ///
    /// `index.html` gives `""`, `a/b/page.html` gives `"../../"`.
    pub fn root_prefix(&self) -> String {
        let depth = self
            .relative_path
            .parent()
            .map(|p| p.components().count())
            .unwrap_or(0);
        "../".repeat(depth)
    }

    /// Relative path as given.
    pub fn path(&self) -> &Path {
        &self.relative_path
    }
}

/// Result of running a transform over one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// Rewritten page HTML
    pub html: String,

    /// Number of elements or references the transform changed
    pub changes: usize,
}

impl Transformed {
    /// Page passed through untouched.
    pub fn unchanged(html: &str) -> Self {
        Self {
            html: html.to_string(),
            changes: 0,
        }
    }
}

/// Errors that can occur while transforming a page.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Page is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),
}

/// A transform applied to every generated page.
///
/// Implementations are registered under a name and selected through the
/// `extensions` setting.
pub trait PageTransform: Send + Sync {
    /// Extension identifier (e.g., "replace_alerts")
    fn name(&self) -> &'static str;

    /// Transform one page.
    ///
    /// # Arguments
    /// * `html` - The full page HTML
    /// * `page` - Location of the page in the output tree
    fn apply(&self, html: &str, page: &PageContext) -> Result<Transformed, TransformError>;
}

/// Interpret raw page bytes as HTML text.
pub fn decode_page(bytes: &[u8]) -> Result<&str, TransformError> {
    std::str::from_utf8(bytes).map_err(|e| TransformError::InvalidEncoding(e.to_string()))
}
