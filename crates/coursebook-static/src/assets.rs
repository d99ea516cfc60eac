//! Asset pipeline for the book's static files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::BuildError;

/// Asset pipeline utilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetPipeline {
    minify: bool,
}

impl AssetPipeline {
    /// Create a pipeline, optionally minifying stylesheets on copy.
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }

    /// Default stylesheet written by `init`.
    pub fn default_css() -> &'static str {
        DEFAULT_CSS
    }

    /// Default script written by `init`.
    pub fn default_js() -> &'static str {
        DEFAULT_JS
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Copy every file from the static directories into `dest`.
    ///
    /// Layout is preserved. When two directories hold the same relative path the
    /// later directory wins. Returns the number of distinct files written.
    pub fn copy_static(&self, static_paths: &[PathBuf], dest: &Path) -> Result<usize, BuildError> {
        let mut written: HashSet<PathBuf> = HashSet::new();

        for static_dir in static_paths {
            if !static_dir.is_dir() {
                tracing::warn!("Static directory not found: {}", static_dir.display());
                continue;
            }

            for entry in WalkDir::new(static_dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();

                if !path.is_file() {
                    continue;
                }

                let relative = path.strip_prefix(static_dir).unwrap_or(path);
                let target = dest.join(relative);

                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| BuildError::WriteError(e.to_string()))?;
                }

                self.copy_file(path, &target)?;
                written.insert(relative.to_path_buf());
            }

            tracing::debug!("Copied static files from {}", static_dir.display());
        }

        Ok(written.len())
    }

    /// Warn about configured assets that did not end up in `dest`.
    ///
    /// Returns the names that are missing.
    pub fn check_referenced(dest: &Path, names: &[String]) -> Vec<String> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !name.contains("://") && !name.starts_with("//"))
            .filter(|name| !dest.join(name.as_str()).is_file())
            .cloned()
            .collect();

        for name in &missing {
            tracing::warn!("Referenced asset not found in static paths: {}", name);
        }

        missing
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<(), BuildError> {
        let is_css = source.extension().and_then(|e| e.to_str()) == Some("css");

        if self.minify && is_css {
            let css = fs::read_to_string(source).map_err(|e| {
                BuildError::ReadError(format!("{}: {}", source.display(), e))
            })?;
            let css = match Self::minify_css(&css) {
                Ok(minified) => minified,
                Err(e) => {
                    tracing::warn!("Copying {} unminified: {}", source.display(), e);
                    css
                }
            };
            fs::write(target, css).map_err(|e| BuildError::WriteError(e.to_string()))?;
        } else {
            fs::copy(source, target).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        Ok(())
    }
}

const DEFAULT_CSS: &str = r#"/* Exercise blocks rewritten from notebook warning alerts */

.exercise-block {
  margin: 1.5rem 0;
  padding: 1rem 1.25rem;
  border-left: 4px solid #2e7d32;
  border-radius: 0.375rem;
  background: #f1f8e9;
  color: inherit;
}

.exercise-block > :first-child {
  margin-top: 0;
}

.exercise-block > :last-child {
  margin-bottom: 0;
}

.exercise-block::before {
  content: "Exercise";
  display: block;
  margin-bottom: 0.5rem;
  font-weight: 600;
  text-transform: uppercase;
  letter-spacing: 0.05em;
  font-size: 0.75rem;
  color: #2e7d32;
}

html[data-theme="dark"] .exercise-block {
  background: rgba(46, 125, 50, 0.15);
}
"#;

const DEFAULT_JS: &str = r#"// Fallback for pages that were not post-processed.
document.addEventListener("DOMContentLoaded", function () {
  document.querySelectorAll("div.alert.alert-warning").forEach(function (el) {
    el.classList.remove("alert", "alert-block", "alert-warning");
    el.classList.add("exercise-block");
  });
});
"#;
