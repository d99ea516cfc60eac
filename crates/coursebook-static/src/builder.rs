//! Site post-processor.
//!
//! Runs over an HTML tree already produced by the documentation generator:
//! copies the static assets into `_static/`, then applies the transform pipeline
//! to every page and writes back the pages that changed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use coursebook_html::{
    decode_page, AlertRewriter, AssetInjector, BookMeta, PageContext, Pipeline, RewriteRule,
    TemplateEngine, TransformError, TransformRegistry, REPLACE_ALERTS, STATIC_DIR,
};

use crate::assets::AssetPipeline;

/// Configuration for post-processing a built site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Generated HTML tree to process in place
    pub output_dir: PathBuf,

    /// Directories whose files are copied into `_static/`
    pub static_paths: Vec<PathBuf>,

    /// Stylesheets referenced from every page
    pub css_files: Vec<String>,

    /// Scripts referenced from every page
    pub js_files: Vec<String>,

    /// Transform names to run, in order
    pub extensions: Vec<String>,

    /// Directory with template overrides
    pub templates_path: Option<PathBuf>,

    /// Alert class rewrite rules
    pub alert_rules: Vec<RewriteRule>,

    /// Book metadata
    pub book: BookMeta,

    /// Minify copied CSS
    pub minify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("_build/html"),
            static_paths: vec![PathBuf::from("_static")],
            css_files: vec!["custom.css".to_string()],
            js_files: vec!["custom.js".to_string()],
            extensions: vec![REPLACE_ALERTS.to_string()],
            templates_path: None,
            alert_rules: vec![RewriteRule::exercise_block()],
            book: BookMeta::default(),
            minify: false,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages seen
    pub pages: usize,

    /// Number of pages rewritten on disk
    pub changed: usize,

    /// Number of elements and references changed across all pages
    pub changes: usize,

    /// Number of static files copied
    pub assets: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to read: {0}")]
    ReadError(String),

    #[error("Failed to transform page: {path}")]
    TransformError {
        path: String,
        #[source]
        source: TransformError,
    },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// Outcome for one page.
#[derive(Debug, Clone, Copy, Default)]
struct PageOutcome {
    changed: bool,
    changes: usize,
}

/// Static site post-processor.
pub struct SiteProcessor {
    config: BuildConfig,
    pipeline: Pipeline,
    assets: AssetPipeline,
}

impl SiteProcessor {
    /// Create a processor, resolving extensions and validating rules.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        let rewriter = AlertRewriter::new(config.alert_rules.clone())
            .map_err(|e| BuildError::ConfigError(e.to_string()))?;

        let mut registry = TransformRegistry::new();
        registry.register(rewriter);

        let mut pipeline = registry
            .pipeline(&config.extensions)
            .map_err(|e| BuildError::ConfigError(e.to_string()))?;

        let templates = TemplateEngine::new(config.templates_path.as_deref())
            .map_err(|e| BuildError::ConfigError(format!("templates: {}", e)))?;

        let injector = AssetInjector::new(
            config.book.clone(),
            config.css_files.clone(),
            config.js_files.clone(),
            templates,
        )
        .map_err(|e| BuildError::ConfigError(e.to_string()))?;

        if !injector.is_empty() {
            pipeline.push(injector);
        }

        tracing::debug!("Page pipeline: {:?}", pipeline.names());

        Ok(Self {
            assets: AssetPipeline::new(config.minify),
            config,
            pipeline,
        })
    }

    /// Post-process the site.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        if !self.config.output_dir.is_dir() {
            return Err(BuildError::ReadError(format!(
                "Output directory not found: {}",
                self.config.output_dir.display()
            )));
        }

        // Copy assets first so every page references files that exist
        let static_dest = self.config.output_dir.join(STATIC_DIR);
        let assets = self
            .assets
            .copy_static(&self.config.static_paths, &static_dest)?;

        let referenced: Vec<String> = self
            .config
            .css_files
            .iter()
            .chain(&self.config.js_files)
            .cloned()
            .collect();
        AssetPipeline::check_referenced(&static_dest, &referenced);

        let pages = self.discover_pages()?;

        // Pages are independent, transform them in parallel
        let results: Vec<Result<PageOutcome, BuildError>> = pages
            .par_iter()
            .map(|page| self.process_page(page))
            .collect();

        let mut changed = 0;
        let mut changes = 0;

        for result in results {
            let outcome = result?;
            if outcome.changed {
                changed += 1;
            }
            changes += outcome.changes;
        }

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: pages.len(),
            changed,
            changes,
            assets,
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Find all HTML pages, relative to the output directory.
    fn discover_pages(&self) -> Result<Vec<PathBuf>, BuildError> {
        let root = &self.config.output_dir;
        let mut pages = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == STATIC_DIR));

        for entry in walker {
            let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext != "html" && ext != "htm" {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            pages.push(relative);
        }

        pages.sort();
        Ok(pages)
    }

    /// Transform a single page, writing it back only if it changed.
    fn process_page(&self, relative: &Path) -> Result<PageOutcome, BuildError> {
        let path = self.config.output_dir.join(relative);

        let bytes = fs::read(&path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

        let transform_error = |source: TransformError| BuildError::TransformError {
            path: path.display().to_string(),
            source,
        };

        let html = decode_page(&bytes).map_err(transform_error)?;

        let result = self
            .pipeline
            .apply(html, &PageContext::new(relative))
            .map_err(transform_error)?;

        if result.html == html {
            return Ok(PageOutcome::default());
        }

        fs::write(&path, &result.html).map_err(|e| BuildError::WriteError(e.to_string()))?;

        tracing::debug!("Updated {} ({} changes)", relative.display(), result.changes);

        Ok(PageOutcome {
            changed: true,
            changes: result.changes,
        })
    }
}
