//! Initialize book configuration and static assets.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use coursebook_static::AssetPipeline;

use crate::config::config_base;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing coursebook...");

    let base = config_base(config_path);
    let static_dir = base.join("_static");

    if !static_dir.exists() {
        fs::create_dir_all(&static_dir).context("Failed to create _static directory")?;
    }

    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (static_dir.join("custom.css"), AssetPipeline::default_css()),
        (static_dir.join("custom.js"), AssetPipeline::default_js()),
    ];

    for (path, content) in files {
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
            continue;
        }
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Build the book, then run 'coursebook build' to post-process it.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Course book configuration

project = "Machine Learning Course"
author = "Course Staff"
release = "1.0"

# Page transforms to run, in order
extensions = ["replace_alerts"]

html_theme = "sphinx_book_theme"

# Directories copied into _static/ of the built site
html_static_path = ["_static"]

# Referenced from every page
html_css_files = ["custom.css"]
html_js_files = ["custom.js"]

# Directory with head_assets.html / body_assets.html overrides
# templates_path = "_templates"

[build]
# Generated HTML, processed in place
output_dir = "_build/html"
minify = false

# Notebook warning alerts become exercise blocks
[[alerts]]
element = "div"
require = ["alert", "alert-warning"]
remove = ["alert-block"]
replacement = "exercise-block"
"#;
