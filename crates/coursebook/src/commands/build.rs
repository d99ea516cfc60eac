//! Site post-processing command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use coursebook_static::SiteProcessor;

use crate::config::{config_base, load_config};

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Post-processing site...");

    let file_config = load_config(config_path)?;
    let mut config = file_config.into_build_config(&config_base(config_path));

    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(minify) = minify {
        config.minify = minify;
    }

    let result = SiteProcessor::new(config)?.build().await?;

    tracing::info!(
        "Processed {} pages ({} updated, {} changes), copied {} assets in {}ms",
        result.pages,
        result.changed,
        result.changes,
        result.assets,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn uses_config_relative_paths() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("public");
        fs::create_dir_all(&out).unwrap();
        fs::create_dir_all(temp.path().join("_static")).unwrap();
        fs::write(temp.path().join("_static/custom.css"), ".exercise-block {}").unwrap();
        fs::write(
            out.join("index.html"),
            r#"<html><head></head><body><div class="alert alert-warning">Try it</div></body></html>"#,
        )
        .unwrap();
        let config_path = temp.path().join("book.toml");
        fs::write(
            &config_path,
            "html_js_files = []\n\n[build]\noutput_dir = \"public\"\n",
        )
        .unwrap();

        run(&config_path, None, None).await.unwrap();

        let html = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.contains(r#"<div class="exercise-block">Try it</div>"#));
        assert!(html.contains(r#"href="_static/custom.css""#));
        assert!(!html.contains("custom.js"));
        assert!(out.join("_static/custom.css").is_file());
    }

    #[tokio::test]
    async fn output_flag_overrides_config() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("book.toml");

        let err = run(&config_path, Some(temp.path().join("elsewhere")), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("elsewhere"));
    }
}
