//! Preview server for the post-processed book.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::{config_base, load_config};

/// Run the serve command.
///
/// Without `--dir` the book's configured `[build] output_dir` is served.
pub async fn run(
    config_path: &Path,
    port: u16,
    dir: Option<PathBuf>,
    open_browser: bool,
) -> Result<()> {
    let dir = resolve_dir(config_path, dir)?;

    if !dir.is_dir() {
        anyhow::bail!(
            "Directory not found: {}. Build the book and run 'coursebook build' first.",
            dir.display()
        );
    }
    if !dir.join("index.html").is_file() {
        tracing::warn!("No index.html in {}", dir.display());
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let url = format!("http://{}", addr);
    tracing::info!("Serving {} at {}", dir.display(), url);

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }

    let app = Router::new().fallback_service(ServeDir::new(&dir));
    axum::serve(listener, app).await?;

    Ok(())
}

/// Directory to serve: the explicit one, or the configured output tree.
fn resolve_dir(config_path: &Path, dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => {
            let config = load_config(config_path)?;
            Ok(config.into_build_config(&config_base(config_path)).output_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_to_configured_output_dir() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("book.toml");
        fs::write(&config_path, "[build]\noutput_dir = \"public\"\n").unwrap();

        let dir = resolve_dir(&config_path, None).unwrap();

        assert_eq!(dir, temp.path().join("public"));
    }

    #[test]
    fn defaults_without_config_file() {
        let temp = tempdir().unwrap();

        let dir = resolve_dir(&temp.path().join("book.toml"), None).unwrap();

        assert_eq!(dir, temp.path().join("_build/html"));
    }

    #[test]
    fn explicit_dir_wins() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("book.toml");
        fs::write(&config_path, "[build]\noutput_dir = \"public\"\n").unwrap();

        let dir = resolve_dir(&config_path, Some(PathBuf::from("site"))).unwrap();

        assert_eq!(dir, PathBuf::from("site"));
    }

    #[tokio::test]
    async fn missing_dir_is_an_error() {
        let temp = tempdir().unwrap();

        let err = run(
            &temp.path().join("book.toml"),
            0,
            Some(temp.path().join("nope")),
            false,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Directory not found"));
    }
}
