//! Rewrite alert blocks in a single page.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coursebook_html::{decode_page, AlertRewriter};

use crate::config::load_config;

/// Run the rewrite command.
///
/// Reads from `input` or stdin and writes to `output` or stdout. Only the alert
/// rules from the config are applied.
pub async fn run(config_path: &Path, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let rewriter = AlertRewriter::new(config.alerts).context("Invalid alert rules")?;

    let bytes = match &input {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let source = input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    let html = decode_page(&bytes).with_context(|| format!("Failed to rewrite {}", source))?;
    let result = rewriter
        .rewrite(html)
        .with_context(|| format!("Failed to rewrite {}", source))?;

    match output {
        Some(path) => {
            fs::write(&path, &result.html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            io::stdout()
                .write_all(result.html.as_bytes())
                .context("Failed to write stdout")?;
        }
    }

    tracing::info!("Rewrote {} alert blocks in {}", result.changes, source);

    Ok(())
}
