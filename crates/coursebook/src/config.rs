//! Book configuration file (`book.toml`, or `_config.yml` in either the flat
//! layout or the Jupyter Book layout).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coursebook_html::{BookMeta, RewriteRule, REPLACE_ALERTS};
use coursebook_static::BuildConfig;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Configuration file structure.
///
/// Keys mirror the generator's own settings so the same values can be shared
/// between both tools. Relative paths are resolved against the directory that
/// holds the file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub release: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub templates_path: Option<String>,
    #[serde(default = "default_theme")]
    pub html_theme: String,
    #[serde(default = "default_static_path")]
    pub html_static_path: Vec<String>,
    #[serde(default = "default_css_files")]
    pub html_css_files: Vec<String>,
    #[serde(default = "default_js_files")]
    pub html_js_files: Vec<String>,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default = "default_alerts")]
    pub alerts: Vec<RewriteRule>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct BuildSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub minify: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            minify: false,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            project: default_project(),
            author: String::new(),
            release: String::new(),
            extensions: default_extensions(),
            templates_path: None,
            html_theme: default_theme(),
            html_static_path: default_static_path(),
            html_css_files: default_css_files(),
            html_js_files: default_js_files(),
            build: BuildSettings::default(),
            alerts: default_alerts(),
        }
    }
}

fn default_project() -> String {
    "Course Book".to_string()
}
fn default_extensions() -> Vec<String> {
    vec![REPLACE_ALERTS.to_string()]
}
fn default_theme() -> String {
    "sphinx_book_theme".to_string()
}
fn default_static_path() -> Vec<String> {
    vec!["_static".to_string()]
}
fn default_css_files() -> Vec<String> {
    vec!["custom.css".to_string()]
}
fn default_js_files() -> Vec<String> {
    vec!["custom.js".to_string()]
}
fn default_output_dir() -> String {
    "_build/html".to_string()
}
fn default_alerts() -> Vec<RewriteRule> {
    vec![RewriteRule::exercise_block()]
}

impl ConfigFile {
    /// Parse configuration text, choosing the format from the file extension.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = if ext == "yml" || ext == "yaml" {
            Self::from_yaml(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        Ok(config)
    }

    /// Parse YAML in either the flat layout or the Jupyter Book layout.
    ///
    /// A Jupyter Book `_config.yml` keeps generator settings under
    /// `sphinx.config` and names the book with `title`. Those are lifted to
    /// the top level; `sphinx.config` wins over top-level keys of the same name.
    fn from_yaml(content: &str) -> serde_yaml::Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;

        let value = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) if is_jupyter_book(&map) => {
                tracing::debug!("Reading Jupyter Book config layout");
                Value::Mapping(flatten_jupyter_book(map))
            }
            other => other,
        };

        serde_yaml::from_value(value)
    }

    /// Freeze into the record handed to the site processor.
    pub fn into_build_config(self, base: &Path) -> BuildConfig {
        BuildConfig {
            output_dir: base.join(&self.build.output_dir),
            static_paths: self
                .html_static_path
                .iter()
                .map(|p| base.join(p))
                .collect(),
            css_files: self.html_css_files,
            js_files: self.html_js_files,
            extensions: self.extensions,
            templates_path: self.templates_path.map(|p| base.join(p)),
            alert_rules: self.alerts,
            book: BookMeta {
                project: self.project,
                author: self.author,
                release: self.release,
                theme: self.html_theme,
            },
            minify: self.build.minify,
        }
    }
}

fn is_jupyter_book(map: &Mapping) -> bool {
    map.contains_key("sphinx") || map.contains_key("title")
}

fn flatten_jupyter_book(mut book: Mapping) -> Mapping {
    let mut flat = match book.remove("sphinx") {
        Some(Value::Mapping(mut sphinx)) => match sphinx.remove("config") {
            Some(Value::Mapping(config)) => config,
            _ => Mapping::new(),
        },
        _ => Mapping::new(),
    };

    for (key, value) in book {
        let key = if key.as_str() == Some("title") {
            Value::String("project".to_string())
        } else {
            key
        };

        if !flat.contains_key(&key) {
            flat.insert(key, value);
        }
    }

    flat
}

/// Load configuration if the file exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = ConfigFile::parse(&content, path)?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    tracing::debug!("No config at {}, using defaults", path.display());
    Ok(ConfigFile::default())
}

/// Directory that relative paths in the config resolve against.
pub fn config_base(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn parses_toml_config() {
        let source = r#"
project = "Machine Learning"
author = "Course Staff"
release = "2024.1"
html_css_files = ["custom.css", "https://cdn.example.com/katex.css"]

[build]
output_dir = "public"
minify = true

[[alerts]]
require = ["alert", "alert-warning"]
remove = ["alert-block"]
replacement = "exercise-block"

[[alerts]]
element = "*"
require = ["alert-success"]
replacement = "solution-block"
"#;

        let config = ConfigFile::parse(source, Path::new("book.toml")).unwrap();

        assert_eq!(config.project, "Machine Learning");
        assert_eq!(config.html_js_files, vec!["custom.js".to_string()]);
        assert_eq!(config.build.output_dir, "public");
        assert!(config.build.minify);
        assert_eq!(config.alerts.len(), 2);
        assert_eq!(config.alerts[0], RewriteRule::exercise_block());
        assert_eq!(config.alerts[1].element, "*");
        assert!(config.alerts[1].remove.is_empty());
    }

    #[test]
    fn parses_yaml_config() {
        let source = r#"
project: Machine Learning
extensions:
  - replace_alerts
html_static_path:
  - _static
  - extra
"#;

        let config = ConfigFile::parse(source, Path::new("_config.yml")).unwrap();

        assert_eq!(config.project, "Machine Learning");
        assert_eq!(config.html_static_path, vec!["_static", "extra"]);
        assert_eq!(config.alerts, vec![RewriteRule::exercise_block()]);
    }

    #[test]
    fn parses_jupyter_book_config() {
        let source = r#"
title: Machine Learning
author: Course Staff
logo: logo.png
execute:
  execute_notebooks: "off"
sphinx:
  extra_extensions:
    - sphinx_inline_tabs
  config:
    author: ML Course Staff
    html_static_path:
      - _static
      - extra
    html_js_files: []
build:
  output_dir: _build/site
"#;

        let config = ConfigFile::parse(source, Path::new("_config.yml")).unwrap();

        assert_eq!(config.project, "Machine Learning");
        assert_eq!(config.author, "ML Course Staff");
        assert_eq!(config.html_static_path, vec!["_static", "extra"]);
        assert!(config.html_js_files.is_empty());
        assert_eq!(config.html_css_files, vec!["custom.css".to_string()]);
        assert_eq!(config.extensions, vec![REPLACE_ALERTS.to_string()]);
        assert_eq!(config.build.output_dir, "_build/site");
    }

    #[test]
    fn jupyter_book_without_sphinx_section() {
        let config =
            ConfigFile::parse("title: Machine Learning\n", Path::new("_config.yml")).unwrap();

        assert_eq!(config.project, "Machine Learning");
        assert_eq!(config.html_static_path, vec!["_static"]);
    }

    #[test]
    fn empty_yaml_equals_defaults() {
        let config = ConfigFile::parse("", Path::new("_config.yml")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn empty_file_equals_defaults() {
        let config = ConfigFile::parse("", Path::new("book.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let result = ConfigFile::parse("extensions = \"not a list\"", Path::new("book.toml"));

        assert!(result.is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();

        let config = load_config(&temp.path().join("book.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn resolves_paths_against_config_dir() {
        let config = ConfigFile {
            templates_path: Some("_templates".to_string()),
            ..ConfigFile::default()
        };

        let build = config.into_build_config(Path::new("book"));

        assert_eq!(build.output_dir, PathBuf::from("book/_build/html"));
        assert_eq!(build.static_paths, vec![PathBuf::from("book/_static")]);
        assert_eq!(build.templates_path, Some(PathBuf::from("book/_templates")));
        assert_eq!(build.book.theme, "sphinx_book_theme");
    }

    #[test]
    fn config_base_of_bare_file_is_cwd() {
        assert_eq!(config_base(Path::new("book.toml")), PathBuf::from("."));
        assert_eq!(config_base(Path::new("site/book.toml")), PathBuf::from("site"));
    }
}
