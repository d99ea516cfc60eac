//! Template engine for rendering asset reference snippets.

use std::path::Path;

use minijinja::{context, path_loader, AutoEscape, Environment};

/// Template rendered at the end of `<head>`.
pub const HEAD_TEMPLATE_NAME: &str = "head_assets.html";

/// Template rendered at the end of `<body>`.
pub const BODY_TEMPLATE_NAME: &str = "body_assets.html";

/// Book metadata exposed to templates.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BookMeta {
    /// Project title
    pub project: String,
    /// Author line
    pub author: String,
    /// Release string
    pub release: String,
    /// Theme name of the generator
    pub theme: String,
}

/// Context for rendering an asset snippet.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AssetContext {
    /// Book metadata
    pub book: BookMeta,
    /// Stylesheet URLs to reference
    pub styles: Vec<String>,
    /// Script URLs to reference
    pub scripts: Vec<String>,
}

/// Template engine using minijinja.
///
/// Built-in snippets can be overridden by files of the same name in a templates
/// directory.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a template engine, preferring templates found in `templates_dir`.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();

        // Asset URLs are validated upstream and must be emitted verbatim.
        env.set_auto_escape_callback(|_| AutoEscape::None);

        let builtins = [
            (HEAD_TEMPLATE_NAME, HEAD_TEMPLATE),
            (BODY_TEMPLATE_NAME, BODY_TEMPLATE),
        ];

        match templates_dir {
            Some(dir) => {
                env.set_loader(path_loader(dir.to_path_buf()));
                for (name, source) in builtins {
                    if dir.join(name).is_file() {
                        tracing::info!("Using template override {}", dir.join(name).display());
                    } else {
                        env.add_template_owned(name.to_string(), source.to_string())?;
                    }
                }
            }
            None => {
                for (name, source) in builtins {
                    env.add_template_owned(name.to_string(), source.to_string())?;
                }
            }
        }

        Ok(Self { env })
    }

    /// Render a snippet using the specified template.
    pub fn render(&self, template: &str, ctx: &AssetContext) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context! {
            project => &ctx.book.project,
            author => &ctx.book.author,
            release => &ctx.book.release,
            theme => &ctx.book.theme,
            styles => &ctx.styles,
            scripts => &ctx.scripts,
        })
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

const HEAD_TEMPLATE: &str = r##"{% for href in styles %}
    <link rel="stylesheet" type="text/css" href="{{ href }}" />{% endfor %}
"##;

const BODY_TEMPLATE: &str = r##"{% for src in scripts %}
    <script src="{{ src }}"></script>{% endfor %}
"##;
