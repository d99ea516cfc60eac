//! Page transforms for course book HTML.
//!
//! This crate holds the per-page logic run over a generated site: normalizing
//! notebook warning alerts into exercise blocks, and injecting references to the
//! book's custom stylesheets and scripts. Transforms share the [`PageTransform`]
//! trait and are selected by name through a [`TransformRegistry`].

pub mod alerts;
pub mod inject;
pub mod registry;
pub mod templates;
pub mod traits;

pub use alerts::{rewrite_alerts, AlertRewriter, RewriteRule, RuleError, REPLACE_ALERTS};
pub use inject::{AssetError, AssetInjector, INJECT_ASSETS, STATIC_DIR};
pub use registry::{Pipeline, RegistryError, TransformRegistry};
pub use templates::{AssetContext, BookMeta, TemplateEngine};
pub use traits::{decode_page, PageContext, PageTransform, TransformError, Transformed};
