//! Post-processor for generated course book sites.
//!
//! Takes the HTML tree written by the documentation generator, copies the book's
//! static assets into it and runs the page transforms over every page.

pub mod assets;
pub mod builder;

pub use assets::AssetPipeline;
pub use builder::{BuildConfig, BuildError, BuildResult, SiteProcessor};
