//! Registry of page transforms addressable by extension name.
//!
//! The `extensions` setting lists transform names in the order they should run.
//! The registry resolves that list into a [`Pipeline`] before any page is touched,
//! so an unknown name fails the build up front.

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::{PageContext, PageTransform, TransformError, Transformed};

/// Errors that can occur when resolving extensions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown extension: {name} (available: {available})")]
    UnknownExtension { name: String, available: String },
}

/// A registry of available page transforms.
#[derive(Default)]
pub struct TransformRegistry {
    transforms: HashMap<&'static str, Arc<dyn PageTransform>>,
}

impl TransformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under its own name, replacing any previous one.
    pub fn register(&mut self, transform: impl PageTransform + 'static) {
        let name = transform.name();
        if self.transforms.insert(name, Arc::new(transform)).is_some() {
            tracing::debug!("Replaced transform {}", name);
        }
    }

    /// Check if a transform exists.
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Get all registered transform names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.transforms.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Resolve extension names into a pipeline, keeping their order.
    ///
    /// A name listed twice runs once, at its first position.
    pub fn pipeline(&self, extensions: &[String]) -> Result<Pipeline, RegistryError> {
        let mut stages: Vec<Arc<dyn PageTransform>> = Vec::new();

        for name in extensions {
            let Some(transform) = self.transforms.get(name.as_str()) else {
                return Err(RegistryError::UnknownExtension {
                    name: name.clone(),
                    available: self.names().join(", "),
                });
            };

            if stages.iter().any(|s| s.name() == transform.name()) {
                continue;
            }
            stages.push(Arc::clone(transform));
        }

        Ok(Pipeline { stages })
    }
}

/// Ordered transforms applied to each page.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn PageTransform>>,
}

impl Pipeline {
    /// Append a stage that always runs after the resolved extensions.
    pub fn push(&mut self, transform: impl PageTransform + 'static) {
        self.stages.push(Arc::new(transform));
    }

    /// Names of the stages in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Whether there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over a page.
    ///
    /// The first failing stage aborts the page; nothing partial is returned.
    pub fn apply(&self, html: &str, page: &PageContext) -> Result<Transformed, TransformError> {
        let mut current = Transformed::unchanged(html);

        for stage in &self.stages {
            let next = stage.apply(&current.html, page)?;
            current = Transformed {
                html: next.html,
                changes: current.changes + next.changes,
            };
        }

        Ok(current)
    }
}
