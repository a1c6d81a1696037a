//! Model registry: named lookup of generation capabilities.
//!
//! The registry is a plain name-to-handle map, separately namespaced for
//! text and image models. It never constructs or tears down the backends it
//! is handed; building a heavyweight client is the caller's job.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::adapters::{ImageBackend, TextBackend};

/// Which namespace a model lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Text,
    Image,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Text => write!(f, "text"),
            ModelKind::Image => write!(f, "image"),
        }
    }
}

/// Lookup failure: nothing registered under the requested name.
///
/// Fatal for the requesting run; there is no fallback to a default model.
#[derive(Debug, Error)]
#[error("no {kind} model registered under '{name}'")]
pub struct RegistryError {
    pub kind: ModelKind,
    pub name: String,
}

/// Registry of named generation backends.
///
/// Re-registering a name replaces the stored handle (last write wins). Runs
/// capture `Arc` clones of the handles they resolve at start, so a later
/// replacement never changes an in-flight run's behavior.
#[derive(Default)]
pub struct ModelRegistry {
    text: RwLock<HashMap<String, Arc<dyn TextBackend>>>,
    image: RwLock<HashMap<String, Arc<dyn ImageBackend>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a text model handle under `name`.
    pub fn register_text(&self, name: impl Into<String>, handle: Arc<dyn TextBackend>) {
        self.text
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handle);
    }

    /// Store an image model handle under `name`.
    pub fn register_image(&self, name: impl Into<String>, handle: Arc<dyn ImageBackend>) {
        self.image
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handle);
    }

    /// Resolve a text model by name.
    pub fn text(&self, name: &str) -> Result<Arc<dyn TextBackend>, RegistryError> {
        self.text
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError {
                kind: ModelKind::Text,
                name: name.to_string(),
            })
    }

    /// Resolve an image model by name.
    pub fn image(&self, name: &str) -> Result<Arc<dyn ImageBackend>, RegistryError> {
        self.image
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError {
                kind: ModelKind::Image,
                name: name.to_string(),
            })
    }

}
