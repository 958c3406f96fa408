//! Host session — one process lifetime.
//!
//! A session owns a fresh [`Namespace`] and a [`Loader`] bound to it. Two
//! sessions share nothing, so success or failure in one never affects the
//! other.

use crate::artifact::Value;
use crate::bridge::{GlobalBridge, Namespace};
use crate::config::LoaderConfig;
use crate::error::{EvalError, LoadFailure};
use crate::loader::{LoadState, Loader};
use crate::source::ArtifactSource;

/// One host process: its namespace plus the loader that may populate it.
#[derive(Debug)]
pub struct HostSession {
    global_name: String,
    namespace: Namespace,
    loader: Loader,
}

impl HostSession {
    /// Create a session binding under `config.global_name`.
    pub fn new(config: &LoaderConfig) -> Self {
        Self::with_global_name(config.global_name.clone())
    }

    /// Create a session binding under `global_name`.
    pub fn with_global_name(global_name: impl Into<String>) -> Self {
        let global_name = global_name.into();
        let namespace = Namespace::new();
        let loader = Loader::new(GlobalBridge::new(namespace.clone(), global_name.clone()));
        HostSession {
            global_name,
            namespace,
            loader,
        }
    }

    /// Run the load sequence against `source`.
    pub async fn boot(&mut self, source: &dyn ArtifactSource) -> LoadState {
        self.loader.run(source).await
    }

    /// Evaluate through the bound entry point.
    ///
    /// Before a successful boot this fails with
    /// [`EvalError::UndefinedReference`].
    pub fn evaluate(&self, expression: &str) -> Result<Value, EvalError> {
        self.namespace.call(&self.global_name, expression)
    }

    /// Session state.
    pub fn state(&self) -> LoadState {
        self.loader.state()
    }

    /// Failure recorded by the loader, if any.
    pub fn failure(&self) -> Option<&LoadFailure> {
        self.loader.failure()
    }

    /// Read handle to the session's namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Name the entry point is bound under.
    pub fn global_name(&self) -> &str {
        &self.global_name
    }

    /// The session's loader.
    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new(&LoaderConfig::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
