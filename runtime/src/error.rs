//! Error taxonomy for the load sequence and the evaluation bridge.
//!
//! Two families matter to the loader: [`ArtifactLoadError`] (the artifact
//! request failed) and [`InitializationError`] (the factory or `init()`
//! failed). Both are folded into a [`LoadFailure`] at the loader's single
//! error boundary and never rethrown.

use std::path::PathBuf;

use thiserror::Error;

/// A failure raised by the application's own code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Fault(pub String);

impl Fault {
    /// Create a fault from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Fault(message.into())
    }

    /// The fault message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// The asynchronous artifact request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactLoadError {
    /// The artifact bytes could not be obtained.
    #[error("failed to fetch artifact `{location}`: {reason}")]
    Fetch {
        /// Where the artifact was requested from.
        location: String,
        /// Underlying cause.
        reason: String,
    },
    /// The artifact bytes are not a valid module.
    #[error("failed to compile artifact: {0}")]
    Compile(String),
    /// The module compiled but could not be linked or started.
    #[error("failed to instantiate artifact: {0}")]
    Instantiate(String),
    /// The source already handed out its artifact.
    #[error("artifact source already consumed")]
    Consumed,
}

/// The factory or `init()` failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    /// `create()` failed before an app handle existed.
    #[error("factory failed: {0}")]
    Factory(Fault),
    /// `init()` failed on a created app handle.
    #[error("init failed: {0}")]
    Init(Fault),
}

/// Why a loader ended in `Errored`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    /// The artifact request was rejected.
    #[error(transparent)]
    Artifact(#[from] ArtifactLoadError),
    /// The artifact resolved but the app could not be brought up.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

impl LoadFailure {
    /// Human-readable description of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            LoadFailure::Artifact(_) => "loading module artifact",
            LoadFailure::Initialization(InitializationError::Factory(_)) => {
                "creating application instance"
            }
            LoadFailure::Initialization(InitializationError::Init(_)) => {
                "initializing application instance"
            }
        }
    }
}

/// Evaluation through a bound entry point failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Nothing is bound under the requested name.
    #[error("{0} is not defined")]
    UndefinedReference(String),
    /// The expression could not be handed to the module.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The module trapped while evaluating.
    #[error("evaluation trapped: {0}")]
    Trap(String),
    /// The application rejected the expression.
    #[error(transparent)]
    Fault(#[from] Fault),
}

/// Misuse of the loader's one-shot protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// `begin()` was called after the sequence had started.
    #[error("load sequence already started")]
    AlreadyStarted,
    /// An outcome was delivered while no request was outstanding.
    #[error("no artifact request is outstanding")]
    NotLoading,
}

/// Configuration could not be read or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config `{path}`: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`LoaderConfig`](crate::LoaderConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field holds a value the loader cannot use.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Tests ────────────────────────────────────────────────────────────
