//! Loader — one-shot load → create → init → bind sequence.
//!
//! # Lifecycle
//!
//! 1. **Begin**: `Unloaded → Loading`. Allowed once.
//! 2. **Settle**: the artifact request's outcome is delivered.
//!    - rejected → `Errored`
//!    - resolved → `Loaded`, then factory + `init()` → `Initialized`
//!      (or `Errored`), then the bridge binds the evaluator → `Ready`.
//!
//! Everything after the request resolves runs synchronously inside
//! [`Loader::settle`], so nothing can interleave between "artifact ready" and
//! "entry point bound". `Ready` and `Errored` are terminal.

use std::fmt;
use std::sync::Arc;

use crate::artifact::{AppHandle, ModuleArtifact};
use crate::bridge::GlobalBridge;
use crate::error::{ArtifactLoadError, InitializationError, LoadFailure, LoaderError};
use crate::source::ArtifactSource;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Loader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing requested yet.
    Unloaded,
    /// Artifact request outstanding.
    Loading,
    /// Artifact available, app not yet initialized.
    Loaded,
    /// App created and initialized, entry point not yet bound.
    Initialized,
    /// Entry point bound.
    Ready,
    /// A stage failed; see [`Loader::failure`].
    Errored,
}

impl LoadState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Ready | LoadState::Errored)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Initialized => "initialized",
            LoadState::Ready => "ready",
            LoadState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Check if a state transition is valid
fn is_valid_transition(from: LoadState, to: LoadState) -> bool {
    use LoadState::*;

    matches!(
        (from, to),
        (Unloaded, Loading)
            | (Loading, Loaded)
            | (Loading, Errored) // request rejected
            | (Loaded, Initialized)
            | (Loaded, Errored) // factory or init failed
            | (Initialized, Ready)
    )
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Drives the load sequence for one host process.
pub struct Loader {
    state: LoadState,
    history: Vec<LoadState>,
    /// Taken when binding; absent once the sequence is over.
    bridge: Option<GlobalBridge>,
    artifact: Option<Arc<dyn ModuleArtifact>>,
    /// Lives as long as the loader once initialized.
    app: Option<Box<dyn AppHandle>>,
    failure: Option<LoadFailure>,
}

impl Loader {
    /// Create a loader that will bind through `bridge` on success.
    pub fn new(bridge: GlobalBridge) -> Self {
        Loader {
            state: LoadState::Unloaded,
            history: vec![LoadState::Unloaded],
            bridge: Some(bridge),
            artifact: None,
            app: None,
            failure: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Every state entered so far, starting with `Unloaded`.
    pub fn history(&self) -> &[LoadState] {
        &self.history
    }

    /// Why the sequence failed, once `Errored`.
    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }

    /// The loaded artifact, unless the sequence failed.
    pub fn artifact(&self) -> Option<&Arc<dyn ModuleArtifact>> {
        self.artifact.as_ref()
    }

    /// The initialized app handle.
    pub fn app(&self) -> Option<&dyn AppHandle> {
        self.app.as_deref()
    }

    /// `Unloaded → Loading`.
    pub fn begin(&mut self) -> Result<(), LoaderError> {
        if self.state != LoadState::Unloaded {
            return Err(LoaderError::AlreadyStarted);
        }
        self.transition(LoadState::Loading);
        Ok(())
    }

    /// Deliver the outcome of the artifact request and run the rest of the
    /// sequence to a terminal state.
    ///
    /// Failures are logged and recorded, never returned; the `Err` case is
    /// reserved for protocol misuse.
    pub fn settle(
        &mut self,
        outcome: Result<Arc<dyn ModuleArtifact>, ArtifactLoadError>,
    ) -> Result<LoadState, LoaderError> {
        if self.state != LoadState::Loading {
            return Err(LoaderError::NotLoading);
        }

        let artifact = match outcome {
            Ok(artifact) => artifact,
            Err(err) => {
                self.fail(err.into());
                return Ok(self.state);
            }
        };
        log::info!("wasm loaded successfully: {}", artifact.name());
        self.transition(LoadState::Loaded);

        if let Err(err) = self.initialize(artifact.as_ref()) {
            self.fail(err.into());
            return Ok(self.state);
        }
        self.transition(LoadState::Initialized);

        if let Some(bridge) = self.bridge.take() {
            bridge.bind(artifact.evaluator());
        }
        self.artifact = Some(artifact);
        self.transition(LoadState::Ready);
        Ok(self.state)
    }

    /// Request the artifact from `source`, await it, and settle.
    ///
    /// Calling this on a loader that has already started logs a warning and
    /// returns the current state without touching `source`.
    pub async fn run(&mut self, source: &dyn ArtifactSource) -> LoadState {
        if let Err(err) = self.begin() {
            log::warn!("{} ({}); ignoring load request", err, self.state);
            return self.state;
        }

        let outcome = source.fetch().await;

        match self.settle(outcome) {
            Ok(state) => state,
            Err(err) => {
                log::warn!("{} ({})", err, self.state);
                self.state
            }
        }
    }

    fn initialize(&mut self, artifact: &dyn ModuleArtifact) -> Result<(), InitializationError> {
        let mut app = artifact.create().map_err(InitializationError::Factory)?;
        app.init().map_err(InitializationError::Init)?;
        self.app = Some(app);
        Ok(())
    }

    fn fail(&mut self, failure: LoadFailure) {
        log::error!("error executing wasm: {}: {}", failure.stage(), failure);
        self.bridge = None;
        self.app = None;
        self.artifact = None;
        self.failure = Some(failure);
        self.transition(LoadState::Errored);
    }

    fn transition(&mut self, to: LoadState) {
        debug_assert!(
            is_valid_transition(self.state, to),
            "invalid loader transition {} -> {}",
            self.state,
            to
        );
        log::debug!("loader: {} -> {}", self.state, to);
        self.state = to;
        self.history.push(to);
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("state", &self.state)
            .field("artifact", &self.artifact.as_ref().map(|a| a.name().to_owned()))
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
