//! Artifact sources — the asynchronous artifact request.
//!
//! `fetch` is the only point where the load sequence suspends. Whatever the
//! source resolves to is handed to [`crate::Loader::settle`] unchanged.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use spin::Mutex;

use crate::artifact::ModuleArtifact;
use crate::error::ArtifactLoadError;

/// Something that can asynchronously produce a module artifact.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Request the artifact.
    async fn fetch(&self) -> Result<Arc<dyn ModuleArtifact>, ArtifactLoadError>;
}

/// A source that resolves once with a prepared outcome.
///
/// Useful for hosts that already hold the artifact, and for simulating
/// network or compile failures.
pub struct MemorySource {
    outcome: Mutex<Option<Result<Arc<dyn ModuleArtifact>, ArtifactLoadError>>>,
}

impl MemorySource {
    /// A source that resolves with `artifact`.
    pub fn ready(artifact: Arc<dyn ModuleArtifact>) -> Self {
        Self::settled(Ok(artifact))
    }

    /// A source that rejects with `error`.
    pub fn failing(error: ArtifactLoadError) -> Self {
        Self::settled(Err(error))
    }

    /// A source that resolves with `outcome`.
    pub fn settled(outcome: Result<Arc<dyn ModuleArtifact>, ArtifactLoadError>) -> Self {
        MemorySource {
            outcome: Mutex::new(Some(outcome)),
        }
    }

    /// Whether the outcome has been handed out.
    pub fn is_consumed(&self) -> bool {
        self.outcome.lock().is_none()
    }
}

#[async_trait]
impl ArtifactSource for MemorySource {
    async fn fetch(&self) -> Result<Arc<dyn ModuleArtifact>, ArtifactLoadError> {
        self.outcome
            .lock()
            .take()
            .unwrap_or(Err(ArtifactLoadError::Consumed))
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// File-backed WebAssembly artifacts
// ---------------------------------------------------------------------------

#[cfg(feature = "wasm")]
pub use file::FileSource;

#[cfg(feature = "wasm")]
mod file {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::ArtifactSource;
    use crate::artifact::ModuleArtifact;
    use crate::config::{ExportNames, LoaderConfig};
    use crate::error::ArtifactLoadError;
    use crate::wasm::WasmArtifact;

    /// Reads a module from disk, then compiles and instantiates it.
    #[derive(Debug, Clone)]
    pub struct FileSource {
        path: PathBuf,
        exports: ExportNames,
        fuel: Option<u64>,
    }

    impl FileSource {
        /// A source for `path` with default export names and no fuel limit.
        pub fn new(path: impl Into<PathBuf>) -> Self {
            FileSource {
                path: path.into(),
                exports: ExportNames::default(),
                fuel: None,
            }
        }

        /// A source configured from a [`LoaderConfig`].
        pub fn from_config(config: &LoaderConfig) -> Self {
            FileSource {
                path: config.artifact.clone(),
                exports: config.exports.clone(),
                fuel: config.fuel,
            }
        }

        /// Path the artifact is read from.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    #[async_trait]
    impl ArtifactSource for FileSource {
        async fn fetch(&self) -> Result<Arc<dyn ModuleArtifact>, ArtifactLoadError> {
            log::debug!("fetching artifact {}", self.path.display());
            let bytes = tokio::fs::read(&self.path)
                .await
                .map_err(|e| ArtifactLoadError::Fetch {
                    location: self.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            let name = self
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| String::from("artifact"));
            let exports = self.exports.clone();
            let fuel = self.fuel;
            // Cranelift compilation is CPU-bound.
            let artifact = tokio::task::spawn_blocking(move || {
                WasmArtifact::compile(name, &bytes, exports, fuel)
            })
            .await
            .map_err(|e| ArtifactLoadError::Compile(e.to_string()))??;
            Ok(Arc::new(artifact))
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
