//! evalrs runtime
//!
//! This crate boots a precompiled evaluation module into a host process, runs
//! its one-time initialization, and exposes the module's evaluation entry
//! point under a well-known name for later invocation.
//!
//! The sequence runs exactly once per [`session::HostSession`]:
//!
//! ```text
//! Unloaded → Loading → Loaded → Initialized → Ready
//!               └──────────┴──→ Errored
//! ```
//!
//! # Architecture
//!
//! - `artifact`: Module artifact / app handle contracts + native artifacts
//! - `source`: Asynchronous artifact request (the single suspension point)
//! - `wasm`: WebAssembly artifacts backed by wasmtime (feature `wasm`)
//! - `loader`: One-shot load → create → init → bind state machine
//! - `bridge`: Explicit namespace registry replacing the ambient global
//! - `session`: One host process lifetime (namespace + loader)
//! - `config`: TOML configuration for the loader and the build pipeline
//! - `error`: Error taxonomy shared by all of the above

pub mod artifact;
pub mod bridge;
pub mod config;
pub mod error;
pub mod loader;
pub mod session;
pub mod source;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use artifact::{AppFn, AppHandle, EvalFn, ModuleArtifact, NativeArtifact, Value};
pub use bridge::{GlobalBridge, Namespace, DEFAULT_GLOBAL_NAME};
pub use config::{BuildMode, ExportNames, LoaderConfig, PipelineConfig};
pub use error::{
    ArtifactLoadError, ConfigError, EvalError, Fault, InitializationError, LoadFailure,
    LoaderError,
};
pub use loader::{LoadState, Loader};
pub use session::HostSession;
pub use source::{ArtifactSource, MemorySource};
#[cfg(feature = "wasm")]
pub use source::FileSource;
