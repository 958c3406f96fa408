//! Module artifact and app handle contracts.
//!
//! A module artifact is the opaque compiled unit the loader requests. It
//! exposes a factory (`create`) producing an [`AppHandle`], and a free
//! evaluation operation that the loader hands to the global bridge once the
//! handle has been initialized.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{EvalError, Fault};

/// The free evaluation operation exposed by an artifact.
pub type EvalFn = Arc<dyn Fn(&str) -> Result<Value, EvalError> + Send + Sync>;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// No meaningful result.
    Undefined,
    /// Numeric result.
    Number(f64),
    /// Textual result.
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Instance returned by an artifact's factory.
pub trait AppHandle: Send {
    /// One-time setup. The loader calls this exactly once.
    fn init(&mut self) -> Result<(), Fault>;
}

/// Compiled unit produced by the build pipeline.
pub trait ModuleArtifact: Send + Sync {
    /// Label used in diagnostics.
    fn name(&self) -> &str;

    /// Factory operation.
    fn create(&self) -> Result<Box<dyn AppHandle>, Fault>;

    /// Free evaluation operation, independent of any app handle.
    fn evaluator(&self) -> EvalFn;
}

// ---------------------------------------------------------------------------
// Native artifacts
// ---------------------------------------------------------------------------

type FactoryFn = Box<dyn Fn() -> Result<Box<dyn AppHandle>, Fault> + Send + Sync>;

/// App handle whose `init` is a closure.
pub struct AppFn<F>(pub F);

impl<F> AppHandle for AppFn<F>
where
    F: FnMut() -> Result<(), Fault> + Send,
{
    fn init(&mut self) -> Result<(), Fault> {
        (self.0)()
    }
}

/// An artifact implemented in-process by Rust closures.
///
/// Hosts that link the application natively use this instead of a
/// WebAssembly module.
pub struct NativeArtifact {
    name: String,
    factory: FactoryFn,
    evaluator: EvalFn,
}

impl NativeArtifact {
    /// Create a native artifact from a factory and an evaluator.
    pub fn new<C, E>(name: impl Into<String>, factory: C, evaluator: E) -> Self
    where
        C: Fn() -> Result<Box<dyn AppHandle>, Fault> + Send + Sync + 'static,
        E: Fn(&str) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        NativeArtifact {
            name: name.into(),
            factory: Box::new(factory),
            evaluator: Arc::new(evaluator),
        }
    }

    /// Wrap into the shared form the loader consumes.
    pub fn into_shared(self) -> Arc<dyn ModuleArtifact> {
        Arc::new(self)
    }
}

impl ModuleArtifact for NativeArtifact {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Result<Box<dyn AppHandle>, Fault> {
        (self.factory)()
    }

    fn evaluator(&self) -> EvalFn {
        Arc::clone(&self.evaluator)
    }
}

impl fmt::Debug for NativeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeArtifact")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
