//! Global bridge — exposes the artifact's evaluation operation by name.
//!
//! The host's ambient global namespace is replaced by an explicit
//! [`Namespace`] handle. Anyone holding a clone may read or call bindings;
//! only a [`GlobalBridge`] may write one, and `bind` consumes the bridge, so
//! each bridge writes at most once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use spin::RwLock;

use crate::artifact::{EvalFn, Value};
use crate::error::EvalError;

/// Well-known name the evaluation operation is bound under.
pub const DEFAULT_GLOBAL_NAME: &str = "eval_rs";

#[derive(Default)]
struct Bindings {
    entries: BTreeMap<String, EvalFn>,
    writes: usize,
}

/// Shared name → operation registry for one host process.
#[derive(Clone, Default)]
pub struct Namespace {
    inner: Arc<RwLock<Bindings>>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the operation bound under `name`.
    pub fn get(&self, name: &str) -> Option<EvalFn> {
        self.inner.read().entries.get(name).cloned()
    }

    /// Check whether anything is bound under `name`.
    pub fn is_bound(&self, name: &str) -> bool {
        self.inner.read().entries.contains_key(name)
    }

    /// Names currently bound, in order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().entries.keys().cloned().collect()
    }

    /// Total number of bind operations performed on this namespace.
    pub fn writes(&self) -> usize {
        self.inner.read().writes
    }

    /// Invoke the operation bound under `name`.
    ///
    /// Fails with [`EvalError::UndefinedReference`] when nothing is bound,
    /// mirroring what a host reports for an unknown global.
    pub fn call(&self, name: &str, expression: &str) -> Result<Value, EvalError> {
        // Clone out of the lock so the operation runs unlocked.
        let op = self
            .get(name)
            .ok_or_else(|| EvalError::UndefinedReference(String::from(name)))?;
        op(expression)
    }

    fn insert(&self, name: String, op: EvalFn) {
        let mut bindings = self.inner.write();
        bindings.writes += 1;
        bindings.entries.insert(name, op);
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("names", &self.names())
            .field("writes", &self.writes())
            .finish()
    }
}

/// The single write point into a [`Namespace`].
#[derive(Debug)]
pub struct GlobalBridge {
    namespace: Namespace,
    name: String,
}

impl GlobalBridge {
    /// Create a bridge that will bind under `name`.
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Create a bridge for [`DEFAULT_GLOBAL_NAME`].
    pub fn with_default_name(namespace: Namespace) -> Self {
        Self::new(namespace, DEFAULT_GLOBAL_NAME)
    }

    /// Name this bridge binds under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `op` under the bridge's name. Last write wins.
    pub fn bind(self, op: EvalFn) {
        log::debug!("binding `{}` in host namespace", self.name);
        self.namespace.insert(self.name, op);
    }
}

// ── Tests ────────────────────────────────────────────────────────────
