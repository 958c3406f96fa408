//! Shared fixtures for the end-to-end scenarios.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use evalrs_runtime::{AppFn, AppHandle, EvalError, Fault, ModuleArtifact, NativeArtifact, Value};
use tempfile::TempDir;

/// How a fixture's `init` export behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitBehavior {
    /// Returns status 0.
    Succeed,
    /// Returns the given non-zero status.
    Status(i32),
    /// Executes `unreachable`.
    Trap,
}

/// Text of a module whose `eval_rs` sums the decimal digits of its input
/// (NaN when there are none).
pub fn calculator_wat(init: InitBehavior) -> String {
    let init_body = match init {
        InitBehavior::Succeed => String::from("i32.const 0"),
        InitBehavior::Status(code) => format!("i32.const {}", code),
        InitBehavior::Trap => String::from("unreachable"),
    };
    format!(
        r#"
        (module
          (memory (export "memory") 1)
          (global $next (mut i32) (i32.const 1024))
          (func (export "alloc") (param $len i32) (result i32)
            (local $ptr i32)
            global.get $next
            local.set $ptr
            global.get $next
            local.get $len
            i32.add
            global.set $next
            local.get $ptr)
          (func (export "create") (result i32)
            i32.const 1)
          (func (export "init") (param $handle i32) (result i32)
            {init_body})
          (func (export "eval_rs") (param $ptr i32) (param $len i32) (result f64)
            (local $end i32) (local $c i32) (local $sum f64) (local $digits i32)
            local.get $ptr
            local.get $len
            i32.add
            local.set $end
            block $done
              loop $next
                local.get $ptr
                local.get $end
                i32.ge_u
                br_if $done
                local.get $ptr
                i32.load8_u
                i32.const 48
                i32.sub
                local.tee $c
                i32.const 10
                i32.lt_u
                if
                  local.get $sum
                  local.get $c
                  f64.convert_i32_u
                  f64.add
                  local.set $sum
                  local.get $digits
                  i32.const 1
                  i32.add
                  local.set $digits
                end
                local.get $ptr
                i32.const 1
                i32.add
                local.set $ptr
                br $next
              end
            end
            local.get $digits
            if (result f64)
              local.get $sum
            else
              f64.const nan
            end))
        "#,
        init_body = init_body
    )
}

/// A module file on disk, removed when dropped.
pub struct ArtifactFile {
    _dir: TempDir,
    path: PathBuf,
}

impl ArtifactFile {
    /// Write `contents` to a fresh temporary directory as `file_name`.
    pub fn write(file_name: &str, contents: &[u8]) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        std::fs::write(&path, contents)?;
        Ok(ArtifactFile { _dir: dir, path })
    }

    /// Write a calculator module in text format.
    pub fn calculator(init: InitBehavior) -> std::io::Result<Self> {
        Self::write("calculator.wat", calculator_wat(init).as_bytes())
    }

    /// Path of the written module.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Counts calls into an instrumented native artifact.
#[derive(Debug, Default)]
pub struct CallCounter {
    creates: AtomicUsize,
    inits: AtomicUsize,
    evaluations: AtomicUsize,
}

impl CallCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

/// Native artifact that records calls in `counter`. Its evaluator parses the
/// expression as a number.
pub fn counted_artifact(
    counter: &Arc<CallCounter>,
    fail_create: bool,
    fail_init: bool,
) -> Arc<dyn ModuleArtifact> {
    let factory_counter = Arc::clone(counter);
    let eval_counter = Arc::clone(counter);
    NativeArtifact::new(
        "counted",
        move || {
            factory_counter.creates.fetch_add(1, Ordering::SeqCst);
            if fail_create {
                return Err(Fault::new("factory threw"));
            }
            let counter = Arc::clone(&factory_counter);
            Ok(Box::new(AppFn(move || {
                counter.inits.fetch_add(1, Ordering::SeqCst);
                if fail_init {
                    Err(Fault::new("init threw"))
                } else {
                    Ok(())
                }
            })) as Box<dyn AppHandle>)
        },
        move |expr: &str| {
            eval_counter.evaluations.fetch_add(1, Ordering::SeqCst);
            expr.trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|e| EvalError::Fault(Fault::new(e.to_string())))
        },
    )
    .into_shared()
}
