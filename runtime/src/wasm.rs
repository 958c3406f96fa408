//! WebAssembly module artifacts backed by wasmtime.
//!
//! # Export ABI
//!
//! | export     | signature              | meaning                                 |
//! |------------|------------------------|-----------------------------------------|
//! | `memory`   | memory                 | linear memory receiving expression text |
//! | `alloc`    | `(len i32) -> i32`     | guest buffer for `len` bytes            |
//! | `create`   | `() -> i32`            | app handle id, negative on failure      |
//! | `init`     | `(handle i32) -> i32`  | 0 on success, failure code otherwise    |
//! | `eval_rs`  | `(ptr i32, len i32) -> f64` | evaluate UTF-8 text, NaN = undefined |
//!
//! Export names are configurable through [`ExportNames`].

use std::fmt;
use std::sync::Arc;

use spin::Mutex;
use wasmtime::{Config, Engine, Instance, Linker, Module, Store};

use crate::artifact::{AppHandle, EvalFn, ModuleArtifact, Value};
use crate::config::ExportNames;
use crate::error::{ArtifactLoadError, EvalError, Fault};

/// Instantiated module state shared by the app handle and the evaluator.
struct Guest {
    store: Store<()>,
    instance: Instance,
    fuel: Option<u64>,
}

impl Guest {
    /// Reset the per-call fuel budget.
    fn refuel(&mut self) -> Result<(), String> {
        if let Some(fuel) = self.fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| format!("{:#}", e))?;
        }
        Ok(())
    }

    fn call_create(&mut self, export: &str) -> Result<i32, String> {
        self.refuel()?;
        let func = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, export)
            .map_err(|e| format!("{:#}", e))?;
        func.call(&mut self.store, ())
            .map_err(|e| format!("{:#}", e))
    }

    fn call_init(&mut self, export: &str, handle: i32) -> Result<i32, String> {
        self.refuel()?;
        let func = self
            .instance
            .get_typed_func::<i32, i32>(&mut self.store, export)
            .map_err(|e| format!("{:#}", e))?;
        func.call(&mut self.store, handle)
            .map_err(|e| format!("{:#}", e))
    }

    fn evaluate(&mut self, exports: &ExportNames, expression: &str) -> Result<Value, EvalError> {
        let len = i32::try_from(expression.len())
            .map_err(|_| EvalError::InvalidInput(String::from("expression too long")))?;
        self.refuel().map_err(EvalError::Trap)?;

        let alloc = self
            .instance
            .get_typed_func::<i32, i32>(&mut self.store, &exports.alloc)
            .map_err(|e| EvalError::InvalidInput(format!("{:#}", e)))?;
        let ptr = alloc
            .call(&mut self.store, len)
            .map_err(|e| EvalError::Trap(format!("{:#}", e)))?;

        let memory = self
            .instance
            .get_memory(&mut self.store, &exports.memory)
            .ok_or_else(|| {
                EvalError::InvalidInput(format!("missing memory export `{}`", exports.memory))
            })?;
        memory
            .write(&mut self.store, ptr as u32 as usize, expression.as_bytes())
            .map_err(|e| EvalError::InvalidInput(e.to_string()))?;

        let eval = self
            .instance
            .get_typed_func::<(i32, i32), f64>(&mut self.store, &exports.evaluate)
            .map_err(|e| EvalError::InvalidInput(format!("{:#}", e)))?;
        let result = eval
            .call(&mut self.store, (ptr, len))
            .map_err(|e| EvalError::Trap(format!("{:#}", e)))?;

        if result.is_nan() {
            Ok(Value::Undefined)
        } else {
            Ok(Value::Number(result))
        }
    }
}

/// A compiled and instantiated WebAssembly module.
pub struct WasmArtifact {
    name: String,
    exports: Arc<ExportNames>,
    guest: Arc<Mutex<Guest>>,
}

impl WasmArtifact {
    /// Compile `bytes` (binary or text format) and instantiate the module.
    ///
    /// The module must not import anything. Fails with
    /// [`ArtifactLoadError::Compile`] for invalid modules and
    /// [`ArtifactLoadError::Instantiate`] for link failures or missing exports.
    pub fn compile(
        name: impl Into<String>,
        bytes: &[u8],
        exports: ExportNames,
        fuel: Option<u64>,
    ) -> Result<Self, ArtifactLoadError> {
        let name = name.into();
        let mut config = Config::new();
        config.consume_fuel(fuel.is_some());
        let engine =
            Engine::new(&config).map_err(|e| ArtifactLoadError::Compile(format!("{:#}", e)))?;
        let module = Module::new(&engine, bytes)
            .map_err(|e| ArtifactLoadError::Compile(format!("{:#}", e)))?;

        let mut store = Store::new(&engine, ());
        if let Some(fuel) = fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| ArtifactLoadError::Instantiate(format!("{:#}", e)))?;
        }
        let linker = Linker::new(&engine);
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| ArtifactLoadError::Instantiate(format!("{:#}", e)))?;

        for export in [&exports.create, &exports.init, &exports.evaluate] {
            if instance.get_func(&mut store, export).is_none() {
                return Err(ArtifactLoadError::Instantiate(format!(
                    "missing function export `{}`",
                    export
                )));
            }
        }

        log::debug!("compiled artifact `{}` ({} bytes)", name, bytes.len());
        Ok(WasmArtifact {
            name,
            exports: Arc::new(exports),
            guest: Arc::new(Mutex::new(Guest {
                store,
                instance,
                fuel,
            })),
        })
    }
}

impl ModuleArtifact for WasmArtifact {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Result<Box<dyn AppHandle>, Fault> {
        let handle = self
            .guest
            .lock()
            .call_create(&self.exports.create)
            .map_err(Fault)?;
        if handle < 0 {
            return Err(Fault(format!(
                "`{}` returned {}",
                self.exports.create,
                handle
            )));
        }
        Ok(Box::new(WasmApp {
            handle,
            init_export: self.exports.init.clone(),
            guest: Arc::clone(&self.guest),
        }))
    }

    fn evaluator(&self) -> EvalFn {
        let guest = Arc::clone(&self.guest);
        let exports = Arc::clone(&self.exports);
        Arc::new(move |expression: &str| guest.lock().evaluate(&exports, expression))
    }
}

impl fmt::Debug for WasmArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmArtifact")
            .field("name", &self.name)
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

/// App handle living inside a [`WasmArtifact`]'s instance.
struct WasmApp {
    handle: i32,
    init_export: String,
    guest: Arc<Mutex<Guest>>,
}

impl AppHandle for WasmApp {
    fn init(&mut self) -> Result<(), Fault> {
        let status = self
            .guest
            .lock()
            .call_init(&self.init_export, self.handle)
            .map_err(Fault)?;
        match status {
            0 => Ok(()),
            code => Err(Fault(format!(
                "`{}` returned status {}",
                self.init_export,
                code
            ))),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
