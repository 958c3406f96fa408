//! Loader and build pipeline configuration.
//!
//! Read from TOML:
//!
//! ```toml
//! artifact = "pkg/evalrs_bg.wasm"
//! global_name = "eval_rs"
//! fuel = 10000000
//!
//! [exports]
//! evaluate = "eval_rs"
//!
//! [pipeline]
//! port = 8000
//! force_watch = true
//! ```
//!
//! The `[pipeline]` table describes the external build pipeline. The loader
//! never reads it.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bridge::DEFAULT_GLOBAL_NAME;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Loader configuration
// ---------------------------------------------------------------------------

/// Configuration for booting one artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Path of the compiled artifact (`.wasm`, or `.wat` during development).
    pub artifact: PathBuf,
    /// Name the evaluation operation is bound under.
    pub global_name: String,
    /// Export names the artifact is expected to provide.
    pub exports: ExportNames,
    /// Fuel granted to each call into the artifact (None = unlimited).
    pub fuel: Option<u64>,
    /// Build pipeline options.
    pub pipeline: PipelineConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            artifact: PathBuf::from("pkg/evalrs_bg.wasm"),
            global_name: String::from(DEFAULT_GLOBAL_NAME),
            exports: ExportNames::default(),
            fuel: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// A relative `artifact` path is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.artifact.is_relative() {
            if let Some(dir) = path.parent() {
                config.artifact = dir.join(&config.artifact);
            }
        }
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_name.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("global_name is empty")));
        }
        if self.artifact.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(String::from("artifact path is empty")));
        }
        if self.fuel == Some(0) {
            return Err(ConfigError::Invalid(String::from(
                "fuel must be positive when set",
            )));
        }
        self.exports.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// Export names of the artifact's entry points.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportNames {
    /// Linear memory.
    pub memory: String,
    /// Guest allocator for expression input.
    pub alloc: String,
    /// Factory.
    pub create: String,
    /// One-time initialization.
    pub init: String,
    /// Free evaluation operation.
    pub evaluate: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        ExportNames {
            memory: String::from("memory"),
            alloc: String::from("alloc"),
            create: String::from("create"),
            init: String::from("init"),
            evaluate: String::from(DEFAULT_GLOBAL_NAME),
        }
    }
}

impl ExportNames {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("memory", &self.memory),
            ("alloc", &self.alloc),
            ("create", &self.create),
            ("init", &self.init),
            ("evaluate", &self.evaluate),
        ];
        for (field, value) in named {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("exports.{} is empty", field)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Build pipeline options
// ---------------------------------------------------------------------------

/// Build mode of the external pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

/// Named options of the external build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bundler mode.
    pub mode: BuildMode,
    /// Mode forced onto the module compilation step.
    pub force_mode: Option<BuildMode>,
    /// Rebuild the module on source changes.
    pub force_watch: bool,
    /// Skip auxiliary type-declaration emission.
    pub no_typescript: bool,
    /// Development server bind address.
    pub host: IpAddr,
    /// Development server port.
    pub port: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            mode: BuildMode::Production,
            // Development keeps panic messages in the module's console output.
            force_mode: Some(BuildMode::Development),
            force_watch: true,
            no_typescript: true,
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
        }
    }
}

impl PipelineConfig {
    /// Mode the module is actually compiled in.
    pub fn effective_mode(&self) -> BuildMode {
        self.force_mode.unwrap_or(self.mode)
    }

    /// Address the development server listens on.
    pub fn dev_server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid(String::from("pipeline.port is zero")));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
