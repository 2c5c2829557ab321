//! Layered configuration
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path, else `PROGFLOW_CONFIG_PATH`, else
//!    `progflow.toml` in the working directory when present
//! 3. `PROGFLOW__SECTION__KEY` environment variables (a `.env` file is read
//!    into the environment first)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codegen::CppOptions;
use crate::interpreter::ExecutionLimits;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "PROGFLOW_CONFIG_PATH";

/// Config file picked up from the working directory when nothing else is named
pub const DEFAULT_CONFIG_FILE: &str = "progflow.toml";

const ENV_PREFIX: &str = "PROGFLOW";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub codegen: CodegenConfig,
}

/// Interpreter guards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Iterations a single loop may run before the program is stopped
    pub iteration_limit: u64,
    /// Nested procedure calls allowed inside one expression evaluation
    pub max_call_depth: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let limits = ExecutionLimits::default();
        Self {
            iteration_limit: limits.iteration_limit,
            max_call_depth: limits.max_call_depth,
        }
    }
}

/// C++ generator layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub column_budget: usize,
    pub indent_width: usize,
    pub array_size: usize,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        let options = CppOptions::default();
        Self {
            column_budget: options.column_budget,
            indent_width: options.indent_width,
            array_size: options.array_size,
        }
    }
}

impl From<&ExecutionConfig> for ExecutionLimits {
    fn from(config: &ExecutionConfig) -> Self {
        ExecutionLimits {
            iteration_limit: config.iteration_limit,
            max_call_depth: config.max_call_depth,
        }
    }
}

impl From<&CodegenConfig> for CppOptions {
    fn from(config: &CodegenConfig) -> Self {
        CppOptions {
            column_budget: config.column_budget,
            indent_width: config.indent_width,
            array_size: config.array_size,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with default discovery
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn limits(&self) -> ExecutionLimits {
        (&self.execution).into()
    }

    pub fn cpp_options(&self) -> CppOptions {
        (&self.codegen).into()
    }

    fn validate(&self) -> Result<()> {
        if self.execution.iteration_limit == 0 {
            bail!("execution.iteration_limit must be at least 1");
        }
        if self.execution.max_call_depth == 0 {
            bail!("execution.max_call_depth must be at least 1");
        }
        if self.codegen.array_size == 0 {
            bail!("codegen.array_size must be at least 1");
        }
        if self.codegen.column_budget == 0 {
            bail!("codegen.column_budget must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Use this file instead of searching; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `PROGFLOW__*` variables and `.env`
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            dotenvy::dotenv().ok();
        }

        let mut builder = ::config::Config::builder();

        let explicit = self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        match explicit {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                builder = builder.add_source(::config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(
                    ::config::File::with_name(DEFAULT_CONFIG_FILE)
                        .format(::config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if !self.skip_env {
            builder = builder.add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: Config = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }
}
