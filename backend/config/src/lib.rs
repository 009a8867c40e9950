//! `chanlogs-config`: configuration loading for the channel logger.
//!
//! Provides:
//! - Typed config schema (backend switch, naming/filter policy, templates)
//! - YAML read/write
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Schema validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::{apply_all_defaults, expand_home};
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, write_config};
pub use schema::{Backend, ChanlogsConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, apply env substitution, and apply defaults to a config file.
///
/// This is the main entry point for loading a config at runtime. The
/// result is a snapshot; nothing re-reads the file afterwards.
pub async fn load_and_prepare(path: &Path) -> Result<ChanlogsConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw)?;

    let config: ChanlogsConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    Ok(apply_all_defaults(config))
}
