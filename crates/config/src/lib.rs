//! Configuration loading, validation, and env substitution for the relay.
//!
//! Config files: `nse-relay.toml`, `nse-relay.yaml`, or `nse-relay.json`
//! Searched in `./` then `~/.config/nse-relay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        BrowserConfig, MetricsConfig, RelayConfig, RuntimeConfig, ServerConfig, UpstreamConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
