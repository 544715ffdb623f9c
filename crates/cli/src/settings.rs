//! Resolve the registry configuration from CLI flags and the config file

use meshreg_common::{default_store_path, RegistryConfig};
use std::path::PathBuf;

/// Build the effective configuration.
///
/// The config file defaults to `<store>/config.toml`. An explicit store flag
/// wins over `store_path` in the file.
pub fn resolve(
    store: Option<PathBuf>,
    config: Option<PathBuf>,
) -> meshreg_common::Result<RegistryConfig> {
    let config_path = config.unwrap_or_else(|| {
        store
            .clone()
            .unwrap_or_else(default_store_path)
            .join("config.toml")
    });

    let mut resolved = RegistryConfig::load(&config_path)?;
    if let Some(store) = store {
        resolved.store_path = store;
    }

    tracing::debug!(
        "Using store {:?} (config {:?})",
        resolved.store_path,
        config_path
    );
    Ok(resolved)
}
