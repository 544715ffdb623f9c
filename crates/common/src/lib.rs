//! meshreg Common Library
//!
//! Registry core for private mesh networks: SQLite persistence, host address
//! allocation, peer groups, and the text renderers used by the CLI.

pub mod allocator;
pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod probe;
pub mod registry;
pub mod render;
pub mod types;

// Re-export commonly used types
pub use allocator::{parse_cidr, AddressAllocator};
pub use config::{BootstrapConfig, RegistryConfig, RenderConfig};
pub use db::Database;
pub use error::{Error, Result};
pub use probe::{HashProbe, ProbeOutcome, ReachabilityProbe};
pub use registry::Registry;
pub use types::*;

/// meshreg version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".meshreg")
}

/// Open the store described by `config`, populating defaults if enabled
pub fn open_registry(config: &RegistryConfig) -> Result<Registry> {
    let db = Database::open(config.db_path())?;
    let registry = Registry::with_render_config(db, config.render.clone());
    if config.bootstrap.enabled {
        registry.bootstrap_defaults(&config.bootstrap)?;
    }
    Ok(registry)
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
