//! Error types for meshreg

use thiserror::Error;

/// Result type alias using the registry Error
pub type Result<T> = std::result::Result<T, Error>;

/// Registry error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Network {0} not found")]
    NetworkNotFound(String),

    #[error("Peer {0} not found")]
    PeerNotFound(String),

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Address space exhausted in {cidr}")]
    AddressSpaceExhausted { cidr: String },

    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Address {ip} is not a usable host in {cidr}")]
    AddressOutOfRange { ip: String, cidr: String },

    #[error("Address {ip} is already assigned in network {network}")]
    AddressInUse { ip: String, network: String },
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl Error {
    /// True for failures caused by caller input rather than the store
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Error::Io(_) | Error::Database(_) | Error::Serialization(_) | Error::InvalidConfig(_)
        )
    }
}
