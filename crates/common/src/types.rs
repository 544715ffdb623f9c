//! Core registry types

use serde::{Deserialize, Serialize};

// ============================================================================
// Networks
// ============================================================================

/// A private mesh network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub description: String,
    pub created_at: i64,
    /// Number of peers referencing this network, counted from the peer rows
    pub peer_count: u64,
}

// ============================================================================
// Peers
// ============================================================================

/// Peer connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Connected,
    Disconnected,
}

impl Default for PeerStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl std::str::FromStr for PeerStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            _ => Err(format!("unknown peer status: {}", s)),
        }
    }
}

/// Peer groups. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Admin,
    Workers,
    Sensors,
    Public,
    Internal,
}

impl Group {
    pub const ALL: [Group; 5] = [
        Group::Admin,
        Group::Workers,
        Group::Sensors,
        Group::Public,
        Group::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Workers => "workers",
            Self::Sensors => "sensors",
            Self::Public => "public",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Group {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidGroup(s.to_string()))
    }
}

/// A registered peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    pub network_id: String,
    pub name: String,
    pub ip: String,
    /// Placeholder key material (base64). Not a verified public key.
    pub public_key: String,
    pub allowed_ips: String,
    pub endpoint: Option<String>,
    pub last_handshake_at: Option<i64>,
    pub status: PeerStatus,
    pub groups: Vec<Group>,
    pub created_at: i64,
}

impl Peer {
    pub fn is_connected(&self) -> bool {
        self.status == PeerStatus::Connected
    }

    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Aggregate registry status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub networks: Vec<Network>,
    pub connected_peers: u64,
    pub total_peers: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Result of a simulated reachability check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingReport {
    pub peer: String,
    pub ip: String,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    /// Always true: the verdict comes from a name hash, not a probe
    pub simulated: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
