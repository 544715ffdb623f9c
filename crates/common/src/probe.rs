//! Peer reachability probes
//!
//! Only a simulated probe exists. `HashProbe` derives its verdict from a
//! SHA-256 of the peer name, so the same name always gives the same answer
//! and no packet ever leaves the host. Reports produced through it are
//! flagged `simulated`.

use crate::types::Peer;
use sha2::{Digest, Sha256};

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

/// Reachability check interface
pub trait ReachabilityProbe {
    /// Probe a peer
    fn probe(&self, peer: &Peer) -> ProbeOutcome;

    /// Whether outcomes are made up rather than measured
    fn is_simulated(&self) -> bool;
}

/// Deterministic stand-in keyed on the peer name
#[derive(Debug, Clone, Copy, Default)]
pub struct HashProbe;

impl HashProbe {
    /// Stable 64-bit hash of a name
    pub fn name_hash(name: &str) -> u64 {
        let digest = Sha256::digest(name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }

    pub fn outcome_for(name: &str) -> ProbeOutcome {
        let hash = Self::name_hash(name);
        // roughly two in three names come back reachable
        let reachable = hash % 3 != 0;
        ProbeOutcome {
            reachable,
            latency_ms: reachable.then(|| hash % 100 + 5),
        }
    }
}

impl ReachabilityProbe for HashProbe {
    fn probe(&self, peer: &Peer) -> ProbeOutcome {
        Self::outcome_for(&peer.name)
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
