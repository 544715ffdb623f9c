//! Network and peer registry
//!
//! Every operation is one call into the [`Database`]. Mutations run inside a
//! single transaction with the connection lock held, which serializes
//! allocation and group updates for all callers sharing the handle.

use crate::allocator::AddressAllocator;
use crate::config::{BootstrapConfig, RenderConfig};
use crate::db::{self, Database};
use crate::probe::{HashProbe, ReachabilityProbe};
use crate::types::{Group, Network, Peer, PeerStatus, PingReport, StatusReport};
use crate::{keys, render, Error, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, info};
use uuid::Uuid;

/// Address and peer registry
#[derive(Clone)]
pub struct Registry {
    db: Database,
    render: RenderConfig,
}

fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn require_network(conn: &Connection, network_id: &str) -> Result<Network> {
    db::network_by_id(conn, network_id)?
        .ok_or_else(|| Error::NetworkNotFound(network_id.to_string()))
}

fn require_peer(conn: &Connection, name: &str) -> Result<Peer> {
    db::peer_by_name(conn, name)?.ok_or_else(|| Error::PeerNotFound(name.to_string()))
}

fn host_mask(ip: IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl Registry {
    pub fn new(db: Database) -> Self {
        Self::with_render_config(db, RenderConfig::default())
    }

    pub fn with_render_config(db: Database, render: RenderConfig) -> Self {
        Self { db, render }
    }

    // ========================================================================
    // Network operations
    // ========================================================================

    /// Create a network and return its id
    pub fn create_network(&self, name: &str, cidr: &str, description: &str) -> Result<String> {
        let alloc = AddressAllocator::new(cidr)?;

        let network = Network {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            cidr: alloc.cidr(),
            description: description.to_string(),
            created_at: now_epoch_secs(),
            peer_count: 0,
        };

        self.db.write(|tx| {
            if db::network_by_name(tx, name)?.is_some() {
                return Err(Error::DuplicateName {
                    kind: "network",
                    name: name.to_string(),
                });
            }
            db::insert_network(tx, &network)
        })?;

        info!("Created network {} ({}) as {}", network.name, network.cidr, network.id);
        Ok(network.id)
    }

    /// Create the default network and its peers unless it already exists.
    ///
    /// Returns the default network id in both cases. Peers get the second,
    /// third, ... usable hosts; the first host is left for a gateway.
    pub fn bootstrap_defaults(&self, defaults: &BootstrapConfig) -> Result<String> {
        let alloc = AddressAllocator::new(&defaults.cidr)?;

        let mut seen = HashSet::new();
        if let Some(dup) = defaults.peers.iter().find(|name| !seen.insert(*name)) {
            return Err(Error::DuplicateName {
                kind: "peer",
                name: dup.clone(),
            });
        }

        let (network_id, created) = self.db.write(|tx| {
            if let Some(existing) = db::network_by_name(tx, &defaults.network_name)? {
                return Ok((existing.id, false));
            }

            let now = now_epoch_secs();
            let network = Network {
                id: Uuid::new_v4().to_string(),
                name: defaults.network_name.clone(),
                cidr: alloc.cidr(),
                description: defaults.description.clone(),
                created_at: now,
                peer_count: 0,
            };
            db::insert_network(tx, &network)?;

            for (i, name) in defaults.peers.iter().enumerate() {
                let ip = alloc
                    .nth_host(i as u128 + 1)
                    .ok_or_else(|| Error::AddressSpaceExhausted { cidr: alloc.cidr() })?;
                db::insert_peer(tx, &new_peer(&network.id, name, ip, now))?;
            }

            Ok((network.id, true))
        })?;

        if created {
            info!(
                "Bootstrapped default network {} with {} peers",
                defaults.network_name,
                defaults.peers.len()
            );
        } else {
            debug!("Default network {} already present", defaults.network_name);
        }
        Ok(network_id)
    }

    pub fn get_network(&self, network_id: &str) -> Result<Option<Network>> {
        self.db.read(|conn| db::network_by_id(conn, network_id))
    }

    /// Look a network up by id, falling back to name
    pub fn find_network(&self, id_or_name: &str) -> Result<Network> {
        self.db.read(|conn| {
            if let Some(network) = db::network_by_id(conn, id_or_name)? {
                return Ok(network);
            }
            db::network_by_name(conn, id_or_name)?
                .ok_or_else(|| Error::NetworkNotFound(id_or_name.to_string()))
        })
    }

    pub fn list_networks(&self) -> Result<Vec<Network>> {
        self.db.read(db::list_networks)
    }

    // ========================================================================
    // Peer operations
    // ========================================================================

    /// Add a peer and return its id. Without `ip`, the lowest free host is used.
    pub fn add_peer(&self, network_id: &str, name: &str, ip: Option<&str>) -> Result<String> {
        let peer = self.db.write(|tx| {
            let network = require_network(tx, network_id)?;
            let alloc = AddressAllocator::new(&network.cidr)?;

            if db::peer_in_network(tx, network_id, name)?.is_some() {
                return Err(Error::DuplicateName {
                    kind: "peer",
                    name: name.to_string(),
                });
            }

            let assigned = db::network_ips(tx, network_id)?;
            let addr = match ip {
                Some(requested) => {
                    let addr = alloc.check_host(requested)?;
                    let taken = assigned
                        .iter()
                        .any(|s| s.parse::<IpAddr>().map(|a| a == addr).unwrap_or(false));
                    if taken {
                        return Err(Error::AddressInUse {
                            ip: addr.to_string(),
                            network: network.name,
                        });
                    }
                    addr
                }
                None => alloc.next_free(assigned.iter().map(String::as_str))?,
            };

            let peer = new_peer(network_id, name, addr, now_epoch_secs());
            db::insert_peer(tx, &peer)?;
            Ok(peer)
        })?;

        info!("Added peer {} at {} to network {}", peer.name, peer.ip, network_id);
        Ok(peer.id)
    }

    /// Remove a peer. Removing an absent peer is not an error.
    pub fn remove_peer(&self, network_id: &str, name: &str) -> Result<bool> {
        let removed = self.db.write(|tx| db::delete_peer(tx, network_id, name))?;
        if removed {
            info!("Removed peer {} from network {}", name, network_id);
        } else {
            debug!("No peer {} in network {} to remove", name, network_id);
        }
        Ok(removed)
    }

    /// All peers in insertion order, optionally filtered by network and group
    pub fn list_peers(&self, network_id: Option<&str>, group: Option<Group>) -> Result<Vec<Peer>> {
        let peers = self.db.read(|conn| db::list_peers(conn, network_id))?;
        Ok(match group {
            Some(group) => peers.into_iter().filter(|p| p.in_group(group)).collect(),
            None => peers,
        })
    }

    pub fn get_peer(&self, peer_id: &str) -> Result<Peer> {
        self.db
            .read(|conn| db::peer_by_id(conn, peer_id))?
            .ok_or_else(|| Error::PeerNotFound(peer_id.to_string()))
    }

    /// First peer with this name, in insertion order
    pub fn get_peer_by_name(&self, name: &str) -> Result<Peer> {
        self.db.read(|conn| require_peer(conn, name))
    }

    /// Add a peer to a group. Assigning a group twice changes nothing.
    pub fn assign_group(&self, peer_name: &str, group: &str) -> Result<Vec<Group>> {
        let group: Group = group.parse()?;
        let groups = self.db.write(|tx| {
            let mut peer = require_peer(tx, peer_name)?;
            if !peer.groups.contains(&group) {
                peer.groups.push(group);
                db::set_peer_groups(tx, &peer.id, &peer.groups)?;
            }
            Ok(peer.groups)
        })?;

        debug!("Peer {} groups: {:?}", peer_name, groups);
        Ok(groups)
    }

    /// Drop a peer from a group if it is a member
    pub fn unassign_group(&self, peer_name: &str, group: &str) -> Result<Vec<Group>> {
        let group: Group = group.parse()?;
        self.db.write(|tx| {
            let mut peer = require_peer(tx, peer_name)?;
            let before = peer.groups.len();
            peer.groups.retain(|g| *g != group);
            if peer.groups.len() != before {
                db::set_peer_groups(tx, &peer.id, &peer.groups)?;
            }
            Ok(peer.groups)
        })
    }

    // ========================================================================
    // Status and reporting
    // ========================================================================

    pub fn status(&self) -> Result<StatusReport> {
        let (networks, connected_peers) = self
            .db
            .read(|conn| Ok((db::list_networks(conn)?, db::count_connected(conn)?)))?;

        Ok(StatusReport {
            total_peers: networks.iter().map(|n| n.peer_count).sum(),
            networks,
            connected_peers,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Run `probe` against a peer, marking it connected when reachable
    pub fn probe_peer<P: ReachabilityProbe>(
        &self,
        peer_name: &str,
        probe: &P,
    ) -> Result<PingReport> {
        let (peer, outcome) = self.db.write(|tx| {
            let peer = require_peer(tx, peer_name)?;
            let outcome = probe.probe(&peer);
            if outcome.reachable {
                db::mark_connected(tx, &peer.id, now_epoch_secs())?;
            }
            Ok((peer, outcome))
        })?;

        debug!("Probed {}: {:?}", peer_name, outcome);
        Ok(PingReport {
            peer: peer.name,
            ip: peer.ip,
            reachable: outcome.reachable,
            latency_ms: outcome.latency_ms,
            simulated: probe.is_simulated(),
            timestamp: chrono::Utc::now(),
        })
    }

    /// Hash-based stand-in for a liveness check. Not a real probe.
    pub fn simulate_reachability(&self, peer_name: &str) -> Result<PingReport> {
        self.probe_peer(peer_name, &HashProbe)
    }

    /// Render a configuration document for a peer
    pub fn render_config(&self, peer_name: &str) -> Result<String> {
        let (peer, network) = self.db.read(|conn| {
            let peer = require_peer(conn, peer_name)?;
            let network = require_network(conn, &peer.network_id)?;
            Ok((peer, network))
        })?;

        render::render_peer_config(&peer, &network, &keys::placeholder_key(), &self.render)
    }

    /// Render the topology box for a network; unknown ids get a placeholder label
    pub fn render_topology_map(&self, network_id: &str) -> Result<String> {
        let (network, peers) = self.db.read(|conn| {
            Ok((
                db::network_by_id(conn, network_id)?,
                db::list_peers(conn, Some(network_id))?,
            ))
        })?;

        Ok(render::render_topology_map(network.as_ref(), &peers))
    }
}

fn new_peer(network_id: &str, name: &str, ip: IpAddr, now: i64) -> Peer {
    Peer {
        id: Uuid::new_v4().to_string(),
        network_id: network_id.to_string(),
        name: name.to_string(),
        ip: ip.to_string(),
        public_key: keys::placeholder_key(),
        allowed_ips: format!("{}/{}", ip, host_mask(ip)),
        endpoint: None,
        last_handshake_at: None,
        status: PeerStatus::Disconnected,
        groups: Vec::new(),
        created_at: now,
    }
}
