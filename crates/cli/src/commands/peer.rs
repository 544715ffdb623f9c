//! Peer Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::output::{
    format_epoch, print_item, print_list, print_structured, print_success, OutputFormat,
    TableDisplay,
};
use meshreg_common::{Group, Peer, Registry};

#[derive(Subcommand)]
pub enum PeerCommands {
    /// List peers
    List {
        /// Only peers in this network (ID or name)
        #[arg(short, long)]
        network: Option<String>,

        /// Only peers in this group
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Add a peer to a network
    Add {
        /// Network ID or name
        network: String,

        /// Peer name
        name: String,

        /// Fixed address; the lowest free host is used when omitted
        #[arg(long)]
        ip: Option<String>,
    },

    /// Remove a peer from a network
    Remove {
        /// Network ID or name
        network: String,

        /// Peer name
        name: String,
    },
}

/// Peer display wrapper for serialization
#[derive(Serialize)]
pub struct PeerDisplay {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub status: String,
    pub groups: Vec<String>,
    pub public_key: String,
    pub last_handshake: Option<String>,
}

impl From<Peer> for PeerDisplay {
    fn from(peer: Peer) -> Self {
        Self {
            id: peer.id,
            name: peer.name,
            ip: peer.ip,
            status: peer.status.to_string(),
            groups: peer.groups.iter().map(Group::to_string).collect(),
            public_key: peer.public_key,
            last_handshake: peer.last_handshake_at.map(format_epoch),
        }
    }
}

impl TableDisplay for PeerDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "IP", "Status", "Groups", "Public Key", "Last Handshake"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.ip.clone(),
            self.status.clone(),
            self.groups.join(","),
            self.public_key.clone(),
            self.last_handshake.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub fn execute(cmd: PeerCommands, registry: &Registry, format: OutputFormat) -> Result<()> {
    match cmd {
        PeerCommands::List { network, group } => {
            let network_id = match network {
                Some(n) => Some(registry.find_network(&n)?.id),
                None => None,
            };
            let group = group.map(|g| g.parse::<Group>()).transpose()?;

            let displays: Vec<PeerDisplay> = registry
                .list_peers(network_id.as_deref(), group)?
                .into_iter()
                .map(PeerDisplay::from)
                .collect();
            print_list(&displays, format)?;
        }

        PeerCommands::Add { network, name, ip } => {
            let network = registry.find_network(&network)?;
            let peer_id = registry.add_peer(&network.id, &name, ip.as_deref())?;
            let peer = registry.get_peer(&peer_id)?;
            print_success(
                &format!("Peer '{}' added to '{}' at {}", peer.name, network.name, peer.ip),
                format,
            );
            print_item(&PeerDisplay::from(peer), format)?;
        }

        PeerCommands::Remove { network, name } => {
            let network = registry.find_network(&network)?;
            let removed = registry.remove_peer(&network.id, &name)?;
            match format {
                OutputFormat::Json | OutputFormat::Yaml => print_structured(
                    &serde_json::json!({
                        "network": network.name,
                        "peer": name,
                        "removed": removed,
                    }),
                    format,
                )?,
                _ if removed => print_success(
                    &format!("Peer '{}' removed from '{}'", name, network.name),
                    format,
                ),
                _ => println!("Peer '{}' was not in '{}'", name, network.name),
            }
        }
    }

    Ok(())
}
