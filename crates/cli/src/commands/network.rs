//! Network Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::output::{
    format_epoch, print_item, print_list, print_success, OutputFormat, TableDisplay,
};
use meshreg_common::{Network, Registry};

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// List all networks
    List,

    /// Create a new network
    Create {
        /// Network name
        name: String,

        /// CIDR notation (e.g., 10.42.0.0/24)
        #[arg(long)]
        cidr: String,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },
}

/// Network display wrapper for serialization
#[derive(Serialize)]
pub struct NetworkDisplay {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub peers: u64,
    pub description: String,
    pub created_at: String,
}

impl From<Network> for NetworkDisplay {
    fn from(net: Network) -> Self {
        Self {
            id: net.id,
            name: net.name,
            cidr: net.cidr,
            peers: net.peer_count,
            description: net.description,
            created_at: format_epoch(net.created_at),
        }
    }
}

impl TableDisplay for NetworkDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "CIDR", "Peers", "Description", "Created"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.cidr.clone(),
            self.peers.to_string(),
            self.description.clone(),
            self.created_at.clone(),
        ]
    }
}

pub fn execute(cmd: NetworkCommands, registry: &Registry, format: OutputFormat) -> Result<()> {
    match cmd {
        NetworkCommands::List => {
            let displays: Vec<NetworkDisplay> = registry
                .list_networks()?
                .into_iter()
                .map(NetworkDisplay::from)
                .collect();
            print_list(&displays, format)?;
        }

        NetworkCommands::Create {
            name,
            cidr,
            description,
        } => {
            let id = registry.create_network(&name, &cidr, &description)?;
            let net = registry.find_network(&id)?;
            print_success(&format!("Network '{}' created", net.name), format);
            print_item(&NetworkDisplay::from(net), format)?;
        }
    }

    Ok(())
}
