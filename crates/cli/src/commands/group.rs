//! Group Commands

use anyhow::Result;
use clap::Subcommand;

use crate::output::{print_structured, print_success, OutputFormat};
use meshreg_common::{Group, Registry};

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Add a peer to a group (admin, workers, sensors, public, internal)
    Assign {
        /// Peer name
        peer: String,

        /// Group name
        group: String,
    },

    /// Remove a peer from a group
    Unassign {
        /// Peer name
        peer: String,

        /// Group name
        group: String,
    },
}

fn report(peer: &str, groups: &[Group], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_structured(&serde_json::json!({ "peer": peer, "groups": groups }), format)
        }
        _ => {
            let names: Vec<&str> = groups.iter().map(Group::as_str).collect();
            let listed = if names.is_empty() { "(none)".to_string() } else { names.join(", ") };
            print_success(&format!("Peer '{}' groups: {}", peer, listed), format);
            Ok(())
        }
    }
}

pub fn execute(cmd: GroupCommands, registry: &Registry, format: OutputFormat) -> Result<()> {
    match cmd {
        GroupCommands::Assign { peer, group } => {
            let groups = registry.assign_group(&peer, &group)?;
            report(&peer, &groups, format)
        }
        GroupCommands::Unassign { peer, group } => {
            let groups = registry.unassign_group(&peer, &group)?;
            report(&peer, &groups, format)
        }
    }
}
