//! Status, ping, config and map commands

use anyhow::Result;

use super::network::NetworkDisplay;
use crate::output::{print_list, print_structured, OutputFormat};
use meshreg_common::Registry;

/// `meshreg status`
pub fn status(registry: &Registry, format: OutputFormat) -> Result<()> {
    let report = registry.status()?;

    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        return print_structured(&report, format);
    }

    println!("timestamp: {}", report.timestamp.to_rfc3339());
    println!("networks: {}", report.networks.len());
    println!("total_peers: {}", report.total_peers);
    println!("connected_peers: {}", report.connected_peers);
    if !report.networks.is_empty() {
        println!();
        let displays: Vec<NetworkDisplay> =
            report.networks.into_iter().map(NetworkDisplay::from).collect();
        print_list(&displays, format)?;
    }
    Ok(())
}

/// `meshreg ping <peer>`: hash-based simulation, never a real probe
pub fn ping(registry: &Registry, peer_name: &str, format: OutputFormat) -> Result<()> {
    let report = registry.simulate_reachability(peer_name)?;

    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        return print_structured(&report, format);
    }

    match report.latency_ms {
        Some(ms) if report.reachable => {
            println!("{} ({}) reachable, {} ms [simulated]", report.peer, report.ip, ms)
        }
        _ => println!("{} ({}) unreachable [simulated]", report.peer, report.ip),
    }
    Ok(())
}

/// `meshreg config <peer>`
pub fn config(registry: &Registry, peer_name: &str) -> Result<()> {
    let rendered = registry.render_config(peer_name)?;
    print!("{}", rendered);
    Ok(())
}

/// `meshreg map <network>`: the network must exist
pub fn map(registry: &Registry, network: &str) -> Result<()> {
    let network = registry.find_network(network)?;
    println!("{}", registry.render_topology_map(&network.id)?);
    Ok(())
}
