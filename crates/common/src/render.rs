//! Text renderers: peer configuration documents and the topology map

use crate::allocator::AddressAllocator;
use crate::config::RenderConfig;
use crate::keys;
use crate::types::{Network, Peer};
use crate::Result;
use std::net::SocketAddr;
use tracing::warn;

/// Interior width of the topology box
pub const MAP_WIDTH: usize = 40;

/// Label shown when the mapped network does not exist
pub const UNKNOWN_NETWORK: &str = "Unknown";

/// Render a WireGuard-style configuration for a peer.
///
/// `private_key` is whatever the caller supplies; the registry passes a fresh
/// placeholder each call, so it never pairs with the stored public key.
pub fn render_peer_config(
    peer: &Peer,
    network: &Network,
    private_key: &str,
    settings: &RenderConfig,
) -> Result<String> {
    let alloc = AddressAllocator::new(&network.cidr)?;

    if keys::decode_key(&peer.public_key).is_none() {
        warn!("Peer {} has malformed key material", peer.name);
    }

    let endpoint = match &settings.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => alloc
            .nth_host(0)
            .map(|gw| SocketAddr::new(gw, settings.listen_port).to_string())
            .unwrap_or_else(|| format!("{}:{}", peer.ip, settings.listen_port)),
    };

    let dns_line = if settings.dns.is_empty() {
        "# DNS = <unset>".to_string()
    } else {
        format!("DNS = {}", settings.dns.join(", "))
    };

    let config = format!(
r#"# Configuration for {name} on {network}
# Key material below is placeholder data, not a usable key pair.

[Interface]
Address = {ip}/{prefix}
PrivateKey = {private_key}
ListenPort = {listen_port}
{dns_line}

[Peer]
PublicKey = {public_key}
AllowedIPs = {cidr}
Endpoint = {endpoint}
PersistentKeepalive = {keepalive}
"#,
        name = peer.name,
        network = network.name,
        ip = peer.ip,
        prefix = alloc.prefix(),
        private_key = private_key,
        listen_port = settings.listen_port,
        dns_line = dns_line,
        public_key = peer.public_key,
        cidr = network.cidr,
        endpoint = endpoint,
        keepalive = settings.persistent_keepalive,
    );

    Ok(config)
}

fn boxed(content: &str) -> String {
    let clipped: String = content.chars().take(MAP_WIDTH).collect();
    format!("║{:<width$}║", clipped, width = MAP_WIDTH)
}

/// Render a peer list as a fixed-width box, sorted by peer name
pub fn render_topology_map(network: Option<&Network>, peers: &[Peer]) -> String {
    let label = network.map(|n| n.name.as_str()).unwrap_or(UNKNOWN_NETWORK);
    let rule = "═".repeat(MAP_WIDTH);

    let mut sorted: Vec<&Peer> = peers.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = Vec::with_capacity(sorted.len() + 4);
    lines.push(format!("╔{}╗", rule));
    lines.push(boxed(&format!(" Network: {}", label)));
    lines.push(format!("╠{}╣", rule));
    for peer in sorted {
        let glyph = if peer.is_connected() { '●' } else { '○' };
        lines.push(boxed(&format!(" {} {:<16} {:<18}", glyph, peer.name, peer.ip)));
    }
    lines.push(format!("╚{}╝", rule));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeerStatus;

    fn network() -> Network {
        Network {
            id: "n1".to_string(),
            name: "lab".to_string(),
            cidr: "10.20.0.0/16".to_string(),
            description: String::new(),
            created_at: 0,
            peer_count: 2,
        }
    }

    fn peer(name: &str, ip: &str, status: PeerStatus) -> Peer {
        Peer {
            id: format!("id-{}", name),
            network_id: "n1".to_string(),
            name: name.to_string(),
            ip: ip.to_string(),
            public_key: keys::placeholder_key(),
            allowed_ips: format!("{}/32", ip),
            endpoint: None,
            last_handshake_at: None,
            status,
            groups: vec![],
            created_at: 0,
        }
    }

    #[test]
    fn test_config_fields() {
        let p = peer("laptop", "10.20.0.7", PeerStatus::Disconnected);
        let cfg = render_peer_config(&p, &network(), "PRIVATE", &RenderConfig::default()).unwrap();

        assert!(cfg.contains("Address = 10.20.0.7/16\n"));
        assert!(cfg.contains("PrivateKey = PRIVATE\n"));
        assert!(cfg.contains(&format!("PublicKey = {}\n", p.public_key)));
        assert!(cfg.contains("AllowedIPs = 10.20.0.0/16\n"));
        assert!(cfg.contains("Endpoint = 10.20.0.1:51820\n"));
        assert!(cfg.contains("DNS = 8.8.8.8, 8.8.4.4\n"));
        assert!(cfg.contains("PersistentKeepalive = 25\n"));
        assert!(cfg.contains("placeholder"));
    }

    #[test]
    fn test_config_endpoint_override_and_ipv6_default() {
        let p = peer("laptop", "10.20.0.7", PeerStatus::Disconnected);
        let settings = RenderConfig {
            endpoint: Some("vpn.example.net:4500".to_string()),
            ..Default::default()
        };
        let cfg = render_peer_config(&p, &network(), "k", &settings).unwrap();
        assert!(cfg.contains("Endpoint = vpn.example.net:4500\n"));

        let mut v6 = network();
        v6.cidr = "fd00::/64".to_string();
        let p = peer("phone", "fd00::2", PeerStatus::Disconnected);
        let cfg = render_peer_config(&p, &v6, "k", &RenderConfig::default()).unwrap();
        assert!(cfg.contains("Endpoint = [fd00::1]:51820\n"));
        assert!(cfg.contains("Address = fd00::2/64\n"));
    }

    #[test]
    fn test_map_sorted_with_glyphs() {
        let peers = vec![
            peer("zeta", "10.20.0.3", PeerStatus::Disconnected),
            peer("alpha", "10.20.0.2", PeerStatus::Connected),
        ];
        let map = render_topology_map(Some(&network()), &peers);
        let lines: Vec<&str> = map.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("Network: lab"));
        assert!(lines[3].contains("● alpha"));
        assert!(lines[3].contains("10.20.0.2"));
        assert!(lines[4].contains("○ zeta"));
    }

    #[test]
    fn test_map_lines_have_fixed_width() {
        let peers = vec![peer(
            "a-peer-with-a-very-long-name-indeed",
            "10.20.0.2",
            PeerStatus::Connected,
        )];
        let map = render_topology_map(Some(&network()), &peers);
        for line in map.lines() {
            assert_eq!(line.chars().count(), MAP_WIDTH + 2, "misaligned: {:?}", line);
        }
    }

    #[test]
    fn test_map_unknown_network() {
        let map = render_topology_map(None, &[]);
        assert!(map.contains("Network: Unknown"));
        assert_eq!(map.lines().count(), 4);
    }
}
