//! Several connections to one store file allocating addresses at once

use meshreg_common::{Database, Registry};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 12;

#[test]
fn parallel_adds_from_separate_connections_get_distinct_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    let setup = Registry::new(Database::open(&path).unwrap());
    let network_id = setup.create_network("Big", "10.8.0.0/24", "").unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let path = path.clone();
            let network_id = network_id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let reg = Registry::new(Database::open(&path)?);
                barrier.wait();
                reg.add_peer(&network_id, &format!("n{}", i), None)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert!(result.is_ok(), "add_peer failed: {:?}", result);
    }

    let peers = setup.list_peers(Some(&network_id), None).unwrap();
    assert_eq!(peers.len(), WRITERS);

    let ips: HashSet<&str> = peers.iter().map(|p| p.ip.as_str()).collect();
    assert_eq!(ips.len(), WRITERS);

    let network = setup.get_network(&network_id).unwrap().unwrap();
    assert_eq!(network.peer_count as usize, WRITERS);
}
