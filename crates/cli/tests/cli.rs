//! End-to-end runs of the `meshreg` binary against an isolated store

use std::path::Path;
use std::process::{Command, Output};

fn meshreg(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_meshreg"))
        .arg("--store")
        .arg(store)
        .args(args)
        .env_remove("MESHREG_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("run meshreg")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn status_reports_bootstrapped_network() {
    let dir = tempfile::tempdir().unwrap();
    let out = meshreg(dir.path(), &["status"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("networks: 1"));
    assert!(text.contains("total_peers: 4"));
    assert!(text.contains("connected_peers: 0"));
    assert!(dir.path().join("registry.db").exists());
}

#[test]
fn status_json_is_parseable() {
    let dir = tempfile::tempdir().unwrap();
    let out = meshreg(dir.path(), &["--format", "json", "status"]);
    assert!(out.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["total_peers"], 4);
    assert_eq!(value["networks"][0]["name"], "BlackRoad-Pi");
}

#[test]
fn config_for_known_and_unknown_peer() {
    let dir = tempfile::tempdir().unwrap();

    let out = meshreg(dir.path(), &["config", "alice"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("[Interface]"));
    assert!(text.contains("Address = 10.0.0.3/8"));
    assert!(text.contains("AllowedIPs = 10.0.0.0/8"));

    let out = meshreg(dir.path(), &["config", "aria64"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("Address = 10.0.0.2/8"));

    let out = meshreg(dir.path(), &["config", "ghost"]);
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("Peer ghost not found"));
}

#[test]
fn map_by_name_and_unknown_network() {
    let dir = tempfile::tempdir().unwrap();

    let out = meshreg(dir.path(), &["map", "BlackRoad-Pi"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Network: BlackRoad-Pi"));
    let alice = text.find("alice").unwrap();
    let macbook = text.find("macbook").unwrap();
    assert!(alice < macbook);

    let out = meshreg(dir.path(), &["map", "no-such-network"]);
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
}

#[test]
fn lab_network_exhausts_after_two_peers() {
    let dir = tempfile::tempdir().unwrap();

    let out = meshreg(dir.path(), &["network", "create", "Lab", "--cidr", "10.0.0.0/30"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    for (name, ip) in [("a", "10.0.0.1"), ("b", "10.0.0.2")] {
        let out = meshreg(dir.path(), &["peer", "add", "Lab", name]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
        assert!(stdout(&out).contains(ip));
    }

    let out = meshreg(dir.path(), &["peer", "add", "Lab", "c"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("exhausted"));
}

#[test]
fn groups_filter_peer_list() {
    let dir = tempfile::tempdir().unwrap();

    let out = meshreg(dir.path(), &["group", "assign", "macbook", "admin"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = meshreg(dir.path(), &["--format", "json", "peer", "list", "--group", "admin"]);
    let peers: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(peers.as_array().unwrap().len(), 1);
    assert_eq!(peers[0]["name"], "macbook");

    let out = meshreg(dir.path(), &["group", "assign", "macbook", "root"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Invalid group"));
}

#[test]
fn ping_is_labelled_simulated() {
    let dir = tempfile::tempdir().unwrap();
    let out = meshreg(dir.path(), &["ping", "aria64"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("[simulated]"));
}

#[test]
fn bootstrap_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[bootstrap]\nenabled = false\n").unwrap();

    let out = meshreg(dir.path(), &["status"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("networks: 0"));
}

#[test]
fn version_does_not_touch_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("plain-file");
    std::fs::write(&not_a_dir, "").unwrap();

    let out = meshreg(&not_a_dir, &["version"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).starts_with("meshreg v"));

    let out = meshreg(&not_a_dir, &["status"]);
    assert_eq!(out.status.code(), Some(1));
}
