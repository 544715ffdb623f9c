//! SQLite database for registry state
//!
//! Tables:
//! - networks: mesh networks, unique by name
//! - peers: peers, unique by (network_id, name) and (network_id, ip)
//!
//! Network peer counts are not stored. Every network read counts the peer
//! rows, so the count cannot drift from the rows it describes.

use crate::types::{Group, Network, Peer};
use crate::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on another process holding the write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Database wrapper for state persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self::from_connection(conn)?;
        info!("Opened registry database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS networks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                cidr TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS peers (
                id TEXT PRIMARY KEY,
                network_id TEXT NOT NULL,
                name TEXT NOT NULL,
                ip TEXT NOT NULL,
                public_key TEXT NOT NULL,
                allowed_ips TEXT NOT NULL,
                endpoint TEXT,
                last_handshake_at INTEGER,
                status TEXT NOT NULL DEFAULT 'disconnected',
                groups_json TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                FOREIGN KEY(network_id) REFERENCES networks(id),
                UNIQUE(network_id, name),
                UNIQUE(network_id, ip)
            );
            CREATE INDEX IF NOT EXISTS idx_peers_network ON peers(network_id);
            CREATE INDEX IF NOT EXISTS idx_peers_name ON peers(name);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Run a read-only closure against the connection
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run a closure inside one transaction, committing only on success.
    ///
    /// The connection lock is held for the whole closure, so read-then-write
    /// sequences (address allocation, group updates) cannot interleave. The
    /// transaction takes the SQLite write lock up front, which extends that to
    /// other processes sharing the file.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

// ============================================================================
// Network rows
// ============================================================================

const NETWORK_COLUMNS: &str = "n.id, n.name, n.cidr, n.description, n.created_at, \
     (SELECT COUNT(*) FROM peers p WHERE p.network_id = n.id)";

fn network_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Network> {
    Ok(Network {
        id: row.get(0)?,
        name: row.get(1)?,
        cidr: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        peer_count: row.get::<_, i64>(5)?.max(0) as u64,
    })
}

pub(crate) fn insert_network(conn: &Connection, network: &Network) -> Result<()> {
    conn.execute(
        "INSERT INTO networks (id, name, cidr, description, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            network.id,
            network.name,
            network.cidr,
            network.description,
            network.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn network_by_id(conn: &Connection, id: &str) -> Result<Option<Network>> {
    let network = conn
        .query_row(
            &format!("SELECT {} FROM networks n WHERE n.id = ?1", NETWORK_COLUMNS),
            params![id],
            network_from_row,
        )
        .optional()?;
    Ok(network)
}

pub(crate) fn network_by_name(conn: &Connection, name: &str) -> Result<Option<Network>> {
    let network = conn
        .query_row(
            &format!("SELECT {} FROM networks n WHERE n.name = ?1", NETWORK_COLUMNS),
            params![name],
            network_from_row,
        )
        .optional()?;
    Ok(network)
}

pub(crate) fn list_networks(conn: &Connection) -> Result<Vec<Network>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM networks n ORDER BY n.rowid",
        NETWORK_COLUMNS
    ))?;
    let rows = stmt.query_map([], network_from_row)?;

    let mut networks = Vec::new();
    for row in rows {
        networks.push(row?);
    }
    Ok(networks)
}

// ============================================================================
// Peer rows
// ============================================================================

const PEER_COLUMNS: &str = "id, network_id, name, ip, public_key, allowed_ips, endpoint, \
     last_handshake_at, status, groups_json, created_at";

/// Raw peer row before the JSON group list is parsed
struct RawPeer {
    id: String,
    network_id: String,
    name: String,
    ip: String,
    public_key: String,
    allowed_ips: String,
    endpoint: Option<String>,
    last_handshake_at: Option<i64>,
    status: String,
    groups: String,
    created_at: i64,
}

impl RawPeer {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            network_id: row.get(1)?,
            name: row.get(2)?,
            ip: row.get(3)?,
            public_key: row.get(4)?,
            allowed_ips: row.get(5)?,
            endpoint: row.get(6)?,
            last_handshake_at: row.get(7)?,
            status: row.get(8)?,
            groups: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn parse(self) -> Result<Peer> {
        Ok(Peer {
            id: self.id,
            network_id: self.network_id,
            name: self.name,
            ip: self.ip,
            public_key: self.public_key,
            allowed_ips: self.allowed_ips,
            endpoint: self.endpoint,
            last_handshake_at: self.last_handshake_at,
            status: self.status.parse().unwrap_or_default(),
            groups: serde_json::from_str(&self.groups)?,
            created_at: self.created_at,
        })
    }
}

fn collect_peers(
    rows: impl Iterator<Item = rusqlite::Result<RawPeer>>,
) -> Result<Vec<Peer>> {
    let mut peers = Vec::new();
    for row in rows {
        peers.push(row?.parse()?);
    }
    Ok(peers)
}

pub(crate) fn insert_peer(conn: &Connection, peer: &Peer) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO peers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            PEER_COLUMNS
        ),
        params![
            peer.id,
            peer.network_id,
            peer.name,
            peer.ip,
            peer.public_key,
            peer.allowed_ips,
            peer.endpoint,
            peer.last_handshake_at,
            peer.status.to_string(),
            serde_json::to_string(&peer.groups)?,
            peer.created_at,
        ],
    )?;
    Ok(())
}

/// First peer with this name, in insertion order
pub(crate) fn peer_by_id(conn: &Connection, id: &str) -> Result<Option<Peer>> {
    let raw = conn
        .query_row(
            &format!("SELECT {} FROM peers WHERE id = ?1", PEER_COLUMNS),
            params![id],
            RawPeer::from_row,
        )
        .optional()?;
    raw.map(RawPeer::parse).transpose()
}

pub(crate) fn peer_by_name(conn: &Connection, name: &str) -> Result<Option<Peer>> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {} FROM peers WHERE name = ?1 ORDER BY rowid LIMIT 1",
                PEER_COLUMNS
            ),
            params![name],
            RawPeer::from_row,
        )
        .optional()?;
    raw.map(RawPeer::parse).transpose()
}

pub(crate) fn peer_in_network(
    conn: &Connection,
    network_id: &str,
    name: &str,
) -> Result<Option<Peer>> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {} FROM peers WHERE network_id = ?1 AND name = ?2",
                PEER_COLUMNS
            ),
            params![network_id, name],
            RawPeer::from_row,
        )
        .optional()?;
    raw.map(RawPeer::parse).transpose()
}

pub(crate) fn list_peers(conn: &Connection, network_id: Option<&str>) -> Result<Vec<Peer>> {
    match network_id {
        Some(network_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM peers WHERE network_id = ?1 ORDER BY rowid",
                PEER_COLUMNS
            ))?;
            let rows = stmt.query_map(params![network_id], RawPeer::from_row)?;
            collect_peers(rows)
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM peers ORDER BY rowid",
                PEER_COLUMNS
            ))?;
            let rows = stmt.query_map([], RawPeer::from_row)?;
            collect_peers(rows)
        }
    }
}

/// Every address currently assigned in a network
pub(crate) fn network_ips(conn: &Connection, network_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT ip FROM peers WHERE network_id = ?1")?;
    let rows = stmt.query_map(params![network_id], |row| row.get::<_, String>(0))?;

    let mut ips = Vec::new();
    for row in rows {
        ips.push(row?);
    }
    Ok(ips)
}

pub(crate) fn delete_peer(conn: &Connection, network_id: &str, name: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM peers WHERE network_id = ?1 AND name = ?2",
        params![network_id, name],
    )?;
    Ok(rows > 0)
}

pub(crate) fn set_peer_groups(conn: &Connection, peer_id: &str, groups: &[Group]) -> Result<()> {
    conn.execute(
        "UPDATE peers SET groups_json = ?1 WHERE id = ?2",
        params![serde_json::to_string(groups)?, peer_id],
    )?;
    Ok(())
}

pub(crate) fn mark_connected(conn: &Connection, peer_id: &str, handshake_at: i64) -> Result<()> {
    conn.execute(
        "UPDATE peers SET status = 'connected', last_handshake_at = ?1 WHERE id = ?2",
        params![handshake_at, peer_id],
    )?;
    Ok(())
}

pub(crate) fn count_connected(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM peers WHERE status = 'connected'",
        [],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}
