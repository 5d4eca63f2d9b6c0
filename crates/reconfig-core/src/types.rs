//! Domain types for the reconfiguration controller.
//!
//! `Member` mirrors one entry of the store's members API. Health is not
//! part of the wire format; it is filled in by a prober on every read.

use serde::{Deserialize, Serialize};

/// Port the store serves client and health traffic on.
pub const CLIENT_PORT: u16 = 2379;

/// Legacy client port, still advertised in the endpoint list.
pub const LEGACY_CLIENT_PORT: u16 = 4001;

/// Port the store uses for peer replication traffic.
pub const PEER_PORT: u16 = 2380;

// ── Member ─────────────────────────────────────────────────────────

/// Liveness of a single member, computed fresh on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberHealth {
    /// The member answered its health check with a true flag.
    Healthy,
    /// The member advertises a client URL but failed its health check.
    Unhealthy,
    /// The member has been registered but has not started yet
    /// (no client URL advertised).
    #[default]
    Indeterminate,
}

/// One participant known to the store's membership subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    /// Store-assigned identifier. Absent until the store accepted the member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-assigned label. Empty for a member that has not started.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "peerURLs", default)]
    pub peer_urls: Vec<String>,
    /// Empty for a registered-but-unstarted member.
    #[serde(rename = "clientURLs", default)]
    pub client_urls: Vec<String>,
    #[serde(skip)]
    pub health: MemberHealth,
}

impl Member {
    /// Whether the member has advertised a client endpoint yet.
    pub fn is_started(&self) -> bool {
        !self.client_urls.is_empty()
    }

    /// Identifier used in log lines: the store id if known, else the name.
    pub fn display_id(&self) -> &str {
        match self.id.as_deref() {
            Some(id) => id,
            None => &self.name,
        }
    }
}

// ── Cluster state ──────────────────────────────────────────────────

/// Whether this node is founding a cluster or joining a running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    New,
    Existing,
}

impl ClusterState {
    /// Value the store expects for its initial-cluster-state setting.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::New => "new",
            ClusterState::Existing => "existing",
        }
    }
}

impl std::fmt::Display for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Local identity ─────────────────────────────────────────────────

/// The joining node's own identity, resolved once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Member name registered with the store (the private IP).
    pub name: String,
    pub private_ip: String,
    pub peer_url: String,
    pub client_url: String,
}

impl LocalIdentity {
    /// Derive the identity from the node's private IPv4 address.
    pub fn from_private_ip(ip: &str) -> Self {
        let ip = ip.trim();
        Self {
            name: ip.to_string(),
            private_ip: ip.to_string(),
            peer_url: format!("http://{ip}:{PEER_PORT}"),
            client_url: format!("http://{ip}:{CLIENT_PORT}"),
        }
    }
}

// ── Topology ───────────────────────────────────────────────────────

/// The resolved cloud topology of the node's autoscaling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub group: String,
    /// Load-balancer address in `scheme://host` form, no trailing slash.
    pub load_balancer: String,
    /// Instance addresses of the group, when known.
    pub instances: Vec<String>,
}

impl Topology {
    pub fn new(group: impl Into<String>, load_balancer_dns: &str) -> Self {
        Self {
            group: group.into(),
            load_balancer: normalize_endpoint(load_balancer_dns),
            instances: Vec::new(),
        }
    }

    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.instances = instances;
        self
    }

    /// Base URL of the store's client API behind the load balancer.
    pub fn client_endpoint(&self) -> String {
        format!("{}:{CLIENT_PORT}", self.load_balancer)
    }

    /// Comma-separated list of every client endpoint the store answers on.
    pub fn endpoint_list(&self) -> String {
        [CLIENT_PORT, LEGACY_CLIENT_PORT]
            .iter()
            .map(|port| format!("{}:{port}", self.load_balancer))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Normalize a DNS name or URL to `scheme://host` without a trailing slash.
///
/// Plain HTTP is assumed when no scheme is given.
pub fn normalize_endpoint(dns: &str) -> String {
    let dns = dns.trim();
    let with_scheme = if dns.contains("://") {
        dns.to_string()
    } else {
        format!("http://{dns}")
    };
    with_scheme.trim_end_matches('/').to_string()
}
