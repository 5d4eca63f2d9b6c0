//! Reconfiguration orchestrator: one pass per node boot.
//!
//! ```text
//! Start → Classified(NEW)      ─────────────────────→ ConfigBuilt → Done
//! Start → Classified(EXISTING) → Cleaned → Joined ──→ ConfigBuilt → Done
//! ```
//!
//! Any `ClusterCrash`, rejected join, transport failure after
//! classification, or incomplete config ends the pass with an error and
//! nothing is written.

use std::collections::HashSet;

use tracing::{info, warn};

use reconfig_core::{
    CLIENT_PORT, ClusterState, LEGACY_CLIENT_PORT, LocalIdentity, Member, PEER_PORT,
    ReconfigError, ReconfigResult, Topology,
};
use reconfig_health::HealthProber;
use reconfig_metadata::{MetadataEmitter, RuntimeConfig, keys};

use crate::classifier::{Classification, classify};
use crate::client::MembershipClient;
use crate::identity::IdentitySource;
use crate::quorum::{ClusterSnapshot, read_cluster};
use crate::topology::TopologyResolver;

/// States of an orchestration pass, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Classified(ClusterState),
    Cleaned,
    Joined,
    ConfigBuilt,
    Done,
}

/// What a successful pass did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: ClusterState,
    /// Ids removed from the cluster.
    pub evicted: Vec<String>,
    /// Ids the store reported as already gone when removing them.
    pub skipped: Vec<String>,
    /// The member entry created for this node.
    pub joined: Option<Member>,
    pub config: RuntimeConfig,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Default)]
struct Eviction {
    evicted: Vec<String>,
    skipped: Vec<String>,
}

/// Drives classification, eviction, self-registration and config emission.
pub struct Orchestrator<M, P, T, I> {
    membership: M,
    prober: P,
    topology: T,
    identity: I,
    local: Option<LocalIdentity>,
    discovery_seed: Option<String>,
    phases: Vec<Phase>,
}

impl<M, P, T, I> Orchestrator<M, P, T, I>
where
    M: MembershipClient,
    P: HealthProber,
    T: TopologyResolver,
    I: IdentitySource,
{
    pub fn new(membership: M, prober: P, topology: T, identity: I) -> Self {
        Self {
            membership,
            prober,
            topology,
            identity,
            local: None,
            discovery_seed: None,
            phases: Vec::new(),
        }
    }

    /// Discovery seed used when this node founds the cluster.
    pub fn with_discovery_seed(mut self, seed: Option<String>) -> Self {
        self.discovery_seed = seed;
        self
    }

    /// This node's identity, fetched from the identity source on first use.
    pub async fn local_identity(&mut self) -> ReconfigResult<LocalIdentity> {
        if let Some(local) = &self.local {
            return Ok(local.clone());
        }
        let ip = self.identity.private_ipv4().await?;
        let local = LocalIdentity::from_private_ip(&ip);
        info!(name = %local.name, peer_url = %local.peer_url, "local identity resolved");
        self.local = Some(local.clone());
        Ok(local)
    }

    /// Run one full pass and write the runtime config through `emitter`.
    pub async fn run(&mut self, emitter: &MetadataEmitter) -> ReconfigResult<RunReport> {
        self.phases.clear();
        self.enter(Phase::Start);

        let topology = self.topology.resolve().await?;
        let local = self.local_identity().await?;

        let classification = classify(&self.membership, &self.prober).await?;
        let state = classification.state();
        self.enter(Phase::Classified(state));

        let (config, eviction, joined) = match classification {
            Classification::New => {
                let config = self.new_cluster_config(&topology, &local);
                (config, Eviction::default(), None)
            }
            Classification::Existing(snapshot) => {
                let eviction = self.evict_unhealthy(snapshot).await?;
                self.enter(Phase::Cleaned);

                let joined = self.join(&local).await?;
                self.enter(Phase::Joined);

                let after_join = read_cluster(&self.membership, &self.prober).await?;
                let config = existing_cluster_config(&topology, &local, &after_join);
                (config, eviction, Some(joined))
            }
        };
        self.enter(Phase::ConfigBuilt);

        emitter.emit(&config)?;
        self.enter(Phase::Done);

        Ok(RunReport {
            state,
            evicted: eviction.evicted,
            skipped: eviction.skipped,
            joined,
            config,
            phases: std::mem::take(&mut self.phases),
        })
    }

    fn enter(&mut self, phase: Phase) {
        info!(?phase, "reconfiguration phase");
        self.phases.push(phase);
    }

    /// Remove every unhealthy member, one at a time.
    ///
    /// The list is re-read (and quorum re-checked) after every removal
    /// attempt, since peer controllers may be evicting concurrently. A
    /// removal rejected because the member is already gone is logged and
    /// skipped; each id is attempted at most once. Any other rejection or
    /// transport failure aborts the pass.
    async fn evict_unhealthy(&self, mut snapshot: ClusterSnapshot) -> ReconfigResult<Eviction> {
        let mut attempted: HashSet<String> = HashSet::new();
        let mut eviction = Eviction::default();

        loop {
            let next = snapshot
                .unhealthy()
                .filter_map(|m| m.id.clone())
                .find(|id| !attempted.contains(id));
            let Some(id) = next else {
                break;
            };
            attempted.insert(id.clone());

            match self.membership.remove(&id).await {
                Ok(()) => {
                    info!(member_id = %id, "evicted unhealthy member");
                    eviction.evicted.push(id);
                }
                Err(ReconfigError::Membership(e)) if e.is_stale_member() => {
                    warn!(member_id = %id, error = %e, "member already gone, skipping");
                    eviction.skipped.push(id);
                }
                Err(e) => return Err(e),
            }

            snapshot = read_cluster(&self.membership, &self.prober).await?;
        }

        Ok(eviction)
    }

    /// Register this node as a new member. Any rejection is fatal.
    async fn join(&self, local: &LocalIdentity) -> ReconfigResult<Member> {
        let member = self.membership.add(&local.name, &local.peer_url).await?;
        info!(
            name = %local.name,
            member_id = %member.display_id(),
            peer_url = %local.peer_url,
            "registered local node as member"
        );
        Ok(member)
    }

    fn new_cluster_config(&self, topology: &Topology, local: &LocalIdentity) -> RuntimeConfig {
        let mut config = base_config(topology, local, ClusterState::New);
        config.set(
            keys::DISCOVERY,
            self.discovery_seed.clone().unwrap_or_default(),
        );
        config
    }
}

fn base_config(topology: &Topology, local: &LocalIdentity, state: ClusterState) -> RuntimeConfig {
    let mut config = RuntimeConfig::new();
    config
        .set(keys::ENDPOINTS, topology.endpoint_list())
        .set(keys::NAME, &local.name)
        .set(keys::INITIAL_ADVERTISE_PEER_URLS, &local.peer_url)
        .set(keys::ADVERTISE_CLIENT_URLS, &local.client_url)
        .set(keys::LISTEN_PEER_URLS, format!("http://0.0.0.0:{PEER_PORT}"))
        .set(
            keys::LISTEN_CLIENT_URLS,
            format!("http://0.0.0.0:{CLIENT_PORT},http://0.0.0.0:{LEGACY_CLIENT_PORT}"),
        )
        .set(keys::INITIAL_CLUSTER_STATE, state.as_str());
    config
}

fn existing_cluster_config(
    topology: &Topology,
    local: &LocalIdentity,
    after_join: &ClusterSnapshot,
) -> RuntimeConfig {
    let members = after_join.members();
    if !members
        .iter()
        .any(|m| m.peer_urls.iter().any(|u| u == &local.peer_url))
    {
        warn!(peer_url = %local.peer_url, "local node missing from post-join member list");
    }

    let mut config = base_config(topology, local, ClusterState::Existing);
    config.set(keys::INITIAL_CLUSTER, initial_cluster(members, local));
    config
}

/// Render `name=peer_url` pairs for every member, in list order.
///
/// A member that has not started has no name yet; the local node's entry
/// is labelled with the local name, any other with its store id.
pub fn initial_cluster(members: &[Member], local: &LocalIdentity) -> String {
    members
        .iter()
        .flat_map(|member| {
            let label = member_label(member, local);
            member
                .peer_urls
                .iter()
                .map(move |url| format!("{label}={url}"))
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn member_label<'a>(member: &'a Member, local: &'a LocalIdentity) -> &'a str {
    if !member.name.is_empty() {
        &member.name
    } else if member.peer_urls.iter().any(|u| u == &local.peer_url) {
        &local.name
    } else {
        member.display_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconfig_core::MemberHealth;

    fn started(id: &str, ip: &str) -> Member {
        Member {
            id: Some(id.to_string()),
            name: ip.to_string(),
            peer_urls: vec![format!("http://{ip}:2380")],
            client_urls: vec![format!("http://{ip}:2379")],
            health: MemberHealth::Healthy,
        }
    }

    #[test]
    fn initial_cluster_labels_unstarted_self_with_local_name() {
        let local = LocalIdentity::from_private_ip("10.0.0.9");
        let joined = Member {
            id: Some("f00".to_string()),
            name: String::new(),
            peer_urls: vec![local.peer_url.clone()],
            client_urls: Vec::new(),
            health: MemberHealth::Indeterminate,
        };
        let members = vec![started("a1", "10.0.0.1"), joined];

        assert_eq!(
            initial_cluster(&members, &local),
            "10.0.0.1=http://10.0.0.1:2380,10.0.0.9=http://10.0.0.9:2380"
        );
    }

    #[test]
    fn initial_cluster_falls_back_to_id_for_foreign_unstarted_member() {
        let local = LocalIdentity::from_private_ip("10.0.0.9");
        let other = Member {
            id: Some("b2".to_string()),
            name: String::new(),
            peer_urls: vec!["http://10.0.0.7:2380".to_string()],
            client_urls: Vec::new(),
            health: MemberHealth::Indeterminate,
        };
        assert_eq!(
            initial_cluster(&[other], &local),
            "b2=http://10.0.0.7:2380"
        );
    }

    #[test]
    fn initial_cluster_lists_every_peer_url() {
        let local = LocalIdentity::from_private_ip("10.0.0.9");
        let mut member = started("a1", "10.0.0.1");
        member.peer_urls.push("http://10.0.1.1:2380".to_string());
        assert_eq!(
            initial_cluster(&[member], &local),
            "10.0.0.1=http://10.0.0.1:2380,10.0.0.1=http://10.0.1.1:2380"
        );
    }

    #[test]
    fn base_config_key_order() {
        let topology = Topology::new("asg", "lb.local");
        let local = LocalIdentity::from_private_ip("10.0.0.9");
        let config = base_config(&topology, &local, ClusterState::New);
        let order: Vec<_> = config.entries().map(|(k, _)| k).collect();
        assert_eq!(
            order,
            vec![
                keys::ENDPOINTS,
                keys::NAME,
                keys::INITIAL_ADVERTISE_PEER_URLS,
                keys::ADVERTISE_CLIENT_URLS,
                keys::LISTEN_PEER_URLS,
                keys::LISTEN_CLIENT_URLS,
                keys::INITIAL_CLUSTER_STATE,
            ]
        );
        assert_eq!(config.get(keys::INITIAL_CLUSTER_STATE), Some("new"));
    }
}
