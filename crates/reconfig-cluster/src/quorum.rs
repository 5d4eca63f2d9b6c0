//! Quorum guard: refuses to act on a cluster that has lost quorum.
//!
//! Runs on every read of the member list, whether the list is about to
//! drive evictions or only to derive configuration.

use tracing::{debug, error};

use reconfig_core::{Member, MemberHealth, ReconfigError, ReconfigResult};
use reconfig_health::HealthProber;

use crate::client::MembershipClient;

/// Fewest healthy members that still leave room for automated eviction.
pub const MIN_HEALTHY_MEMBERS: usize = 2;

/// A probed member list that passed the quorum check.
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    members: Vec<Member>,
}

impl ClusterSnapshot {
    /// All members in list order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn healthy(&self) -> impl Iterator<Item = &Member> {
        self.with_health(MemberHealth::Healthy)
    }

    pub fn unhealthy(&self) -> impl Iterator<Item = &Member> {
        self.with_health(MemberHealth::Unhealthy)
    }

    /// Registered members that have not started yet.
    pub fn indeterminate(&self) -> impl Iterator<Item = &Member> {
        self.with_health(MemberHealth::Indeterminate)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn with_health(&self, health: MemberHealth) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.health == health)
    }
}

/// Check a probed member list for irrecoverable quorum loss.
///
/// Only started members (healthy or unhealthy) are counted. When at least
/// two are counted and fewer than two are healthy, evicting anything could
/// finish off the cluster, so the check fails with `ClusterCrash`.
pub fn check_quorum(members: Vec<Member>) -> ReconfigResult<ClusterSnapshot> {
    let snapshot = ClusterSnapshot { members };
    let healthy = snapshot.healthy().count();
    let unhealthy = snapshot.unhealthy().count();
    let counted = healthy + unhealthy;

    if counted >= MIN_HEALTHY_MEMBERS && healthy < MIN_HEALTHY_MEMBERS {
        error!(healthy, unhealthy, "cluster has lost quorum");
        return Err(ReconfigError::ClusterCrash { healthy, counted });
    }

    debug!(
        healthy,
        unhealthy,
        indeterminate = snapshot.indeterminate().count(),
        "quorum check passed"
    );
    Ok(snapshot)
}

/// Probe an already listed member set and run the quorum check on it.
pub async fn guard<P: HealthProber>(
    prober: &P,
    members: Vec<Member>,
) -> ReconfigResult<ClusterSnapshot> {
    let members = prober.annotate(members).await;
    check_quorum(members)
}

/// List, probe and quorum-check the cluster.
///
/// Transport failures propagate; only the first list of a run may treat
/// them as "no cluster yet" (see `classify`).
pub async fn read_cluster<M, P>(membership: &M, prober: &P) -> ReconfigResult<ClusterSnapshot>
where
    M: MembershipClient,
    P: HealthProber,
{
    let members = membership.list().await?;
    guard(prober, members).await
}
