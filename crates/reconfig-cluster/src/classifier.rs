//! Cluster state classifier.
//!
//! A reachable members API means the store already exists, however many
//! members it lists. Only an unreachable API means this node founds the
//! cluster.

use tracing::info;

use reconfig_core::{ClusterState, ReconfigResult};
use reconfig_health::HealthProber;

use crate::client::MembershipClient;
use crate::quorum::{ClusterSnapshot, guard};

/// Outcome of classification.
#[derive(Debug, Clone)]
pub enum Classification {
    /// No members API answered: bootstrap from the discovery seed.
    New,
    /// The members API answered; carries the quorum-checked member list.
    Existing(ClusterSnapshot),
}

impl Classification {
    pub fn state(&self) -> ClusterState {
        match self {
            Classification::New => ClusterState::New,
            Classification::Existing(_) => ClusterState::Existing,
        }
    }
}

/// Classify the cluster as NEW or EXISTING.
///
/// A reachable cluster that has lost quorum fails with `ClusterCrash`
/// rather than being classified.
pub async fn classify<M, P>(membership: &M, prober: &P) -> ReconfigResult<Classification>
where
    M: MembershipClient,
    P: HealthProber,
{
    let members = match membership.list().await {
        Ok(members) => members,
        Err(e) if e.is_unreachable() => {
            info!(error = %e, "members API unreachable, cluster is new");
            return Ok(Classification::New);
        }
        Err(e) => return Err(e),
    };

    let snapshot = guard(prober, members).await?;
    info!(
        members = snapshot.len(),
        healthy = snapshot.healthy().count(),
        unhealthy = snapshot.unhealthy().count(),
        "members API reachable, cluster is existing"
    );
    Ok(Classification::Existing(snapshot))
}
