//! Cloud topology resolution.

use tracing::debug;

use reconfig_core::{ReconfigResult, Topology};

/// Resolves the autoscaling group's instances and load-balancer address.
#[allow(async_fn_in_trait)]
pub trait TopologyResolver {
    async fn resolve(&self) -> ReconfigResult<Topology>;
}

/// Topology supplied up front by configuration.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    topology: Topology,
}

impl StaticTopology {
    pub fn new(group: impl Into<String>, load_balancer_dns: &str) -> Self {
        Self {
            topology: Topology::new(group, load_balancer_dns),
        }
    }

    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.topology = self.topology.with_instances(instances);
        self
    }

    /// The resolved topology, available without an async call.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

impl TopologyResolver for StaticTopology {
    async fn resolve(&self) -> ReconfigResult<Topology> {
        debug!(
            group = %self.topology.group,
            load_balancer = %self.topology.load_balancer,
            instances = self.topology.instances.len(),
            "topology resolved"
        );
        Ok(self.topology.clone())
    }
}
