//! reconfig-cluster: membership reconfiguration for a joining node.
//!
//! Decides whether the node founds a new cluster or joins a running one,
//! evicts dead members, registers the node and derives the store's runtime
//! configuration.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── TopologyResolver   → load-balancer endpoints
//!   ├── IdentitySource     → private IP (memoized)
//!   ├── classify()         → NEW | EXISTING(snapshot)
//!   │   └── read_cluster() → list + probe + quorum guard
//!   ├── evict_unhealthy()  → remove, re-list, repeat
//!   ├── join()             → add self
//!   └── MetadataEmitter    → KEY=value file
//! ```
//!
//! # Ordering
//!
//! Classification (and the quorum check it carries) finishes before any
//! eviction, all evictions finish before the self-add, and the initial
//! cluster is derived from a list taken after the self-add.

pub mod classifier;
pub mod client;
pub mod identity;
pub mod orchestrator;
pub mod quorum;
pub mod topology;

pub use classifier::{Classification, classify};
pub use client::{DEFAULT_MEMBERS_PATH, HttpMembershipClient, MembershipClient};
pub use identity::{
    DEFAULT_METADATA_URL, IdentitySource, InstanceMetadataIdentity, StaticIdentity,
};
pub use orchestrator::{Orchestrator, Phase, RunReport, initial_cluster};
pub use quorum::{ClusterSnapshot, MIN_HEALTHY_MEMBERS, check_quorum, read_cluster};
pub use topology::{StaticTopology, TopologyResolver};
