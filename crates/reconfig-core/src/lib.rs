//! reconfig-core: shared model for the etcd-reconfig controller.
//!
//! Holds the member model returned by the store's membership endpoint,
//! the cluster-state and local-identity types threaded through one
//! orchestration pass, the error taxonomy, and the HTTP/1.1 transport
//! every network call goes through.
//!
//! # Architecture
//!
//! ```text
//! reconfig-core
//!   ├── types      Member, MemberHealth, ClusterState, LocalIdentity, Topology
//!   ├── error      TransportError, MembershipError, ReconfigError
//!   ├── transport  bounded-timeout HTTP request over hyper
//!   └── duration   "5s" / "500ms" / "1m" parsing for CLI flags
//! ```

pub mod duration;
pub mod error;
pub mod transport;
pub mod types;

pub use duration::parse_duration;
pub use error::{MembershipError, ReconfigError, ReconfigResult, TransportError};
pub use transport::HttpResponse;
pub use types::*;
