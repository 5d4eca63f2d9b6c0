//! Configuration keys understood by the store's launcher.

/// Comma-separated client endpoints of the cluster (load balancer).
pub const ENDPOINTS: &str = "ETCD_RECONFIG_ENDPOINTS";
pub const NAME: &str = "ETCD_NAME";
pub const INITIAL_ADVERTISE_PEER_URLS: &str = "ETCD_INITIAL_ADVERTISE_PEER_URLS";
pub const ADVERTISE_CLIENT_URLS: &str = "ETCD_ADVERTISE_CLIENT_URLS";
pub const LISTEN_PEER_URLS: &str = "ETCD_LISTEN_PEER_URLS";
pub const LISTEN_CLIENT_URLS: &str = "ETCD_LISTEN_CLIENT_URLS";
pub const INITIAL_CLUSTER_STATE: &str = "ETCD_INITIAL_CLUSTER_STATE";
pub const INITIAL_CLUSTER: &str = "ETCD_INITIAL_CLUSTER";
pub const DISCOVERY: &str = "ETCD_DISCOVERY";

/// Keys every runtime config must carry.
pub const ALWAYS_REQUIRED: &[&str] = &[
    ENDPOINTS,
    NAME,
    INITIAL_ADVERTISE_PEER_URLS,
    ADVERTISE_CLIENT_URLS,
    INITIAL_CLUSTER_STATE,
];
