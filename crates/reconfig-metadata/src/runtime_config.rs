//! Insertion-ordered runtime configuration with a completeness check.

use reconfig_core::{ClusterState, ReconfigError, ReconfigResult};

use crate::keys;

/// Key/value settings for the store process, in construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    entries: Vec<(String, String)>,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`. Re-binding a key keeps its original position.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cluster state recorded in the config, if any.
    pub fn cluster_state(&self) -> Option<ClusterState> {
        match self.get(keys::INITIAL_CLUSTER_STATE)? {
            "new" => Some(ClusterState::New),
            "existing" => Some(ClusterState::Existing),
            _ => None,
        }
    }

    /// Keys this config must bind, given its cluster state.
    pub fn required_keys(&self) -> Vec<&'static str> {
        let mut required = keys::ALWAYS_REQUIRED.to_vec();
        match self.cluster_state() {
            Some(ClusterState::New) => required.push(keys::DISCOVERY),
            Some(ClusterState::Existing) => required.push(keys::INITIAL_CLUSTER),
            None => {}
        }
        required
    }

    /// Check that every required key is bound and no key has an empty value.
    ///
    /// A value spanning lines would break the one-line-per-key file format
    /// and is rejected too. An unrecognised cluster-state value counts as
    /// missing.
    pub fn validate(&self) -> ReconfigResult<()> {
        let mut missing: Vec<String> = Vec::new();

        for key in self.required_keys() {
            if self.get(key).is_none_or(|v| v.trim().is_empty()) {
                missing.push(key.to_string());
            }
        }
        for (key, value) in self.entries() {
            let unusable = value.trim().is_empty() || value.contains(['\n', '\r']);
            if unusable && !missing.iter().any(|m| m == key) {
                missing.push(key.to_string());
            }
        }
        if self.get(keys::INITIAL_CLUSTER_STATE).is_some()
            && self.cluster_state().is_none()
            && !missing.iter().any(|m| m == keys::INITIAL_CLUSTER_STATE)
        {
            missing.push(keys::INITIAL_CLUSTER_STATE.to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReconfigError::Validation(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RuntimeConfig {
        let mut config = RuntimeConfig::new();
        config
            .set(keys::ENDPOINTS, "http://lb:2379,http://lb:4001")
            .set(keys::NAME, "10.0.0.5")
            .set(keys::INITIAL_ADVERTISE_PEER_URLS, "http://10.0.0.5:2380")
            .set(keys::ADVERTISE_CLIENT_URLS, "http://10.0.0.5:2379");
        config
    }

    #[test]
    fn set_preserves_insertion_order_and_overwrites_in_place() {
        let mut config = base();
        config.set(keys::NAME, "renamed");
        let order: Vec<_> = config.entries().map(|(k, _)| k).collect();
        assert_eq!(
            order,
            vec![
                keys::ENDPOINTS,
                keys::NAME,
                keys::INITIAL_ADVERTISE_PEER_URLS,
                keys::ADVERTISE_CLIENT_URLS
            ]
        );
        assert_eq!(config.get(keys::NAME), Some("renamed"));
    }

    #[test]
    fn new_cluster_requires_discovery() {
        let mut config = base();
        config.set(keys::INITIAL_CLUSTER_STATE, "new");
        match config.validate() {
            Err(ReconfigError::Validation(missing)) => {
                assert_eq!(missing, vec![keys::DISCOVERY.to_string()]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        config.set(keys::DISCOVERY, "https://discovery.etcd.io/3e86b59982e49066c5d813af1c2e2579");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn existing_cluster_requires_initial_cluster() {
        let mut config = base();
        config.set(keys::INITIAL_CLUSTER_STATE, "existing");
        assert!(matches!(
            config.validate(),
            Err(ReconfigError::Validation(ref m)) if m == &vec![keys::INITIAL_CLUSTER.to_string()]
        ));

        config.set(keys::INITIAL_CLUSTER, "10.0.0.5=http://10.0.0.5:2380");
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster_state(), Some(ClusterState::Existing));
    }

    #[test]
    fn empty_values_fail_validation() {
        let mut config = base();
        config
            .set(keys::INITIAL_CLUSTER_STATE, "new")
            .set(keys::DISCOVERY, "seed")
            .set(keys::LISTEN_PEER_URLS, "  ");
        assert!(matches!(
            config.validate(),
            Err(ReconfigError::Validation(ref m)) if m == &vec![keys::LISTEN_PEER_URLS.to_string()]
        ));
    }

    #[test]
    fn missing_cluster_state_is_reported() {
        let config = base();
        assert!(matches!(
            config.validate(),
            Err(ReconfigError::Validation(ref m)) if m == &vec![keys::INITIAL_CLUSTER_STATE.to_string()]
        ));

        let mut config = base();
        config.set(keys::INITIAL_CLUSTER_STATE, "bootstrapping");
        assert!(config.validate().is_err());
    }

    #[test]
    fn multiline_values_fail_validation() {
        let mut config = base();
        config
            .set(keys::INITIAL_CLUSTER_STATE, "new")
            .set(keys::DISCOVERY, "https://discovery.etcd.io/abc\nETCD_NAME=evil");
        assert!(matches!(
            config.validate(),
            Err(ReconfigError::Validation(ref m)) if m == &vec![keys::DISCOVERY.to_string()]
        ));

        config.set(keys::DISCOVERY, "https://discovery.etcd.io/abc\r");
        assert!(config.validate().is_err());
    }
}
