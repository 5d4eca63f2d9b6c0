//! Renders a validated runtime config to its `KEY=value` file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use reconfig_core::{ReconfigError, ReconfigResult};

use crate::runtime_config::RuntimeConfig;

/// Writes runtime configs to a well-known path.
#[derive(Debug, Clone)]
pub struct MetadataEmitter {
    path: PathBuf,
}

impl MetadataEmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render one `KEY=value` line per entry, in insertion order.
    pub fn render(config: &RuntimeConfig) -> String {
        let mut out = String::new();
        for (key, value) in config.entries() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Validate `config` and write it out.
    ///
    /// The file is written to a sibling temp path and renamed into place,
    /// so readers never observe a partial file. Nothing is written when
    /// validation fails.
    pub fn emit(&self, config: &RuntimeConfig) -> ReconfigResult<()> {
        config.validate()?;

        let emit_err = |source: std::io::Error| ReconfigError::Emit {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(emit_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, Self::render(config)).map_err(emit_err)?;
        fs::rename(&tmp, &self.path).map_err(emit_err)?;

        info!(path = ?self.path, keys = config.len(), "runtime config written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    fn new_cluster_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::new();
        config
            .set(keys::ENDPOINTS, "http://lb:2379,http://lb:4001")
            .set(keys::NAME, "10.0.0.5")
            .set(keys::INITIAL_ADVERTISE_PEER_URLS, "http://10.0.0.5:2380")
            .set(keys::ADVERTISE_CLIENT_URLS, "http://10.0.0.5:2379")
            .set(keys::INITIAL_CLUSTER_STATE, "new")
            .set(keys::DISCOVERY, "https://discovery.example/abc");
        config
    }

    #[test]
    fn render_one_line_per_key_in_order() {
        let rendered = MetadataEmitter::render(&new_cluster_config());
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "ETCD_RECONFIG_ENDPOINTS=http://lb:2379,http://lb:4001");
        assert_eq!(lines[4], "ETCD_INITIAL_CLUSTER_STATE=new");
        assert_eq!(lines[5], "ETCD_DISCOVERY=https://discovery.example/abc");
    }

    #[test]
    fn emit_writes_file_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("etcd-reconfig.env");
        let emitter = MetadataEmitter::new(&path);

        emitter.emit(&new_cluster_config()).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, MetadataEmitter::render(&new_cluster_config()));
        assert!(!dir.path().join("run").join("etcd-reconfig.env.tmp").exists());
    }

    #[test]
    fn emit_refuses_incomplete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etcd-reconfig.env");
        let emitter = MetadataEmitter::new(&path);

        let mut config = new_cluster_config();
        config.set(keys::DISCOVERY, "");

        let err = emitter.emit(&config).unwrap_err();
        assert!(matches!(err, ReconfigError::Validation(_)));
        assert!(!path.exists());
    }

    #[test]
    fn emit_refuses_value_that_would_add_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etcd-reconfig.env");
        let emitter = MetadataEmitter::new(&path);

        let mut config = new_cluster_config();
        config.set(keys::DISCOVERY, "seed\nETCD_INITIAL_CLUSTER_STATE=existing");

        let err = emitter.emit(&config).unwrap_err();
        assert!(matches!(err, ReconfigError::Validation(ref m) if m == &vec![keys::DISCOVERY.to_string()]));
        assert!(!path.exists());
    }

    #[test]
    fn emit_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etcd-reconfig.env");
        fs::write(&path, "STALE=1\n").unwrap();

        MetadataEmitter::new(&path)
            .emit(&new_cluster_config())
            .unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("STALE"));
    }
}
