//! Local identity sources: where the node learns its private address.

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

use reconfig_core::transport;
use reconfig_core::{ReconfigError, ReconfigResult};

/// Instance metadata path for the private IPv4 address.
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/local-ipv4";

/// Returns the node's private IPv4 address.
#[allow(async_fn_in_trait)]
pub trait IdentitySource {
    async fn private_ipv4(&self) -> ReconfigResult<String>;
}

impl<T: IdentitySource + ?Sized> IdentitySource for &T {
    async fn private_ipv4(&self) -> ReconfigResult<String> {
        (**self).private_ipv4().await
    }
}

/// Reads the private address from the cloud instance metadata service.
#[derive(Debug, Clone)]
pub struct InstanceMetadataIdentity {
    url: String,
    timeout: Duration,
}

impl InstanceMetadataIdentity {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl IdentitySource for InstanceMetadataIdentity {
    async fn private_ipv4(&self) -> ReconfigResult<String> {
        let resp = transport::get(&self.url, self.timeout)
            .await
            .map_err(|e| ReconfigError::Identity(e.to_string()))?;
        if !resp.is_success() {
            return Err(ReconfigError::Identity(format!(
                "{} answered {}",
                self.url, resp.status
            )));
        }
        let ip = parse_ipv4(&resp.text())?;
        debug!(%ip, url = %self.url, "private address from instance metadata");
        Ok(ip)
    }
}

/// Private address given explicitly on the command line.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    ip: String,
}

impl StaticIdentity {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

impl IdentitySource for StaticIdentity {
    async fn private_ipv4(&self) -> ReconfigResult<String> {
        parse_ipv4(&self.ip)
    }
}

fn parse_ipv4(raw: &str) -> ReconfigResult<String> {
    let raw = raw.trim();
    raw.parse::<Ipv4Addr>()
        .map(|ip| ip.to_string())
        .map_err(|_| ReconfigError::Identity(format!("not an IPv4 address: {raw:?}")))
}
