//! Health probe logic.
//!
//! Performs an HTTP health check against a member's first advertised
//! client URL and reads the store's `{"health": "true"}` answer.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use reconfig_core::transport;
use reconfig_core::{Member, MemberHealth};

/// Path of the store's health endpoint, relative to a client URL.
pub const HEALTH_PATH: &str = "/health";

/// Probes the liveness of a single member.
///
/// Implementations must be total: any failure maps to `Unhealthy`.
#[allow(async_fn_in_trait)]
pub trait HealthProber {
    async fn probe(&self, member: &Member) -> MemberHealth;

    /// Probe every member in order and record the result on each.
    async fn annotate(&self, mut members: Vec<Member>) -> Vec<Member> {
        for member in members.iter_mut() {
            member.health = self.probe(member).await;
        }
        members
    }
}

impl<T: HealthProber + ?Sized> HealthProber for &T {
    async fn probe(&self, member: &Member) -> MemberHealth {
        (**self).probe(member).await
    }
}

/// Prober that calls `GET {client_url}/health`.
#[derive(Debug, Clone)]
pub struct HttpHealthProber {
    timeout: Duration,
}

impl HttpHealthProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HealthProber for HttpHealthProber {
    async fn probe(&self, member: &Member) -> MemberHealth {
        // A registered member that has not started yet has no client URL.
        let Some(client_url) = member.client_urls.first() else {
            debug!(member = %member.display_id(), "no client url, health indeterminate");
            return MemberHealth::Indeterminate;
        };

        let url = format!("{}{HEALTH_PATH}", client_url.trim_end_matches('/'));
        let health = match transport::get(&url, self.timeout).await {
            Ok(resp) if resp.is_success() && health_flag(&resp.body) => MemberHealth::Healthy,
            Ok(resp) => {
                debug!(status = %resp.status, body = %resp.text(), %url, "health check negative");
                MemberHealth::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, %url, "health check failed");
                MemberHealth::Unhealthy
            }
        };

        debug!(member = %member.display_id(), ?health, "member probed");
        health
    }
}

#[derive(Deserialize)]
struct HealthBody {
    health: HealthValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HealthValue {
    Flag(bool),
    Text(String),
}

/// Whether a health response body reports the member as healthy.
///
/// Accepts both `"true"` and `true`; anything else, including a
/// malformed body, is `false`.
pub fn health_flag(body: &[u8]) -> bool {
    match serde_json::from_slice::<HealthBody>(body) {
        Ok(HealthBody {
            health: HealthValue::Flag(flag),
        }) => flag,
        Ok(HealthBody {
            health: HealthValue::Text(text),
        }) => text.trim().eq_ignore_ascii_case("true"),
        Err(_) => false,
    }
}
