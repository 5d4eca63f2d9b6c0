//! Membership client: list, add and remove members through the store's
//! members API.

use std::time::Duration;

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use reconfig_core::transport::{self, HttpResponse};
use reconfig_core::{Member, MembershipError, ReconfigError, ReconfigResult, TransportError};

/// Default path of the members API under a client endpoint.
pub const DEFAULT_MEMBERS_PATH: &str = "/v2/members";

/// Operations against the store's authoritative membership list.
///
/// Every mutating call changes state shared with peer controllers, so
/// callers re-list after a removal before deciding on the next one.
#[allow(async_fn_in_trait)]
pub trait MembershipClient {
    /// Current members, health not yet probed.
    async fn list(&self) -> ReconfigResult<Vec<Member>>;

    /// Register a new member. Rejections surface as `Membership` errors.
    async fn add(&self, name: &str, peer_url: &str) -> ReconfigResult<Member>;

    /// Remove a member by id. An unknown id is a `Membership` error.
    async fn remove(&self, id: &str) -> ReconfigResult<()>;
}

impl<T: MembershipClient + ?Sized> MembershipClient for &T {
    async fn list(&self) -> ReconfigResult<Vec<Member>> {
        (**self).list().await
    }

    async fn add(&self, name: &str, peer_url: &str) -> ReconfigResult<Member> {
        (**self).add(name, peer_url).await
    }

    async fn remove(&self, id: &str) -> ReconfigResult<()> {
        (**self).remove(id).await
    }
}

#[derive(Deserialize)]
struct MemberList {
    #[serde(default)]
    members: Option<Vec<Member>>,
}

#[derive(Serialize)]
struct AddMemberRequest<'a> {
    name: &'a str,
    #[serde(rename = "peerURLs")]
    peer_urls: [&'a str; 1],
}

#[derive(Deserialize)]
struct Rejection {
    message: String,
}

/// HTTP client for the members API behind the cluster's load balancer.
#[derive(Debug, Clone)]
pub struct HttpMembershipClient {
    members_url: String,
    timeout: Duration,
}

impl HttpMembershipClient {
    /// Create a client for `client_endpoint` (e.g. `http://lb:2379`).
    pub fn new(client_endpoint: &str, timeout: Duration) -> Self {
        Self {
            members_url: format!(
                "{}{DEFAULT_MEMBERS_PATH}",
                client_endpoint.trim_end_matches('/')
            ),
            timeout,
        }
    }

    /// Use a non-default members API path.
    pub fn with_members_path(mut self, path: &str) -> Self {
        let base = self
            .members_url
            .strip_suffix(DEFAULT_MEMBERS_PATH)
            .unwrap_or(&self.members_url)
            .to_string();
        self.members_url = format!("{base}/{}", path.trim_matches('/'));
        self
    }

    pub fn members_url(&self) -> &str {
        &self.members_url
    }

    fn protocol_error(&self, url: &str, e: serde_json::Error) -> ReconfigError {
        ReconfigError::Protocol {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Turn a non-success response into the store's rejection reason.
fn rejection(resp: &HttpResponse) -> MembershipError {
    let reason = match resp.json::<Rejection>() {
        Ok(r) => r.message,
        Err(_) => {
            let text = resp.text();
            let text = text.trim();
            if text.is_empty() {
                resp.status
                    .canonical_reason()
                    .unwrap_or("rejected")
                    .to_string()
            } else {
                text.to_string()
            }
        }
    };
    MembershipError {
        status: resp.status.as_u16(),
        reason,
    }
}

/// Statuses a load balancer answers with when no backend is in service.
fn is_gateway_unavailable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

impl MembershipClient for HttpMembershipClient {
    async fn list(&self) -> ReconfigResult<Vec<Member>> {
        let resp = transport::get(&self.members_url, self.timeout).await?;

        if is_gateway_unavailable(resp.status) {
            return Err(TransportError::Unavailable {
                url: self.members_url.clone(),
                status: resp.status.as_u16(),
            }
            .into());
        }
        if !resp.is_success() {
            return Err(rejection(&resp).into());
        }

        let list: MemberList = resp
            .json()
            .map_err(|e| self.protocol_error(&self.members_url, e))?;
        let members = list.members.unwrap_or_default();
        debug!(count = members.len(), url = %self.members_url, "members listed");
        Ok(members)
    }

    async fn add(&self, name: &str, peer_url: &str) -> ReconfigResult<Member> {
        let body = serde_json::to_vec(&AddMemberRequest {
            name,
            peer_urls: [peer_url],
        })
        .map_err(|e| self.protocol_error(&self.members_url, e))?;

        let resp =
            transport::request(Method::POST, &self.members_url, Some(body), self.timeout).await?;
        if !resp.is_success() {
            return Err(rejection(&resp).into());
        }

        let member: Member = resp
            .json()
            .map_err(|e| self.protocol_error(&self.members_url, e))?;
        info!(%name, %peer_url, id = %member.display_id(), "member added");
        Ok(member)
    }

    async fn remove(&self, id: &str) -> ReconfigResult<()> {
        let url = format!("{}/{id}", self.members_url);
        let resp = transport::request(Method::DELETE, &url, None, self.timeout).await?;
        if !resp.is_success() {
            return Err(rejection(&resp).into());
        }
        info!(%id, "member removed");
        Ok(())
    }
}
