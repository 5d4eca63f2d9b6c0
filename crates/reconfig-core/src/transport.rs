//! HTTP/1.1 transport shared by the health prober, the membership client
//! and the identity source.
//!
//! Every request carries a bounded timeout covering connect, exchange and
//! body collection. Any failure to obtain a complete response is a
//! `TransportError`; interpreting status codes is left to the caller.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TransportError;

const AGENT: &str = concat!("etcd-reconfig/", env!("CARGO_PKG_VERSION"));

/// A fully collected HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issue a `GET` request.
pub async fn get(url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
    request(Method::GET, url, None, timeout).await
}

/// Issue a request with an optional JSON body.
pub async fn request(
    method: Method,
    url: &str,
    json_body: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    match tokio::time::timeout(timeout, exchange(method, url, json_body)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%url, ?timeout, "request timed out");
            Err(TransportError::Timeout {
                url: url.to_string(),
                timeout,
            })
        }
    }
}

async fn exchange(
    method: Method,
    url: &str,
    json_body: Option<Vec<u8>>,
) -> Result<HttpResponse, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let http_err = |reason: String| TransportError::Http {
        url: url.to_string(),
        reason,
    };

    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
    if uri.scheme_str() != Some("http") {
        return Err(invalid("only plain http endpoints are supported".to_string()));
    }
    let host = uri.host().ok_or_else(|| invalid("missing host".to_string()))?;
    let port = uri.port_u16().unwrap_or(80);
    let addr = format!("{host}:{port}");
    let authority = uri.authority().map(|a| a.as_str()).unwrap_or(host);
    let target = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let stream = tokio::net::TcpStream::connect(&addr)
        .await
        .map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| http_err(format!("handshake: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "connection closed with error");
        }
    });

    let mut builder = Request::builder()
        .method(method.clone())
        .uri(target)
        .header(HOST, authority)
        .header(USER_AGENT, AGENT);
    let body = match json_body {
        Some(bytes) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Full::new(Bytes::from(bytes))
        }
        None => Full::new(Bytes::new()),
    };
    let req = builder.body(body).map_err(|e| invalid(e.to_string()))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| http_err(format!("request: {e}")))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| http_err(format!("body: {e}")))?
        .to_bytes();

    debug!(%method, %url, %status, bytes = body.len(), "http exchange complete");
    Ok(HttpResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned response and hand back the raw request text.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut seen = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
                if n == 0 || seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&seen).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn get_collects_status_and_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 17\r\nConnection: close\r\n\r\n{\"health\":\"true\"}",
        )
        .await;

        let resp = get(&format!("{base}/health"), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.text(), r#"{"health":"true"}"#);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /health HTTP/1.1"));
        assert!(raw.to_lowercase().contains("user-agent: etcd-reconfig/"));
    }

    #[tokio::test]
    async fn non_success_status_is_not_a_transport_error() {
        let (base, _server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let resp = get(&format!("{base}/v2/members/x"), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closed_port_is_connect_error() {
        let err = get("http://127.0.0.1:1/health", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect { .. } | TransportError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let err = get(&format!("http://{addr}/health"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let err = get("https://lb.local:2379/health", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));

        let err = get("not a url", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
