//! HTTP transport for planner requests.
//!
//! [`Transport`] is the seam between the protocol client and the network:
//! it sends one request and yields the body of a 2xx reply. Anything else
//! (connection failure, timeout, non-2xx status) is a
//! [`RemoteError::Transport`]. The default [`HyperTransport`] speaks plain
//! HTTP/1.1; hosts that need TLS supply their own implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};

/// Content type of queue, solution, and score bodies.
pub const JSON: &str = "application/json";
/// Content type of the info body.
pub const TEXT: &str = "text/plain";

/// Default bound on a single network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const AGENT: &str = concat!("queueplan/", env!("CARGO_PKG_VERSION"));

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = RemoteResult<String>> + Send + 'a>>;

/// One outgoing planner request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub uri: Uri,
    /// Value of the `accept` header.
    pub accept: &'static str,
    /// JSON body for POST and PUT.
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn get(uri: &Uri, accept: &'static str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.clone(),
            accept,
            body: None,
        }
    }

    pub fn with_body(method: Method, uri: &Uri, body: String) -> Self {
        Self {
            method,
            uri: uri.clone(),
            accept: JSON,
            body: Some(body),
        }
    }

    pub fn delete(uri: &Uri) -> Self {
        Self {
            method: Method::DELETE,
            uri: uri.clone(),
            accept: JSON,
            body: None,
        }
    }
}

/// Sends planner requests.
pub trait Transport: Send + Sync {
    /// Send `request`, returning the reply body on a 2xx status.
    fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Plain-HTTP transport backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    /// Create a transport bounding every call by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, request: TransportRequest) -> RemoteResult<String> {
        let method = request.method.clone();
        let uri = request.uri.clone();

        if uri.scheme_str() == Some("https") {
            return Err(RemoteError::transport_msg(format!(
                "{uri}: https requires a TLS-capable transport"
            )));
        }

        let mut builder = http::Request::builder()
            .method(request.method)
            .uri(request.uri)
            .header(ACCEPT, request.accept)
            .header(USER_AGENT, AGENT);
        if request.body.is_some() {
            builder = builder.header(CONTENT_TYPE, JSON);
        }
        let body = Full::new(Bytes::from(request.body.unwrap_or_default()));
        let req = builder
            .body(body)
            .map_err(|e| RemoteError::transport(format!("cannot build {method} {uri}"), e))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| RemoteError::transport(format!("{method} {uri} failed"), e))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| RemoteError::transport(format!("{method} {uri}: reading body failed"), e))?
            .to_bytes();

        debug!(%method, %uri, %status, bytes = bytes.len(), "planner replied");

        if !status.is_success() {
            return Err(RemoteError::transport_msg(format!(
                "{method} {uri} returned {status}"
            )));
        }

        String::from_utf8(bytes.to_vec())
            .map_err(|e| RemoteError::transport(format!("{method} {uri}: body is not UTF-8"), e))
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let label = format!("{} {}", request.method, request.uri);
            match tokio::time::timeout(self.timeout, self.exchange(request)).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::transport_msg(format!(
                    "{label} timed out after {:?}",
                    self.timeout
                ))),
            }
        })
    }
}
