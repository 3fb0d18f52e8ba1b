//! Remote planner protocol client.
//!
//! One client owns one logical session with a planner. The session is a
//! two-state machine:
//!
//! ```text
//!              push() ok (POST)
//! Disconnected ────────────────▶ Running ──┐ push(): PUT, on failure POST
//!      ▲                            │   ◀──┘
//!      └──────── stop() (DELETE) ───┘
//! ```
//!
//! Fetching a solution or score requires `Running` and fails without any
//! network traffic otherwise.

use std::sync::{Arc, LazyLock};

use http::Method;
use queueplan_core::{AssignmentSet, Score, decode_score, decode_solution};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::endpoint::RemoteEndpoint;
use crate::error::{RemoteError, RemoteResult};
use crate::transport::{JSON, TEXT, Transport, TransportRequest};

static INFO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^info: ([^\r\n]*)$").expect("info pattern is valid"));

/// Session state of a [`RemoteSchedulerClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Running,
}

/// Client for a single remote planner session.
pub struct RemoteSchedulerClient {
    endpoint: RemoteEndpoint,
    transport: Arc<dyn Transport>,
    state: ConnectionState,
    /// Name reported by the last successful `validate()`.
    peer_name: Option<String>,
}

impl RemoteSchedulerClient {
    /// Create a client in the `Disconnected` state. No request is sent.
    pub fn new(endpoint: RemoteEndpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
            state: ConnectionState::Disconnected,
            peer_name: None,
        }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ConnectionState::Running
    }

    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// Check that the endpoint is a planner and return its declared name.
    ///
    /// Does not change the session state.
    pub async fn validate(&mut self) -> RemoteResult<String> {
        let body = self
            .transport
            .send(TransportRequest::get(self.endpoint.info(), TEXT))
            .await?;

        let name = parse_info(&body).ok_or_else(|| RemoteError::Protocol {
            message: format!("{} answered info with {body:?}", self.endpoint),
            source: None,
        })?;

        debug!(endpoint = %self.endpoint, peer = %name, "remote planner validated");
        self.peer_name = Some(name.clone());
        Ok(name)
    }

    /// Send an encoded queue snapshot.
    ///
    /// Starts the session (POST) when disconnected. When running, sends an
    /// update (PUT); a failed update is retried once as a fresh start, and
    /// only the retry's failure is reported.
    pub async fn push(&mut self, snapshot: String) -> RemoteResult<()> {
        match self.state {
            ConnectionState::Disconnected => {
                info!(endpoint = %self.endpoint, "starting remote planner");
                self.create(snapshot).await
            }
            ConnectionState::Running => {
                debug!(endpoint = %self.endpoint, "sending queue update");
                let update =
                    TransportRequest::with_body(Method::PUT, self.endpoint.queue(), snapshot.clone());
                match self.transport.send(update).await {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        warn!(endpoint = %self.endpoint, error = %e, "queue update failed, recreating session");
                        self.create(snapshot).await
                    }
                }
            }
        }
    }

    async fn create(&mut self, snapshot: String) -> RemoteResult<()> {
        let request = TransportRequest::with_body(Method::POST, self.endpoint.queue(), snapshot);
        self.transport.send(request).await?;
        self.state = ConnectionState::Running;
        Ok(())
    }

    /// Fetch the planner's current solution.
    pub async fn fetch_solution(&self) -> RemoteResult<AssignmentSet> {
        self.assume_running()?;

        debug!(endpoint = %self.endpoint, "fetching solution");
        let body = self
            .transport
            .send(TransportRequest::get(self.endpoint.queue(), JSON))
            .await?;
        Ok(decode_solution(&body)?)
    }

    /// Fetch the planner's score for its current solution.
    pub async fn fetch_score(&self) -> RemoteResult<Score> {
        self.assume_running()?;

        debug!(endpoint = %self.endpoint, "fetching score");
        let body = self
            .transport
            .send(TransportRequest::get(self.endpoint.score(), JSON))
            .await?;
        Ok(decode_score(&body)?)
    }

    /// End the session.
    ///
    /// A no-op when already disconnected. Otherwise the client is marked
    /// disconnected before the DELETE is sent, so a failed DELETE still
    /// leaves it stopped; the failure is reported all the same.
    pub async fn stop(&mut self) -> RemoteResult<()> {
        if !self.is_running() {
            warn!(endpoint = %self.endpoint, "remote planner already stopped");
            return Ok(());
        }

        info!(endpoint = %self.endpoint, "stopping remote planner");
        self.state = ConnectionState::Disconnected;
        self.transport
            .send(TransportRequest::delete(self.endpoint.queue()))
            .await?;
        Ok(())
    }

    fn assume_running(&self) -> RemoteResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(RemoteError::NotRunning)
        }
    }
}

/// Extract the planner name from an info body.
fn parse_info(body: &str) -> Option<String> {
    let line = body.strip_suffix('\n').unwrap_or(body);
    let line = line.strip_suffix('\r').unwrap_or(line);
    INFO_PATTERN
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
