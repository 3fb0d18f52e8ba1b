//! Scheduler facade: the handle the host keeps.
//!
//! The facade owns the shared [`SchedulerContext`]: which planner client is
//! active and the last solution fetched from it. The reconciliation loop
//! works on the same context. Every access goes through one async mutex, so
//! a reconfiguration can never interleave with a tick, and a solution query
//! never sees a solution from a client that has since been replaced.

use std::sync::Arc;

use queueplan_core::{AssignmentSet, PlacementSink, QueueStateProvider, Score, capture, encode};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::RemoteSchedulerClient;
use crate::endpoint::RemoteEndpoint;
use crate::error::{RemoteError, RemoteResult};
use crate::reconcile::{ReconciliationLoop, Ticker};
use crate::transport::Transport;

/// Context shared between the facade and the reconciliation loop.
pub type SharedContext = Arc<Mutex<SchedulerContext>>;

/// The active planner client and its cached solution.
#[derive(Default)]
pub struct SchedulerContext {
    pub(crate) client: Option<RemoteSchedulerClient>,
    /// `None` until the first successful fetch from the active client.
    pub(crate) solution: Option<AssignmentSet>,
}

/// Host-facing entry point to remote planning.
pub struct SchedulerFacade {
    context: SharedContext,
    provider: Arc<dyn QueueStateProvider>,
    transport: Arc<dyn Transport>,
}

impl SchedulerFacade {
    /// Create a facade with no active planner.
    pub fn new(provider: Arc<dyn QueueStateProvider>, transport: Arc<dyn Transport>) -> Self {
        Self {
            context: Arc::new(Mutex::new(SchedulerContext::default())),
            provider,
            transport,
        }
    }

    /// The shared context, for wiring a reconciliation loop.
    pub fn context(&self) -> SharedContext {
        self.context.clone()
    }

    /// Build a reconciliation loop over this facade's context.
    pub fn reconciler<T: Ticker>(
        &self,
        sink: Arc<dyn PlacementSink>,
        ticker: T,
    ) -> ReconciliationLoop<T> {
        ReconciliationLoop::new(self.context(), self.provider.clone(), sink, ticker)
    }

    /// Validate `address` without installing it.
    ///
    /// Returns the planner's declared name. A
    /// [`RemoteError::MalformedAddress`] means no request could be formed;
    /// any other error means the address is unreachable or not a planner.
    pub async fn check(&self, address: &str) -> RemoteResult<String> {
        let endpoint = RemoteEndpoint::parse(address)?;
        RemoteSchedulerClient::new(endpoint, self.transport.clone())
            .validate()
            .await
    }

    /// Switch to the planner at `address`.
    ///
    /// The current planner (if any) is stopped and dropped, and the cached
    /// solution is cleared. The new planner becomes active only once it has
    /// been validated and seeded with an empty assignment set.
    pub async fn reconfigure(&self, address: &str) -> RemoteResult<String> {
        let mut ctx = self.context.lock().await;

        if let Some(mut previous) = ctx.client.take()
            && let Err(e) = previous.stop().await
        {
            warn!(endpoint = %previous.endpoint(), error = %e, "failed stopping previous remote planner");
        }
        ctx.solution = None;

        match self.start(address).await {
            Ok(client) => {
                let name = client.peer_name().unwrap_or_default().to_string();
                info!(endpoint = %client.endpoint(), peer = %name, "remote planner activated");
                ctx.client = Some(client);
                Ok(name)
            }
            Err(e) => {
                warn!(%address, error = %e, "failed starting remote planner");
                Err(e)
            }
        }
    }

    async fn start(&self, address: &str) -> RemoteResult<RemoteSchedulerClient> {
        let endpoint = RemoteEndpoint::parse(address)?;
        let mut client = RemoteSchedulerClient::new(endpoint, self.transport.clone());
        client.validate().await?;

        let snapshot = capture(self.provider.as_ref());
        client
            .push(encode(&snapshot, &AssignmentSet::empty())?)
            .await?;
        Ok(client)
    }

    /// The current placement solution.
    ///
    /// `Ok(None)` means a planner is active but nothing has been fetched
    /// from it yet.
    pub async fn current_solution(&self) -> RemoteResult<Option<AssignmentSet>> {
        let ctx = self.context.lock().await;
        if ctx.client.is_none() {
            return Err(RemoteError::NoActiveScheduler);
        }
        Ok(ctx.solution.clone())
    }

    /// Score of the active planner's current solution.
    pub async fn score(&self) -> RemoteResult<Score> {
        let ctx = self.context.lock().await;
        let client = ctx.client.as_ref().ok_or(RemoteError::NoActiveScheduler)?;
        client.fetch_score().await
    }

    /// Declared name of the active planner.
    pub async fn active_peer(&self) -> Option<String> {
        let ctx = self.context.lock().await;
        ctx.client
            .as_ref()
            .and_then(|c| c.peer_name())
            .map(str::to_string)
    }

    /// Stop and drop the active planner, if any.
    pub async fn shutdown(&self) {
        let mut ctx = self.context.lock().await;
        ctx.solution = None;
        if let Some(mut client) = ctx.client.take() {
            if let Err(e) = client.stop().await {
                warn!(endpoint = %client.endpoint(), error = %e, "failed stopping remote planner");
            }
            info!(endpoint = %client.endpoint(), "remote planner deactivated");
        }
    }
}
