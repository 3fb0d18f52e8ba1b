//! Periodic reconciliation with the remote planner.
//!
//! Every tick pulls the planner's solution, signals the host when it
//! changed, caches it, and pushes a fresh queue snapshot back. Ticks never
//! overlap: the next one starts only after the previous body returned.
//! Every failure is absorbed and retried on the next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use queueplan_core::{AssignmentSet, PlacementSink, QueueStateProvider, capture, encode};
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::facade::{SchedulerContext, SharedContext};

/// Fixed period between tick starts.
pub const RECONCILE_PERIOD: Duration = Duration::from_millis(5000);

/// Source of tick timing for the loop.
pub trait Ticker: Send {
    /// Resolve when the next tick is due.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Ticker backed by `tokio::time::interval`.
///
/// The first tick fires immediately. A late tick delays the schedule
/// instead of bursting to catch up.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(RECONCILE_PERIOD)
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            self.interval.tick().await;
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No planner installed.
    Idle,
    /// The solution could not be fetched; nothing was changed.
    FetchFailed,
    /// Solution cached and snapshot pushed.
    Pushed { changed: bool },
    /// Solution cached but the push failed.
    PushFailed { changed: bool },
}

/// Whether the host must re-run placement after a fetch.
///
/// Nothing-cached only equals nothing-fetched; otherwise sets compare
/// structurally.
pub fn solution_changed(previous: Option<&AssignmentSet>, fetched: Option<&AssignmentSet>) -> bool {
    previous != fetched
}

/// Drives reconciliation ticks against the facade's active planner.
pub struct ReconciliationLoop<T: Ticker = IntervalTicker> {
    context: SharedContext,
    provider: Arc<dyn QueueStateProvider>,
    sink: Arc<dyn PlacementSink>,
    ticker: T,
}

impl<T: Ticker> ReconciliationLoop<T> {
    pub fn new(
        context: SharedContext,
        provider: Arc<dyn QueueStateProvider>,
        sink: Arc<dyn PlacementSink>,
        ticker: T,
    ) -> Self {
        Self {
            context,
            provider,
            sink,
            ticker,
        }
    }

    /// Run ticks until `shutdown` fires. An in-flight tick is finished first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("reconciliation loop started");

        loop {
            tokio::select! {
                _ = self.ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("reconciliation loop shutting down");
                    break;
                }
            }

            let outcome = self.tick().await;
            debug!(?outcome, "reconciliation tick finished");
        }
    }

    /// Execute one tick body.
    ///
    /// Holds the context lock throughout, so reconfiguration and solution
    /// queries never observe a half-finished tick.
    pub async fn tick(&self) -> TickOutcome {
        let mut guard = self.context.lock().await;
        let SchedulerContext { client, solution } = &mut *guard;

        let Some(client) = client.as_mut() else {
            return TickOutcome::Idle;
        };

        let fetched = match client.fetch_solution().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(endpoint = %client.endpoint(), error = %e, "solution fetch failed, skipping tick");
                return TickOutcome::FetchFailed;
            }
        };

        let changed = solution_changed(solution.as_ref(), Some(&fetched));
        if changed {
            debug!(endpoint = %client.endpoint(), assignments = fetched.len(), "solution changed");
            self.sink.request_reevaluation();
        }
        let current = solution.insert(fetched);

        let snapshot = capture(self.provider.as_ref());
        let pushed = match encode(&snapshot, current) {
            Ok(body) => client.push(body).await,
            Err(e) => Err(e.into()),
        };

        match pushed {
            Ok(()) => TickOutcome::Pushed { changed },
            Err(e) => {
                warn!(endpoint = %client.endpoint(), error = %e, "queue push failed");
                TickOutcome::PushFailed { changed }
            }
        }
    }
}
