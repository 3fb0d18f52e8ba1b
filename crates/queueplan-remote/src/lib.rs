//! queueplan-remote: remote planner integration.
//!
//! Talks to an external placement planner over HTTP and keeps it in step
//! with the host queue. The host holds a [`SchedulerFacade`]; a
//! [`ReconciliationLoop`] running on its own task shares the facade's
//! context and exchanges snapshots and solutions with the planner on a
//! fixed period.
//!
//! # Architecture
//!
//! ```text
//!   host ──reconfigure()/current_solution()/score()──▶ SchedulerFacade
//!                                                         │
//!                                          Arc<Mutex<SchedulerContext>>
//!                                                         │
//!   ReconciliationLoop ──tick every 5 s─────────────────▶ │
//!        │                                                ▼
//!        │ capture + encode                     RemoteSchedulerClient
//!        └──────────────▶ PlacementSink                   │
//!                                                    dyn Transport
//!                                                         │
//!                                                  remote planner (HTTP)
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod facade;
pub mod reconcile;
pub mod transport;

pub use client::{ConnectionState, RemoteSchedulerClient};
pub use endpoint::{INFO_RESOURCE, QUEUE_RESOURCE, RemoteEndpoint, SCORE_RESOURCE};
pub use error::{BoxError, RemoteError, RemoteResult};
pub use facade::{SchedulerContext, SchedulerFacade, SharedContext};
pub use reconcile::{
    IntervalTicker, RECONCILE_PERIOD, ReconciliationLoop, TickOutcome, Ticker, solution_changed,
};
pub use transport::{
    DEFAULT_TIMEOUT, HyperTransport, Transport, TransportFuture, TransportRequest,
};
