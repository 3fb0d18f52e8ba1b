//! queueplan-core: data model and wire codec for remote queue planning.
//!
//! Placement of queued work items onto execution nodes is delegated to an
//! external planner reachable over HTTP. This crate holds everything that
//! does not touch the network:
//!
//! - **`model`**: `AssignmentSet`, `QueueSnapshot`, `NodeDescriptor`, `Score`
//! - **`host`**: the narrow read interface the host queue implements
//! - **`codec`**: snapshot capture, JSON encoding, solution/score decoding
//!
//! # Data flow
//!
//! ```text
//! QueueStateProvider ──capture()──▶ QueueSnapshot ─┐
//!                                                  ├─encode()──▶ queue JSON
//! AssignmentSet (cached) ──────────────────────────┘
//!
//! solution JSON ──decode_solution()──▶ AssignmentSet
//! score JSON    ──decode_score()─────▶ Score
//! ```

pub mod codec;
pub mod error;
pub mod host;
pub mod model;

pub use codec::{
    NOT_ASSIGNED, capture, decode_score, decode_solution, encode, encode_score, encode_solution,
};
pub use error::{CodecError, CodecResult};
pub use host::{HostNode, PendingItem, PlacementSink, QueueStateProvider};
pub use model::{AssignmentSet, DEFAULT_PRIORITY, ItemId, NodeDescriptor, QueueItem, QueueSnapshot, Score};
