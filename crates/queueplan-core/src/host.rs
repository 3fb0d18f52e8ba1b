//! Host collaborator interfaces.
//!
//! The host queue owns its own bookkeeping. The planner integration only
//! reads it through [`QueueStateProvider`] and pokes it through
//! [`PlacementSink`]; both are implemented by the embedding application.

use crate::model::ItemId;

/// A pending item as the host queue reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub id: ItemId,
    pub display_name: String,
    /// Epoch milliseconds at which the item entered the queue.
    pub in_queue_since: i64,
    /// Label expression restricting where the item may run.
    pub label: Option<String>,
}

/// A node as the host knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNode {
    pub name: String,
    pub executors: u32,
    pub idle_executors: u32,
    /// An executing agent is attached to the node.
    pub connected: bool,
    /// An operator (or the host) marked the node offline.
    pub marked_offline: bool,
    pub accepting_tasks: bool,
}

impl HostNode {
    /// Online means attached, not marked offline, and accepting work.
    pub fn is_online(&self) -> bool {
        self.connected && !self.marked_offline && self.accepting_tasks
    }
}

/// Read access to live queue and node state.
///
/// Called from the reconciliation worker once per tick; implementations
/// must be cheap and must not block on the planner.
pub trait QueueStateProvider: Send + Sync {
    /// Pending items in queue order.
    fn pending_items(&self) -> Vec<PendingItem>;

    /// All nodes known to the host.
    fn nodes(&self) -> Vec<HostNode>;

    /// Members of `label`, or `None` when the host has no member set for it.
    fn label_members(&self, label: &str) -> Option<Vec<HostNode>>;

    /// Why `node` cannot take `item` right now, or `None` if it can.
    fn blocking_reason(&self, item: &PendingItem, node: &HostNode) -> Option<String>;
}

/// Receiver for "placement inputs changed, re-evaluate now" signals.
pub trait PlacementSink: Send + Sync {
    fn request_reevaluation(&self);
}
