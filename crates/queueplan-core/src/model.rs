//! Domain types exchanged with the remote planner.
//!
//! Everything here is a plain value. Snapshots and node descriptors are
//! rebuilt from live host state on every reconciliation tick and never
//! persisted; an `AssignmentSet` is replaced wholesale after each fetch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a queued work item, as assigned by the host queue.
pub type ItemId = i64;

/// Priority reported for every queue item.
pub const DEFAULT_PRIORITY: u32 = 50;

// ── Assignments ────────────────────────────────────────────────────

/// Mapping from queued item to the node it should run on.
///
/// An entry can be present but unassigned (`None`), which is distinct from
/// the item being absent. Equality is structural over keys and values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSet {
    entries: BTreeMap<ItemId, Option<String>>,
}

impl AssignmentSet {
    /// An empty set, used to seed a freshly started remote session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assign `item` to `node`, replacing any previous entry.
    pub fn assign(mut self, item: ItemId, node: impl Into<String>) -> Self {
        self.entries.insert(item, Some(node.into()));
        self
    }

    /// Record `item` as known but unassigned.
    pub fn unassign(mut self, item: ItemId) -> Self {
        self.entries.insert(item, None);
        self
    }

    /// Insert an entry in place.
    pub fn insert(&mut self, item: ItemId, node: Option<String>) {
        self.entries.insert(item, node);
    }

    /// Node assigned to `item`, if the item is present and assigned.
    pub fn node_name(&self, item: ItemId) -> Option<&str> {
        self.entries.get(&item).and_then(|n| n.as_deref())
    }

    /// Whether `item` has an entry (assigned or not).
    pub fn contains(&self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending item order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, Option<&str>)> {
        self.entries.iter().map(|(id, node)| (*id, node.as_deref()))
    }
}

impl FromIterator<(ItemId, Option<String>)> for AssignmentSet {
    fn from_iter<I: IntoIterator<Item = (ItemId, Option<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── Queue snapshot ─────────────────────────────────────────────────

/// A node as reported to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub name: String,
    pub executors: u32,
    /// Never exceeds `executors`.
    pub free_executors: u32,
}

impl NodeDescriptor {
    /// Build a descriptor, clamping free executors to the capacity.
    pub fn new(name: impl Into<String>, executors: u32, free_executors: u32) -> Self {
        Self {
            name: name.into(),
            executors,
            free_executors: free_executors.min(executors),
        }
    }
}

/// One pending item with its eligible candidate nodes for this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: ItemId,
    pub priority: u32,
    /// Epoch milliseconds at which the item entered the queue.
    pub in_queue_since: i64,
    pub name: String,
    pub label: Option<String>,
    /// Nodes that passed the eligibility filter, in candidate order.
    pub nodes: Vec<NodeDescriptor>,
}

impl QueueItem {
    /// Whether `node` is among this item's eligible candidates.
    pub fn is_candidate(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n.name == node)
    }
}

/// Ordered pending items, captured fresh from the host each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
}

// ── Score ──────────────────────────────────────────────────────────

/// Opaque planner score. Only its ordering is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(i64);

impl Score {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
