//! File-backed host adapter.
//!
//! Describes a queue and its nodes in TOML so the daemon can drive a
//! planner without an embedding build server:
//!
//! ```toml
//! [[items]]
//! id = 2
//! name = "nightly"
//! in_queue_since = 1700000000000
//! label = "linux"
//! blocked_on = ["slave2"]
//!
//! [[nodes]]
//! name = "slave1"
//! executors = 4
//! idle = 2
//! labels = ["linux"]
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use queueplan_core::{HostNode, ItemId, PendingItem, PlacementSink, QueueStateProvider};
use serde::Deserialize;
use tracing::info;

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostState {
    pub items: Vec<ItemEntry>,
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemEntry {
    pub id: ItemId,
    pub name: String,
    pub in_queue_since: i64,
    pub label: Option<String>,
    /// Nodes that refuse this item.
    #[serde(default)]
    pub blocked_on: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    pub executors: u32,
    pub idle: u32,
    #[serde(default = "yes")]
    pub connected: bool,
    #[serde(default)]
    pub offline: bool,
    #[serde(default = "yes")]
    pub accepting_tasks: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl NodeEntry {
    fn to_host_node(&self) -> HostNode {
        HostNode {
            name: self.name.clone(),
            executors: self.executors,
            idle_executors: self.idle,
            connected: self.connected,
            marked_offline: self.offline,
            accepting_tasks: self.accepting_tasks,
        }
    }

    fn has_label(&self, label: &str) -> bool {
        self.name == label || self.labels.iter().any(|l| l == label)
    }
}

impl HostState {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read host state {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse host state {}", path.display()))
    }
}

impl QueueStateProvider for HostState {
    fn pending_items(&self) -> Vec<PendingItem> {
        self.items
            .iter()
            .map(|item| PendingItem {
                id: item.id,
                display_name: item.name.clone(),
                in_queue_since: item.in_queue_since,
                label: item.label.clone(),
            })
            .collect()
    }

    fn nodes(&self) -> Vec<HostNode> {
        self.nodes.iter().map(NodeEntry::to_host_node).collect()
    }

    /// Every label resolves; a label no node carries has no members.
    fn label_members(&self, label: &str) -> Option<Vec<HostNode>> {
        Some(
            self.nodes
                .iter()
                .filter(|n| n.has_label(label))
                .map(NodeEntry::to_host_node)
                .collect(),
        )
    }

    fn blocking_reason(&self, item: &PendingItem, node: &HostNode) -> Option<String> {
        self.items
            .iter()
            .find(|i| i.id == item.id)
            .filter(|i| i.blocked_on.contains(&node.name))
            .map(|i| format!("{} is blocked on {}", i.name, node.name))
    }
}

/// Placement sink that logs and counts re-evaluation requests.
#[derive(Debug, Default)]
pub struct LoggingSink {
    requests: AtomicU64,
}

impl LoggingSink {
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl PlacementSink for LoggingSink {
    fn request_reevaluation(&self) {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        info!(requests = n, "placement re-evaluation requested");
    }
}
