//! Queue snapshot codec.
//!
//! Translates between the in-process model and the planner's JSON wire
//! format. Host objects are first projected into flat value structs by
//! [`capture`]; encoding is then a structural mapping with no knowledge of
//! the host.
//!
//! # Wire format
//!
//! ```text
//! queue    → {"queue": [{"id", "priority", "inQueueSince", "name",
//!                        "nodes": [{"name", "executors", "freeExecutors"}],
//!                        "assigned": <node name | null>}]}
//! solution ← {"solution": [{"id": <int>, "node": <name | "not-assigned">}]}
//! score    ← {"score": <int>}
//! ```
//!
//! Outgoing JSON is pretty-printed and always carries explicit nulls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::host::{HostNode, PendingItem, QueueStateProvider};
use crate::model::{
    AssignmentSet, DEFAULT_PRIORITY, ItemId, NodeDescriptor, QueueItem, QueueSnapshot, Score,
};

/// Wire sentinel for an unassigned item in a solution message.
///
/// A node literally named `not-assigned` cannot be told apart from it.
pub const NOT_ASSIGNED: &str = "not-assigned";

// ── Wire messages ──────────────────────────────────────────────────

#[derive(Serialize)]
struct QueueMessage<'a> {
    queue: Vec<QueueEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueEntry<'a> {
    id: ItemId,
    priority: u32,
    in_queue_since: i64,
    name: &'a str,
    nodes: &'a [NodeDescriptor],
    assigned: Option<&'a str>,
}

#[derive(Serialize, Deserialize)]
struct SolutionMessage {
    solution: Vec<SolutionEntry>,
}

#[derive(Serialize, Deserialize)]
struct SolutionEntry {
    id: ItemId,
    node: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ScoreMessage {
    score: Score,
}

// ── Snapshot capture ───────────────────────────────────────────────

/// Project live host state into a [`QueueSnapshot`].
///
/// Candidates for an item are the members of its label when the host
/// knows that label, otherwise every node. A candidate is kept only if it
/// is online and the host reports no blocking reason for it.
pub fn capture(provider: &dyn QueueStateProvider) -> QueueSnapshot {
    let all_nodes = provider.nodes();

    let items = provider
        .pending_items()
        .into_iter()
        .map(|item| {
            let members = item
                .label
                .as_deref()
                .and_then(|label| provider.label_members(label));
            let candidates = members.as_deref().unwrap_or(all_nodes.as_slice());
            let nodes = eligible_nodes(provider, &item, candidates);

            QueueItem {
                id: item.id,
                priority: DEFAULT_PRIORITY,
                in_queue_since: item.in_queue_since,
                name: item.display_name,
                label: item.label,
                nodes,
            }
        })
        .collect();

    QueueSnapshot { items }
}

fn eligible_nodes(
    provider: &dyn QueueStateProvider,
    item: &PendingItem,
    candidates: &[HostNode],
) -> Vec<NodeDescriptor> {
    candidates
        .iter()
        .filter(|node| {
            if !node.is_online() {
                return false;
            }
            match provider.blocking_reason(item, node) {
                Some(reason) => {
                    debug!(item = item.id, node = %node.name, %reason, "node cannot take item");
                    false
                }
                None => true,
            }
        })
        .map(|node| NodeDescriptor::new(&node.name, node.executors, node.idle_executors))
        .collect()
}

// ── Encoding ───────────────────────────────────────────────────────

/// Encode a snapshot together with the current assignments.
///
/// An assignment whose node is no longer among the item's candidates is
/// reported as `null`; `assignments` itself is left untouched.
pub fn encode(snapshot: &QueueSnapshot, assignments: &AssignmentSet) -> CodecResult<String> {
    let queue = snapshot
        .items
        .iter()
        .map(|item| QueueEntry {
            id: item.id,
            priority: item.priority,
            in_queue_since: item.in_queue_since,
            name: &item.name,
            nodes: &item.nodes,
            assigned: assignments
                .node_name(item.id)
                .filter(|node| item.is_candidate(node)),
        })
        .collect();

    serde_json::to_string_pretty(&QueueMessage { queue }).map_err(CodecError::Encode)
}

/// Encode assignments the way a planner reports its solution.
pub fn encode_solution(assignments: &AssignmentSet) -> CodecResult<String> {
    let solution = assignments
        .iter()
        .map(|(id, node)| SolutionEntry {
            id,
            node: Some(node.unwrap_or(NOT_ASSIGNED).to_string()),
        })
        .collect();

    serde_json::to_string_pretty(&SolutionMessage { solution }).map_err(CodecError::Encode)
}

/// Encode a score the way a planner reports it.
pub fn encode_score(score: Score) -> CodecResult<String> {
    serde_json::to_string(&ScoreMessage { score }).map_err(CodecError::Encode)
}

// ── Decoding ───────────────────────────────────────────────────────

/// Decode a planner solution message.
///
/// The [`NOT_ASSIGNED`] sentinel (or `null`) decodes to unassigned; any
/// other string is taken verbatim as the node name.
pub fn decode_solution(text: &str) -> CodecResult<AssignmentSet> {
    let message: SolutionMessage = serde_json::from_str(text).map_err(CodecError::Solution)?;

    Ok(message
        .solution
        .into_iter()
        .map(|entry| {
            let node = entry.node.filter(|name| name != NOT_ASSIGNED);
            (entry.id, node)
        })
        .collect())
}

/// Decode a planner score message.
pub fn decode_score(text: &str) -> CodecResult<Score> {
    let message: ScoreMessage = serde_json::from_str(text).map_err(CodecError::Score)?;
    Ok(message.score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StaticProvider {
        items: Vec<PendingItem>,
        nodes: Vec<HostNode>,
        labels: HashMap<String, Vec<HostNode>>,
        blocked: Vec<(ItemId, String)>,
    }

    impl QueueStateProvider for StaticProvider {
        fn pending_items(&self) -> Vec<PendingItem> {
            self.items.clone()
        }

        fn nodes(&self) -> Vec<HostNode> {
            self.nodes.clone()
        }

        fn label_members(&self, label: &str) -> Option<Vec<HostNode>> {
            self.labels.get(label).cloned()
        }

        fn blocking_reason(&self, item: &PendingItem, node: &HostNode) -> Option<String> {
            self.blocked
                .iter()
                .any(|(id, name)| *id == item.id && *name == node.name)
                .then(|| format!("{} is reserved", node.name))
        }
    }

    fn node(name: &str, executors: u32, idle: u32) -> HostNode {
        HostNode {
            name: name.to_string(),
            executors,
            idle_executors: idle,
            connected: true,
            marked_offline: false,
            accepting_tasks: true,
        }
    }

    fn item(id: ItemId, name: &str, since: i64, label: Option<&str>) -> PendingItem {
        PendingItem {
            id,
            display_name: name.to_string(),
            in_queue_since: since,
            label: label.map(str::to_string),
        }
    }

    fn candidate_names(snapshot: &QueueSnapshot, index: usize) -> Vec<&str> {
        snapshot.items[index]
            .nodes
            .iter()
            .map(|n| n.name.as_str())
            .collect()
    }

    #[test]
    fn serializes_single_item() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(2, "Single queue item", 3, Some("master")));
        provider
            .labels
            .insert("master".to_string(), vec![node("master", 2, 1)]);

        let snapshot = capture(&provider);
        let actual = encode(&snapshot, &AssignmentSet::empty()).unwrap();

        let expected = r#"{
  "queue": [
    {
      "id": 2,
      "priority": 50,
      "inQueueSince": 3,
      "name": "Single queue item",
      "nodes": [
        {
          "name": "master",
          "executors": 2,
          "freeExecutors": 1
        }
      ],
      "assigned": null
    }
  ]
}"#;
        assert_eq!(actual, expected);
    }

    #[test]
    fn serializes_several_items_with_assignment() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(2, "Single queue item", 3, Some("master")));
        provider.items.push(item(4, "raven_eap", 5, Some("eap")));
        provider
            .labels
            .insert("master".to_string(), vec![node("master", 2, 1)]);
        provider.labels.insert(
            "eap".to_string(),
            vec![node("slave1", 7, 7), node("slave2", 1, 0)],
        );

        let assignments = AssignmentSet::empty().assign(4, "slave2");
        let actual = encode(&capture(&provider), &assignments).unwrap();

        let expected = r#"{
  "queue": [
    {
      "id": 2,
      "priority": 50,
      "inQueueSince": 3,
      "name": "Single queue item",
      "nodes": [
        {
          "name": "master",
          "executors": 2,
          "freeExecutors": 1
        }
      ],
      "assigned": null
    },
    {
      "id": 4,
      "priority": 50,
      "inQueueSince": 5,
      "name": "raven_eap",
      "nodes": [
        {
          "name": "slave1",
          "executors": 7,
          "freeExecutors": 7
        },
        {
          "name": "slave2",
          "executors": 1,
          "freeExecutors": 0
        }
      ],
      "assigned": "slave2"
    }
  ]
}"#;
        assert_eq!(actual, expected);
    }

    #[test]
    fn unlabeled_item_considers_all_nodes() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(7, "unlabeled", 11, None));
        provider.nodes = vec![node("slave_2:1", 2, 1), node("slave_1:2", 1, 2)];

        let snapshot = capture(&provider);
        assert_eq!(candidate_names(&snapshot, 0), vec!["slave_2:1", "slave_1:2"]);
        assert_eq!(snapshot.items[0].nodes[1].free_executors, 1);
        assert!(snapshot.items[0].label.is_none());
    }

    #[test]
    fn unknown_label_falls_back_to_all_nodes() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(1, "job", 0, Some("nowhere")));
        provider.nodes = vec![node("master", 1, 1)];

        let snapshot = capture(&provider);
        assert_eq!(candidate_names(&snapshot, 0), vec!["master"]);
    }

    #[test]
    fn label_restricts_candidates() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(1, "job", 0, Some("linux")));
        provider.nodes = vec![node("master", 1, 1), node("linux1", 2, 2), node("win1", 2, 2)];
        provider
            .labels
            .insert("linux".to_string(), vec![node("linux1", 2, 2)]);

        let snapshot = capture(&provider);
        assert_eq!(candidate_names(&snapshot, 0), vec!["linux1"]);
    }

    #[test]
    fn offline_nodes_are_excluded() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(1, "job", 0, None));

        let mut detached = node("detached", 1, 1);
        detached.connected = false;
        let mut offline = node("offline", 1, 1);
        offline.marked_offline = true;
        let mut busy = node("draining", 1, 1);
        busy.accepting_tasks = false;

        provider.nodes = vec![detached, node("master", 1, 1), offline, busy];

        let snapshot = capture(&provider);
        assert_eq!(candidate_names(&snapshot, 0), vec!["master"]);
    }

    #[test]
    fn blocked_nodes_are_excluded_per_item() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(1, "first", 0, None));
        provider.items.push(item(2, "second", 0, None));
        provider.nodes = vec![node("master", 1, 1), node("slave1", 1, 1)];
        provider.blocked.push((1, "slave1".to_string()));

        let snapshot = capture(&provider);
        assert_eq!(candidate_names(&snapshot, 0), vec!["master"]);
        assert_eq!(candidate_names(&snapshot, 1), vec!["master", "slave1"]);
    }

    #[test]
    fn stale_assignment_is_reported_as_null() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(1, "job", 0, None));
        let mut gone = node("slave1", 1, 1);
        gone.marked_offline = true;
        provider.nodes = vec![node("master", 1, 1), gone];

        let assignments = AssignmentSet::empty().assign(1, "slave1");
        let text = encode(&capture(&provider), &assignments).unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["queue"][0]["assigned"].is_null());
        // The cached set itself is not rewritten.
        assert_eq!(assignments.node_name(1), Some("slave1"));
    }

    #[test]
    fn empty_queue_encodes_empty_array() {
        let provider = StaticProvider::default();
        let text = encode(&capture(&provider), &AssignmentSet::empty()).unwrap();
        assert_eq!(text, "{\n  \"queue\": []\n}");
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut provider = StaticProvider::default();
        provider.items.push(item(3, "a", 1, None));
        provider.items.push(item(1, "b", 2, None));
        provider.nodes = vec![node("n1", 4, 2), node("n2", 1, 0)];

        let snapshot = capture(&provider);
        let assignments = AssignmentSet::empty().assign(3, "n2").unassign(1);

        let first = encode(&snapshot, &assignments).unwrap();
        let second = encode(&snapshot, &assignments).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deserializes_several_items() {
        let text = r#"{"solution": [
            {"id": 1, "node": "slave1"},
            {"id": 2, "node": "not-assigned"}
        ]}"#;

        let assignments = decode_solution(text).unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments.node_name(1), Some("slave1"));
        assert_eq!(assignments.node_name(2), None);
        assert!(assignments.contains(2));
    }

    #[test]
    fn null_node_decodes_as_unassigned() {
        let assignments = decode_solution(r#"{"solution": [{"id": 5, "node": null}]}"#).unwrap();
        assert!(assignments.contains(5));
        assert_eq!(assignments.node_name(5), None);
    }

    #[test]
    fn malformed_solution_is_rejected() {
        assert!(matches!(
            decode_solution("garbage"),
            Err(CodecError::Solution(_))
        ));
        assert!(matches!(
            decode_solution(r#"{"queue": []}"#),
            Err(CodecError::Solution(_))
        ));
    }

    #[test]
    fn deserializes_scores_in_order() {
        let low = decode_score(r#"{"score": -1}"#).unwrap();
        let zero = decode_score(r#"{"score": 0}"#).unwrap();
        let high = decode_score(r#"{"score": 1}"#).unwrap();

        assert_eq!(low.value(), -1);
        assert!(low < zero && zero < high);
        assert!(matches!(decode_score("{}"), Err(CodecError::Score(_))));
    }

    #[test]
    fn solution_round_trips() {
        let cases = [
            AssignmentSet::empty(),
            AssignmentSet::empty().assign(1, "master"),
            AssignmentSet::empty()
                .assign(1, "slave1")
                .unassign(2)
                .assign(40, "slave_2:1"),
        ];

        for assignments in cases {
            let text = encode_solution(&assignments).unwrap();
            assert_eq!(decode_solution(&text).unwrap(), assignments);
        }
    }

    #[test]
    fn sentinel_node_name_does_not_round_trip() {
        let assignments = AssignmentSet::empty().assign(1, NOT_ASSIGNED);
        let decoded = decode_solution(&encode_solution(&assignments).unwrap()).unwrap();
        assert_eq!(decoded.node_name(1), None);
    }

    #[test]
    fn score_round_trips() {
        let text = encode_score(Score::new(-42)).unwrap();
        assert_eq!(text, r#"{"score":-42}"#);
        assert_eq!(decode_score(&text).unwrap(), Score::new(-42));
    }
}
