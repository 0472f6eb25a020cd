//! Grid host nodes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Node state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Node is unknown
    #[default]
    Unknown,
    /// Node is ready
    Ready,
    /// Node is down
    Down,
    /// Node is disconnected
    Disconnected,
}

/// A cluster member able to run container instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostNode {
    /// Record ID
    pub id: String,
    /// Agent-reported node ID
    pub node_id: String,
    /// Node name
    pub name: String,
    /// Grid the node belongs to
    pub grid: String,
    /// Node labels (`foo`, `region=eu-west`, ...)
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Node state
    pub state: NodeState,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl HostNode {
    /// Create a new ready node in the given grid
    pub fn new(grid: &str, name: &str) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            node_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            grid: grid.to_string(),
            labels: BTreeSet::new(),
            state: NodeState::Ready,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style label assignment
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Add label
    pub fn add_label(&mut self, label: &str) {
        self.labels.insert(label.to_string());
        self.updated_at = Utc::now();
    }

    /// Remove label
    pub fn remove_label(&mut self, label: &str) {
        self.labels.remove(label);
        self.updated_at = Utc::now();
    }

    /// Check for an exact label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Set node state
    pub fn set_state(&mut self, state: NodeState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Check if node is ready
    pub fn is_ready(&self) -> bool {
        self.state == NodeState::Ready
    }

    /// Check if node can receive new containers
    pub fn is_schedulable(&self) -> bool {
        self.is_ready()
    }

    /// Whether `name_or_id` refers to this node
    pub fn is_named(&self, name_or_id: &str) -> bool {
        self.name == name_or_id || self.node_id == name_or_id || self.id == name_or_id
    }
}
