//! Grid scheduler
//!
//! Filters candidate nodes by readiness, grid membership and service
//! affinity, then delegates the final choice to a [`Strategy`].

pub mod affinity;
pub mod strategy;

pub use affinity::Constraint;
pub use strategy::Strategy;

use crate::grid::{GridService, HostNode};
use std::collections::{BTreeSet, HashMap};

/// Nodes assigned to containers so far in one rollout.
///
/// Owned by the caller so strategies stay stateless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placements {
    by_container: HashMap<String, String>,
}

impl Placements {
    /// Record that `container_name` was placed on `node_id`
    pub fn record(&mut self, container_name: &str, node_id: &str) {
        self.by_container
            .insert(container_name.to_string(), node_id.to_string());
    }

    /// Node a container was placed on
    pub fn node_of(&self, container_name: &str) -> Option<&str> {
        self.by_container.get(container_name).map(String::as_str)
    }

    /// Containers other than `excluding` placed on `node_id`
    pub fn count_on(&self, node_id: &str, excluding: &str) -> usize {
        self.by_container
            .iter()
            .filter(|(name, node)| node.as_str() == node_id && name.as_str() != excluding)
            .count()
    }

    /// Distinct nodes used
    pub fn nodes(&self) -> BTreeSet<&str> {
        self.by_container.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_container.is_empty()
    }
}

/// Scheduler wrapping one strategy
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    strategy: Strategy,
}

impl Scheduler {
    /// Create a scheduler for a strategy
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Configured strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Nodes eligible for `service`, in snapshot order
    pub fn filter_nodes<'a>(&self, service: &GridService, nodes: &'a [HostNode]) -> Vec<&'a HostNode> {
        nodes
            .iter()
            .filter(|node| node.grid == service.grid)
            .filter(|node| node.is_schedulable())
            .filter(|node| affinity::matches(node, &service.affinity))
            .collect()
    }

    /// Select a node for `container_name`, or `None` when nothing fits
    pub fn select_node<'a>(
        &self,
        service: &GridService,
        container_name: &str,
        nodes: &'a [HostNode],
        placements: &Placements,
    ) -> Option<&'a HostNode> {
        let candidates = self.filter_nodes(service, nodes);
        if candidates.is_empty() {
            tracing::debug!(
                "No candidate nodes for {} ({} in snapshot)",
                container_name,
                nodes.len()
            );
            return None;
        }

        self.strategy
            .select_node(service, container_name, &candidates, placements)
    }

    /// Instance count a rollout of `service` should place
    pub fn instance_count(&self, service: &GridService, nodes: &[HostNode]) -> u32 {
        let matching = if self.strategy.is_daemon() {
            self.filter_nodes(service, nodes).len()
        } else {
            0
        };
        self.strategy.instance_count(service, matching)
    }
}
