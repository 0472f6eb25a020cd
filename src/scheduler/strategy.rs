//! Node selection strategies

use super::Placements;
use crate::grid::container::parse_ordinal;
use crate::grid::{GridService, HostNode};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Placement policy for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Spread instances over as many nodes as possible.
    ///
    /// Picks the candidate with the fewest other instances of the service
    /// placed in the current rollout, breaking ties on the lowest node ID.
    /// Once every candidate hosts an instance, nodes are reused in the same
    /// order unless `strict` is set, in which case selection fails.
    HighAvailability {
        #[serde(default)]
        strict: bool,
    },
    /// One instance per matching node; the container ordinal picks the node
    Daemon,
    /// Uniform random choice among candidates
    Random,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::HighAvailability { strict: false }
    }
}

impl Strategy {
    /// Non-strict high availability
    pub fn high_availability() -> Self {
        Self::default()
    }

    /// Check for the daemon strategy
    pub fn is_daemon(&self) -> bool {
        matches!(self, Strategy::Daemon)
    }

    /// Number of instances a rollout should place, given how many nodes
    /// passed affinity filtering.
    pub fn instance_count(&self, service: &GridService, matching_nodes: usize) -> u32 {
        match self {
            Strategy::Daemon => u32::try_from(matching_nodes).unwrap_or(u32::MAX),
            Strategy::HighAvailability { .. } | Strategy::Random => service.container_count,
        }
    }

    /// Choose a node among already-filtered `candidates`.
    pub fn select_node<'a>(
        &self,
        _service: &GridService,
        container_name: &str,
        candidates: &[&'a HostNode],
        placements: &Placements,
    ) -> Option<&'a HostNode> {
        match self {
            Strategy::HighAvailability { strict } => {
                let (load, node) = candidates
                    .iter()
                    .map(|node| (placements.count_on(&node.id, container_name), *node))
                    .min_by(|(a_load, a), (b_load, b)| a_load.cmp(b_load).then_with(|| a.id.cmp(&b.id)))?;

                if *strict && load > 0 {
                    return None;
                }
                Some(node)
            }
            Strategy::Daemon => {
                let ordinal = parse_ordinal(container_name)?;
                candidates.get(ordinal as usize - 1).copied()
            }
            Strategy::Random => candidates.choose(&mut rand::thread_rng()).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(names: &[&str]) -> Vec<HostNode> {
        names
            .iter()
            .map(|name| {
                let mut node = HostNode::new("test-grid", name);
                node.id = name.to_string();
                node
            })
            .collect()
    }

    fn service() -> GridService {
        GridService::new("test-grid", "redis", "redis:2.8").with_container_count(3)
    }

    #[test]
    fn test_ha_prefers_empty_node() {
        let nodes = nodes(&["a", "b", "c"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let mut placements = Placements::default();
        placements.record("redis-1", "a");
        placements.record("redis-2", "b");

        let strategy = Strategy::high_availability();
        let node = strategy.select_node(&service(), "redis-3", &candidates, &placements);
        assert_eq!(node.map(|n| n.id.as_str()), Some("c"));
    }

    #[test]
    fn test_ha_tie_breaks_on_node_id() {
        let nodes = nodes(&["c", "a", "b"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();

        let strategy = Strategy::high_availability();
        let first = strategy.select_node(&service(), "redis-1", &candidates, &Placements::default());
        let again = strategy.select_node(&service(), "redis-1", &candidates, &Placements::default());
        assert_eq!(first.map(|n| n.id.as_str()), Some("a"));
        assert_eq!(first, again);
    }

    #[test]
    fn test_ha_reuses_nodes_when_exhausted() {
        let nodes = nodes(&["a", "b"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let mut placements = Placements::default();
        placements.record("redis-1", "a");
        placements.record("redis-2", "b");

        let node = Strategy::high_availability().select_node(&service(), "redis-3", &candidates, &placements);
        assert_eq!(node.map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_ha_ignores_own_previous_placement() {
        let nodes = nodes(&["a", "b"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let mut placements = Placements::default();
        placements.record("redis-1", "a");

        let node = Strategy::high_availability().select_node(&service(), "redis-1", &candidates, &placements);
        assert_eq!(node.map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_strict_ha_refuses_to_stack() {
        let nodes = nodes(&["a", "b"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let mut placements = Placements::default();
        placements.record("redis-1", "a");
        placements.record("redis-2", "b");

        let strategy = Strategy::HighAvailability { strict: true };
        assert!(strategy.select_node(&service(), "redis-3", &candidates, &placements).is_none());
    }

    #[test]
    fn test_daemon_maps_ordinal_to_node() {
        let nodes = nodes(&["x", "y"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let placements = Placements::default();

        let strategy = Strategy::Daemon;
        let pick = |name: &str| {
            strategy
                .select_node(&service(), name, &candidates, &placements)
                .map(|n| n.id.clone())
        };
        assert_eq!(pick("redis-1"), Some("x".to_string()));
        assert_eq!(pick("redis-2"), Some("y".to_string()));
        assert_eq!(pick("redis-3"), None);
        assert_eq!(pick("redis"), None);
    }

    #[test]
    fn test_daemon_instance_count_follows_nodes() {
        let svc = service();
        assert_eq!(Strategy::Daemon.instance_count(&svc, 2), 2);
        assert_eq!(Strategy::Daemon.instance_count(&svc, 0), 0);
        assert_eq!(Strategy::high_availability().instance_count(&svc, 2), 3);
    }

    #[test]
    fn test_random_picks_a_candidate() {
        let nodes = nodes(&["a", "b"]);
        let candidates: Vec<&HostNode> = nodes.iter().collect();
        let node = Strategy::Random.select_node(&service(), "redis-1", &candidates, &Placements::default());
        assert!(node.is_some());
        assert!(Strategy::Random
            .select_node(&service(), "redis-1", &[], &Placements::default())
            .is_none());
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&Strategy::Daemon).unwrap();
        assert_eq!(json, r#"{"type":"daemon"}"#);

        let parsed: Strategy = serde_json::from_str(r#"{"type":"high_availability"}"#).unwrap();
        assert_eq!(parsed, Strategy::HighAvailability { strict: false });
    }
}
