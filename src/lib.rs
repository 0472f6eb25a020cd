//! Grid deployer - container rollout core for a multi-node grid
//!
//! Places the containers of a grid service onto host nodes and rolls them
//! out one ordinal at a time:
//!
//! - Affinity constraints over node labels and names
//! - High availability, daemon and random placement strategies
//! - Image pulls deduplicated per node
//! - Replace-in-place with a bounded health-wait
//! - Revision-based pruning of stale containers
//!
//! Container engines are reached through the async traits in [`runtime`];
//! [`runtime::MemoryRuntime`] implements all of them in memory.

pub mod config;
pub mod deployer;
pub mod error;
pub mod grid;
pub mod logging;
pub mod runtime;
pub mod scheduler;

pub use config::DeployerConfig;
pub use deployer::{DeployOutcome, GridServiceDeployer, ServiceLocks};
pub use error::{GridError, Result};
