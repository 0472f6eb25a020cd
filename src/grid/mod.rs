//! Grid data model
//!
//! Services, host nodes, container instances and the revisions that tie
//! instances to the rollout that created them.

pub mod container;
pub mod node;
pub mod revision;
pub mod service;

pub use container::{ContainerInstance, ContainerStatus};
pub use node::{HostNode, NodeState};
pub use revision::DeployRev;
pub use service::{GridService, ServiceHandle, ServiceState};
