//! Service container instances

use super::revision::DeployRev;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Runtime status of a container instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Not present on its node
    #[default]
    Absent,
    /// Created but not started
    Created,
    /// Running
    Running,
    /// Stopped
    Stopped,
}

/// One unit of a service, placed on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    /// Container ID
    pub id: String,
    /// Container name (`{service}-{ordinal}`)
    pub name: String,
    /// Owning service ID
    pub service_id: String,
    /// Owning service name
    pub service_name: String,
    /// Node the container is placed on
    pub node_id: String,
    /// Image reference the container was created from
    pub image: String,
    /// Revision of the rollout that created the container
    pub deploy_rev: DeployRev,
    /// Runtime status
    pub status: ContainerStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl ContainerInstance {
    /// Create a new container record in `Created` state
    pub fn new(
        service_id: &str,
        service_name: &str,
        name: &str,
        node_id: &str,
        image: &str,
        deploy_rev: DeployRev,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            service_id: service_id.to_string(),
            service_name: service_name.to_string(),
            node_id: node_id.to_string(),
            image: image.to_string(),
            deploy_rev,
            status: ContainerStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update runtime status
    pub fn set_status(&mut self, status: ContainerStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Check if container is running
    pub fn is_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    /// Check if container still exists on its node
    pub fn exists_on_node(&self) -> bool {
        self.status != ContainerStatus::Absent
    }

    /// 1-based ordinal parsed from the container name
    pub fn ordinal(&self) -> Option<u32> {
        parse_ordinal(&self.name)
    }
}

/// Parse the trailing `-{ordinal}` of a container name.
pub fn parse_ordinal(container_name: &str) -> Option<u32> {
    let (_, suffix) = container_name.rsplit_once('-')?;
    suffix.parse().ok().filter(|n| *n > 0)
}
