//! Grid service specification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Lifecycle state of a grid service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Never deployed
    #[default]
    Initial,
    /// Rollout in flight
    Deploying,
    /// Last rollout completed
    Running,
    /// Stopped by the operator
    Stopped,
}

impl ServiceState {
    /// String form used in logs and records
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Initial => "initial",
            ServiceState::Deploying => "deploying",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative desired state for a set of container instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridService {
    /// Service ID
    pub id: String,
    /// Service name
    pub name: String,
    /// Grid the service belongs to
    pub grid: String,
    /// Image reference
    pub image_name: String,
    /// Resolved image ID from the last pull
    pub image_id: Option<String>,
    /// Desired container count
    pub container_count: u32,
    /// Affinity constraints (`label==foo`, `node!=node-2`, ...)
    #[serde(default)]
    pub affinity: Vec<String>,
    /// Lifecycle state
    #[serde(default)]
    pub state: ServiceState,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl GridService {
    /// Create a new service with a single container
    pub fn new(grid: &str, name: &str, image_name: &str) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            grid: grid.to_string(),
            image_name: image_name.to_string(),
            image_id: None,
            container_count: 1,
            affinity: Vec::new(),
            state: ServiceState::Initial,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style container count
    pub fn with_container_count(mut self, count: u32) -> Self {
        self.container_count = count;
        self
    }

    /// Builder-style affinity
    pub fn with_affinity<I, S>(mut self, affinity: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affinity = affinity.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the container at a 1-based ordinal
    pub fn container_name(&self, ordinal: u32) -> String {
        format!("{}-{}", self.name, ordinal)
    }

    /// Scale the service
    pub fn scale(&mut self, count: u32) {
        self.container_count = count;
        self.updated_at = Utc::now();
    }

    /// Set lifecycle state
    pub fn set_state(&mut self, state: ServiceState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Record the image resolved by the last pull
    pub fn set_image_id(&mut self, image_id: &str) {
        self.image_id = Some(image_id.to_string());
        self.updated_at = Utc::now();
    }

    /// Wrap into a shared handle
    pub fn into_handle(self) -> ServiceHandle {
        Arc::new(RwLock::new(self))
    }
}

/// Service record shared between the control plane and a rollout
pub type ServiceHandle = Arc<RwLock<GridService>>;
