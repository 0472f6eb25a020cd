//! Container runtime collaborators
//!
//! The rollout coordinator never talks to a container engine directly.
//! Each capability it needs is a small async trait scoped to one node or
//! one container; [`Runtime`] bundles one implementation of each.

pub mod memory;

pub use memory::MemoryRuntime;

use crate::error::Result;
use crate::grid::{ContainerInstance, DeployRev, GridService, HostNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Image resolved by a pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image ID (content digest)
    pub id: String,
    /// Reference the image was pulled by
    pub name: String,
}

/// Credentials for a private registry, resolved by the caller
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Registry host
    pub registry: String,
    /// Username
    pub username: String,
    /// Password or token
    pub password: String,
    /// Email
    pub email: Option<String>,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Pulls images onto nodes
#[async_trait]
pub trait ImagePuller: Send + Sync {
    /// Pull `image_name` onto `node`.
    async fn pull(
        &self,
        node: &HostNode,
        image_name: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<Image>;
}

/// Creates service containers
#[async_trait]
pub trait ContainerCreator: Send + Sync {
    /// Create `container_name` for `service` on `node`, tagged with `deploy_rev`.
    async fn create(
        &self,
        service: &GridService,
        node: &HostNode,
        container_name: &str,
        deploy_rev: DeployRev,
    ) -> Result<ContainerInstance>;
}

/// Starts created containers
#[async_trait]
pub trait ContainerStarter: Send + Sync {
    async fn start(&self, container: &ContainerInstance) -> Result<()>;
}

/// Removes containers from their node and from the record store
#[async_trait]
pub trait ContainerRemover: Send + Sync {
    async fn remove(&self, container: &ContainerInstance) -> Result<()>;
}

/// Reads the current status of a container
#[async_trait]
pub trait ContainerInspector: Send + Sync {
    /// Fresh copy of the container record. A container that no longer exists
    /// on its node comes back with [`ContainerStatus::Absent`].
    ///
    /// [`ContainerStatus::Absent`]: crate::grid::ContainerStatus::Absent
    async fn refresh(&self, container: &ContainerInstance) -> Result<ContainerInstance>;
}

/// Lookup of a service's container records
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// All containers of `service`
    async fn list(&self, service: &GridService) -> Result<Vec<ContainerInstance>>;

    /// Container of `service` named `name`
    async fn find_by_name(
        &self,
        service: &GridService,
        name: &str,
    ) -> Result<Option<ContainerInstance>> {
        Ok(self
            .list(service)
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }
}

/// One implementation of every collaborator
#[derive(Clone)]
pub struct Runtime {
    pub puller: Arc<dyn ImagePuller>,
    pub creator: Arc<dyn ContainerCreator>,
    pub starter: Arc<dyn ContainerStarter>,
    pub remover: Arc<dyn ContainerRemover>,
    pub inspector: Arc<dyn ContainerInspector>,
    pub store: Arc<dyn ContainerStore>,
}

impl Runtime {
    /// Use one shared value for every collaborator
    pub fn from_shared<T>(runtime: Arc<T>) -> Self
    where
        T: ImagePuller
            + ContainerCreator
            + ContainerStarter
            + ContainerRemover
            + ContainerInspector
            + ContainerStore
            + 'static,
    {
        Self {
            puller: runtime.clone(),
            creator: runtime.clone(),
            starter: runtime.clone(),
            remover: runtime.clone(),
            inspector: runtime.clone(),
            store: runtime,
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}
