//! In-memory runtime
//!
//! Keeps container records in a table and simulates pulls, starts and
//! removals without touching a real engine. Faults can be injected per node
//! or per container name to exercise failure paths.

use super::{
    ContainerCreator, ContainerInspector, ContainerRemover, ContainerStarter, ContainerStore,
    Image, ImagePuller, RegistryCredentials,
};
use crate::error::{GridError, Result};
use crate::grid::{ContainerInstance, ContainerStatus, DeployRev, GridService, HostNode};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Injected failures
#[derive(Debug, Default)]
struct Faults {
    /// Node IDs whose pulls fail
    pull_nodes: HashSet<String>,
    /// Container names whose start fails
    start_names: HashSet<String>,
    /// Container names that never reach running
    stuck_names: HashSet<String>,
    /// Container names whose removal fails
    remove_names: HashSet<String>,
    /// Container names that vanish from their node right after start
    lost_names: HashSet<String>,
    /// Container name -> refreshes left before it reports running
    slow_starts: HashMap<String, u32>,
}

/// Pull performed by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRecord {
    pub node_id: String,
    pub image: String,
    pub authenticated: bool,
}

/// Runtime backed by in-memory tables
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    /// All containers indexed by ID
    containers: RwLock<HashMap<String, ContainerInstance>>,
    /// Pulls in call order
    pulls: RwLock<Vec<PullRecord>>,
    /// IDs of removed containers in call order
    removals: RwLock<Vec<String>>,
    faults: RwLock<Faults>,
}

impl MemoryRuntime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self::default()
    }

    fn read_containers(&self) -> Result<RwLockReadGuard<'_, HashMap<String, ContainerInstance>>> {
        self.containers
            .read()
            .map_err(|_| GridError::Lock("Failed to acquire read lock".to_string()))
    }

    fn write_containers(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, ContainerInstance>>> {
        self.containers
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))
    }

    fn faults(&self) -> Result<RwLockWriteGuard<'_, Faults>> {
        self.faults
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))
    }

    /// Seed an existing container record
    pub fn insert(&self, container: ContainerInstance) -> Result<()> {
        self.write_containers()?
            .insert(container.id.clone(), container);
        Ok(())
    }

    /// Get container by ID
    pub fn get(&self, id: &str) -> Result<ContainerInstance> {
        self.read_containers()?
            .get(id)
            .cloned()
            .ok_or_else(|| GridError::ContainerNotFound(id.to_string()))
    }

    /// All containers, ordered by name
    pub fn containers(&self) -> Result<Vec<ContainerInstance>> {
        let mut result: Vec<ContainerInstance> = self.read_containers()?.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.deploy_rev.cmp(&b.deploy_rev)));
        Ok(result)
    }

    /// Mark a container as gone from its node while keeping its record
    pub fn mark_absent(&self, id: &str) -> Result<()> {
        let mut containers = self.write_containers()?;
        let container = containers
            .get_mut(id)
            .ok_or_else(|| GridError::ContainerNotFound(id.to_string()))?;
        container.set_status(ContainerStatus::Absent);
        Ok(())
    }

    /// Pulls performed so far
    pub fn pulls(&self) -> Result<Vec<PullRecord>> {
        self.pulls
            .read()
            .map(|p| p.clone())
            .map_err(|_| GridError::Lock("Failed to acquire read lock".to_string()))
    }

    /// Number of pulls performed on a node
    pub fn pull_count(&self, node_id: &str) -> Result<usize> {
        Ok(self.pulls()?.iter().filter(|p| p.node_id == node_id).count())
    }

    /// IDs of removed containers
    pub fn removals(&self) -> Result<Vec<String>> {
        self.removals
            .read()
            .map(|r| r.clone())
            .map_err(|_| GridError::Lock("Failed to acquire read lock".to_string()))
    }

    /// Make pulls onto `node_id` fail
    pub fn fail_pulls_on(&self, node_id: &str) -> Result<()> {
        self.faults()?.pull_nodes.insert(node_id.to_string());
        Ok(())
    }

    /// Make starting `container_name` fail
    pub fn fail_start_of(&self, container_name: &str) -> Result<()> {
        self.faults()?.start_names.insert(container_name.to_string());
        Ok(())
    }

    /// Keep `container_name` from ever reporting running
    pub fn never_run(&self, container_name: &str) -> Result<()> {
        self.faults()?.stuck_names.insert(container_name.to_string());
        Ok(())
    }

    /// Make removal of `container_name` fail
    pub fn fail_removal_of(&self, container_name: &str) -> Result<()> {
        self.faults()?.remove_names.insert(container_name.to_string());
        Ok(())
    }

    /// Make `container_name` disappear from its node once started
    pub fn lose_on_start(&self, container_name: &str) -> Result<()> {
        self.faults()?.lost_names.insert(container_name.to_string());
        Ok(())
    }

    /// Report running only after `refreshes` status refreshes
    pub fn run_after(&self, container_name: &str, refreshes: u32) -> Result<()> {
        self.faults()?
            .slow_starts
            .insert(container_name.to_string(), refreshes);
        Ok(())
    }
}

/// Content-derived image ID
fn image_id(image_name: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(image_name.as_bytes()))
}

#[async_trait]
impl ImagePuller for MemoryRuntime {
    async fn pull(
        &self,
        node: &HostNode,
        image_name: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<Image> {
        if self.faults()?.pull_nodes.contains(&node.id) {
            return Err(GridError::ImagePull(format!(
                "{} on node {}: connection refused",
                image_name, node.name
            )));
        }

        self.pulls
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))?
            .push(PullRecord {
                node_id: node.id.clone(),
                image: image_name.to_string(),
                authenticated: credentials.is_some(),
            });

        Ok(Image {
            id: image_id(image_name),
            name: image_name.to_string(),
        })
    }
}

#[async_trait]
impl ContainerCreator for MemoryRuntime {
    async fn create(
        &self,
        service: &GridService,
        node: &HostNode,
        container_name: &str,
        deploy_rev: DeployRev,
    ) -> Result<ContainerInstance> {
        let mut containers = self.write_containers()?;

        let same_name = |c: &ContainerInstance| c.service_id == service.id && c.name == container_name;
        if containers.values().any(|c| same_name(c) && c.exists_on_node()) {
            return Err(GridError::Container(format!(
                "Container already exists: {}",
                container_name
            )));
        }
        containers.retain(|_, c| !same_name(&*c));

        let container = ContainerInstance::new(
            &service.id,
            &service.name,
            container_name,
            &node.id,
            &service.image_name,
            deploy_rev,
        );
        containers.insert(container.id.clone(), container.clone());

        Ok(container)
    }
}

#[async_trait]
impl ContainerStarter for MemoryRuntime {
    async fn start(&self, container: &ContainerInstance) -> Result<()> {
        let (fail, stuck, slow, lost) = {
            let faults = self.faults()?;
            (
                faults.start_names.contains(&container.name),
                faults.stuck_names.contains(&container.name),
                faults.slow_starts.get(&container.name).copied().unwrap_or(0) > 0,
                faults.lost_names.contains(&container.name),
            )
        };
        if fail {
            return Err(GridError::Remote(format!(
                "Failed to start container {}",
                container.name
            )));
        }

        let mut containers = self.write_containers()?;
        let record = containers
            .get_mut(&container.id)
            .ok_or_else(|| GridError::ContainerNotFound(container.id.clone()))?;

        if lost {
            record.set_status(ContainerStatus::Absent);
        } else if !stuck && !slow {
            record.set_status(ContainerStatus::Running);
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRemover for MemoryRuntime {
    async fn remove(&self, container: &ContainerInstance) -> Result<()> {
        if self.faults()?.remove_names.contains(&container.name) {
            return Err(GridError::Remote(format!(
                "Failed to remove container {}",
                container.name
            )));
        }

        self.write_containers()?
            .remove(&container.id)
            .ok_or_else(|| GridError::ContainerNotFound(container.id.clone()))?;

        self.removals
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))?
            .push(container.id.clone());
        Ok(())
    }
}

#[async_trait]
impl ContainerInspector for MemoryRuntime {
    async fn refresh(&self, container: &ContainerInstance) -> Result<ContainerInstance> {
        let promote = {
            let mut faults = self.faults()?;
            match faults.slow_starts.get_mut(&container.name) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    *left == 0
                }
                _ => false,
            }
        };

        let mut containers = self.write_containers()?;
        match containers.get_mut(&container.id) {
            Some(record) => {
                if promote {
                    record.set_status(ContainerStatus::Running);
                }
                Ok(record.clone())
            }
            None => {
                let mut gone = container.clone();
                gone.set_status(ContainerStatus::Absent);
                Ok(gone)
            }
        }
    }
}

#[async_trait]
impl ContainerStore for MemoryRuntime {
    async fn list(&self, service: &GridService) -> Result<Vec<ContainerInstance>> {
        let mut result: Vec<ContainerInstance> = self
            .read_containers()?
            .values()
            .filter(|c| c.service_id == service.id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}
