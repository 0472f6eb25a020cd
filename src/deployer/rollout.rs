//! Grid service rollout coordinator

use super::image;
use super::lock::ServiceLocks;
use crate::config::DeployerConfig;
use crate::error::{GridError, Result};
use crate::grid::{ContainerInstance, DeployRev, GridService, HostNode, ServiceHandle, ServiceState};
use crate::runtime::{Image, RegistryCredentials, Runtime};
use crate::scheduler::{Placements, Scheduler, Strategy};
use std::collections::BTreeSet;
use std::sync::PoisonError;

/// What a successful rollout did
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// Revision carried by every container of the service
    pub deploy_rev: DeployRev,
    /// Node chosen for each container
    pub placements: Placements,
    /// Nodes that received an image pull
    pub pulled_nodes: BTreeSet<String>,
    /// Names of containers replaced in place
    pub replaced: Vec<String>,
    /// Containers of earlier revisions removed after placement
    pub pruned: Vec<ContainerInstance>,
}

/// Puts the service into `deploying` and restores the previous state on
/// drop unless the rollout committed. Covers early returns and a dropped
/// rollout future alike.
struct StateRollback<'a> {
    service: &'a ServiceHandle,
    prev_state: ServiceState,
    armed: bool,
}

impl<'a> StateRollback<'a> {
    fn begin(service: &'a ServiceHandle) -> Result<Self> {
        let mut record = service
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))?;
        let prev_state = record.state;
        record.set_state(ServiceState::Deploying);

        Ok(Self {
            service,
            prev_state,
            armed: true,
        })
    }

    fn commit(mut self) -> Result<()> {
        let mut record = self
            .service
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))?;
        record.set_state(ServiceState::Running);
        self.armed = false;
        Ok(())
    }
}

impl Drop for StateRollback<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut record = self.service.write().unwrap_or_else(PoisonError::into_inner);
        tracing::warn!(
            "Rollout of {} did not complete, restoring state {}",
            record.name,
            self.prev_state
        );
        record.set_state(self.prev_state);
    }
}

/// Deploys one grid service onto a snapshot of nodes.
///
/// Containers are placed one ordinal at a time: schedule, pull the image
/// once per node, replace any container of the same name, create, start and
/// wait for it to run. Containers from other revisions are pruned only after
/// every ordinal succeeded.
///
/// A failed rollout restores the service state but leaves containers it
/// already created in place, next to the previous revision's containers.
pub struct GridServiceDeployer {
    scheduler: Scheduler,
    service: ServiceHandle,
    nodes: Vec<HostNode>,
    runtime: Runtime,
    config: DeployerConfig,
}

impl GridServiceDeployer {
    /// Create a deployer with the default configuration
    pub fn new(strategy: Strategy, service: ServiceHandle, nodes: Vec<HostNode>, runtime: Runtime) -> Self {
        Self {
            scheduler: Scheduler::new(strategy),
            service,
            nodes,
            runtime,
            config: DeployerConfig::default(),
        }
    }

    /// Replace the configuration after validating it
    pub fn with_config(mut self, config: DeployerConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Current copy of the service record
    pub fn service(&self) -> GridService {
        self.service
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn nodes(&self) -> &[HostNode] {
        &self.nodes
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Registry the service image is pulled from
    pub fn registry_name(&self) -> String {
        let service = self.service();
        image::registry_name(&service.image_name, &self.config.default_registry).to_string()
    }

    /// Number of containers a rollout places
    pub fn instance_count(&self) -> u32 {
        self.scheduler.instance_count(&self.service(), &self.nodes)
    }

    /// Nodes chosen per ordinal, up to the first unschedulable one
    pub fn selected_nodes(&self) -> Vec<HostNode> {
        let (selected, _) = self.dry_run(&self.service());
        selected.into_iter().cloned().collect()
    }

    /// Whether every container of the service can be scheduled
    pub fn can_deploy(&self) -> bool {
        let (_, unschedulable) = self.dry_run(&self.service());
        match unschedulable {
            Some(name) => {
                tracing::debug!("Cannot deploy: no node for {}", name);
                false
            }
            None => true,
        }
    }

    /// First container name when a daemon service has no eligible node.
    /// An empty daemon rollout is unschedulable, not a scale to zero.
    fn no_daemon_nodes(&self, service: &GridService) -> Option<String> {
        if self.scheduler.strategy().is_daemon() && self.scheduler.filter_nodes(service, &self.nodes).is_empty() {
            Some(service.container_name(1))
        } else {
            None
        }
    }

    fn dry_run(&self, service: &GridService) -> (Vec<&HostNode>, Option<String>) {
        let mut placements = Placements::default();
        let mut selected = Vec::new();

        if let Some(container_name) = self.no_daemon_nodes(service) {
            return (selected, Some(container_name));
        }

        for ordinal in 1..=self.scheduler.instance_count(service, &self.nodes) {
            let container_name = service.container_name(ordinal);
            match self
                .scheduler
                .select_node(service, &container_name, &self.nodes, &placements)
            {
                Some(node) => {
                    placements.record(&container_name, &node.id);
                    selected.push(node);
                }
                None => return (selected, Some(container_name)),
            }
        }

        (selected, None)
    }

    /// Roll the service out to its desired revision.
    pub async fn deploy(&self, credentials: Option<&RegistryCredentials>) -> Result<DeployOutcome> {
        let rollback = StateRollback::begin(&self.service)?;
        let service = self.service();

        if let Some(container_name) = self.no_daemon_nodes(&service) {
            return Err(GridError::Unschedulable(container_name));
        }

        let existing = self.runtime.store.list(&service).await?;
        let deploy_rev = DeployRev::mint(existing.iter().map(|c| &c.deploy_rev));
        let instance_count = self.scheduler.instance_count(&service, &self.nodes);

        tracing::info!(
            "Deploying service {} (rev {}, {} instances, was {})",
            service.name,
            deploy_rev,
            instance_count,
            rollback.prev_state
        );

        let mut placements = Placements::default();
        let mut pulled_nodes = BTreeSet::new();
        let mut replaced = Vec::new();

        for ordinal in 1..=instance_count {
            let container_name = service.container_name(ordinal);
            let node = self
                .scheduler
                .select_node(&service, &container_name, &self.nodes, &placements)
                .ok_or_else(|| GridError::Unschedulable(container_name.clone()))?;
            tracing::debug!("Scheduled {} on node {}", container_name, node.name);

            if !pulled_nodes.contains(&node.id) {
                self.ensure_image(node, &service.image_name, credentials).await?;
                pulled_nodes.insert(node.id.clone());
            }

            if self
                .deploy_service_container(&service, node, &container_name, deploy_rev)
                .await?
            {
                replaced.push(container_name.clone());
            }
            placements.record(&container_name, &node.id);
        }

        let mut pruned = Vec::new();
        for container in self.runtime.store.list(&service).await? {
            if container.deploy_rev != deploy_rev {
                tracing::info!(
                    "Removing {} from previous revision {}",
                    container.name,
                    container.deploy_rev
                );
                self.runtime.remover.remove(&container).await?;
                pruned.push(container);
            }
        }

        rollback.commit()?;
        tracing::info!(
            "Service {} running rev {} on {} nodes",
            service.name,
            deploy_rev,
            placements.nodes().len()
        );

        Ok(DeployOutcome {
            deploy_rev,
            placements,
            pulled_nodes,
            replaced,
            pruned,
        })
    }

    /// [`deploy`](Self::deploy) while holding the service's rollout lock
    pub async fn deploy_exclusive(
        &self,
        locks: &ServiceLocks,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<DeployOutcome> {
        let service_id = self.service().id;
        let _guard = locks.acquire(&service_id).await;
        self.deploy(credentials).await
    }

    /// Pull `image_name` onto `node` and record the resolved image ID
    pub async fn ensure_image(
        &self,
        node: &HostNode,
        image_name: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<Image> {
        tracing::info!("Pulling image {} on node {}", image_name, node.name);
        let image = self.runtime.puller.pull(node, image_name, credentials).await?;

        self.service
            .write()
            .map_err(|_| GridError::Lock("Failed to acquire write lock".to_string()))?
            .set_image_id(&image.id);

        Ok(image)
    }

    /// Replace-or-create one container. Returns whether an old container
    /// was removed first.
    async fn deploy_service_container(
        &self,
        service: &GridService,
        node: &HostNode,
        container_name: &str,
        deploy_rev: DeployRev,
    ) -> Result<bool> {
        let mut replaced = false;
        if let Some(old) = self.runtime.store.find_by_name(service, container_name).await? {
            let old = self.runtime.inspector.refresh(&old).await?;
            if old.exists_on_node() {
                tracing::info!("Replacing {} (rev {})", old.name, old.deploy_rev);
                self.runtime.remover.remove(&old).await?;
                replaced = true;
            }
        }

        let container = self
            .runtime
            .creator
            .create(service, node, container_name, deploy_rev)
            .await?;
        self.runtime.starter.start(&container).await?;
        self.wait_for_running(&container).await?;

        Ok(replaced)
    }

    async fn wait_for_running(&self, container: &ContainerInstance) -> Result<()> {
        let timeout = self.config.health_timeout();
        match tokio::time::timeout(timeout, self.poll_until_running(container)).await {
            Ok(result) => result,
            Err(_) => Err(GridError::HealthTimeout {
                container: container.name.clone(),
                timeout,
            }),
        }
    }

    async fn poll_until_running(&self, container: &ContainerInstance) -> Result<()> {
        loop {
            let current = self.runtime.inspector.refresh(container).await?;
            if current.is_running() {
                return Ok(());
            }
            if !current.exists_on_node() {
                return Err(GridError::ContainerNotFound(container.name.clone()));
            }
            tokio::time::sleep(self.config.health_poll_interval()).await;
        }
    }
}
