//! In-memory control plane and storage for unit tests.

use crate::core::manifest::encode_compose;
use crate::domain::model::{CutoverStep, DeploymentTarget, ServiceDescriptor, SidecarResource};
use crate::domain::ports::{ControlPlane, Storage};
use crate::utils::error::{MigrationError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct PlaneState {
    calls: Vec<String>,
    runtime_config: Option<String>,
    slots: HashSet<String>,
    sidecars: BTreeMap<String, SidecarResource>,
    mode: Option<String>,
    restarts: Vec<String>,
    failing_services: HashSet<String>,
    failing_step: Option<CutoverStep>,
    slow_step: Option<(CutoverStep, Duration)>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeControlPlane {
    state: Arc<Mutex<PlaneState>>,
}

impl FakeControlPlane {
    pub(crate) fn with_manifest(manifest: &str) -> Self {
        Self::with_runtime_config(Some(encode_compose(manifest)))
    }

    pub(crate) fn with_runtime_config(config: Option<String>) -> Self {
        let plane = Self::default();
        plane.state.try_lock().unwrap().runtime_config = config;
        plane
    }

    pub(crate) fn fail_service(self, service: &str) -> Self {
        self.state
            .try_lock()
            .unwrap()
            .failing_services
            .insert(service.to_string());
        self
    }

    pub(crate) fn fail_step(self, step: CutoverStep) -> Self {
        self.state.try_lock().unwrap().failing_step = Some(step);
        self
    }

    pub(crate) fn slow_step(self, step: CutoverStep, delay: Duration) -> Self {
        self.state.try_lock().unwrap().slow_step = Some((step, delay));
        self
    }

    pub(crate) async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub(crate) async fn sidecars(&self) -> BTreeMap<String, SidecarResource> {
        self.state.lock().await.sidecars.clone()
    }

    pub(crate) async fn mode(&self) -> Option<String> {
        self.state.lock().await.mode.clone()
    }

    pub(crate) async fn restarts(&self) -> Vec<String> {
        self.state.lock().await.restarts.clone()
    }

    async fn enter(&self, step: CutoverStep, call: String) -> Result<()> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(call);
            if state.failing_step == Some(step) {
                return Err(MigrationError::PlatformRequest {
                    service: None,
                    status: Some(409),
                    message: format!("{} rejected by fake platform", step),
                });
            }
            state
                .slow_step
                .filter(|(slow, _)| *slow == step)
                .map(|(_, delay)| delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn create_slot(&self, target: &DeploymentTarget) -> Result<()> {
        self.enter(CutoverStep::CreateSlot, format!("create_slot:{}", target.environment_slot))
            .await
            .map_err(|e| MigrationError::SlotCreation {
                slot: target.environment_slot.clone(),
                message: e.to_string(),
            })?;
        self.state
            .lock()
            .await
            .slots
            .insert(target.environment_slot.clone());
        Ok(())
    }

    async fn fetch_runtime_config(&self, target: &DeploymentTarget) -> Result<Option<String>> {
        self.enter(CutoverStep::FetchManifest, format!("fetch_config:{}", target.service_name))
            .await?;
        Ok(self.state.lock().await.runtime_config.clone())
    }

    async fn upsert_sidecar(
        &self,
        target: &DeploymentTarget,
        descriptor: &ServiceDescriptor,
    ) -> Result<SidecarResource> {
        self.enter(
            CutoverStep::ApplyTopology,
            format!("upsert:{}:{}", target.environment_slot, descriptor.name),
        )
        .await?;

        let mut state = self.state.lock().await;
        if state.failing_services.contains(&descriptor.name) {
            return Err(MigrationError::PlatformRequest {
                service: Some(descriptor.name.clone()),
                status: Some(400),
                message: format!("InvalidImage: {}", descriptor.image),
            });
        }

        let resource = SidecarResource {
            name: descriptor.name.clone(),
            id: Some(format!("{}/sitecontainers/{}", target, descriptor.name)),
            image: descriptor.image.clone(),
            is_primary: descriptor.is_primary,
            target_port: descriptor.port,
        };
        state.sidecars.insert(descriptor.name.clone(), resource.clone());
        Ok(resource)
    }

    async fn set_runtime_mode(&self, target: &DeploymentTarget, mode: &str) -> Result<()> {
        self.enter(
            CutoverStep::SwitchMode,
            format!("set_mode:{}:{}", target.environment_slot, mode),
        )
        .await?;
        self.state.lock().await.mode = Some(mode.to_string());
        Ok(())
    }

    async fn restart_slot(&self, target: &DeploymentTarget) -> Result<()> {
        self.enter(CutoverStep::RestartSlot, format!("restart:{}", target.environment_slot))
            .await?;
        self.state
            .lock()
            .await
            .restarts
            .push(target.environment_slot.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub(crate) async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }
}

impl Storage for MemoryStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), data.to_vec());
        Ok(format!("memory://{}", path))
    }
}
