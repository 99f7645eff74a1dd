use crate::core::applier::SidecarApplier;
use crate::core::extractor::extract_services;
use crate::core::manifest::{decode_runtime_config, SIDECAR_MODE};
use crate::core::topology::map_topology;
use crate::domain::model::{
    CutoverPlan, CutoverReport, CutoverState, CutoverStep, DeploymentTarget, Topology,
};
use crate::domain::ports::{ConfigProvider, ControlPlane, Storage};
use crate::utils::deadline::with_deadline;
use crate::utils::error::{MigrationError, Result};
use std::time::Duration;
use tracing::Instrument;

/// Fixed name of the decoded manifest written for auditing
pub const DEFAULT_ARTIFACT_FILENAME: &str = "decoded-compose.yml";

/// 遷移流程的總指揮：建立 slot、解析 manifest、套用容器、切換模式、重啟
///
/// Each step is attempted once. Nothing is rolled back on failure, and promotion to
/// production is left to the operator.
pub struct CutoverOrchestrator<C: ControlPlane, S: Storage> {
    control_plane: C,
    storage: S,
    run_id: String,
    concurrency: usize,
    deadline: Duration,
    artifact_filename: String,
}

impl<C: ControlPlane, S: Storage> CutoverOrchestrator<C, S> {
    pub fn new(control_plane: C, storage: S) -> Self {
        Self {
            control_plane,
            storage,
            run_id: format!("cutover_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")),
            concurrency: 1,
            deadline: Duration::from_secs(60),
            artifact_filename: DEFAULT_ARTIFACT_FILENAME.to_string(),
        }
    }

    pub fn with_settings<P: ConfigProvider>(mut self, settings: &P) -> Self {
        self.concurrency = settings.concurrency().max(1);
        self.deadline = settings.call_deadline();
        self.artifact_filename = settings.artifact_filename().to_string();
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Full cutover up to `AwaitingPromotion`.
    pub async fn run(&self, target: &DeploymentTarget) -> Result<CutoverReport> {
        let span = tracing::info_span!("cutover", run_id = %self.run_id, target = %target);
        self.run_steps(target).instrument(span).await
    }

    /// Read-only dry run: fetch and validate the manifest, touch nothing on the platform.
    pub async fn plan(&self, target: &DeploymentTarget) -> Result<CutoverPlan> {
        let span = tracing::info_span!("plan", run_id = %self.run_id, target = %target);
        async {
            let (manifest, artifact_path) = self
                .fetch_manifest(target)
                .await
                .map_err(|e| e.at_step(CutoverStep::FetchManifest))?;
            let topology =
                Self::build_topology(&manifest).map_err(|e| e.at_step(CutoverStep::ApplyTopology))?;

            tracing::info!("🔍 Dry run: {} container(s) would be declared", topology.len());
            Ok::<_, MigrationError>(CutoverPlan {
                run_id: self.run_id.clone(),
                target: target.clone(),
                topology,
                artifact_path,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_steps(&self, target: &DeploymentTarget) -> Result<CutoverReport> {
        let mut states = vec![CutoverState::Start];
        tracing::info!("🚀 Starting cutover of '{}' into slot '{}'", target.service_name, target.environment_slot);

        let created = self
            .call("create slot", self.control_plane.create_slot(target))
            .await;
        self.settle(&mut states, CutoverStep::CreateSlot, created)?;
        advance(&mut states, CutoverState::SlotCreated);

        let fetched = self.fetch_manifest(target).await;
        let (manifest, artifact_path) = self.settle(&mut states, CutoverStep::FetchManifest, fetched)?;
        advance(&mut states, CutoverState::ManifestFetched);

        // Parse and validation failures abort here, before any container is declared.
        let topology = self.settle(&mut states, CutoverStep::ApplyTopology, Self::build_topology(&manifest))?;
        let apply = SidecarApplier::new(&self.control_plane)
            .with_concurrency(self.concurrency)
            .with_deadline(self.deadline)
            .apply(target, &topology)
            .await;
        if apply.is_total_failure() {
            let err = MigrationError::TopologyNotApplied {
                failures: apply.failure_summary(),
            };
            return self.settle(&mut states, CutoverStep::ApplyTopology, Err(err));
        }
        if apply.is_partial() {
            tracing::warn!(
                "⚠️ Proceeding with a degraded topology; failed: {}",
                apply.failed_services().join(", ")
            );
        }
        advance(&mut states, CutoverState::TopologyApplied);

        let switched = self
            .call("set runtime mode", self.control_plane.set_runtime_mode(target, SIDECAR_MODE))
            .await;
        self.settle(&mut states, CutoverStep::SwitchMode, switched)?;
        advance(&mut states, CutoverState::ModeSwitched);

        let restarted = self
            .call("restart slot", self.control_plane.restart_slot(target))
            .await;
        self.settle(&mut states, CutoverStep::RestartSlot, restarted)?;
        advance(&mut states, CutoverState::Restarted);

        let promotion_command = target.promotion_command();
        tracing::info!("🚦 Slot '{}' is ready for validation; promote with: {}", target.environment_slot, promotion_command);
        advance(&mut states, CutoverState::AwaitingPromotion);

        Ok(CutoverReport {
            run_id: self.run_id.clone(),
            target: target.clone(),
            states,
            topology,
            apply,
            artifact_path,
            promotion_command,
        })
    }

    /// Read the live configuration, decode the embedded manifest and keep a copy on disk.
    async fn fetch_manifest(&self, target: &DeploymentTarget) -> Result<(String, String)> {
        let config = self
            .call("fetch runtime config", self.control_plane.fetch_runtime_config(target))
            .await?;
        let manifest = decode_runtime_config(config.as_deref())?;

        let artifact_path = self
            .storage
            .write_file(&self.artifact_filename, manifest.as_bytes())
            .await?;
        tracing::info!("📁 Decoded manifest saved to: {}", artifact_path);

        Ok((manifest, artifact_path))
    }

    fn build_topology(manifest: &str) -> Result<Topology> {
        map_topology(extract_services(manifest)?)
    }

    async fn call<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        tracing::debug!("📡 {}", operation);
        with_deadline(operation, self.deadline, call).await
    }

    fn settle<T>(&self, states: &mut Vec<CutoverState>, step: CutoverStep, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            let e = e.at_step(step);
            tracing::error!("❌ Step '{}' failed: {}", step, e.root());
            advance(states, CutoverState::Failed(step));
            e
        })
    }
}

fn advance(states: &mut Vec<CutoverState>, next: CutoverState) {
    if let Some(previous) = states.last() {
        tracing::info!("➡️ {} -> {}", previous, next);
    }
    states.push(next);
}
