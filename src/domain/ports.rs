use crate::domain::model::{DeploymentTarget, ServiceDescriptor, SidecarResource};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Artifact sink for the decoded manifest. `write_file` returns where the data landed.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Resolved engine settings.
pub trait ConfigProvider: Send + Sync {
    fn management_url(&self) -> &str;
    fn api_version(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn retry_attempts(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn concurrency(&self) -> usize;
    fn artifact_filename(&self) -> &str;

    /// Wall-clock allowance for one control-plane call. Covers every transport attempt and
    /// its backoff, plus one extra request because slot creation reads the site before writing.
    fn call_deadline(&self) -> Duration {
        let attempts = self.retry_attempts().saturating_add(1);
        // linear backoff: delay * (1 + 2 + .. + retries)
        let backoff = self.retry_delay() * (attempts * (attempts - 1) / 2);
        self.request_timeout() * (attempts + 1) + backoff
    }
}

/// 憑證能力物件，由外部注入
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// The platform's REST control plane, as seen by the orchestrator.
///
/// Every call is synchronous from the caller's point of view: it resolves once the
/// platform has answered.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create the isolated environment named by `target.environment_slot`.
    async fn create_slot(&self, target: &DeploymentTarget) -> Result<()>;

    /// The composite runtime configuration string of the live service
    /// (`None` when the platform reports no value).
    async fn fetch_runtime_config(&self, target: &DeploymentTarget) -> Result<Option<String>>;

    /// PUT-style declaration of one container on the staging slot.
    async fn upsert_sidecar(
        &self,
        target: &DeploymentTarget,
        descriptor: &ServiceDescriptor,
    ) -> Result<SidecarResource>;

    async fn set_runtime_mode(&self, target: &DeploymentTarget, mode: &str) -> Result<()>;

    async fn restart_slot(&self, target: &DeploymentTarget) -> Result<()>;
}
