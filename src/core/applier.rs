use crate::domain::model::{
    ApplyReport, DeploymentTarget, OutcomeStatus, ServiceDescriptor, SidecarOutcome, Topology,
};
use crate::domain::ports::ControlPlane;
use crate::utils::deadline::with_deadline;
use futures::stream::{self, StreamExt};
use std::time::Duration;

/// 對每個容器發出 upsert，單一失敗不會中斷其他容器
pub struct SidecarApplier<'a, C: ControlPlane> {
    control_plane: &'a C,
    concurrency: usize,
    deadline: Duration,
}

impl<'a, C: ControlPlane> SidecarApplier<'a, C> {
    pub fn new(control_plane: &'a C) -> Self {
        Self {
            control_plane,
            concurrency: 1,
            deadline: Duration::from_secs(60),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Declare every descriptor and wait for all of them. Outcomes keep topology order.
    pub async fn apply(&self, target: &DeploymentTarget, topology: &Topology) -> ApplyReport {
        tracing::info!(
            "📦 Declaring {} container(s) on slot '{}' (concurrency {})",
            topology.len(),
            target.environment_slot,
            self.concurrency
        );

        // `buffered` yields in input order, which keeps per-service attribution stable.
        let outcomes = stream::iter(topology.descriptors())
            .map(|descriptor| self.apply_one(target, descriptor))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = ApplyReport { outcomes };
        if report.failed_count() > 0 {
            tracing::warn!(
                "⚠️ {} of {} container declaration(s) failed: {}",
                report.failed_count(),
                report.outcomes.len(),
                report.failed_services().join(", ")
            );
        } else {
            tracing::info!("✅ All {} container(s) declared", report.applied_count());
        }
        report
    }

    async fn apply_one(&self, target: &DeploymentTarget, descriptor: &ServiceDescriptor) -> SidecarOutcome {
        let operation = format!("upsert sidecar '{}'", descriptor.name);
        let result = with_deadline(
            &operation,
            self.deadline,
            self.control_plane.upsert_sidecar(target, descriptor),
        )
        .await;

        let status = match result {
            Ok(resource) => {
                tracing::info!(
                    "✅ {} '{}' -> {}",
                    if descriptor.is_primary { "Primary" } else { "Sidecar" },
                    descriptor.name,
                    resource.image
                );
                OutcomeStatus::Applied { resource }
            }
            Err(e) => {
                tracing::error!("❌ Sidecar '{}' failed: {}", descriptor.name, e);
                OutcomeStatus::Failed {
                    kind: e.kind().to_string(),
                    detail: e.to_string(),
                }
            }
        };

        SidecarOutcome {
            service: descriptor.name.clone(),
            status,
        }
    }
}
