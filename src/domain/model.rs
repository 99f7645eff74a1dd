use serde::{Deserialize, Serialize};
use std::fmt;

/// 遷移目標：由操作者提供，單次執行期間不可變
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub account_id: String,
    pub resource_group: String,
    pub service_name: String,
    pub environment_slot: String,
}

impl DeploymentTarget {
    pub fn new(
        account_id: impl Into<String>,
        resource_group: impl Into<String>,
        service_name: impl Into<String>,
        environment_slot: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            resource_group: resource_group.into(),
            service_name: service_name.into(),
            environment_slot: environment_slot.into(),
        }
    }

    /// The operator command that swaps the validated slot into production.
    pub fn promotion_command(&self) -> String {
        format!(
            "az webapp deployment slot swap --subscription {} --resource-group {} --name {} --slot {} --target-slot production",
            self.account_id, self.resource_group, self.service_name, self.environment_slot
        )
    }

    /// Once slot creation has succeeded the slot stays behind on failure; nothing is rolled back.
    pub fn leftover_slot_notice(&self, failed_at: CutoverStep) -> Option<String> {
        if failed_at == CutoverStep::CreateSlot {
            return None;
        }
        Some(format!(
            "Slot '{}' was created and left in place. Re-run after fixing the error, or remove it with: \
             az webapp deployment slot delete --subscription {} --resource-group {} --name {} --slot {}",
            self.environment_slot, self.account_id, self.resource_group, self.service_name, self.environment_slot
        ))
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.account_id, self.resource_group, self.service_name, self.environment_slot
        )
    }
}

/// A service as read from the manifest, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedService {
    pub name: String,
    pub image: Option<String>,
    pub port: Option<u16>,
}

/// 單一容器的描述，第一個宣告的服務為主容器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub is_primary: bool,
}

/// Validated, ordered descriptor set with exactly one primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    descriptors: Vec<ServiceDescriptor>,
}

impl Topology {
    /// Only the mapper builds topologies, so the single-primary invariant holds by construction.
    pub(crate) fn from_descriptors(descriptors: Vec<ServiceDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn primary(&self) -> &ServiceDescriptor {
        &self.descriptors[0]
    }

    pub fn sidecars(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter().skip(1)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Resource state returned by the control plane after an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarResource {
    pub name: String,
    pub id: Option<String>,
    pub image: String,
    pub is_primary: bool,
    pub target_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied { resource: SidecarResource },
    Failed { kind: String, detail: String },
}

/// Per-service result of one sidecar declaration
#[derive(Debug, Clone, Serialize)]
pub struct SidecarOutcome {
    pub service: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl SidecarOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, OutcomeStatus::Applied { .. })
    }
}

/// 彙整所有容器宣告的結果，順序與描述清單相同
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<SidecarOutcome>,
}

impl ApplyReport {
    pub fn applied(&self) -> impl Iterator<Item = &SidecarOutcome> {
        self.outcomes.iter().filter(|o| o.is_applied())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SidecarOutcome> {
        self.outcomes.iter().filter(|o| !o.is_applied())
    }

    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn failed_services(&self) -> Vec<&str> {
        self.failed().map(|o| o.service.as_str()).collect()
    }

    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.applied_count() == 0
    }

    pub fn is_partial(&self) -> bool {
        self.applied_count() > 0 && self.failed_count() > 0
    }

    /// One "service: detail" line per failure.
    pub fn failure_summary(&self) -> String {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                OutcomeStatus::Failed { kind, detail } => {
                    Some(format!("{} [{}]: {}", o.service, kind, detail))
                }
                OutcomeStatus::Applied { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The orchestrator steps, named in failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoverStep {
    CreateSlot,
    FetchManifest,
    ApplyTopology,
    SwitchMode,
    RestartSlot,
}

impl fmt::Display for CutoverStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CutoverStep::CreateSlot => "create-slot",
            CutoverStep::FetchManifest => "fetch-manifest",
            CutoverStep::ApplyTopology => "apply-topology",
            CutoverStep::SwitchMode => "switch-mode",
            CutoverStep::RestartSlot => "restart-slot",
        };
        f.write_str(name)
    }
}

/// 遷移狀態機，只有單一前進路徑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum CutoverState {
    Start,
    SlotCreated,
    ManifestFetched,
    TopologyApplied,
    ModeSwitched,
    Restarted,
    AwaitingPromotion,
    Failed(CutoverStep),
}

impl fmt::Display for CutoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoverState::Failed(step) => write!(f, "Failed({})", step),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Everything an operator needs after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct CutoverReport {
    pub run_id: String,
    pub target: DeploymentTarget,
    pub states: Vec<CutoverState>,
    pub topology: Topology,
    pub apply: ApplyReport,
    pub artifact_path: String,
    pub promotion_command: String,
}

impl CutoverReport {
    pub fn final_state(&self) -> CutoverState {
        self.states.last().copied().unwrap_or(CutoverState::Start)
    }
}

/// Read-only result of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct CutoverPlan {
    pub run_id: String,
    pub target: DeploymentTarget,
    pub topology: Topology,
    pub artifact_path: String,
}
