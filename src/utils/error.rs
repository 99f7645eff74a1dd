use crate::domain::model::CutoverStep;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Manifest parse error: {reason}")]
    ManifestParse { reason: String },

    #[error("Manifest declares no services, nothing to migrate")]
    EmptyTopology,

    #[error("Service '{service}' is missing required field '{field}'")]
    IncompleteServiceDescriptor { service: String, field: String },

    #[error("Platform rejected credentials: {message}")]
    PlatformAuth { message: String },

    #[error("{}", format_request_error(.service, .status, .message))]
    PlatformRequest {
        service: Option<String>,
        status: Option<u16>,
        message: String,
    },

    #[error("Platform call '{operation}' exceeded its {seconds}s deadline")]
    PlatformTimeout { operation: String, seconds: u64 },

    #[error("Failed to create slot '{slot}': {message}")]
    SlotCreation { slot: String, message: String },

    #[error("No sidecar container could be applied: {failures}")]
    TopologyNotApplied { failures: String },

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: CutoverStep,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn format_request_error(service: &Option<String>, status: &Option<u16>, message: &str) -> String {
    let status = status
        .map(|code| format!("HTTP {}", code))
        .unwrap_or_else(|| "transport".to_string());
    match service {
        Some(service) => format!("Platform request for service '{}' failed ({}): {}", service, status, message),
        None => format!("Platform request failed ({}): {}", status, message),
    }
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 平台暫時性問題，可以稍後重試
    Medium,
    /// 遷移本身失敗
    High,
    /// 本地系統或設定問題
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl MigrationError {
    pub fn manifest(reason: impl Into<String>) -> Self {
        MigrationError::ManifestParse {
            reason: reason.into(),
        }
    }

    /// Attach the failing orchestrator step. Already wrapped errors keep their original step.
    pub fn at_step(self, step: CutoverStep) -> Self {
        match self {
            MigrationError::StepFailed { .. } => self,
            other => MigrationError::StepFailed {
                step,
                source: Box::new(other),
            },
        }
    }

    pub fn step(&self) -> Option<CutoverStep> {
        match self {
            MigrationError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The error underneath any step wrapper.
    pub fn root(&self) -> &MigrationError {
        match self {
            MigrationError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short kind name, used in per-service outcomes.
    pub fn kind(&self) -> &'static str {
        match self.root() {
            MigrationError::ManifestParse { .. } => "ManifestParse",
            MigrationError::EmptyTopology => "EmptyTopology",
            MigrationError::IncompleteServiceDescriptor { .. } => "IncompleteServiceDescriptor",
            MigrationError::PlatformAuth { .. } => "PlatformAuth",
            MigrationError::PlatformRequest { .. } | MigrationError::Http(_) => "PlatformRequest",
            MigrationError::PlatformTimeout { .. } => "PlatformTimeout",
            MigrationError::SlotCreation { .. } => "SlotCreation",
            MigrationError::TopologyNotApplied { .. } => "TopologyNotApplied",
            MigrationError::Io(_) => "Io",
            MigrationError::Serialization(_) => "Serialization",
            MigrationError::Config { .. }
            | MigrationError::MissingConfig { .. }
            | MigrationError::InvalidConfigValue { .. } => "Config",
            MigrationError::StepFailed { .. } => "StepFailed",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.root() {
            MigrationError::PlatformTimeout { .. } => ErrorSeverity::Medium,
            MigrationError::PlatformRequest {
                status: Some(429 | 500..=599),
                ..
            } => ErrorSeverity::Medium,
            MigrationError::Io(_)
            | MigrationError::Serialization(_)
            | MigrationError::Config { .. }
            | MigrationError::MissingConfig { .. }
            | MigrationError::InvalidConfigValue { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root() {
            MigrationError::ManifestParse { .. } => {
                "Check that the service's current configuration embeds a valid compose document (COMPOSE|<base64>)"
            }
            MigrationError::EmptyTopology => "Declare at least one service in the compose document",
            MigrationError::IncompleteServiceDescriptor { .. } => {
                "Give every service an explicit 'image' reference before migrating"
            }
            MigrationError::PlatformAuth { .. } => {
                "Refresh the access token (az account get-access-token) and verify the role assignment"
            }
            MigrationError::PlatformRequest { .. } | MigrationError::Http(_) => {
                "Inspect the platform error text above; resources created so far are left in place"
            }
            MigrationError::PlatformTimeout { .. } => {
                "Retry later or raise --timeout-seconds; the platform may still complete the call"
            }
            MigrationError::SlotCreation { .. } => {
                "Choose another slot name or check the plan's slot quota"
            }
            MigrationError::TopologyNotApplied { .. } => {
                "Fix the per-service errors listed above and re-run; sidecar declarations are idempotent"
            }
            MigrationError::Io(_) => "Check write permissions for the artifact directory",
            MigrationError::Serialization(_) => "Report the unexpected platform response shape",
            MigrationError::MissingConfig { .. } => {
                "Pass the value as a flag or set its environment variable (e.g. AZURE_ACCESS_TOKEN)"
            }
            MigrationError::Config { .. } | MigrationError::InvalidConfigValue { .. } => {
                "Fix the configuration file or command-line flags"
            }
            MigrationError::StepFailed { .. } => "Inspect the failing step",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MigrationError::StepFailed { step, source } => {
                format!("Cutover stopped at step '{}': {}", step, source)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
