pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{AzureControlPlane, LocalStorage, StaticTokenProvider};
pub use config::EngineConfig;
pub use core::orchestrator::CutoverOrchestrator;
pub use domain::model::{CutoverReport, CutoverState, DeploymentTarget};
pub use utils::error::{MigrationError, Result};
