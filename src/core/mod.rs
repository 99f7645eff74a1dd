pub mod applier;
pub mod extractor;
pub mod manifest;
pub mod orchestrator;
pub mod topology;

#[cfg(test)]
pub(crate) mod fakes;

pub use crate::domain::model::{
    ApplyReport, CutoverPlan, CutoverReport, CutoverState, CutoverStep, DeploymentTarget,
    ServiceDescriptor, Topology,
};
pub use crate::domain::ports::{ConfigProvider, ControlPlane, Storage, TokenProvider};
pub use crate::utils::error::Result;
