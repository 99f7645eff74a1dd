pub mod toml_config;

pub use toml_config::EngineConfig;

#[cfg(feature = "cli")]
pub use cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use super::EngineConfig;
    use crate::domain::model::DeploymentTarget;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "sidecar-cutover")]
    #[command(about = "Migrate a compose-based web app onto sidecar containers in a staging slot")]
    pub struct CliConfig {
        /// Subscription that owns the web app
        #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
        pub subscription: String,

        /// Web app name
        #[arg(long)]
        pub name: String,

        #[arg(long)]
        pub resource_group: String,

        /// Staging slot to create and populate
        #[arg(long)]
        pub slot: String,

        /// Bearer token for the management API
        #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
        pub access_token: Option<String>,

        /// TOML settings file
        #[arg(long)]
        pub config: Option<String>,

        #[arg(long)]
        pub management_url: Option<String>,

        #[arg(long)]
        pub api_version: Option<String>,

        #[arg(long)]
        pub timeout_seconds: Option<u64>,

        /// Sidecar declarations in flight at once
        #[arg(long)]
        pub concurrency: Option<usize>,

        /// Directory for the decoded compose artifact
        #[arg(long)]
        pub output_path: Option<String>,

        #[arg(long)]
        pub run_id: Option<String>,

        /// Validate the manifest and print the planned topology without changing anything
        #[arg(long)]
        pub dry_run: bool,

        /// Print the cutover report as JSON on stdout
        #[arg(long)]
        pub json: bool,

        #[arg(long)]
        pub json_logs: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl CliConfig {
        pub fn target(&self) -> DeploymentTarget {
            DeploymentTarget::new(
                self.subscription.trim(),
                self.resource_group.trim(),
                self.name.trim(),
                self.slot.trim(),
            )
        }

        /// `--access-token`, falling back to `AZURE_ACCESS_TOKEN`.
        pub fn access_token(&self) -> Result<&str> {
            validation::validate_required_field("access-token", &self.access_token).map(String::as_str)
        }

        /// Defaults, then the settings file, then command-line flags.
        pub fn settings(&self) -> Result<EngineConfig> {
            let mut settings = match &self.config {
                Some(path) => EngineConfig::from_file(path)?,
                None => EngineConfig::default(),
            };

            if let Some(url) = &self.management_url {
                settings.platform.management_url = url.clone();
            }
            if let Some(version) = &self.api_version {
                settings.platform.api_version = version.clone();
            }
            if let Some(seconds) = self.timeout_seconds {
                settings.platform.request_timeout_seconds = seconds;
            }
            if let Some(concurrency) = self.concurrency {
                settings.apply.concurrency = concurrency;
            }
            if let Some(path) = &self.output_path {
                settings.artifact.output_path = path.clone();
            }

            settings.validate()?;
            Ok(settings)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            let target = self.target();
            validation::validate_resource_name("subscription", &target.account_id)?;
            validation::validate_resource_name("resource-group", &target.resource_group)?;
            validation::validate_resource_name("name", &target.service_name)?;
            validation::validate_slot_name("slot", &target.environment_slot)?;
            Ok(())
        }
    }

}
