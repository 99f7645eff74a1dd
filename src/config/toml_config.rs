use crate::core::orchestrator::DEFAULT_ARTIFACT_FILENAME;
use crate::core::ConfigProvider;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2024-04-01";

/// Upper bound for transport retries of idempotent calls
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// 引擎設定：可由 TOML 檔案載入，CLI 參數覆寫
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub platform: PlatformConfig,
    pub apply: ApplyConfig,
    pub artifact: ArtifactConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub management_url: String,
    pub api_version: String,
    pub request_timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_seconds: 60,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Sidecar declarations in flight at once
    pub concurrency: usize,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub output_path: String,
    pub filename: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            filename: DEFAULT_ARTIFACT_FILENAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrationError::Config {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MANAGEMENT_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrationError::Config {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("platform.management_url", &self.platform.management_url)?;
        validation::validate_non_empty_string("platform.api_version", &self.platform.api_version)?;
        validation::validate_positive_number(
            "platform.request_timeout_seconds",
            self.platform.request_timeout_seconds,
            1,
        )?;
        validation::validate_range(
            "platform.retry_attempts",
            self.platform.retry_attempts,
            0,
            MAX_RETRY_ATTEMPTS,
        )?;
        validation::validate_positive_number("apply.concurrency", self.apply.concurrency as u64, 1)?;
        validation::validate_path("artifact.output_path", &self.artifact.output_path)?;
        validation::validate_path("artifact.filename", &self.artifact.filename)?;

        if Path::new(&self.artifact.filename).is_absolute() {
            return Err(MigrationError::InvalidConfigValue {
                field: "artifact.filename".to_string(),
                value: self.artifact.filename.clone(),
                reason: "Filename must be relative to artifact.output_path".to_string(),
            });
        }

        Ok(())
    }
}

impl ConfigProvider for EngineConfig {
    fn management_url(&self) -> &str {
        &self.platform.management_url
    }

    fn api_version(&self) -> &str {
        &self.platform.api_version
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.platform.request_timeout_seconds)
    }

    fn retry_attempts(&self) -> u32 {
        self.platform.retry_attempts
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.platform.retry_delay_ms)
    }

    fn concurrency(&self) -> usize {
        self.apply.concurrency
    }

    fn artifact_filename(&self) -> &str {
        &self.artifact.filename
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
