use crate::domain::model::{DeploymentTarget, ServiceDescriptor, SidecarResource};
use crate::domain::ports::{ConfigProvider, ControlPlane, TokenProvider};
use crate::utils::error::{MigrationError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("sidecar-cutover/", env!("CARGO_PKG_VERSION"));

/// Statuses worth another attempt on an idempotent call
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteContainerProperties<'a> {
    image: &'a str,
    is_main: bool,
    // The platform models the port as a string; absent means no routed port.
    #[serde(skip_serializing_if = "Option::is_none")]
    target_port: Option<String>,
}

#[derive(Debug, Serialize)]
struct SiteContainerEnvelope<'a> {
    properties: SiteContainerProperties<'a>,
}

/// Request body of the "create or update site container" call.
pub fn sidecar_payload(descriptor: &ServiceDescriptor) -> Result<Value> {
    let envelope = SiteContainerEnvelope {
        properties: SiteContainerProperties {
            image: &descriptor.image,
            is_main: descriptor.is_primary,
            target_port: descriptor.port.map(|port| port.to_string()),
        },
    };
    Ok(serde_json::to_value(envelope)?)
}

/// Azure Resource Manager client for App Service sites, slots and site containers.
pub struct AzureControlPlane<T: TokenProvider> {
    client: Client,
    base_url: Url,
    api_version: String,
    request_timeout: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
    credentials: T,
}

impl<T: TokenProvider> AzureControlPlane<T> {
    pub fn new<P: ConfigProvider>(settings: &P, credentials: T) -> Result<Self> {
        let base_url = Url::parse(settings.management_url()).map_err(|e| MigrationError::InvalidConfigValue {
            field: "platform.management_url".to_string(),
            value: settings.management_url().to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_version: settings.api_version().to_string(),
            request_timeout: settings.request_timeout(),
            retry_attempts: settings.retry_attempts(),
            retry_delay: settings.retry_delay(),
            credentials,
        })
    }

    /// `.../providers/Microsoft.Web/sites/{service}` followed by `extra` segments.
    fn site_url(&self, target: &DeploymentTarget, extra: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| MigrationError::InvalidConfigValue {
                field: "platform.management_url".to_string(),
                value: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty().extend([
                "subscriptions",
                target.account_id.as_str(),
                "resourceGroups",
                target.resource_group.as_str(),
                "providers",
                "Microsoft.Web",
                "sites",
                target.service_name.as_str(),
            ]);
            segments.extend(extra);
        }
        Ok(url)
    }

    fn slot_url(&self, target: &DeploymentTarget, extra: &[&str]) -> Result<Url> {
        let mut segments = vec!["slots", target.environment_slot.as_str()];
        segments.extend_from_slice(extra);
        self.site_url(target, &segments)
    }

    /// Send one request. Idempotent calls are retried on throttling, 5xx and connection errors.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<&Value>,
        service: Option<&str>,
        idempotent: bool,
    ) -> Result<Option<Value>> {
        let attempts = if idempotent { self.retry_attempts + 1 } else { 1 };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let token = self.credentials.access_token().await?;
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .query(&[("api-version", self.api_version.as_str())])
                .bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::debug!("📡 {} {} (attempt {}/{})", method, url.path(), attempt, attempts);

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    return Err(MigrationError::PlatformTimeout {
                        operation: operation.to_string(),
                        seconds: self.request_timeout.as_secs(),
                    })
                }
                Err(e) if e.is_connect() && attempt < attempts => {
                    tracing::warn!("🔁 {}: connection failed ({}), retrying", operation, e);
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    continue;
                }
                Err(e) => {
                    return Err(MigrationError::PlatformRequest {
                        service: service.map(str::to_string),
                        status: None,
                        message: e.to_string(),
                    })
                }
            };

            let status = response.status();
            if status.is_success() {
                let text = response.text().await?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(serde_json::from_str(&text)?));
            }

            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("no response body").to_string()
            } else {
                text
            };

            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(MigrationError::PlatformAuth { message });
            }

            if RETRYABLE_STATUSES.contains(&status.as_u16()) && attempt < attempts {
                tracing::warn!("🔁 {}: HTTP {}, retrying", operation, status.as_u16());
                tokio::time::sleep(self.retry_delay * attempt).await;
                continue;
            }

            return Err(MigrationError::PlatformRequest {
                service: service.map(str::to_string),
                status: Some(status.as_u16()),
                message,
            });
        }
    }
}

fn port_field(value: Option<&Value>) -> Option<u16> {
    match value? {
        Value::String(port) => port.parse().ok(),
        Value::Number(port) => port.as_u64().and_then(|p| u16::try_from(p).ok()),
        _ => None,
    }
}

#[async_trait]
impl<T: TokenProvider> ControlPlane for AzureControlPlane<T> {
    async fn create_slot(&self, target: &DeploymentTarget) -> Result<()> {
        let slot_error = |e: MigrationError| match e {
            MigrationError::PlatformAuth { .. } | MigrationError::PlatformTimeout { .. } => e,
            other => MigrationError::SlotCreation {
                slot: target.environment_slot.clone(),
                message: other.to_string(),
            },
        };

        // Slots must live in the same region as their site.
        let site = self
            .send("read site", Method::GET, self.site_url(target, &[])?, None, None, true)
            .await
            .map_err(slot_error)?
            .unwrap_or(Value::Null);
        let location = site["location"].as_str().ok_or_else(|| MigrationError::SlotCreation {
            slot: target.environment_slot.clone(),
            message: format!("site '{}' reported no location", target.service_name),
        })?;

        let body = serde_json::json!({ "location": location, "properties": {} });
        self.send("create slot", Method::PUT, self.slot_url(target, &[])?, Some(&body), None, false)
            .await
            .map_err(slot_error)?;

        tracing::info!("🧪 Slot '{}' created in {}", target.environment_slot, location);
        Ok(())
    }

    async fn fetch_runtime_config(&self, target: &DeploymentTarget) -> Result<Option<String>> {
        let config = self
            .send(
                "fetch runtime config",
                Method::GET,
                self.site_url(target, &["config", "web"])?,
                None,
                None,
                true,
            )
            .await?;

        Ok(config
            .as_ref()
            .and_then(|c| c["properties"]["linuxFxVersion"].as_str())
            .map(str::to_string))
    }

    async fn upsert_sidecar(
        &self,
        target: &DeploymentTarget,
        descriptor: &ServiceDescriptor,
    ) -> Result<SidecarResource> {
        let body = sidecar_payload(descriptor)?;
        let response = self
            .send(
                "upsert sidecar",
                Method::PUT,
                self.slot_url(target, &["sitecontainers", descriptor.name.as_str()])?,
                Some(&body),
                Some(&descriptor.name),
                true,
            )
            .await?
            .unwrap_or(Value::Null);

        let properties = &response["properties"];
        Ok(SidecarResource {
            name: descriptor.name.clone(),
            id: response["id"].as_str().map(str::to_string),
            image: properties["image"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| descriptor.image.clone()),
            is_primary: properties["isMain"].as_bool().unwrap_or(descriptor.is_primary),
            target_port: port_field(properties.get("targetPort")).or(descriptor.port),
        })
    }

    async fn set_runtime_mode(&self, target: &DeploymentTarget, mode: &str) -> Result<()> {
        let body = serde_json::json!({ "properties": { "linuxFxVersion": mode } });
        self.send(
            "set runtime mode",
            Method::PATCH,
            self.slot_url(target, &["config", "web"])?,
            Some(&body),
            None,
            false,
        )
        .await?;
        tracing::info!("🔀 Slot '{}' runtime mode set to {}", target.environment_slot, mode);
        Ok(())
    }

    async fn restart_slot(&self, target: &DeploymentTarget) -> Result<()> {
        self.send(
            "restart slot",
            Method::POST,
            self.slot_url(target, &["restart"])?,
            None,
            None,
            false,
        )
        .await?;
        tracing::info!("🔄 Slot '{}' restarted", target.environment_slot);
        Ok(())
    }
}
