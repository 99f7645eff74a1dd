use crate::utils::error::{MigrationError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Runtime-config prefix of a compose-hosted service
pub const COMPOSE_KIND: &str = "COMPOSE";

/// Runtime mode value that turns on native sidecar hosting
pub const SIDECAR_MODE: &str = "SITECONTAINERS";

/// 從平台的複合設定字串 (`COMPOSE|<base64>`) 解出 compose 文件
pub fn decode_runtime_config(value: Option<&str>) -> Result<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(MigrationError::manifest(
            "the service's runtime configuration has no embedded manifest",
        ));
    }

    if value.eq_ignore_ascii_case(SIDECAR_MODE) {
        return Err(MigrationError::manifest(
            "the service already runs in sidecar mode and carries no embedded manifest",
        ));
    }

    let (kind, encoded) = value.split_once('|').ok_or_else(|| {
        MigrationError::manifest(format!(
            "runtime configuration '{}' is not of the form KIND|payload",
            truncate(value)
        ))
    })?;

    if !kind.trim().eq_ignore_ascii_case(COMPOSE_KIND) {
        return Err(MigrationError::manifest(format!(
            "runtime configuration kind '{}' is not a compose manifest",
            kind.trim()
        )));
    }

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MigrationError::manifest(format!("embedded manifest is not valid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| MigrationError::manifest(format!("embedded manifest is not UTF-8: {}", e)))
}

/// Inverse of `decode_runtime_config`.
pub fn encode_compose(manifest: &str) -> String {
    format!("{}|{}", COMPOSE_KIND, STANDARD.encode(manifest.as_bytes()))
}

fn truncate(value: &str) -> String {
    const LIMIT: usize = 40;
    if value.chars().count() > LIMIT {
        format!("{}…", value.chars().take(LIMIT).collect::<String>())
    } else {
        value.to_string()
    }
}
