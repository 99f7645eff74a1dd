use crate::domain::model::ExtractedService;
use crate::utils::error::{MigrationError, Result};
use serde_yaml::{Mapping, Value};

/// 解析 compose 文件，依宣告順序輸出服務
///
/// Accepts both the full compose shape (`services:` at the top level) and a bare
/// `name -> {image, ports}` mapping. Only `image` and the first `ports` entry are read.
pub fn extract_services(manifest: &str) -> Result<Vec<ExtractedService>> {
    let document: Value = serde_yaml::from_str(manifest)
        .map_err(|e| MigrationError::manifest(format!("invalid compose document: {}", e)))?;

    let services = services_mapping(&document)?;
    if services.is_empty() {
        return Err(MigrationError::EmptyTopology);
    }

    // Names are captured into a Vec here so the primary rule never depends on map iteration.
    let mut extracted = Vec::with_capacity(services.len());
    for (key, body) in &services {
        let name = service_name(key)?;
        let service = extract_service(name, body)?;
        tracing::debug!(
            "🔎 Found service '{}' (image: {:?}, port: {:?})",
            service.name,
            service.image,
            service.port
        );
        extracted.push(service);
    }

    Ok(extracted)
}

fn services_mapping(document: &Value) -> Result<Mapping> {
    let node = match document {
        Value::Null => return Err(MigrationError::EmptyTopology),
        Value::Mapping(top) => top.get("services").unwrap_or(document),
        other => {
            return Err(MigrationError::manifest(format!(
                "top level must be a mapping, found {}",
                kind_of(other)
            )))
        }
    };

    match node {
        Value::Null => Err(MigrationError::EmptyTopology),
        Value::Mapping(services) => Ok(services.clone()),
        other => Err(MigrationError::manifest(format!(
            "'services' must be a mapping, found {}",
            kind_of(other)
        ))),
    }
}

fn service_name(key: &Value) -> Result<String> {
    match key {
        Value::String(name) => Ok(name.clone()),
        other => Err(MigrationError::manifest(format!(
            "service keys must be strings, found {}",
            kind_of(other)
        ))),
    }
}

fn extract_service(name: String, body: &Value) -> Result<ExtractedService> {
    let body = match body {
        // `worker:` with no body; the mapper reports the missing image
        Value::Null => {
            return Ok(ExtractedService {
                name,
                image: None,
                port: None,
            })
        }
        Value::Mapping(body) => body,
        other => {
            return Err(MigrationError::manifest(format!(
                "service '{}' must be a mapping, found {}",
                name,
                kind_of(other)
            )))
        }
    };

    let image = match body.get("image") {
        None | Some(Value::Null) => None,
        Some(Value::String(image)) => Some(image.clone()),
        Some(other) => {
            return Err(MigrationError::manifest(format!(
                "service '{}' has a non-string image ({})",
                name,
                kind_of(other)
            )))
        }
    };

    let port = match body.get("ports") {
        None | Some(Value::Null) => None,
        Some(Value::Sequence(ports)) => match ports.first() {
            Some(first) => Some(parse_port(&name, first)?),
            None => None,
        },
        Some(other) => {
            return Err(MigrationError::manifest(format!(
                "service '{}' has ports of type {}, expected a list",
                name,
                kind_of(other)
            )))
        }
    };

    Ok(ExtractedService { name, image, port })
}

/// Container-side port of one `ports` entry: `"80"`, `"8080:80"`, `"127.0.0.1:8080:80/tcp"`,
/// a bare number, or long syntax with `target`.
fn parse_port(service: &str, entry: &Value) -> Result<u16> {
    match entry {
        Value::Number(number) => number
            .as_u64()
            .map(|n| port_from_u64(service, n))
            .unwrap_or_else(|| Err(bad_port(service, &number.to_string()))),
        Value::String(mapping) => {
            let without_protocol = mapping.split('/').next().unwrap_or_default();
            let container = without_protocol.rsplit(':').next().unwrap_or_default().trim();
            container
                .parse::<u64>()
                .map_err(|_| bad_port(service, mapping))
                .and_then(|n| port_from_u64(service, n))
        }
        Value::Mapping(long) => match long.get("target") {
            Some(target) => parse_port(service, target),
            None => Err(MigrationError::manifest(format!(
                "service '{}' has a long-syntax port without 'target'",
                service
            ))),
        },
        other => Err(bad_port(service, kind_of(other))),
    }
}

fn port_from_u64(service: &str, value: u64) -> Result<u16> {
    match u16::try_from(value) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(bad_port(service, &value.to_string())),
    }
}

fn bad_port(service: &str, raw: &str) -> MigrationError {
    MigrationError::manifest(format!(
        "service '{}' has an unsupported port mapping '{}'",
        service, raw
    ))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
