use crate::domain::model::{ExtractedService, ServiceDescriptor, Topology};
use crate::utils::error::{MigrationError, Result};
use std::collections::HashSet;

/// 指派主容器：宣告順序中的第一個服務為主，其餘皆為 sidecar
///
/// Fails on the first incomplete service, before anything reaches the platform.
pub fn map_topology(services: Vec<ExtractedService>) -> Result<Topology> {
    if services.is_empty() {
        return Err(MigrationError::EmptyTopology);
    }

    let mut seen = HashSet::with_capacity(services.len());
    let mut descriptors = Vec::with_capacity(services.len());

    for (index, service) in services.into_iter().enumerate() {
        let name = service.name.trim().to_string();
        if name.is_empty() {
            return Err(MigrationError::IncompleteServiceDescriptor {
                service: format!("#{}", index + 1),
                field: "name".to_string(),
            });
        }

        if !seen.insert(name.clone()) {
            return Err(MigrationError::manifest(format!(
                "service '{}' is declared more than once",
                name
            )));
        }

        let image = match service.image.map(|image| image.trim().to_string()) {
            Some(image) if !image.is_empty() => image,
            _ => {
                return Err(MigrationError::IncompleteServiceDescriptor {
                    service: name,
                    field: "image".to_string(),
                })
            }
        };

        descriptors.push(ServiceDescriptor {
            name,
            image,
            port: service.port,
            is_primary: index == 0,
        });
    }

    let topology = Topology::from_descriptors(descriptors);
    tracing::info!(
        "🧭 Mapped {} container(s); primary is '{}'",
        topology.len(),
        topology.primary().name
    );

    Ok(topology)
}
