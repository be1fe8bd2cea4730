//! Static service catalog
//!
//! The catalog advertised on `GET /v2/catalog` is loaded once from a JSON
//! file at startup; the configured documentation URL is injected into every
//! service's metadata.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One service offering in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    #[serde(default)]
    pub plan_updateable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default)]
    pub metadata: ServiceMetadata,
    pub plans: Vec<Plan>,
}

/// Display metadata on a service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        rename = "documentationUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub documentation_url: Option<String>,
    #[serde(
        rename = "longDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub long_description: Option<String>,
}

/// One plan within a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Load the catalog file and stamp the documentation URL into each service
pub fn load(path: &Path, docs_url: &str) -> Result<Vec<Service>> {
    let raw = std::fs::read(path).map_err(|e| {
        Error::Configuration(format!("cannot read catalog {}: {}", path.display(), e))
    })?;

    let mut services: Vec<Service> = serde_json::from_slice(&raw)
        .map_err(|e| Error::Configuration(format!("invalid catalog file: {}", e)))?;

    for service in &mut services {
        service.metadata.documentation_url = Some(docs_url.to_string());
    }

    Ok(services)
}
