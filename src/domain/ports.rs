//! Domain Ports - the service lifecycle boundary
//!
//! The lifecycle trait is the seam between the HTTP request layer and the
//! orchestration against the array. The request layer only sees this trait;
//! tests drive the router against a mock implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

// =============================================================================
// Request Parameters
// =============================================================================

/// Parameters accepted on provision
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionParameters {
    /// Requested share size as a human-readable string, e.g. "100Gi"
    #[serde(default)]
    pub size: Option<String>,
}

/// Structured bind parameters. Known keys are validated by type, unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindParameters {
    /// Container mount path overriding the derived default
    #[serde(default)]
    pub mount: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

/// Opaque token identifying an in-flight backend operation.
///
/// The broker never parses the content; the platform holds it between the
/// accept response and its polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationToken(pub String);

/// Caller-facing lifecycle state of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

/// Result of polling an operation token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatus {
    pub state: OperationState,
    /// Backend's human-readable description, surfaced unchanged
    pub description: String,
}

// =============================================================================
// Bindings
// =============================================================================

/// SMB mount configuration handed to the volume driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// SMB protocol version requested from the mounter
    pub version: String,
    pub username: String,
    pub password: String,
    /// UNC source path, `//<cifs-host>/<share>`
    pub source: String,
}

/// Shared-device section of a volume mount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDevice {
    pub volume_id: String,
    pub mount_config: MountConfig,
}

/// One volume mount entry returned on bind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMount {
    pub container_dir: String,
    pub mode: String,
    pub driver: String,
    pub device_type: String,
    pub device: SharedDevice,
}

/// Result of a bind. The generated credentials exist only in this response;
/// the broker keeps no copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Always an object; the platform rejects a null credentials block
    pub credentials: serde_json::Value,
    pub volume_mounts: Vec<VolumeMount>,
}

// =============================================================================
// Service Lifecycle Port
// =============================================================================

/// Port for the five lifecycle operations the broker supports.
///
/// Retrieval of instances or bindings, in-place update, and binding-scoped
/// polling are permanently unsupported by the backing array; the request
/// layer answers those directly.
#[async_trait]
pub trait ServiceLifecycle: Send + Sync {
    /// Create a share; returns the creation job token
    async fn provision(
        &self,
        instance_id: &str,
        params: Option<ProvisionParameters>,
        async_allowed: bool,
    ) -> Result<OperationToken>;

    /// Delete the share derived from the instance id; returns the deletion job token
    async fn deprovision(&self, instance_id: &str, async_allowed: bool) -> Result<OperationToken>;

    /// Create an account with access to the share and return its mount descriptor
    async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        params: Option<BindParameters>,
    ) -> Result<Binding>;

    /// Delete the account created for the binding
    async fn unbind(&self, instance_id: &str, binding_id: &str) -> Result<()>;

    /// Poll an operation token returned by provision or deprovision
    async fn last_operation(&self, operation: &OperationToken) -> Result<OperationStatus>;
}

pub type ServiceLifecycleRef = Arc<dyn ServiceLifecycle>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_state_wire_strings() {
        assert_eq!(
            serde_json::to_string(&OperationState::InProgress).unwrap(),
            "\"in progress\""
        );
        assert_eq!(
            serde_json::to_string(&OperationState::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(
            serde_json::to_string(&OperationState::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_bind_parameters_ignore_unknown_keys() {
        let params: BindParameters =
            serde_json::from_str(r#"{"mount":"/data/share","uid":1000,"gid":1000}"#).unwrap();
        assert_eq!(params.mount.as_deref(), Some("/data/share"));
    }

    #[test]
    fn test_provision_parameters_size_optional() {
        let params: ProvisionParameters = serde_json::from_str("{}").unwrap();
        assert!(params.size.is_none());

        let params: ProvisionParameters = serde_json::from_str(r#"{"size":"50Gi"}"#).unwrap();
        assert_eq!(params.size.as_deref(), Some("50Gi"));
    }

    #[test]
    fn test_volume_mount_wire_shape() {
        let mount = VolumeMount {
            container_dir: "/var/vcap/data/Avol".into(),
            mode: "rw".into(),
            driver: "smbdriver".into(),
            device_type: "shared".into(),
            device: SharedDevice {
                volume_id: "instance-1".into(),
                mount_config: MountConfig {
                    version: "3.0".into(),
                    username: "u_ab12cd34ef".into(),
                    password: "p_ab12cd34ef".into(),
                    source: "//nas.example.com/Avol".into(),
                },
            },
        };
        let value = serde_json::to_value(&mount).unwrap();
        assert_eq!(value["container_dir"], "/var/vcap/data/Avol");
        assert_eq!(value["device"]["mount_config"]["version"], "3.0");
        assert_eq!(value["device"]["mount_config"]["source"], "//nas.example.com/Avol");
    }
}
