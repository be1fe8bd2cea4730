//! Lifecycle orchestration against the array
//!
//! Composes naming, the REST transport, the job abstraction, and the
//! clustershell automation into the five lifecycle operations. Holds no
//! mutable state: every call re-derives identity from its inputs, and all
//! correlation across calls travels in derived names, the binding id, or the
//! opaque job token held by the platform.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use tracing::info;

use crate::broker::capacity::{parse_capacity, MIN_VOLUME_SIZE_BYTES};
use crate::broker::naming::volume_name;
use crate::domain::ports::{
    BindParameters, Binding, MountConfig, OperationState, OperationStatus, OperationToken,
    ProvisionParameters, ServiceLifecycle, SharedDevice, VolumeMount,
};
use crate::error::{Error, Result};
use crate::ontap::client::RestClient;
use crate::ontap::job::JobState;
use crate::ontap::shell::ShellAutomation;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the broker orchestrator
#[derive(Debug, Clone)]
pub struct SmbBrokerConfig {
    /// SVM hosting the provisioned shares
    pub svm_name: String,
    /// Hostname clients use in the SMB source path
    pub cifs_hostname: String,
    /// Prefix for derived volume names
    pub volume_name_prefix: String,
    /// Configured ceiling as given, used in rejection messages
    pub max_volume_size: String,
    /// Configured ceiling in bytes
    pub max_volume_size_bytes: u64,
}

// =============================================================================
// Broker
// =============================================================================

/// The lifecycle orchestrator for SMB shares on the array
pub struct SmbBroker {
    config: SmbBrokerConfig,
    rest: RestClient,
    shell: ShellAutomation,
}

impl SmbBroker {
    pub fn new(config: SmbBrokerConfig, rest: RestClient, shell: ShellAutomation) -> Self {
        Self {
            config,
            rest,
            shell,
        }
    }

    /// Size validation for provision: required parameter, parseable, within
    /// the floor and the configured ceiling. Runs before any backend call.
    fn validated_size(&self, params: Option<ProvisionParameters>) -> Result<(String, u64)> {
        let params =
            params.ok_or_else(|| Error::InvalidParameters("missing parameters".into()))?;
        let size_spec = params
            .size
            .ok_or_else(|| Error::InvalidParameters("size parameter is required".into()))?;

        let size = parse_capacity(&size_spec)?;
        if size < MIN_VOLUME_SIZE_BYTES {
            return Err(Error::VolumeTooSmall {
                minimum: MIN_VOLUME_SIZE_BYTES,
            });
        }
        if size > self.config.max_volume_size_bytes {
            return Err(Error::VolumeTooLarge {
                requested: size_spec,
                maximum: self.config.max_volume_size.clone(),
            });
        }

        Ok((size_spec, size))
    }
}

#[async_trait]
impl ServiceLifecycle for SmbBroker {
    async fn provision(
        &self,
        instance_id: &str,
        params: Option<ProvisionParameters>,
        async_allowed: bool,
    ) -> Result<OperationToken> {
        if !async_allowed {
            return Err(Error::AsyncRequired);
        }

        let (size_spec, size) = self.validated_size(params)?;
        let name = volume_name(&self.config.volume_name_prefix, instance_id);

        info!("Provisioning SMB share {} ({} = {} bytes)", name, size_spec, size);

        let job = self
            .rest
            .create_smb_volume(&name, &self.config.svm_name, size)
            .await?;

        Ok(OperationToken(job))
    }

    async fn deprovision(&self, instance_id: &str, async_allowed: bool) -> Result<OperationToken> {
        if !async_allowed {
            return Err(Error::AsyncRequired);
        }

        let name = volume_name(&self.config.volume_name_prefix, instance_id);
        let uuid = self.rest.volume_id_by_name(&name).await?;

        info!("Deprovisioning SMB share {} ({})", name, uuid);

        let job = self.rest.delete_volume(&uuid).await?;
        Ok(OperationToken(job))
    }

    async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        params: Option<BindParameters>,
    ) -> Result<Binding> {
        let name = volume_name(&self.config.volume_name_prefix, instance_id);

        // fresh credentials on every bind; nothing is cached between calls
        let username = generate_secret();
        let password = generate_secret();

        info!("Binding {} to share {} as {}", binding_id, name, username);

        self.shell
            .create_local_user(&username, &password, binding_id)
            .await?;

        let svm_id = self.rest.svm_id_by_name(&self.config.svm_name).await?;
        self.rest
            .grant_share_access(&svm_id, &name, &username)
            .await?;

        Ok(mount_descriptor(
            &self.config,
            instance_id,
            &name,
            username,
            password,
            params,
        ))
    }

    async fn unbind(&self, instance_id: &str, binding_id: &str) -> Result<()> {
        let name = volume_name(&self.config.volume_name_prefix, instance_id);
        info!("Unbinding {} from share {}", binding_id, name);

        let username = self
            .shell
            .find_local_user(&self.config.svm_name, binding_id)
            .await?
            .ok_or_else(|| Error::AccountNotFound {
                binding_id: binding_id.to_string(),
            })?;

        self.shell.delete_local_user(&username).await
    }

    async fn last_operation(&self, operation: &OperationToken) -> Result<OperationStatus> {
        let job = self.rest.job(&operation.0).await?;
        let state = JobState::from_backend(&job.state)?;

        Ok(OperationStatus {
            state: state.into(),
            description: job.description,
        })
    }
}

impl From<JobState> for OperationState {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Running => OperationState::InProgress,
            JobState::Succeeded => OperationState::Succeeded,
            JobState::Failed => OperationState::Failed,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the mount descriptor returned on bind
fn mount_descriptor(
    config: &SmbBrokerConfig,
    instance_id: &str,
    volume_name: &str,
    username: String,
    password: String,
    params: Option<BindParameters>,
) -> Binding {
    let container_dir = params
        .and_then(|p| p.mount)
        .filter(|mount| !mount.is_empty())
        .unwrap_or_else(|| format!("/var/vcap/data/{}", volume_name));

    let mount_config = MountConfig {
        version: "3.0".to_string(),
        username,
        password,
        source: format!("//{}/{}", config.cifs_hostname, volume_name),
    };

    Binding {
        // the platform chokes on a null credentials block
        credentials: serde_json::json!({}),
        volume_mounts: vec![VolumeMount {
            container_dir,
            mode: "rw".to_string(),
            driver: "smbdriver".to_string(),
            device_type: "shared".to_string(),
            device: SharedDevice {
                volume_id: instance_id.to_string(),
                mount_config,
            },
        }],
    }
}

/// Generate a short random secret usable as a CLI argument.
///
/// Always starts with a letter so generated usernames survive the array's
/// naming rules.
fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let first = char::from(b'a' + rng.gen_range(0..26u8));
    let rest: String = (&mut rng)
        .sample_iter(Alphanumeric)
        .take(11)
        .map(char::from)
        .collect();
    format!("{}{}", first, rest)
}
