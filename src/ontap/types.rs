//! ONTAP REST wire types
//!
//! Request and response bodies for the cluster's REST control plane. Field
//! names follow the ONTAP API verbatim; changing them breaks the array's
//! request parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Volume Creation
// =============================================================================

/// Aggregate reference on a volume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// SVM reference by name or uuid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SvmRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Export policy reference on a NAS volume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportPolicyRef {
    pub name: String,
}

/// NAS section of a plain volume create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeNas {
    pub export_policy: ExportPolicyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Body for `POST /storage/volumes`
#[derive(Debug, Clone, Serialize)]
pub struct VolumeCreate {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub aggregates: Vec<Aggregate>,
    pub svm: SvmRef,
    pub nas: VolumeNas,
}

impl VolumeCreate {
    /// Plain NAS volume on a named aggregate with an export policy
    pub fn new(
        name: &str,
        svm_name: &str,
        aggregate: &str,
        export_policy: &str,
        size: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            size,
            comment: None,
            aggregates: vec![Aggregate {
                name: Some(aggregate.to_string()),
                uuid: None,
            }],
            svm: SvmRef {
                name: Some(svm_name.to_string()),
                uuid: None,
            },
            nas: VolumeNas {
                export_policy: ExportPolicyRef {
                    name: export_policy.to_string(),
                },
                path: None,
            },
        }
    }
}

// =============================================================================
// SMB Application (smart container)
// =============================================================================

/// CIFS access entry on an application create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CifsAccess {
    pub access: String,
    pub user_or_group: String,
}

/// Tiering control on an application component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tiering {
    pub control: String,
}

/// Storage service selection on an application component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageService {
    pub name: String,
}

/// Component of a NAS application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationComponent {
    pub name: String,
    pub total_size: u64,
    pub share_count: u32,
    pub scale_out: bool,
    pub tiering: Tiering,
    pub storage_service: StorageService,
}

/// Protection policy section of a NAS application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionType {
    pub remote_rpo: String,
    pub local_policy: String,
}

/// NAS section of an application create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationNas {
    pub nfs_access: Vec<serde_json::Value>,
    pub cifs_access: Vec<CifsAccess>,
    pub application_components: Vec<ApplicationComponent>,
    pub protection_type: ProtectionType,
}

/// Template reference on an application create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
}

/// Body for `POST /application/applications`
#[derive(Debug, Clone, Serialize)]
pub struct SmbApplication {
    pub name: String,
    pub smart_container: bool,
    pub svm: SvmRef,
    pub nas: ApplicationNas,
    pub template: TemplateRef,
}

impl SmbApplication {
    /// Smart-container application carrying exactly one CIFS share.
    ///
    /// Guests get no access; the share ACL for the bound account is granted
    /// separately after account creation.
    pub fn smart_container(name: &str, svm_name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            smart_container: true,
            svm: SvmRef {
                name: Some(svm_name.to_string()),
                uuid: None,
            },
            nas: ApplicationNas {
                nfs_access: Vec::new(),
                cifs_access: vec![CifsAccess {
                    access: "No_access".to_string(),
                    user_or_group: "BUILTIN\\Guests".to_string(),
                }],
                application_components: vec![ApplicationComponent {
                    name: name.to_string(),
                    total_size: size,
                    share_count: 1,
                    scale_out: false,
                    tiering: Tiering {
                        control: "disallowed".to_string(),
                    },
                    storage_service: StorageService {
                        name: "value".to_string(),
                    },
                }],
                protection_type: ProtectionType {
                    remote_rpo: "none".to_string(),
                    local_policy: "none".to_string(),
                },
            },
            template: TemplateRef {
                name: "nas".to_string(),
            },
        }
    }
}

// =============================================================================
// Share ACLs
// =============================================================================

/// Body for `POST /protocols/cifs/shares/<svm>/<share>/acls`
#[derive(Debug, Clone, Serialize)]
pub struct ShareAcl {
    pub user_or_group: String,
    #[serde(rename = "type")]
    pub acl_type: String,
    pub permission: String,
}

impl ShareAcl {
    /// Full-control grant for a local windows account
    pub fn full_control(user: &str) -> Self {
        Self {
            user_or_group: user.to_string(),
            acl_type: "windows".to_string(),
            permission: "full_control".to_string(),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// One record of a name-filtered collection GET
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
}

/// Collection envelope of a name-filtered GET
#[derive(Debug, Clone, Deserialize)]
pub struct RecordList {
    #[serde(default)]
    pub records: Vec<RecordRef>,
    pub num_records: usize,
}

/// `_links.self` block on job references
#[derive(Debug, Clone, Deserialize)]
pub struct SelfLink {
    #[serde(rename = "self")]
    pub self_link: Href,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Href {
    pub href: String,
}

/// Job block of a 202 accept envelope
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    pub uuid: String,
    #[serde(rename = "_links", default)]
    pub links: Option<SelfLink>,
}

/// Body of a 202 response to an asynchronous mutation
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptEnvelope {
    pub job: JobRef,
}

/// Body of `GET /cluster/jobs/<uuid>`
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub uuid: String,
    #[serde(default)]
    pub description: String,
    pub state: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

// =============================================================================
// Error Envelope
// =============================================================================

/// Error block returned on any non-matching status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target: String,
}

/// `{error: {...}}` envelope wrapping [`ApiErrorBody`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub error: ApiErrorBody,
}
