//! ONTAP REST control-plane client
//!
//! One authenticated request/response cycle per call against the cluster
//! management API. Credentials and the TLS verification mode are fixed at
//! construction and reused for every call; the client holds no per-call
//! mutable state and is safe to share across concurrent requests.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ontap::job::job_from_accept;
use crate::ontap::types::{
    ApiErrorEnvelope, JobRecord, RecordList, ShareAcl, SmbApplication, VolumeCreate,
};

/// Client for the array's REST control plane
pub struct RestClient {
    base_url: String,
    host: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl RestClient {
    /// Create a client for the given cluster management URL.
    ///
    /// A URL without a path gets the ONTAP API root `/api` appended.
    pub fn new(
        url: &str,
        username: &str,
        password: &str,
        skip_tls_verify: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let (base_url, host) = normalize_base_url(url)?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(skip_tls_verify)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            host,
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    /// Hostname of the cluster management interface (also the SSH endpoint)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Issue one request and check the response status.
    ///
    /// On a status mismatch the body is decoded as the ONTAP error envelope on
    /// a best-effort basis: fields that fail to decode stay empty rather than
    /// masking the original status-code failure. Network-level failures
    /// surface as [`Error::Http`], distinct from backend rejections.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        expect: StatusCode,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("ONTAP {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status != expect {
            let decoded: ApiErrorEnvelope = serde_json::from_slice(&bytes).unwrap_or_default();
            return Err(Error::Backend {
                status: status.as_u16(),
                code: decoded.error.code,
                message: decoded.error.message,
                target: decoded.error.target,
            });
        }

        Ok(bytes.to_vec())
    }

    /// Resolve a volume name to its uuid; exactly one record must match
    pub async fn volume_id_by_name(&self, name: &str) -> Result<String> {
        let path = format!("/storage/volumes?name={}", urlencoding::encode(name));
        let body = self.request(Method::GET, &path, None, StatusCode::OK).await?;
        one_record_uuid(&body, "volume", name)
    }

    /// Resolve an SVM name to its uuid; exactly one record must match
    pub async fn svm_id_by_name(&self, name: &str) -> Result<String> {
        let path = format!("/svm/svms?name={}", urlencoding::encode(name));
        let body = self.request(Method::GET, &path, None, StatusCode::OK).await?;
        one_record_uuid(&body, "svm", name)
    }

    /// Create a plain NAS volume; returns the job uuid
    pub async fn create_volume(&self, volume: &VolumeCreate) -> Result<String> {
        let body = self
            .request(
                Method::POST,
                "/storage/volumes",
                Some(serde_json::to_value(volume)?),
                StatusCode::ACCEPTED,
            )
            .await?;
        job_from_accept(&body, "creating volume")
    }

    /// Create an SMB share as a smart-container application; returns the job uuid
    pub async fn create_smb_volume(&self, name: &str, svm_name: &str, size: u64) -> Result<String> {
        let application = SmbApplication::smart_container(name, svm_name, size);
        let body = self
            .request(
                Method::POST,
                "/application/applications",
                Some(serde_json::to_value(&application)?),
                StatusCode::ACCEPTED,
            )
            .await?;
        job_from_accept(&body, "creating SMB application")
    }

    /// Delete a volume by uuid; returns the job uuid
    pub async fn delete_volume(&self, uuid: &str) -> Result<String> {
        let path = format!("/storage/volumes/{}", uuid);
        let body = self
            .request(Method::DELETE, &path, None, StatusCode::ACCEPTED)
            .await?;
        job_from_accept(&body, "deleting volume")
    }

    /// Read the current state of a job
    pub async fn job(&self, uuid: &str) -> Result<JobRecord> {
        let path = format!("/cluster/jobs/{}", uuid);
        let body = self.request(Method::GET, &path, None, StatusCode::OK).await?;
        serde_json::from_slice(&body).map_err(|_| Error::UnexpectedResponse {
            context: "reading job status",
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Grant a local account full control on a share
    pub async fn grant_share_access(
        &self,
        svm_uuid: &str,
        share_name: &str,
        username: &str,
    ) -> Result<()> {
        let path = format!("/protocols/cifs/shares/{}/{}/acls", svm_uuid, share_name);
        let acl = ShareAcl::full_control(username);
        self.request(
            Method::POST,
            &path,
            Some(serde_json::to_value(&acl)?),
            StatusCode::CREATED,
        )
        .await?;
        Ok(())
    }
}

/// Normalize the configured management URL into (base URL, hostname)
fn normalize_base_url(url: &str) -> Result<(String, String)> {
    let mut parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Configuration(format!("invalid ONTAP URL {}: {}", url, e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::Configuration(format!("ONTAP URL {} has no host", url)))?
        .to_string();

    if parsed.path().is_empty() || parsed.path() == "/" {
        parsed.set_path("/api");
    }

    let base_url = parsed.to_string().trim_end_matches('/').to_string();
    Ok((base_url, host))
}

/// Decode a name-filtered collection and demand exactly one record
fn one_record_uuid(body: &[u8], kind: &'static str, name: &str) -> Result<String> {
    let list: RecordList = serde_json::from_slice(body).map_err(|_| Error::UnexpectedResponse {
        context: "listing records",
        body: String::from_utf8_lossy(body).into_owned(),
    })?;

    if list.num_records != 1 {
        return Err(Error::LookupCardinality {
            kind,
            name: name.to_string(),
            found: list.num_records,
        });
    }

    list.records
        .first()
        .map(|record| record.uuid.clone())
        .ok_or_else(|| Error::UnexpectedResponse {
            context: "listing records",
            body: String::from_utf8_lossy(body).into_owned(),
        })
}
