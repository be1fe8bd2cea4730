//! Open Service Broker API handlers
//!
//! Implements the OSB v2 surface the platform calls: catalog, instance
//! provisioning and deletion, binding lifecycle, and operation polling.
//! Instances and bindings are not retrievable and volumes cannot be updated
//! in place; those routes answer with a fixed error.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::Service;
use crate::domain::ports::{
    BindParameters, OperationToken, ProvisionParameters, ServiceLifecycleRef,
};
use crate::error::{Error, ErrorClass};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Body of `PUT /v2/service_instances/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequestBody {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<ProvisionParameters>,
}

/// Body of `PUT /v2/service_instances/{id}/service_bindings/{bid}`
#[derive(Debug, Clone, Deserialize)]
pub struct BindRequestBody {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<BindParameters>,
}

/// `accepts_incomplete` query flag on state-changing requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsyncQuery {
    #[serde(default)]
    pub accepts_incomplete: bool,
}

/// Query of `GET .../last_operation`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastOperationQuery {
    #[serde(default)]
    pub operation: Option<String>,
}

/// 202 body carrying the operation token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncOperationResponse {
    pub operation: String,
}

/// Catalog envelope
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse<'a> {
    pub services: &'a [Service],
}

/// OSB error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsbError {
    pub error: String,
    pub description: String,
}

// =============================================================================
// Router
// =============================================================================

/// OSB router builder
pub struct OsbRouter {
    lifecycle: ServiceLifecycleRef,
    catalog: Arc<Vec<Service>>,
}

impl OsbRouter {
    pub fn new(lifecycle: ServiceLifecycleRef, catalog: Arc<Vec<Service>>) -> Self {
        Self { lifecycle, catalog }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            lifecycle: self.lifecycle,
            catalog: self.catalog,
        };

        Router::new()
            .route("/v2/catalog", get(get_catalog))
            .route(
                "/v2/service_instances/:instance_id",
                put(provision_instance)
                    .delete(deprovision_instance)
                    .get(get_instance)
                    .patch(update_instance),
            )
            .route(
                "/v2/service_instances/:instance_id/last_operation",
                get(last_operation),
            )
            .route(
                "/v2/service_instances/:instance_id/service_bindings/:binding_id",
                put(bind_instance).delete(unbind_instance).get(get_binding),
            )
            .route(
                "/v2/service_instances/:instance_id/service_bindings/:binding_id/last_operation",
                get(binding_last_operation),
            )
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    lifecycle: ServiceLifecycleRef,
    catalog: Arc<Vec<Service>>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve the static catalog
async fn get_catalog(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(CatalogResponse {
            services: &state.catalog,
        }),
    )
        .into_response()
}

/// Provision a share
async fn provision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    Json(body): Json<ProvisionRequestBody>,
) -> Response {
    info!(
        "Provision {} (service {}, plan {})",
        instance_id, body.service_id, body.plan_id
    );

    match state
        .lifecycle
        .provision(&instance_id, body.parameters, query.accepts_incomplete)
        .await
    {
        Ok(operation) => (
            StatusCode::ACCEPTED,
            Json(AsyncOperationResponse {
                operation: operation.0,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Provision of {} failed: {}", instance_id, e);
            error_response(&e)
        }
    }
}

/// Deprovision a share
async fn deprovision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
) -> Response {
    info!("Deprovision {}", instance_id);

    match state
        .lifecycle
        .deprovision(&instance_id, query.accepts_incomplete)
        .await
    {
        Ok(operation) => (
            StatusCode::ACCEPTED,
            Json(AsyncOperationResponse {
                operation: operation.0,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Deprovision of {} failed: {}", instance_id, e);
            error_response(&e)
        }
    }
}

/// Poll a provision or deprovision job
async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Response {
    let Some(operation) = query.operation else {
        return error_response(&Error::InvalidParameters(
            "operation query parameter is required".into(),
        ));
    };

    match state
        .lifecycle
        .last_operation(&OperationToken(operation))
        .await
    {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            error!("Polling operation for {} failed: {}", instance_id, e);
            error_response(&e)
        }
    }
}

/// Create a binding: account, share ACL, mount descriptor
async fn bind_instance(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Json(body): Json<BindRequestBody>,
) -> Response {
    info!(
        "Bind {} on {} (service {}, plan {})",
        binding_id, instance_id, body.service_id, body.plan_id
    );

    match state
        .lifecycle
        .bind(&instance_id, &binding_id, body.parameters)
        .await
    {
        Ok(binding) => (StatusCode::CREATED, Json(binding)).into_response(),
        Err(e) => {
            error!("Bind {} on {} failed: {}", binding_id, instance_id, e);
            error_response(&e)
        }
    }
}

/// Delete the binding's account
async fn unbind_instance(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> Response {
    info!("Unbind {} on {}", binding_id, instance_id);

    match state.lifecycle.unbind(&instance_id, &binding_id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({}))).into_response(),
        Err(e) => {
            error!("Unbind {} on {} failed: {}", binding_id, instance_id, e);
            error_response(&e)
        }
    }
}

/// Instances cannot be read back from the array
async fn get_instance() -> Response {
    error_response(&Error::NotSupported("instances are not retrievable"))
}

/// Bindings cannot be read back from the array
async fn get_binding() -> Response {
    error_response(&Error::NotSupported("bindings are not retrievable"))
}

/// In-place volume update has no backend path
async fn update_instance() -> Response {
    error_response(&Error::NotSupported(
        "updating a volume in place is not supported",
    ))
}

/// Bind and unbind complete synchronously; there is nothing to poll
async fn binding_last_operation() -> Response {
    error_response(&Error::NotSupported(
        "binding operations cannot be polled",
    ))
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Map a broker error onto an OSB status code and error body
fn error_response(err: &Error) -> Response {
    let (status, code) = match err {
        Error::AsyncRequired => (StatusCode::UNPROCESSABLE_ENTITY, "AsyncRequired"),
        _ => match err.class() {
            ErrorClass::Validation => (StatusCode::BAD_REQUEST, "InvalidParameters"),
            ErrorClass::Unsupported => (StatusCode::BAD_REQUEST, "NotSupported"),
            ErrorClass::Lookup => (StatusCode::INTERNAL_SERVER_ERROR, "LookupFailed"),
            ErrorClass::Transport => (StatusCode::INTERNAL_SERVER_ERROR, "TransportError"),
            ErrorClass::Backend => (StatusCode::INTERNAL_SERVER_ERROR, "BackendError"),
            ErrorClass::Contract => (StatusCode::INTERNAL_SERVER_ERROR, "ContractViolation"),
            ErrorClass::Shell => (StatusCode::INTERNAL_SERVER_ERROR, "ShellAutomationFailed"),
            ErrorClass::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        },
    };

    (
        status,
        Json(OsbError {
            error: code.to_string(),
            description: err.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    use crate::broker::capacity::{parse_capacity, MIN_VOLUME_SIZE_BYTES};
    use crate::domain::ports::{
        Binding, MountConfig, OperationStatus, ServiceLifecycle, SharedDevice, VolumeMount,
    };
    use crate::error::Result;
    use crate::ontap::job::JobState;

    /// Lifecycle double with the orchestrator's validation rules and canned
    /// backend results. `last_operation` treats the token as the backend job
    /// state so polls can exercise the real state mapping.
    struct MockLifecycle {
        max_volume_size_bytes: u64,
    }

    impl MockLifecycle {
        fn with_ceiling(ceiling: &str) -> Self {
            Self {
                max_volume_size_bytes: parse_capacity(ceiling).unwrap(),
            }
        }
    }

    #[async_trait]
    impl ServiceLifecycle for MockLifecycle {
        async fn provision(
            &self,
            _instance_id: &str,
            params: Option<ProvisionParameters>,
            async_allowed: bool,
        ) -> Result<OperationToken> {
            if !async_allowed {
                return Err(Error::AsyncRequired);
            }
            let size_spec = params
                .and_then(|p| p.size)
                .ok_or_else(|| Error::InvalidParameters("size parameter is required".into()))?;
            let size = parse_capacity(&size_spec)?;
            if size < MIN_VOLUME_SIZE_BYTES {
                return Err(Error::VolumeTooSmall {
                    minimum: MIN_VOLUME_SIZE_BYTES,
                });
            }
            if size > self.max_volume_size_bytes {
                return Err(Error::VolumeTooLarge {
                    requested: size_spec,
                    maximum: "2Ti".into(),
                });
            }
            Ok(OperationToken("create-job-1".into()))
        }

        async fn deprovision(
            &self,
            _instance_id: &str,
            async_allowed: bool,
        ) -> Result<OperationToken> {
            if !async_allowed {
                return Err(Error::AsyncRequired);
            }
            Ok(OperationToken("delete-job-1".into()))
        }

        async fn bind(
            &self,
            instance_id: &str,
            binding_id: &str,
            _params: Option<BindParameters>,
        ) -> Result<Binding> {
            if binding_id == "broken" {
                return Err(Error::ShellCommand {
                    status: 1,
                    output: "create failed".into(),
                });
            }
            Ok(Binding {
                credentials: serde_json::json!({}),
                volume_mounts: vec![VolumeMount {
                    container_dir: "/var/vcap/data/Ainst".into(),
                    mode: "rw".into(),
                    driver: "smbdriver".into(),
                    device_type: "shared".into(),
                    device: SharedDevice {
                        volume_id: instance_id.to_string(),
                        mount_config: MountConfig {
                            version: "3.0".into(),
                            username: "u1".into(),
                            password: "p1".into(),
                            source: "//nas.example.com/Ainst".into(),
                        },
                    },
                }],
            })
        }

        async fn unbind(&self, _instance_id: &str, binding_id: &str) -> Result<()> {
            if binding_id == "missing" {
                return Err(Error::AccountNotFound {
                    binding_id: binding_id.to_string(),
                });
            }
            Ok(())
        }

        async fn last_operation(&self, operation: &OperationToken) -> Result<OperationStatus> {
            let state = JobState::from_backend(&operation.0)?;
            Ok(OperationStatus {
                state: state.into(),
                description: format!("job {}", operation.0),
            })
        }
    }

    fn test_app() -> Router {
        OsbRouter::new(
            Arc::new(MockLifecycle::with_ceiling("2Ti")),
            Arc::new(Vec::new()),
        )
        .build()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn provision_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_provision_then_poll_to_completion() {
        // provision with a size well under the ceiling is accepted
        let response = test_app()
            .oneshot(provision_request(
                "/v2/service_instances/inst-1?accepts_incomplete=true",
                r#"{"service_id":"svc","plan_id":"plan","parameters":{"size":"50Gi"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let value = body_json(response).await;
        assert_eq!(value["operation"], "create-job-1");

        // a running job polls as "in progress"
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v2/service_instances/inst-1/last_operation?operation=running")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["state"], "in progress");

        // a finished job polls as "succeeded"
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v2/service_instances/inst-1/last_operation?operation=success")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let value = body_json(response).await;
        assert_eq!(value["state"], "succeeded");
    }

    #[tokio::test]
    async fn test_provision_without_async_support_is_rejected() {
        let response = test_app()
            .oneshot(provision_request(
                "/v2/service_instances/inst-1",
                r#"{"service_id":"svc","plan_id":"plan","parameters":{"size":"50Gi"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let value = body_json(response).await;
        assert_eq!(value["error"], "AsyncRequired");
    }

    #[tokio::test]
    async fn test_provision_over_ceiling_is_rejected() {
        let response = test_app()
            .oneshot(provision_request(
                "/v2/service_instances/inst-1?accepts_incomplete=true",
                r#"{"service_id":"svc","plan_id":"plan","parameters":{"size":"3Ti"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert_eq!(value["error"], "InvalidParameters");
        assert!(value["description"].as_str().unwrap().contains("3Ti"));
    }

    #[tokio::test]
    async fn test_poll_requires_operation_token() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v2/service_instances/inst-1/last_operation")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_poll_unknown_backend_state_is_contract_violation() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v2/service_instances/inst-1/last_operation?operation=paused")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = body_json(response).await;
        assert_eq!(value["error"], "ContractViolation");
    }

    #[tokio::test]
    async fn test_bind_returns_mount_descriptor() {
        let response = test_app()
            .oneshot(provision_request(
                "/v2/service_instances/inst-1/service_bindings/bind-1",
                r#"{"service_id":"svc","plan_id":"plan"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let value = body_json(response).await;
        assert_eq!(
            value["volume_mounts"][0]["device"]["mount_config"]["source"],
            "//nas.example.com/Ainst"
        );
        assert!(value["credentials"].is_object());
    }

    #[tokio::test]
    async fn test_unbind_missing_account_fails() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/v2/service_instances/inst-1/service_bindings/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = body_json(response).await;
        assert_eq!(value["error"], "LookupFailed");
    }

    #[tokio::test]
    async fn test_unbind_success_is_empty_object() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/v2/service_instances/inst-1/service_bindings/bind-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unsupported_routes() {
        for (method, uri) in [
            (Method::GET, "/v2/service_instances/inst-1"),
            (Method::PATCH, "/v2/service_instances/inst-1"),
            (
                Method::GET,
                "/v2/service_instances/inst-1/service_bindings/bind-1",
            ),
            (
                Method::GET,
                "/v2/service_instances/inst-1/service_bindings/bind-1/last_operation",
            ),
        ] {
            let response = test_app()
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "{} {} should be unsupported",
                method,
                uri
            );
            let value = body_json(response).await;
            assert_eq!(value["error"], "NotSupported");
        }
    }

    #[tokio::test]
    async fn test_catalog_served() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v2/catalog")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["services"], serde_json::json!([]));
    }
}
