//! Translates the core error taxonomy (spec.md §7) into HTTP responses.
//! This is the one place in the workspace allowed to know about status
//! codes — every other crate stays HTTP-agnostic.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use orchestry_control::ControlError;
use orchestry_types::OrchestryError;

pub struct ApiError(pub OrchestryError);

impl From<OrchestryError> for ApiError {
    fn from(err: OrchestryError) -> Self {
        Self(err)
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        Self(err.into())
    }
}

impl From<orchestry_validation::ValidationError> for ApiError {
    fn from(err: orchestry_validation::ValidationError) -> Self {
        Self(OrchestryError::Validation(err.to_string()))
    }
}

impl From<orchestry_store::StoreError> for ApiError {
    fn from(err: orchestry_store::StoreError) -> Self {
        Self(err.into())
    }
}

impl From<orchestry_replica::ReplicaError> for ApiError {
    fn from(err: orchestry_replica::ReplicaError) -> Self {
        Self(err.into())
    }
}

impl From<orchestry_proxy::ProxyError> for ApiError {
    fn from(err: orchestry_proxy::ProxyError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, leader_header) = match &self.0 {
            OrchestryError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            OrchestryError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            OrchestryError::Conflict(_) => (StatusCode::CONFLICT, None),
            OrchestryError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
            OrchestryError::Runtime(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            OrchestryError::Proxy(_) => (StatusCode::BAD_GATEWAY, None),
            OrchestryError::NotLeader { current_leader } => {
                (StatusCode::SERVICE_UNAVAILABLE, current_leader.clone())
            }
            OrchestryError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
        };

        let body = Json(json!({ "error": self.0.to_string() }));
        let mut response = (status, body).into_response();
        if let Some(leader) = leader_header {
            if let Ok(value) = HeaderValue::from_str(&leader) {
                response.headers_mut().insert("X-Current-Leader", value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_leader_maps_to_503_with_leader_header() {
        let err = ApiError(OrchestryError::NotLeader { current_leader: Some("node-a".to_string()) });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get("X-Current-Leader").unwrap(), "node-a");
    }

    #[test]
    fn not_leader_without_known_leader_omits_header() {
        let err = ApiError(OrchestryError::NotLeader { current_leader: None });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get("X-Current-Leader").is_none());
    }

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError(OrchestryError::Validation("bad spec".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError(OrchestryError::NotFound("demo".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = ApiError(OrchestryError::Conflict("demo".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn proxy_error_maps_to_502() {
        let err = ApiError(OrchestryError::Proxy("reload failed".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
