// Handlers module

pub mod auth;
pub mod history;
pub mod socket;

pub use auth::{login_handler, register_handler};
pub use history::history_handler;
pub use socket::{socket_session, SocketParams};

use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;

/// A failed API call: status plus the `{message}` body sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

/// JSON body with `status` on success, `{message}` with the error status otherwise
pub(crate) fn respond<T: Serialize>(result: Result<T, ApiError>, status: StatusCode) -> Response {
    match result {
        Ok(body) => reply::with_status(reply::json(&body), status).into_response(),
        Err(err) => reply::with_status(reply::json(&ErrorResponse::new(err.message)), err.status)
            .into_response(),
    }
}

pub async fn health_handler(state: AppState) -> Result<impl Reply, warp::Rejection> {
    Ok(reply::json(&HealthResponse {
        status: "healthy".to_string(),
        store: state.backend.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCodec;
    use crate::llm::{Responder, ResponderConfig};
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_backend() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            TokenCodec::new("health-test-secret", chrono::Duration::hours(1)),
            store.clone(),
            store.clone(),
            Responder::new(store, ResponderConfig::default()),
            "memory",
        );

        let response = health_handler(state).await.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_respond_uses_error_status() {
        let ok: Result<HealthResponse, ApiError> = Ok(HealthResponse {
            status: "healthy".to_string(),
            store: "memory".to_string(),
        });
        assert_eq!(respond(ok, StatusCode::CREATED).status(), StatusCode::CREATED);

        let err: Result<HealthResponse, ApiError> = Err(ApiError::unauthorized("Token is missing"));
        assert_eq!(respond(err, StatusCode::OK).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::internal().status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
