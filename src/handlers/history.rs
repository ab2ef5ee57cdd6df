// GET /api/history

use tracing::error;
use warp::http::StatusCode;
use warp::Reply;

use super::{respond, ApiError};
use crate::auth::{verify_identity, AuthFailure};
use crate::models::HistoryResponse;
use crate::state::AppState;

/// Records returned per history request
pub const HISTORY_LIMIT: usize = 50;

/// Resolve the caller from an `Authorization: Bearer <token>` header
pub async fn authorize(state: &AppState, header: Option<&str>) -> Result<String, ApiError> {
    let header = header.ok_or_else(|| ApiError::unauthorized("Token is missing"))?;

    let token = header
        .split(' ')
        .nth(1)
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))?;

    verify_identity(&state.codec, state.credentials.as_ref(), Some(token))
        .await
        .map_err(|failure| match failure {
            AuthFailure::Missing => ApiError::unauthorized("Token is missing"),
            AuthFailure::Expired => ApiError::unauthorized("Token has expired"),
            AuthFailure::Invalid => ApiError::unauthorized("Invalid token"),
            AuthFailure::Store(e) => {
                error!(error = %e, "credential lookup failed during authorization");
                ApiError::internal()
            }
        })
}

/// Last `HISTORY_LIMIT` records for the caller, oldest first
pub async fn history(state: &AppState, header: Option<&str>) -> Result<HistoryResponse, ApiError> {
    let username = authorize(state, header).await?;

    let mut messages = state
        .messages
        .recent_for(&username, HISTORY_LIMIT)
        .await
        .map_err(|e| {
            error!(username = %username, error = %e, "history read failed");
            ApiError::internal()
        })?;
    messages.reverse();

    Ok(HistoryResponse { messages })
}

pub async fn history_handler(
    authorization: Option<String>,
    state: AppState,
) -> Result<impl Reply, warp::Rejection> {
    Ok(respond(
        history(&state, authorization.as_deref()).await,
        StatusCode::OK,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCodec;
    use crate::llm::{Responder, ResponderConfig};
    use crate::store::{
        CredentialStore, InMemoryStore, MessageRecord, MessageStore, Sender, UserRecord,
    };
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    const SECRET: &str = "history-test-secret-long-enough";

    async fn state_with_history(count: i64) -> AppState {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(UserRecord::new("alice", "hash"))
            .await
            .unwrap();
        let base = Utc::now();
        for i in 0..count {
            store
                .append(
                    MessageRecord::new("alice", Sender::User, format!("m{}", i))
                        .with_created_at(base + Duration::seconds(i)),
                )
                .await
                .unwrap();
        }
        AppState::new(
            TokenCodec::new(SECRET, Duration::hours(1)),
            store.clone(),
            store.clone(),
            Responder::new(store, ResponderConfig::default()),
            "memory",
        )
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_oldest_first() {
        let state = state_with_history(60).await;
        let header = format!("Bearer {}", state.codec.issue("alice").unwrap());

        let response = history(&state, Some(&header)).await.unwrap();
        assert_eq!(response.messages.len(), HISTORY_LIMIT);
        assert_eq!(response.messages[0].content, "m10");
        assert_eq!(response.messages[49].content, "m59");
    }

    #[tokio::test]
    async fn test_authorization_failures() {
        let state = state_with_history(0).await;

        assert_eq!(
            authorize(&state, None).await.unwrap_err().message,
            "Token is missing"
        );
        assert_eq!(
            authorize(&state, Some("Bearer")).await.unwrap_err().message,
            "Invalid token format"
        );
        assert_eq!(
            authorize(&state, Some("Bearer not-a-jwt")).await.unwrap_err().message,
            "Invalid token"
        );

        let expired = TokenCodec::new(SECRET, Duration::seconds(-30))
            .issue("alice")
            .unwrap();
        let err = authorize(&state, Some(&format!("Bearer {}", expired)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Token has expired");
    }
}
