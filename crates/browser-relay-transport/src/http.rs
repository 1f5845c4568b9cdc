//! Client-facing HTTP surface.
//!
//! Session identity travels in the `Mcp-Session-Id` header or, where
//! headers are impractical (the streaming GET used by EventSource
//! clients), in the `sessionId` query parameter. Every endpoint resolves
//! ids through [`session_id_from_request`] so the two paths cannot
//! drift apart.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
    routing::{get, post},
};
use browser_relay_core::SessionEvent;
use browser_relay_session::{RegistryError, ToolResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::RelayState;

/// Request header carrying the session identifier.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Query parameters accepted where the session header is unavailable.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Resolve the session id for a request.
///
/// The header takes precedence when both are present; blank values are
/// treated as absent.
#[must_use]
pub fn session_id_from_request(headers: &HeaderMap, query: &SessionQuery) -> Option<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    from_header.or_else(|| {
        query
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    })
}

/// Body of a tool call.
#[derive(Debug, Deserialize)]
pub struct ToolCallBody {
    /// Tool name, forwarded opaquely as the envelope's action type.
    pub name: String,
    /// Opaque tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Body of a bulk cancellation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    pub session_id: String,
}

/// Reply to a bulk cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub cancelled: usize,
}

/// Build the client-facing API router.
#[must_use]
pub fn api_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/session", post(create_session).delete(close_session))
        .route("/api/events", get(event_stream))
        .route("/api/tool", post(call_tool))
        .route("/api/cancel-command", post(cancel_command))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn create_session(State(state): State<RelayState>) -> Response {
    match state.registry.create().await {
        Ok(session) => {
            let mut response =
                (StatusCode::OK, Json(json!({ "sessionId": &session.id }))).into_response();
            if let Ok(value) = HeaderValue::from_str(&session.id) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(SESSION_HEADER), value);
            }
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create session");
            internal_error(&e)
        }
    }
}

async fn close_session(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Response {
    let Some(session_id) = session_id_from_request(&headers, &query) else {
        return missing_session_id();
    };

    match state.registry.close(&session_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Session closed" }))).into_response(),
        Err(RegistryError::NotFound(_)) => session_not_found(),
        Err(e) => {
            tracing::error!(error = %e, session_id, "failed to close session");
            internal_error(&e)
        }
    }
}

async fn event_stream(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Response {
    let Some(session_id) = session_id_from_request(&headers, &query) else {
        return missing_session_id();
    };

    match state.registry.get(&session_id).await {
        Ok(Some(session)) => Sse::new(session.events.sse_stream())
            .keep_alive(KeepAlive::default())
            .into_response(),
        Ok(None) => session_not_found(),
        Err(e) => {
            tracing::error!(error = %e, session_id, "failed to resolve session for events");
            internal_error(&e)
        }
    }
}

async fn call_tool(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
    Json(body): Json<ToolCallBody>,
) -> Response {
    let Some(session_id) = session_id_from_request(&headers, &query) else {
        return missing_session_id();
    };

    // Failures come back inside the ToolResponse; the HTTP status is 200
    // either way so callers always get the structured result.
    let response: ToolResponse = state
        .dispatcher
        .invoke(&session_id, &body.name, body.arguments)
        .await;
    (StatusCode::OK, Json(response)).into_response()
}

async fn cancel_command(
    State(state): State<RelayState>,
    Json(body): Json<CancelBody>,
) -> (StatusCode, Json<CancelResponse>) {
    let cancelled = state.cancel.cancel(&body.session_id);

    if let Ok(Some(session)) = state.registry.get(&body.session_id).await {
        session.events.push(SessionEvent::Cancelled { count: cancelled });
    }

    let message = if cancelled > 0 {
        format!("Cancelled {cancelled} pending browser actions.")
    } else {
        "No active browser actions found to cancel.".to_owned()
    };
    // Always 200, even when nothing was pending.
    (StatusCode::OK, Json(CancelResponse { message, cancelled }))
}

fn missing_session_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Missing session ID" })),
    )
        .into_response()
}

fn session_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Session not found" })),
    )
        .into_response()
}

fn internal_error(err: &dyn std::error::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(SESSION_HEADER),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn header_wins_over_query_parameter() {
        let headers = headers_with("from-header");
        let query = SessionQuery {
            session_id: Some("from-query".to_owned()),
        };
        assert_eq!(
            session_id_from_request(&headers, &query),
            Some("from-header".to_owned())
        );
    }

    #[test]
    fn query_parameter_is_the_fallback() {
        let query = SessionQuery {
            session_id: Some("from-query".to_owned()),
        };
        assert_eq!(
            session_id_from_request(&HeaderMap::new(), &query),
            Some("from-query".to_owned())
        );
    }

    #[test]
    fn blank_values_count_as_absent() {
        let headers = headers_with("   ");
        let query = SessionQuery {
            session_id: Some(String::new()),
        };
        assert_eq!(session_id_from_request(&headers, &query), None);
        assert_eq!(
            session_id_from_request(&HeaderMap::new(), &SessionQuery::default()),
            None
        );
    }

    #[tokio::test]
    async fn cancel_endpoint_always_returns_ok() {
        let state = RelayState::new(Duration::from_secs(30));
        let (status, Json(body)) = cancel_command(
            State(state),
            Json(CancelBody {
                session_id: "nobody-home".to_owned(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.cancelled, 0);
    }

    #[tokio::test]
    async fn session_creation_echoes_the_id_header() {
        let app = api_router(RelayState::new(Duration::from_secs(30)));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SESSION_HEADER));
    }

    #[tokio::test]
    async fn tool_call_without_session_id_is_rejected() {
        let app = api_router(RelayState::new(Duration::from_secs(30)));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tool")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"click","arguments":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn event_stream_for_unknown_session_is_not_found() {
        let app = api_router(RelayState::new(Duration::from_secs(30)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/events?sessionId=missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
