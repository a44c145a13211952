//! Notification inbox routes and the live push stream.
//!
//! Endpoint: GET /api/notifications/stream
//!
//! # Event Types
//!
//! - `notification`: A notification was stored for the caller
//! - `heartbeat`: Sent every 30 seconds to keep the connection alive
//! - `catchup`: The client fell behind and should re-list its inbox
//!
//! # Example
//!
//! ```text
//! event: notification
//! data: {"type":"notification","id":"...","kind":"author_new_book","title":"New book by ..."}
//!
//! event: heartbeat
//! data: {"type":"heartbeat","timestamp":"2024-01-01T00:00:00Z"}
//! ```

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use chrono::Utc;
use elibrary_core::{Notification, NotificationId};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::events::{CatchupEvent, HEARTBEAT_INTERVAL_SECS, HeartbeatEvent, LibraryEvent};
use crate::extract::{ApiPath, ApiQuery};
use crate::services::social::{self, NotificationListParams};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

// ============================================================================
// Inbox
// ============================================================================

/// GET /api/notifications?unread_only=&take=
async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<NotificationListParams>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        social::notifications(state.repo(), user.user_id, params).await?,
    ))
}

/// POST /api/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(social::mark_read(state.repo(), user.user_id, id).await?))
}

/// POST /api/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = social::mark_all_read(state.repo(), user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

// ============================================================================
// SSE Endpoint
// ============================================================================

/// GET /api/notifications/stream - Subscribe to the caller's new notifications.
///
/// If the client falls behind (channel buffer overflows), a `catchup` event
/// reports how many pushes were missed. The stored inbox is unaffected, so
/// the client re-lists it to sync up.
async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.broadcaster().subscribe(user.user_id).await;

    tracing::info!(user_id = %user.user_id, "Client subscribed to notification stream");

    let stream = stream::unfold(
        (receiver, user.user_id),
        move |(mut rx, user_id)| async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(count)) => {
                        tracing::warn!(
                            user_id = %user_id,
                            events_missed = count,
                            "SSE client lagged, sending catchup event"
                        );
                        LibraryEvent::Catchup(CatchupEvent {
                            events_missed: count,
                            timestamp: Utc::now(),
                        })
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!(user_id = %user_id, "Notification channel closed");
                        return None;
                    }
                };

                match serde_json::to_string(&event) {
                    Ok(data) => {
                        let sse_event = Event::default().event(event.name()).data(data);
                        return Some((Ok(sse_event), (rx, user_id)));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize event");
                        continue;
                    }
                }
            }
        },
    );

    let keep_alive = KeepAlive::new()
        .interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS))
        .event(
            Event::default().event("heartbeat").data(
                serde_json::to_string(&LibraryEvent::Heartbeat(HeartbeatEvent {
                    timestamp: Utc::now(),
                }))
                .unwrap_or_else(|_| r#"{"type":"heartbeat","timestamp":"unknown"}"#.to_string()),
            ),
        );

    Sse::new(stream).keep_alive(keep_alive)
}

/// Build notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/stream", get(subscribe))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_interval() {
        assert_eq!(HEARTBEAT_INTERVAL_SECS, 30);
    }

    #[test]
    fn test_list_params_defaults() {
        let params: NotificationListParams = serde_urlencoded::from_str("").unwrap();
        assert!(!params.unread_only);
        assert!(params.take.is_none());
    }
}
