//! HTTP handlers for the dashboard API.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use super::api::{
    HealthResponse, HistoryQuery, InitialResponse, RecentQuery, StreamStatusResponse,
};
use super::state::AppState;
use crate::event::{Event, HistoryPage};
use crate::watcher::catch_up;

/// GET /health - Liveness probe.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.hub.store().len(),
        state.hub.subscriber_count(),
    ))
}

/// GET /api/events - Most recent events, oldest first.
pub async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<Event>> {
    Json(state.hub.store().recent(query.count))
}

/// GET /api/events/history - Older events for backward pagination.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryPage> {
    Json(state.hub.store().history(query.offset, query.limit))
}

/// GET /api/streams/status - Availability and path of every source.
pub async fn get_stream_status(State(state): State<AppState>) -> Json<StreamStatusResponse> {
    Json(StreamStatusResponse::from(&state.registry()))
}

/// GET /api/events/initial - Recent file content for a fresh client.
pub async fn get_initial(State(state): State<AppState>) -> Json<InitialResponse> {
    let events = catch_up(&state.registry(), state.initial_tail_lines).await;
    Json(InitialResponse { events })
}

/// GET /api/events/stream - SSE stream: one `initial` frame, then one
/// `event` frame per published event.
pub async fn get_events_sse(
    State(state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<SseEvent, Infallible>>> {
    // Subscribe before the snapshot so nothing published meanwhile is lost.
    let rx = state.hub.subscribe();
    let events = catch_up(&state.registry(), state.initial_tail_lines).await;

    let initial = serde_json::to_string(&InitialResponse { events })
        .ok()
        .map(|data| Ok::<_, Infallible>(SseEvent::default().event("initial").data(data)));

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default().event("event").data(data)))
            }
            Err(e) => {
                tracing::debug!(error = %e, "SSE subscriber lagged");
                None
            }
        }
    });

    let cancel = state.cancel.clone();
    let stream = stream::iter(initial)
        .chain(live)
        .take_until(async move { cancel.cancelled().await });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
