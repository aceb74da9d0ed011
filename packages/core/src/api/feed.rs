//! Server-sent metrics feed.
//!
//! Each connected client gets its own feed subscription; closing the
//! connection drops the stream, which unsubscribes.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use super::AppState;

/// `GET /feed`: one `metrics` event per feed tick.
pub async fn feed_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = state.feed.subscribe_stream();
    tracing::info!("Feed client connected on subscription {}", updates.subscription().id());

    let stream = updates.map(|update| {
        let event = Event::default()
            .event("metrics")
            .id(update.sequence.to_string())
            .json_data(&update)
            .unwrap_or_else(|err| {
                tracing::error!("Failed to encode feed update {}: {}", update.sequence, err);
                Event::default().event("error").data("encoding failure")
            });
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
