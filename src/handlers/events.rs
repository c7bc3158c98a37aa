use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{stream, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use utoipa::IntoParams;

use crate::{auth::Actor, events::Event, AppState};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventStreamQuery {
    /// Only forward events of this order
    pub order_id: Option<i32>,
}

fn to_sse(event: &Event) -> Option<SseEvent> {
    match serde_json::to_string(event) {
        Ok(data) => Some(SseEvent::default().event(event.name()).data(data)),
        Err(err) => {
            warn!(error = %err, event = event.name(), "dropping unserializable event");
            None
        }
    }
}

/// Live domain events
#[utoipa::path(
    get,
    path = "/api/v1/events",
    summary = "Event stream",
    description = "Server-sent events for every order mutation; the SSE event name is the event type",
    params(EventStreamQuery),
    responses(
        (status = 200, description = "text/event-stream of domain events", body = Event, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
    actor: Actor,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::info!(actor = %actor.id, order_id = ?query.order_id, "event stream opened");
    let receiver = state.event_sender.subscribe();
    let order_id = query.order_id;

    let events = stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if order_id.is_some_and(|id| id != event.order_id()) {
                        continue;
                    }
                    if let Some(sse) = to_sse(&event) {
                        return Some((Ok(sse), receiver));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_type_tag() {
        let event = Event::OrderResumed {
            order_id: 4,
            area: crate::models::Area::Calidad,
            actor: "u-2".into(),
        };
        assert!(to_sse(&event).is_some());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_resumed");
        assert_eq!(json["area"], "calidad");
    }
}
