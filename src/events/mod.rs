use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::models::Area;

/// Domain events published after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OrderCreated {
        order_id: i32,
        folio: String,
        area: Area,
        total_piezas: i32,
        actor: String,
    },
    PiecesTransferred {
        order_id: i32,
        from_area: Area,
        to_area: Area,
        piece_count: i32,
        current_area: Area,
        split: bool,
        actor: String,
    },
    OrderPaused {
        order_id: i32,
        area: Area,
        reason: String,
        actor: String,
    },
    OrderResumed {
        order_id: i32,
        area: Area,
        actor: String,
    },
    OrderCompleted {
        order_id: i32,
        actor: String,
    },
    OrderDeleted {
        order_id: i32,
        folio: String,
        actor: String,
    },
}

impl Event {
    pub fn order_id(&self) -> i32 {
        match self {
            Event::OrderCreated { order_id, .. }
            | Event::PiecesTransferred { order_id, .. }
            | Event::OrderPaused { order_id, .. }
            | Event::OrderResumed { order_id, .. }
            | Event::OrderCompleted { order_id, .. }
            | Event::OrderDeleted { order_id, .. } => *order_id,
        }
    }

    /// Event name used for SSE `event:` lines and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::PiecesTransferred { .. } => "pieces_transferred",
            Event::OrderPaused { .. } => "order_paused",
            Event::OrderResumed { .. } => "order_resumed",
            Event::OrderCompleted { .. } => "order_completed",
            Event::OrderDeleted { .. } => "order_deleted",
        }
    }
}

/// Fans events out to the processing loop and to live subscribers.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
    broadcaster: broadcast::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>, capacity: usize) -> Self {
        let (broadcaster, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            broadcaster,
        }
    }

    /// Builds a sender together with the receiver for [`process_events`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx, capacity), rx)
    }

    /// Receives every event sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.broadcaster.subscribe()
    }

    /// Number of live subscribers, such as open event streams.
    pub fn receiver_count(&self) -> usize {
        self.broadcaster.receiver_count()
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        // no live subscribers is not an error
        let _ = self.broadcaster.send(event.clone());
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of returning a failure.
    ///
    /// Called after commit, when the mutation can no longer be undone.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        let order_id = event.order_id();
        if let Err(e) = self.send(event).await {
            warn!(event = name, order_id, error = %e, "event publication failed");
        }
    }
}

/// Drains the event channel, writing one structured log line per event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                folio,
                area,
                total_piezas,
                actor,
            } => info!(
                event = event.name(),
                order_id,
                folio = %folio,
                area = %area,
                total_piezas,
                actor = %actor,
                "order created"
            ),
            Event::PiecesTransferred {
                order_id,
                from_area,
                to_area,
                piece_count,
                current_area,
                split,
                actor,
            } => info!(
                event = event.name(),
                order_id,
                from_area = %from_area,
                to_area = %to_area,
                piece_count,
                current_area = %current_area,
                split,
                actor = %actor,
                "pieces transferred"
            ),
            Event::OrderPaused {
                order_id,
                area,
                reason,
                actor,
            } => warn!(
                event = event.name(),
                order_id,
                area = %area,
                reason = %reason,
                actor = %actor,
                "order paused"
            ),
            Event::OrderResumed {
                order_id,
                area,
                actor,
            } => info!(
                event = event.name(),
                order_id,
                area = %area,
                actor = %actor,
                "order resumed"
            ),
            Event::OrderCompleted { order_id, actor } => info!(
                event = event.name(),
                order_id,
                actor = %actor,
                "order completed"
            ),
            Event::OrderDeleted {
                order_id,
                folio,
                actor,
            } => warn!(
                event = event.name(),
                order_id,
                folio = %folio,
                actor = %actor,
                "order deleted"
            ),
        }
    }

    warn!("Event processing loop has ended");
}
