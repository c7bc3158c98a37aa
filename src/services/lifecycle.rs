use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::Actor,
    db::DbPool,
    entities::{
        audit_entry::AuditEventType,
        order::{ActiveModel as OrderActiveModel, Model as OrderModel},
        order_pause::{self, Entity as PauseEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{Area, LifecycleAction, PieceDistribution},
    services::{
        audit::{AuditService, NewAuditEntry},
        locks::OrderLocks,
        orders::{find_order, find_order_for_update, load_distribution, update_versioned, OrderResponse},
    },
};

pub const MIN_PAUSE_REASON_CHARS: usize = 10;
pub const MAX_PAUSE_REASON_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PauseRequest {
    /// Why the order stops; at least 10 characters once trimmed
    pub reason: String,
}

/// Trims a pause reason and checks its length.
pub fn normalize_reason(reason: &str) -> Result<String, ServiceError> {
    let trimmed = reason.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_PAUSE_REASON_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "pause reason must have at least {MIN_PAUSE_REASON_CHARS} characters"
        )));
    }
    if chars > MAX_PAUSE_REASON_CHARS {
        return Err(ServiceError::ValidationError(format!(
            "pause reason must have at most {MAX_PAUSE_REASON_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PauseRecord {
    pub id: i32,
    pub order_id: i32,
    pub reason: String,
    pub paused_by: String,
    pub paused_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl From<order_pause::Model> for PauseRecord {
    fn from(model: order_pause::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            reason: model.reason,
            paused_by: model.paused_by,
            paused_at: model.paused_at,
            resolved_at: model.resolved_at,
            resolved_by: model.resolved_by,
        }
    }
}

fn ensure_not_split(
    order: &OrderModel,
    distribution: &PieceDistribution,
    action: LifecycleAction,
) -> Result<(), ServiceError> {
    if distribution.is_split() {
        return Err(ServiceError::Conflict(format!(
            "cannot {action} order {}: its pieces are split across {} areas",
            order.id,
            distribution.areas().len()
        )));
    }
    Ok(())
}

/// Lifecycle State Machine: pause, resume and completion of orders.
#[derive(Clone)]
pub struct LifecycleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: OrderLocks,
}

impl LifecycleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, locks: OrderLocks) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
        }
    }

    #[instrument(skip(self, request, actor), fields(actor = %actor.id))]
    pub async fn pause(
        &self,
        order_id: i32,
        request: PauseRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let result = self.pause_order(order_id, request, actor).await;
        metrics::record_operation("pause", &result);
        result
    }

    async fn pause_order(
        &self,
        order_id: i32,
        request: PauseRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let reason = normalize_reason(&request.reason)?;

        let _guard = self.locks.acquire(order_id).await;
        let txn = self.db_pool.begin().await?;
        let order = find_order_for_update(&txn, order_id).await?;

        let next = order.status.apply(LifecycleAction::Pause)?;
        actor.require_area(order.current_area, "pause this order")?;
        let distribution = load_distribution(&txn, &order).await?;
        ensure_not_split(&order, &distribution, LifecycleAction::Pause)?;

        let open = PauseEntity::find()
            .filter(order_pause::Column::OrderId.eq(order.id))
            .filter(order_pause::Column::ResolvedAt.is_null())
            .one(&txn)
            .await?;
        if open.is_some() {
            return Err(ServiceError::Conflict(format!(
                "order {order_id} already has an open pause"
            )));
        }

        let now = Utc::now();
        order_pause::ActiveModel {
            order_id: Set(order.id),
            reason: Set(reason.clone()),
            paused_by: Set(actor.id.clone()),
            paused_at: Set(now),
            resolved_at: Set(None),
            resolved_by: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = update_versioned(
            &txn,
            &order,
            OrderActiveModel {
                status: Set(next),
                ..Default::default()
            },
        )
        .await?;

        AuditService::record(
            &txn,
            NewAuditEntry::new(
                order.id,
                AuditEventType::Paused,
                &actor.id,
                json!({ "reason": reason, "area": order.current_area }),
            ),
        )
        .await?;

        txn.commit().await?;

        warn!(order_id, area = %order.current_area, reason = %reason, "order paused");

        self.event_sender
            .publish(Event::OrderPaused {
                order_id,
                area: order.current_area,
                reason,
                actor: actor.id.clone(),
            })
            .await;

        Ok(OrderResponse::from_parts(updated, &distribution))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn resume(&self, order_id: i32, actor: &Actor) -> Result<OrderResponse, ServiceError> {
        let result = self.resume_order(order_id, actor).await;
        metrics::record_operation("resume", &result);
        result
    }

    async fn resume_order(&self, order_id: i32, actor: &Actor) -> Result<OrderResponse, ServiceError> {
        let _guard = self.locks.acquire(order_id).await;
        let txn = self.db_pool.begin().await?;
        let order = find_order_for_update(&txn, order_id).await?;

        let next = order.status.apply(LifecycleAction::Resume)?;
        actor.require_area(order.current_area, "resume this order")?;

        let open = PauseEntity::find()
            .filter(order_pause::Column::OrderId.eq(order.id))
            .filter(order_pause::Column::ResolvedAt.is_null())
            .order_by_desc(order_pause::Column::Id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!("order {order_id} has no open pause"))
            })?;

        let now = Utc::now();
        let paused_for = now - open.paused_at;
        let mut closing: order_pause::ActiveModel = open.into();
        closing.resolved_at = Set(Some(now));
        closing.resolved_by = Set(Some(actor.id.clone()));
        closing.update(&txn).await?;

        let updated = update_versioned(
            &txn,
            &order,
            OrderActiveModel {
                status: Set(next),
                ..Default::default()
            },
        )
        .await?;
        let distribution = load_distribution(&txn, &updated).await?;

        AuditService::record(
            &txn,
            NewAuditEntry::new(
                order.id,
                AuditEventType::Resumed,
                &actor.id,
                json!({
                    "area": order.current_area,
                    "paused_seconds": paused_for.num_seconds(),
                }),
            ),
        )
        .await?;

        txn.commit().await?;

        info!(
            order_id,
            area = %order.current_area,
            paused_seconds = paused_for.num_seconds(),
            "order resumed"
        );

        self.event_sender
            .publish(Event::OrderResumed {
                order_id,
                area: order.current_area,
                actor: actor.id.clone(),
            })
            .await;

        Ok(OrderResponse::from_parts(updated, &distribution))
    }

    /// Marks an order as shipped. Irreversible.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn complete(&self, order_id: i32, actor: &Actor) -> Result<OrderResponse, ServiceError> {
        let result = self.complete_order(order_id, actor).await;
        metrics::record_operation("complete", &result);
        result
    }

    async fn complete_order(&self, order_id: i32, actor: &Actor) -> Result<OrderResponse, ServiceError> {
        let _guard = self.locks.acquire(order_id).await;
        let txn = self.db_pool.begin().await?;
        let order = find_order_for_update(&txn, order_id).await?;

        let next = order.status.apply(LifecycleAction::Complete)?;
        actor.require_area(Area::TERMINAL, "complete orders")?;
        let distribution = load_distribution(&txn, &order).await?;
        ensure_not_split(&order, &distribution, LifecycleAction::Complete)?;

        let now = Utc::now();
        let updated = update_versioned(
            &txn,
            &order,
            OrderActiveModel {
                status: Set(next),
                completed_at: Set(Some(now)),
                ..Default::default()
            },
        )
        .await?;

        AuditService::record(
            &txn,
            NewAuditEntry::new(
                order.id,
                AuditEventType::Completed,
                &actor.id,
                json!({ "area": order.current_area, "total_piezas": order.total_piezas }),
            ),
        )
        .await?;

        txn.commit().await?;

        info!(order_id, folio = %order.folio, "order completed");

        self.event_sender
            .publish(Event::OrderCompleted {
                order_id,
                actor: actor.id.clone(),
            })
            .await;

        Ok(OrderResponse::from_parts(updated, &distribution))
    }

    /// Pause records of an order, oldest first.
    #[instrument(skip(self))]
    pub async fn pauses(&self, order_id: i32) -> Result<Vec<PauseRecord>, ServiceError> {
        let db = &*self.db_pool;
        find_order(db, order_id).await?;
        let records = PauseEntity::find()
            .filter(order_pause::Column::OrderId.eq(order_id))
            .order_by_asc(order_pause::Column::PausedAt)
            .order_by_asc(order_pause::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(PauseRecord::from).collect())
    }
}
