use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::Actor,
    db::DbPool,
    entities::{
        audit_entry::AuditEventType,
        order::ActiveModel as OrderActiveModel,
        piece_transfer::{self, Entity as TransferEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{Area, LifecycleAction},
    services::{
        audit::{AuditService, NewAuditEntry},
        locks::OrderLocks,
        orders::{
            find_order, find_order_for_update, load_distribution, store_distribution,
            update_versioned, OrderResponse,
        },
    },
};

/// Request body for moving pieces between areas
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Area code the pieces leave
    pub from_area: String,
    /// Area code receiving the pieces
    pub to_area: String,
    pub piece_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferRecord {
    pub id: i32,
    pub order_id: i32,
    pub from_area: Area,
    pub to_area: Area,
    pub piece_count: i32,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<piece_transfer::Model> for TransferRecord {
    fn from(model: piece_transfer::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            from_area: model.from_area,
            to_area: model.to_area,
            piece_count: model.piece_count,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

/// Piece-Transfer Ledger: moves pieces between areas and keeps the record
/// of every movement.
#[derive(Clone)]
pub struct LedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: OrderLocks,
}

impl LedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, locks: OrderLocks) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
        }
    }

    /// Moves `piece_count` pieces of an active order from one area to another.
    ///
    /// The order's current area follows the pieces only once all of them
    /// are resident at the destination.
    #[instrument(skip(self, request, actor), fields(actor = %actor.id, from = %request.from_area, to = %request.to_area, pieces = request.piece_count))]
    pub async fn transfer(
        &self,
        order_id: i32,
        request: TransferRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let result = self.transfer_pieces(order_id, request, actor).await;
        metrics::record_operation("transfer", &result);
        result
    }

    async fn transfer_pieces(
        &self,
        order_id: i32,
        request: TransferRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let from = Area::from_code(&request.from_area)?;
        let to = Area::from_code(&request.to_area)?;
        let count = request.piece_count;

        let _guard = self.locks.acquire(order_id).await;
        let txn = self.db_pool.begin().await?;
        let order = find_order_for_update(&txn, order_id).await?;

        order.status.apply(LifecycleAction::Transfer)?;
        actor.require_area_or_admin(from, "send these pieces")?;

        let before = load_distribution(&txn, &order).await?;
        let mut after = before.clone();
        after.transfer(from, to, count)?;

        TransferEntity::insert(piece_transfer::ActiveModel {
            order_id: Set(order.id),
            from_area: Set(from),
            to_area: Set(to),
            piece_count: Set(count),
            actor: Set(actor.id.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        store_distribution(&txn, order.id, &before, &after).await?;

        let current_area = after.consolidated_area().unwrap_or(order.current_area);
        let updated = update_versioned(
            &txn,
            &order,
            OrderActiveModel {
                current_area: Set(current_area),
                ..Default::default()
            },
        )
        .await?;

        AuditService::record(
            &txn,
            NewAuditEntry::new(
                order.id,
                AuditEventType::Transferred,
                &actor.id,
                json!({
                    "from_area": from,
                    "to_area": to,
                    "piece_count": count,
                    "current_area": current_area,
                    "distribution": after.areas(),
                }),
            ),
        )
        .await?;

        txn.commit().await?;

        metrics::record_transfer(to, count);
        info!(
            order_id,
            from_area = %from,
            to_area = %to,
            piece_count = count,
            current_area = %current_area,
            split = after.is_split(),
            "pieces transferred"
        );

        self.event_sender
            .publish(Event::PiecesTransferred {
                order_id,
                from_area: from,
                to_area: to,
                piece_count: count,
                current_area,
                split: after.is_split(),
                actor: actor.id.clone(),
            })
            .await;

        Ok(OrderResponse::from_parts(updated, &after))
    }

    /// Transfer records of an order, oldest first.
    #[instrument(skip(self))]
    pub async fn history(&self, order_id: i32) -> Result<Vec<TransferRecord>, ServiceError> {
        let db = &*self.db_pool;
        find_order(db, order_id).await?;
        let records = TransferEntity::find()
            .filter(piece_transfer::Column::OrderId.eq(order_id))
            .order_by_asc(piece_transfer::Column::CreatedAt)
            .order_by_asc(piece_transfer::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(TransferRecord::from).collect())
    }
}
