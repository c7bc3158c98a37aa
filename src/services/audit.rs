use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{stream, Stream, TryStreamExt};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::audit_entry::{self, AuditEventType, Entity as AuditEntity},
    entities::order::Entity as OrderEntity,
    errors::ServiceError,
};

/// Entries fetched per round trip by [`AuditService::stream_for`].
const STREAM_PAGE_SIZE: u64 = 100;

/// An audit line about to be written.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub order_id: i32,
    pub event_type: AuditEventType,
    pub actor: String,
    pub payload: Value,
}

impl NewAuditEntry {
    pub fn new(order_id: i32, event_type: AuditEventType, actor: &str, payload: Value) -> Self {
        Self {
            order_id,
            event_type,
            actor: actor.to_string(),
            payload,
        }
    }
}

/// Audit entry as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: i32,
    pub order_id: i32,
    pub event_type: AuditEventType,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<audit_entry::Model> for AuditEntryResponse {
    fn from(model: audit_entry::Model) -> Self {
        // rows written by `record` always hold JSON
        let payload =
            serde_json::from_str(&model.payload).unwrap_or(Value::String(model.payload));
        Self {
            id: model.id,
            order_id: model.order_id,
            event_type: model.event_type,
            payload,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

/// Append-only history of every order mutation.
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Appends one entry on `conn`, which must be the transaction of the
    /// mutation being documented.
    pub async fn record<C>(conn: &C, entry: NewAuditEntry) -> Result<audit_entry::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        debug!(order_id = entry.order_id, event_type = %entry.event_type, "recording audit entry");
        let model = audit_entry::ActiveModel {
            order_id: Set(entry.order_id),
            event_type: Set(entry.event_type),
            payload: Set(serde_json::to_string(&entry.payload)?),
            actor: Set(entry.actor),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }

    /// History of an order, oldest first.
    #[instrument(skip(self))]
    pub async fn list_for(&self, order_id: i32) -> Result<Vec<AuditEntryResponse>, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;

        self.stream_for(order_id).try_collect().await
    }

    /// Lazily pages through the history of an order, oldest first.
    ///
    /// Nothing is read until the stream is polled; each call starts over
    /// from the first entry.
    pub fn stream_for(
        &self,
        order_id: i32,
    ) -> impl Stream<Item = Result<AuditEntryResponse, ServiceError>> + Send + 'static {
        let db = self.db_pool.clone();
        stream::try_unfold(Some(0), move |cursor: Option<i32>| {
            let db = db.clone();
            async move {
                let Some(after_id) = cursor else {
                    return Ok(None);
                };
                let page = AuditEntity::find()
                    .filter(audit_entry::Column::OrderId.eq(order_id))
                    .filter(audit_entry::Column::Id.gt(after_id))
                    .order_by_asc(audit_entry::Column::Id)
                    .limit(STREAM_PAGE_SIZE)
                    .all(&*db)
                    .await?;

                if page.is_empty() {
                    return Ok(None);
                }
                let next = if (page.len() as u64) < STREAM_PAGE_SIZE {
                    None
                } else {
                    page.last().map(|entry| entry.id)
                };
                let entries: Vec<Result<AuditEntryResponse, ServiceError>> = page
                    .into_iter()
                    .map(|model| Ok(AuditEntryResponse::from(model)))
                    .collect();
                Ok::<_, ServiceError>(Some((stream::iter(entries), next)))
            }
        })
        .try_flatten()
    }
}
