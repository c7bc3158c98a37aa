use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::{Expr, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseBackend,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::Actor,
    db::DbPool,
    entities::{
        audit_entry::{self, AuditEventType},
        order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
        order_area_pieces::{self, Entity as AreaPiecesEntity},
        order_pause, piece_transfer,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{Area, AreaPieces, OrderStatus, PieceDistribution},
    services::{
        audit::{AuditService, NewAuditEntry},
        locks::OrderLocks,
    },
    PaginatedResponse,
};

/// Request body for creating an order
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 64, message = "folio is required"))]
    pub folio: String,
    #[validate(length(min = 1, max = 64, message = "no_solicitud is required"))]
    pub no_solicitud: String,
    #[validate(length(min = 1, max = 200, message = "cliente_hotel is required"))]
    pub cliente_hotel: String,
    #[validate(length(min = 1, max = 120, message = "modelo is required"))]
    pub modelo: String,
    #[validate(length(min = 1, max = 120, message = "tipo_prenda is required"))]
    pub tipo_prenda: String,
    #[validate(length(min = 1, max = 80, message = "color is required"))]
    pub color: String,
    #[validate(length(min = 1, max = 120, message = "tela is required"))]
    pub tela: String,
    #[validate(range(min = 1, message = "total_piezas must be greater than zero"))]
    pub total_piezas: i32,
    /// Area code where the pieces start; defaults to `corte`
    #[serde(default)]
    pub initial_area: Option<String>,
}

impl CreateOrderRequest {
    /// Trims every descriptive field, rejecting the ones left blank.
    fn normalized(mut self) -> Result<Self, ServiceError> {
        for (name, value) in [
            ("folio", &mut self.folio),
            ("no_solicitud", &mut self.no_solicitud),
            ("cliente_hotel", &mut self.cliente_hotel),
            ("modelo", &mut self.modelo),
            ("tipo_prenda", &mut self.tipo_prenda),
            ("color", &mut self.color),
            ("tela", &mut self.tela),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ServiceError::ValidationError(format!("{name} is required")));
            }
            *value = trimmed.to_string();
        }
        self.validate()?;
        Ok(self)
    }
}

/// Creation window for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Today,
    Week,
    Month,
    All,
}

impl DateWindow {
    pub fn from_code(code: &str) -> Result<Self, ServiceError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateWindow::Today),
            "week" => Ok(DateWindow::Week),
            "month" => Ok(DateWindow::Month),
            "all" | "" => Ok(DateWindow::All),
            other => Err(ServiceError::ValidationError(format!(
                "unknown date window: {other}"
            ))),
        }
    }

    /// Earliest creation time inside the window, `None` for `All`.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateWindow::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            DateWindow::Week => Some(now - Duration::days(7)),
            DateWindow::Month => Some(now - Duration::days(30)),
            DateWindow::All => None,
        }
    }
}

const SEARCH_FIELD_SEPARATOR: &str = "\u{1f}";

/// Lowercased folio, client/hotel and model, one field per segment.
///
/// Case is folded with Unicode rules; SQL `lower()` only folds ASCII on SQLite.
pub fn search_text(folio: &str, cliente_hotel: &str, modelo: &str) -> String {
    [folio, cliente_hotel, modelo]
        .iter()
        .map(|field| field.to_lowercase())
        .collect::<Vec<_>>()
        .join(SEARCH_FIELD_SEPARATOR)
}

/// Escapes `LIKE` metacharacters so the term is matched literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query parameters accepted by the order listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    /// Case-insensitive substring of folio, client/hotel or model
    pub search: Option<String>,
    /// Current area code
    pub area: Option<String>,
    /// `active`, `paused` or `completed`
    pub status: Option<String>,
    /// `today`, `week`, `month` or `all`
    pub since: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Order as returned by the API, with its current piece distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub folio: String,
    pub no_solicitud: String,
    pub cliente_hotel: String,
    pub modelo: String,
    pub tipo_prenda: String,
    pub color: String,
    pub tela: String,
    pub total_piezas: i32,
    pub current_area: Area,
    pub current_area_name: String,
    pub status: OrderStatus,
    /// True while pieces are resident in more than one area
    pub split: bool,
    pub pieces: Vec<AreaPieces>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl OrderResponse {
    pub fn from_parts(order: OrderModel, distribution: &PieceDistribution) -> Self {
        Self {
            id: order.id,
            folio: order.folio,
            no_solicitud: order.no_solicitud,
            cliente_hotel: order.cliente_hotel,
            modelo: order.modelo,
            tipo_prenda: order.tipo_prenda,
            color: order.color,
            tela: order.tela,
            total_piezas: order.total_piezas,
            current_area: order.current_area,
            current_area_name: order.current_area.display_name().to_string(),
            status: order.status,
            split: distribution.is_split(),
            pieces: distribution.areas(),
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
            completed_at: order.completed_at,
            version: order.version,
        }
    }
}

/// Per-area residency of one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DistributionResponse {
    pub order_id: i32,
    pub total_piezas: i32,
    pub current_area: Area,
    pub split: bool,
    pub areas: Vec<AreaPieces>,
}

/// Loads an order or fails with `NotFound`.
pub(crate) async fn find_order<C>(conn: &C, order_id: i32) -> Result<OrderModel, ServiceError>
where
    C: ConnectionTrait,
{
    OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))
}

/// Loads an order inside a mutation transaction, taking the row lock where
/// the backend supports it.
pub(crate) async fn find_order_for_update(
    txn: &DatabaseTransaction,
    order_id: i32,
) -> Result<OrderModel, ServiceError> {
    let mut query = OrderEntity::find_by_id(order_id);
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))
}

pub(crate) async fn load_distribution<C>(
    conn: &C,
    order: &OrderModel,
) -> Result<PieceDistribution, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = AreaPiecesEntity::find()
        .filter(order_area_pieces::Column::OrderId.eq(order.id))
        .all(conn)
        .await?;
    PieceDistribution::from_rows(order.total_piezas, rows.into_iter().map(|r| (r.area, r.pieces)))
}

/// Writes the residency rows that differ between `before` and `after`.
pub(crate) async fn store_distribution<C>(
    conn: &C,
    order_id: i32,
    before: &PieceDistribution,
    after: &PieceDistribution,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    for area in Area::ALL {
        let (old, new) = (before.resident(area), after.resident(area));
        if old == new {
            continue;
        }
        let scope = Condition::all()
            .add(order_area_pieces::Column::OrderId.eq(order_id))
            .add(order_area_pieces::Column::Area.eq(area));
        if new == 0 {
            AreaPiecesEntity::delete_many().filter(scope).exec(conn).await?;
        } else if old == 0 {
            order_area_pieces::ActiveModel {
                order_id: Set(order_id),
                area: Set(area),
                pieces: Set(new),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        } else {
            AreaPiecesEntity::update_many()
                .col_expr(order_area_pieces::Column::Pieces, Expr::value(new))
                .filter(scope)
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

/// Applies `changes` only if the stored version still matches `current`,
/// bumping the version and `updated_at`.
pub(crate) async fn update_versioned<C>(
    conn: &C,
    current: &OrderModel,
    mut changes: OrderActiveModel,
) -> Result<OrderModel, ServiceError>
where
    C: ConnectionTrait,
{
    changes.version = Set(current.version + 1);
    changes.updated_at = Set(Utc::now());
    let result = OrderEntity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(current.id))
        .filter(order::Column::Version.eq(current.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        warn!(order_id = current.id, version = current.version, "stale order version");
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    find_order(conn, current.id).await
}

fn map_insert_error(err: DbErr, folio: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict(format!("folio {folio} already exists"))
        }
        _ => ServiceError::DatabaseError(err),
    }
}

/// Order Entity Store: creation, lookup, listing and deletion of orders.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: OrderLocks,
    default_page_size: u64,
    max_page_size: u64,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        locks: OrderLocks,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
            default_page_size,
            max_page_size,
        }
    }

    /// Creates an order with every piece resident at its initial area.
    #[instrument(skip(self, request, actor), fields(folio = %request.folio, actor = %actor.id))]
    pub async fn create(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let result = self.create_order(request, actor).await;
        metrics::record_operation("create", &result);
        result
    }

    async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let request = request.normalized()?;
        let initial_area = match request.initial_area.as_deref() {
            Some(code) => Area::from_code(code)?,
            None => Area::INITIAL,
        };
        if !initial_area.is_transfer_target() {
            return Err(ServiceError::ValidationError(format!(
                "orders cannot start in {}",
                initial_area.display_name()
            )));
        }
        actor.require_area_or_admin(initial_area, "create orders there")?;

        let distribution = PieceDistribution::new(request.total_piezas, initial_area)?;
        let search = search_text(&request.folio, &request.cliente_hotel, &request.modelo);
        let now = Utc::now();

        let txn = self.db_pool.begin().await?;

        let duplicate = OrderEntity::find()
            .filter(order::Column::Folio.eq(request.folio.as_str()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "folio {} already exists",
                request.folio
            )));
        }

        let created = OrderActiveModel {
            folio: Set(request.folio.clone()),
            no_solicitud: Set(request.no_solicitud),
            cliente_hotel: Set(request.cliente_hotel),
            modelo: Set(request.modelo),
            tipo_prenda: Set(request.tipo_prenda),
            color: Set(request.color),
            tela: Set(request.tela),
            search_text: Set(search),
            total_piezas: Set(request.total_piezas),
            current_area: Set(initial_area),
            status: Set(OrderStatus::Active),
            created_by: Set(actor.id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
            version: Set(1),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_insert_error(e, &request.folio))?;

        order_area_pieces::ActiveModel {
            order_id: Set(created.id),
            area: Set(initial_area),
            pieces: Set(created.total_piezas),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        AuditService::record(
            &txn,
            NewAuditEntry::new(
                created.id,
                AuditEventType::Created,
                &actor.id,
                json!({
                    "folio": created.folio,
                    "total_piezas": created.total_piezas,
                    "area": initial_area,
                }),
            ),
        )
        .await?;

        txn.commit().await?;

        info!(order_id = created.id, folio = %created.folio, area = %initial_area, "order created");

        self.event_sender
            .publish(Event::OrderCreated {
                order_id: created.id,
                folio: created.folio.clone(),
                area: initial_area,
                total_piezas: created.total_piezas,
                actor: actor.id.clone(),
            })
            .await;

        Ok(OrderResponse::from_parts(created, &distribution))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: i32) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = find_order(db, order_id).await?;
        let distribution = load_distribution(db, &order).await?;
        Ok(OrderResponse::from_parts(order, &distribution))
    }

    #[instrument(skip(self))]
    pub async fn distribution(&self, order_id: i32) -> Result<DistributionResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = find_order(db, order_id).await?;
        let distribution = load_distribution(db, &order).await?;
        Ok(DistributionResponse {
            order_id: order.id,
            total_piezas: order.total_piezas,
            current_area: order.current_area,
            split: distribution.is_split(),
            areas: distribution.areas(),
        })
    }

    /// Filtered listing, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: OrderFilter,
    ) -> Result<PaginatedResponse<OrderResponse>, ServiceError> {
        let page = filter.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "page must be at least 1".to_string(),
            ));
        }
        let limit = filter.limit.unwrap_or(self.default_page_size);
        if limit == 0 || limit > self.max_page_size {
            return Err(ServiceError::ValidationError(format!(
                "limit must be between 1 and {}",
                self.max_page_size
            )));
        }

        let mut query = OrderEntity::find();

        if let Some(term) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
        {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            query = query.filter(
                Expr::col(order::Column::SearchText).like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        if let Some(code) = filter.area.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(order::Column::CurrentArea.eq(Area::from_code(code)?));
        }
        if let Some(code) = filter.status.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(order::Column::Status.eq(OrderStatus::from_code(code)?));
        }
        if let Some(code) = filter.since.as_deref() {
            if let Some(start) = DateWindow::from_code(code)?.start(Utc::now()) {
                query = query.filter(order::Column::CreatedAt.gte(start));
            }
        }

        let db = &*self.db_pool;
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut residency: HashMap<i32, Vec<(Area, i32)>> = HashMap::new();
        if !ids.is_empty() {
            for row in AreaPiecesEntity::find()
                .filter(order_area_pieces::Column::OrderId.is_in(ids))
                .all(db)
                .await?
            {
                residency
                    .entry(row.order_id)
                    .or_default()
                    .push((row.area, row.pieces));
            }
        }

        let items = orders
            .into_iter()
            .map(|order| {
                let rows = residency.remove(&order.id).unwrap_or_default();
                let distribution = PieceDistribution::from_rows(order.total_piezas, rows)?;
                Ok(OrderResponse::from_parts(order, &distribution))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        info!(total, page, limit, returned = items.len(), "orders listed");

        Ok(PaginatedResponse {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Deletes an order together with its residency, transfer, pause and
    /// audit rows.
    ///
    /// Administrators may delete any order; shipping may delete completed
    /// orders only.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, order_id: i32, actor: &Actor) -> Result<(), ServiceError> {
        let result = self.delete_order(order_id, actor).await;
        metrics::record_operation("delete", &result);
        result
    }

    async fn delete_order(&self, order_id: i32, actor: &Actor) -> Result<(), ServiceError> {
        let guard = self.locks.acquire(order_id).await;
        let txn = self.db_pool.begin().await?;
        let order = find_order_for_update(&txn, order_id).await?;

        match actor.area {
            Area::Admin => {}
            Area::Envios if order.status == OrderStatus::Completed => {}
            Area::Envios => {
                return Err(ServiceError::Forbidden(format!(
                    "{} may only delete completed orders",
                    Area::Envios.display_name()
                )))
            }
            other => {
                return Err(ServiceError::Forbidden(format!(
                    "{} may not delete orders",
                    other.display_name()
                )))
            }
        }

        AreaPiecesEntity::delete_many()
            .filter(order_area_pieces::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        piece_transfer::Entity::delete_many()
            .filter(piece_transfer::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order_pause::Entity::delete_many()
            .filter(order_pause::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        audit_entry::Entity::delete_many()
            .filter(audit_entry::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        let deleted = OrderEntity::delete_many()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(order.version))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        txn.commit().await?;
        drop(guard);

        // the audit rows are gone; this line and the event are what remain
        warn!(
            order_id,
            folio = %order.folio,
            status = %order.status,
            actor = %actor.id,
            "order deleted"
        );

        self.event_sender
            .publish(Event::OrderDeleted {
                order_id,
                folio: order.folio,
                actor: actor.id.clone(),
            })
            .await;

        Ok(())
    }
}
