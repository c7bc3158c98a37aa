use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    auth::Actor,
    errors::ServiceError,
    services::{
        audit::AuditEntryResponse,
        ledger::{TransferRecord, TransferRequest},
        lifecycle::{PauseRecord, PauseRequest},
        orders::{CreateOrderRequest, DistributionResponse, OrderFilter, OrderResponse},
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated order listing, newest first, with optional search and filters",
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<OrderResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid filter or paging parameters", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown area", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
    _actor: Actor,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let page = state.services.orders.list(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Create order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Registers an order with every piece resident at its initial area",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown initial area", body = crate::errors::ErrorResponse),
        (status = 409, description = "Folio already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.orders.create(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// Get order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _actor: Actor,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Delete order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    summary = "Delete order",
    description = "Removes an order with its residency, transfers, pauses and audit trail",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: Actor,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Transfer pieces
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/transfer",
    summary = "Transfer pieces",
    description = "Moves pieces from one area to another; partial transfers leave the order split",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Pieces transferred", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid piece count or destination", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or area not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not active", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn transfer_pieces(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: Actor,
    Json(request): Json<TransferRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.ledger.transfer(id, request, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Pause order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/pause",
    summary = "Pause order",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = PauseRequest,
    responses(
        (status = 200, description = "Order paused", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Reason too short or too long", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not active or split across areas", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn pause_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: Actor,
    Json(request): Json<PauseRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.lifecycle.pause(id, request, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Resume order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/resume",
    summary = "Resume order",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order resumed", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not paused", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn resume_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: Actor,
) -> ApiResult<OrderResponse> {
    let order = state.services.lifecycle.resume(id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Complete order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/complete",
    summary = "Complete order",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only shipping may complete orders", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not active or split across areas", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: Actor,
) -> ApiResult<OrderResponse> {
    let order = state.services.lifecycle.complete(id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Order audit log
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    summary = "Order history",
    description = "Audit entries of an order, oldest first",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "History retrieved", body = ApiResponse<Vec<AuditEntryResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _actor: Actor,
) -> ApiResult<Vec<AuditEntryResponse>> {
    let entries = state.services.audit.list_for(id).await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/transfers",
    summary = "Order transfers",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Transfers retrieved", body = ApiResponse<Vec<TransferRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn order_transfers(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _actor: Actor,
) -> ApiResult<Vec<TransferRecord>> {
    let transfers = state.services.ledger.history(id).await?;
    Ok(Json(ApiResponse::success(transfers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/pieces",
    summary = "Piece distribution",
    description = "How many pieces of the order each area currently holds",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Distribution retrieved", body = ApiResponse<DistributionResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn order_pieces(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _actor: Actor,
) -> ApiResult<DistributionResponse> {
    let distribution = state.services.orders.distribution(id).await?;
    Ok(Json(ApiResponse::success(distribution)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/pauses",
    summary = "Order pauses",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Pauses retrieved", body = ApiResponse<Vec<PauseRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn order_pauses(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _actor: Actor,
) -> ApiResult<Vec<PauseRecord>> {
    let pauses = state.services.lifecycle.pauses(id).await?;
    Ok(Json(ApiResponse::success(pauses)))
}
