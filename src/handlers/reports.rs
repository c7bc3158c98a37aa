use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::{
    auth::Actor,
    services::reports::{
        DashboardStats, MonthQuery, MonthlyAreaMetrics, OverallMetrics, RequestMetrics,
    },
    ApiResponse, ApiResult, AppState,
};

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    summary = "Dashboard statistics",
    description = "Active, paused, completed and split order counts plus open orders per area",
    responses(
        (status = 200, description = "Statistics computed", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<DashboardStats> {
    let stats = state.services.reports.dashboard_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Monthly metrics per destination area
#[utoipa::path(
    get,
    path = "/api/v1/metrics/monthly",
    summary = "Monthly area metrics",
    params(MonthQuery),
    responses(
        (status = 200, description = "Metrics computed", body = ApiResponse<MonthlyAreaMetrics>),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn monthly_metrics(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
    actor: Actor,
) -> ApiResult<MonthlyAreaMetrics> {
    let metrics = state
        .services
        .reports
        .monthly_area_metrics(query.year, query.month, &actor)
        .await?;
    Ok(Json(ApiResponse::success(metrics)))
}

/// All-time transfer metrics
#[utoipa::path(
    get,
    path = "/api/v1/metrics/overall",
    summary = "Overall metrics",
    responses(
        (status = 200, description = "Metrics computed", body = ApiResponse<OverallMetrics>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn overall_metrics(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<OverallMetrics> {
    let metrics = state.services.reports.overall_metrics(&actor).await?;
    Ok(Json(ApiResponse::success(metrics)))
}

/// Transfers per request number
#[utoipa::path(
    get,
    path = "/api/v1/metrics/requests",
    summary = "Request metrics",
    description = "Transfer counts per no_solicitud with the ten busiest requests",
    responses(
        (status = 200, description = "Metrics computed", body = ApiResponse<RequestMetrics>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn request_metrics(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<RequestMetrics> {
    let metrics = state.services.reports.request_metrics(&actor).await?;
    Ok(Json(ApiResponse::success(metrics)))
}
