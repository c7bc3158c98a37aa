//! HTTP handlers. Each one extracts the [`Actor`](crate::auth::Actor), calls
//! a service and wraps the result in an [`ApiResponse`](crate::ApiResponse).

pub mod areas;
pub mod events;
pub mod orders;
pub mod reports;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/:id/transfer", post(orders::transfer_pieces))
        .route("/:id/pause", post(orders::pause_order))
        .route("/:id/resume", post(orders::resume_order))
        .route("/:id/complete", post(orders::complete_order))
        .route("/:id/history", get(orders::order_history))
        .route("/:id/transfers", get(orders::order_transfers))
        .route("/:id/pieces", get(orders::order_pieces))
        .route("/:id/pauses", get(orders::order_pauses))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(reports::dashboard_stats))
        .route("/metrics/monthly", get(reports::monthly_metrics))
        .route("/metrics/overall", get(reports::overall_metrics))
        .route("/metrics/requests", get(reports::request_metrics))
}
