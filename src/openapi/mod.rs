use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pedidos API",
        version = "1.0.0",
        description = r#"
# Garment Order Tracking API

Tracks production orders as their pieces move across the workshop floor:
corte, bordado, ensamble, plancha/empaque, calidad, envíos, patronaje,
almacén and diseño.

## Pieces and areas

Every order has a fixed number of pieces. Transfers move some or all of
them between areas; while more than one area holds pieces the order is
*split* and cannot be paused or completed.

## Authentication

Every endpoint except the area registry requires a JWT whose claims name
the caller and their area:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

```json
{
  "error": "Conflict",
  "message": "Conflict: order 42 is split across 2 areas",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Live updates

`GET /api/v1/events` streams every order mutation as server-sent events.
"#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Orders", description = "Order entity store and lifecycle"),
        (name = "Areas", description = "Production area registry"),
        (name = "Reports", description = "Dashboard and throughput metrics"),
        (name = "Events", description = "Live event stream")
    ),
    paths(
        // Areas
        crate::handlers::areas::list_areas,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::transfer_pieces,
        crate::handlers::orders::pause_order,
        crate::handlers::orders::resume_order,
        crate::handlers::orders::complete_order,
        crate::handlers::orders::order_history,
        crate::handlers::orders::order_transfers,
        crate::handlers::orders::order_pieces,
        crate::handlers::orders::order_pauses,

        // Reports
        crate::handlers::reports::dashboard_stats,
        crate::handlers::reports::monthly_metrics,
        crate::handlers::reports::overall_metrics,
        crate::handlers::reports::request_metrics,

        // Events
        crate::handlers::events::stream_events,
    ),
    components(
        schemas(
            crate::models::Area,
            crate::models::AreaInfo,
            crate::models::AreaPieces,
            crate::models::OrderStatus,
            crate::events::Event,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::DistributionResponse,
            crate::services::ledger::TransferRequest,
            crate::services::ledger::TransferRecord,
            crate::services::lifecycle::PauseRequest,
            crate::services::lifecycle::PauseRecord,
            crate::services::audit::AuditEntryResponse,
            crate::services::reports::DashboardStats,
            crate::services::reports::AreaCount,
            crate::services::reports::MonthlyAreaMetrics,
            crate::services::reports::AreaMetric,
            crate::services::reports::OverallMetrics,
            crate::services::reports::RequestMetrics,
            crate::services::reports::RequestActivity,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_order_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Pedidos API"));
        assert!(json.contains("/api/v1/orders/{id}/transfer"));
        assert!(json.contains("/api/v1/metrics/monthly"));
        assert!(json.contains("/api/v1/metrics/requests"));
        assert!(json.contains("\"Bearer\""));
    }
}
