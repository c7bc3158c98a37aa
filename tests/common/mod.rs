#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use pedidos_api::{
    auth::{Actor, JwtVerifier},
    config::AppConfig,
    db,
    events::{self, EventSender},
    models::Area,
    services::orders::{CreateOrderRequest, OrderResponse},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_key_for_pedidos_tracking_32chars";

/// Application state and router backed by a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    verifier: Arc<JwtVerifier>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let pool = db::connect_in_memory()
            .await
            .expect("failed to create test database");

        let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, Arc::new(event_sender));
        let router = pedidos_api::app(state.clone());

        Self {
            router,
            verifier: state.jwt.clone(),
            state,
            _event_task: event_task,
        }
    }

    pub fn actor(area: Area) -> Actor {
        Actor::new(format!("{}-user", area.code()), area)
    }

    /// Bearer token for a user of `area`.
    pub fn token_for(&self, area: Area) -> String {
        self.verifier
            .issue(&Self::actor(area), 3600)
            .expect("failed to issue test token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated JSON request on behalf of a user of `area`.
    pub async fn request_as(
        &self,
        area: Area,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token_for(area);
        self.request(method, uri, body, Some(&token)).await
    }

    /// Creates an order directly through the service, as an admin.
    pub async fn seed_order(&self, folio: &str, total_piezas: i32) -> OrderResponse {
        self.state
            .services
            .orders
            .create(order_request(folio, total_piezas), &Self::actor(Area::Admin))
            .await
            .expect("failed to seed order")
    }
}

pub fn order_request(folio: &str, total_piezas: i32) -> CreateOrderRequest {
    serde_json::from_value(order_payload(folio, total_piezas)).expect("valid order request")
}

pub fn order_payload(folio: &str, total_piezas: i32) -> Value {
    json!({
        "folio": folio,
        "no_solicitud": format!("SOL-{folio}"),
        "cliente_hotel": "Hotel Playa Azul",
        "modelo": "Filipina cocina",
        "tipo_prenda": "Filipina",
        "color": "Blanco",
        "tela": "Gabardina",
        "total_piezas": total_piezas,
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
