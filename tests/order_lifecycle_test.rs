//! End-to-end lifecycle of an order at the service layer:
//! creation, pause/resume, completion, deletion and the audit trail.

mod common;

use assert_matches::assert_matches;
use common::{order_request, TestApp};
use futures::TryStreamExt;
use pedidos_api::{
    entities::audit_entry::AuditEventType,
    errors::ServiceError,
    events::Event,
    models::{Area, OrderStatus},
    services::{ledger::TransferRequest, lifecycle::PauseRequest},
};

fn pause(reason: &str) -> PauseRequest {
    PauseRequest {
        reason: reason.to_string(),
    }
}

fn transfer(from: Area, to: Area, piece_count: i32) -> TransferRequest {
    TransferRequest {
        from_area: from.code().to_string(),
        to_area: to.code().to_string(),
        piece_count,
    }
}

/// Moves every piece of an order from corte to envios.
async fn ship_all(app: &TestApp, order_id: i32, pieces: i32) {
    app.state
        .services
        .ledger
        .transfer(
            order_id,
            transfer(Area::Corte, Area::Envios, pieces),
            &TestApp::actor(Area::Admin),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn create_places_every_piece_in_the_initial_area() {
    let app = TestApp::new().await;
    let orders = &app.state.services.orders;

    let created = orders
        .create(order_request("F-200", 30), &TestApp::actor(Area::Corte))
        .await
        .unwrap();
    assert_eq!(created.status, OrderStatus::Active);
    assert_eq!(created.current_area, Area::Corte);
    assert_eq!(created.current_area_name, "Corte");
    assert_eq!(created.version, 1);
    assert!(!created.split);
    assert_eq!(created.created_by, "corte-user");

    let mut elsewhere = order_request("F-201", 5);
    elsewhere.initial_area = Some("Bordado".into());
    let created = orders
        .create(elsewhere, &TestApp::actor(Area::Bordado))
        .await
        .unwrap();
    assert_eq!(created.current_area, Area::Bordado);
}

#[tokio::test]
async fn create_rejects_bad_input_and_foreign_actors() {
    let app = TestApp::new().await;
    let orders = &app.state.services.orders;
    let corte = TestApp::actor(Area::Corte);

    orders.create(order_request("F-210", 10), &corte).await.unwrap();
    assert_matches!(
        orders.create(order_request("F-210", 10), &corte).await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        orders.create(order_request("F-211", 0), &corte).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        orders
            .create(order_request("F-212", 10), &TestApp::actor(Area::Calidad))
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let mut to_admin = order_request("F-213", 10);
    to_admin.initial_area = Some("admin".into());
    assert_matches!(
        orders.create(to_admin, &TestApp::actor(Area::Admin)).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut unknown = order_request("F-214", 10);
    unknown.initial_area = Some("tintoreria".into());
    assert_matches!(
        orders.create(unknown, &corte).await,
        Err(ServiceError::InvalidArea(_))
    );

    let mut blank = order_request("F-215", 10);
    blank.cliente_hotel = "   ".into();
    assert_matches!(
        orders.create(blank, &corte).await,
        Err(ServiceError::ValidationError(msg)) if msg == "cliente_hotel is required"
    );
}

#[tokio::test]
async fn pause_then_resume_restores_an_active_order() {
    let app = TestApp::new().await;
    let lifecycle = &app.state.services.lifecycle;
    let corte = TestApp::actor(Area::Corte);
    let order = app.seed_order("F-220", 12).await;

    let paused = lifecycle
        .pause(order.id, pause("  falta tela azul marino "), &corte)
        .await
        .unwrap();
    assert_eq!(paused.status, OrderStatus::Paused);
    assert_eq!(paused.current_area, Area::Corte);

    let open = lifecycle.pauses(order.id).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].reason, "falta tela azul marino");
    assert!(open[0].resolved_at.is_none());

    let resumed = lifecycle.resume(order.id, &corte).await.unwrap();
    assert_eq!(resumed.status, OrderStatus::Active);
    assert_eq!(resumed.current_area, order.current_area);
    assert_eq!(resumed.pieces, order.pieces);
    assert_eq!(resumed.version, order.version + 2);

    let closed = lifecycle.pauses(order.id).await.unwrap();
    assert_eq!(closed.len(), 1);
    assert!(closed[0].resolved_at.is_some());
    assert_eq!(closed[0].resolved_by.as_deref(), Some("corte-user"));
}

#[tokio::test]
async fn pause_reason_needs_ten_characters() {
    let app = TestApp::new().await;
    let lifecycle = &app.state.services.lifecycle;
    let corte = TestApp::actor(Area::Corte);
    let order = app.seed_order("F-221", 12).await;

    assert_matches!(
        lifecycle.pause(order.id, pause("123456789"), &corte).await,
        Err(ServiceError::ValidationError(_))
    );
    assert!(lifecycle.pauses(order.id).await.unwrap().is_empty());

    let paused = lifecycle
        .pause(order.id, pause("1234567890"), &corte)
        .await
        .unwrap();
    assert_eq!(paused.status, OrderStatus::Paused);
}

#[tokio::test]
async fn pause_and_resume_belong_to_the_current_area() {
    let app = TestApp::new().await;
    let lifecycle = &app.state.services.lifecycle;
    let order = app.seed_order("F-222", 12).await;

    for outsider in [Area::Bordado, Area::Admin] {
        assert_matches!(
            lifecycle
                .pause(order.id, pause("revision de calidad"), &TestApp::actor(outsider))
                .await,
            Err(ServiceError::Forbidden(_))
        );
    }

    assert_matches!(
        lifecycle.resume(order.id, &TestApp::actor(Area::Corte)).await,
        Err(ServiceError::InvalidState(_))
    );
    assert_matches!(
        lifecycle.pause(9_999, pause("no existe la orden"), &TestApp::actor(Area::Corte)).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn split_orders_cannot_pause_or_complete() {
    let app = TestApp::new().await;
    let lifecycle = &app.state.services.lifecycle;
    let order = app.seed_order("F-223", 20).await;

    app.state
        .services
        .ledger
        .transfer(
            order.id,
            transfer(Area::Corte, Area::Envios, 15),
            &TestApp::actor(Area::Corte),
        )
        .await
        .unwrap();

    assert_matches!(
        lifecycle
            .pause(order.id, pause("esperando botones"), &TestApp::actor(Area::Corte))
            .await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        lifecycle.complete(order.id, &TestApp::actor(Area::Envios)).await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn completion_is_terminal() {
    let app = TestApp::new().await;
    let lifecycle = &app.state.services.lifecycle;
    let envios = TestApp::actor(Area::Envios);
    let order = app.seed_order("F-224", 8).await;
    ship_all(&app, order.id, 8).await;

    assert_matches!(
        lifecycle.complete(order.id, &TestApp::actor(Area::Admin)).await,
        Err(ServiceError::Forbidden(_))
    );

    let completed = lifecycle.complete(order.id, &envios).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.completed_at.is_some());

    assert_matches!(
        lifecycle.complete(order.id, &envios).await,
        Err(ServiceError::InvalidState(_))
    );
    assert_matches!(
        lifecycle.pause(order.id, pause("cliente cancelo envio"), &envios).await,
        Err(ServiceError::InvalidState(_))
    );
    assert_matches!(
        app.state
            .services
            .ledger
            .transfer(order.id, transfer(Area::Envios, Area::Almacen, 8), &envios)
            .await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn paused_orders_cannot_complete() {
    let app = TestApp::new().await;
    let envios = TestApp::actor(Area::Envios);
    let order = app.seed_order("F-225", 4).await;
    ship_all(&app, order.id, 4).await;

    app.state
        .services
        .lifecycle
        .pause(order.id, pause("falta guia de envio"), &envios)
        .await
        .unwrap();
    assert_matches!(
        app.state.services.lifecycle.complete(order.id, &envios).await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn history_records_every_mutation_in_order() {
    let app = TestApp::new().await;
    let corte = TestApp::actor(Area::Corte);
    let order = app.seed_order("F-230", 10).await;
    let lifecycle = &app.state.services.lifecycle;

    lifecycle
        .pause(order.id, pause("ajuste de patron"), &corte)
        .await
        .unwrap();
    lifecycle.resume(order.id, &corte).await.unwrap();
    ship_all(&app, order.id, 10).await;
    lifecycle
        .complete(order.id, &TestApp::actor(Area::Envios))
        .await
        .unwrap();

    let history = app.state.services.audit.list_for(order.id).await.unwrap();
    let kinds: Vec<AuditEventType> = history.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventType::Created,
            AuditEventType::Paused,
            AuditEventType::Resumed,
            AuditEventType::Transferred,
            AuditEventType::Completed,
        ]
    );
    assert_eq!(history[1].payload["reason"], "ajuste de patron");
    assert_eq!(history[3].payload["to_area"], "envios");
    assert_eq!(history[4].actor, "envios-user");

    let streamed: Vec<_> = app
        .state
        .services
        .audit
        .stream_for(order.id)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(streamed, history);
}

#[tokio::test]
async fn delete_removes_the_order_and_everything_about_it() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let order = app.seed_order("F-240", 10).await;
    services
        .ledger
        .transfer(
            order.id,
            transfer(Area::Corte, Area::Bordado, 4),
            &TestApp::actor(Area::Corte),
        )
        .await
        .unwrap();

    for denied in [Area::Corte, Area::Envios] {
        assert_matches!(
            services.orders.delete(order.id, &TestApp::actor(denied)).await,
            Err(ServiceError::Forbidden(_))
        );
    }

    services
        .orders
        .delete(order.id, &TestApp::actor(Area::Admin))
        .await
        .unwrap();

    assert_matches!(services.orders.get(order.id).await, Err(ServiceError::NotFound(_)));
    assert_matches!(services.audit.list_for(order.id).await, Err(ServiceError::NotFound(_)));
    assert_matches!(services.ledger.history(order.id).await, Err(ServiceError::NotFound(_)));
    let orphaned: Vec<_> = services
        .audit
        .stream_for(order.id)
        .try_collect()
        .await
        .unwrap();
    assert!(orphaned.is_empty());

    // the folio is free again
    app.seed_order("F-240", 3).await;
}

#[tokio::test]
async fn shipping_may_delete_completed_orders() {
    let app = TestApp::new().await;
    let envios = TestApp::actor(Area::Envios);
    let order = app.seed_order("F-241", 2).await;
    ship_all(&app, order.id, 2).await;
    app.state
        .services
        .lifecycle
        .complete(order.id, &envios)
        .await
        .unwrap();

    app.state.services.orders.delete(order.id, &envios).await.unwrap();
    assert_matches!(
        app.state.services.orders.delete(order.id, &envios).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn mutations_are_broadcast_to_subscribers() {
    let app = TestApp::new().await;
    let mut events = app.state.event_sender.subscribe();
    let corte = TestApp::actor(Area::Corte);

    let order = app.seed_order("F-250", 6).await;
    app.state
        .services
        .ledger
        .transfer(order.id, transfer(Area::Corte, Area::Bordado, 2), &corte)
        .await
        .unwrap();

    assert_matches!(
        events.recv().await.unwrap(),
        Event::OrderCreated { order_id, total_piezas: 6, area: Area::Corte, .. } if order_id == order.id
    );
    assert_matches!(
        events.recv().await.unwrap(),
        Event::PiecesTransferred { piece_count: 2, split: true, current_area: Area::Corte, .. }
    );

    app.state
        .services
        .orders
        .delete(order.id, &TestApp::actor(Area::Admin))
        .await
        .unwrap();
    assert_matches!(
        events.recv().await.unwrap(),
        Event::OrderDeleted { folio, .. } if folio == "F-250"
    );
}
