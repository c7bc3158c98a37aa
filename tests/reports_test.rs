mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use common::{order_request, TestApp};
use pedidos_api::{
    errors::ServiceError,
    models::Area,
    services::{ledger::TransferRequest, lifecycle::PauseRequest},
};

async fn move_pieces(app: &TestApp, order_id: i32, from: Area, to: Area, count: i32) {
    app.state
        .services
        .ledger
        .transfer(
            order_id,
            TransferRequest {
                from_area: from.code().to_string(),
                to_area: to.code().to_string(),
                piece_count: count,
            },
            &TestApp::actor(Area::Admin),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn dashboard_counts_orders_by_state_and_area() {
    let app = TestApp::new().await;
    let reports = &app.state.services.reports;

    let empty = reports.dashboard_stats().await.unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.by_area.is_empty());

    let split = app.seed_order("D-1", 10).await;
    move_pieces(&app, split.id, Area::Corte, Area::Bordado, 4).await;

    let paused = app.seed_order("D-2", 5).await;
    app.state
        .services
        .lifecycle
        .pause(
            paused.id,
            PauseRequest {
                reason: "falta tela de forro".into(),
            },
            &TestApp::actor(Area::Corte),
        )
        .await
        .unwrap();

    let done = app.seed_order("D-3", 3).await;
    move_pieces(&app, done.id, Area::Corte, Area::Envios, 3).await;
    app.state
        .services
        .lifecycle
        .complete(done.id, &TestApp::actor(Area::Envios))
        .await
        .unwrap();

    let stats = reports.dashboard_stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.paused, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.split, 1);

    // completed orders no longer occupy an area
    assert_eq!(stats.by_area.len(), 1);
    assert_eq!(stats.by_area[0].area, Area::Corte);
    assert_eq!(stats.by_area[0].display_name, "Corte");
    assert_eq!(stats.by_area[0].orders, 2);
}

#[tokio::test]
async fn monthly_metrics_group_transfers_by_destination() {
    let app = TestApp::new().await;
    let reports = &app.state.services.reports;
    let admin = TestApp::actor(Area::Admin);
    let now = Utc::now();

    let order = app.seed_order("M-1", 100).await;
    move_pieces(&app, order.id, Area::Corte, Area::Bordado, 30).await;
    move_pieces(&app, order.id, Area::Corte, Area::Bordado, 30).await;
    move_pieces(&app, order.id, Area::Corte, Area::Calidad, 40).await;

    let metrics = reports
        .monthly_area_metrics(now.year(), now.month(), &admin)
        .await
        .unwrap();
    assert_eq!(metrics.total_transfers, 3);
    assert_eq!(metrics.total_pieces, 100);

    let summary: Vec<(Area, u64, i64, u32)> = metrics
        .by_area
        .iter()
        .map(|m| (m.area, m.transfers, m.pieces, m.percentage))
        .collect();
    assert_eq!(
        summary,
        vec![(Area::Bordado, 2, 60, 60), (Area::Calidad, 1, 40, 40)]
    );

    let previous_year = reports
        .monthly_area_metrics(now.year() - 1, now.month(), &admin)
        .await
        .unwrap();
    assert_eq!(previous_year.total_transfers, 0);
    assert!(previous_year.by_area.is_empty());
}

#[tokio::test]
async fn metrics_are_for_administrators_only() {
    let app = TestApp::new().await;
    let reports = &app.state.services.reports;
    let corte = TestApp::actor(Area::Corte);

    assert_matches!(
        reports.monthly_area_metrics(2024, 5, &corte).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        reports.overall_metrics(&corte).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        reports.request_metrics(&corte).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        reports
            .monthly_area_metrics(2024, 13, &TestApp::actor(Area::Admin))
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn overall_metrics_name_the_busiest_area() {
    let app = TestApp::new().await;
    let reports = &app.state.services.reports;
    let admin = TestApp::actor(Area::Admin);

    let idle = reports.overall_metrics(&admin).await.unwrap();
    assert_eq!(idle.total_transfers, 0);
    assert_eq!(idle.most_active_area, None);
    assert_eq!(idle.monthly_average, 0.0);

    let first = app.seed_order("O-1", 20).await;
    let second = app.seed_order("O-2", 20).await;
    move_pieces(&app, first.id, Area::Corte, Area::Bordado, 20).await;
    move_pieces(&app, second.id, Area::Corte, Area::Bordado, 20).await;
    move_pieces(&app, first.id, Area::Bordado, Area::Ensamble, 20).await;

    let overall = reports.overall_metrics(&admin).await.unwrap();
    assert_eq!(overall.total_transfers, 3);
    assert_eq!(overall.total_pieces, 60);
    assert_eq!(overall.most_active_area, Some(Area::Bordado));
    // every transfer happened this month
    assert_eq!(overall.monthly_average, 3.0);
}

#[tokio::test]
async fn request_metrics_pool_the_orders_of_one_request() {
    let app = TestApp::new().await;
    let reports = &app.state.services.reports;
    let admin = TestApp::actor(Area::Admin);

    let idle = reports.request_metrics(&admin).await.unwrap();
    assert_eq!(idle.total_requests, 0);
    assert_eq!(idle.most_active_request, None);

    let mut shared = Vec::new();
    for folio in ["Q-1", "Q-2"] {
        let mut request = order_request(folio, 10);
        request.no_solicitud = "SOL-COMPARTIDA".into();
        shared.push(
            app.state
                .services
                .orders
                .create(request, &admin)
                .await
                .unwrap(),
        );
    }
    let single = app.seed_order("Q-3", 30).await;

    move_pieces(&app, shared[0].id, Area::Corte, Area::Bordado, 10).await;
    move_pieces(&app, shared[1].id, Area::Corte, Area::Bordado, 4).await;
    move_pieces(&app, single.id, Area::Corte, Area::Calidad, 30).await;

    let metrics = reports.request_metrics(&admin).await.unwrap();
    assert_eq!(metrics.total_requests, 2);
    assert_eq!(metrics.total_transfers, 3);
    assert_eq!(metrics.average_transfers_per_request, 1.5);
    assert_eq!(metrics.most_active_request.as_deref(), Some("SOL-COMPARTIDA"));

    let busiest = &metrics.top_requests[0];
    assert_eq!(busiest.orders, 2);
    assert_eq!(busiest.transfers, 2);
    assert_eq!(busiest.pieces, 14);
    assert_eq!(metrics.top_requests[1].no_solicitud, "SOL-Q-3");
    assert_eq!(metrics.top_requests[1].pieces, 30);
}
