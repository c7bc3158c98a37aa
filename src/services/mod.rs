use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool, events::EventSender};

// Order entity store and its collaborators
pub mod audit;
pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod orders;

// Dashboard and throughput metrics
pub mod reports;

use audit::AuditService;
use ledger::LedgerService;
use lifecycle::LifecycleService;
use locks::OrderLocks;
use orders::OrderService;
use reports::ReportService;

/// Services layer shared by every HTTP handler
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub ledger: Arc<LedgerService>,
    pub lifecycle: Arc<LifecycleService>,
    pub audit: Arc<AuditService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    /// Builds every service over one pool and one set of per-order locks,
    /// so mutations of the same order serialize across services.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let locks = OrderLocks::new();

        Self {
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                locks.clone(),
                config.api_default_page_size,
                config.api_max_page_size,
            )),
            ledger: Arc::new(LedgerService::new(
                db_pool.clone(),
                event_sender.clone(),
                locks.clone(),
            )),
            lifecycle: Arc::new(LifecycleService::new(
                db_pool.clone(),
                event_sender,
                locks,
            )),
            audit: Arc::new(AuditService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool)),
        }
    }
}
