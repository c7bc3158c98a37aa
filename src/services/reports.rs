use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Actor,
    db::DbPool,
    entities::{order, order_area_pieces, piece_transfer},
    errors::ServiceError,
    models::{Area, OrderStatus},
};

/// Counters shown on the floor dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total: u64,
    pub active: u64,
    pub paused: u64,
    pub completed: u64,
    /// Orders whose pieces currently sit in more than one area
    pub split: u64,
    /// Non-completed orders per current area
    pub by_area: Vec<AreaCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AreaCount {
    pub area: Area,
    pub display_name: String,
    pub orders: u64,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

/// Transfer throughput of one destination area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AreaMetric {
    pub area: Area,
    pub display_name: String,
    pub transfers: u64,
    pub pieces: i64,
    /// Share of the period's pieces, rounded to an integer percentage
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyAreaMetrics {
    pub year: i32,
    pub month: u32,
    pub total_transfers: u64,
    pub total_pieces: i64,
    pub by_area: Vec<AreaMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverallMetrics {
    pub total_transfers: u64,
    pub total_pieces: i64,
    pub most_active_area: Option<Area>,
    /// Transfers per month, over the months that saw any transfer
    pub monthly_average: f64,
}

/// Transfer activity of the orders sharing one `no_solicitud`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestActivity {
    pub no_solicitud: String,
    pub orders: u64,
    pub transfers: u64,
    pub pieces: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestMetrics {
    /// Distinct request numbers across all orders
    pub total_requests: u64,
    pub total_transfers: u64,
    pub average_transfers_per_request: f64,
    pub most_active_request: Option<String>,
    /// Busiest requests first, at most [`TOP_REQUESTS`]
    pub top_requests: Vec<RequestActivity>,
}

pub const TOP_REQUESTS: usize = 10;

/// Groups orders by request number and credits each transfer to the
/// request of its order.
fn summarize_by_request(orders: &[(i32, String)], transfers: &[(i32, i32)]) -> RequestMetrics {
    let mut grouped: BTreeMap<&str, RequestActivity> = BTreeMap::new();
    let mut request_of: HashMap<i32, &str> = HashMap::new();
    for (order_id, no_solicitud) in orders {
        request_of.insert(*order_id, no_solicitud.as_str());
        grouped
            .entry(no_solicitud.as_str())
            .or_insert_with(|| RequestActivity {
                no_solicitud: no_solicitud.clone(),
                orders: 0,
                transfers: 0,
                pieces: 0,
            })
            .orders += 1;
    }

    let mut total_transfers: u64 = 0;
    for (order_id, pieces) in transfers {
        let Some(activity) = request_of
            .get(order_id)
            .and_then(|request| grouped.get_mut(request))
        else {
            continue;
        };
        activity.transfers += 1;
        activity.pieces += i64::from(*pieces);
        total_transfers += 1;
    }

    let total_requests = grouped.len() as u64;
    let mut ranked: Vec<RequestActivity> = grouped.into_values().collect();
    ranked.sort_by(|a, b| {
        b.transfers
            .cmp(&a.transfers)
            .then(b.pieces.cmp(&a.pieces))
            .then(a.no_solicitud.cmp(&b.no_solicitud))
    });
    ranked.truncate(TOP_REQUESTS);

    RequestMetrics {
        total_requests,
        total_transfers,
        average_transfers_per_request: if total_requests == 0 {
            0.0
        } else {
            ((total_transfers as f64 / total_requests as f64) * 100.0).round() / 100.0
        },
        most_active_request: ranked
            .first()
            .filter(|a| a.transfers > 0)
            .map(|a| a.no_solicitud.clone()),
        top_requests: ranked,
    }
}

/// Groups `(destination, pieces)` pairs by area, busiest area first.
fn summarize_by_area(rows: &[(Area, i32)]) -> Vec<AreaMetric> {
    let total_pieces: i64 = rows.iter().map(|(_, pieces)| i64::from(*pieces)).sum();
    let mut grouped: BTreeMap<Area, (u64, i64)> = BTreeMap::new();
    for (area, pieces) in rows {
        let entry = grouped.entry(*area).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += i64::from(*pieces);
    }

    let mut metrics: Vec<AreaMetric> = grouped
        .into_iter()
        .map(|(area, (transfers, pieces))| AreaMetric {
            area,
            display_name: area.display_name().to_string(),
            transfers,
            pieces,
            percentage: if total_pieces > 0 {
                ((pieces as f64 * 100.0) / total_pieces as f64).round() as u32
            } else {
                0
            },
        })
        .collect();
    metrics.sort_by(|a, b| {
        b.transfers
            .cmp(&a.transfers)
            .then(b.pieces.cmp(&a.pieces))
            .then(a.area.cmp(&b.area))
    });
    metrics
}

/// `[first day of month, first day of next month)` in UTC.
fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let invalid = || ServiceError::ValidationError(format!("invalid month {year}-{month:02}"));
    if !(2000..=9999).contains(&year) {
        return Err(invalid());
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let to_utc = |date: NaiveDate| date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    Ok((
        to_utc(start).ok_or_else(invalid)?,
        to_utc(next).ok_or_else(invalid)?,
    ))
}

/// Dashboard counters and per-area throughput metrics.
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db_pool;
        let orders: Vec<(OrderStatus, Area)> = order::Entity::find()
            .select_only()
            .column(order::Column::Status)
            .column(order::Column::CurrentArea)
            .into_tuple()
            .all(db)
            .await?;
        let residency: Vec<i32> = order_area_pieces::Entity::find()
            .select_only()
            .column(order_area_pieces::Column::OrderId)
            .into_tuple()
            .all(db)
            .await?;

        let mut areas_per_order: HashMap<i32, u32> = HashMap::new();
        for order_id in residency {
            *areas_per_order.entry(order_id).or_default() += 1;
        }

        let mut stats = DashboardStats {
            total: orders.len() as u64,
            active: 0,
            paused: 0,
            completed: 0,
            split: areas_per_order.values().filter(|n| **n > 1).count() as u64,
            by_area: Vec::new(),
        };
        let mut by_area: BTreeMap<Area, u64> = BTreeMap::new();
        for (status, area) in orders {
            match status {
                OrderStatus::Active => stats.active += 1,
                OrderStatus::Paused => stats.paused += 1,
                OrderStatus::Completed => stats.completed += 1,
            }
            if !status.is_terminal() {
                *by_area.entry(area).or_default() += 1;
            }
        }
        stats.by_area = by_area
            .into_iter()
            .map(|(area, orders)| AreaCount {
                area,
                display_name: area.display_name().to_string(),
                orders,
            })
            .collect();

        Ok(stats)
    }

    /// Transfers of one calendar month (UTC) grouped by destination area.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn monthly_area_metrics(
        &self,
        year: i32,
        month: u32,
        actor: &Actor,
    ) -> Result<MonthlyAreaMetrics, ServiceError> {
        actor.require_admin("view area metrics")?;
        let (start, end) = month_bounds(year, month)?;

        let rows: Vec<(Area, i32)> = piece_transfer::Entity::find()
            .select_only()
            .column(piece_transfer::Column::ToArea)
            .column(piece_transfer::Column::PieceCount)
            .filter(piece_transfer::Column::CreatedAt.gte(start))
            .filter(piece_transfer::Column::CreatedAt.lt(end))
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        let by_area = summarize_by_area(&rows);
        let metrics = MonthlyAreaMetrics {
            year,
            month,
            total_transfers: rows.len() as u64,
            total_pieces: by_area.iter().map(|m| m.pieces).sum(),
            by_area,
        };
        info!(year, month, transfers = metrics.total_transfers, "monthly metrics computed");
        Ok(metrics)
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn overall_metrics(&self, actor: &Actor) -> Result<OverallMetrics, ServiceError> {
        actor.require_admin("view area metrics")?;

        let rows: Vec<(Area, i32, DateTime<Utc>)> = piece_transfer::Entity::find()
            .select_only()
            .column(piece_transfer::Column::ToArea)
            .column(piece_transfer::Column::PieceCount)
            .column(piece_transfer::Column::CreatedAt)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        let months: BTreeSet<(i32, u32)> = rows
            .iter()
            .map(|(_, _, at)| (at.year(), at.month()))
            .collect();
        let pairs: Vec<(Area, i32)> = rows.iter().map(|(area, pieces, _)| (*area, *pieces)).collect();
        let by_area = summarize_by_area(&pairs);

        let total_transfers = rows.len() as u64;
        let monthly_average = if months.is_empty() {
            0.0
        } else {
            ((total_transfers as f64 / months.len() as f64) * 100.0).round() / 100.0
        };

        Ok(OverallMetrics {
            total_transfers,
            total_pieces: by_area.iter().map(|m| m.pieces).sum(),
            most_active_area: by_area.first().map(|m| m.area),
            monthly_average,
        })
    }

    /// Transfers per request number, all time.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn request_metrics(&self, actor: &Actor) -> Result<RequestMetrics, ServiceError> {
        actor.require_admin("view request metrics")?;
        let db = &*self.db_pool;

        let orders: Vec<(i32, String)> = order::Entity::find()
            .select_only()
            .column(order::Column::Id)
            .column(order::Column::NoSolicitud)
            .into_tuple()
            .all(db)
            .await?;
        let transfers: Vec<(i32, i32)> = piece_transfer::Entity::find()
            .select_only()
            .column(piece_transfer::Column::OrderId)
            .column(piece_transfer::Column::PieceCount)
            .into_tuple()
            .all(db)
            .await?;

        let metrics = summarize_by_request(&orders, &transfers);
        info!(
            requests = metrics.total_requests,
            transfers = metrics.total_transfers,
            "request metrics computed"
        );
        Ok(metrics)
    }
}
