use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Area, OrderStatus};

/// A production order (pedido) tracked across the workshop areas.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub folio: String,
    pub no_solicitud: String,
    pub cliente_hotel: String,
    pub modelo: String,
    pub tipo_prenda: String,
    pub color: String,
    pub tela: String,
    /// Lowercased folio, client/hotel and model, written once at creation
    #[serde(skip)]
    pub search_text: String,
    pub total_piezas: i32,
    pub current_area: Area,
    pub status: OrderStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_area_pieces::Entity")]
    AreaPieces,
    #[sea_orm(has_many = "super::piece_transfer::Entity")]
    PieceTransfers,
    #[sea_orm(has_many = "super::order_pause::Entity")]
    Pauses,
    #[sea_orm(has_many = "super::audit_entry::Entity")]
    AuditEntries,
}

impl Related<super::order_area_pieces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AreaPieces.def()
    }
}

impl Related<super::piece_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PieceTransfers.def()
    }
}

impl Related<super::order_pause::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pauses.def()
    }
}

impl Related<super::audit_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
