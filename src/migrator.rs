use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_orders_table::Migration),
            Box::new(m20240101_000002_create_order_area_pieces_table::Migration),
            Box::new(m20240101_000003_create_piece_transfers_table::Migration),
            Box::new(m20240101_000004_create_order_pauses_table::Migration),
            Box::new(m20240101_000005_create_order_audit_log_table::Migration),
        ]
    }
}

mod m20240101_000001_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Orders::Folio)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::NoSolicitud).string().not_null())
                        .col(ColumnDef::new(Orders::ClienteHotel).string().not_null())
                        .col(ColumnDef::new(Orders::Modelo).string().not_null())
                        .col(ColumnDef::new(Orders::TipoPrenda).string().not_null())
                        .col(ColumnDef::new(Orders::Color).string().not_null())
                        .col(ColumnDef::new(Orders::Tela).string().not_null())
                        .col(ColumnDef::new(Orders::SearchText).text().not_null())
                        .col(ColumnDef::new(Orders::TotalPiezas).integer().not_null())
                        .col(ColumnDef::new(Orders::CurrentArea).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_current_area")
                        .table(Orders::Table)
                        .col(Orders::CurrentArea)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        Folio,
        NoSolicitud,
        ClienteHotel,
        Modelo,
        TipoPrenda,
        Color,
        Tela,
        SearchText,
        TotalPiezas,
        CurrentArea,
        Status,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        CompletedAt,
        Version,
    }
}

mod m20240101_000002_create_order_area_pieces_table {

    use super::m20240101_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_order_area_pieces_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderAreaPieces::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderAreaPieces::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderAreaPieces::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderAreaPieces::Area).string_len(16).not_null())
                        .col(ColumnDef::new(OrderAreaPieces::Pieces).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_area_pieces_order_id")
                                .from(OrderAreaPieces::Table, OrderAreaPieces::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_area_pieces_order_area")
                        .table(OrderAreaPieces::Table)
                        .col(OrderAreaPieces::OrderId)
                        .col(OrderAreaPieces::Area)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAreaPieces::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderAreaPieces {
        Table,
        Id,
        OrderId,
        Area,
        Pieces,
    }
}

mod m20240101_000003_create_piece_transfers_table {

    use super::m20240101_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_piece_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PieceTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PieceTransfers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PieceTransfers::OrderId).integer().not_null())
                        .col(ColumnDef::new(PieceTransfers::FromArea).string_len(16).not_null())
                        .col(ColumnDef::new(PieceTransfers::ToArea).string_len(16).not_null())
                        .col(ColumnDef::new(PieceTransfers::PieceCount).integer().not_null())
                        .col(ColumnDef::new(PieceTransfers::Actor).string().not_null())
                        .col(
                            ColumnDef::new(PieceTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_piece_transfers_order_id")
                                .from(PieceTransfers::Table, PieceTransfers::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_piece_transfers_order_id")
                        .table(PieceTransfers::Table)
                        .col(PieceTransfers::OrderId)
                        .to_owned(),
                )
                .await?;

            // monthly metrics scan by creation time
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_piece_transfers_created_at")
                        .table(PieceTransfers::Table)
                        .col(PieceTransfers::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PieceTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PieceTransfers {
        Table,
        Id,
        OrderId,
        FromArea,
        ToArea,
        PieceCount,
        Actor,
        CreatedAt,
    }
}

mod m20240101_000004_create_order_pauses_table {

    use super::m20240101_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_order_pauses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderPauses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderPauses::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderPauses::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderPauses::Reason).text().not_null())
                        .col(ColumnDef::new(OrderPauses::PausedBy).string().not_null())
                        .col(
                            ColumnDef::new(OrderPauses::PausedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderPauses::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(OrderPauses::ResolvedBy).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_pauses_order_id")
                                .from(OrderPauses::Table, OrderPauses::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_pauses_order_id")
                        .table(OrderPauses::Table)
                        .col(OrderPauses::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderPauses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderPauses {
        Table,
        Id,
        OrderId,
        Reason,
        PausedBy,
        PausedAt,
        ResolvedAt,
        ResolvedBy,
    }
}

mod m20240101_000005_create_order_audit_log_table {

    use super::m20240101_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_order_audit_log_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderAuditLog::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderAuditLog::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderAuditLog::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderAuditLog::EventType).string_len(16).not_null())
                        .col(ColumnDef::new(OrderAuditLog::Payload).text().not_null())
                        .col(ColumnDef::new(OrderAuditLog::Actor).string().not_null())
                        .col(
                            ColumnDef::new(OrderAuditLog::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_audit_log_order_id")
                                .from(OrderAuditLog::Table, OrderAuditLog::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_audit_log_order_id")
                        .table(OrderAuditLog::Table)
                        .col(OrderAuditLog::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAuditLog::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderAuditLog {
        Table,
        Id,
        OrderId,
        EventType,
        Payload,
        Actor,
        CreatedAt,
    }
}
