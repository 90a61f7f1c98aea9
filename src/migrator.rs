use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_teams_table::Migration),
            Box::new(m20250101_000002_create_technicians_table::Migration),
            Box::new(m20250101_000003_create_work_order_types_table::Migration),
            Box::new(m20250101_000004_create_work_orders_table::Migration),
            Box::new(m20250101_000005_create_status_history_table::Migration),
            Box::new(m20250101_000006_create_executions_table::Migration),
            Box::new(m20250101_000007_create_part_reservations_table::Migration),
            Box::new(m20250101_000008_create_checklist_items_table::Migration),
        ]
    }
}

mod m20250101_000001_create_teams_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_teams_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Teams::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Teams::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Teams::Name).string().not_null())
                        .col(
                            ColumnDef::new(Teams::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Teams::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Teams::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Teams {
        Table,
        Id,
        Name,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_technicians_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_technicians_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Technicians::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Technicians::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Technicians::Name).string().not_null())
                        .col(ColumnDef::new(Technicians::Email).string().null())
                        .col(ColumnDef::new(Technicians::TeamId).uuid().null())
                        .col(
                            ColumnDef::new(Technicians::DailyCapacityHours)
                                .decimal()
                                .not_null()
                                .default(8),
                        )
                        .col(
                            ColumnDef::new(Technicians::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Technicians::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Technicians::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_technicians_team_id")
                        .table(Technicians::Table)
                        .col(Technicians::TeamId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Technicians::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Technicians {
        Table,
        Id,
        Name,
        Email,
        TeamId,
        DailyCapacityHours,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_work_order_types_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_work_order_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrderTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderTypes::Name).string().not_null())
                        .col(ColumnDef::new(WorkOrderTypes::Category).string().not_null())
                        .col(
                            ColumnDef::new(WorkOrderTypes::DefaultPriority)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderTypes::RequiresApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(WorkOrderTypes::SlaHours).integer().null())
                        .col(
                            ColumnDef::new(WorkOrderTypes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderTypes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrderTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum WorkOrderTypes {
        Table,
        Id,
        Name,
        Category,
        DefaultPriority,
        RequiresApproval,
        SlaHours,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_work_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_work_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::WorkOrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WorkOrders::Title).string().not_null())
                        .col(ColumnDef::new(WorkOrders::Description).string().null())
                        .col(ColumnDef::new(WorkOrders::Category).string().not_null())
                        .col(ColumnDef::new(WorkOrders::TypeId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::Status).string().not_null())
                        .col(ColumnDef::new(WorkOrders::Priority).string().not_null())
                        .col(
                            ColumnDef::new(WorkOrders::DueDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ScheduledStart)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ScheduledEnd)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::AssignedTechnician).uuid().null())
                        .col(ColumnDef::new(WorkOrders::AssignedTeam).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::ActualStart)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ActualEnd)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::ActualHours).decimal().null())
                        .col(ColumnDef::new(WorkOrders::ActualCost).decimal().null())
                        .col(ColumnDef::new(WorkOrders::EstimatedHours).decimal().null())
                        .col(
                            ColumnDef::new(WorkOrders::EstimatedPartsCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::EstimatedLaborCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::EstimatedTotalCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(WorkOrders::SourceType).string().not_null())
                        .col(ColumnDef::new(WorkOrders::SourceId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::RelatedWorkOrderId).uuid().null())
                        .col(ColumnDef::new(WorkOrders::Relationship).string().null())
                        .col(ColumnDef::new(WorkOrders::RequestedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(WorkOrders::RequestedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrders::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::PlannedBy).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::PlannedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::VerifiedBy).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::VerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::ClosedBy).uuid().null())
                        .col(
                            ColumnDef::new(WorkOrders::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::Version)
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
                        .name("idx_work_orders_status")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::Status)
                        .to_owned(),
                )
                .await?;

            // Conflict detection scans one technician's scheduled windows.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_technician_schedule")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::AssignedTechnician)
                        .col(WorkOrders::ScheduledStart)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_created_at")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum WorkOrders {
        Table,
        Id,
        WorkOrderNumber,
        Title,
        Description,
        Category,
        TypeId,
        Status,
        Priority,
        DueDate,
        ScheduledStart,
        ScheduledEnd,
        AssignedTechnician,
        AssignedTeam,
        ActualStart,
        ActualEnd,
        ActualHours,
        ActualCost,
        EstimatedHours,
        EstimatedPartsCost,
        EstimatedLaborCost,
        EstimatedTotalCost,
        SourceType,
        SourceId,
        RelatedWorkOrderId,
        Relationship,
        RequestedBy,
        RequestedAt,
        ApprovedBy,
        ApprovedAt,
        PlannedBy,
        PlannedAt,
        VerifiedBy,
        VerifiedAt,
        ClosedBy,
        ClosedAt,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20250101_000005_create_status_history_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_status_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StatusHistory::WorkOrderId).uuid().not_null())
                        .col(ColumnDef::new(StatusHistory::FromStatus).string().not_null())
                        .col(ColumnDef::new(StatusHistory::ToStatus).string().not_null())
                        .col(ColumnDef::new(StatusHistory::ActorId).uuid().not_null())
                        .col(ColumnDef::new(StatusHistory::ActorName).string().not_null())
                        .col(ColumnDef::new(StatusHistory::Reason).string().null())
                        .col(
                            ColumnDef::new(StatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_status_history_work_order_id")
                        .table(StatusHistory::Table)
                        .col(StatusHistory::WorkOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StatusHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StatusHistory {
        #[sea_orm(iden = "work_order_status_history")]
        Table,
        Id,
        WorkOrderId,
        FromStatus,
        ToStatus,
        ActorId,
        ActorName,
        Reason,
        CreatedAt,
    }
}

mod m20250101_000006_create_executions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_executions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Executions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Executions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Executions::WorkOrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Executions::TechnicianId).uuid().not_null())
                        .col(ColumnDef::new(Executions::Status).string().not_null())
                        .col(
                            ColumnDef::new(Executions::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Executions::PausedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Executions::ResumedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Executions::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Executions::TotalPauseMinutes)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Executions::SafetyBriefingDone)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Executions::QualityCheckDone)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Executions::ToolsReturned)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Executions::AreaCleaned)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Executions::WorkSummary).string().null())
                        .col(
                            ColumnDef::new(Executions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Executions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Executions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Executions {
        #[sea_orm(iden = "work_order_executions")]
        Table,
        Id,
        WorkOrderId,
        TechnicianId,
        Status,
        StartedAt,
        PausedAt,
        ResumedAt,
        CompletedAt,
        TotalPauseMinutes,
        SafetyBriefingDone,
        QualityCheckDone,
        ToolsReturned,
        AreaCleaned,
        WorkSummary,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000007_create_part_reservations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_part_reservations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PartReservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartReservations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReservations::WorkOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PartReservations::PartId).uuid().not_null())
                        .col(ColumnDef::new(PartReservations::PartName).string().not_null())
                        .col(ColumnDef::new(PartReservations::Status).string().not_null())
                        .col(
                            ColumnDef::new(PartReservations::EstimatedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PartReservations::ReservedQuantity)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(PartReservations::UsedQuantity).decimal().null())
                        .col(
                            ColumnDef::new(PartReservations::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PartReservations::TotalCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PartReservations::ReservedBy).uuid().null())
                        .col(
                            ColumnDef::new(PartReservations::ReservedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PartReservations::IssuedBy).uuid().null())
                        .col(
                            ColumnDef::new(PartReservations::IssuedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PartReservations::UsedBy).uuid().null())
                        .col(
                            ColumnDef::new(PartReservations::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PartReservations::ReturnedBy).uuid().null())
                        .col(
                            ColumnDef::new(PartReservations::ReturnedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PartReservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_part_reservations_work_order_id")
                        .table(PartReservations::Table)
                        .col(PartReservations::WorkOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PartReservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PartReservations {
        Table,
        Id,
        WorkOrderId,
        PartId,
        PartName,
        Status,
        EstimatedQuantity,
        ReservedQuantity,
        UsedQuantity,
        UnitCost,
        TotalCost,
        ReservedBy,
        ReservedAt,
        IssuedBy,
        IssuedAt,
        UsedBy,
        UsedAt,
        ReturnedBy,
        ReturnedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000008_create_checklist_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000008_create_checklist_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ChecklistItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ChecklistItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ChecklistItems::WorkOrderId).uuid().not_null())
                        .col(ColumnDef::new(ChecklistItems::Label).string().not_null())
                        .col(
                            ColumnDef::new(ChecklistItems::Required)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ChecklistItems::Answered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ChecklistItems::Answer).string().null())
                        .col(
                            ColumnDef::new(ChecklistItems::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ChecklistItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ChecklistItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_checklist_items_work_order_id")
                        .table(ChecklistItems::Table)
                        .col(ChecklistItems::WorkOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ChecklistItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ChecklistItems {
        #[sea_orm(iden = "work_order_checklist_items")]
        Table,
        Id,
        WorkOrderId,
        Label,
        Required,
        Answered,
        Answer,
        Position,
        CreatedAt,
        UpdatedAt,
    }
}
