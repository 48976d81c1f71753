use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    SerialNo,
    FaultDate,
    FaultTime,
    Apparatus,
    Description,
    Recommendation,
    OperationAction,
    DepartmentAction,
    NotifiedBy,
    ReferTo,
    Means,
    State,
    CreatedBy,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reports::SerialNo)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Reports::FaultDate).date().not_null())
                    .col(ColumnDef::new(Reports::FaultTime).time().not_null())
                    .col(ColumnDef::new(Reports::Apparatus).string_len(200).not_null())
                    .col(ColumnDef::new(Reports::Description).text().not_null())
                    .col(ColumnDef::new(Reports::Recommendation).text().null())
                    .col(ColumnDef::new(Reports::OperationAction).text().null())
                    .col(ColumnDef::new(Reports::DepartmentAction).text().null())
                    .col(ColumnDef::new(Reports::NotifiedBy).string().not_null())
                    .col(ColumnDef::new(Reports::ReferTo).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Reports::Means)
                            .string_len(20)
                            .not_null()
                            .default("Telephone"),
                    )
                    .col(
                        ColumnDef::new(Reports::State)
                            .string_len(32)
                            .not_null()
                            .default("created"),
                    )
                    .col(ColumnDef::new(Reports::CreatedBy).integer().not_null())
                    .col(
                        ColumnDef::new(Reports::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Reports::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reports::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_created_by")
                            .from(Reports::Table, Reports::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_state_created_at")
                    .table(Reports::Table)
                    .col(Reports::State)
                    .col(Reports::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_refer_to_state")
                    .table(Reports::Table)
                    .col(Reports::ReferTo)
                    .col(Reports::State)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await
    }
}
