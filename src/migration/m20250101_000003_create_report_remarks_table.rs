use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ReportRemarks {
    Table,
    Id,
    ReportId,
    Author,
    Text,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportRemarks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportRemarks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReportRemarks::ReportId).integer().not_null())
                    .col(ColumnDef::new(ReportRemarks::Author).string().not_null())
                    .col(ColumnDef::new(ReportRemarks::Text).text().not_null())
                    .col(
                        ColumnDef::new(ReportRemarks::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_remarks_report_id")
                            .from(ReportRemarks::Table, ReportRemarks::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_remarks_report_id")
                    .table(ReportRemarks::Table)
                    .col(ReportRemarks::ReportId)
                    .col(ReportRemarks::Id)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReportRemarks::Table).to_owned())
            .await
    }
}
