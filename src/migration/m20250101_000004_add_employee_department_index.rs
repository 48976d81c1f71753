use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    EmployeeId,
    Department,
}

/// Department staff log in with employee id + department, so the pair must
/// identify a single account.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("uq_users_employee_department")
                    .table(Users::Table)
                    .col(Users::EmployeeId)
                    .col(Users::Department)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uq_users_employee_department")
                    .table(Users::Table)
                    .to_owned(),
            )
            .await
    }
}
