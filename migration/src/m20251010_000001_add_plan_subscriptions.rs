use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PlanSubscriptions {
    Table,
    UserId,
    Email,
    PlanId,
    Installments,
    RoomTypeId,
    RoomPriceCents,
    DiscountBp,
    CompletedInstallments,
    StartedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PlanSubscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlanSubscriptions::UserId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::Email)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::PlanId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::Installments)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::RoomPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::DiscountBp)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::CompletedInstallments)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanSubscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(PlanSubscriptions::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
