use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum RoomTypes {
    Table,
    Id,
    Name,
    Guests,
    PriceCents,
    Available,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PaymentPlans {
    Table,
    Id,
    Installments,
    Schedule,
    CutoffAt,
    Popular,
    Savings,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PromoCodes {
    Table,
    Code,
    DiscountBp,
    RoomTypeId,
    ActiveFrom,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoomTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoomTypes::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoomTypes::Name).string_len(255).not_null())
                    .col(ColumnDef::new(RoomTypes::Guests).integer().not_null())
                    .col(
                        ColumnDef::new(RoomTypes::PriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::Available)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(RoomTypes::Available).gte(0)),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentPlans::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::Installments)
                            .integer()
                            .not_null()
                            .check(Expr::col(PaymentPlans::Installments).gte(1)),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::Schedule)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::CutoffAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentPlans::Popular)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PaymentPlans::Savings).string_len(64).null())
                    .col(
                        ColumnDef::new(PaymentPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromoCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromoCodes::Code)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::DiscountBp)
                            .integer()
                            .not_null()
                            .check(
                                Expr::col(PromoCodes::DiscountBp)
                                    .gte(0)
                                    .and(Expr::col(PromoCodes::DiscountBp).lt(10_000)),
                            ),
                    )
                    .col(ColumnDef::new(PromoCodes::RoomTypeId).big_integer().null())
                    .col(
                        ColumnDef::new(PromoCodes::ActiveFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::CreatedAt)
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
            .drop_table(Table::drop().if_exists().table(PromoCodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(PaymentPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(RoomTypes::Table).to_owned())
            .await?;
        Ok(())
    }
}
