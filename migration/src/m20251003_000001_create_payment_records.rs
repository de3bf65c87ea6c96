use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PaymentRecords {
    Table,
    OrderNumber,
    MdOrder,
    ClientId,
    Email,
    FullName,
    PlanId,
    PaymentNumber,
    Installments,
    Amount,
    RoomPriceCents,
    DiscountBp,
    Status,
    RoomTypeId,
    ReservationId,
    PromoCode,
    Locale,
    Description,
    FormUrl,
    ErrorCode,
    ErrorMessage,
    CreatedAt,
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
                    .table(PaymentRecords::Table)
                    .if_not_exists()
                    // The order number is the idempotency key: a resubmission can never add a row.
                    .col(
                        ColumnDef::new(PaymentRecords::OrderNumber)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentRecords::MdOrder).string_len(64).null())
                    .col(
                        ColumnDef::new(PaymentRecords::ClientId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentRecords::Email).string_len(255).not_null())
                    .col(
                        ColumnDef::new(PaymentRecords::FullName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentRecords::PlanId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PaymentRecords::PaymentNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::Installments)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(PaymentRecords::Amount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::RoomPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::DiscountBp)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::Status)
                            .string_len(16)
                            .not_null()
                            .default("-1"),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::ReservationId)
                            .string_len(36)
                            .null(),
                    )
                    .col(ColumnDef::new(PaymentRecords::PromoCode).string_len(64).null())
                    .col(ColumnDef::new(PaymentRecords::Locale).string_len(8).not_null())
                    .col(
                        ColumnDef::new(PaymentRecords::Description)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentRecords::FormUrl).text().null())
                    .col(ColumnDef::new(PaymentRecords::ErrorCode).string_len(16).null())
                    .col(ColumnDef::new(PaymentRecords::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(PaymentRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_records_md_order")
                    .table(PaymentRecords::Table)
                    .col(PaymentRecords::MdOrder)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_records_email")
                    .table(PaymentRecords::Table)
                    .col(PaymentRecords::Email)
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
                    .table(PaymentRecords::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
