use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PromoReservations {
    Table,
    Id,
    Code,
    UserId,
    RoomTypeId,
    DiscountBp,
    State,
    ActiveCode,
    ExpiresAt,
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
                    .table(PromoReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromoReservations::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::Code)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::UserId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::DiscountBp)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::State)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    // Mirrors `code` while the reservation is active and is NULL otherwise.
                    // The unique index below is what makes a code single-holder.
                    .col(
                        ColumnDef::new(PromoReservations::ActiveCode)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PromoReservations::UpdatedAt)
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
                    .name("uq_promo_reservations_active_code")
                    .table(PromoReservations::Table)
                    .col(PromoReservations::ActiveCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_reservations_user_state")
                    .table(PromoReservations::Table)
                    .col(PromoReservations::UserId)
                    .col(PromoReservations::State)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_reservations_code")
                    .table(PromoReservations::Table)
                    .col(PromoReservations::Code)
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
                    .table(PromoReservations::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
